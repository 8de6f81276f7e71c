use rust_htslib::faidx;
use rustc_hash::FxHashMap;
use std::io;

/// Contig sequences stored in an indexed FASTA file
pub struct ContigIndex {
    fasta_path: String,
    reader: faidx::Reader,
    names: Vec<String>,
    lengths: FxHashMap<String, usize>,
}

impl ContigIndex {
    /// Open `fasta_path`, building its `.fai` index if it does not exist yet
    pub fn open(fasta_path: &str) -> io::Result<Self> {
        let reader = faidx::Reader::from_path(fasta_path).map_err(|e| {
            io::Error::other(format!("Failed to open FASTA file '{fasta_path}': {e}"))
        })?;

        // Opening the reader creates the index when missing
        let fai_path = format!("{fasta_path}.fai");
        let fai_content = std::fs::read_to_string(&fai_path)?;

        let mut names = Vec::new();
        let mut lengths = FxHashMap::default();
        for line in fai_content.lines() {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 2 || fields[0].is_empty() {
                continue;
            }
            let length = fields[1].parse::<usize>().map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Invalid length for '{}' in {fai_path}: {e}", fields[0]),
                )
            })?;
            names.push(fields[0].to_string());
            lengths.insert(fields[0].to_string(), length);
        }

        Ok(ContigIndex {
            fasta_path: fasta_path.to_string(),
            reader,
            names,
            lengths,
        })
    }

    /// Contig names in file order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn length(&self, name: &str) -> Option<usize> {
        self.lengths.get(name).copied()
    }

    /// Full upper-cased sequence of contig `name`
    pub fn fetch(&self, name: &str) -> io::Result<Vec<u8>> {
        let length = self.length(name).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("Contig '{name}' not found in {}", self.fasta_path),
            )
        })?;
        if length == 0 {
            return Ok(Vec::new());
        }

        // fetch_seq takes a 0-based inclusive end coordinate
        match self.reader.fetch_seq(name, 0, length - 1) {
            Ok(seq) => {
                let mut seq_vec = seq.to_vec();
                unsafe { libc::free(seq.as_ptr() as *mut std::ffi::c_void) }; // rust-htslib leaks the buffer (https://github.com/rust-bio/rust-htslib/issues/401)
                seq_vec.make_ascii_uppercase();
                Ok(seq_vec)
            }
            Err(e) => Err(io::Error::other(format!(
                "Failed to fetch sequence for {name}: {e}"
            ))),
        }
    }
}
