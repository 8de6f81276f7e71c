//! Conversion of BAM/SAM records into owned [`Record`]s.

use crate::alignment::UNMAPPED;
use crate::cigar::CigarOp;
use crate::record::{MateInfo, Record};
use crate::sequence::Strand;
use log::info;
use rust_htslib::bam::{self, record::Cigar, Read};
use std::io;
use std::sync::Arc;

/// htslib marks an absent quality string with 0xff in every position
const MISSING_QUALITY: u8 = 0xff;

impl From<&Cigar> for CigarOp {
    fn from(cigar: &Cigar) -> Self {
        match *cigar {
            Cigar::Match(len) => CigarOp::new(len, 'M'),
            Cigar::Ins(len) => CigarOp::new(len, 'I'),
            Cigar::Del(len) => CigarOp::new(len, 'D'),
            Cigar::RefSkip(len) => CigarOp::new(len, 'N'),
            Cigar::SoftClip(len) => CigarOp::new(len, 'S'),
            Cigar::HardClip(len) => CigarOp::new(len, 'H'),
            Cigar::Pad(len) => CigarOp::new(len, 'P'),
            Cigar::Equal(len) => CigarOp::new(len, '='),
            Cigar::Diff(len) => CigarOp::new(len, 'X'),
        }
    }
}

fn chromosome_name(header: &bam::HeaderView, tid: i32) -> String {
    if tid < 0 {
        return UNMAPPED.to_string();
    }
    String::from_utf8_lossy(header.tid2name(tid as u32)).into_owned()
}

fn strand(reverse: bool) -> Strand {
    if reverse {
        Strand::Reverse
    } else {
        Strand::Forward
    }
}

/// Copy everything the assembly code needs out of an htslib record
pub fn convert_record(record: &bam::Record, header: &bam::HeaderView) -> io::Result<Record> {
    let name = String::from_utf8_lossy(record.qname()).into_owned();
    let bases = record.seq().as_bytes();
    let mut qualities = record.qual().to_vec();
    if qualities.iter().all(|&q| q == MISSING_QUALITY) {
        qualities.iter_mut().for_each(|q| *q = 0);
    }

    let mut converted = Record::new(&name, bases, qualities).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Malformed read '{name}': {e}"),
        )
    })?;

    if !record.is_unmapped() && record.tid() >= 0 {
        let cigar: Vec<CigarOp> = record.cigar().iter().map(CigarOp::from).collect();
        converted = converted.with_mapping(
            &chromosome_name(header, record.tid()),
            record.pos() + 1,
            cigar,
            record.mapq(),
            strand(record.is_reverse()),
        );
    }

    let mate = record.is_paired().then(|| MateInfo {
        chromosome: chromosome_name(header, record.mtid()),
        position: record.mpos() + 1,
        strand: strand(record.is_mate_reverse()),
        unmapped: record.is_mate_unmapped(),
    });

    Ok(converted.with_mate(record.is_first_in_template(), mate))
}

/// Load all primary reads from a BAM/SAM/CRAM file
pub fn load_reads(path: &str) -> io::Result<Vec<Arc<Record>>> {
    let mut reader = bam::Reader::from_path(path)
        .map_err(|e| io::Error::other(format!("Failed to open alignment file '{path}': {e}")))?;
    let header = reader.header().clone();

    let mut reads = Vec::new();
    let mut skipped = 0;
    for result in reader.records() {
        let record = result
            .map_err(|e| io::Error::other(format!("Failed to read record from '{path}': {e}")))?;
        if record.is_secondary() || record.is_supplementary() {
            skipped += 1;
            continue;
        }
        reads.push(Arc::new(convert_record(&record, &header)?));
    }

    info!(
        "Loaded {} reads from {} ({} secondary/supplementary skipped)",
        reads.len(),
        path,
        skipped
    );
    Ok(reads)
}
