use super::{flip_support, ExtendedAssembly, SupportedAssembly};
use crate::record::Record;
use crate::sequence::Sequence;
use crate::support::SupportChecker;
use log::debug;
use std::sync::Arc;

/// Byte placed between segments. It is not a base, so no read base matches it.
pub const SEPARATOR: u8 = b'-';

/// Several assemblies joined into one sequence, separated by a single
/// [`SEPARATOR`] byte standing for a gap of unknown content.
#[derive(Debug, Clone)]
pub struct GappedAssembly {
    assembly: SupportedAssembly,
    sources: Vec<ExtendedAssembly>,
}

impl GappedAssembly {
    /// Join `sources` in order. Support already recorded on a source is carried
    /// over at the position of that source within the joined sequence.
    pub fn new(name: &str, sources: Vec<ExtendedAssembly>) -> Self {
        let mut assembly = SupportedAssembly::new(name, join_bases(&sources));
        for (source, segment_start) in sources.iter().zip(segment_starts(&sources)) {
            for entry in source.supported().support() {
                assembly.add_evidence_at(entry.record.clone(), segment_start + entry.offset);
            }
        }

        debug!(
            "Joined {} segments into {} ({} bp, {} support entries)",
            sources.len(),
            name,
            assembly.len(),
            assembly.support_count()
        );

        Self { assembly, sources }
    }

    pub fn supported(&self) -> &SupportedAssembly {
        &self.assembly
    }

    pub fn supported_mut(&mut self) -> &mut SupportedAssembly {
        &mut self.assembly
    }

    pub fn sources(&self) -> &[ExtendedAssembly] {
        &self.sources
    }

    /// Start of each source within the joined sequence
    pub fn segment_starts(&self) -> Vec<i64> {
        segment_starts(&self.sources)
    }

    pub fn add_evidence_at(&mut self, record: Arc<Record>, offset: i64) {
        self.assembly.add_evidence_at(record, offset);
    }

    /// Try each source in order and record support at the first one that
    /// matches, shifted to that source's position in the joined sequence.
    pub fn try_add_support<C: SupportChecker + ?Sized>(
        &mut self,
        checker: &C,
        record: &Arc<Record>,
    ) -> bool {
        if self.assembly.contains_support(record) {
            return true;
        }

        let mut segment_start = 0i64;
        for source in &self.sources {
            if let Some(local_offset) = checker.support_index(source.supported(), record) {
                self.assembly
                    .add_evidence_at(record.clone(), segment_start + local_offset);
                return true;
            }
            segment_start += source.len() as i64 + 1;
        }
        false
    }

    /// The joined assembly read from the opposite strand: every source is
    /// flipped and their order reversed.
    pub fn flip_strand(&self) -> GappedAssembly {
        let sources: Vec<ExtendedAssembly> =
            self.sources.iter().rev().map(|s| s.flip_strand()).collect();

        let mut assembly = SupportedAssembly::new(self.assembly.name(), join_bases(&sources));
        flip_support(&self.assembly, &mut assembly, self.len());
        GappedAssembly { assembly, sources }
    }
}

fn join_bases(sources: &[ExtendedAssembly]) -> Vec<u8> {
    let total_length =
        sources.iter().map(|s| s.len()).sum::<usize>() + sources.len().saturating_sub(1);
    let mut bases = Vec::with_capacity(total_length);
    for (i, source) in sources.iter().enumerate() {
        if i > 0 {
            bases.push(SEPARATOR);
        }
        bases.extend_from_slice(source.bases());
    }
    bases
}

fn segment_starts(sources: &[ExtendedAssembly]) -> Vec<i64> {
    let mut start = 0i64;
    sources
        .iter()
        .map(|source| {
            let current = start;
            start += source.len() as i64 + 1;
            current
        })
        .collect()
}

impl Sequence for GappedAssembly {
    fn bases(&self) -> &[u8] {
        self.assembly.bases()
    }

    fn base_quality(&self) -> &[u8] {
        self.assembly.base_quality()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(name: &str, bases: &[u8]) -> Arc<Record> {
        Arc::new(Record::new(name, bases.to_vec(), vec![30; bases.len()]).unwrap())
    }

    struct ExactChecker;

    impl SupportChecker for ExactChecker {
        fn support_index(&self, assembly: &SupportedAssembly, record: &Record) -> Option<i64> {
            assembly
                .bases()
                .windows(record.len())
                .position(|window| window == record.bases())
                .map(|i| i as i64)
        }

        fn supports_at(&self, assembly: &SupportedAssembly, record: &Record, offset: i64) -> bool {
            self.support_index(assembly, record) == Some(offset)
        }
    }

    fn two_segments() -> GappedAssembly {
        GappedAssembly::new(
            "gapped",
            vec![
                ExtendedAssembly::new("s0", b"AAACCC".to_vec()),
                ExtendedAssembly::new("s1", b"GGGTTTA".to_vec()),
            ],
        )
    }

    #[test]
    fn test_joined_bases() {
        let gapped = two_segments();
        assert_eq!(gapped.bases(), b"AAACCC-GGGTTTA");
        assert_eq!(gapped.segment_starts(), vec![0, 7]);
        assert_eq!(gapped.sources().len(), 2);
    }

    #[test]
    fn test_source_support_is_carried_over() {
        let mut s0 = ExtendedAssembly::new("s0", b"AAACCC".to_vec());
        let mut s1 = ExtendedAssembly::new("s1", b"GGGTTTA".to_vec());
        s0.add_evidence_at(read("a", b"ACC"), 2);
        s1.add_evidence_at(read("b", b"GTT"), 2);

        let gapped = GappedAssembly::new("gapped", vec![s0, s1]);
        let supported = gapped.supported();
        assert_eq!(supported.support_index(&read("a", b"")), Ok(2));
        assert_eq!(supported.support_index(&read("b", b"")), Ok(9));
    }

    #[test]
    fn test_support_in_second_segment() {
        let mut gapped = two_segments();
        let r = read("r", b"GTTT");
        assert!(gapped.try_add_support(&ExactChecker, &r));
        // len(s0) + separator + local offset
        assert_eq!(gapped.supported().support_index(&r), Ok(6 + 1 + 2));
        assert_eq!(gapped.base_quality()[9..13], [30, 30, 30, 30]);
        assert_eq!(gapped.base_quality()[6], 0);
    }

    #[test]
    fn test_first_matching_segment_wins() {
        let mut gapped = GappedAssembly::new(
            "gapped",
            vec![
                ExtendedAssembly::new("s0", b"ACGTAC".to_vec()),
                ExtendedAssembly::new("s1", b"TTACGT".to_vec()),
            ],
        );
        let r = read("r", b"ACGT");
        assert!(gapped.try_add_support(&ExactChecker, &r));
        assert_eq!(gapped.supported().support_index(&r), Ok(0));
    }

    #[test]
    fn test_no_segment_matches() {
        let mut gapped = two_segments();
        // spans the separator, so no single segment contains it
        assert!(!gapped.try_add_support(&ExactChecker, &read("r", b"CCGG")));
        assert_eq!(gapped.supported().support_count(), 0);
    }

    #[test]
    fn test_flip_strand() {
        let mut gapped = two_segments();
        let r = read("r", b"GTTT");
        gapped.try_add_support(&ExactChecker, &r);

        let flipped = gapped.flip_strand();
        assert_eq!(flipped.bases(), b"TAAACCC-GGGTTT");
        assert_eq!(flipped.sources()[0].supported().name(), "s1");
        assert_eq!(flipped.sources()[1].supported().name(), "s0");

        // 14 - 9 - 4
        let entry = flipped.supported().support().next().unwrap();
        assert_eq!(entry.offset, 1);
        assert_eq!(entry.record.bases(), b"AAAC");
        assert!(!flipped.supported().is_quality_stale());

        let back = flipped.flip_strand();
        assert_eq!(back.bases(), gapped.bases());
        assert!(back.supported().contains_support_at(&r, 9));
    }
}
