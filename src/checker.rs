//! A plain mismatch-counting support checker.
//!
//! A read supports an assembly at an offset when the overlap between the two
//! is long enough and differs in few enough bases.

use crate::assembly::{overlap_window, SupportedAssembly};
use crate::record::Record;
use crate::sequence::Sequence;
use crate::support::SupportChecker;

/// Thresholds for [`MismatchChecker`]
#[derive(Debug, Clone)]
pub struct SupportConfig {
    /// Minimum number of read bases overlapping the assembly.
    /// Default: 16
    pub min_overlap: usize,

    /// Maximum number of mismatching bases within the overlap.
    /// Default: 1
    pub max_mismatches: usize,
}

impl Default for SupportConfig {
    fn default() -> Self {
        SupportConfig {
            min_overlap: 16,
            max_mismatches: 1,
        }
    }
}

pub struct MismatchChecker {
    config: SupportConfig,
}

impl MismatchChecker {
    pub fn new(config: SupportConfig) -> Self {
        Self { config }
    }

    /// Mismatches and overlap length at `offset`, or `None` if the overlap is too short
    fn score(&self, assembly: &[u8], read: &[u8], offset: i64) -> Option<(usize, usize)> {
        let (assembly_offset, read_offset, length) = overlap_window(assembly.len(), read.len(), offset)?;
        if length < self.config.min_overlap.max(1) {
            return None;
        }

        let mut mismatches = 0;
        for (a, r) in assembly[assembly_offset..assembly_offset + length]
            .iter()
            .zip(&read[read_offset..read_offset + length])
        {
            if !a.eq_ignore_ascii_case(r) {
                mismatches += 1;
                if mismatches > self.config.max_mismatches {
                    return None;
                }
            }
        }
        Some((mismatches, length))
    }
}

impl SupportChecker for MismatchChecker {
    /// The offset with the fewest mismatches, preferring longer overlaps and
    /// then smaller offsets.
    fn support_index(&self, assembly: &SupportedAssembly, record: &Record) -> Option<i64> {
        let min_overlap = self.config.min_overlap.max(1) as i64;
        let first = min_overlap - record.len() as i64;
        let last = assembly.len() as i64 - min_overlap;

        let mut best: Option<(usize, usize, i64)> = None;
        for offset in first..=last {
            if let Some((mismatches, length)) = self.score(assembly.bases(), record.bases(), offset) {
                let better = match best {
                    None => true,
                    Some((best_mismatches, best_length, _)) => {
                        mismatches < best_mismatches
                            || (mismatches == best_mismatches && length > best_length)
                    }
                };
                if better {
                    best = Some((mismatches, length, offset));
                }
            }
        }
        best.map(|(_, _, offset)| offset)
    }

    fn supports_at(&self, assembly: &SupportedAssembly, record: &Record, offset: i64) -> bool {
        self.score(assembly.bases(), record.bases(), offset).is_some()
    }
}
