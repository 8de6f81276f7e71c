use serde::{Deserialize, Serialize};

/// One contiguous span of a sequence together with where (if anywhere) it maps
/// on the reference.
///
/// ## Coordinate conventions
/// - `sequence_start` is 1-based in sequence space.
/// - `reference_start` is 1-based in reference space, `0` for spans that do not map.
/// - Unmapped spans carry the [`UNMAPPED`] chromosome, soft-clipped spans the
///   [`SOFT_CLIPPED`] placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Alignment {
    pub chromosome: String,
    pub reference_start: i64,
    pub sequence_start: usize,
    pub length: usize,
    pub inverted: bool,
    pub quality: u8,
}

/// Chromosome sentinel for spans with no reference placement
pub const UNMAPPED: &str = "*";

/// Chromosome placeholder for soft-clipped spans
pub const SOFT_CLIPPED: &str = "?";

impl Alignment {
    pub fn mapped(
        chromosome: &str,
        reference_start: i64,
        sequence_start: usize,
        length: usize,
        inverted: bool,
        quality: u8,
    ) -> Self {
        Self {
            chromosome: chromosome.to_string(),
            reference_start,
            sequence_start,
            length,
            inverted,
            quality,
        }
    }

    pub fn unmapped(sequence_start: usize, length: usize) -> Self {
        Self {
            chromosome: UNMAPPED.to_string(),
            reference_start: 0,
            sequence_start,
            length,
            inverted: false,
            quality: 0,
        }
    }

    pub fn soft_clipped(sequence_start: usize, length: usize) -> Self {
        Self {
            chromosome: SOFT_CLIPPED.to_string(),
            reference_start: 0,
            sequence_start,
            length,
            inverted: false,
            quality: 0,
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.chromosome != UNMAPPED && self.chromosome != SOFT_CLIPPED
    }

    /// Last sequence position covered (1-based, inclusive)
    pub fn sequence_end(&self) -> usize {
        self.sequence_start + self.length - 1
    }

    /// Last reference position covered (1-based, inclusive)
    pub fn reference_end(&self) -> i64 {
        self.reference_start + self.length as i64 - 1
    }

    pub fn contains(&self, sequence_position: usize) -> bool {
        sequence_position >= self.sequence_start && sequence_position <= self.sequence_end()
    }
}

impl std::fmt::Display for Alignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_mapped() {
            write!(
                f,
                "{}:{}-{}{} [{}+{}] q{}",
                self.chromosome,
                self.reference_start,
                self.reference_end(),
                if self.inverted { "(-)" } else { "(+)" },
                self.sequence_start,
                self.length,
                self.quality
            )
        } else {
            write!(
                f,
                "{} [{}+{}]",
                self.chromosome, self.sequence_start, self.length
            )
        }
    }
}

/// Check that `blocks` cover sequence positions `1..=length` in order, without
/// gaps or overlaps.
pub fn check_tiling(blocks: &[Alignment], length: usize) -> Result<(), String> {
    let mut expected_start = 1;
    for block in blocks {
        if block.length == 0 {
            return Err(format!("Empty alignment block at {}", block.sequence_start));
        }
        if block.sequence_start != expected_start {
            return Err(format!(
                "Alignment block starts at {} but {} was expected",
                block.sequence_start, expected_start
            ));
        }
        expected_start += block.length;
    }
    if expected_start != length + 1 {
        return Err(format!(
            "Alignment blocks cover {} positions of a sequence of length {}",
            expected_start - 1,
            length
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_kinds() {
        let mapped = Alignment::mapped("chr1", 100, 1, 10, false, 60);
        assert!(mapped.is_mapped());
        assert_eq!(mapped.sequence_end(), 10);
        assert_eq!(mapped.reference_end(), 109);
        assert!(mapped.contains(1));
        assert!(mapped.contains(10));
        assert!(!mapped.contains(11));

        let unmapped = Alignment::unmapped(11, 5);
        assert!(!unmapped.is_mapped());
        assert_eq!(unmapped.reference_start, 0);

        let clipped = Alignment::soft_clipped(16, 5);
        assert!(!clipped.is_mapped());
        assert_eq!(clipped.chromosome, SOFT_CLIPPED);
    }

    #[test]
    fn test_check_tiling() {
        let blocks = vec![
            Alignment::soft_clipped(1, 3),
            Alignment::mapped("chr2", 50, 4, 7, true, 20),
        ];
        assert!(check_tiling(&blocks, 10).is_ok());
        assert!(check_tiling(&blocks, 11).is_err());

        let gapped = vec![
            Alignment::unmapped(1, 3),
            Alignment::unmapped(5, 6),
        ];
        assert!(check_tiling(&gapped, 10).is_err());
        assert!(check_tiling(&[], 0).is_ok());
    }
}
