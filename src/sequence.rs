use serde::{Deserialize, Serialize};

/// Read-only access to a base sequence and its per-base qualities.
///
/// Implementors guarantee `bases().len() == base_quality().len()`.
pub trait Sequence {
    fn bases(&self) -> &[u8];

    fn base_quality(&self) -> &[u8];

    fn len(&self) -> usize {
        self.bases().len()
    }

    fn is_empty(&self) -> bool {
        self.bases().is_empty()
    }
}

/// Strand orientation of a read relative to the reference
#[derive(Default, PartialEq, Eq, Clone, Copy, Debug, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Strand {
    #[default]
    Forward,
    Reverse,
}

impl Strand {
    pub fn flip(self) -> Self {
        match self {
            Strand::Forward => Strand::Reverse,
            Strand::Reverse => Strand::Forward,
        }
    }
}

pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'a' => b't',
        b't' => b'a',
        b'c' => b'g',
        b'g' => b'c',
        _ => base,
    }
}

pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&base| complement(base)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement(b"ACGTN"), b"NACGT".to_vec());
        assert_eq!(reverse_complement(b"aacG"), b"Cgtt".to_vec());
        assert_eq!(reverse_complement(b""), Vec::<u8>::new());
    }

    #[test]
    fn test_strand_flip() {
        assert_eq!(Strand::default(), Strand::Forward);
        assert_eq!(Strand::Forward.flip(), Strand::Reverse);
        assert_eq!(Strand::Reverse.flip().flip(), Strand::Reverse);
    }
}
