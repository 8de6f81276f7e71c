use crate::alignment::Alignment;
use crate::assembly::AssemblyError;
use crate::cigar::{self, CigarOp};
use crate::sequence::{reverse_complement, Sequence, Strand};
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

/// Placement of the other read of a pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MateInfo {
    pub chromosome: String,
    pub position: i64,
    pub strand: Strand,
    pub unmapped: bool,
}

/// An owned sequencing read.
///
/// Two records are equal when they share the read name and the first-of-pair
/// flag, so re-parsed or transformed copies of one read compare equal while the
/// two mates of a pair do not.
#[derive(Debug, Clone)]
pub struct Record {
    name: String,
    first_of_pair: bool,
    bases: Vec<u8>,
    base_quality: Vec<u8>,
    cigar: Vec<CigarOp>,
    chromosome: String,
    position: i64,
    mapping_quality: u8,
    strand: Strand,
    unmapped: bool,
    mate: Option<MateInfo>,
    blocks: OnceLock<Vec<Alignment>>,
}

impl Record {
    /// Create an unmapped, unpaired read
    pub fn new(name: &str, bases: Vec<u8>, base_quality: Vec<u8>) -> Result<Self, AssemblyError> {
        check_lengths(&bases, &base_quality)?;
        Ok(Self {
            name: name.to_string(),
            first_of_pair: false,
            bases,
            base_quality,
            cigar: Vec::new(),
            chromosome: crate::alignment::UNMAPPED.to_string(),
            position: 0,
            mapping_quality: 0,
            strand: Strand::Forward,
            unmapped: true,
            mate: None,
            blocks: OnceLock::new(),
        })
    }

    /// Place the read on the reference. `position` is 1-based.
    pub fn with_mapping(
        mut self,
        chromosome: &str,
        position: i64,
        cigar: Vec<CigarOp>,
        mapping_quality: u8,
        strand: Strand,
    ) -> Self {
        self.chromosome = chromosome.to_string();
        self.position = position;
        self.cigar = cigar;
        self.mapping_quality = mapping_quality;
        self.strand = strand;
        self.unmapped = false;
        self.blocks.take();
        self
    }

    pub fn with_mate(mut self, first_of_pair: bool, mate: Option<MateInfo>) -> Self {
        self.first_of_pair = first_of_pair;
        self.mate = mate;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_first_of_pair(&self) -> bool {
        self.first_of_pair
    }

    pub fn cigar(&self) -> &[CigarOp] {
        &self.cigar
    }

    pub fn chromosome(&self) -> &str {
        &self.chromosome
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn mapping_quality(&self) -> u8 {
        self.mapping_quality
    }

    pub fn strand(&self) -> Strand {
        self.strand
    }

    pub fn is_unmapped(&self) -> bool {
        self.unmapped
    }

    pub fn mate(&self) -> Option<&MateInfo> {
        self.mate.as_ref()
    }

    /// Reference bases spanned by the aligned part of the read
    pub fn reference_length(&self) -> i64 {
        cigar::reference_length(&self.cigar)
    }

    pub fn set_bases(&mut self, bases: Vec<u8>, base_quality: Vec<u8>) -> Result<(), AssemblyError> {
        check_lengths(&bases, &base_quality)?;
        self.bases = bases;
        self.base_quality = base_quality;
        self.blocks.take();
        Ok(())
    }

    pub fn set_chromosome(&mut self, chromosome: &str) {
        self.chromosome = chromosome.to_string();
        self.blocks.take();
    }

    pub fn set_position(&mut self, position: i64) {
        self.position = position;
        self.blocks.take();
    }

    pub fn set_cigar(&mut self, cigar: Vec<CigarOp>) {
        self.cigar = cigar;
        self.blocks.take();
    }

    /// Alignment blocks derived from the CIGAR, computed on first access.
    ///
    /// Matches produce mapped blocks, insertions produce unmapped blocks and
    /// soft clips produce placeholder blocks. Deletions and skips only move the
    /// reference position; they occupy no read bases and so emit nothing.
    pub fn alignment_blocks(&self) -> &[Alignment] {
        self.blocks.get_or_init(|| self.compute_alignment_blocks())
    }

    fn compute_alignment_blocks(&self) -> Vec<Alignment> {
        if self.unmapped {
            return vec![Alignment::unmapped(1, self.bases.len())];
        }

        let inverted = self.strand == Strand::Reverse;
        let mut blocks = Vec::with_capacity(self.cigar.len());
        let mut reference_position = self.position;
        let mut read_position = 1;

        for op in &self.cigar {
            let len = op.len() as usize;
            match op.op() {
                '=' | 'X' | 'M' => blocks.push(Alignment::mapped(
                    &self.chromosome,
                    reference_position,
                    read_position,
                    len,
                    inverted,
                    self.mapping_quality,
                )),
                'I' => blocks.push(Alignment::unmapped(read_position, len)),
                'S' => blocks.push(Alignment::soft_clipped(read_position, len)),
                _ => {}
            }
            reference_position += op.reference_delta();
            read_position += op.read_delta();
        }

        blocks
    }

    /// The same read as it would appear on the opposite strand
    pub fn reverse_complemented(&self) -> Record {
        let mut flipped = self.clone();
        let qualities = self.base_quality.iter().rev().copied().collect();
        flipped.bases = reverse_complement(&self.bases);
        flipped.base_quality = qualities;
        flipped.strand = self.strand.flip();
        flipped.cigar = self.cigar.iter().rev().copied().collect();
        flipped.blocks.take();
        flipped
    }

    /// Remove bases from both ends of the read, rewriting CIGAR and position.
    ///
    /// Returns `None` if no bases would remain.
    pub fn trimmed(&self, remove_left: usize, remove_right: usize) -> Option<Record> {
        let length = self.bases.len();
        if remove_left.saturating_add(remove_right) >= length {
            return None;
        }
        let end = length - remove_right;

        let mut trimmed = self.clone();
        trimmed
            .set_bases(
                self.bases[remove_left..end].to_vec(),
                self.base_quality[remove_left..end].to_vec(),
            )
            .ok()?;

        if !self.unmapped && !self.cigar.is_empty() {
            let (front_clipped, reference_shift) = clip_cigar_front(&self.cigar, remove_left);
            let mut reversed: Vec<CigarOp> = front_clipped.into_iter().rev().collect();
            reversed = clip_cigar_front(&reversed, remove_right).0;
            trimmed.set_cigar(reversed.into_iter().rev().collect());
            trimmed.set_position(self.position + reference_shift);
        }

        Some(trimmed)
    }
}

fn check_lengths(bases: &[u8], base_quality: &[u8]) -> Result<(), AssemblyError> {
    if bases.len() != base_quality.len() {
        return Err(AssemblyError::LengthMismatch {
            bases: bases.len(),
            qualities: base_quality.len(),
        });
    }
    Ok(())
}

/// Drop `remove` read bases from the start of the CIGAR. Returns the remaining
/// operations and the number of reference bases consumed by the dropped part.
fn clip_cigar_front(ops: &[CigarOp], remove: usize) -> (Vec<CigarOp>, i64) {
    if remove == 0 {
        return (ops.to_vec(), 0);
    }

    let mut remaining = remove;
    let mut reference_shift = 0;
    let mut idx = 0;
    let mut clipped = Vec::with_capacity(ops.len());

    while idx < ops.len() {
        let op = ops[idx];
        idx += 1;
        if remaining == 0 {
            // A cut must not leave the read starting with a deletion
            if op.consumes_reference() && !op.consumes_read() {
                reference_shift += op.reference_delta();
                continue;
            }
            clipped.push(op);
            break;
        }
        if !op.consumes_read() {
            if op.consumes_reference() {
                reference_shift += op.reference_delta();
            } else if op.op() == 'H' {
                // hard clips stay at the end they belong to
                clipped.push(op);
            }
            continue;
        }

        let len = op.len() as usize;
        if len <= remaining {
            remaining -= len;
            reference_shift += op.reference_delta();
        } else {
            if op.consumes_reference() {
                reference_shift += remaining as i64;
            }
            clipped.push(op.with_len((len - remaining) as u32));
            remaining = 0;
            break;
        }
    }

    clipped.extend_from_slice(&ops[idx..]);
    (clipped, reference_shift)
}

impl Sequence for Record {
    fn bases(&self) -> &[u8] {
        &self.bases
    }

    fn base_quality(&self) -> &[u8] {
        &self.base_quality
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.first_of_pair == other.first_of_pair && self.name == other.name
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.first_of_pair.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::{SOFT_CLIPPED, UNMAPPED};
    use crate::cigar::{cigar_to_string, parse_cigar};

    fn mapped_read(cigar: &str) -> Record {
        let ops = parse_cigar(cigar).unwrap();
        let len = cigar::read_length(&ops);
        Record::new("read1", vec![b'A'; len], vec![30; len])
            .unwrap()
            .with_mapping("chr1", 100, ops, 60, Strand::Forward)
    }

    #[test]
    fn test_unmapped_blocks() {
        let record = Record::new("r", b"ACGTACGT".to_vec(), vec![20; 8]).unwrap();
        let blocks = record.alignment_blocks();
        assert_eq!(blocks, &[Alignment::unmapped(1, 8)]);
        assert_eq!(blocks[0].chromosome, UNMAPPED);
    }

    #[test]
    fn test_alignment_blocks_from_cigar() {
        let record = mapped_read("5S10M2I3D20M");
        let blocks = record.alignment_blocks();
        assert_eq!(
            blocks,
            &[
                Alignment::soft_clipped(1, 5),
                Alignment::mapped("chr1", 100, 6, 10, false, 60),
                Alignment::unmapped(16, 2),
                // the deletion advances the reference by 3
                Alignment::mapped("chr1", 113, 18, 20, false, 60),
            ]
        );
        assert_eq!(blocks[0].chromosome, SOFT_CLIPPED);
    }

    #[test]
    fn test_mutation_invalidates_blocks() {
        let mut record = mapped_read("10M");
        assert_eq!(record.alignment_blocks()[0].reference_start, 100);

        record.set_position(200);
        assert_eq!(record.alignment_blocks()[0].reference_start, 200);

        record.set_chromosome("chr7");
        assert_eq!(record.alignment_blocks()[0].chromosome, "chr7");

        record.set_cigar(parse_cigar("4S6M").unwrap());
        assert_eq!(record.alignment_blocks().len(), 2);

        assert!(record.set_bases(vec![b'C'; 3], vec![10; 2]).is_err());
    }

    #[test]
    fn test_identity_by_name_and_pair_flag() {
        let a = Record::new("frag", b"ACGT".to_vec(), vec![30; 4]).unwrap();
        let b = Record::new("frag", b"TTTT".to_vec(), vec![10; 4]).unwrap();
        let mate = Record::new("frag", b"ACGT".to_vec(), vec![30; 4])
            .unwrap()
            .with_mate(true, None);
        assert_eq!(a, b);
        assert_ne!(a, mate);
        assert_eq!(a, a.reverse_complemented());
    }

    #[test]
    fn test_reverse_complemented() {
        let record = Record::new("r", b"AACG".to_vec(), vec![1, 2, 3, 4])
            .unwrap()
            .with_mapping("chr1", 10, parse_cigar("1S3M").unwrap(), 30, Strand::Forward);
        let flipped = record.reverse_complemented();
        assert_eq!(flipped.bases(), b"CGTT");
        assert_eq!(flipped.base_quality(), &[4, 3, 2, 1]);
        assert_eq!(flipped.strand(), Strand::Reverse);
        assert_eq!(cigar_to_string(flipped.cigar()), "3M1S");
        assert!(flipped.alignment_blocks()[0].inverted);

        let back = flipped.reverse_complemented();
        assert_eq!(back.bases(), record.bases());
        assert_eq!(back.strand(), Strand::Forward);
    }

    #[test]
    fn test_trimmed_cigar_and_position() {
        let record = mapped_read("5S10M2I3D20M");

        let trimmed = record.trimmed(7, 0).unwrap();
        assert_eq!(cigar_to_string(trimmed.cigar()), "8M2I3D20M");
        assert_eq!(trimmed.position(), 102);
        assert_eq!(trimmed.len(), 30);

        let trimmed = record.trimmed(17, 0).unwrap();
        assert_eq!(cigar_to_string(trimmed.cigar()), "20M");
        assert_eq!(trimmed.position(), 113);

        let trimmed = record.trimmed(0, 25).unwrap();
        assert_eq!(cigar_to_string(trimmed.cigar()), "5S7M");
        assert_eq!(trimmed.position(), 100);
        assert_eq!(trimmed.len(), 12);

        assert!(record.trimmed(20, 17).is_none());
        assert!(record.trimmed(usize::MAX, 1).is_none());
        assert!(record.trimmed(1, usize::MAX).is_none());
    }

    #[test]
    fn test_blocks_with_clips_skips_and_padding() {
        let record = mapped_read("3H2S4M5N4M1P2I3H");
        assert_eq!(
            record.alignment_blocks(),
            &[
                Alignment::soft_clipped(1, 2),
                Alignment::mapped("chr1", 100, 3, 4, false, 60),
                Alignment::mapped("chr1", 109, 7, 4, false, 60),
                Alignment::unmapped(11, 2),
            ]
        );
    }

    #[test]
    fn test_trimmed_keeps_hard_clips() {
        let record = mapped_read("3H2S4M5N4M1P2I3H");
        assert_eq!(record.len(), 12);

        let trimmed = record.trimmed(3, 1).unwrap();
        assert_eq!(cigar_to_string(trimmed.cigar()), "3H3M5N4M1P1I3H");
        assert_eq!(trimmed.position(), 101);

        // the skip next to the cut is dropped along with the matches before it
        let trimmed = record.trimmed(6, 3).unwrap();
        assert_eq!(cigar_to_string(trimmed.cigar()), "3H3M3H");
        assert_eq!(trimmed.position(), 109);
        assert_eq!(
            trimmed.alignment_blocks(),
            &[Alignment::mapped("chr1", 109, 1, 3, false, 60)]
        );
    }
}
