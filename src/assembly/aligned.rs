use super::{flip_support, AssemblyError, GappedAssembly, SupportedAssembly};
use crate::alignment::{check_tiling, Alignment};
use crate::record::Record;
use crate::sequence::{reverse_complement, Sequence};
use log::debug;
use std::sync::Arc;

/// A junction between two consecutive mapped blocks whose reference placements
/// are not contiguous
#[derive(Debug, Clone, PartialEq)]
pub struct Breakend {
    pub left: Alignment,
    pub right: Alignment,
    /// Sequence bases between the two blocks that map nowhere
    pub inserted: usize,
}

/// A gapped assembly placed on the reference.
///
/// The alignment blocks are ordered by sequence position and cover the whole
/// assembly without gaps.
#[derive(Debug, Clone)]
pub struct AlignedAssembly {
    assembly: SupportedAssembly,
    source: GappedAssembly,
    alignment: Vec<Alignment>,
}

impl AlignedAssembly {
    pub fn new(source: GappedAssembly, alignment: Vec<Alignment>) -> Result<Self, AssemblyError> {
        check_tiling(&alignment, source.len()).map_err(AssemblyError::InvalidAlignment)?;

        let mut assembly = SupportedAssembly::new(source.supported().name(), source.bases().to_vec());
        for entry in source.supported().support() {
            assembly.add_evidence_at(entry.record.clone(), entry.offset);
        }

        debug!(
            "Placed {} on the reference with {} blocks ({} mapped)",
            assembly.name(),
            alignment.len(),
            alignment.iter().filter(|block| block.is_mapped()).count()
        );

        Ok(Self {
            assembly,
            source,
            alignment,
        })
    }

    pub fn supported(&self) -> &SupportedAssembly {
        &self.assembly
    }

    pub fn supported_mut(&mut self) -> &mut SupportedAssembly {
        &mut self.assembly
    }

    pub fn source(&self) -> &GappedAssembly {
        &self.source
    }

    pub fn alignment(&self) -> &[Alignment] {
        &self.alignment
    }

    pub fn add_evidence_at(&mut self, record: Arc<Record>, offset: i64) {
        self.assembly.add_evidence_at(record, offset);
    }

    /// Block covering a 1-based sequence position
    pub fn block_at(&self, sequence_position: usize) -> Option<&Alignment> {
        let idx = self
            .alignment
            .partition_point(|block| block.sequence_end() < sequence_position);
        self.alignment
            .get(idx)
            .filter(|block| block.contains(sequence_position))
    }

    /// Reference chromosome and 1-based position of a 1-based sequence
    /// position, if it lies in a mapped block.
    pub fn reference_position(&self, sequence_position: usize) -> Option<(&str, i64)> {
        let block = self.block_at(sequence_position)?;
        if !block.is_mapped() {
            return None;
        }
        let delta = (sequence_position - block.sequence_start) as i64;
        let position = if block.inverted {
            block.reference_end() - delta
        } else {
            block.reference_start + delta
        };
        Some((block.chromosome.as_str(), position))
    }

    /// Junctions between consecutive mapped blocks that do not continue each
    /// other on the reference: a change of chromosome or orientation, any
    /// reference gap or overlap, or unmapped sequence in between.
    pub fn breakends(&self) -> Vec<Breakend> {
        let mut breakends = Vec::new();
        let mut previous: Option<&Alignment> = None;
        let mut inserted = 0;

        for block in &self.alignment {
            if !block.is_mapped() {
                inserted += block.length;
                continue;
            }
            if let Some(left) = previous {
                let continues = left.chromosome == block.chromosome
                    && left.inverted == block.inverted
                    && if left.inverted {
                        block.reference_end() + 1 == left.reference_start
                    } else {
                        block.reference_start == left.reference_end() + 1
                    };
                if !continues || inserted > 0 {
                    breakends.push(Breakend {
                        left: left.clone(),
                        right: block.clone(),
                        inserted,
                    });
                }
            }
            previous = Some(block);
            inserted = 0;
        }

        breakends
    }

    /// The placed assembly read from the opposite strand.
    ///
    /// Mapped blocks keep their reference span and change orientation; all
    /// other blocks become plain unmapped blocks at the mirrored position.
    pub fn flip_strand(&self) -> AlignedAssembly {
        let total_length = self.len();
        let mut alignment: Vec<Alignment> = self
            .alignment
            .iter()
            .map(|block| {
                let sequence_start = total_length - (block.sequence_start - 1) - block.length + 1;
                if block.is_mapped() {
                    Alignment {
                        sequence_start,
                        inverted: !block.inverted,
                        ..block.clone()
                    }
                } else {
                    Alignment::unmapped(sequence_start, block.length)
                }
            })
            .collect();
        alignment.reverse();

        let mut assembly =
            SupportedAssembly::new(self.assembly.name(), reverse_complement(self.bases()));
        flip_support(&self.assembly, &mut assembly, total_length);

        AlignedAssembly {
            assembly,
            source: self.source.flip_strand(),
            alignment,
        }
    }
}

impl Sequence for AlignedAssembly {
    fn bases(&self) -> &[u8] {
        self.assembly.bases()
    }

    fn base_quality(&self) -> &[u8] {
        self.assembly.base_quality()
    }
}
