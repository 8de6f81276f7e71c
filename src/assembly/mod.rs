//! Assemblies: consensus sequences together with the reads that support them.

pub mod aligned;
pub mod extended;
pub mod gapped;

pub use aligned::AlignedAssembly;
pub use extended::{DiagramHandle, ExtendedAssembly};
pub use gapped::GappedAssembly;

use crate::record::Record;
use crate::sequence::Sequence;
use crate::support::{SupportChecker, SupportEntry, SupportIter, SupportRegistry};
use log::debug;
use rustc_hash::FxHashSet;
use std::sync::{Arc, OnceLock};

#[derive(Debug, PartialEq)]
pub enum AssemblyError {
    SupportNotFound { fragment: String },
    InvalidAlignment(String),
    LengthMismatch { bases: usize, qualities: usize },
}

impl std::fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssemblyError::SupportNotFound { fragment } => {
                write!(f, "No support recorded for read '{fragment}'")
            }
            AssemblyError::InvalidAlignment(msg) => write!(f, "Invalid alignment: {msg}"),
            AssemblyError::LengthMismatch { bases, qualities } => write!(
                f,
                "Sequence has {bases} bases but {qualities} quality values"
            ),
        }
    }
}

impl std::error::Error for AssemblyError {}

/// Per-position evidence gathered from all support entries
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BaseEvidence {
    /// Sum of qualities of read bases agreeing with the assembly
    pub support: Vec<u64>,
    /// Sum of qualities of read bases disagreeing with the assembly
    pub contradiction: Vec<u64>,
    /// Highest single agreeing quality
    pub max_support_quality: Vec<u8>,
}

#[derive(Debug, Clone)]
struct QualityModel {
    base_quality: Vec<u8>,
    average: u8,
}

/// A consensus sequence plus the reads supporting it.
///
/// Per-base quality is derived from the support and recomputed on the first
/// read after any change to the support.
#[derive(Debug, Clone)]
pub struct SupportedAssembly {
    name: String,
    bases: Vec<u8>,
    support: SupportRegistry,
    quality: OnceLock<QualityModel>,
}

impl SupportedAssembly {
    pub fn new(name: &str, bases: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            bases,
            support: SupportRegistry::new(),
            quality: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record that `record` placed at `offset` supports this assembly.
    /// Adding the same record at the same offset again has no effect.
    pub fn add_evidence_at(&mut self, record: Arc<Record>, offset: i64) {
        if self.support.insert(record, offset) {
            self.quality.take();
        }
    }

    /// Ask `checker` where `record` supports this assembly and record it.
    ///
    /// `suggested_index` is tried first when given. Returns `false`, leaving the
    /// assembly untouched, if the read does not support it anywhere.
    pub fn try_add_support<C: SupportChecker + ?Sized>(
        &mut self,
        checker: &C,
        record: &Arc<Record>,
        suggested_index: Option<i64>,
    ) -> bool {
        if self.contains_support(record) {
            return true;
        }

        let offset = match suggested_index {
            Some(index) if checker.supports_at(self, record, index) => Some(index),
            _ => checker.support_index(self, record),
        };

        match offset {
            Some(offset) => {
                self.add_evidence_at(record.clone(), offset);
                true
            }
            None => false,
        }
    }

    pub fn contains_support(&self, record: &Record) -> bool {
        self.support.contains(record)
    }

    pub fn contains_support_at(&self, record: &Record, offset: i64) -> bool {
        self.support.contains_at(record, offset)
    }

    pub fn support_count(&self) -> usize {
        self.support.len()
    }

    pub fn support_fragments(&self) -> FxHashSet<&str> {
        self.support.fragments()
    }

    pub fn support(&self) -> SupportIter<'_> {
        self.support.iter()
    }

    pub fn support_records(&self) -> impl ExactSizeIterator<Item = &Arc<Record>> + Clone + '_ {
        self.support.iter().map(|entry| &entry.record)
    }

    pub fn fragment_support<'a>(&'a self, fragment: &str) -> impl Iterator<Item = &'a SupportEntry> + 'a {
        self.support.fragment(fragment)
    }

    /// Offset at which `record` was first recorded.
    ///
    /// Callers are expected to have checked [`Self::contains_support`].
    pub fn support_index(&self, record: &Record) -> Result<i64, AssemblyError> {
        self.support
            .index_of(record)
            .ok_or_else(|| AssemblyError::SupportNotFound {
                fragment: record.name().to_string(),
            })
    }

    pub fn compute_base_support_and_contradiction(&self) -> BaseEvidence {
        let length = self.bases.len();
        let mut evidence = BaseEvidence {
            support: vec![0; length],
            contradiction: vec![0; length],
            max_support_quality: vec![0; length],
        };

        for entry in self.support.iter() {
            let Some((assembly_offset, read_offset, overlap)) =
                overlap_window(length, entry.record.len(), entry.offset)
            else {
                continue;
            };

            let read_bases = entry.record.bases();
            let read_quality = entry.record.base_quality();
            for i in 0..overlap {
                let position = assembly_offset + i;
                let quality = read_quality[read_offset + i];
                if read_bases[read_offset + i] == self.bases[position] {
                    evidence.support[position] += quality as u64;
                    evidence.max_support_quality[position] =
                        evidence.max_support_quality[position].max(quality);
                } else {
                    evidence.contradiction[position] += quality as u64;
                }
            }
        }

        evidence
    }

    /// Number of support entries overlapping each position
    pub fn support_depth(&self) -> Vec<u32> {
        let length = self.bases.len();
        let mut depth = vec![0; length];
        for entry in self.support.iter() {
            if let Some((assembly_offset, _, overlap)) =
                overlap_window(length, entry.record.len(), entry.offset)
            {
                for count in &mut depth[assembly_offset..assembly_offset + overlap] {
                    *count += 1;
                }
            }
        }
        depth
    }

    /// Recompute the per-base quality now instead of on next access
    pub fn recalculate_base_quality(&mut self) {
        let model = self.compute_quality();
        self.quality = OnceLock::from(model);
    }

    pub fn average_base_quality(&self) -> u8 {
        self.quality_model().average
    }

    /// Whether the cached quality is out of date with the support
    pub fn is_quality_stale(&self) -> bool {
        self.quality.get().is_none()
    }

    fn quality_model(&self) -> &QualityModel {
        self.quality.get_or_init(|| self.compute_quality())
    }

    fn compute_quality(&self) -> QualityModel {
        let evidence = self.compute_base_support_and_contradiction();
        let base_quality: Vec<u8> = (0..self.bases.len())
            .map(|i| {
                let support = evidence.support[i];
                if support == 0 {
                    return 0;
                }
                let net = support.saturating_sub(evidence.contradiction[i]);
                (evidence.max_support_quality[i] as u64 * net / support) as u8
            })
            .collect();

        let average = if base_quality.is_empty() {
            0
        } else {
            let total: u64 = base_quality.iter().map(|&q| q as u64).sum();
            (total / base_quality.len() as u64) as u8
        };

        QualityModel {
            base_quality,
            average,
        }
    }
}

impl Sequence for SupportedAssembly {
    fn bases(&self) -> &[u8] {
        &self.bases
    }

    fn base_quality(&self) -> &[u8] {
        &self.quality_model().base_quality
    }
}

/// Window where a read of `read_length` placed at `offset` overlaps an assembly
/// of `assembly_length`: `(assembly_offset, read_offset, length)`.
pub(crate) fn overlap_window(
    assembly_length: usize,
    read_length: usize,
    offset: i64,
) -> Option<(usize, usize, usize)> {
    let assembly_offset = offset.max(0);
    let read_offset = (-offset).max(0);
    let length = (assembly_length as i64 - assembly_offset).min(read_length as i64 - read_offset);
    if length <= 0 {
        return None;
    }
    Some((assembly_offset as usize, read_offset as usize, length as usize))
}

/// Copy support from `from` into `into` shifted left by `shift`, keeping only
/// entries that start inside `[0, new_length)`. Returns the number dropped.
pub(crate) fn shift_support(
    from: &SupportedAssembly,
    into: &mut SupportedAssembly,
    shift: i64,
    new_length: usize,
) -> usize {
    let mut dropped = 0;
    for entry in from.support() {
        let offset = entry.offset - shift;
        if offset >= 0 && offset < new_length as i64 {
            into.add_evidence_at(entry.record.clone(), offset);
        } else {
            dropped += 1;
        }
    }
    dropped
}

/// Copy support from `from` into `into` as seen from the opposite strand of a
/// sequence of `total_length`, then refresh the quality of `into`.
///
/// The full read length is mirrored, even for reads that only partially
/// overlap the assembly.
pub(crate) fn flip_support(from: &SupportedAssembly, into: &mut SupportedAssembly, total_length: usize) {
    for entry in from.support() {
        let offset = total_length as i64 - entry.offset - entry.record.len() as i64;
        into.add_evidence_at(Arc::new(entry.record.reverse_complemented()), offset);
    }
    into.recalculate_base_quality();
}

/// Any of the assembly kinds produced while extending and placing contigs
#[derive(Debug, Clone)]
pub enum AssemblyVariant {
    Extended(ExtendedAssembly),
    Gapped(GappedAssembly),
    Aligned(AlignedAssembly),
}

impl AssemblyVariant {
    pub fn supported(&self) -> &SupportedAssembly {
        match self {
            AssemblyVariant::Extended(assembly) => assembly.supported(),
            AssemblyVariant::Gapped(assembly) => assembly.supported(),
            AssemblyVariant::Aligned(assembly) => assembly.supported(),
        }
    }

    pub fn name(&self) -> &str {
        self.supported().name()
    }

    pub fn flip_strand(&self) -> AssemblyVariant {
        debug!("Flipping assembly {}", self.name());
        match self {
            AssemblyVariant::Extended(assembly) => AssemblyVariant::Extended(assembly.flip_strand()),
            AssemblyVariant::Gapped(assembly) => AssemblyVariant::Gapped(assembly.flip_strand()),
            AssemblyVariant::Aligned(assembly) => AssemblyVariant::Aligned(assembly.flip_strand()),
        }
    }
}

impl From<ExtendedAssembly> for AssemblyVariant {
    fn from(assembly: ExtendedAssembly) -> Self {
        AssemblyVariant::Extended(assembly)
    }
}

impl From<GappedAssembly> for AssemblyVariant {
    fn from(assembly: GappedAssembly) -> Self {
        AssemblyVariant::Gapped(assembly)
    }
}

impl From<AlignedAssembly> for AssemblyVariant {
    fn from(assembly: AlignedAssembly) -> Self {
        AssemblyVariant::Aligned(assembly)
    }
}
