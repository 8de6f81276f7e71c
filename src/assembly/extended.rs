use super::{flip_support, shift_support, SupportedAssembly};
use crate::record::Record;
use crate::sequence::{reverse_complement, Sequence};
use crate::support::SupportChecker;
use log::debug;
use std::any::Any;
use std::sync::Arc;

/// Handle to a diagram produced elsewhere; stored and forwarded untouched
#[derive(Clone)]
pub struct DiagramHandle(Arc<dyn Any + Send + Sync>);

impl DiagramHandle {
    pub fn new<T: Any + Send + Sync>(diagram: T) -> Self {
        Self(Arc::new(diagram))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl std::fmt::Debug for DiagramHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DiagramHandle")
    }
}

/// An assembly that is still being extended with new support.
///
/// `trim` and `flip_strand` never modify the receiver; they return new
/// assemblies that keep the same source and diagrams.
#[derive(Debug, Clone)]
pub struct ExtendedAssembly {
    assembly: SupportedAssembly,
    source: Option<Arc<SupportedAssembly>>,
    diagrams: Vec<DiagramHandle>,
}

impl ExtendedAssembly {
    pub fn new(name: &str, bases: Vec<u8>) -> Self {
        Self {
            assembly: SupportedAssembly::new(name, bases),
            source: None,
            diagrams: Vec::new(),
        }
    }

    /// An assembly grown out of `source`
    pub fn extended_from(source: Arc<SupportedAssembly>, name: &str, bases: Vec<u8>) -> Self {
        Self {
            assembly: SupportedAssembly::new(name, bases),
            source: Some(source),
            diagrams: Vec::new(),
        }
    }

    pub fn supported(&self) -> &SupportedAssembly {
        &self.assembly
    }

    pub fn supported_mut(&mut self) -> &mut SupportedAssembly {
        &mut self.assembly
    }

    pub fn source(&self) -> Option<&Arc<SupportedAssembly>> {
        self.source.as_ref()
    }

    pub fn diagrams(&self) -> &[DiagramHandle] {
        &self.diagrams
    }

    pub fn add_diagram(&mut self, diagram: DiagramHandle) {
        self.diagrams.push(diagram);
    }

    pub fn add_evidence_at(&mut self, record: Arc<Record>, offset: i64) {
        self.assembly.add_evidence_at(record, offset);
    }

    pub fn try_add_support<C: SupportChecker + ?Sized>(
        &mut self,
        checker: &C,
        record: &Arc<Record>,
        suggested_index: Option<i64>,
    ) -> bool {
        self.assembly.try_add_support(checker, record, suggested_index)
    }

    fn derived(&self, assembly: SupportedAssembly) -> Self {
        Self {
            assembly,
            source: self.source.clone(),
            diagrams: self.diagrams.clone(),
        }
    }

    /// Remove bases from both ends.
    ///
    /// Support starting inside the kept window moves along with it; all other
    /// support is dropped. Returns `None` when nothing would remain.
    pub fn trim(&self, remove_left: usize, remove_right: usize) -> Option<ExtendedAssembly> {
        let new_length = self
            .len()
            .checked_sub(remove_left.saturating_add(remove_right))
            .filter(|&n| n > 0)?;

        let bases = self.bases()[remove_left..remove_left + new_length].to_vec();
        let mut trimmed = SupportedAssembly::new(self.assembly.name(), bases);
        let dropped = shift_support(&self.assembly, &mut trimmed, remove_left as i64, new_length);
        if dropped > 0 {
            debug!(
                "Trimming {} by {}/{} dropped {} of {} support entries",
                self.assembly.name(),
                remove_left,
                remove_right,
                dropped,
                self.assembly.support_count()
            );
        }

        Some(self.derived(trimmed))
    }

    /// The same assembly read from the opposite strand, with quality computed
    pub fn flip_strand(&self) -> ExtendedAssembly {
        let mut flipped =
            SupportedAssembly::new(self.assembly.name(), reverse_complement(self.bases()));
        flip_support(&self.assembly, &mut flipped, self.len());
        self.derived(flipped)
    }
}

impl Sequence for ExtendedAssembly {
    fn bases(&self) -> &[u8] {
        self.assembly.bases()
    }

    fn base_quality(&self) -> &[u8] {
        self.assembly.base_quality()
    }
}
