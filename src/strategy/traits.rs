// src/strategy/traits.rs

use crate::model::record::{InventoryRecord, ParetoClass};
use std::fmt::Debug;

/// Per-record context shared by all adjustment terms.
#[derive(Debug, Clone, Copy)]
pub struct TermContext {
    /// Pareto bucket after normalisation (X/A/B/C).
    pub pareto: ParetoClass,
}

/// Which buffer a term represents; engines route per-term values by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermKind {
    Safety,
    Reschedule,
    Pareto,
}

impl TermKind {
    pub fn name(self) -> &'static str {
        match self {
            TermKind::Safety => "safety",
            TermKind::Reschedule => "reschedule",
            TermKind::Pareto => "pareto",
        }
    }
}

/// One additive buffer on top of the policy DOI.
///
/// Terms are pure: the same record and context always give the same number.
/// We require `Send` + `Sync` so an engine can be shared across threads.
pub trait AdjustmentTerm: Debug + Send + Sync {
    fn kind(&self) -> TermKind;

    /// Short name used in logs and reports.
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Days to add to the baseline DOI. Must be finite; zero when the
    /// inputs cannot support the calculation.
    fn days(&self, record: &InventoryRecord, context: &TermContext) -> f64;
}
