// src/planning/engine.rs

use crate::model::metrics::{round2, DoiOutcome};
use crate::model::record::{finite_or_zero, InventoryRecord};
use crate::planning::config::DoiConfig;
use crate::strategy::implementations::terms_from_config;
use crate::strategy::traits::{AdjustmentTerm, TermContext, TermKind};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Computes the final (adjusted) DOI for inventory records.
///
/// The engine owns its configuration and never mutates it; evaluating the
/// same record twice yields the same outcome.
pub struct DoiEngine {
    config: DoiConfig,

    // The pluggable buffers; disabled terms are simply absent
    terms: Vec<Box<dyn AdjustmentTerm>>,
}

impl DoiEngine {
    pub fn new(config: DoiConfig) -> Self {
        let terms = terms_from_config(&config);
        debug!(
            terms = ?terms.iter().map(|t| t.name()).collect::<Vec<_>>(),
            damping = config.damping,
            "DOI engine ready"
        );
        Self { config, terms }
    }

    pub fn config(&self) -> &DoiConfig {
        &self.config
    }

    /// Final DOI for one record, rounded to 2 decimals.
    pub fn final_doi(&self, record: &InventoryRecord) -> f64 {
        self.evaluate(record).final_doi
    }

    pub fn evaluate(&self, record: &InventoryRecord) -> DoiOutcome {
        let baseline = finite_or_zero(record.doi_policy);
        let pareto = record.pareto_class();
        let context = TermContext { pareto };

        let mut outcome = DoiOutcome {
            location_id: record.location_id.clone(),
            product_id: record.product_id.clone(),
            product_type: record.product_type.clone(),
            pareto,
            demand_type: record.demand_type.clone(),
            doi_policy: round2(baseline),
            final_doi: round2(baseline),
            applied: false,
            safety_term: 0.0,
            reschedule_term: 0.0,
            pareto_term: 0.0,
            multiplier: 1.0,
        };

        if !self
            .config
            .filter
            .matches(pareto, &record.demand_type, &record.product_type)
        {
            return outcome;
        }

        let mut adjusted = baseline;
        for term in &self.terms {
            let days = term.days(record, &context);
            match term.kind() {
                TermKind::Safety => outcome.safety_term = days,
                TermKind::Reschedule => outcome.reschedule_term = days,
                TermKind::Pareto => outcome.pareto_term = days,
            }
            adjusted += days;
        }

        let multiplier = self.config.multiplier_for(&record.product_type);
        let final_doi = self.config.damping * adjusted * multiplier;

        outcome.applied = true;
        outcome.multiplier = multiplier;
        // Anything non-finite falls back to the unmodified baseline
        if final_doi.is_finite() {
            outcome.final_doi = round2(final_doi);
        }
        outcome
    }

    /// Evaluates every record, preserving input order.
    pub fn run(&self, records: &[InventoryRecord]) -> Vec<DoiOutcome> {
        let outcomes: Vec<DoiOutcome> = records.iter().map(|r| self.evaluate(r)).collect();
        let summary = DoiSummary::from_outcomes(&outcomes);
        info!(
            rows = summary.rows,
            applied = summary.applied,
            changed = summary.changed,
            "final DOI computed"
        );
        outcomes
    }
}

/// Roll-up of a DOI run for the console.
#[derive(Debug, Clone, PartialEq)]
pub struct DoiSummary {
    pub rows: usize,
    pub applied: usize,
    pub changed: usize,
    /// Mean final DOI per product type label.
    pub mean_final_by_type: BTreeMap<String, f64>,
}

impl DoiSummary {
    pub fn from_outcomes(outcomes: &[DoiOutcome]) -> Self {
        let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for o in outcomes {
            let entry = sums.entry(o.product_type.clone()).or_insert((0.0, 0));
            entry.0 += o.final_doi;
            entry.1 += 1;
        }

        Self {
            rows: outcomes.len(),
            applied: outcomes.iter().filter(|o| o.applied).count(),
            changed: outcomes.iter().filter(|o| o.changed()).count(),
            mean_final_by_type: sums
                .into_iter()
                .map(|(k, (sum, n))| (k, round2(sum / n as f64)))
                .collect(),
        }
    }
}
