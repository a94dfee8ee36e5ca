// src/strategy/implementations.rs

use crate::model::record::{finite_or_zero, InventoryRecord};
use crate::planning::config::{DoiConfig, ParetoWeights};
use crate::strategy::optimization::effective_z;
use crate::strategy::traits::{AdjustmentTerm, TermContext, TermKind};

// =========================================================================
// 1. Safety Term (demand & lead-time variability)
// =========================================================================

/// Buffer for demand and lead-time variability.
///
/// Formula: Z * sqrt(lt_std^2 + lt^2 * (d_std / d_mean)^2) * scale
///
/// With no mean demand there is nothing to buffer, so the term is zero.
#[derive(Debug, Clone)]
pub struct SafetyTerm {
    z: f64,
    scale: f64,
}

impl SafetyTerm {
    pub fn new(z: f64, scale: f64) -> Self {
        Self { z, scale }
    }

    pub fn from_config(config: &DoiConfig) -> Self {
        Self::new(effective_z(config), config.safety_scale)
    }
}

impl AdjustmentTerm for SafetyTerm {
    fn kind(&self) -> TermKind {
        TermKind::Safety
    }

    fn days(&self, record: &InventoryRecord, _context: &TermContext) -> f64 {
        if record.avg_demand == 0.0 {
            return 0.0;
        }
        let cv = record.std_demand / record.avg_demand;
        let variance = record.lead_time_std.powi(2) + record.lead_time.powi(2) * cv.powi(2);
        finite_or_zero(self.z * variance.sqrt() * self.scale)
    }
}

// =========================================================================
// 2. Reschedule Term (unreliable inbound)
// =========================================================================

/// Buffer proportional to the share of inbound orders that got rescheduled.
///
/// Formula: scale * lead_time * (resched_count / total_inbound)
#[derive(Debug, Clone)]
pub struct RescheduleTerm {
    scale: f64,
}

impl RescheduleTerm {
    pub fn new(scale: f64) -> Self {
        Self { scale }
    }
}

impl AdjustmentTerm for RescheduleTerm {
    fn kind(&self) -> TermKind {
        TermKind::Reschedule
    }

    fn days(&self, record: &InventoryRecord, _context: &TermContext) -> f64 {
        // Missing or zero inbound counts as one order
        let inbound = if record.total_inbound == 0.0 {
            1.0
        } else {
            record.total_inbound
        };
        finite_or_zero(self.scale * record.lead_time * (record.resched_count / inbound))
    }
}

// =========================================================================
// 3. Pareto Term (sales contribution)
// =========================================================================

/// Flat buffer by pareto bucket: scale * weight[class].
#[derive(Debug, Clone)]
pub struct ParetoTerm {
    scale: f64,
    weights: ParetoWeights,
}

impl ParetoTerm {
    pub fn new(scale: f64, weights: ParetoWeights) -> Self {
        Self { scale, weights }
    }
}

impl AdjustmentTerm for ParetoTerm {
    fn kind(&self) -> TermKind {
        TermKind::Pareto
    }

    fn days(&self, _record: &InventoryRecord, context: &TermContext) -> f64 {
        finite_or_zero(self.scale * self.weights.weight(context.pareto))
    }
}

/// Builds the enabled terms for a configuration, in evaluation order.
pub fn terms_from_config(config: &DoiConfig) -> Vec<Box<dyn AdjustmentTerm>> {
    let mut terms: Vec<Box<dyn AdjustmentTerm>> = Vec::new();
    if config.include_safety {
        terms.push(Box::new(SafetyTerm::from_config(config)));
    }
    if config.include_reschedule {
        terms.push(Box::new(RescheduleTerm::new(config.reschedule_scale)));
    }
    if config.include_pareto {
        terms.push(Box::new(ParetoTerm::new(
            config.pareto_scale,
            config.pareto_weights.clone(),
        )));
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::ParetoClass;

    fn ctx(pareto: ParetoClass) -> TermContext {
        TermContext { pareto }
    }

    fn sample() -> InventoryRecord {
        InventoryRecord {
            lead_time: 5.0,
            lead_time_std: 2.0,
            avg_demand: 50.0,
            std_demand: 10.0,
            resched_count: 1.0,
            total_inbound: 10.0,
            ..InventoryRecord::new("160", "P1")
        }
    }

    #[test]
    fn safety_term_matches_formula() {
        let term = SafetyTerm::new(1.65, 0.5);
        let days = term.days(&sample(), &ctx(ParetoClass::A));
        assert!((days - 1.65 * 5.0_f64.sqrt() * 0.5).abs() < 1e-9);
    }

    #[test]
    fn safety_term_is_zero_without_demand() {
        // lead-time variability alone must not produce a buffer
        let record = InventoryRecord {
            avg_demand: 0.0,
            std_demand: 99.0,
            lead_time_std: 2.0,
            ..sample()
        };
        let term = SafetyTerm::new(1.65, 0.5);
        assert_eq!(term.days(&record, &ctx(ParetoClass::A)), 0.0);
    }

    #[test]
    fn reschedule_term_defaults_denominator_to_one() {
        let record = InventoryRecord {
            total_inbound: 0.0,
            resched_count: 2.0,
            ..sample()
        };
        let term = RescheduleTerm::new(0.5);
        assert!((term.days(&record, &ctx(ParetoClass::A)) - 0.5 * 5.0 * 2.0).abs() < 1e-12);
        assert!((term.days(&sample(), &ctx(ParetoClass::A)) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn pareto_term_uses_bucket_weight() {
        let term = ParetoTerm::new(0.5, ParetoWeights::default());
        assert_eq!(term.days(&sample(), &ctx(ParetoClass::A)), 0.5);
        assert_eq!(term.days(&sample(), &ctx(ParetoClass::B)), 0.375);
        assert_eq!(term.days(&sample(), &ctx(ParetoClass::C)), 0.25);
    }

    #[test]
    fn disabled_terms_are_not_built() {
        let mut cfg = DoiConfig::default();
        assert_eq!(terms_from_config(&cfg).len(), 3);
        cfg.include_safety = false;
        cfg.include_pareto = false;
        let kinds: Vec<_> = terms_from_config(&cfg).iter().map(|t| t.kind()).collect();
        assert_eq!(kinds, vec![TermKind::Reschedule]);
        assert_eq!(TermKind::Reschedule.name(), "reschedule");
    }
}
