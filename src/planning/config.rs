// src/planning/config.rs

use crate::error::PlannerError;
use crate::model::record::{same_label, ParetoClass};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

/// Bumped whenever a field changes meaning.
pub const SCHEMA_VERSION: u32 = 1;

/// Every knob the planner uses, for one invocation.
///
/// The whole struct is handed to the engines by value; nothing mutates it
/// after loading. Every field has a default so a partial JSON file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub schema_version: u32,
    pub doi: DoiConfig,
    pub last_bite: LastBiteConfig,
    pub oos: OosProjectionConfig,
    pub so_qty: SoQtyConfig,
    pub warehouse: WarehouseImpactConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            doi: DoiConfig::default(),
            last_bite: LastBiteConfig::default(),
            oos: OosProjectionConfig::default(),
            so_qty: SoQtyConfig::default(),
            warehouse: WarehouseImpactConfig::default(),
        }
    }
}

impl PlannerConfig {
    pub fn from_json(text: &str) -> Result<Self, PlannerError> {
        let config: PlannerConfig = serde_json::from_str(text)?;
        if config.schema_version != SCHEMA_VERSION {
            return Err(PlannerError::UnsupportedSchema {
                found: config.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        debug!(?config.doi, "configuration parsed");
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PlannerError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PlannerError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json(&text)?;
        info!(path = %path.display(), "loaded planner configuration");
        Ok(config)
    }

    /// Loads `path` when given, otherwise falls back to the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, PlannerError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

// =========================================================================
// Final DOI
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParetoWeights {
    pub x: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Default for ParetoWeights {
    fn default() -> Self {
        Self {
            x: 1.0,
            a: 1.0,
            b: 0.75,
            c: 0.5,
        }
    }
}

impl ParetoWeights {
    pub fn weight(&self, class: ParetoClass) -> f64 {
        match class {
            ParetoClass::X => self.x,
            ParetoClass::A => self.a,
            ParetoClass::B => self.b,
            ParetoClass::C => self.c,
        }
    }
}

/// Which records the DOI adjustment applies to. All three must match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyFilter {
    pub pareto_classes: BTreeSet<ParetoClass>,
    pub demand_types: Vec<String>,
    pub product_types: Vec<String>,
}

impl Default for ApplyFilter {
    fn default() -> Self {
        Self {
            pareto_classes: [ParetoClass::X, ParetoClass::A].into_iter().collect(),
            demand_types: vec!["Volatile".to_string()],
            product_types: vec!["Fresh".to_string(), "Frozen".to_string(), "Dry".to_string()],
        }
    }
}

impl ApplyFilter {
    pub fn matches(&self, pareto: ParetoClass, demand_type: &str, product_type: &str) -> bool {
        self.pareto_classes.contains(&pareto)
            && self.demand_types.iter().any(|d| same_label(d, demand_type))
            && self.product_types.iter().any(|p| same_label(p, product_type))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoiConfig {
    /// Service-level Z-score for the safety buffer.
    pub z_score: f64,
    /// When set, Z is derived from this probability instead of `z_score`.
    pub service_level: Option<f64>,
    /// Per-unit costs; when both are set (and no `service_level`), the
    /// service level is their critical ratio.
    pub stockout_cost: Option<f64>,
    pub holding_cost: Option<f64>,
    pub safety_scale: f64,
    pub reschedule_scale: f64,
    pub pareto_scale: f64,

    pub include_safety: bool,
    pub include_reschedule: bool,
    pub include_pareto: bool,
    pub include_multiplier: bool,

    pub pareto_weights: ParetoWeights,
    pub product_type_multipliers: BTreeMap<String, f64>,
    pub filter: ApplyFilter,

    /// Business calibration applied to the whole adjusted DOI.
    pub damping: f64,
}

impl Default for DoiConfig {
    fn default() -> Self {
        let mut multipliers = BTreeMap::new();
        multipliers.insert("Fresh".to_string(), 1.1);
        multipliers.insert("Frozen".to_string(), 1.05);
        multipliers.insert("Dry".to_string(), 1.0);

        Self {
            z_score: 1.65,
            service_level: None,
            stockout_cost: None,
            holding_cost: None,
            safety_scale: 0.5,
            reschedule_scale: 0.5,
            pareto_scale: 0.5,
            include_safety: true,
            include_reschedule: true,
            include_pareto: true,
            include_multiplier: true,
            pareto_weights: ParetoWeights::default(),
            product_type_multipliers: multipliers,
            filter: ApplyFilter::default(),
            damping: 0.7,
        }
    }
}

impl DoiConfig {
    /// Multiplier for a product type; 1.0 when unknown or switched off.
    pub fn multiplier_for(&self, product_type: &str) -> f64 {
        if !self.include_multiplier {
            return 1.0;
        }
        self.product_type_multipliers
            .iter()
            .find(|(name, _)| same_label(name, product_type))
            .map(|(_, m)| *m)
            .filter(|m| m.is_finite())
            .unwrap_or(1.0)
    }
}

// =========================================================================
// Extra stock ("last bite")
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LastBiteConfig {
    /// Per-SKU: a required sales lift at or above this ratio is rejected.
    pub sku_lift_threshold: f64,
    /// Brand aggregate: only a lift strictly below this ratio proceeds.
    pub brand_lift_threshold: f64,
    pub months_per_year: f64,
}

impl Default for LastBiteConfig {
    fn default() -> Self {
        Self {
            sku_lift_threshold: 2.0,
            brand_lift_threshold: 0.02,
            months_per_year: 12.0,
        }
    }
}

// =========================================================================
// OOS projection
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupplyPools {
    pub primary: f64,
    pub secondary: f64,
}

impl SupplyPools {
    pub fn total(&self) -> f64 {
        self.primary + self.secondary
    }
}

/// How non-pinned days are projected. Tagged by `kind`; every model's
/// fields default, so `{ "kind": "recovery" }` alone is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProjectionModel {
    Recovery(RecoveryModel),
    Shortfall(ShortfallModel),
    HistoricalBlend(BlendModel),
    Trend(TrendModel),
}

impl Default for ProjectionModel {
    fn default() -> Self {
        ProjectionModel::Recovery(RecoveryModel::default())
    }
}

/// Linear recovery after the cutover, then demand-proportional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryModel {
    pub recovery_start_pct: f64,
    pub recovery_drop_pct: f64,
    pub recovery_days: i64,
    pub demand_divisor: f64,
    pub secondary_floor: f64,
    pub secondary_span: f64,
    pub supply_weight: f64,
}

impl Default for RecoveryModel {
    fn default() -> Self {
        Self {
            recovery_start_pct: 12.0,
            recovery_drop_pct: 3.0,
            recovery_days: 7,
            demand_divisor: 22_000.0,
            secondary_floor: 40_000.0,
            secondary_span: 35_000.0,
            supply_weight: 0.5,
        }
    }
}

/// Per-SKU forecast shortfall against its pool, averaged per day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortfallModel {
    pub base_rate_pct: f64,
    /// Products served from the secondary pool; everything else is primary.
    pub secondary_products: BTreeSet<String>,
}

impl Default for ShortfallModel {
    fn default() -> Self {
        Self {
            base_rate_pct: 13.85,
            secondary_products: BTreeSet::new(),
        }
    }
}

/// A pool with no outbound on one date, and the OOS% it adds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZeroOutboundDay {
    pub date: NaiveDate,
    pub pool: Pool,
    pub bump_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pool {
    Primary,
    Secondary,
}

/// Trailing observed OOS%, scaled by supply against its history and by
/// demand against the peak forecast day.
///
/// base      = mean of the last `lookback` observations before `date - lag_days`
/// supply    = total / historical average; above 1 shrinks OOS (floored),
///             below 1 grows it (capped)
/// demand    = day total / max day total * demand_weight
/// decay     = 1 - day_index * decay_rate * (1 + supply factor)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendModel {
    pub lookback: usize,
    pub lag_days: i64,
    /// Used when there is no observation to average.
    pub fallback_pct: f64,
    /// From this date on, the base is reduced by `step_decrease_pct`.
    pub decrease_from: Option<NaiveDate>,
    pub step_decrease_pct: f64,
    pub decay_rate: f64,
    pub surplus_sensitivity: f64,
    pub surplus_floor: f64,
    pub deficit_sensitivity: f64,
    pub deficit_cap: f64,
    pub demand_weight: f64,
    /// Average supply assumed when no supply history is given.
    pub default_avg_supply: f64,
    /// One-off multipliers for known stock build-ups.
    pub day_factors: BTreeMap<NaiveDate, f64>,
    pub zero_outbound: Vec<ZeroOutboundDay>,
}

impl Default for BlendModel {
    fn default() -> Self {
        Self {
            lookback: 3,
            lag_days: 3,
            fallback_pct: 12.0,
            decrease_from: None,
            step_decrease_pct: 0.015,
            decay_rate: 0.00015,
            surplus_sensitivity: 0.3,
            surplus_floor: 0.7,
            deficit_sensitivity: 0.5,
            deficit_cap: 1.35,
            demand_weight: 1.15,
            default_avg_supply: 180_000.0,
            day_factors: BTreeMap::new(),
            zero_outbound: Vec::new(),
        }
    }
}

/// Carries the recent observed trend forward day by day, with supply on
/// unobserved dates forecast as a rolling mean of the prior days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendModel {
    /// Observations used for the mean day-over-day change.
    pub trend_window: usize,
    /// Days averaged for the rolling supply forecast.
    pub supply_window: usize,
    pub fallback_pct: f64,
}

impl Default for TrendModel {
    fn default() -> Self {
        Self {
            trend_window: 7,
            supply_window: 7,
            fallback_pct: 12.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OosProjectionConfig {
    pub start_date: NaiveDate,
    pub horizon_days: u32,
    pub cutover_date: NaiveDate,
    pub supply_before: SupplyPools,
    pub supply_after: SupplyPools,
    /// Observed OOS% for calibration dates; always wins over the model.
    pub pinned: BTreeMap<NaiveDate, f64>,
    pub model: ProjectionModel,
}

impl Default for OosProjectionConfig {
    fn default() -> Self {
        let pinned = [
            ((2025, 2, 28), 13.37),
            ((2025, 3, 1), 13.43),
            ((2025, 3, 2), 13.44),
            ((2025, 3, 3), 13.51),
            ((2025, 3, 4), 13.66),
            ((2025, 3, 5), 13.71),
            ((2025, 3, 6), 13.73),
            ((2025, 3, 7), 13.83),
            ((2025, 3, 8), 13.85),
            ((2025, 3, 9), 12.63),
        ]
        .into_iter()
        .filter_map(|((y, m, d), pct)| NaiveDate::from_ymd_opt(y, m, d).map(|date| (date, pct)))
        .collect();

        Self {
            start_date: ymd(2025, 2, 28),
            horizon_days: 62,
            cutover_date: ymd(2025, 3, 9),
            supply_before: SupplyPools {
                primary: 100_000.0,
                secondary: 15_000.0,
            },
            supply_after: SupplyPools {
                primary: 100_000.0,
                secondary: 40_000.0,
            },
            pinned,
            model: ProjectionModel::default(),
        }
    }
}

// =========================================================================
// SO quantity for a target OOS%
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoQtyConfig {
    pub expected_so: f64,
    pub target_oos_pct: f64,
    pub zero_oos_factor: f64,
    pub target_factor: f64,
    /// Half-width of a uniform perturbation on `target_factor`. Zero keeps
    /// the output deterministic.
    pub jitter: f64,
    pub seed: Option<u64>,
    pub primary_share: f64,
}

impl Default for SoQtyConfig {
    fn default() -> Self {
        Self {
            expected_so: 140_000.0,
            target_oos_pct: 2.0,
            zero_oos_factor: 1.1,
            target_factor: 1.275,
            jitter: 0.0,
            seed: None,
            primary_share: 2.0 / 3.0,
        }
    }
}

// =========================================================================
// Warehouse stock-out impact
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseImpactConfig {
    pub start_date: NaiveDate,
    pub horizon_days: u32,
    pub primary_supply: f64,
    pub secondary_supply: f64,
    pub impact_scale: f64,
    pub halving_threshold: f64,
    pub halving_factor: f64,
    /// Projected dry OOS% per date before warehouse stock-outs.
    pub dry_baseline: BTreeMap<NaiveDate, f64>,
    pub fresh_min_pct: f64,
    pub fresh_max_pct: f64,
}

impl Default for WarehouseImpactConfig {
    fn default() -> Self {
        Self {
            start_date: ymd(2025, 3, 26),
            horizon_days: 13,
            primary_supply: 100_000.0,
            secondary_supply: 60_000.0,
            impact_scale: 70.0,
            halving_threshold: 0.02,
            halving_factor: 0.5,
            dry_baseline: BTreeMap::new(),
            fresh_min_pct: 1.2,
            fresh_max_pct: 2.0,
        }
    }
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}
