// src/model/metrics.rs

use crate::model::record::ParetoClass;
use chrono::NaiveDate;
use serde::Serialize;

/// Rounds to two decimals, the precision every planning table is shown at.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Final DOI for one record, plus the pieces it was built from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoiOutcome {
    pub location_id: String,
    pub product_id: String,
    pub product_type: String,
    pub pareto: ParetoClass,
    pub demand_type: String,
    pub doi_policy: f64,
    pub final_doi: f64,
    pub applied: bool,
    pub safety_term: f64,
    pub reschedule_term: f64,
    pub pareto_term: f64,
    pub multiplier: f64,
}

impl DoiOutcome {
    pub fn changed(&self) -> bool {
        self.final_doi != round2(self.doi_policy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Proceed,
    NotRecommended,
    /// Zero forecast or zero stock: no DOI to reason about.
    Undetermined,
}

/// Extra-stock evaluation for one (location, product).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastBiteOutcome {
    pub location_id: String,
    pub product_id: String,
    pub forecast_daily: f64,
    pub soh: f64,
    pub unit_cost: f64,
    pub extra_qty: f64,
    pub extra_qty_value: f64,
    pub doi_current: Option<f64>,
    pub doi_new: Option<f64>,
    pub required_daily_sales_increase: Option<f64>,
    pub annual_holding_cost_increase: f64,
    pub sales_increase_pct: Option<f64>,
    pub verdict: Verdict,
}

/// Aggregate of a brand-level extra-stock evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandSummary {
    pub brand_company: String,
    pub total_soh: f64,
    pub total_forecast: f64,
    pub extra_qty: f64,
    pub total_extra_value: f64,
    pub doi_current: Option<f64>,
    pub doi_new: Option<f64>,
    pub required_sales_lift: Option<f64>,
    pub sales_increase_pct: Option<f64>,
    pub annual_holding_cost_increase: f64,
    pub verdict: Verdict,
}

/// One day of an OOS% projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionRow {
    pub date: NaiveDate,
    pub primary_supply: f64,
    pub secondary_supply: f64,
    pub demand: f64,
    pub projected_oos_pct: f64,
    pub pinned: bool,
}

/// Sales-order quantity needed to land a projection row on target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoQtyRow {
    pub date: NaiveDate,
    pub projected_oos_pct: f64,
    pub qty_zero_oos: f64,
    pub qty_zero_oos_primary: f64,
    pub qty_zero_oos_secondary: f64,
    pub qty_needed: f64,
    pub qty_needed_primary: f64,
    pub qty_needed_secondary: f64,
}

/// One day of warehouse stock-out impact on OOS%.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarehouseImpactRow {
    pub date: NaiveDate,
    pub primary_so: f64,
    pub secondary_so: f64,
    pub warehouse_oos_qty: f64,
    pub added_oos_pct: f64,
    pub projected_dry_pct: f64,
    pub final_dry_pct: f64,
    pub assumed_fresh_pct: f64,
    pub final_oos_pct: f64,
}
