// src/model/record.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// ABC/XYZ-style pareto bucket. X is the top sales contributor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParetoClass {
    X,
    A,
    B,
    C,
}

impl ParetoClass {
    /// Collapses any raw pareto label into a bucket.
    /// Only X, A and B are kept; everything else (D, blanks, typos) is C.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "X" => ParetoClass::X,
            "A" => ParetoClass::A,
            "B" => ParetoClass::B,
            _ => ParetoClass::C,
        }
    }
}

impl fmt::Display for ParetoClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One row per (location, product).
///
/// Numeric fields are already coerced: the loader turns blanks and junk into
/// zero, and `total_inbound` into 1 when it is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    // Identity
    pub location_id: String,
    pub product_id: String,

    // Categories (raw labels, matched case-insensitively)
    pub product_type: String,
    pub demand_type: String,
    pub pareto: String,

    // DOI policy inputs
    pub doi_policy: f64,
    pub lead_time: f64,
    pub lead_time_std: f64,
    pub avg_demand: f64,
    pub std_demand: f64,
    pub resched_count: f64,
    pub total_inbound: f64,

    // Stock & cost inputs
    pub soh: f64,
    pub forecast_daily: f64,
    pub unit_cost: f64,
    pub holding_cost_monthly: f64,

    pub brand_company: Option<String>,
    pub product_name: Option<String>,
}

impl Default for InventoryRecord {
    fn default() -> Self {
        Self {
            location_id: String::new(),
            product_id: String::new(),
            product_type: String::new(),
            demand_type: String::new(),
            pareto: String::new(),
            doi_policy: 0.0,
            lead_time: 0.0,
            lead_time_std: 0.0,
            avg_demand: 0.0,
            std_demand: 0.0,
            resched_count: 0.0,
            total_inbound: 1.0, // a missing inbound count never divides by zero
            soh: 0.0,
            forecast_daily: 0.0,
            unit_cost: 0.0,
            holding_cost_monthly: 0.0,
            brand_company: None,
            product_name: None,
        }
    }
}

impl InventoryRecord {
    pub fn new(location_id: impl Into<String>, product_id: impl Into<String>) -> Self {
        Self {
            location_id: canonical_key(&location_id.into()),
            product_id: canonical_key(&product_id.into()),
            ..Self::default()
        }
    }

    /// Join key used to merge side tables and to match outputs back to inputs.
    pub fn key(&self) -> (String, String) {
        (self.location_id.clone(), self.product_id.clone())
    }

    pub fn pareto_class(&self) -> ParetoClass {
        ParetoClass::normalize(&self.pareto)
    }
}

/// One forecast line: a date, optionally a product, and its forecast units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandLine {
    pub date: NaiveDate,
    pub product_id: Option<String>,
    pub forecast: f64,
}

/// Warehouse stock-out quantity observed or expected on a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseOos {
    pub date: NaiveDate,
    pub oos_qty: f64,
}

/// Coerces a raw cell into a finite number; anything else becomes `default`.
pub fn coerce_f64(raw: Option<&str>, default: f64) -> f64 {
    let Some(text) = raw else {
        return default;
    };
    let cleaned = text.trim().replace(',', "");
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => default,
    }
}

/// Replaces NaN and infinities with zero.
pub fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Canonical form for join keys: trimmed, and "160.0" becomes "160".
pub fn canonical_key(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<f64>() {
        if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
            return format!("{}", v as i64);
        }
    }
    trimmed.to_string()
}

/// Case- and whitespace-insensitive label comparison.
pub fn same_label(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
