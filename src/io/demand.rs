// src/io/demand.rs

use crate::error::Result;
use crate::io::loader::Table;
use crate::model::record::{canonical_key, coerce_f64, finite_or_zero, DemandLine, WarehouseOos};
use crate::planning::config::SupplyPools;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

const DATE: &[&str] = &["date", "date_key"];
const FORECAST: &[&str] = &["forecast", "forecast_daily"];
const PRODUCT: &[&str] = &["product_id", "sku"];
const OOS_QTY: &[&str] = &["oos_qty", "qty"];
const OOS_PCT: &[&str] = &["oos_pct", "oos%", "oos"];
const PRIMARY: &[&str] = &["primary", "kos", "primary_supply"];
const SECONDARY: &[&str] = &["secondary", "stl", "secondary_supply"];

/// Parses the date layouts the planning sheets export.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%d %b %Y", "%d-%b-%y", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

/// Reads `(date, value)` pairs from the first matching value column.
/// Rows with an unreadable date are skipped; bad numbers become zero.
pub fn dated_values(table: &Table, value_aliases: &[&str]) -> Result<Vec<(NaiveDate, f64)>> {
    let date_col = table.require(DATE)?;
    let value_col = table.require(value_aliases)?;

    let mut values = Vec::with_capacity(table.rows().len());
    for (i, row) in table.rows().iter().enumerate() {
        let raw = table.cell(row, Some(date_col)).unwrap_or_default();
        match parse_date(raw) {
            Some(date) => values.push((date, coerce_f64(table.cell(row, Some(value_col)), 0.0))),
            // header is line 1
            None => warn!(source = table.source(), line = i + 2, raw, "skipping row with unreadable date"),
        }
    }
    Ok(values)
}

/// Loads forecast lines (date, optional product, forecast units).
pub fn load_forecast_file(path: impl AsRef<Path>) -> Result<Vec<DemandLine>> {
    let table = Table::from_path(path)?;
    forecast_from_table(&table)
}

pub fn forecast_from_table(table: &Table) -> Result<Vec<DemandLine>> {
    let date_col = table.require(DATE)?;
    let forecast_col = table.require(FORECAST)?;
    let product_col = table.column(PRODUCT);

    let mut lines = Vec::new();
    for (i, row) in table.rows().iter().enumerate() {
        let raw = table.cell(row, Some(date_col)).unwrap_or_default();
        let Some(date) = parse_date(raw) else {
            warn!(source = table.source(), line = i + 2, raw, "skipping row with unreadable date");
            continue;
        };
        lines.push(DemandLine {
            date,
            product_id: table.cell(row, product_col).map(canonical_key),
            forecast: coerce_f64(table.cell(row, Some(forecast_col)), 0.0),
        });
    }

    info!(source = table.source(), lines = lines.len(), "forecast loaded");
    Ok(lines)
}

pub fn load_warehouse_oos_file(path: impl AsRef<Path>) -> Result<Vec<WarehouseOos>> {
    let table = Table::from_path(path)?;
    Ok(dated_values(&table, OOS_QTY)?
        .into_iter()
        .map(|(date, oos_qty)| WarehouseOos { date, oos_qty })
        .collect())
}

/// Observed OOS% per date, used as pinned overrides or as a dry baseline.
pub fn load_oos_pct_file(path: impl AsRef<Path>) -> Result<Vec<(NaiveDate, f64)>> {
    let table = Table::from_path(path)?;
    dated_values(&table, OOS_PCT)
}

/// Actual SO supply per date, one column per pool. Later rows for the same
/// date replace earlier ones.
pub fn load_supply_file(path: impl AsRef<Path>) -> Result<BTreeMap<NaiveDate, SupplyPools>> {
    let table = Table::from_path(path)?;
    supply_from_table(&table)
}

pub fn supply_from_table(table: &Table) -> Result<BTreeMap<NaiveDate, SupplyPools>> {
    let date_col = table.require(DATE)?;
    let primary_col = table.require(PRIMARY)?;
    let secondary_col = table.require(SECONDARY)?;

    let mut supply = BTreeMap::new();
    for (i, row) in table.rows().iter().enumerate() {
        let raw = table.cell(row, Some(date_col)).unwrap_or_default();
        let Some(date) = parse_date(raw) else {
            warn!(source = table.source(), line = i + 2, raw, "skipping row with unreadable date");
            continue;
        };
        supply.insert(
            date,
            SupplyPools {
                primary: coerce_f64(table.cell(row, Some(primary_col)), 0.0),
                secondary: coerce_f64(table.cell(row, Some(secondary_col)), 0.0),
            },
        );
    }

    info!(source = table.source(), days = supply.len(), "supply history loaded");
    Ok(supply)
}

/// A flat forecast: every day has the same total.
/// Useful for testing projections against a known demand.
pub fn generate_constant_demand(start: NaiveDate, days: usize, value: f64) -> Vec<DemandLine> {
    (0..days as i64)
        .map(|i| DemandLine {
            date: start + Duration::days(i),
            product_id: None,
            forecast: value,
        })
        .collect()
}

/// A synthetic daily forecast drawn from a Normal (bell curve) distribution.
///
/// # Arguments
/// * `start` - First forecast date.
/// * `days` - Number of days to generate.
/// * `mean` - The average daily total (e.g., 190000.0).
/// * `std_dev` - The standard deviation (volatility).
/// * `seed` - Fixes the draw so runs are reproducible.
///
/// Negative draws are clamped to zero (demand cannot be negative). A
/// non-finite or negative `std_dev` yields a constant forecast at `mean`.
pub fn generate_normal_demand(
    start: NaiveDate,
    days: usize,
    mean: f64,
    std_dev: f64,
    seed: u64,
) -> Vec<DemandLine> {
    // Normal::new accepts a negative std_dev (it mirrors the draws)
    let normal = match Normal::new(mean, std_dev) {
        Ok(normal) if std_dev.is_finite() && std_dev >= 0.0 => normal,
        _ => {
            warn!(mean, std_dev, "invalid distribution, falling back to constant demand");
            return generate_constant_demand(start, days, finite_or_zero(mean).max(0.0));
        }
    };
    let mut rng = StdRng::seed_from_u64(seed);

    (0..days as i64)
        .map(|i| {
            let val: f64 = normal.sample(&mut rng);
            DemandLine {
                date: start + Duration::days(i),
                product_id: None,
                forecast: val.round().max(0.0),
            }
        })
        .collect()
}
