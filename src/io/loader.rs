// src/io/loader.rs

//! Tabular inputs.
//!
//! Headers are matched case-insensitively after trimming, with inner spaces
//! read as underscores, so `"Product ID"` and `product_id` are the same
//! column. Cell values are never rejected: numbers that do not parse become
//! zero (or the field's neutral default).

use crate::error::{PlannerError, Result};
use crate::model::record::{canonical_key, coerce_f64, InventoryRecord};
use csv::StringRecord;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

pub fn normalize_header(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// A CSV table with normalised headers.
pub struct Table {
    source: String,
    headers: HashMap<String, usize>,
    rows: Vec<StringRecord>,
}

impl Table {
    pub fn from_reader<R: Read>(reader: R, source: &str) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let csv_err = |source_err| PlannerError::Csv {
            path: source.to_string(),
            source: source_err,
        };

        let headers = csv_reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .enumerate()
            .map(|(i, h)| (normalize_header(h), i))
            .collect();

        let mut rows = Vec::new();
        for result in csv_reader.records() {
            rows.push(result.map_err(csv_err)?);
        }

        debug!(source, rows = rows.len(), "table read");
        Ok(Self {
            source: source.to_string(),
            headers,
            rows,
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| PlannerError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(file, &path.display().to_string())
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    /// Index of the first alias present in the header.
    pub fn column(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|a| self.headers.get(*a).copied())
    }

    pub fn require(&self, aliases: &[&str]) -> Result<usize> {
        self.column(aliases).ok_or_else(|| PlannerError::MissingColumn {
            path: self.source.clone(),
            column: aliases.first().copied().unwrap_or_default().to_string(),
        })
    }

    /// Non-empty cell text, if the column exists.
    pub fn cell<'a>(&self, row: &'a StringRecord, col: Option<usize>) -> Option<&'a str> {
        col.and_then(|c| row.get(c)).filter(|s| !s.is_empty())
    }
}

// Column aliases, already normalised
const LOCATION: &[&str] = &["location_id", "wh_id", "location"];
const PRODUCT: &[&str] = &["product_id", "sku"];
const PRODUCT_TYPE: &[&str] = &["product_type_name", "product_type"];
const DEMAND_TYPE: &[&str] = &["demand_type"];
const PARETO: &[&str] = &["pareto", "pareto_class"];
const DOI_POLICY: &[&str] = &["doi_policy"];
const LEAD_TIME: &[&str] = &["lead_time"];
const LEAD_TIME_STD: &[&str] = &["lead_time_std"];
const AVG_DEMAND: &[&str] = &["avg_demand", "demand_mean"];
const STD_DEMAND: &[&str] = &["std_demand", "demand_std"];
const RESCHED_COUNT: &[&str] = &["resched_count"];
const TOTAL_INBOUND: &[&str] = &["total_inbound"];
const SOH: &[&str] = &["soh", "sum_of_stock", "stock_on_hand"];
const FORECAST_DAILY: &[&str] = &["forecast_daily"];
const UNIT_COST: &[&str] = &["cogs", "unit_cost"];
const HOLDING_COST: &[&str] = &["holding_cost_monthly", "holding_cost"];
const BRAND: &[&str] = &["brand_company", "brand"];
const PRODUCT_NAME: &[&str] = &["product_name"];

/// Builds inventory records from a table. Rows without a product id are
/// dropped; every other gap is coerced.
pub fn inventory_from_table(table: &Table) -> Result<Vec<InventoryRecord>> {
    let product_col = table.require(PRODUCT)?;
    let col = |aliases: &[&str]| table.column(aliases);

    let location = col(LOCATION);
    let product_type = col(PRODUCT_TYPE);
    let demand_type = col(DEMAND_TYPE);
    let pareto = col(PARETO);
    let doi_policy = col(DOI_POLICY);
    let lead_time = col(LEAD_TIME);
    let lead_time_std = col(LEAD_TIME_STD);
    let avg_demand = col(AVG_DEMAND);
    let std_demand = col(STD_DEMAND);
    let resched = col(RESCHED_COUNT);
    let inbound = col(TOTAL_INBOUND);
    let soh = col(SOH);
    let forecast = col(FORECAST_DAILY);
    let unit_cost = col(UNIT_COST);
    let holding = col(HOLDING_COST);
    let brand = col(BRAND);
    let name = col(PRODUCT_NAME);

    let mut records = Vec::with_capacity(table.rows().len());
    let mut dropped = 0usize;

    for row in table.rows() {
        let Some(product_id) = table.cell(row, Some(product_col)) else {
            dropped += 1;
            continue;
        };
        let text = |c: Option<usize>| table.cell(row, c).unwrap_or_default().to_string();
        let num = |c: Option<usize>| coerce_f64(table.cell(row, c), 0.0);

        records.push(InventoryRecord {
            product_type: text(product_type),
            demand_type: text(demand_type),
            pareto: text(pareto),
            doi_policy: num(doi_policy),
            lead_time: num(lead_time),
            lead_time_std: num(lead_time_std),
            avg_demand: num(avg_demand),
            std_demand: num(std_demand),
            resched_count: num(resched),
            total_inbound: coerce_f64(table.cell(row, inbound), 1.0),
            soh: num(soh),
            forecast_daily: num(forecast),
            unit_cost: num(unit_cost),
            holding_cost_monthly: num(holding),
            brand_company: table.cell(row, brand).map(str::to_string),
            product_name: table.cell(row, name).map(str::to_string),
            ..InventoryRecord::new(text(location), product_id)
        });
    }

    info!(
        source = table.source(),
        records = records.len(),
        dropped,
        "inventory loaded"
    );
    Ok(records)
}

pub fn load_inventory<R: Read>(reader: R, source: &str) -> Result<Vec<InventoryRecord>> {
    inventory_from_table(&Table::from_reader(reader, source)?)
}

pub fn load_inventory_file(path: impl AsRef<Path>) -> Result<Vec<InventoryRecord>> {
    inventory_from_table(&Table::from_path(path)?)
}

/// Reschedule history for one (location, product).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RescheduleStat {
    pub resched_count: f64,
    pub total_inbound: f64,
}

pub type RescheduleMap = HashMap<(String, String), RescheduleStat>;

pub fn reschedules_from_table(table: &Table) -> Result<RescheduleMap> {
    let location = table.require(LOCATION)?;
    let product = table.require(PRODUCT)?;
    let resched = table.column(RESCHED_COUNT);
    let inbound = table.column(TOTAL_INBOUND);

    let mut map = HashMap::new();
    for row in table.rows() {
        let key = (
            canonical_key(table.cell(row, Some(location)).unwrap_or_default()),
            canonical_key(table.cell(row, Some(product)).unwrap_or_default()),
        );
        map.insert(
            key,
            RescheduleStat {
                resched_count: coerce_f64(table.cell(row, resched), 0.0),
                total_inbound: coerce_f64(table.cell(row, inbound), 1.0),
            },
        );
    }
    Ok(map)
}

pub fn load_reschedules_file(path: impl AsRef<Path>) -> Result<RescheduleMap> {
    reschedules_from_table(&Table::from_path(path)?)
}

/// Left-joins reschedule history onto the records by (location, product).
/// Records without history get no reschedules out of one inbound order.
pub fn attach_reschedules(records: &mut [InventoryRecord], reschedules: &RescheduleMap) {
    let mut matched = 0usize;
    for record in records.iter_mut() {
        match reschedules.get(&record.key()) {
            Some(stat) => {
                record.resched_count = stat.resched_count;
                record.total_inbound = stat.total_inbound;
                matched += 1;
            }
            None => {
                record.resched_count = 0.0;
                record.total_inbound = 1.0;
            }
        }
    }
    debug!(matched, total = records.len(), "reschedules attached");
}
