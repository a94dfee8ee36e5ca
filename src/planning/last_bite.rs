// src/planning/last_bite.rs

//! Should we take on extra stock for a SKU or a whole brand?
//!
//! The extra quantity pushes DOI up; the question is how much daily sales
//! would have to grow to bring DOI back to where it is today, and what the
//! extra stock costs to hold for a year.

use crate::model::metrics::{BrandSummary, LastBiteOutcome, Verdict};
use crate::model::record::{finite_or_zero, same_label, InventoryRecord};
use crate::planning::config::LastBiteConfig;
use tracing::{debug, warn};

/// `num / den`, or `None` when the division is meaningless.
fn ratio(num: f64, den: f64) -> Option<f64> {
    if den == 0.0 {
        return None;
    }
    let v = num / den;
    v.is_finite().then_some(v)
}

pub struct LastBiteEvaluator {
    config: LastBiteConfig,
}

impl LastBiteEvaluator {
    pub fn new(config: LastBiteConfig) -> Self {
        Self { config }
    }

    /// Evaluates `extra_qty` more units for a single (location, product).
    pub fn evaluate_sku(&self, record: &InventoryRecord, extra_qty: f64) -> LastBiteOutcome {
        let extra = finite_or_zero(extra_qty).max(0.0);
        let soh = finite_or_zero(record.soh);
        let forecast = finite_or_zero(record.forecast_daily);

        let doi_current = ratio(soh, forecast);
        let doi_new = ratio(soh + extra, forecast);
        let required = doi_current.and_then(|doi| ratio(extra, doi));
        let pct = required.and_then(|units| ratio(units, forecast));

        let verdict = match pct {
            None => Verdict::Undetermined,
            Some(p) if p >= self.config.sku_lift_threshold => Verdict::NotRecommended,
            Some(_) => Verdict::Proceed,
        };

        LastBiteOutcome {
            location_id: record.location_id.clone(),
            product_id: record.product_id.clone(),
            forecast_daily: forecast,
            soh,
            unit_cost: finite_or_zero(record.unit_cost),
            extra_qty: extra,
            extra_qty_value: finite_or_zero(extra * record.unit_cost),
            doi_current,
            doi_new,
            required_daily_sales_increase: required,
            annual_holding_cost_increase: finite_or_zero(
                extra * record.holding_cost_monthly * self.config.months_per_year,
            ),
            sales_increase_pct: pct,
            verdict,
        }
    }

    /// Spreads `extra_qty` over every row of a brand by forecast share, and
    /// summarises the brand as a whole.
    pub fn evaluate_brand(
        &self,
        records: &[InventoryRecord],
        brand: &str,
        extra_qty: f64,
    ) -> (Vec<LastBiteOutcome>, BrandSummary) {
        let extra = finite_or_zero(extra_qty).max(0.0);
        let rows: Vec<&InventoryRecord> = records
            .iter()
            .filter(|r| {
                r.brand_company
                    .as_deref()
                    .map(|b| same_label(b, brand))
                    .unwrap_or(false)
            })
            .collect();

        if rows.is_empty() {
            warn!(brand, "no rows for brand company");
        }

        let total_forecast: f64 = rows.iter().map(|r| finite_or_zero(r.forecast_daily)).sum();
        let total_soh: f64 = rows.iter().map(|r| finite_or_zero(r.soh)).sum();

        let outcomes: Vec<LastBiteOutcome> = rows
            .iter()
            .map(|r| {
                // Equal split when nobody has a forecast
                let share = if total_forecast > 0.0 {
                    finite_or_zero(r.forecast_daily) / total_forecast
                } else {
                    1.0 / rows.len() as f64
                };
                self.evaluate_sku(r, extra * share)
            })
            .collect();

        let mean_holding = if rows.is_empty() {
            0.0
        } else {
            rows.iter()
                .map(|r| finite_or_zero(r.holding_cost_monthly))
                .sum::<f64>()
                / rows.len() as f64
        };

        let (doi_current, doi_new, lift, pct) = if total_forecast == 0.0 || total_soh == 0.0 {
            (None, None, None, None)
        } else {
            let doi_current = total_soh / total_forecast;
            let lift = ratio(extra, doi_current);
            (
                Some(doi_current),
                ratio(total_soh + extra, total_forecast),
                lift,
                lift.and_then(|l| ratio(l, total_forecast)),
            )
        };

        let verdict = match pct {
            None => Verdict::Undetermined,
            Some(p) if p < self.config.brand_lift_threshold => Verdict::Proceed,
            Some(_) => Verdict::NotRecommended,
        };

        let summary = BrandSummary {
            brand_company: brand.to_string(),
            total_soh,
            total_forecast,
            extra_qty: extra,
            total_extra_value: outcomes.iter().map(|o| o.extra_qty_value).sum(),
            doi_current,
            doi_new,
            required_sales_lift: lift,
            sales_increase_pct: pct,
            annual_holding_cost_increase: finite_or_zero(
                extra * mean_holding * self.config.months_per_year,
            ),
            verdict,
        };
        debug!(brand, rows = outcomes.len(), ?summary.verdict, "brand evaluated");

        (outcomes, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sku(product: &str, soh: f64, forecast: f64) -> InventoryRecord {
        InventoryRecord {
            soh,
            forecast_daily: forecast,
            unit_cost: 2_000.0,
            holding_cost_monthly: 50.0,
            brand_company: Some("Acme".into()),
            ..InventoryRecord::new("160", product)
        }
    }

    #[test]
    fn sku_metrics() {
        let eval = LastBiteEvaluator::new(LastBiteConfig::default());
        let out = eval.evaluate_sku(&sku("P1", 100.0, 10.0), 50.0);
        assert_eq!(out.doi_current, Some(10.0));
        assert_eq!(out.doi_new, Some(15.0));
        assert_eq!(out.required_daily_sales_increase, Some(5.0));
        assert_eq!(out.sales_increase_pct, Some(0.5));
        assert_eq!(out.extra_qty_value, 100_000.0);
        assert_eq!(out.annual_holding_cost_increase, 30_000.0);
        assert_eq!(out.verdict, Verdict::Proceed);
    }

    #[test]
    fn sku_lift_at_threshold_is_rejected() {
        let eval = LastBiteEvaluator::new(LastBiteConfig::default());
        // pct = extra / soh = 200 / 100
        let out = eval.evaluate_sku(&sku("P1", 100.0, 10.0), 200.0);
        assert_eq!(out.sales_increase_pct, Some(2.0));
        assert_eq!(out.verdict, Verdict::NotRecommended);
    }

    #[test]
    fn zero_forecast_or_stock_is_undetermined() {
        let eval = LastBiteEvaluator::new(LastBiteConfig::default());
        let no_forecast = eval.evaluate_sku(&sku("P1", 100.0, 0.0), 10.0);
        assert_eq!(no_forecast.doi_current, None);
        assert_eq!(no_forecast.verdict, Verdict::Undetermined);

        let no_stock = eval.evaluate_sku(&sku("P1", 0.0, 10.0), 10.0);
        assert_eq!(no_stock.doi_current, Some(0.0));
        assert_eq!(no_stock.required_daily_sales_increase, None);
        assert_eq!(no_stock.verdict, Verdict::Undetermined);
    }

    #[test]
    fn brand_allocation_follows_forecast_share() {
        let eval = LastBiteEvaluator::new(LastBiteConfig::default());
        let records = vec![
            sku("P1", 1_000.0, 30.0),
            sku("P2", 1_000.0, 10.0),
            InventoryRecord {
                brand_company: Some("Other".into()),
                ..sku("P3", 5.0, 5.0)
            },
        ];
        let (rows, summary) = eval.evaluate_brand(&records, "acme", 40.0);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].extra_qty, 30.0);
        assert_eq!(rows[1].extra_qty, 10.0);
        let allocated: f64 = rows.iter().map(|r| r.extra_qty).sum();
        assert_eq!(allocated, 40.0);

        assert_eq!(summary.total_soh, 2_000.0);
        assert_eq!(summary.total_forecast, 40.0);
        assert_eq!(summary.doi_current, Some(50.0));
        assert_eq!(summary.doi_new, Some(51.0));
        // 40 / 2000 = 2% lift, not strictly below the 2% bar
        assert_eq!(summary.sales_increase_pct, Some(0.02));
        assert_eq!(summary.verdict, Verdict::NotRecommended);
        assert_eq!(summary.annual_holding_cost_increase, 24_000.0);
        assert_eq!(summary.total_extra_value, 80_000.0);
    }

    #[test]
    fn brand_without_forecast_splits_evenly() {
        let eval = LastBiteEvaluator::new(LastBiteConfig::default());
        let records = vec![sku("P1", 10.0, 0.0), sku("P2", 10.0, 0.0)];
        let (rows, summary) = eval.evaluate_brand(&records, "Acme", 10.0);
        assert_eq!(rows[0].extra_qty, 5.0);
        assert_eq!(summary.verdict, Verdict::Undetermined);
    }
}
