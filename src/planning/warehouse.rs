// src/planning/warehouse.rs

use crate::model::metrics::{round2, WarehouseImpactRow};
use crate::model::record::{finite_or_zero, WarehouseOos};
use crate::planning::config::WarehouseImpactConfig;
use chrono::Duration;
use std::collections::BTreeMap;
use tracing::info;

/// Adds the effect of warehouse stock-outs to a dry OOS baseline.
///
/// Units a warehouse cannot ship are taken off the primary SO pool and
/// show up as extra OOS%. Fresh OOS is assumed to move with the dry
/// baseline inside a fixed band.
pub fn warehouse_impact(
    stockouts: &[WarehouseOos],
    config: &WarehouseImpactConfig,
) -> Vec<WarehouseImpactRow> {
    let mut qty_by_date: BTreeMap<_, f64> = BTreeMap::new();
    for s in stockouts {
        *qty_by_date.entry(s.date).or_insert(0.0) += finite_or_zero(s.oos_qty);
    }

    let max_baseline = config
        .dry_baseline
        .values()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);

    let rows: Vec<WarehouseImpactRow> = (0..config.horizon_days as i64)
        .map(|i| {
            let date = config.start_date + Duration::days(i);
            let qty = qty_by_date.get(&date).copied().unwrap_or(0.0);

            let primary = (config.primary_supply - qty).max(0.0).floor();
            let total = primary + config.secondary_supply;

            let mut added = if total > 0.0 {
                qty / total * config.impact_scale
            } else {
                0.0
            };
            if added > config.halving_threshold {
                added *= config.halving_factor;
            }

            let dry = config
                .dry_baseline
                .get(&date)
                .copied()
                .map(finite_or_zero)
                .unwrap_or(0.0);
            let fresh = if max_baseline > 0.0 {
                config.fresh_min_pct
                    + dry / max_baseline * (config.fresh_max_pct - config.fresh_min_pct)
            } else {
                config.fresh_min_pct
            };

            WarehouseImpactRow {
                date,
                primary_so: primary,
                secondary_so: config.secondary_supply,
                warehouse_oos_qty: qty,
                added_oos_pct: round2(added),
                projected_dry_pct: round2(dry),
                final_dry_pct: round2(dry + added),
                assumed_fresh_pct: round2(fresh),
                final_oos_pct: round2(dry + fresh + added),
            }
        })
        .collect();

    info!(
        days = rows.len(),
        stockout_days = qty_by_date.len(),
        "warehouse impact computed"
    );
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    fn config() -> WarehouseImpactConfig {
        let mut cfg = WarehouseImpactConfig::default();
        cfg.dry_baseline.insert(d(3, 26), 6.41);
        cfg.dry_baseline.insert(d(3, 27), 6.55);
        cfg.dry_baseline.insert(d(3, 12), 10.97);
        cfg
    }

    #[test]
    fn stockout_reduces_primary_and_adds_oos() {
        let stockouts = vec![
            WarehouseOos {
                date: d(3, 26),
                oos_qty: 2_000.0,
            },
            WarehouseOos {
                date: d(3, 26),
                oos_qty: 2_000.0,
            },
        ];
        let rows = warehouse_impact(&stockouts, &config());
        assert_eq!(rows.len(), 13);

        let r = &rows[0];
        assert_eq!(r.primary_so, 96_000.0);
        assert_eq!(r.warehouse_oos_qty, 4_000.0);
        // 4000 / 156000 * 70 = 1.79..., above the threshold so halved
        assert_eq!(r.added_oos_pct, round2(4_000.0 / 156_000.0 * 70.0 * 0.5));
        assert_eq!(r.projected_dry_pct, 6.41);
        let fresh = 1.2 + 6.41 / 10.97 * 0.8;
        assert_eq!(r.assumed_fresh_pct, round2(fresh));
        assert_eq!(
            r.final_oos_pct,
            round2(6.41 + fresh + 4_000.0 / 156_000.0 * 35.0)
        );
    }

    #[test]
    fn quiet_day_has_no_added_oos() {
        let rows = warehouse_impact(&[], &config());
        let r = &rows[1];
        assert_eq!(r.date, d(3, 27));
        assert_eq!(r.primary_so, 100_000.0);
        assert_eq!(r.added_oos_pct, 0.0);
        assert_eq!(r.final_dry_pct, 6.55);
    }

    #[test]
    fn huge_stockout_floors_primary_at_zero() {
        let stockouts = vec![WarehouseOos {
            date: d(3, 28),
            oos_qty: 250_000.0,
        }];
        let rows = warehouse_impact(&stockouts, &config());
        assert_eq!(rows[2].primary_so, 0.0);
        assert!(rows[2].added_oos_pct.is_finite());
    }

    #[test]
    fn empty_baseline_uses_fresh_floor() {
        let cfg = WarehouseImpactConfig::default();
        let rows = warehouse_impact(&[], &cfg);
        assert!(rows.iter().all(|r| r.assumed_fresh_pct == 1.2));
    }
}
