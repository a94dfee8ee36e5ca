// src/planning/oos.rs

use crate::model::metrics::{round2, ProjectionRow};
use crate::model::record::{canonical_key, finite_or_zero, DemandLine};
use crate::planning::config::{
    BlendModel, OosProjectionConfig, Pool, ProjectionModel, RecoveryModel, SupplyPools, TrendModel,
};
use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Observed series the historical models read from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservedHistory {
    /// Observed OOS% per date.
    pub oos_pct: BTreeMap<NaiveDate, f64>,
    /// Actual SO supply per date.
    pub supply: BTreeMap<NaiveDate, SupplyPools>,
}

/// Walks the projection window one day at a time.
///
/// Dates with an observation (configured pins, then observed history) always
/// report it; every other date is computed by the configured model.
pub struct OosProjector {
    config: OosProjectionConfig,
    history: ObservedHistory,

    // Pins merged over observed history
    observed: BTreeMap<NaiveDate, f64>,
    // Canonical keys of products served from the secondary pool
    secondary_products: BTreeSet<String>,
}

/// Everything a model needs to know about one day.
struct Day<'a> {
    date: NaiveDate,
    /// Zero-based position in the window.
    index: usize,
    demand: Option<f64>,
    peak_demand: f64,
    mean_demand: f64,
    lines: &'a [DemandLine],
    previous: Option<f64>,
}

impl OosProjector {
    pub fn new(config: OosProjectionConfig) -> Self {
        let secondary_products = match &config.model {
            ProjectionModel::Shortfall(m) => {
                m.secondary_products.iter().map(|p| canonical_key(p)).collect()
            }
            _ => BTreeSet::new(),
        };
        let observed = config.pinned.clone();
        Self {
            config,
            history: ObservedHistory::default(),
            observed,
            secondary_products,
        }
    }

    /// Attaches observed OOS% and supply. Configured pins take precedence
    /// over observations on the same date.
    pub fn with_history(mut self, history: ObservedHistory) -> Self {
        let mut observed = history.oos_pct.clone();
        observed.extend(self.config.pinned.iter().map(|(d, v)| (*d, *v)));
        self.observed = observed;
        self.history = history;
        self
    }

    /// Pools in force on `date`. The cutover date itself uses the new pools.
    pub fn pools_on(&self, date: NaiveDate) -> SupplyPools {
        if date < self.config.cutover_date {
            self.config.supply_before
        } else {
            self.config.supply_after
        }
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.config.horizon_days as i64).map(|i| self.config.start_date + Duration::days(i))
    }

    pub fn project(&self, demand: &[DemandLine]) -> Vec<ProjectionRow> {
        let daily = daily_totals(demand);
        let peak_demand = daily.values().copied().fold(0.0_f64, f64::max);
        let mean_demand = if daily.is_empty() {
            0.0
        } else {
            daily.values().sum::<f64>() / daily.len() as f64
        };

        // Actual supply plus what has been projected so far
        let mut supply_seen = self.history.supply.clone();
        let mut rows: Vec<ProjectionRow> = Vec::with_capacity(self.config.horizon_days as usize);

        for (index, date) in self.dates().enumerate() {
            let day = Day {
                date,
                index,
                demand: daily.get(&date).copied(),
                peak_demand,
                mean_demand,
                lines: demand,
                previous: rows.last().map(|r| r.projected_oos_pct),
            };
            let pools = self.supply_on(date, &supply_seen);

            let (pct, pools, pinned) = match self.observed.get(&date) {
                Some(p) => (finite_or_zero(*p), pools, true),
                None => {
                    let (pct, pools) = self.model_pct(&day, pools);
                    (pct, pools, false)
                }
            };
            supply_seen.entry(date).or_insert(pools);

            rows.push(ProjectionRow {
                date,
                primary_supply: pools.primary,
                secondary_supply: pools.secondary,
                demand: day.demand.unwrap_or(0.0),
                projected_oos_pct: round2(finite_or_zero(pct)),
                pinned,
            });
        }

        info!(
            days = rows.len(),
            pinned = rows.iter().filter(|r| r.pinned).count(),
            "OOS projection complete"
        );
        rows
    }

    /// Supply for a date: actuals when known, a rolling forecast for the
    /// trend model, otherwise the configured pools.
    fn supply_on(&self, date: NaiveDate, seen: &BTreeMap<NaiveDate, SupplyPools>) -> SupplyPools {
        if let Some(actual) = self.history.supply.get(&date) {
            return *actual;
        }
        match &self.config.model {
            ProjectionModel::Trend(m) if !self.history.supply.is_empty() => {
                rolling_supply(seen, date, m.supply_window).unwrap_or_else(|| self.pools_on(date))
            }
            _ => self.pools_on(date),
        }
    }

    fn model_pct(&self, day: &Day<'_>, pools: SupplyPools) -> (f64, SupplyPools) {
        match &self.config.model {
            ProjectionModel::Recovery(m) => (self.recovery_pct(m, day, pools), pools),
            ProjectionModel::Shortfall(m) => (
                shortfall_pct(day.date, pools, day.lines, m.base_rate_pct, &self.secondary_products),
                pools,
            ),
            ProjectionModel::HistoricalBlend(m) => self.blend_pct(m, day, pools),
            ProjectionModel::Trend(m) => (self.trend_pct(m, day), pools),
        }
    }

    fn recovery_pct(&self, m: &RecoveryModel, day: &Day<'_>, pools: SupplyPools) -> f64 {
        let supply_factor = if m.secondary_span == 0.0 {
            0.0
        } else {
            ((pools.secondary - m.secondary_floor) / m.secondary_span * m.supply_weight).clamp(0.0, 1.0)
        };
        let days_after = (day.date - self.config.cutover_date).num_days();

        if days_after < m.recovery_days {
            let progress = if m.recovery_days == 0 {
                0.0
            } else {
                days_after as f64 / m.recovery_days as f64
            };
            m.recovery_start_pct - m.recovery_drop_pct * progress * (1.0 - supply_factor)
        } else if m.demand_divisor == 0.0 {
            0.0
        } else {
            day.demand.unwrap_or(0.0) / m.demand_divisor * (1.0 - supply_factor)
        }
    }

    fn blend_pct(&self, m: &BlendModel, day: &Day<'_>, mut pools: SupplyPools) -> (f64, SupplyPools) {
        let reference = day.date - Duration::days(m.lag_days);
        let recent: Vec<f64> = self
            .observed
            .range(..reference)
            .rev()
            .take(m.lookback)
            .map(|(_, v)| finite_or_zero(*v))
            .collect();
        let mut pct = if recent.is_empty() {
            m.fallback_pct
        } else {
            recent.iter().sum::<f64>() / recent.len() as f64
        };

        if matches!(m.decrease_from, Some(from) if day.date >= from) {
            pct = (pct - m.step_decrease_pct).max(0.0);
        }
        if let Some(factor) = m.day_factors.get(&day.date) {
            pct *= finite_or_zero(*factor);
        }
        for zero in m.zero_outbound.iter().filter(|z| z.date == day.date) {
            match zero.pool {
                Pool::Primary => pools.primary = 0.0,
                Pool::Secondary => pools.secondary = 0.0,
            }
            pct += zero.bump_pct;
        }

        let average = self.average_supply(m.default_avg_supply);
        let supply_factor = if average > 0.0 {
            pools.total() / average
        } else {
            1.0
        };
        if supply_factor > 1.0 {
            pct *= (1.0 - (supply_factor - 1.0) * m.surplus_sensitivity).max(m.surplus_floor);
        } else if supply_factor < 1.0 {
            pct *= (1.0 + (1.0 - supply_factor) * m.deficit_sensitivity).min(m.deficit_cap);
        }

        // A day without forecast lines is weighed at the mean day
        let demand = day.demand.unwrap_or(day.mean_demand);
        let demand_factor = if demand > 0.0 && day.peak_demand > 0.0 {
            demand / day.peak_demand
        } else {
            1.0
        };
        pct *= demand_factor * m.demand_weight;

        let decay = 1.0 - (day.index + 1) as f64 * m.decay_rate * (1.0 + supply_factor);
        debug!(date = %day.date, supply_factor, demand_factor, "blended day");
        ((pct * decay).max(0.0), pools)
    }

    fn trend_pct(&self, m: &TrendModel, day: &Day<'_>) -> f64 {
        let window: Vec<f64> = self
            .observed
            .range(..day.date)
            .rev()
            .take(m.trend_window)
            .map(|(_, v)| finite_or_zero(*v))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        match day.previous {
            Some(previous) => previous * (1.0 + mean_change(&window)),
            None if window.is_empty() => m.fallback_pct,
            None => window.iter().sum::<f64>() / window.len() as f64,
        }
    }

    /// Mean primary plus mean secondary supply over the history.
    fn average_supply(&self, default: f64) -> f64 {
        let supply = &self.history.supply;
        if supply.is_empty() {
            return default;
        }
        let n = supply.len() as f64;
        supply.values().map(|p| p.primary).sum::<f64>() / n
            + supply.values().map(|p| p.secondary).sum::<f64>() / n
    }
}

/// Mean relative day-over-day change of a series; steps from zero are skipped.
fn mean_change(values: &[f64]) -> f64 {
    let changes: Vec<f64> = values
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    if changes.is_empty() {
        0.0
    } else {
        changes.iter().sum::<f64>() / changes.len() as f64
    }
}

/// Mean of the last `window` supply entries before `date`.
fn rolling_supply(
    seen: &BTreeMap<NaiveDate, SupplyPools>,
    date: NaiveDate,
    window: usize,
) -> Option<SupplyPools> {
    let prior: Vec<SupplyPools> = seen.range(..date).rev().take(window).map(|(_, p)| *p).collect();
    if prior.is_empty() {
        return None;
    }
    let n = prior.len() as f64;
    Some(SupplyPools {
        primary: prior.iter().map(|p| p.primary).sum::<f64>() / n,
        secondary: prior.iter().map(|p| p.secondary).sum::<f64>() / n,
    })
}

/// Mean per-line OOS% for one day: base rate plus the share of forecast the
/// line's pool cannot cover.
fn shortfall_pct(
    date: NaiveDate,
    pools: SupplyPools,
    lines: &[DemandLine],
    base_rate_pct: f64,
    secondary_products: &BTreeSet<String>,
) -> f64 {
    let per_line: Vec<f64> = lines
        .iter()
        .filter(|l| l.date == date)
        .map(|l| {
            let on_secondary = l
                .product_id
                .as_deref()
                .map(|p| secondary_products.contains(&canonical_key(p)))
                .unwrap_or(false);
            let supply = if on_secondary {
                pools.secondary
            } else {
                pools.primary
            };
            let forecast = finite_or_zero(l.forecast);
            let shortfall = if forecast > 0.0 {
                ((forecast - supply) / forecast).max(0.0)
            } else {
                0.0
            };
            base_rate_pct + shortfall * 100.0
        })
        .collect();

    if per_line.is_empty() {
        debug!(%date, "no forecast lines, using base rate");
        return base_rate_pct;
    }
    per_line.iter().sum::<f64>() / per_line.len() as f64
}

/// Sums forecast lines per date.
pub fn daily_totals(lines: &[DemandLine]) -> BTreeMap<NaiveDate, f64> {
    let mut totals = BTreeMap::new();
    for line in lines {
        *totals.entry(line.date).or_insert(0.0) += finite_or_zero(line.forecast);
    }
    totals
}
