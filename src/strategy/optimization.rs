// src/strategy/optimization.rs

//! Service-level helpers for the safety buffer.
//!
//! The DOI engine takes a Z-score directly, but planners usually think in
//! service levels ("95% of days covered"). These helpers convert between the
//! two and derive a cost-balanced service level (the newsvendor critical
//! ratio) when only holding and stock-out costs are known.

use crate::planning::config::DoiConfig;

/// Critical Ratio (target service level) from unit costs.
///
/// Formula: CR = StockoutCost / (StockoutCost + HoldingCost)
pub fn critical_ratio(stockout_cost: f64, holding_cost: f64) -> f64 {
    if stockout_cost + holding_cost == 0.0 {
        return 0.0;
    }
    stockout_cost / (stockout_cost + holding_cost)
}

/// Approximate inverse CDF of the standard normal distribution.
///
/// Based on Abramowitz and Stegun formula 26.2.23.
/// The absolute error is less than 4.5e-4.
pub fn inverse_normal_cdf(p: f64) -> f64 {
    if !p.is_finite() {
        return 0.0;
    }
    // Cap at a reasonable sigma
    if p >= 1.0 {
        return 5.0;
    }
    if p <= 0.0 {
        return -5.0;
    }
    if p == 0.5 {
        return 0.0;
    }

    // Valid for 0 < q <= 0.5; mirror the upper half
    let q = if p < 0.5 { p } else { 1.0 - p };
    let t = (-2.0 * q.ln()).sqrt();

    let c0 = 2.515517;
    let c1 = 0.802853;
    let c2 = 0.010328;

    let d1 = 1.432788;
    let d2 = 0.189269;
    let d3 = 0.001308;

    let numerator = c0 + c1 * t + c2 * t * t;
    let denominator = 1.0 + d1 * t + d2 * t * t + d3 * t * t * t;

    let x = t - (numerator / denominator);

    if p < 0.5 {
        -x
    } else {
        x
    }
}

/// The Z-score the safety term should use for this configuration.
///
/// Precedence: explicit `service_level`, then the critical ratio of
/// `stockout_cost` / `holding_cost`, then the plain `z_score`.
pub fn effective_z(config: &DoiConfig) -> f64 {
    if let Some(level) = config.service_level {
        return inverse_normal_cdf(level);
    }
    if let (Some(stockout), Some(holding)) = (config.stockout_cost, config.holding_cost) {
        if stockout + holding > 0.0 {
            return inverse_normal_cdf(critical_ratio(stockout, holding));
        }
    }
    if config.z_score.is_finite() {
        config.z_score
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_service_levels() {
        assert!((inverse_normal_cdf(0.95) - 1.645).abs() < 1e-3);
        assert!((inverse_normal_cdf(0.975) - 1.96).abs() < 1e-3);
        assert!((inverse_normal_cdf(0.05) + 1.645).abs() < 1e-3);
        assert_eq!(inverse_normal_cdf(0.5), 0.0);
    }

    #[test]
    fn degenerate_probabilities_are_capped() {
        assert_eq!(inverse_normal_cdf(1.0), 5.0);
        assert_eq!(inverse_normal_cdf(0.0), -5.0);
        assert_eq!(inverse_normal_cdf(f64::NAN), 0.0);
    }

    #[test]
    fn critical_ratio_balances_costs() {
        assert!((critical_ratio(1.0, 0.5) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(critical_ratio(0.0, 0.0), 0.0);
    }

    #[test]
    fn service_level_overrides_z() {
        let mut cfg = DoiConfig::default();
        assert_eq!(effective_z(&cfg), 1.65);
        cfg.service_level = Some(0.975);
        assert!((effective_z(&cfg) - 1.96).abs() < 1e-3);
    }

    #[test]
    fn costs_derive_the_service_level() {
        let mut cfg = DoiConfig {
            stockout_cost: Some(19.0),
            holding_cost: Some(1.0),
            ..DoiConfig::default()
        };
        // 19 / (19 + 1) = 0.95
        assert!((effective_z(&cfg) - 1.645).abs() < 1e-3);

        // only one cost known: fall back to z_score
        cfg.holding_cost = None;
        assert_eq!(effective_z(&cfg), 1.65);

        // zero costs carry no information
        cfg.stockout_cost = Some(0.0);
        cfg.holding_cost = Some(0.0);
        assert_eq!(effective_z(&cfg), 1.65);

        // an explicit service level still wins
        cfg.holding_cost = Some(1.0);
        cfg.service_level = Some(0.5);
        assert_eq!(effective_z(&cfg), 0.0);
    }
}
