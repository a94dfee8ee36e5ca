use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use doi_planner::io::{demand, loader, reporting};
use doi_planner::model::metrics::Verdict;
use doi_planner::planning::config::{
    OosProjectionConfig, PlannerConfig, SoQtyConfig, WarehouseImpactConfig,
};
use doi_planner::planning::engine::{DoiEngine, DoiSummary};
use doi_planner::planning::last_bite::LastBiteEvaluator;
use doi_planner::planning::oos::{ObservedHistory, OosProjector};
use doi_planner::planning::so_qty::so_quantities;
use doi_planner::planning::warehouse::warehouse_impact;
use doi_planner::{logging, PlannerError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "doi-planner")]
#[command(about = "Inventory planning metrics: final DOI, OOS projection, extra-stock checks")]
struct Cli {
    /// Planner configuration (JSON). Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Adjusted days-of-inventory per (location, product)
    Doi {
        /// Inventory table (location_id, product_id, doi_policy, ...)
        #[arg(long)]
        inventory: PathBuf,

        /// Reschedule table (wh_id, product_id, resched_count, total_inbound)
        #[arg(long)]
        reschedule: Option<PathBuf>,

        /// Output CSV (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Only write rows whose DOI changed
        #[arg(long)]
        changed_only: bool,
    },

    /// Evaluate extra stock for one SKU or a whole brand
    LastBite {
        /// Stock table (product id, location id, sum of stock, forecast daily, cogs, holding_cost)
        #[arg(long)]
        inventory: PathBuf,

        #[arg(long, conflicts_with = "brand", requires = "location")]
        sku: Option<String>,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        brand: Option<String>,

        #[arg(long)]
        extra_qty: f64,

        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Day-by-day OOS% projection
    Oos {
        /// Forecast table (date key, [product id], forecast)
        #[arg(long)]
        forecast: PathBuf,

        /// Observed OOS% per date (date, oos%); overrides the model
        #[arg(long)]
        pinned: Option<PathBuf>,

        #[command(flatten)]
        history: HistoryArgs,

        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// SO quantity needed to reach a target OOS%
    SoQty {
        #[arg(long)]
        forecast: PathBuf,

        #[arg(long)]
        pinned: Option<PathBuf>,

        #[command(flatten)]
        history: HistoryArgs,

        /// Target OOS% (e.g. 2.0)
        #[arg(long)]
        target_oos: Option<f64>,

        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Extra OOS% caused by warehouse stock-outs
    WhImpact {
        /// Warehouse stock-outs (date, oos qty)
        #[arg(long)]
        stockouts: PathBuf,

        /// Projected dry OOS% per date (date, oos%)
        #[arg(long)]
        dry_baseline: Option<PathBuf>,

        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Write a synthetic daily forecast
    SynthDemand {
        #[arg(long)]
        start: NaiveDate,

        #[arg(long, default_value = "62")]
        days: usize,

        #[arg(long, default_value = "190000")]
        mean: f64,

        #[arg(long, default_value = "20000")]
        std_dev: f64,

        #[arg(long, default_value = "42")]
        seed: u64,

        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Observed series for the historical projection models.
#[derive(Args, Debug)]
struct HistoryArgs {
    /// Historical OOS% (date, oos%), read by the blend and trend models
    #[arg(long)]
    observed: Option<PathBuf>,

    /// Historical SO supply (date, primary, secondary)
    #[arg(long)]
    supply: Option<PathBuf>,
}

impl HistoryArgs {
    fn load(&self) -> Result<ObservedHistory> {
        let oos_pct = match &self.observed {
            Some(path) => demand::load_oos_pct_file(path)?.into_iter().collect(),
            None => BTreeMap::new(),
        };
        let supply = match &self.supply {
            Some(path) => demand::load_supply_file(path)?,
            None => BTreeMap::new(),
        };
        Ok(ObservedHistory { oos_pct, supply })
    }
}

/// Configured pins plus any read from `path`; the file wins on shared dates.
fn merged_dates(
    base: &BTreeMap<NaiveDate, f64>,
    path: Option<&Path>,
) -> Result<BTreeMap<NaiveDate, f64>> {
    let mut merged = base.clone();
    if let Some(path) = path {
        merged.extend(demand::load_oos_pct_file(path)?);
    }
    Ok(merged)
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    info!(version = doi_planner::VERSION, "doi-planner starting");
    let config = PlannerConfig::load_or_default(cli.config.as_deref())
        .context("loading planner configuration")?;

    match cli.command {
        Command::Doi {
            inventory,
            reschedule,
            output,
            changed_only,
        } => {
            // 1. LOAD & MERGE
            let mut records = loader::load_inventory_file(&inventory)?;
            if let Some(path) = reschedule {
                let reschedules = loader::load_reschedules_file(&path)?;
                loader::attach_reschedules(&mut records, &reschedules);
            }

            // 2. COMPUTE
            let engine = DoiEngine::new(config.doi);
            let outcomes = engine.run(&records);

            // 3. EXPORT
            let rows = if changed_only {
                reporting::changed_only(&outcomes)
            } else {
                outcomes.clone()
            };
            reporting::emit(output.as_deref(), &rows)?;

            let summary = DoiSummary::from_outcomes(&outcomes);
            eprintln!(
                "{} rows, {} adjusted, {} changed",
                summary.rows, summary.applied, summary.changed
            );
            for (product_type, mean) in &summary.mean_final_by_type {
                eprintln!("  {:<12} mean final DOI {:.2}", product_type, mean);
            }
        }

        Command::LastBite {
            inventory,
            sku,
            location,
            brand,
            extra_qty,
            output,
        } => {
            let records = loader::load_inventory_file(&inventory)?;
            let evaluator = LastBiteEvaluator::new(config.last_bite);

            match (sku, location, brand) {
                (Some(sku), Some(location), None) => {
                    let wanted = (
                        doi_planner::model::record::canonical_key(&location),
                        doi_planner::model::record::canonical_key(&sku),
                    );
                    let outcomes: Vec<_> = records
                        .iter()
                        .filter(|r| r.key() == wanted)
                        .map(|r| evaluator.evaluate_sku(r, extra_qty))
                        .collect();
                    if outcomes.is_empty() {
                        return Err(PlannerError::NotFound(format!(
                            "SKU {} at location {}",
                            wanted.1, wanted.0
                        ))
                        .into());
                    }
                    reporting::emit(output.as_deref(), &outcomes)?;
                    for o in &outcomes {
                        eprintln!("{} @ {}: {}", o.product_id, o.location_id, verdict_label(o.verdict));
                    }
                }
                (None, _, Some(brand)) => {
                    let (rows, summary) = evaluator.evaluate_brand(&records, &brand, extra_qty);
                    if rows.is_empty() {
                        return Err(PlannerError::NotFound(format!("brand company {}", brand)).into());
                    }
                    reporting::emit(output.as_deref(), &rows)?;
                    eprintln!(
                        "{}: extra value {:.0}, annual holding cost +{:.0}, sales lift {} -> {}",
                        summary.brand_company,
                        summary.total_extra_value,
                        summary.annual_holding_cost_increase,
                        summary
                            .sales_increase_pct
                            .map(|p| format!("{:.1}%", p * 100.0))
                            .unwrap_or_else(|| "n/a".to_string()),
                        verdict_label(summary.verdict)
                    );
                }
                _ => bail!("pass either --sku with --location, or --brand"),
            }
        }

        Command::Oos {
            forecast,
            pinned,
            history,
            output,
        } => {
            let lines = demand::load_forecast_file(&forecast)?;
            let oos = OosProjectionConfig {
                pinned: merged_dates(&config.oos.pinned, pinned.as_deref())?,
                ..config.oos
            };
            let rows = OosProjector::new(oos)
                .with_history(history.load()?)
                .project(&lines);
            reporting::emit(output.as_deref(), &rows)?;
        }

        Command::SoQty {
            forecast,
            pinned,
            history,
            target_oos,
            output,
        } => {
            let lines = demand::load_forecast_file(&forecast)?;
            let oos = OosProjectionConfig {
                pinned: merged_dates(&config.oos.pinned, pinned.as_deref())?,
                ..config.oos
            };
            let so_qty = SoQtyConfig {
                target_oos_pct: target_oos.unwrap_or(config.so_qty.target_oos_pct),
                ..config.so_qty
            };
            let projection = OosProjector::new(oos)
                .with_history(history.load()?)
                .project(&lines);
            let rows = so_quantities(&projection, &so_qty);
            reporting::emit(output.as_deref(), &rows)?;
        }

        Command::WhImpact {
            stockouts,
            dry_baseline,
            output,
        } => {
            let stockouts = demand::load_warehouse_oos_file(&stockouts)?;
            let warehouse = WarehouseImpactConfig {
                dry_baseline: merged_dates(&config.warehouse.dry_baseline, dry_baseline.as_deref())?,
                ..config.warehouse
            };
            let rows = warehouse_impact(&stockouts, &warehouse);
            reporting::emit(output.as_deref(), &rows)?;
        }

        Command::SynthDemand {
            start,
            days,
            mean,
            std_dev,
            seed,
            output,
        } => {
            let lines = demand::generate_normal_demand(start, days, mean, std_dev, seed);
            reporting::emit(output.as_deref(), &lines)?;
        }
    }

    Ok(())
}

fn verdict_label(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Proceed => "Proceed",
        Verdict::NotRecommended => "Not Recommended",
        Verdict::Undetermined => "Undetermined (no forecast or stock)",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    #[test]
    fn file_dates_merge_over_configured_ones() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oos.csv");
        std::fs::write(&path, "Date,OOS%\n2025-03-09,11.5\n2025-03-21,7.5\n").unwrap();

        let config = PlannerConfig::default();
        let merged = merged_dates(&config.oos.pinned, Some(path.as_path())).unwrap();
        assert_eq!(merged.len(), config.oos.pinned.len() + 1);
        assert_eq!(merged[&d(3, 9)], 11.5);
        assert_eq!(merged[&d(3, 21)], 7.5);
        // the loaded configuration is left as it was
        assert_eq!(config.oos.pinned[&d(3, 9)], 12.63);

        let untouched = merged_dates(&config.oos.pinned, None).unwrap();
        assert_eq!(untouched, config.oos.pinned);
    }
}
