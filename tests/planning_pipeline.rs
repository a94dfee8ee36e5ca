//! End-to-end runs over files, the way the CLI drives the library.

use doi_planner::io::{demand, loader, reporting};
use doi_planner::model::metrics::Verdict;
use doi_planner::planning::config::{PlannerConfig, ProjectionModel};
use doi_planner::planning::engine::DoiEngine;
use doi_planner::planning::last_bite::LastBiteEvaluator;
use doi_planner::planning::oos::{ObservedHistory, OosProjector};
use doi_planner::planning::so_qty::so_quantities;
use doi_planner::{logging, PlannerError};
use std::fs;
use std::path::Path;

const DATABASE: &str = "\
location_id,product_id,product_type_name,demand_type,pareto,doi_policy,lead_time,lead_time_std,avg_demand,std_demand
160,P1,Fresh,Volatile,A,20,5,2,50,10
160,P2,Dry,Stable,X,14.333,3,1,10,5
161,P3,Frozen,Volatile,D,9,2,0,0,0
";

const RESCHEDULE: &str = "\
WH_ID,Product_ID,resched_count,total_inbound
160,P1,1,10
";

fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn final_doi_from_files() {
    logging::init_test();
    let dir = tempfile::tempdir().unwrap();
    let inventory = write(dir.path(), "database.csv", DATABASE);
    let reschedule = write(dir.path(), "reschedule.csv", RESCHEDULE);
    let config_path = write(
        dir.path(),
        "config.json",
        r#"{ "schema_version": 1, "doi": { "filter": { "pareto_classes": ["X", "A", "C"] } } }"#,
    );

    let config = PlannerConfig::load(&config_path).unwrap();
    let mut records = loader::load_inventory_file(&inventory).unwrap();
    let reschedules = loader::load_reschedules_file(&reschedule).unwrap();
    loader::attach_reschedules(&mut records, &reschedules);

    let engine = DoiEngine::new(config.doi);
    let outcomes = engine.run(&records);

    // Same inputs as the reference calculation
    assert_eq!(outcomes[0].final_doi, 17.40);
    // Stable demand is outside the filter
    assert!(!outcomes[1].applied);
    assert_eq!(outcomes[1].final_doi, 14.33);
    // D collapses to C, which this config admits; no demand, no inbound history
    let p3 = &outcomes[2];
    assert!(p3.applied);
    assert_eq!(p3.safety_term, 0.0);
    assert_eq!(p3.reschedule_term, 0.0);
    // (9 + 0.5 * 0.5) * 1.05 * 0.7
    assert_eq!(p3.final_doi, 6.80);

    // Output is joinable back to the input by key, in order
    for (record, outcome) in records.iter().zip(&outcomes) {
        assert_eq!(record.key(), (outcome.location_id.clone(), outcome.product_id.clone()));
    }

    let out = dir.path().join("refined_doi_output.csv");
    reporting::write_report(&out, &reporting::changed_only(&outcomes)).unwrap();
    let text = fs::read_to_string(&out).unwrap();
    assert_eq!(text.lines().count(), 3);
}

#[test]
fn recomputation_is_stable() {
    let records = loader::load_inventory(DATABASE.as_bytes(), "database").unwrap();
    let engine = DoiEngine::new(PlannerConfig::default().doi);
    assert_eq!(engine.run(&records), engine.run(&records));
}

#[test]
fn missing_input_file_is_reported() {
    let err = loader::load_inventory_file("/definitely/not/here.csv").unwrap_err();
    assert!(matches!(err, PlannerError::Io { .. }));
}

#[test]
fn projection_feeds_so_quantities() {
    let dir = tempfile::tempdir().unwrap();
    let forecast = write(
        dir.path(),
        "forecast.csv",
        "Date Key,Product ID,Forecast\n2025-03-20,P1,110000\n2025-03-20,P2,88000\n",
    );
    let pinned = write(dir.path(), "oos.csv", "Date,OOS%\n2025-03-21,7.5\n");

    let mut config = PlannerConfig::default();
    config.oos.pinned.extend(demand::load_oos_pct_file(&pinned).unwrap());
    assert!(matches!(config.oos.model, ProjectionModel::Recovery(_)));

    let lines = demand::load_forecast_file(&forecast).unwrap();
    let projection = OosProjector::new(config.oos.clone()).project(&lines);
    let day = |d: &str| {
        projection
            .iter()
            .find(|r| r.date.to_string() == d)
            .unwrap()
            .clone()
    };
    assert_eq!(day("2025-03-20").projected_oos_pct, 9.0);
    assert!(day("2025-03-21").pinned);
    assert_eq!(day("2025-03-21").projected_oos_pct, 7.5);

    let so = so_quantities(&projection, &config.so_qty);
    assert_eq!(so.len(), projection.len());
    let row = so.iter().find(|r| r.date.to_string() == "2025-03-20").unwrap();
    // 140000 + (0.09 - 0.02) * 140000 * 1.275
    assert_eq!(row.qty_needed, 152_495.0);
}

#[test]
fn last_bite_from_stock_table() {
    let stock = "\
Product ID,Location ID,Sum of Stock,Forecast Daily,COGS,Holding_Cost,Brand Company
P1,160,300,10,1500,20,Acme
P2,160,0,0,900,20,Acme
";
    let records = loader::load_inventory(stock.as_bytes(), "soh").unwrap();
    let evaluator = LastBiteEvaluator::new(PlannerConfig::default().last_bite);

    let p1 = evaluator.evaluate_sku(&records[0], 30.0);
    assert_eq!(p1.doi_current, Some(30.0));
    assert_eq!(p1.doi_new, Some(33.0));
    assert_eq!(p1.verdict, Verdict::Proceed);

    let (rows, summary) = evaluator.evaluate_brand(&records, "ACME", 30.0);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].extra_qty, 0.0);
    assert_eq!(rows[1].verdict, Verdict::Undetermined);
    // 30 / 300 = 10% lift, above the 2% brand bar
    assert_eq!(summary.verdict, Verdict::NotRecommended);
}

#[test]
fn blend_projection_from_history_files() {
    let dir = tempfile::tempdir().unwrap();
    let observed = write(
        dir.path(),
        "oos_history.csv",
        "Date Key,OOS%\n2025-02-24,10\n2025-02-25,12\n2025-02-26,14\n2025-02-27,16\n",
    );
    let supply = write(
        dir.path(),
        "supply.csv",
        "Date,KOS,STL\n2025-02-26,100000,80000\n2025-02-27,100000,80000\n",
    );
    let config_path = write(
        dir.path(),
        "config.json",
        r#"{ "oos": { "start_date": "2025-03-01", "horizon_days": 3, "pinned": {},
              "supply_before": { "primary": 100000, "secondary": 80000 },
              "model": { "kind": "historical_blend", "decay_rate": 0.0, "demand_weight": 1.0 } } }"#,
    );

    let config = PlannerConfig::load(&config_path).unwrap();
    let history = ObservedHistory {
        oos_pct: demand::load_oos_pct_file(&observed).unwrap().into_iter().collect(),
        supply: demand::load_supply_file(&supply).unwrap(),
    };
    let rows = OosProjector::new(config.oos).with_history(history).project(&[]);

    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| !r.pinned));
    // supply matches its own history, no forecast: the lagged mean alone
    assert_eq!(rows[0].projected_oos_pct, 11.0);
    assert_eq!(rows[1].projected_oos_pct, 12.0);
    assert_eq!(rows[2].projected_oos_pct, 14.0);
}
