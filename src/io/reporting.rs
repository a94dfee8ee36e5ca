// src/io/reporting.rs

use crate::error::{PlannerError, Result};
use crate::model::metrics::DoiOutcome;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Serialises rows as CSV to any writer.
pub fn write_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> std::result::Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    // Flush the buffer to ensure all data is written
    wtr.flush()?;
    Ok(())
}

/// Writes rows to a CSV file.
///
/// # Arguments
/// * `file_path` - Where to save the file (e.g., "out/refined_doi_output.csv").
/// * `rows` - One serialisable record per output row.
pub fn write_report<T: Serialize>(file_path: impl AsRef<Path>, rows: &[T]) -> Result<()> {
    let path = file_path.as_ref();
    let file = std::fs::File::create(path).map_err(|source| PlannerError::Io {
        path: path.display().to_string(),
        source,
    })?;
    write_rows(file, rows).map_err(|source| PlannerError::Csv {
        path: path.display().to_string(),
        source,
    })?;

    info!(rows = rows.len(), path = %path.display(), "report written");
    Ok(())
}

/// Writes to `path` when given, otherwise to stdout.
pub fn emit<T: Serialize>(path: Option<&Path>, rows: &[T]) -> Result<()> {
    match path {
        Some(p) => write_report(p, rows),
        None => write_rows(std::io::stdout().lock(), rows).map_err(|source| PlannerError::Csv {
            path: "<stdout>".to_string(),
            source,
        }),
    }
}

/// Keeps only the rows whose final DOI differs from the policy.
pub fn changed_only(outcomes: &[DoiOutcome]) -> Vec<DoiOutcome> {
    outcomes.iter().filter(|o| o.changed()).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::ParetoClass;

    fn outcome(product: &str, policy: f64, final_doi: f64) -> DoiOutcome {
        DoiOutcome {
            location_id: "160".into(),
            product_id: product.into(),
            product_type: "Dry".into(),
            pareto: ParetoClass::A,
            demand_type: "Volatile".into(),
            doi_policy: policy,
            final_doi,
            applied: policy != final_doi,
            safety_term: 0.0,
            reschedule_term: 0.0,
            pareto_term: 0.0,
            multiplier: 1.0,
        }
    }

    #[test]
    fn csv_has_header_and_rows() {
        let mut buf = Vec::new();
        write_rows(&mut buf, &[outcome("P1", 20.0, 17.4)]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("location_id,product_id,product_type,pareto"));
        assert!(lines.next().unwrap().starts_with("160,P1,Dry,A,Volatile,20.0,17.4,true"));
    }

    #[test]
    fn changed_only_filters_untouched_rows() {
        let rows = vec![outcome("P1", 20.0, 17.4), outcome("P2", 10.0, 10.0)];
        let changed = changed_only(&rows);
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].product_id, "P1");
    }

    #[test]
    fn report_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doi.csv");
        write_report(&path, &[outcome("P1", 20.0, 17.4)]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
