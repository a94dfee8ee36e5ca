// src/error.rs

use thiserror::Error;

/// Failures at the I/O boundary.
///
/// The computations themselves never fail; only loading inputs, reading
/// configuration and writing reports can.
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("failed to access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("missing required column '{column}' in '{path}'")]
    MissingColumn { path: String, column: String },

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("unsupported configuration schema version {found} (expected {expected})")]
    UnsupportedSchema { found: u32, expected: u32 },

    #[error("no data for {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, PlannerError>;
