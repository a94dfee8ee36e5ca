//! Inventory planning metrics: adjusted days-of-inventory, OOS% projection,
//! SO quantities for a target OOS%, and extra-stock evaluation.
//!
//! Every computation is a pure function of its inputs and a
//! [`PlannerConfig`]; only the `io` module touches the filesystem.

pub mod error;
pub mod io;
pub mod logging;
pub mod model;
pub mod planning;
pub mod strategy;

pub use error::{PlannerError, Result};
pub use model::metrics::{DoiOutcome, LastBiteOutcome, ProjectionRow, Verdict};
pub use model::record::{InventoryRecord, ParetoClass};
pub use planning::config::PlannerConfig;
pub use planning::engine::DoiEngine;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
