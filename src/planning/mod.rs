pub mod config;
pub mod engine;
pub mod last_bite;
pub mod oos;
pub mod so_qty;
pub mod warehouse;
