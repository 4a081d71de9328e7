//! CLI command implementations.

mod config;
mod doctor;
mod ingest;
mod list;
mod recommend;
mod stats;

pub use config::run_config;
pub use doctor::run_doctor;
pub use ingest::{run_ingest, IngestSource};
pub use list::run_list;
pub use recommend::run_recommend;
pub use stats::run_stats;
