//! CLI commands for the meter collector.

pub mod collect;
pub mod config;
pub mod validate;

pub use collect::run_collect;
pub use config::resolve_config;
pub use validate::run_validate;
