mod audit;
mod ledger;

pub use audit::*;
pub use ledger::*;

/// SQL migration for the initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");
