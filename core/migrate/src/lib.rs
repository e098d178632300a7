//! vaultbridge migration engine
//!
//! This module copies one vault into another, including:
//! - Loading both sides into independent indexes
//! - Optional destructive reset of the target
//! - Name and structure based reconciliation, so reruns create nothing new
//! - A report of everything created, reused, skipped and deleted

pub mod engine;
pub mod load;
pub mod report;

pub use engine::{MigrationConfig, MigrationEngine};
pub use load::load_vault;
pub use report::MigrationReport;
