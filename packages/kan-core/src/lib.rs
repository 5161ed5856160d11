//! Kan core: on-disk model for kanban boards plus the schema migration engine
//! and the doctor that diagnoses and repairs a board tree.

pub mod config;
pub mod doctor;
pub mod fields;
pub mod migrate;
pub mod paths;
pub mod schema;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use doctor::{diagnose, fix, DiagnosticReport, Issue, IssueCode, Severity};
pub use migrate::{execute, plan, MigrationOutcome, MigrationPlan};
pub use paths::KanPaths;
