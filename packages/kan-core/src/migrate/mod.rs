//! Schema migration: `plan` inspects stamps without side effects, `execute`
//! upgrades whatever the plan marks as behind.

mod execute;
mod plan;
mod steps;

use std::path::PathBuf;

pub use execute::{execute, MigrationOutcome};
pub use plan::{plan, BoardMigration, CardMigration, EntityMigration, MigrationPlan};

use crate::schema::EntityKind;
use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Cannot read directory {}: {source}", .path.display())]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(
        "{} has {kind} schema {found}, newer than the supported {supported}",
        .path.display()
    )]
    NewerSchema {
        path: PathBuf,
        kind: EntityKind,
        found: u32,
        supported: u32,
    },

    #[error("Migration incomplete: {} entities failed", .failures.len())]
    Incomplete {
        failures: Vec<MigrationError>,
        completed: MigrationOutcome,
    },
}
