use std::path::{Path, PathBuf};

use serde::Serialize;

use super::MigrationError;
use crate::paths::KanPaths;
use crate::schema::{EntityKind, CARD_SCHEMA_VERSION};
use crate::storage::lenient::{read_card_lenient, read_toml_lenient};

/// Version state of a single TOML entity (board, global or project config).
#[derive(Debug, Clone, Serialize)]
pub struct EntityMigration {
    pub kind: EntityKind,
    pub path: PathBuf,
    pub from_version: u32,
    pub to_version: u32,
    pub needs_migration: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardMigration {
    pub id: String,
    pub path: PathBuf,
    pub from_version: u32,
    pub to_version: u32,
    pub needs_migration: bool,
    /// The card still has the inline `column` field.
    pub remove_column: bool,
}

impl CardMigration {
    pub fn has_changes(&self) -> bool {
        self.needs_migration || self.remove_column
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardMigration {
    pub name: String,
    pub config: EntityMigration,
    pub cards: Vec<CardMigration>,
}

impl BoardMigration {
    pub fn has_changes(&self) -> bool {
        self.config.needs_migration || self.cards.iter().any(CardMigration::has_changes)
    }

    pub fn pending_cards(&self) -> impl Iterator<Item = &CardMigration> {
        self.cards.iter().filter(|c| c.has_changes())
    }
}

/// What a migration run would do. Computing it never touches the files.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationPlan {
    /// `None` when the file does not exist.
    pub global: Option<EntityMigration>,
    pub project: Option<EntityMigration>,
    pub boards: Vec<BoardMigration>,
}

impl MigrationPlan {
    pub fn has_changes(&self) -> bool {
        self.configs().any(|c| c.needs_migration) || self.boards.iter().any(BoardMigration::has_changes)
    }

    pub fn pending_boards(&self) -> impl Iterator<Item = &BoardMigration> {
        self.boards.iter().filter(|b| b.has_changes())
    }

    /// Global and project config entries that exist.
    pub fn configs(&self) -> impl Iterator<Item = &EntityMigration> {
        self.global.iter().chain(self.project.iter())
    }
}

/// Inspect every entity under `paths` and compare its stamp with the
/// current schema version.
pub fn plan(paths: &KanPaths) -> Result<MigrationPlan, MigrationError> {
    let global = plan_optional_config(EntityKind::Global, paths.global_config());
    let project = plan_optional_config(EntityKind::Project, &paths.project_config());

    let boards_dir = paths.boards_dir();
    let names = paths
        .list_board_names()
        .map_err(|source| MigrationError::Directory {
            path: boards_dir,
            source,
        })?;

    let mut boards = Vec::with_capacity(names.len());
    for name in names {
        boards.push(plan_board(paths, &name)?);
    }

    Ok(MigrationPlan {
        global,
        project,
        boards,
    })
}

fn plan_board(paths: &KanPaths, name: &str) -> Result<BoardMigration, MigrationError> {
    let config = plan_toml(EntityKind::Board, &paths.board_config(name));

    let card_ids = paths
        .list_card_ids(name)
        .map_err(|source| MigrationError::Directory {
            path: paths.cards_dir(name),
            source,
        })?;

    let cards = card_ids
        .into_iter()
        .map(|id| {
            let path = paths.card_path(name, &id);
            let (from_version, remove_column) = match read_card_lenient(&path) {
                Ok(card) => (card.version, card.has_legacy_column),
                Err(e) => {
                    log::warn!("[kan.migrate] {} (treating as version 0)", e);
                    (0, false)
                }
            };
            CardMigration {
                id,
                path,
                from_version,
                to_version: CARD_SCHEMA_VERSION,
                needs_migration: from_version != CARD_SCHEMA_VERSION,
                remove_column,
            }
        })
        .collect();

    Ok(BoardMigration {
        name: name.to_string(),
        config,
        cards,
    })
}

fn plan_optional_config(kind: EntityKind, path: &Path) -> Option<EntityMigration> {
    path.exists().then(|| plan_toml(kind, path))
}

/// An unreadable or unparseable file plans as version 0 so the executor
/// surfaces the underlying error for it.
fn plan_toml(kind: EntityKind, path: &Path) -> EntityMigration {
    let from_version = match read_toml_lenient(kind, path) {
        Ok(raw) => raw.version,
        Err(e) => {
            log::warn!("[kan.migrate] {} (treating as version 0)", e);
            0
        }
    };
    let to_version = kind.current_version();
    EntityMigration {
        kind,
        path: path.to_path_buf(),
        from_version,
        to_version,
        needs_migration: from_version != to_version,
    }
}
