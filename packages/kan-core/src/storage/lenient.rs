//! Tolerant readers for migration planning and diagnostics.
//!
//! These never check the schema stamp against the current version; they
//! record whatever version the file claims (0 when absent) together with the
//! raw document so callers can inspect or rewrite it. Unknown keys are kept.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{parse_json_object, parse_toml_table, read_text, StorageError};
use crate::schema::{self, EntityKind};
use crate::types::{BoardConfig, Column, LEGACY_CARD_COLUMN_KEY};

/// A TOML entity as found on disk.
#[derive(Debug, Clone)]
pub struct RawToml {
    pub path: PathBuf,
    pub text: String,
    pub table: toml::Table,
    pub version: u32,
}

/// A board config: the raw document plus its tolerant typed view.
#[derive(Debug, Clone)]
pub struct RawBoard {
    pub raw: RawToml,
    pub config: BoardConfig,
}

/// A card file as found on disk.
#[derive(Debug, Clone)]
pub struct RawCard {
    pub path: PathBuf,
    /// File stem; the card's identity as far as columns are concerned.
    pub id: String,
    pub object: Map<String, Value>,
    pub version: u32,
    pub has_legacy_column: bool,
}

impl RawCard {
    /// Non-empty `parent` value, if any.
    pub fn parent(&self) -> Option<&str> {
        self.object
            .get("parent")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
    }
}

pub fn read_toml_lenient(kind: EntityKind, path: &Path) -> Result<RawToml, StorageError> {
    let text = read_text(path)?;
    let table = parse_toml_table(path, &text)?;
    let version = schema::table_version(kind, &table);
    Ok(RawToml {
        path: path.to_path_buf(),
        text,
        table,
        version,
    })
}

pub fn read_board_lenient(path: &Path) -> Result<RawBoard, StorageError> {
    let raw = read_toml_lenient(EntityKind::Board, path)?;
    let config = board_from_table(path, &raw.table)?;
    Ok(RawBoard { raw, config })
}

/// Typed view of a raw board table; unknown and legacy keys are ignored.
pub fn board_from_table(path: &Path, table: &toml::Table) -> Result<BoardConfig, StorageError> {
    toml::Value::Table(table.clone())
        .try_into()
        .map_err(|e: toml::de::Error| StorageError::Shape {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

#[derive(Deserialize)]
struct BoardSkeleton {
    #[serde(default)]
    default_column: String,
    #[serde(default)]
    columns: Vec<ColumnSkeleton>,
}

#[derive(Deserialize)]
struct ColumnSkeleton {
    #[serde(default)]
    name: String,
    #[serde(default)]
    card_ids: Vec<String>,
}

/// Column membership and default column of a board table whose full typed
/// view does not decode (an unknown field type, a negative limit, ...).
/// Everything else is left at its default. `None` when even the column lists
/// are unusable.
pub fn board_skeleton(table: &toml::Table) -> Option<BoardConfig> {
    let skeleton: BoardSkeleton = toml::Value::Table(table.clone()).try_into().ok()?;
    Some(BoardConfig {
        default_column: skeleton.default_column,
        columns: skeleton
            .columns
            .into_iter()
            .map(|c| Column {
                name: c.name,
                card_ids: c.card_ids,
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    })
}

pub fn read_card_lenient(path: &Path) -> Result<RawCard, StorageError> {
    let text = read_text(path)?;
    let object = parse_json_object(path, &text)?;
    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(RawCard {
        path: path.to_path_buf(),
        id,
        version: schema::card_version(&object),
        has_legacy_column: object.contains_key(LEGACY_CARD_COLUMN_KEY),
        object,
    })
}
