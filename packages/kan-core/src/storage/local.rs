//! Local filesystem store for the normal runtime.
//!
//! Reads are strict: the stamp must match the current schema version and
//! cards may only carry fields the board declares. Every write stamps the
//! current version and goes through an atomic rename.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{
    parse_json_object, parse_toml_table, read_text, write_json_object, write_text, StorageError,
};
use crate::config::{GlobalConfig, ProjectConfig};
use crate::paths::KanPaths;
use crate::schema::{self, EntityKind, CARD_SCHEMA_VERSION, CARD_VERSION_KEY};
use crate::types::{BoardConfig, Card};

pub struct LocalStore {
    paths: KanPaths,
}

impl LocalStore {
    pub fn new(paths: KanPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &KanPaths {
        &self.paths
    }

    pub fn load_board(&self, board: &str) -> Result<BoardConfig, StorageError> {
        load_stamped_toml(EntityKind::Board, &self.paths.board_config(board))
    }

    pub fn save_board(&self, board: &str, config: &BoardConfig) -> Result<(), StorageError> {
        let mut stamped = config.clone();
        stamped.kan_schema = Some(current_stamp(EntityKind::Board));
        save_toml(&self.paths.board_config(board), &stamped)
    }

    pub fn load_card(
        &self,
        board: &str,
        config: &BoardConfig,
        card_id: &str,
    ) -> Result<Card, StorageError> {
        let path = self.paths.card_path(board, card_id);
        let object = parse_json_object(&path, &read_text(&path)?)?;

        let found = schema::card_version(&object);
        if found != CARD_SCHEMA_VERSION {
            return Err(StorageError::SchemaMismatch {
                path,
                expected: CARD_SCHEMA_VERSION.to_string(),
                found: found.to_string(),
            });
        }

        Card::from_json(object, &config.custom_fields)
            .map_err(|source| StorageError::Card { path, source })
    }

    pub fn save_card(&self, board: &str, card: &Card) -> Result<(), StorageError> {
        let mut object = Map::new();
        object.insert(CARD_VERSION_KEY.to_string(), Value::from(CARD_SCHEMA_VERSION));
        object.extend(card.to_json());
        let path = self.paths.card_path(board, &card.id);
        log::debug!("[kan.storage] Writing card {}", path.display());
        write_json_object(&path, &object)
    }

    pub fn load_global(&self) -> Result<GlobalConfig, StorageError> {
        load_stamped_toml(EntityKind::Global, self.paths.global_config())
    }

    pub fn save_global(&self, config: &GlobalConfig) -> Result<(), StorageError> {
        let mut stamped = config.clone();
        stamped.kan_schema = Some(current_stamp(EntityKind::Global));
        save_toml(self.paths.global_config(), &stamped)
    }

    pub fn load_project(&self) -> Result<ProjectConfig, StorageError> {
        load_stamped_toml(EntityKind::Project, &self.paths.project_config())
    }

    pub fn save_project(&self, config: &ProjectConfig) -> Result<(), StorageError> {
        let mut stamped = config.clone();
        stamped.kan_schema = Some(current_stamp(EntityKind::Project));
        save_toml(&self.paths.project_config(), &stamped)
    }
}

fn current_stamp(kind: EntityKind) -> String {
    schema::format_stamp(kind, kind.current_version())
}

fn load_stamped_toml<T: DeserializeOwned>(kind: EntityKind, path: &Path) -> Result<T, StorageError> {
    let table = parse_toml_table(path, &read_text(path)?)?;
    let found = schema::table_version(kind, &table);
    if found != kind.current_version() {
        let found = table
            .get(schema::SCHEMA_KEY)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "(missing)".to_string());
        return Err(StorageError::SchemaMismatch {
            path: path.to_path_buf(),
            expected: current_stamp(kind),
            found,
        });
    }
    toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| StorageError::Shape {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

fn save_toml<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let text = toml::to_string(value).map_err(|e| StorageError::Encode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    log::debug!("[kan.storage] Writing {}", path.display());
    write_text(path, &text)
}
