//! Temporary kan data trees for tests.

use std::collections::BTreeMap;
use std::fs;

use serde_json::{Map, Value};
use tempfile::TempDir;

use crate::paths::KanPaths;
use crate::storage::local::LocalStore;
use crate::types::{
    BoardConfig, Card, CardDisplay, Column, CustomFieldSchema, FieldOption, FieldType,
};

pub(crate) struct Fixture {
    _tmp: TempDir,
    pub paths: KanPaths,
    pub store: LocalStore,
}

impl Fixture {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let paths = KanPaths::new(
            tmp.path().join("project").join(".kan"),
            tmp.path().join("home").join("kan").join("config.toml"),
        );
        fs::create_dir_all(paths.boards_dir()).unwrap();
        Self {
            _tmp: tmp,
            store: LocalStore::new(paths.clone()),
            paths,
        }
    }

    pub fn write_board_text(&self, board: &str, text: &str) {
        let path = self.paths.board_config(board);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    pub fn write_card_text(&self, board: &str, card_id: &str, text: &str) {
        fs::create_dir_all(self.paths.cards_dir(board)).unwrap();
        fs::write(self.paths.card_path(board, card_id), text).unwrap();
    }

    pub fn write_global_text(&self, text: &str) {
        let path = self.paths.global_config();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    pub fn write_project_text(&self, text: &str) {
        let path = self.paths.project_config();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    pub fn board_text(&self, board: &str) -> String {
        fs::read_to_string(self.paths.board_config(board)).unwrap()
    }

    pub fn board_table(&self, board: &str) -> toml::Table {
        self.board_text(board).parse().unwrap()
    }

    pub fn card_object(&self, board: &str, card_id: &str) -> Map<String, Value> {
        let text = fs::read_to_string(self.paths.card_path(board, card_id)).unwrap();
        match serde_json::from_str(&text).unwrap() {
            Value::Object(map) => map,
            other => panic!("card is not an object: {other}"),
        }
    }

    /// A board using every field type, with a valid card display.
    pub fn board_with_fields(&self) -> BoardConfig {
        let mut custom_fields = BTreeMap::new();
        custom_fields.insert(
            "type".to_string(),
            CustomFieldSchema {
                field_type: FieldType::Enum,
                options: vec![
                    option("bug", "#ef4444"),
                    option("feature", "#3b82f6"),
                ],
            },
        );
        custom_fields.insert(
            "labels".to_string(),
            CustomFieldSchema {
                field_type: FieldType::EnumSet,
                options: vec![option("ui", "#a855f7")],
            },
        );
        custom_fields.insert(
            "tags".to_string(),
            CustomFieldSchema {
                field_type: FieldType::FreeSet,
                options: Vec::new(),
            },
        );
        custom_fields.insert(
            "due".to_string(),
            CustomFieldSchema {
                field_type: FieldType::Date,
                options: Vec::new(),
            },
        );
        custom_fields.insert(
            "owner".to_string(),
            CustomFieldSchema {
                field_type: FieldType::String,
                options: Vec::new(),
            },
        );

        BoardConfig {
            kan_schema: None,
            id: "board-main".into(),
            name: "main".into(),
            default_column: "backlog".into(),
            columns: vec![column("backlog", &[]), column("doing", &[]), column("done", &[])],
            custom_fields,
            card_display: CardDisplay {
                type_indicator: "type".into(),
                badges: vec!["labels".into(), "tags".into()],
                metadata: vec!["due".into(), "owner".into()],
            },
            link_rules: Vec::new(),
            pattern_hooks: Vec::new(),
        }
    }

    /// Saves `board` through the store plus one current-version card per id
    /// listed in its columns.
    pub fn save_board_with_cards(&self, board: &BoardConfig) {
        self.store.save_board(&board.name, board).unwrap();
        for col in &board.columns {
            for id in &col.card_ids {
                self.store.save_card(&board.name, &card(id)).unwrap();
            }
        }
    }
}

pub(crate) fn column(name: &str, ids: &[&str]) -> Column {
    Column {
        name: name.to_string(),
        color: "#6b7280".to_string(),
        limit: None,
        card_ids: ids.iter().map(|s| s.to_string()).collect(),
    }
}

pub(crate) fn card(id: &str) -> Card {
    Card {
        id: id.to_string(),
        alias: format!("{id}-alias"),
        title: format!("Card {id}"),
        creator: "tester".to_string(),
        created_at_millis: 1_700_000_000_000,
        updated_at_millis: 1_700_000_000_000,
        ..Default::default()
    }
}

fn option(value: &str, color: &str) -> FieldOption {
    FieldOption {
        value: value.to_string(),
        color: color.to_string(),
        description: String::new(),
    }
}
