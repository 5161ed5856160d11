//! Ordered schema upgrade steps per entity type.
//!
//! Each step moves a document from `from` to `to`. A step without a
//! transform is a pure stamp bump. Transforms report whether they changed
//! the document; when no step in a chain changes anything structurally the
//! executor only rewrites the stamp line and leaves the rest of the file
//! byte-for-byte intact.

use serde_json::{Map, Value};

use crate::types::LEGACY_CARD_COLUMN_KEY;

pub(crate) struct MigrationStep<D: 'static> {
    pub from: u32,
    pub to: u32,
    pub description: &'static str,
    pub transform: Option<fn(&mut D) -> bool>,
}

pub(crate) static BOARD_STEPS: &[MigrationStep<toml::Table>] = &[
    MigrationStep {
        from: 0,
        to: 1,
        description: "introduce schema stamp",
        transform: None,
    },
    MigrationStep {
        from: 1,
        to: 2,
        description: "convert labels to an enum-set custom field",
        transform: Some(labels_to_custom_field),
    },
    MigrationStep {
        from: 2,
        to: 3,
        description: "recognize link rules and pattern hooks",
        transform: None,
    },
];

pub(crate) static CARD_STEPS: &[MigrationStep<Map<String, Value>>] = &[MigrationStep {
    from: 0,
    to: 1,
    description: "drop inline column membership",
    transform: Some(drop_card_column),
}];

/// Shared by the global and project configs.
pub(crate) static CONFIG_STEPS: &[MigrationStep<toml::Table>] = &[MigrationStep {
    from: 0,
    to: 1,
    description: "introduce schema stamp",
    transform: None,
}];

#[derive(Debug, Default)]
pub(crate) struct ChainResult {
    pub structural: bool,
    pub applied: Vec<&'static str>,
}

/// Applies every step inside `from..to`, in table order.
pub(crate) fn apply_chain<D>(
    steps: &[MigrationStep<D>],
    doc: &mut D,
    from: u32,
    to: u32,
) -> ChainResult {
    let mut result = ChainResult::default();
    for step in steps.iter().filter(|s| s.from >= from && s.to <= to) {
        if let Some(transform) = step.transform {
            if transform(doc) {
                result.structural = true;
            }
        }
        result.applied.push(step.description);
    }
    result
}

pub(crate) const LABELS_FIELD: &str = "labels";

/// Board v1 -> v2: `labels` (tables or bare names) becomes the
/// `labels` enum-set custom field, shown as badges.
fn labels_to_custom_field(table: &mut toml::Table) -> bool {
    let Some(legacy) = table.remove(LABELS_FIELD) else {
        return false;
    };
    let Some(entries) = legacy.as_array() else {
        // Not something we know how to convert; keep it untouched.
        table.insert(LABELS_FIELD.to_string(), legacy);
        return false;
    };

    let converted: Option<Vec<toml::Value>> = entries.iter().map(label_option).collect();
    let Some(options) = converted else {
        log::warn!("[kan.migrate] Unrecognized labels entry; leaving the labels list in place");
        table.insert(LABELS_FIELD.to_string(), legacy);
        return false;
    };

    if options.is_empty() {
        return true;
    }

    let fields = table
        .entry("custom_fields")
        .or_insert(toml::Value::Table(toml::Table::new()));
    if let Some(fields) = fields.as_table_mut() {
        match fields.get_mut(LABELS_FIELD).and_then(toml::Value::as_table_mut) {
            Some(existing) => merge_options(existing, options),
            None => {
                let mut field = toml::Table::new();
                field.insert("type".into(), toml::Value::String("enum-set".into()));
                field.insert("options".into(), toml::Value::Array(options));
                fields.insert(LABELS_FIELD.to_string(), toml::Value::Table(field));
            }
        }
    }

    let display = table
        .entry("card_display")
        .or_insert(toml::Value::Table(toml::Table::new()));
    if let Some(display) = display.as_table_mut() {
        let badges = display
            .entry("badges")
            .or_insert(toml::Value::Array(Vec::new()));
        if let Some(badges) = badges.as_array_mut() {
            if !badges.iter().any(|b| b.as_str() == Some(LABELS_FIELD)) {
                badges.push(toml::Value::String(LABELS_FIELD.to_string()));
            }
        }
    }

    true
}

/// One legacy label as a field option. Labels are either `{ name, color,
/// description }` tables or bare names.
fn label_option(label: &toml::Value) -> Option<toml::Value> {
    let mut option = toml::Table::new();
    match label {
        toml::Value::String(name) => {
            option.insert("value".into(), toml::Value::String(name.clone()));
        }
        toml::Value::Table(label) => {
            let name = label.get("name")?.as_str()?;
            option.insert("value".into(), toml::Value::String(name.to_string()));
            option.insert(
                "color".into(),
                toml::Value::String(str_field(label, "color")),
            );
            let description = str_field(label, "description");
            if !description.is_empty() {
                option.insert("description".into(), toml::Value::String(description));
            }
        }
        _ => return None,
    }
    Some(toml::Value::Table(option))
}

/// Adds options whose value is not already declared on an existing field.
fn merge_options(field: &mut toml::Table, options: Vec<toml::Value>) {
    let existing = field
        .entry("options")
        .or_insert(toml::Value::Array(Vec::new()));
    let Some(existing) = existing.as_array_mut() else {
        return;
    };
    for option in options {
        let value = option.get("value").and_then(toml::Value::as_str);
        let known = existing
            .iter()
            .any(|o| o.get("value").and_then(toml::Value::as_str) == value);
        if !known {
            existing.push(option);
        }
    }
}

fn str_field(table: &toml::Table, key: &str) -> String {
    table
        .get(key)
        .and_then(toml::Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Card v0 -> v1: column membership moved to the board file.
fn drop_card_column(card: &mut Map<String, Value>) -> bool {
    card.shift_remove(LEGACY_CARD_COLUMN_KEY).is_some()
}
