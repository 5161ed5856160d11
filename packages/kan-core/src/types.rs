use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::fields::{CustomFieldValue, FieldError};

/// Inline column membership written by pre-versioning cards. Membership now
/// lives exclusively in the board's column lists.
pub const LEGACY_CARD_COLUMN_KEY: &str = "column";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Ordered card membership; the only record of which card sits where.
    #[serde(default)]
    pub card_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    String,
    Enum,
    EnumSet,
    FreeSet,
    Date,
}

impl FieldType {
    /// Types whose values render as chips in `card_display.badges`.
    pub fn is_set(self) -> bool {
        matches!(self, FieldType::EnumSet | FieldType::FreeSet)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Enum => "enum",
            FieldType::EnumSet => "enum-set",
            FieldType::FreeSet => "free-set",
            FieldType::Date => "date",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    #[serde(default)]
    pub color: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldSchema {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
}

impl CustomFieldSchema {
    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }
}

/// Which custom fields render as the type badge, as chips, or as plain text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardDisplay {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub type_indicator: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub badges: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<String>,
}

impl CardDisplay {
    pub fn is_empty(&self) -> bool {
        self.type_indicator.is_empty() && self.badges.is_empty() && self.metadata.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkRule {
    #[serde(default)]
    pub name: String,
    pub pattern: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternHook {
    #[serde(default)]
    pub name: String,
    pub pattern: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// A board's `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// `board/<N>`; written by the store, rewritten only by migrations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kan_schema: Option<String>,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_column: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, CustomFieldSchema>,
    #[serde(default, skip_serializing_if = "CardDisplay::is_empty")]
    pub card_display: CardDisplay,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link_rules: Vec<LinkRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pattern_hooks: Vec<PatternHook>,
}

impl BoardConfig {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Column that receives new (and recovered) cards: the configured default
    /// when it names a real column, otherwise the first column.
    pub fn effective_default_column(&self) -> Option<&Column> {
        self.column(&self.default_column)
            .or_else(|| self.columns.first())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub body: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub created_at_millis: i64,
}

/// The fixed part of a card document; everything else is collected into
/// `extra` and decoded against the board's custom field schema.
#[derive(Debug, Deserialize, Serialize)]
struct CardFrame {
    id: String,
    #[serde(default)]
    alias: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<String>,
    #[serde(default)]
    creator: String,
    #[serde(default)]
    created_at_millis: i64,
    #[serde(default)]
    updated_at_millis: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    comments: Vec<Comment>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Card {
    pub id: String,
    pub alias: String,
    pub title: String,
    pub description: String,
    pub parent: Option<String>,
    pub creator: String,
    pub created_at_millis: i64,
    pub updated_at_millis: i64,
    pub comments: Vec<Comment>,
    pub fields: BTreeMap<String, CustomFieldValue>,
}

impl Card {
    /// Strict decode of a card object. Top-level keys beyond the fixed card
    /// keys must be custom fields declared by the board; the legacy inline
    /// `column` key is rejected.
    pub fn from_json(
        object: Map<String, Value>,
        schema: &BTreeMap<String, CustomFieldSchema>,
    ) -> Result<Card, FieldError> {
        let frame: CardFrame = serde_json::from_value(Value::Object(object))
            .map_err(|e| FieldError::Frame(e.to_string()))?;

        let mut fields = BTreeMap::new();
        for (key, value) in frame.extra {
            if key == crate::schema::CARD_VERSION_KEY {
                continue;
            }
            if key == LEGACY_CARD_COLUMN_KEY {
                return Err(FieldError::LegacyColumn);
            }
            let field_schema = schema
                .get(&key)
                .ok_or_else(|| FieldError::Undeclared(key.clone()))?;
            let decoded = CustomFieldValue::decode(&key, field_schema, &value)?;
            fields.insert(key, decoded);
        }

        Ok(Card {
            id: frame.id,
            alias: frame.alias,
            title: frame.title,
            description: frame.description,
            parent: frame.parent.filter(|p| !p.is_empty()),
            creator: frame.creator,
            created_at_millis: frame.created_at_millis,
            updated_at_millis: frame.updated_at_millis,
            comments: frame.comments,
            fields,
        })
    }

    /// Encode without the version stamp; custom fields become top-level keys.
    pub fn to_json(&self) -> Map<String, Value> {
        let frame = CardFrame {
            id: self.id.clone(),
            alias: self.alias.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            parent: self.parent.clone(),
            creator: self.creator.clone(),
            created_at_millis: self.created_at_millis,
            updated_at_millis: self.updated_at_millis,
            comments: self.comments.clone(),
            extra: Map::new(),
        };
        let mut object = match serde_json::to_value(frame) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for (name, value) in &self.fields {
            object.insert(name.clone(), value.encode());
        }
        object
    }
}
