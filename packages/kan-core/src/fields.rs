//! Typed custom field values.
//!
//! Cards store board-defined fields as extra top-level JSON keys. The board's
//! `custom_fields` table says how each key is interpreted; decoding checks the
//! raw JSON against that declaration.

use chrono::NaiveDate;
use serde_json::Value;

use crate::types::{CustomFieldSchema, FieldType};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq)]
pub enum CustomFieldValue {
    /// `string` fields.
    Text(String),
    /// `enum` fields: one of the declared options.
    Choice(String),
    /// `enum-set` and `free-set` fields.
    Set(Vec<String>),
    Date(NaiveDate),
}

#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("Invalid card document: {0}")]
    Frame(String),

    #[error("Card still carries the legacy \"column\" field")]
    LegacyColumn,

    #[error("Field {0:?} is not declared by the board")]
    Undeclared(String),

    #[error("Field {field:?} expects a {expected} value")]
    WrongShape { field: String, expected: &'static str },

    #[error("Field {field:?} has no option {value:?}")]
    UnknownOption { field: String, value: String },

    #[error("Field {field:?} has invalid date {value:?} (expected YYYY-MM-DD)")]
    InvalidDate { field: String, value: String },
}

impl CustomFieldValue {
    pub fn decode(
        field: &str,
        schema: &CustomFieldSchema,
        value: &Value,
    ) -> Result<CustomFieldValue, FieldError> {
        match schema.field_type {
            FieldType::String => Ok(CustomFieldValue::Text(expect_str(field, value, "string")?)),
            FieldType::Enum => {
                let choice = expect_str(field, value, "enum")?;
                check_option(field, schema, &choice)?;
                Ok(CustomFieldValue::Choice(choice))
            }
            FieldType::EnumSet => {
                let items = expect_str_list(field, value, "enum-set")?;
                for item in &items {
                    check_option(field, schema, item)?;
                }
                Ok(CustomFieldValue::Set(items))
            }
            FieldType::FreeSet => Ok(CustomFieldValue::Set(expect_str_list(
                field, value, "free-set",
            )?)),
            FieldType::Date => {
                let raw = expect_str(field, value, "date")?;
                NaiveDate::parse_from_str(&raw, DATE_FORMAT)
                    .map(CustomFieldValue::Date)
                    .map_err(|_| FieldError::InvalidDate {
                        field: field.to_string(),
                        value: raw,
                    })
            }
        }
    }

    pub fn encode(&self) -> Value {
        match self {
            CustomFieldValue::Text(s) | CustomFieldValue::Choice(s) => Value::String(s.clone()),
            CustomFieldValue::Set(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            CustomFieldValue::Date(date) => Value::String(date.format(DATE_FORMAT).to_string()),
        }
    }
}

fn expect_str(field: &str, value: &Value, expected: &'static str) -> Result<String, FieldError> {
    value
        .as_str()
        .map(ToOwned::to_owned)
        .ok_or_else(|| FieldError::WrongShape {
            field: field.to_string(),
            expected,
        })
}

fn expect_str_list(
    field: &str,
    value: &Value,
    expected: &'static str,
) -> Result<Vec<String>, FieldError> {
    let shape_error = || FieldError::WrongShape {
        field: field.to_string(),
        expected,
    };
    value
        .as_array()
        .ok_or_else(shape_error)?
        .iter()
        .map(|item| item.as_str().map(ToOwned::to_owned).ok_or_else(shape_error))
        .collect()
}

fn check_option(field: &str, schema: &CustomFieldSchema, value: &str) -> Result<(), FieldError> {
    if schema.has_option(value) {
        Ok(())
    } else {
        Err(FieldError::UnknownOption {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}
