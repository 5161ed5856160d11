pub mod lenient;
pub mod local;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::fields::FieldError;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid TOML in {}: {source}", .path.display())]
    InvalidToml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid JSON in {}: {source}", .path.display())]
    InvalidJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{} is not a JSON object", .path.display())]
    NotAnObject { path: PathBuf },

    #[error("Unexpected structure in {}: {message}", .path.display())]
    Shape { path: PathBuf, message: String },

    #[error("Failed to encode {}: {message}", .path.display())]
    Encode { path: PathBuf, message: String },

    #[error("{} has schema {found}, expected {expected}", .path.display())]
    SchemaMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("Invalid card {}: {source}", .path.display())]
    Card { path: PathBuf, source: FieldError },
}

pub fn read_text(path: &Path) -> Result<String, StorageError> {
    fs::read_to_string(path).map_err(|source| StorageError::Read {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_toml_table(path: &Path, text: &str) -> Result<toml::Table, StorageError> {
    toml::from_str(text).map_err(|source| StorageError::InvalidToml {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_json_object(path: &Path, text: &str) -> Result<Map<String, Value>, StorageError> {
    let value: Value = serde_json::from_str(text).map_err(|source| StorageError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(StorageError::NotAnObject {
            path: path.to_path_buf(),
        }),
    }
}

/// Full re-encode of a TOML document. Comments and formatting of the
/// original text are not kept.
pub fn write_toml_table(path: &Path, table: &toml::Table) -> Result<(), StorageError> {
    let text = toml::to_string(table).map_err(|e| StorageError::Encode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    write_text(path, &text)
}

/// Pretty JSON with two-space indentation and a trailing newline; key order
/// of the object is kept.
pub fn write_json_object(path: &Path, object: &Map<String, Value>) -> Result<(), StorageError> {
    let mut text = serde_json::to_string_pretty(object).map_err(|e| StorageError::Encode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    text.push('\n');
    write_text(path, &text)
}

pub fn write_text(path: &Path, content: &str) -> Result<(), StorageError> {
    atomic_write(path, content).map_err(|source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Atomic write with fsync: write to .tmp, fsync, rename, fsync directory.
/// Refuses to write empty content over a non-empty file.
fn atomic_write(path: &Path, content: &str) -> Result<(), std::io::Error> {
    if content.trim().is_empty() {
        if let Ok(existing) = fs::read_to_string(path) {
            if !existing.trim().is_empty() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "Refusing to overwrite non-empty file with empty content",
                ));
            }
        }
    }

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let tmp_path = path.with_extension("kan.tmp");
    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    fs::rename(&tmp_path, path)?;

    // fsync directory for rename durability
    if let Some(dir) = path.parent() {
        if let Ok(d) = fs::File::open(dir) {
            let _ = d.sync_all();
        }
    }
    Ok(())
}
