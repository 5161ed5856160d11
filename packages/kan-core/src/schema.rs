//! Schema version stamps.
//!
//! TOML entities carry `kan_schema = "<kind>/<N>"`, cards carry an integer
//! `"_v"`. A missing or unparseable stamp reads as version 0 (data written
//! before versioning existed).

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

pub const SCHEMA_KEY: &str = "kan_schema";
pub const CARD_VERSION_KEY: &str = "_v";

pub const BOARD_SCHEMA_VERSION: u32 = 3;
pub const CARD_SCHEMA_VERSION: u32 = 1;
pub const GLOBAL_SCHEMA_VERSION: u32 = 1;
pub const PROJECT_SCHEMA_VERSION: u32 = 1;

static STAMP_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*kan_schema\s*=").expect("stamp line regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Board,
    Card,
    Global,
    Project,
}

impl EntityKind {
    pub fn current_version(self) -> u32 {
        match self {
            EntityKind::Board => BOARD_SCHEMA_VERSION,
            EntityKind::Card => CARD_SCHEMA_VERSION,
            EntityKind::Global => GLOBAL_SCHEMA_VERSION,
            EntityKind::Project => PROJECT_SCHEMA_VERSION,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Board => "board",
            EntityKind::Card => "card",
            EntityKind::Global => "global",
            EntityKind::Project => "project",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `board/3`, `global/1`, ...
pub fn format_stamp(kind: EntityKind, version: u32) -> String {
    format!("{}/{}", kind.as_str(), version)
}

/// Version from a stamp string; 0 when the prefix is wrong or the number
/// does not parse.
pub fn parse_stamp(kind: EntityKind, stamp: &str) -> u32 {
    stamp
        .trim()
        .strip_prefix(kind.as_str())
        .and_then(|rest| rest.strip_prefix('/'))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

/// Version of a raw TOML entity (board, global or project config).
pub fn table_version(kind: EntityKind, table: &toml::Table) -> u32 {
    table
        .get(SCHEMA_KEY)
        .and_then(toml::Value::as_str)
        .map(|stamp| parse_stamp(kind, stamp))
        .unwrap_or(0)
}

/// Version of a raw card object. Integers are expected; a numeric string is
/// tolerated since hand-edited cards sometimes quote it.
pub fn card_version(object: &Map<String, Value>) -> u32 {
    match object.get(CARD_VERSION_KEY) {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()).unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Stamp-only update of a TOML document's text.
///
/// Only the stamp changes: when the document has a top-level `kan_schema`
/// key its line is replaced in place, otherwise the stamp and a blank
/// separator line are prepended. Every other byte of `raw` is kept, comments
/// and key order included. `None` when the existing stamp is not written on
/// a line of its own that can be swapped safely; callers then fall back to a
/// full rewrite.
pub fn restamp_text(kind: EntityKind, raw: &str, version: u32) -> Option<String> {
    let stamp = format_stamp(kind, version);
    let stamp_line = format!("{} = \"{}\"", SCHEMA_KEY, stamp);

    let original: toml::Table = raw.parse().ok()?;
    let Some(old_stamp) = original.get(SCHEMA_KEY) else {
        return Some(format!("{}\n\n{}", stamp_line, raw));
    };

    // A matching line may sit inside a table, an array or a multi-line
    // string; the candidate is accepted only if it changes the top-level key
    // and nothing else.
    let mut offset = 0;
    for line in raw.split_inclusive('\n') {
        if STAMP_LINE_RE.is_match(line) {
            let body = line.trim_end_matches(['\n', '\r']);
            let ending = &line[body.len()..];
            let mut candidate = String::with_capacity(raw.len() + stamp_line.len());
            candidate.push_str(&raw[..offset]);
            candidate.push_str(&stamp_line);
            candidate.push_str(ending);
            candidate.push_str(&raw[offset + line.len()..]);
            if only_stamp_changed(&candidate, &original, old_stamp, &stamp) {
                return Some(candidate);
            }
        }
        offset += line.len();
    }
    None
}

fn only_stamp_changed(
    candidate: &str,
    original: &toml::Table,
    old_stamp: &toml::Value,
    stamp: &str,
) -> bool {
    let Ok(mut table) = candidate.parse::<toml::Table>() else {
        return false;
    };
    if table.get(SCHEMA_KEY).and_then(toml::Value::as_str) != Some(stamp) {
        return false;
    }
    table.insert(SCHEMA_KEY.to_string(), old_stamp.clone());
    table == *original
}
