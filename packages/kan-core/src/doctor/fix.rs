use std::collections::HashSet;
use std::path::Path;

use super::{CardDisplayField, DiagnosticReport, Issue, IssueCode, ReportSummary};
use crate::paths::KanPaths;
use crate::schema::EntityKind;
use crate::storage::lenient::{board_from_table, read_card_lenient, read_toml_lenient};
use crate::storage::{write_json_object, write_toml_table, StorageError};

#[derive(Debug, thiserror::Error)]
enum FixError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("issue does not name a {0}")]
    MissingTarget(&'static str),

    #[error("issue has no card_display field to repair")]
    MissingContext,

    #[error("board has no columns")]
    NoColumns,

    #[error("{0}")]
    Shape(String),

    #[error("no automatic fix for {0}")]
    Unsupported(IssueCode),
}

/// Apply the repair for every fixable issue in `report`.
///
/// Repaired issues are dropped and counted in `fixed`. Issues whose repair
/// failed stay in the returned report with `fix_error` set. Everything else
/// passes through untouched. The tree is not diagnosed again.
pub fn fix(paths: &KanPaths, report: &DiagnosticReport) -> DiagnosticReport {
    let mut remaining = Vec::new();
    let mut fixed = 0;
    let mut fix_failed = 0;

    for issue in &report.issues {
        if !issue.fixable {
            remaining.push(issue.clone());
            continue;
        }
        match apply(paths, issue) {
            Ok(()) => {
                log::info!(
                    "[kan.doctor] Fixed {} on board {}{}",
                    issue.code,
                    issue.board.as_deref().unwrap_or("?"),
                    issue
                        .card_id
                        .as_deref()
                        .map(|id| format!(" (card {})", id))
                        .unwrap_or_default()
                );
                fixed += 1;
            }
            Err(e) => {
                log::warn!("[kan.doctor] Could not fix {}: {}", issue.code, e);
                let mut failed = issue.clone();
                failed.fix_error = Some(e.to_string());
                remaining.push(failed);
                fix_failed += 1;
            }
        }
    }

    let mut out = DiagnosticReport {
        boards: report.boards.clone(),
        issues: remaining,
        summary: ReportSummary {
            fixed,
            fix_failed,
            ..Default::default()
        },
    };
    out.recount();
    out
}

fn apply(paths: &KanPaths, issue: &Issue) -> Result<(), FixError> {
    let board = issue.board.as_deref().ok_or(FixError::MissingTarget("board"))?;
    let card_id = || issue.card_id.as_deref().ok_or(FixError::MissingTarget("card"));

    match issue.code {
        IssueCode::MissingCardFile => {
            let id = card_id()?;
            edit_board(paths, board, |_, table| {
                for ids in card_id_lists(table)? {
                    ids.retain(|v| v.as_str() != Some(id));
                }
                Ok(())
            })
        }
        IssueCode::OrphanedCard => {
            let id = card_id()?;
            edit_board(paths, board, |_, table| place_orphan(table, id))
        }
        IssueCode::DuplicateCardId => {
            let id = card_id()?;
            edit_board(paths, board, |_, table| {
                let mut seen = false;
                for ids in card_id_lists(table)? {
                    ids.retain(|v| {
                        if v.as_str() != Some(id) {
                            return true;
                        }
                        !std::mem::replace(&mut seen, true)
                    });
                }
                Ok(())
            })
        }
        IssueCode::InvalidDefaultColumn => edit_board(paths, board, |_, table| {
            match first_column_name(table) {
                Some(name) => {
                    table.insert("default_column".into(), toml::Value::String(name));
                }
                None => {
                    table.remove("default_column");
                }
            }
            Ok(())
        }),
        IssueCode::InvalidCardDisplay => {
            let field = issue
                .fix_context
                .as_ref()
                .and_then(|c| c.field)
                .ok_or(FixError::MissingContext)?;
            edit_board(paths, board, |path, table| repair_card_display(path, table, field))
        }
        IssueCode::InvalidParentRef => {
            let id = card_id()?;
            let card = read_card_lenient(&paths.card_path(board, id))?;
            let mut object = card.object;
            if object.shift_remove("parent").is_some() {
                write_json_object(&card.path, &object)?;
            }
            Ok(())
        }
        other => Err(FixError::Unsupported(other)),
    }
}

/// Re-read the raw board table, apply `edit`, write the table back.
fn edit_board<F>(paths: &KanPaths, board: &str, edit: F) -> Result<(), FixError>
where
    F: FnOnce(&Path, &mut toml::Table) -> Result<(), FixError>,
{
    let path = paths.board_config(board);
    let mut raw = read_toml_lenient(EntityKind::Board, &path)?;
    edit(&path, &mut raw.table)?;
    write_toml_table(&path, &raw.table)?;
    Ok(())
}

fn columns_mut(table: &mut toml::Table) -> Result<Vec<&mut toml::Table>, FixError> {
    let Some(columns) = table.get_mut("columns") else {
        return Ok(Vec::new());
    };
    let toml::Value::Array(columns) = columns else {
        return Err(FixError::Shape("columns is not an array".into()));
    };
    columns
        .iter_mut()
        .map(|c| {
            c.as_table_mut()
                .ok_or_else(|| FixError::Shape("column is not a table".into()))
        })
        .collect()
}

/// `card_ids` arrays of every column, in declaration order.
fn card_id_lists(table: &mut toml::Table) -> Result<Vec<&mut Vec<toml::Value>>, FixError> {
    let mut lists = Vec::new();
    for column in columns_mut(table)? {
        if let Some(ids) = column.get_mut("card_ids").and_then(toml::Value::as_array_mut) {
            lists.push(ids);
        }
    }
    Ok(lists)
}

fn column_name(column: &toml::Table) -> Option<&str> {
    column.get("name").and_then(toml::Value::as_str)
}

fn first_column_name(table: &mut toml::Table) -> Option<String> {
    columns_mut(table)
        .ok()?
        .first()
        .and_then(|c| column_name(c))
        .map(str::to_string)
}

/// Insert `id` at the top of the default column, or the first column when
/// the default is unset or names no column. A card already placed somewhere
/// is left alone.
fn place_orphan(table: &mut toml::Table, id: &str) -> Result<(), FixError> {
    let default = table
        .get("default_column")
        .and_then(toml::Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut columns = columns_mut(table)?;
    if columns.is_empty() {
        return Err(FixError::NoColumns);
    }
    let placed = columns.iter().any(|c| {
        c.get("card_ids")
            .and_then(toml::Value::as_array)
            .is_some_and(|ids| ids.iter().any(|v| v.as_str() == Some(id)))
    });
    if placed {
        return Ok(());
    }

    let index = columns
        .iter()
        .position(|c| column_name(c) == Some(default.as_str()))
        .unwrap_or(0);
    let target = &mut columns[index];
    let ids = target
        .entry("card_ids")
        .or_insert(toml::Value::Array(Vec::new()));
    let ids = ids
        .as_array_mut()
        .ok_or_else(|| FixError::Shape("card_ids is not an array".into()))?;
    ids.insert(0, toml::Value::String(id.to_string()));
    Ok(())
}

fn repair_card_display(
    path: &Path,
    table: &mut toml::Table,
    field: CardDisplayField,
) -> Result<(), FixError> {
    let config = board_from_table(path, table)?;
    let Some(display) = table
        .get_mut("card_display")
        .and_then(toml::Value::as_table_mut)
    else {
        return Ok(());
    };

    match field {
        CardDisplayField::TypeIndicator => {
            display.remove(field.as_str());
        }
        CardDisplayField::Badges | CardDisplayField::Metadata => {
            let keep = |name: &str| match field {
                CardDisplayField::Badges => config
                    .custom_fields
                    .get(name)
                    .is_some_and(|f| f.field_type.is_set()),
                _ => config.custom_fields.contains_key(name),
            };
            if let Some(list) = display
                .get_mut(field.as_str())
                .and_then(toml::Value::as_array_mut)
            {
                let mut seen = HashSet::new();
                list.retain(|v| {
                    v.as_str()
                        .is_some_and(|name| keep(name) && seen.insert(name.to_string()))
                });
            }
        }
    }
    Ok(())
}
