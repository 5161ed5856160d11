use serde::Serialize;
use serde_json::{Map, Value};

use super::plan::{BoardMigration, CardMigration, EntityMigration, MigrationPlan};
use super::steps::{self, MigrationStep};
use super::MigrationError;
use crate::schema::{self, EntityKind, CARD_VERSION_KEY, SCHEMA_KEY};
use crate::storage::lenient::{read_card_lenient, read_toml_lenient};
use crate::storage::{write_json_object, write_text, write_toml_table};
use crate::types::LEGACY_CARD_COLUMN_KEY;

/// What a run changed (or, for a dry run, would change).
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationOutcome {
    pub dry_run: bool,
    /// One line per entity, in processing order.
    pub actions: Vec<String>,
    pub configs_migrated: usize,
    pub boards_migrated: usize,
    pub cards_migrated: usize,
}

/// Apply `plan`. With `dry_run` nothing is written; the outcome lists what
/// would happen. A failing entity does not stop its siblings: failures are
/// collected and returned together once everything else was attempted.
pub fn execute(plan: &MigrationPlan, dry_run: bool) -> Result<MigrationOutcome, MigrationError> {
    let mut outcome = MigrationOutcome {
        dry_run,
        ..Default::default()
    };

    if !plan.has_changes() {
        log::info!("[kan.migrate] Everything is at the current schema version");
        return Ok(outcome);
    }

    let mut failures = Vec::new();

    for entity in plan.configs().filter(|e| e.needs_migration) {
        match migrate_toml(entity, steps::CONFIG_STEPS, dry_run) {
            Ok(Some(action)) => {
                outcome.actions.push(action);
                outcome.configs_migrated += 1;
            }
            Ok(None) => {}
            Err(e) => {
                log::error!("[kan.migrate] {}", e);
                failures.push(e);
            }
        }
    }

    for board in plan.pending_boards() {
        migrate_board(board, dry_run, &mut outcome, &mut failures);
    }

    if failures.is_empty() {
        Ok(outcome)
    } else {
        Err(MigrationError::Incomplete {
            failures,
            completed: outcome,
        })
    }
}

fn migrate_board(
    board: &BoardMigration,
    dry_run: bool,
    outcome: &mut MigrationOutcome,
    failures: &mut Vec<MigrationError>,
) {
    let mut config_done = false;
    if board.config.needs_migration {
        match migrate_toml(&board.config, steps::BOARD_STEPS, dry_run) {
            Ok(Some(action)) => {
                outcome.actions.push(action);
                config_done = true;
            }
            Ok(None) => {}
            Err(e) => {
                log::error!("[kan.migrate] Board {}: {}", board.name, e);
                failures.push(e);
            }
        }
    }

    let mut cards_done = 0;
    for card in board.pending_cards() {
        match migrate_card(card, dry_run) {
            Ok(Some(action)) => {
                outcome.actions.push(action);
                cards_done += 1;
            }
            Ok(None) => {}
            Err(e) => {
                log::error!("[kan.migrate] Board {}: {}", board.name, e);
                failures.push(e);
            }
        }
    }

    if config_done {
        outcome.boards_migrated += 1;
    }
    outcome.cards_migrated += cards_done;

    if dry_run || (!config_done && cards_done == 0) {
        return;
    }
    if config_done {
        log::info!(
            "[kan.migrate] Migrated board {} (config + {} cards)",
            board.name,
            cards_done
        );
    } else {
        log::info!("[kan.migrate] Migrated board {} ({} cards)", board.name, cards_done);
    }
}

/// Upgrade one TOML entity. The file is re-read so a stale plan cannot
/// downgrade or double-apply anything; `Ok(None)` means it was already
/// current.
fn migrate_toml(
    entity: &EntityMigration,
    chain_steps: &[MigrationStep<toml::Table>],
    dry_run: bool,
) -> Result<Option<String>, MigrationError> {
    let raw = read_toml_lenient(entity.kind, &entity.path)?;
    let target = entity.to_version;
    if raw.version == target {
        return Ok(None);
    }
    if raw.version > target {
        return Err(MigrationError::NewerSchema {
            path: entity.path.clone(),
            kind: entity.kind,
            found: raw.version,
            supported: target,
        });
    }

    let mut table = raw.table.clone();
    let chain = steps::apply_chain(chain_steps, &mut table, raw.version, target);
    let stamp = schema::format_stamp(entity.kind, target);
    let restamped = if chain.structural {
        None
    } else {
        schema::restamp_text(entity.kind, &raw.text, target)
    };
    let action = format!(
        "{} {} v{} -> v{}: {}",
        if restamped.is_some() { "stamp" } else { "rewrite" },
        entity.path.display(),
        raw.version,
        target,
        chain.applied.join(", ")
    );

    if dry_run {
        log::info!("[kan.migrate] Would {}", action);
        return Ok(Some(action));
    }

    match restamped {
        Some(text) => write_text(&entity.path, &text)?,
        None => write_toml_table(&entity.path, &stamp_first(table, stamp))?,
    }
    log::debug!("[kan.migrate] {}", action);
    Ok(Some(action))
}

fn stamp_first(table: toml::Table, stamp: String) -> toml::Table {
    let mut out = toml::Table::new();
    out.insert(SCHEMA_KEY.to_string(), toml::Value::String(stamp));
    for (key, value) in table {
        if key != SCHEMA_KEY {
            out.insert(key, value);
        }
    }
    out
}

fn migrate_card(card: &CardMigration, dry_run: bool) -> Result<Option<String>, MigrationError> {
    let raw = read_card_lenient(&card.path)?;
    let target = card.to_version;
    if raw.version == target && !raw.has_legacy_column {
        return Ok(None);
    }
    if raw.version > target {
        return Err(MigrationError::NewerSchema {
            path: card.path.clone(),
            kind: EntityKind::Card,
            found: raw.version,
            supported: target,
        });
    }

    let mut object = raw.object;
    steps::apply_chain(steps::CARD_STEPS, &mut object, raw.version, target);
    object.shift_remove(LEGACY_CARD_COLUMN_KEY);

    let action = format!(
        "rewrite {} v{} -> v{}{}",
        card.path.display(),
        raw.version,
        target,
        if raw.has_legacy_column {
            " (drop column)"
        } else {
            ""
        }
    );

    if dry_run {
        log::info!("[kan.migrate] Would {}", action);
        return Ok(Some(action));
    }

    let mut stamped = Map::new();
    stamped.insert(CARD_VERSION_KEY.to_string(), Value::from(target));
    for (key, value) in object {
        if key != CARD_VERSION_KEY {
            stamped.insert(key, value);
        }
    }
    write_json_object(&card.path, &stamped)?;
    log::debug!("[kan.migrate] {}", action);
    Ok(Some(action))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::plan;
    use crate::schema::{BOARD_SCHEMA_VERSION, CARD_SCHEMA_VERSION};
    use crate::storage::lenient::read_board_lenient;
    use crate::test_support::Fixture;
    use crate::types::FieldType;
    use std::fs;

    const LEGACY_BOARD: &str = r##"# Team board
name = "main"
default_column = "todo"

[[columns]]
name = "todo"
card_ids = ["a"]

[[columns]]
name = "done"
card_ids = ["b"]
"##;

    const LABELED_BOARD: &str = r##"kan_schema = "board/1"
name = "main"

[[columns]]
name = "todo"
card_ids = ["a"]

[[labels]]
name = "bug"
color = "#ef4444"
"##;

    fn legacy_fixture() -> Fixture {
        let fx = Fixture::new();
        fx.write_board_text("main", LEGACY_BOARD);
        fx.write_card_text("main", "a", r#"{"id":"a","title":"A","column":"todo"}"#);
        fx.write_card_text("main", "b", r#"{"id":"b","title":"B","column":"done"}"#);
        fx.write_global_text("editor = \"nvim\"\n");
        fx.write_project_text("name = \"kan\"\n");
        fx
    }

    fn snapshot(fx: &Fixture) -> Vec<(String, Vec<u8>)> {
        let mut files = vec![
            fx.paths.board_config("main"),
            fx.paths.card_path("main", "a"),
            fx.paths.card_path("main", "b"),
            fx.paths.global_config().to_path_buf(),
            fx.paths.project_config(),
        ];
        files.sort();
        files
            .into_iter()
            .map(|p| (p.display().to_string(), fs::read(&p).unwrap()))
            .collect()
    }

    #[test]
    fn test_migration_is_idempotent() {
        let fx = legacy_fixture();
        let first = plan(&fx.paths).unwrap();
        assert!(first.has_changes());

        let outcome = execute(&first, false).unwrap();
        assert_eq!(outcome.configs_migrated, 2);
        assert_eq!(outcome.boards_migrated, 1);
        assert_eq!(outcome.cards_migrated, 2);

        let second = plan(&fx.paths).unwrap();
        assert!(!second.has_changes());

        // Executing a stale plan again changes nothing.
        let before = snapshot(&fx);
        let again = execute(&first, false).unwrap();
        assert!(again.actions.is_empty());
        assert_eq!(snapshot(&fx), before);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let fx = legacy_fixture();
        let before = snapshot(&fx);

        let plan = plan(&fx.paths).unwrap();
        let outcome = execute(&plan, true).unwrap();
        assert!(outcome.dry_run);
        assert_eq!(outcome.actions.len(), 5);
        assert_eq!(snapshot(&fx), before);
    }

    #[test]
    fn test_version_bump_preserves_original_bytes() {
        let fx = legacy_fixture();
        execute(&plan(&fx.paths).unwrap(), false).unwrap();

        let text = fx.board_text("main");
        assert_eq!(text, format!("kan_schema = \"board/3\"\n\n{}", LEGACY_BOARD));

        let global = fs::read_to_string(fx.paths.global_config()).unwrap();
        assert!(global.ends_with("editor = \"nvim\"\n"));
        assert!(global.starts_with("kan_schema = \"global/1\""));
    }

    #[test]
    fn test_legacy_card_loses_column_and_gains_version() {
        let fx = legacy_fixture();
        execute(&plan(&fx.paths).unwrap(), false).unwrap();

        let card = fx.card_object("main", "b");
        assert_eq!(card["_v"], serde_json::json!(CARD_SCHEMA_VERSION));
        assert!(!card.contains_key("column"));
        assert_eq!(card.keys().collect::<Vec<_>>(), vec!["_v", "id", "title"]);

        let raw = fs::read_to_string(fx.paths.card_path("main", "b")).unwrap();
        assert_eq!(
            raw,
            "{\n  \"_v\": 1,\n  \"id\": \"b\",\n  \"title\": \"B\"\n}\n"
        );
    }

    #[test]
    fn test_structural_step_falls_through_to_current() {
        let fx = Fixture::new();
        fx.write_board_text("main", LABELED_BOARD);

        execute(&plan(&fx.paths).unwrap(), false).unwrap();

        let board = read_board_lenient(&fx.paths.board_config("main")).unwrap();
        assert_eq!(board.raw.version, BOARD_SCHEMA_VERSION);
        assert!(!board.raw.table.contains_key("labels"));
        let field = &board.config.custom_fields["labels"];
        assert_eq!(field.field_type, FieldType::EnumSet);
        assert_eq!(field.options[0].value, "bug");
        assert_eq!(field.options[0].color, "#ef4444");
        assert_eq!(board.config.card_display.badges, vec!["labels"]);
        assert_eq!(board.config.columns[0].card_ids, vec!["a"]);
        assert!(fx.board_text("main").starts_with("kan_schema = \"board/3\""));

        assert!(!plan(&fx.paths).unwrap().has_changes());
    }

    #[test]
    fn test_bare_label_names_survive_migration() {
        let fx = Fixture::new();
        fx.write_board_text(
            "main",
            "kan_schema = \"board/1\"\nname = \"main\"\nlabels = [\"bug\", \"ui\"]\n",
        );

        execute(&plan(&fx.paths).unwrap(), false).unwrap();

        let board = read_board_lenient(&fx.paths.board_config("main")).unwrap();
        assert_eq!(board.raw.version, BOARD_SCHEMA_VERSION);
        let values: Vec<_> = board.config.custom_fields["labels"]
            .options
            .iter()
            .map(|o| o.value.as_str())
            .collect();
        assert_eq!(values, vec!["bug", "ui"]);
        assert!(!plan(&fx.paths).unwrap().has_changes());
    }

    #[test]
    fn test_stamp_after_nested_array_is_replaced_once() {
        let fx = Fixture::new();
        fx.write_board_text(
            "main",
            "matrix = [\n  [1, 2],\n]\nkan_schema = \"board/2\"\nname = \"main\"\n",
        );

        execute(&plan(&fx.paths).unwrap(), false).unwrap();

        let text = fx.board_text("main");
        assert_eq!(text.matches("kan_schema").count(), 1);
        assert!(text.contains("kan_schema = \"board/3\"\n"));
        assert!(text.starts_with("matrix = [\n  [1, 2],\n]\n"));
        assert!(!plan(&fx.paths).unwrap().has_changes());
    }

    #[test]
    fn test_existing_stamp_line_is_replaced() {
        let fx = Fixture::new();
        let text = "kan_schema = \"board/2\" # old\nname = \"main\"\n";
        fx.write_board_text("main", text);
        execute(&plan(&fx.paths).unwrap(), false).unwrap();
        assert_eq!(fx.board_text("main"), "kan_schema = \"board/3\"\nname = \"main\"\n");
    }

    #[test]
    fn test_failing_board_does_not_stop_siblings() {
        let fx = Fixture::new();
        fx.write_board_text("broken", "name = [");
        fx.write_board_text("main", LEGACY_BOARD);
        fx.write_card_text("main", "a", r#"{"id":"a","column":"todo"}"#);

        let err = execute(&plan(&fx.paths).unwrap(), false).unwrap_err();
        match err {
            MigrationError::Incomplete {
                failures,
                completed,
            } => {
                assert_eq!(failures.len(), 1);
                assert!(failures[0].to_string().contains("broken"));
                assert_eq!(completed.boards_migrated, 1);
                assert_eq!(completed.cards_migrated, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(fx.board_text("main").starts_with("kan_schema = \"board/3\""));
    }

    #[test]
    fn test_newer_schema_is_refused() {
        let fx = Fixture::new();
        let text = "kan_schema = \"board/9\"\nname = \"main\"\n";
        fx.write_board_text("main", text);

        let err = execute(&plan(&fx.paths).unwrap(), false).unwrap_err();
        let MigrationError::Incomplete { failures, .. } = err else {
            panic!("expected incomplete migration");
        };
        assert!(matches!(
            failures[0],
            MigrationError::NewerSchema { found: 9, .. }
        ));
        assert_eq!(fx.board_text("main"), text);
    }
}
