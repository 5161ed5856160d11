use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use regex::Regex;

use super::{
    BoardDiagnostic, CardDisplayField, DiagnosticReport, DoctorError, FixContext, Issue, IssueCode,
};
use crate::config::{GlobalConfig, ProjectConfig};
use crate::paths::KanPaths;
use crate::schema::{self, EntityKind};
use crate::storage::lenient::{
    board_from_table, board_skeleton, read_card_lenient, read_toml_lenient, RawCard,
};
use crate::types::BoardConfig;

/// Scan the data tree (or only `board_filter`) plus the global and project
/// configs. Malformed files become issues; only an unknown board name or an
/// unreadable boards directory is an error.
pub fn diagnose(
    paths: &KanPaths,
    board_filter: Option<&str>,
) -> Result<DiagnosticReport, DoctorError> {
    let mut names = paths
        .list_board_names()
        .map_err(|source| DoctorError::Directory {
            path: paths.boards_dir(),
            source,
        })?;

    if let Some(filter) = board_filter {
        if !names.iter().any(|n| n == filter) {
            return Err(DoctorError::BoardNotFound(filter.to_string()));
        }
        names.retain(|n| n == filter);
    }

    let mut report = DiagnosticReport::default();
    for name in &names {
        let (stats, issues) = diagnose_board(paths, name);
        report.boards.push(stats);
        report.issues.extend(issues);
    }

    report.issues.extend(check_config::<GlobalConfig>(
        EntityKind::Global,
        paths.global_config(),
    ));
    report.issues.extend(check_config::<ProjectConfig>(
        EntityKind::Project,
        &paths.project_config(),
    ));

    report.recount();
    log::info!(
        "[kan.doctor] Checked {} boards: {} errors, {} warnings",
        report.boards.len(),
        report.summary.errors,
        report.summary.warnings
    );
    Ok(report)
}

fn diagnose_board(paths: &KanPaths, name: &str) -> (BoardDiagnostic, Vec<Issue>) {
    let mut issues = Vec::new();
    let mut stats = BoardDiagnostic {
        name: name.to_string(),
        ..Default::default()
    };

    let card_ids = match paths.list_card_ids(name) {
        Ok(ids) => ids,
        Err(e) => {
            log::warn!("[kan.doctor] Cannot list cards of board {}: {}", name, e);
            issues.push(
                Issue::error(
                    IssueCode::MalformedCard,
                    format!("cards directory is unreadable: {}", e),
                )
                .on_board(name),
            );
            Vec::new()
        }
    };
    stats.card_files = card_ids.len();

    // Cards are read even when the board config is broken so one pass
    // reports every malformed file.
    let board = read_board_for_checks(&paths.board_config(name), name, &mut issues);

    let mut cards = Vec::new();
    for id in &card_ids {
        match read_card_lenient(&paths.card_path(name, id)) {
            Ok(card) => cards.push(card),
            Err(e) => issues.push(
                Issue::error(IssueCode::MalformedCard, e.to_string())
                    .on_board(name)
                    .on_card(id),
            ),
        }
    }

    let Some((version, config)) = board else {
        check_card_schemas(name, &cards, &mut issues);
        return (stats, issues);
    };
    let config = &config;
    stats.columns = config.columns.len();

    check_board_schema(name, version, &mut issues);
    check_card_schemas(name, &cards, &mut issues);
    check_default_column(name, config, &mut issues);
    check_card_display(name, config, &mut issues);
    check_link_rules(name, config, &mut issues);
    check_pattern_hooks(name, config, paths.project_dir(), &mut issues);
    check_column_names(name, config, &mut issues);

    let file_ids: HashSet<&str> = card_ids.iter().map(String::as_str).collect();
    let referenced = check_references(name, config, &file_ids, &mut issues);
    stats.cards_referenced = referenced.len();

    for id in &card_ids {
        if !referenced.contains(id.as_str()) {
            let target = config
                .effective_default_column()
                .map(|c| format!("add it to the top of column {:?}", c.name))
                .unwrap_or_else(|| "add it to the default column".to_string());
            issues.push(
                Issue::error(
                    IssueCode::OrphanedCard,
                    format!("card {} has a file but is not in any column", id),
                )
                .on_board(name)
                .on_card(id)
                .with_fix(target),
            );
        }
    }

    for card in &cards {
        if let Some(parent) = card.parent() {
            if !file_ids.contains(parent) {
                issues.push(
                    Issue::warning(
                        IssueCode::InvalidParentRef,
                        format!("card {} has parent {} which does not exist", card.id, parent),
                    )
                    .on_board(name)
                    .on_card(&card.id)
                    .with_fix("remove the parent reference"),
                );
            }
        }
    }

    (stats, issues)
}

/// Board version and typed view for the checks that follow. A config that
/// parses as TOML but not as a board still yields its column membership, so
/// the reference checks run alongside the MALFORMED_BOARD_CONFIG error.
fn read_board_for_checks(
    path: &Path,
    name: &str,
    issues: &mut Vec<Issue>,
) -> Option<(u32, BoardConfig)> {
    let raw = match read_toml_lenient(EntityKind::Board, path) {
        Ok(raw) => raw,
        Err(e) => {
            issues.push(
                Issue::error(IssueCode::MalformedBoardConfig, e.to_string()).on_board(name),
            );
            return None;
        }
    };
    match board_from_table(path, &raw.table) {
        Ok(config) => Some((raw.version, config)),
        Err(e) => {
            issues.push(
                Issue::error(IssueCode::MalformedBoardConfig, e.to_string()).on_board(name),
            );
            let skeleton = board_skeleton(&raw.table);
            if skeleton.is_none() {
                log::warn!(
                    "[kan.doctor] Board {}: column lists are unreadable, skipping reference checks",
                    name
                );
            }
            skeleton.map(|config| (raw.version, config))
        }
    }
}

fn check_board_schema(name: &str, version: u32, issues: &mut Vec<Issue>) {
    let current = schema::BOARD_SCHEMA_VERSION;
    if version < current {
        issues.push(
            Issue::warning(
                IssueCode::SchemaOutdated,
                format!(
                    "board config is at schema {}, current is {}; run `kan migrate`",
                    describe_version(EntityKind::Board, version),
                    schema::format_stamp(EntityKind::Board, current)
                ),
            )
            .on_board(name),
        );
    } else if version > current {
        issues.push(
            Issue::error(
                IssueCode::SchemaTooNew,
                format!(
                    "board config has schema {} which this version does not understand",
                    schema::format_stamp(EntityKind::Board, version)
                ),
            )
            .on_board(name),
        );
    }
}

fn check_card_schemas(name: &str, cards: &[RawCard], issues: &mut Vec<Issue>) {
    let current = schema::CARD_SCHEMA_VERSION;
    for card in cards {
        if card.version > current {
            issues.push(
                Issue::error(
                    IssueCode::SchemaTooNew,
                    format!("card has schema version {} (supported: {})", card.version, current),
                )
                .on_board(name)
                .on_card(&card.id),
            );
        } else if card.version < current || card.has_legacy_column {
            let detail = if card.has_legacy_column {
                " and still has an inline column field"
            } else {
                ""
            };
            issues.push(
                Issue::warning(
                    IssueCode::SchemaOutdated,
                    format!(
                        "card is at schema version {}{}; run `kan migrate`",
                        card.version, detail
                    ),
                )
                .on_board(name)
                .on_card(&card.id),
            );
        }
    }
}

fn check_default_column(name: &str, config: &BoardConfig, issues: &mut Vec<Issue>) {
    if config.default_column.is_empty() || config.has_column(&config.default_column) {
        return;
    }
    let fix = match config.columns.first() {
        Some(first) => format!("set default_column to {:?}", first.name),
        None => "clear default_column".to_string(),
    };
    issues.push(
        Issue::warning(
            IssueCode::InvalidDefaultColumn,
            format!(
                "default_column {:?} is not a column of this board",
                config.default_column
            ),
        )
        .on_board(name)
        .with_fix(fix),
    );
}

fn check_card_display(name: &str, config: &BoardConfig, issues: &mut Vec<Issue>) {
    let display = &config.card_display;
    let fields = &config.custom_fields;

    let mut report = |field: CardDisplayField, message: String, fix: &str| {
        issues.push(
            Issue::warning(IssueCode::InvalidCardDisplay, message)
                .on_board(name)
                .with_fix(fix)
                .with_context(FixContext {
                    field: Some(field),
                    ..Default::default()
                }),
        );
    };

    if !display.type_indicator.is_empty() {
        match fields.get(&display.type_indicator) {
            None => report(
                CardDisplayField::TypeIndicator,
                format!(
                    "card_display.type_indicator references unknown field {:?}",
                    display.type_indicator
                ),
                "clear card_display.type_indicator",
            ),
            Some(field) if field.field_type != crate::types::FieldType::Enum => report(
                CardDisplayField::TypeIndicator,
                format!(
                    "card_display.type_indicator field {:?} is {}, expected enum",
                    display.type_indicator,
                    field.field_type.as_str()
                ),
                "clear card_display.type_indicator",
            ),
            Some(_) => {}
        }
    }

    let bad_badges: Vec<&str> = display
        .badges
        .iter()
        .filter(|b| !fields.get(*b).is_some_and(|f| f.field_type.is_set()))
        .map(String::as_str)
        .collect();
    if !bad_badges.is_empty() {
        report(
            CardDisplayField::Badges,
            format!(
                "card_display.badges references missing or non-set fields: {}",
                bad_badges.join(", ")
            ),
            "remove invalid entries from card_display.badges",
        );
    }

    let bad_metadata: Vec<&str> = display
        .metadata
        .iter()
        .filter(|m| !fields.contains_key(*m))
        .map(String::as_str)
        .collect();
    if !bad_metadata.is_empty() {
        report(
            CardDisplayField::Metadata,
            format!(
                "card_display.metadata references unknown fields: {}",
                bad_metadata.join(", ")
            ),
            "remove unknown entries from card_display.metadata",
        );
    }
}

fn check_link_rules(name: &str, config: &BoardConfig, issues: &mut Vec<Issue>) {
    for rule in &config.link_rules {
        if let Err(e) = Regex::new(&rule.pattern) {
            issues.push(
                Issue::warning(
                    IssueCode::InvalidLinkRule,
                    format!("link rule {:?} has an invalid pattern: {}", rule.name, e),
                )
                .on_board(name),
            );
        }
    }
}

fn check_pattern_hooks(name: &str, config: &BoardConfig, project_dir: &Path, issues: &mut Vec<Issue>) {
    for hook in &config.pattern_hooks {
        if let Err(e) = Regex::new(&hook.pattern) {
            issues.push(
                Issue::warning(
                    IssueCode::InvalidPatternHook,
                    format!("pattern hook {:?} has an invalid pattern: {}", hook.name, e),
                )
                .on_board(name),
            );
        }
        if let Some(path) = hook_command_path(&hook.command, project_dir) {
            if !path.exists() {
                issues.push(
                    Issue::warning(
                        IssueCode::MissingHookFile,
                        format!(
                            "pattern hook {:?} runs {} which does not exist",
                            hook.name,
                            path.display()
                        ),
                    )
                    .on_board(name),
                );
            }
        }
    }
}

/// File a hook command points at, when its program is written as a path
/// rather than a bare command name looked up on PATH.
fn hook_command_path(command: &str, project_dir: &Path) -> Option<PathBuf> {
    let program = command.split_whitespace().next()?;
    if let Some(rest) = program.strip_prefix("~/") {
        return dirs::home_dir().map(|home| home.join(rest));
    }
    let path = Path::new(program);
    if path.is_absolute() {
        Some(path.to_path_buf())
    } else if program.starts_with("./") || program.starts_with("../") {
        Some(project_dir.join(path))
    } else {
        None
    }
}

fn check_column_names(name: &str, config: &BoardConfig, issues: &mut Vec<Issue>) {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for column in &config.columns {
        if !seen.insert(column.name.as_str()) && reported.insert(column.name.as_str()) {
            issues.push(
                Issue::error(
                    IssueCode::DuplicateColumnName,
                    format!("column name {:?} is used more than once", column.name),
                )
                .on_board(name),
            );
        }
    }
}

/// Duplicate and dangling column references. Returns the set of referenced
/// card ids.
fn check_references<'a>(
    name: &str,
    config: &'a BoardConfig,
    file_ids: &HashSet<&str>,
    issues: &mut Vec<Issue>,
) -> BTreeSet<&'a str> {
    // id -> columns holding it, in declaration order (repeats included)
    let mut order: Vec<&str> = Vec::new();
    let mut holders: HashMap<&str, Vec<&str>> = HashMap::new();
    for column in &config.columns {
        for id in &column.card_ids {
            let entry = holders.entry(id.as_str()).or_default();
            if entry.is_empty() {
                order.push(id.as_str());
            }
            entry.push(column.name.as_str());
        }
    }

    for id in &order {
        let columns = &holders[id];
        if columns.len() > 1 {
            issues.push(
                Issue::error(
                    IssueCode::DuplicateCardId,
                    format!(
                        "card {} appears {} times (columns: {})",
                        id,
                        columns.len(),
                        columns.join(", ")
                    ),
                )
                .on_board(name)
                .on_card(id)
                .with_fix(format!("keep it only in column {:?}", columns[0]))
                .with_context(FixContext {
                    field: None,
                    columns: columns.iter().map(|c| c.to_string()).collect(),
                }),
            );
        }
    }

    for id in &order {
        if !file_ids.contains(id) {
            issues.push(
                Issue::error(
                    IssueCode::MissingCardFile,
                    format!("column references card {} but it has no file", id),
                )
                .on_board(name)
                .on_card(id)
                .with_fix("remove the reference from every column"),
            );
        }
    }

    order.into_iter().collect()
}

fn check_config<T: serde::de::DeserializeOwned>(kind: EntityKind, path: &Path) -> Vec<Issue> {
    let (malformed, outdated) = match kind {
        EntityKind::Global => (
            IssueCode::MalformedGlobalConfig,
            IssueCode::GlobalSchemaOutdated,
        ),
        _ => (
            IssueCode::MalformedProjectConfig,
            IssueCode::ProjectSchemaOutdated,
        ),
    };

    if !path.exists() {
        return Vec::new();
    }

    let raw = match read_toml_lenient(kind, path) {
        Ok(raw) => raw,
        Err(e) => return vec![Issue::warning(malformed, e.to_string())],
    };
    if let Err(e) = toml::Value::Table(raw.table.clone()).try_into::<T>() {
        return vec![Issue::warning(
            malformed,
            format!("{}: {}", path.display(), e),
        )];
    }

    let current = kind.current_version();
    if raw.version < current {
        vec![Issue::warning(
            outdated,
            format!(
                "{} config {} is at schema {}, current is {}; run `kan migrate`",
                kind,
                path.display(),
                describe_version(kind, raw.version),
                schema::format_stamp(kind, current)
            ),
        )]
    } else if raw.version > current {
        vec![Issue::error(
            IssueCode::SchemaTooNew,
            format!(
                "{} config {} has schema {} which this version does not understand",
                kind,
                path.display(),
                schema::format_stamp(kind, raw.version)
            ),
        )]
    } else {
        Vec::new()
    }
}

fn describe_version(kind: EntityKind, version: u32) -> String {
    if version == 0 {
        "(unversioned)".to_string()
    } else {
        schema::format_stamp(kind, version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{column, Fixture};
    use crate::types::{LinkRule, PatternHook};

    fn codes(report: &DiagnosticReport) -> Vec<IssueCode> {
        report.issues.iter().map(|i| i.code).collect()
    }

    fn clean_fixture() -> Fixture {
        let fx = Fixture::new();
        let mut board = fx.board_with_fields();
        board.columns[0] = column("backlog", &["a", "b"]);
        board.columns[2] = column("done", &["c"]);
        fx.save_board_with_cards(&board);
        fx.store.save_global(&Default::default()).unwrap();
        fx.store
            .save_project(&ProjectConfig {
                name: "kan".into(),
                ..Default::default()
            })
            .unwrap();
        fx
    }

    #[test]
    fn test_current_tree_is_clean() {
        let fx = clean_fixture();
        let report = diagnose(&fx.paths, None).unwrap();
        assert!(report.is_clean(), "unexpected issues: {:?}", report.issues);
        assert_eq!(report.summary.errors, 0);
        assert_eq!(report.summary.warnings, 0);
        assert_eq!(
            report.boards,
            vec![BoardDiagnostic {
                name: "main".into(),
                card_files: 3,
                cards_referenced: 3,
                columns: 3,
            }]
        );
    }

    #[test]
    fn test_invalid_default_column() {
        let fx = Fixture::new();
        let mut board = fx.board_with_fields();
        board.default_column = "missing".into();
        board.columns = vec![column("backlog", &[])];
        fx.save_board_with_cards(&board);

        let report = diagnose(&fx.paths, None).unwrap();
        assert_eq!(codes(&report), vec![IssueCode::InvalidDefaultColumn]);
        let issue = &report.issues[0];
        assert_eq!(issue.severity, super::super::Severity::Warning);
        assert!(issue.fixable);
        assert_eq!(
            issue.fix_description.as_deref(),
            Some("set default_column to \"backlog\"")
        );
        assert!(!report.has_errors());
    }

    #[test]
    fn test_duplicate_missing_orphan_and_parent() {
        let fx = Fixture::new();
        let mut board = fx.board_with_fields();
        board.columns = vec![
            column("backlog", &["card-1", "ghost"]),
            column("doing", &["card-1"]),
        ];
        fx.store.save_board("main", &board).unwrap();
        let mut child = crate::test_support::card("card-1");
        child.parent = Some("nobody".into());
        fx.store.save_card("main", &child).unwrap();
        fx.store
            .save_card("main", &crate::test_support::card("lost"))
            .unwrap();

        let report = diagnose(&fx.paths, None).unwrap();
        assert_eq!(
            codes(&report),
            vec![
                IssueCode::DuplicateCardId,
                IssueCode::MissingCardFile,
                IssueCode::OrphanedCard,
                IssueCode::InvalidParentRef,
            ]
        );
        let dup = &report.issues[0];
        assert_eq!(dup.card_id.as_deref(), Some("card-1"));
        assert_eq!(
            dup.fix_context.as_ref().unwrap().columns,
            vec!["backlog", "doing"]
        );
        assert_eq!(report.issues[1].card_id.as_deref(), Some("ghost"));
        assert_eq!(report.issues[2].card_id.as_deref(), Some("lost"));
        assert_eq!(report.summary.errors, 3);
        assert_eq!(report.summary.warnings, 1);
        assert_eq!(report.boards[0].card_files, 2);
        assert_eq!(report.boards[0].cards_referenced, 2);
    }

    #[test]
    fn test_card_display_checks() {
        let fx = Fixture::new();
        let mut board = fx.board_with_fields();
        board.card_display.type_indicator = "labels".into();
        board.card_display.badges = vec!["tags".into(), "owner".into(), "nope".into()];
        board.card_display.metadata = vec!["due".into(), "gone".into()];
        fx.save_board_with_cards(&board);

        let report = diagnose(&fx.paths, None).unwrap();
        let fields: Vec<_> = report
            .issues
            .iter()
            .map(|i| i.fix_context.as_ref().and_then(|c| c.field))
            .collect();
        assert_eq!(
            fields,
            vec![
                Some(CardDisplayField::TypeIndicator),
                Some(CardDisplayField::Badges),
                Some(CardDisplayField::Metadata),
            ]
        );
        assert!(report.issues[1].message.contains("owner, nope"));
    }

    #[test]
    fn test_link_rules_and_hooks() {
        let fx = Fixture::new();
        let mut board = fx.board_with_fields();
        board.link_rules = vec![
            LinkRule {
                name: "jira".into(),
                pattern: r"[A-Z]+-\d+".into(),
                url: "https://jira/browse/{0}".into(),
            },
            LinkRule {
                name: "broken".into(),
                pattern: "(unclosed".into(),
                url: "https://x/{0}".into(),
            },
        ];
        board.pattern_hooks = vec![
            PatternHook {
                name: "echo".into(),
                pattern: "^deploy".into(),
                command: "echo deployed".into(),
                timeout_secs: None,
            },
            PatternHook {
                name: "script".into(),
                pattern: "[".into(),
                command: "./hooks/missing.sh --flag".into(),
                timeout_secs: Some(5),
            },
        ];
        fx.save_board_with_cards(&board);

        let report = diagnose(&fx.paths, None).unwrap();
        assert_eq!(
            codes(&report),
            vec![
                IssueCode::InvalidLinkRule,
                IssueCode::InvalidPatternHook,
                IssueCode::MissingHookFile,
            ]
        );
        assert!(report.issues.iter().all(|i| !i.fixable));
        assert!(report.issues[2].message.contains("missing.sh"));
    }

    #[test]
    fn test_existing_relative_hook_is_fine() {
        let fx = Fixture::new();
        let script = fx.paths.project_dir().join("hooks").join("run.sh");
        std::fs::create_dir_all(script.parent().unwrap()).unwrap();
        std::fs::write(&script, "#!/bin/sh\n").unwrap();

        let mut board = fx.board_with_fields();
        board.pattern_hooks = vec![PatternHook {
            name: "run".into(),
            pattern: "x".into(),
            command: "./hooks/run.sh".into(),
            timeout_secs: None,
        }];
        fx.save_board_with_cards(&board);
        assert!(diagnose(&fx.paths, None).unwrap().is_clean());
    }

    #[test]
    fn test_malformed_entities_are_reported_not_fatal() {
        let fx = clean_fixture();
        fx.write_board_text("broken", "name = [\n");
        fx.write_card_text("broken", "x", r#"{"_v":1,"id":"x"}"#);
        fx.write_card_text("main", "d", "{ nope");
        fx.write_global_text("editor = \n");

        let report = diagnose(&fx.paths, None).unwrap();
        assert_eq!(
            codes(&report),
            vec![
                IssueCode::MalformedBoardConfig,
                IssueCode::MalformedCard,
                IssueCode::OrphanedCard,
                IssueCode::MalformedGlobalConfig,
            ]
        );
        assert_eq!(report.boards[0].name, "broken");
        assert_eq!(report.boards[0].card_files, 1);
        assert_eq!(report.issues[1].card_id.as_deref(), Some("d"));
        // A malformed card is still a file; it is orphaned, not missing.
        assert_eq!(report.issues[2].card_id.as_deref(), Some("d"));
    }

    #[test]
    fn test_cards_checked_under_broken_board() {
        let fx = Fixture::new();
        fx.write_board_text("main", "name = [\n");
        fx.write_card_text("main", "x", "{ broken");

        let report = diagnose(&fx.paths, None).unwrap();
        assert_eq!(
            codes(&report),
            vec![IssueCode::MalformedBoardConfig, IssueCode::MalformedCard]
        );
        assert_eq!(report.issues[1].card_id.as_deref(), Some("x"));
        assert_eq!(report.boards[0].card_files, 1);
    }

    #[test]
    fn test_bad_board_values_keep_reference_checks() {
        let fx = Fixture::new();
        fx.write_board_text(
            "main",
            "kan_schema = \"board/3\"\nname = \"main\"\n\n[[columns]]\nname = \"todo\"\nlimit = -1\ncard_ids = [\"a\", \"ghost\"]\n\n[custom_fields.size]\ntype = \"number\"\n",
        );
        fx.store.save_card("main", &crate::test_support::card("a")).unwrap();

        let report = diagnose(&fx.paths, None).unwrap();
        assert_eq!(
            codes(&report),
            vec![IssueCode::MalformedBoardConfig, IssueCode::MissingCardFile]
        );
        assert_eq!(report.issues[1].card_id.as_deref(), Some("ghost"));
        assert_eq!(report.boards[0].columns, 1);
        assert_eq!(report.boards[0].cards_referenced, 2);
    }

    #[test]
    fn test_outdated_schemas_are_warnings() {
        let fx = Fixture::new();
        fx.write_board_text(
            "main",
            "name = \"main\"\n\n[[columns]]\nname = \"todo\"\ncard_ids = [\"a\"]\n",
        );
        fx.write_card_text("main", "a", r#"{"id":"a","column":"todo"}"#);
        fx.write_global_text("editor = \"vim\"\n");
        fx.write_project_text("kan_schema = \"project/7\"\nname = \"kan\"\n");

        let report = diagnose(&fx.paths, None).unwrap();
        assert_eq!(
            codes(&report),
            vec![
                IssueCode::SchemaOutdated,
                IssueCode::SchemaOutdated,
                IssueCode::GlobalSchemaOutdated,
                IssueCode::SchemaTooNew,
            ]
        );
        assert_eq!(report.issues[1].card_id.as_deref(), Some("a"));
        assert!(report.issues[1].message.contains("inline column"));
        assert!(report.issues.iter().all(|i| !i.fixable));
        assert_eq!(report.summary.errors, 1);
    }

    #[test]
    fn test_duplicate_column_names() {
        let fx = Fixture::new();
        let mut board = fx.board_with_fields();
        board.columns = vec![column("todo", &[]), column("todo", &[]), column("todo", &[])];
        board.default_column = "todo".into();
        fx.save_board_with_cards(&board);

        let report = diagnose(&fx.paths, None).unwrap();
        assert_eq!(codes(&report), vec![IssueCode::DuplicateColumnName]);
    }

    #[test]
    fn test_board_filter() {
        let fx = clean_fixture();
        fx.write_board_text("other", "name = [\n");

        let report = diagnose(&fx.paths, Some("main")).unwrap();
        assert_eq!(report.boards.len(), 1);
        assert!(report.is_clean());

        assert!(matches!(
            diagnose(&fx.paths, Some("nope")),
            Err(DoctorError::BoardNotFound(name)) if name == "nope"
        ));
    }
}
