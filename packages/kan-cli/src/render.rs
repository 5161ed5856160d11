//! Plain-text rendering of plans, outcomes and doctor reports.

use std::fmt::Write;

use kan_core::doctor::DiagnosticReport;
use kan_core::migrate::{EntityMigration, MigrationOutcome, MigrationPlan};
use kan_core::schema::format_stamp;
use kan_core::Severity;

pub fn plan(plan: &MigrationPlan) -> String {
    let mut out = String::new();
    if !plan.has_changes() {
        out.push_str("Nothing to migrate; everything is at the current schema.\n");
        return out;
    }

    out.push_str("Migration plan:\n");
    for entity in plan.configs().filter(|e| e.needs_migration) {
        let _ = writeln!(out, "  {} config: {}", entity.kind, version_step(entity));
    }
    for board in plan.pending_boards() {
        let cards = board.pending_cards().count();
        if board.config.needs_migration {
            let _ = writeln!(
                out,
                "  board {}: {}, {} cards",
                board.name,
                version_step(&board.config),
                cards
            );
        } else {
            let _ = writeln!(out, "  board {}: {} cards", board.name, cards);
        }
    }
    out
}

fn version_step(entity: &EntityMigration) -> String {
    let from = if entity.from_version == 0 {
        "unversioned".to_string()
    } else {
        format_stamp(entity.kind, entity.from_version)
    };
    format!("{} -> {}", from, format_stamp(entity.kind, entity.to_version))
}

pub fn outcome(outcome: &MigrationOutcome) -> String {
    let mut out = String::new();
    let prefix = if outcome.dry_run { "would: " } else { "" };
    for action in &outcome.actions {
        let _ = writeln!(out, "  {}{}", prefix, action);
    }
    let verb = if outcome.dry_run { "Would migrate" } else { "Migrated" };
    let _ = writeln!(
        out,
        "{} {} configs, {} boards, {} cards",
        verb, outcome.configs_migrated, outcome.boards_migrated, outcome.cards_migrated
    );
    out
}

pub fn report(report: &DiagnosticReport, fixed: bool) -> String {
    let mut out = String::new();
    for board in &report.boards {
        let _ = writeln!(
            out,
            "board {}: {} columns, {} card files, {} referenced",
            board.name, board.columns, board.card_files, board.cards_referenced
        );
    }

    for issue in &report.issues {
        let level = match issue.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        let mut target = issue.board.clone().unwrap_or_else(|| "config".to_string());
        if let Some(card) = &issue.card_id {
            let _ = write!(target, "/{}", card);
        }
        let _ = writeln!(out, "{:>7} {} [{}] {}", level, issue.code, target, issue.message);
        if let Some(err) = &issue.fix_error {
            let _ = writeln!(out, "        fix failed: {}", err);
        } else if let Some(fix) = issue.fix_description.as_deref().filter(|_| issue.fixable) {
            let _ = writeln!(out, "        fix: {}", fix);
        }
    }

    let summary = &report.summary;
    if fixed {
        let _ = writeln!(
            out,
            "Fixed {}, failed {}.",
            summary.fixed, summary.fix_failed
        );
    }
    if report.is_clean() {
        out.push_str("No issues found.\n");
    } else {
        let _ = writeln!(
            out,
            "{} errors, {} warnings ({} fixable with --fix)",
            summary.errors,
            summary.warnings,
            report.fixable_count()
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kan_core::doctor::{BoardDiagnostic, Issue};
    use kan_core::IssueCode;

    #[test]
    fn test_report_lines() {
        let mut diag = DiagnosticReport {
            boards: vec![BoardDiagnostic {
                name: "main".into(),
                card_files: 2,
                cards_referenced: 1,
                columns: 3,
            }],
            issues: vec![Issue::error(IssueCode::OrphanedCard, "card x is orphaned")
                .on_board("main")
                .on_card("x")
                .with_fix("add it to the default column")],
            ..Default::default()
        };
        diag.summary.errors = 1;

        let text = report(&diag, false);
        assert!(text.contains("board main: 3 columns, 2 card files, 1 referenced"));
        assert!(text.contains("  error ORPHANED_CARD [main/x] card x is orphaned"));
        assert!(text.contains("fix: add it to the default column"));
        assert!(text.ends_with("1 errors, 0 warnings (1 fixable with --fix)\n"));
    }

    #[test]
    fn test_clean_report() {
        let text = report(&DiagnosticReport::default(), true);
        assert_eq!(text, "Fixed 0, failed 0.\nNo issues found.\n");
    }

    #[test]
    fn test_dry_run_outcome() {
        let outcome = MigrationOutcome {
            dry_run: true,
            actions: vec!["board main: board/0 -> board/3".into()],
            boards_migrated: 1,
            ..Default::default()
        };
        assert_eq!(
            super::outcome(&outcome),
            "  would: board main: board/0 -> board/3\nWould migrate 0 configs, 1 boards, 0 cards\n"
        );
    }

    #[test]
    fn test_empty_plan() {
        assert!(plan(&MigrationPlan::default()).starts_with("Nothing to migrate"));
    }
}
