//! Diagnostics and repair for a kan data tree.
//!
//! `diagnose` scans boards, cards and configs and reports every problem it
//! finds as an [`Issue`]; it never fails on bad data. `fix` applies the
//! deterministic repair for each fixable issue and returns what is left.

mod diagnose;
mod fix;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use diagnose::diagnose;
pub use fix::fix;

#[derive(Debug, thiserror::Error)]
pub enum DoctorError {
    #[error("Board not found: {0}")]
    BoardNotFound(String),

    #[error("Cannot read directory {}: {source}", .path.display())]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    MalformedBoardConfig,
    MalformedCard,
    MalformedGlobalConfig,
    MalformedProjectConfig,
    SchemaOutdated,
    GlobalSchemaOutdated,
    ProjectSchemaOutdated,
    SchemaTooNew,
    InvalidDefaultColumn,
    InvalidCardDisplay,
    InvalidLinkRule,
    InvalidPatternHook,
    MissingHookFile,
    DuplicateColumnName,
    DuplicateCardId,
    MissingCardFile,
    OrphanedCard,
    InvalidParentRef,
}

impl IssueCode {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueCode::MalformedBoardConfig => "MALFORMED_BOARD_CONFIG",
            IssueCode::MalformedCard => "MALFORMED_CARD",
            IssueCode::MalformedGlobalConfig => "MALFORMED_GLOBAL_CONFIG",
            IssueCode::MalformedProjectConfig => "MALFORMED_PROJECT_CONFIG",
            IssueCode::SchemaOutdated => "SCHEMA_OUTDATED",
            IssueCode::GlobalSchemaOutdated => "GLOBAL_SCHEMA_OUTDATED",
            IssueCode::ProjectSchemaOutdated => "PROJECT_SCHEMA_OUTDATED",
            IssueCode::SchemaTooNew => "SCHEMA_TOO_NEW",
            IssueCode::InvalidDefaultColumn => "INVALID_DEFAULT_COLUMN",
            IssueCode::InvalidCardDisplay => "INVALID_CARD_DISPLAY",
            IssueCode::InvalidLinkRule => "INVALID_LINK_RULE",
            IssueCode::InvalidPatternHook => "INVALID_PATTERN_HOOK",
            IssueCode::MissingHookFile => "MISSING_HOOK_FILE",
            IssueCode::DuplicateColumnName => "DUPLICATE_COLUMN_NAME",
            IssueCode::DuplicateCardId => "DUPLICATE_CARD_ID",
            IssueCode::MissingCardFile => "MISSING_CARD_FILE",
            IssueCode::OrphanedCard => "ORPHANED_CARD",
            IssueCode::InvalidParentRef => "INVALID_PARENT_REF",
        }
    }

    /// Codes with a deterministic repair in [`fix`].
    pub fn is_fixable(self) -> bool {
        matches!(
            self,
            IssueCode::InvalidDefaultColumn
                | IssueCode::InvalidCardDisplay
                | IssueCode::DuplicateCardId
                | IssueCode::MissingCardFile
                | IssueCode::OrphanedCard
                | IssueCode::InvalidParentRef
        )
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `card_display` entry an INVALID_CARD_DISPLAY issue is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardDisplayField {
    TypeIndicator,
    Badges,
    Metadata,
}

impl CardDisplayField {
    pub fn as_str(self) -> &'static str {
        match self {
            CardDisplayField::TypeIndicator => "type_indicator",
            CardDisplayField::Badges => "badges",
            CardDisplayField::Metadata => "metadata",
        }
    }
}

/// Extra data the fixer needs beyond the board and card named on the issue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<CardDisplayField>,
    /// Columns holding a duplicated card, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub code: IssueCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,
    pub message: String,
    pub fixable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_context: Option<FixContext>,
    /// Set by `fix` when the repair was attempted and failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_error: Option<String>,
}

impl Issue {
    pub fn new(severity: Severity, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            board: None,
            card_id: None,
            message: message.into(),
            fixable: code.is_fixable(),
            fix_description: None,
            fix_context: None,
            fix_error: None,
        }
    }

    pub fn error(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn on_board(mut self, board: &str) -> Self {
        self.board = Some(board.to_string());
        self
    }

    pub fn on_card(mut self, card_id: &str) -> Self {
        self.card_id = Some(card_id.to_string());
        self
    }

    pub fn with_fix(mut self, description: impl Into<String>) -> Self {
        self.fix_description = Some(description.into());
        self
    }

    pub fn with_context(mut self, context: FixContext) -> Self {
        self.fix_context = Some(context);
        self
    }
}

/// Per-board statistics, collected whether or not issues were found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardDiagnostic {
    pub name: String,
    pub card_files: usize,
    pub cards_referenced: usize,
    pub columns: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub errors: usize,
    pub warnings: usize,
    /// Issues repaired by `fix`.
    pub fixed: usize,
    /// Issues whose repair failed; they stay in the report.
    pub fix_failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub boards: Vec<BoardDiagnostic>,
    pub issues: Vec<Issue>,
    pub summary: ReportSummary,
}

impl DiagnosticReport {
    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn fixable_count(&self) -> usize {
        self.issues.iter().filter(|i| i.fixable).count()
    }

    /// Recompute error and warning tallies from `issues`.
    pub(crate) fn recount(&mut self) {
        self.summary.errors = self
            .issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count();
        self.summary.warnings = self.issues.len() - self.summary.errors;
    }
}
