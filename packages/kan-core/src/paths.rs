//! Path resolution for a kan data tree.
//!
//! Layout:
//!   <project>/.kan/config.toml                       project config
//!   <project>/.kan/boards/<board>/config.toml        board config
//!   <project>/.kan/boards/<board>/cards/<id>.json    one file per card
//!   <config dir>/kan/config.toml                     global config

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DATA_DIR: &str = ".kan";
pub const CONFIG_FILE: &str = "config.toml";
pub const BOARDS_DIR: &str = "boards";
pub const CARDS_DIR: &str = "cards";
pub const CARD_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct KanPaths {
    root: PathBuf,
    global_config: PathBuf,
}

impl KanPaths {
    /// `root` is the `.kan` data directory itself.
    pub fn new(root: impl Into<PathBuf>, global_config: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            global_config: global_config.into(),
        }
    }

    /// Paths for the project at `project_dir`, with the global config in the
    /// user's config directory.
    pub fn discover(project_dir: &Path) -> Self {
        Self::new(project_dir.join(DATA_DIR), default_global_config_path())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory that relative hook commands are resolved against.
    pub fn project_dir(&self) -> &Path {
        self.root.parent().unwrap_or(&self.root)
    }

    pub fn global_config(&self) -> &Path {
        &self.global_config
    }

    pub fn project_config(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn boards_dir(&self) -> PathBuf {
        self.root.join(BOARDS_DIR)
    }

    pub fn board_dir(&self, board: &str) -> PathBuf {
        self.boards_dir().join(board)
    }

    pub fn board_config(&self, board: &str) -> PathBuf {
        self.board_dir(board).join(CONFIG_FILE)
    }

    pub fn cards_dir(&self, board: &str) -> PathBuf {
        self.board_dir(board).join(CARDS_DIR)
    }

    pub fn card_path(&self, board: &str, card_id: &str) -> PathBuf {
        self.cards_dir(board)
            .join(format!("{}.{}", card_id, CARD_EXTENSION))
    }

    /// Board names in sorted order. A missing boards directory means no
    /// boards; any other read failure is returned.
    pub fn list_board_names(&self) -> io::Result<Vec<String>> {
        let entries = match fs::read_dir(self.boards_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Card ids (file stems) under a board's cards directory, sorted.
    pub fn list_card_ids(&self, board: &str) -> io::Result<Vec<String>> {
        let entries = match fs::read_dir(self.cards_dir(board)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(CARD_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                ids.push(stem.to_string_lossy().to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// `<config dir>/kan/config.toml`, falling back to the working directory
/// when the platform has no config directory.
pub fn default_global_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kan")
        .join(CONFIG_FILE)
}
