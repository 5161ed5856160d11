//! `kan` command line: schema migration and the doctor.
//!
//! Usage:
//!   kan migrate [--dry-run]
//!   kan doctor [--board NAME] [--fix] [--json]

mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kan_core::migrate::MigrationError;
use kan_core::KanPaths;

#[derive(Parser, Debug)]
#[command(name = "kan", about = "Maintain a kan board directory")]
struct Cli {
    /// Project directory containing `.kan/` (defaults to the current directory)
    #[arg(long, value_name = "DIR", global = true)]
    root: Option<PathBuf>,

    /// Global config file (defaults to `<config dir>/kan/config.toml`)
    #[arg(long, value_name = "FILE", global = true)]
    global_config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upgrade boards, cards and configs to the current schema
    Migrate {
        /// Show what would change without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Check the board tree for inconsistencies
    Doctor {
        /// Only check this board
        #[arg(long, value_name = "NAME")]
        board: Option<String>,
        /// Repair every fixable issue
        #[arg(long)]
        fix: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let project_dir = match cli.root {
        Some(dir) => dir,
        None => std::env::current_dir().context("resolving current directory")?,
    };
    let mut paths = KanPaths::discover(&project_dir);
    if let Some(global) = cli.global_config {
        paths = KanPaths::new(paths.root(), global);
    }
    log::debug!("[kan.cli] Data directory {}", paths.root().display());

    match cli.command {
        Command::Migrate { dry_run } => migrate(&paths, dry_run),
        Command::Doctor { board, fix, json } => doctor(&paths, board.as_deref(), fix, json),
    }
}

fn migrate(paths: &KanPaths, dry_run: bool) -> Result<ExitCode> {
    let plan = kan_core::plan(paths).context("planning migration")?;
    print!("{}", render::plan(&plan));
    if !plan.has_changes() {
        return Ok(ExitCode::SUCCESS);
    }

    match kan_core::execute(&plan, dry_run) {
        Ok(outcome) => {
            print!("{}", render::outcome(&outcome));
            Ok(ExitCode::SUCCESS)
        }
        Err(MigrationError::Incomplete {
            failures,
            completed,
        }) => {
            print!("{}", render::outcome(&completed));
            for failure in &failures {
                eprintln!("failed: {}", failure);
            }
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e).context("executing migration"),
    }
}

fn doctor(paths: &KanPaths, board: Option<&str>, fix: bool, json: bool) -> Result<ExitCode> {
    let mut report = kan_core::diagnose(paths, board).context("diagnosing board tree")?;
    if fix && report.fixable_count() > 0 {
        report = kan_core::fix(paths, &report);
    }

    if json {
        let text = serde_json::to_string_pretty(&report).context("serializing report")?;
        println!("{}", text);
    } else {
        print!("{}", render::report(&report, fix));
    }

    Ok(if report.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
