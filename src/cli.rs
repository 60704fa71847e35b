//! Command-line interface definitions for Newsflow.
//!
//! This module defines the CLI arguments and subcommands using the `clap` crate.
//! Global options can also come from environment variables.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the Newsflow application.
///
/// Running without a subcommand is the same as `collect`.
///
/// # Examples
///
/// ```sh
/// # Collect all sources and regenerate newsflow_diario.html
/// newsflow
///
/// # Newsflow report for one source, last 12 hours, untranslated
/// newsflow report --source scmp_china --newsflow --hours 12 --no-translate
///
/// # Everything stored for Global Times
/// newsflow report --source globaltimes
///
/// # Inspect the database
/// newsflow list --source xinhua_chinabiz --limit 10
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, env = "NEWSFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database path (overrides the config file)
    #[arg(short, long, env = "NEWSFLOW_DB")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The subcommand to run, `collect` when none was given.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Collect(CollectArgs::default()))
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Collect every source, store the results and regenerate the newsflow report
    Collect(CollectArgs),
    /// Render a report from stored articles without collecting
    Report(ReportArgs),
    /// Print stored articles
    List(ListArgs),
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct CollectArgs {
    /// Report window in hours (defaults to the config value)
    #[arg(long)]
    pub hours: Option<u32>,

    /// Skip translating the report
    #[arg(long)]
    pub no_translate: bool,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ReportArgs {
    /// Source id (globaltimes, xinhua_chinabiz, scmp_china)
    #[arg(long, default_value = "globaltimes")]
    pub source: String,

    /// Newsflow report of the last hours instead of the full dump
    #[arg(long)]
    pub newsflow: bool,

    /// Translate titles and summaries (default in newsflow mode)
    #[arg(long, conflicts_with = "no_translate")]
    pub translate: bool,

    /// Do not translate
    #[arg(long)]
    pub no_translate: bool,

    /// Window in hours for newsflow mode (defaults to the config value)
    #[arg(long)]
    pub hours: Option<u32>,
}

impl ReportArgs {
    /// Whether to translate, given the configured default.
    pub fn should_translate(&self, default: bool) -> bool {
        if self.no_translate {
            false
        } else {
            self.translate || default
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ListArgs {
    /// Only rows of this source
    #[arg(long)]
    pub source: Option<String>,

    /// Maximum number of rows
    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}
