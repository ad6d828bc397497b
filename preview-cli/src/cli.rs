// ABOUTME: CLI argument definitions for the gutter preview application
// ABOUTME: Defines the command-line interface structure using clap derive macros

use crate::constants::timeouts::DEFAULT_SETTLE_SECS;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gutter-preview")]
#[command(about = "Find image references in a file and preview what they resolve to", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Read configuration from this file instead of the standard locations
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that opens a document
#[derive(Args, Debug, Clone)]
pub struct DocumentArgs {
    /// File to scan
    pub file: PathBuf,

    /// Workspace folder (repeatable). Defaults to the configured folders
    #[arg(long = "workspace", short = 'w')]
    pub workspaces: Vec<PathBuf>,

    /// Language id of the document (inferred from the extension by default)
    #[arg(long)]
    pub language: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a file once and list every image marker
    Scan {
        #[command(flatten)]
        document: DocumentArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Pretty print JSON output
        #[arg(long, requires = "json")]
        pretty: bool,

        /// Seconds to wait for downloads and copies to finish
        #[arg(long, default_value_t = DEFAULT_SETTLE_SECS)]
        timeout: u64,
    },
    /// Show hover content for one line
    Hover {
        #[command(flatten)]
        document: DocumentArgs,

        /// Line number (1-based)
        #[arg(long, short, value_parser = clap::value_parser!(u64).range(1..))]
        line: u64,

        /// Seconds to wait for downloads and copies to finish
        #[arg(long, default_value_t = DEFAULT_SETTLE_SECS)]
        timeout: u64,
    },
    /// Keep scanning as the file changes, printing marker updates
    Watch {
        #[command(flatten)]
        document: DocumentArgs,
    },
}
