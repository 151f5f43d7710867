//! CLI argument parsing for kinship
//!
//! Global flags select the snapshot, configuration, output format and
//! logging; subcommands map one-to-one onto engine operations.

pub mod format;
pub mod output;
pub mod parse;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

pub use output::OutputFormat;
use parse::{parse_format, parse_since};

/// Kinship - near-duplicates, relationship graphs and topic clusters for notes
#[derive(Parser, Debug)]
#[command(name = "kinship")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Note snapshot (JSON array or NDJSON)
    #[arg(long, global = true, env = "KINSHIP_NOTES")]
    pub notes: Option<PathBuf>,

    /// Engine configuration file (TOML)
    #[arg(long, global = true, env = "KINSHIP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_parser = parse_format)]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Enable debug logging and phase timings
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Log level filter (e.g. "debug" or "kinship_core=trace")
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Abandon the run after this many seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Only consider notes carrying this tag
    #[arg(long, short, global = true)]
    pub tag: Option<String>,

    /// Only consider notes created at or after this date (RFC 3339 or YYYY-MM-DD)
    #[arg(long, global = true, value_parser = parse_since)]
    pub since: Option<DateTime<Utc>>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the relationship graph
    Graph {
        /// Minimum score for an edge
        #[arg(long)]
        edge_threshold: Option<f64>,
    },

    /// Group notes into topic clusters
    Clusters {
        /// Minimum score for an edge
        #[arg(long)]
        edge_threshold: Option<f64>,
    },

    /// Rank the notes most related to one note
    Related {
        /// Note ID
        id: String,

        /// Number of neighbours to return
        #[arg(long, short)]
        k: Option<usize>,

        /// Minimum score for an edge
        #[arg(long)]
        edge_threshold: Option<f64>,
    },

    /// Find groups of near-duplicate notes
    Duplicates {
        /// Minimum score for two notes to count as duplicates
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Graph, duplicates and clusters from a single pass
    Analyze {
        /// Minimum score for an edge
        #[arg(long)]
        edge_threshold: Option<f64>,

        /// Minimum score for two notes to count as duplicates
        #[arg(long)]
        dup_threshold: Option<f64>,
    },

    /// Print the effective engine configuration
    Config {
        /// Print built-in defaults, ignoring --config
        #[arg(long)]
        default: bool,
    },
}
