//! Command line argument parsing for the quarry CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Quarry - load documents and run a query over them
#[derive(Parser, Debug, Clone)]
#[command(name = "quarry")]
#[command(about = "Run term, prefix, wildcard, fuzzy and range queries over a JSON-lines file")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct QuarryArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// JSON-lines file holding one document object per line
    #[arg(value_name = "DOCUMENTS")]
    pub documents: PathBuf,

    /// Index configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG", env = "QUARRY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Field to search (default: the index's default field)
    #[arg(long)]
    pub field: Option<String>,

    /// Maximum number of results to return
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Offset for pagination
    #[arg(short, long, default_value = "0")]
    pub offset: usize,

    /// Sort by a field instead of score, as FIELD or FIELD:TYPE
    #[arg(short, long, value_name = "FIELD[:TYPE]")]
    pub sort: Option<String>,

    /// Reverse the sort order
    #[arg(long, requires = "sort")]
    pub reverse: bool,

    /// Include the score explanation of every hit
    #[arg(long)]
    pub explain: bool,

    /// Include highlighted excerpts of the searched field for every hit
    #[arg(long)]
    pub highlight: bool,

    /// Pre/post tags wrapped around highlighted matches
    #[arg(long, num_args = 2, value_names = ["PRE", "POST"], requires = "highlight")]
    pub tags: Option<Vec<String>>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Query to run
    #[command(subcommand)]
    pub command: QueryCommand,
}

impl QuarryArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose.max(1)
        }
    }
}

/// Query kinds available from the command line.
#[derive(Subcommand, Debug, Clone)]
pub enum QueryCommand {
    /// Documents containing a term
    Term {
        /// Term text
        text: String,
    },

    /// Documents containing a term starting with a prefix
    Prefix {
        /// Term prefix
        prefix: String,
    },

    /// Documents containing a term matching a pattern (`*` and `?`)
    Wildcard {
        /// Wildcard pattern
        pattern: String,
    },

    /// Documents containing a term similar to the given one
    Fuzzy {
        /// Term text
        text: String,

        /// Minimum similarity in [0, 1)
        #[arg(long, default_value = "0.5")]
        min_similarity: f32,

        /// Number of leading characters that must match exactly
        #[arg(long, default_value = "0")]
        prefix_length: usize,
    },

    /// Documents containing a term between two bounds
    Range {
        /// Lower bound (omit for an open range)
        #[arg(long)]
        lower: Option<String>,

        /// Upper bound (omit for an open range)
        #[arg(long)]
        upper: Option<String>,

        /// Exclude the lower bound
        #[arg(long)]
        exclude_lower: bool,

        /// Exclude the upper bound
        #[arg(long)]
        exclude_upper: bool,

        /// Compare bounds as numbers when both parse
        #[arg(long)]
        typed: bool,
    },
}
