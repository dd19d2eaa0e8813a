//! CLI parse: clap types for niwa. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// niwa - shared markdown documents for concurrent agents
#[derive(Parser)]
#[command(name = "niwa")]
#[command(about = "Multi-writer markdown document store with conflict detection")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an empty document if none exists
    Init,
    /// Parse a markdown file into the store
    Load {
        /// Markdown file
        file: PathBuf,
        /// Replace the existing document and its history
        #[arg(long)]
        replace: bool,
    },
    /// Add a heading under a parent node
    Add {
        parent: String,
        title: String,
        #[arg(long)]
        agent: String,
        /// Body text (default: empty)
        #[arg(long)]
        content: Option<String>,
        /// Read the body from a file
        #[arg(long, conflicts_with = "content")]
        file: Option<PathBuf>,
    },
    /// Show the document outline
    Tree {
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Show a node without registering a read
    Peek {
        node_id: String,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Read a node and register the version seen
    Read {
        node_id: String,
        #[arg(long)]
        agent: String,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Submit new content for a node
    Edit {
        node_id: String,
        #[arg(long)]
        agent: String,
        /// New content; read from --file or stdin when omitted
        #[arg(long)]
        content: Option<String>,
        #[arg(long, conflicts_with = "content")]
        file: Option<PathBuf>,
        /// Edit message stored in the history
        #[arg(long, short, default_value = "")]
        message: String,
        /// On a stale read: prompt (record the conflict), auto (apply a clean merge) or
        /// force (overwrite)
        #[arg(long, default_value = "prompt")]
        strategy: String,
        /// Report what would happen without writing
        #[arg(long)]
        dry_run: bool,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Settle an open conflict
    Resolve {
        node_id: String,
        /// accept_yours, accept_theirs, accept_auto_merge or manual_merge
        resolution: String,
        #[arg(long)]
        agent: String,
        /// Merged content for manual_merge; read from --file or stdin when omitted
        #[arg(long)]
        content: Option<String>,
        #[arg(long, conflicts_with = "content")]
        file: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Rename a heading
    Title {
        node_id: String,
        title: String,
        #[arg(long)]
        agent: String,
    },
    /// Set or clear a node summary
    Summarize {
        node_id: String,
        summary: Option<String>,
        #[arg(long)]
        agent: String,
        #[arg(long, conflicts_with = "summary")]
        clear: bool,
    },
    /// Write the document as markdown
    Export {
        /// Output file (default: stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Pending reads, conflicts and recent edits for an agent
    Status {
        #[arg(long)]
        agent: String,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// List open conflicts
    Conflicts {
        /// Only conflicts of this agent
        #[arg(long)]
        agent: Option<String>,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// List agents seen in the store
    Agents {
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Suggest an unused agent name
    Whoami,
    /// Store health and integrity checks
    Check {
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Search titles and content
    Search {
        query: String,
        #[arg(long)]
        case_sensitive: bool,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Version history of a node
    History {
        node_id: String,
        /// Include the content of every version
        #[arg(long)]
        full: bool,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Restore an earlier version as a new version
    Rollback {
        node_id: String,
        version: u64,
        #[arg(long)]
        agent: String,
    },
    /// Expire old pending reads and conflicts
    Cleanup {
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
}
