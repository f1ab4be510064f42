//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "medrag")]
#[command(
    author,
    version,
    about = "Patient-aware medical evidence search and medication safety checks"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true, env = "MEDRAG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Retrieve ranked evidence for a query
    Search(SearchArgs),

    /// Check medications for interactions and contraindications
    Interactions(InteractionArgs),

    /// Evidence and safety findings for one consultation
    Consult(ConsultArgs),

    /// Build or inspect the document index
    Index(IndexArgs),

    /// Inspect or export the knowledge graph
    Graph(GraphArgs),

    /// Find drug names in the knowledge graph
    Drugs(DrugsArgs),
}

/// Patient context flags shared by retrieval commands
#[derive(Args, Clone, Default)]
pub struct PatientArgs {
    /// Patient age in years
    #[arg(long, allow_negative_numbers = true)]
    pub age: Option<i64>,

    /// Patient gender (male, female, unknown)
    #[arg(long, default_value = "")]
    pub gender: String,

    /// Active condition (repeatable)
    #[arg(long = "condition")]
    pub conditions: Vec<String>,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Search query
    pub query: Vec<String>,

    /// Number of results
    #[arg(short = 'n', long = "top-k", default_value_t = 5, allow_negative_numbers = true)]
    pub top_k: i64,

    #[command(flatten)]
    pub patient: PatientArgs,

    /// Show full passage text
    #[arg(long)]
    pub full: bool,
}

#[derive(Args)]
pub struct InteractionArgs {
    /// Medication names, free text accepted
    #[arg(required = true)]
    pub medications: Vec<String>,

    /// Active condition (repeatable)
    #[arg(long = "condition")]
    pub conditions: Vec<String>,
}

#[derive(Args)]
pub struct ConsultArgs {
    /// Query or symptom description
    pub query: Vec<String>,

    /// Number of evidence passages
    #[arg(short = 'n', long = "top-k", default_value_t = 5, allow_negative_numbers = true)]
    pub top_k: i64,

    #[command(flatten)]
    pub patient: PatientArgs,

    /// Current medication (repeatable)
    #[arg(short, long = "medication")]
    pub medications: Vec<String>,
}

#[derive(Args)]
pub struct IndexArgs {
    #[command(subcommand)]
    pub action: IndexAction,
}

#[derive(Subcommand)]
pub enum IndexAction {
    /// Build a snapshot from a JSON array of document records
    Build {
        /// Input JSON file
        input: PathBuf,
        /// Snapshot directory (defaults to the configured index_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show snapshot statistics
    Stats {
        /// Snapshot directory (defaults to the configured index_dir)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

#[derive(Args)]
pub struct GraphArgs {
    #[command(subcommand)]
    pub action: GraphAction,
}

#[derive(Subcommand)]
pub enum GraphAction {
    /// Node and edge counts
    Stats,
    /// Write the active graph as a JSON snapshot
    Export {
        /// Output file
        output: PathBuf,
    },
}

#[derive(Args)]
pub struct DrugsArgs {
    /// Name fragment
    pub query: String,

    /// Maximum names returned
    #[arg(short = 'n', default_value = "20")]
    pub limit: usize,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
}
