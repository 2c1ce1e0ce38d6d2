use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "record-store")]
#[command(about = "Manage records in a hosted document collection")]
pub struct CliConfig {
    /// TOML file with connection parameters; the environment is used otherwise
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the collection name
    #[arg(long)]
    pub collection: Option<String>,

    #[arg(long, env = "RECORD_STORE_EMAIL")]
    pub email: Option<String>,

    #[arg(long, env = "RECORD_STORE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create a record and print its identifier
    Create(RecordArgs),
    /// List every record, newest first
    List,
    /// Show one record
    Get { id: String },
    /// Merge the given fields into an existing record
    Update {
        id: String,
        #[command(flatten)]
        fields: RecordArgs,
    },
    /// Delete a record permanently
    Delete { id: String },
}

#[derive(Debug, Clone, Args)]
pub struct RecordArgs {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Price as typed, e.g. 9.99
    #[arg(long)]
    pub price: Option<String>,

    #[arg(long)]
    pub details: Option<String>,
}
