//! CLI parse: clap types for docgen. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docgen - batch generation of compliance documents
#[derive(Parser, Debug)]
#[command(name = "docgen")]
#[command(about = "Generate batches of documents and stream progress as NDJSON")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (docgen.toml and relative store paths resolve here)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Store directory (overrides storage.store_path)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stderr, stdout, file)
    #[arg(long)]
    pub log_output: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a batch and stream progress to stdout as NDJSON
    Generate {
        /// Owner context id the request belongs to
        #[arg(long)]
        owner: String,
        /// JSON file with an array of {spec_id, display_title, template_kind}
        #[arg(long)]
        specs: PathBuf,
        /// JSON file with the generation context object
        #[arg(long)]
        context: Option<PathBuf>,
    },
    /// Inspect generation requests
    Request {
        #[command(subcommand)]
        command: RequestCommands,
    },
    /// List artifacts of a request
    Artifacts {
        #[command(subcommand)]
        command: ArtifactsCommands,
    },
    /// Inspect a single artifact
    Artifact {
        #[command(subcommand)]
        command: ArtifactCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum RequestCommands {
    /// Show one request
    Show {
        id: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List requests for an owner, newest first
    List {
        #[arg(long)]
        owner: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ArtifactsCommands {
    /// List artifacts produced by a request
    List {
        request_id: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ArtifactCommands {
    /// Show one artifact including its content
    Show {
        id: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}
