//! CLI argument parsing for relay.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Relay: dispatch remote agent sessions, wait for them, and cache their JSON artifacts.
#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// State directory (config, cache, event log). Defaults to $RELAY_HOME, then ./.relay.
    #[arg(long, global = true, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Enable debug logging (overridden by RELAY_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Produce a JSON artifact, answering from the cache when possible.
    ///
    /// On a cache miss a session is created from the prompt, watched until it
    /// finishes, and its artifact extracted and cached. Repeating `--sub-id`
    /// runs one job per id on the worker pool.
    Run(RunArgs),

    /// Dispatch a change-making session and report its pull request.
    ///
    /// Stops watching as soon as a pull request URL appears. Never cached.
    Execute(ExecuteArgs),

    /// Resume watching an existing session until it finishes.
    Watch(WatchArgs),

    /// Show a session's current status.
    Status(StatusArgs),

    /// Extract the JSON artifact from an existing session.
    Extract(ExtractArgs),

    /// Ask a running session to stop (best effort).
    Cancel(CancelArgs),

    /// Inspect the artifact cache.
    Cache(CacheCommand),
}

/// Prompt source shared by `run` and `execute`.
#[derive(Args, Debug, Clone)]
pub struct PromptArgs {
    /// Prompt template text.
    #[arg(long, conflicts_with = "prompt_file", required_unless_present = "prompt_file")]
    pub prompt: Option<String>,

    /// Read the prompt template from a file.
    #[arg(long, value_name = "FILE")]
    pub prompt_file: Option<PathBuf>,

    /// Template variable, `key=value`. May be repeated.
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,
}

/// Extraction options shared by `run` and `extract`.
#[derive(Args, Debug, Clone, Default)]
pub struct ExtractOpts {
    /// Attachment name prefix to look for (e.g. `plan` for `plan_1.json`).
    #[arg(long)]
    pub filter: Option<String>,

    /// Sub-key of the structured output to return.
    #[arg(long)]
    pub field: Option<String>,

    /// Return every matching attachment as a JSON array.
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CacheKeyArgs {
    /// Artifact category, e.g. `issues`, `feasibility`, `plan`.
    #[arg(long)]
    pub category: String,

    /// Subject the artifact is about, usually a repository URL.
    #[arg(long)]
    pub subject: String,

    /// Item within the subject, e.g. an issue number.
    #[arg(long)]
    pub sub_id: Option<String>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Artifact category, e.g. `issues`, `feasibility`, `plan`.
    #[arg(long)]
    pub category: String,

    /// Subject the artifact is about, usually a repository URL.
    #[arg(long)]
    pub subject: String,

    /// Item within the subject. Repeat to run a batch.
    #[arg(long = "sub-id")]
    pub sub_ids: Vec<String>,

    #[command(flatten)]
    pub prompt: PromptArgs,

    /// Repository the session should work in.
    #[arg(long)]
    pub repo: Option<String>,

    #[command(flatten)]
    pub extract: ExtractOpts,

    /// Deadline class: fetch, analysis or execution.
    #[arg(long, default_value = "analysis")]
    pub timeout_class: String,

    /// Print agent messages as they arrive.
    #[arg(long)]
    pub live: bool,
}

#[derive(Args, Debug)]
pub struct ExecuteArgs {
    #[command(flatten)]
    pub prompt: PromptArgs,

    /// Repository the session should change.
    #[arg(long)]
    pub repo: Option<String>,

    /// Print agent messages as they arrive.
    #[arg(long)]
    pub live: bool,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Session id.
    pub session_id: String,

    /// Deadline class: fetch, analysis or execution.
    #[arg(long, default_value = "analysis")]
    pub timeout_class: String,

    /// Print agent messages as they arrive.
    #[arg(long)]
    pub live: bool,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Session id.
    pub session_id: String,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Session id.
    pub session_id: String,

    #[command(flatten)]
    pub extract: ExtractOpts,
}

#[derive(Args, Debug)]
pub struct CancelArgs {
    /// Session id.
    pub session_id: String,
}

#[derive(Args, Debug)]
pub struct CacheCommand {
    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Print a cached artifact.
    Get(CacheKeyArgs),
    /// Print where an artifact is (or would be) cached.
    Path(CacheKeyArgs),
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
