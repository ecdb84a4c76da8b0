//! Command implementations for relay.
//!
//! Each subcommand lives in its own module. Commands return the process exit
//! code: remote outcomes such as a timeout are not errors but still end the
//! process with a distinct code.

mod cache;
mod cancel;
mod execute;
mod extract;
mod run;
mod status;
mod watch;

use crate::cache::ArtifactCache;
use crate::cli::{Cli, Command, ExtractOpts, PromptArgs};
use crate::config::{Config, TimeoutClass};
use crate::context::RelayContext;
use crate::error::{RelayError, Result};
use crate::events::EventLog;
use crate::extract::{ExtractMode, ExtractRequest};
use crate::prompt::{parse_assignment, render_template};
use crate::ratelimit::RateLimiter;
use crate::session::Message;
use crate::transport::HttpTransport;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<i32> {
    let setup = Setup::load(cli.state_dir.as_deref())?;
    match cli.command {
        Command::Run(args) => run::cmd_run(&setup, args),
        Command::Execute(args) => execute::cmd_execute(&setup, args),
        Command::Watch(args) => watch::cmd_watch(&setup, args),
        Command::Status(args) => status::cmd_status(&setup, args),
        Command::Extract(args) => extract::cmd_extract(&setup, args),
        Command::Cancel(args) => cancel::cmd_cancel(&setup, args),
        Command::Cache(cmd) => cache::dispatch_cache(&setup, cmd),
    }
}

/// Resolved state directory and loaded config.
pub struct Setup {
    pub ctx: RelayContext,
    pub config: Config,
}

impl Setup {
    pub fn load(state_dir: Option<&Path>) -> Result<Self> {
        let ctx = RelayContext::resolve(state_dir)?;
        let config = ctx.load_config()?;
        Ok(Self { ctx, config })
    }

    /// HTTP transport with its own process-wide rate limiter.
    pub fn transport(&self) -> Result<HttpTransport> {
        let limiter = Arc::new(RateLimiter::from_config(&self.config)?);
        HttpTransport::from_config(&self.config, limiter)
    }

    pub fn cache(&self) -> ArtifactCache {
        ArtifactCache::new(&self.ctx.cache_dir)
    }

    pub fn events(&self) -> EventLog {
        EventLog::for_context(&self.ctx)
    }
}

pub(crate) fn parse_timeout_class(s: &str) -> Result<TimeoutClass> {
    TimeoutClass::from_str(s).ok_or_else(|| {
        RelayError::UserError(format!(
            "invalid timeout class '{}': expected fetch, analysis or execution",
            s
        ))
    })
}

pub(crate) fn extract_request(opts: &ExtractOpts) -> ExtractRequest {
    ExtractRequest {
        name_filter: opts.filter.clone(),
        field: opts.field.clone(),
        mode: if opts.all {
            ExtractMode::All
        } else {
            ExtractMode::First
        },
    }
}

/// The raw template text from `--prompt` or `--prompt-file`.
pub(crate) fn read_template(args: &PromptArgs) -> Result<String> {
    match (&args.prompt, &args.prompt_file) {
        (Some(text), _) => Ok(text.clone()),
        (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
            RelayError::UserError(format!(
                "failed to read prompt file '{}': {}",
                path.display(),
                e
            ))
        }),
        (None, None) => Err(RelayError::UserError(
            "a prompt is required: pass --prompt or --prompt-file".to_string(),
        )),
    }
}

/// Render `template` with the built-in variables plus every `--var`.
/// Explicit `--var` values win over built-ins.
pub(crate) fn render_prompt(
    template: &str,
    builtins: &[(&str, Option<&str>)],
    assignments: &[String],
) -> Result<String> {
    let mut vars: HashMap<String, String> = builtins
        .iter()
        .filter_map(|(k, v)| v.map(|v| (k.to_string(), v.to_string())))
        .collect();
    for assignment in assignments {
        let (key, value) = parse_assignment(assignment)?;
        vars.insert(key, value);
    }
    Ok(render_template(template, &vars)?)
}

/// Live transcript line on stderr.
pub(crate) fn print_message(message: &Message) {
    eprintln!("[{}] {}", message.kind.label(), message.content.trim_end());
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| RelayError::UserError(format!("failed to render JSON output: {}", e)))?;
    println!("{}", text);
    Ok(())
}
