//! Implementation of the `relay run` command.
//!
//! The cached path: one job per `--sub-id` (or a single job without one).
//! A single job prints the artifact itself; a batch prints one summary object
//! per job, in the order the ids were given.

use super::{
    Setup, extract_request, parse_timeout_class, print_json, print_message, read_template,
    render_prompt,
};
use crate::cache::CacheKey;
use crate::cli::RunArgs;
use crate::error::Result;
use crate::exit_codes;
use crate::runner::{ArtifactJob, JobOutcome, Runner};
use crate::session::Message;
use serde_json::{Value, json};

pub fn cmd_run(setup: &Setup, args: RunArgs) -> Result<i32> {
    let timeout = parse_timeout_class(&args.timeout_class)?;
    let template = read_template(&args.prompt)?;
    let request = extract_request(&args.extract);

    let sub_ids: Vec<Option<&str>> = if args.sub_ids.is_empty() {
        vec![None]
    } else {
        args.sub_ids.iter().map(|s| Some(s.as_str())).collect()
    };

    let repo = args.repo.as_deref().or(Some(args.subject.as_str()));
    let jobs = sub_ids
        .iter()
        .map(|sub_id| {
            let prompt = render_prompt(
                &template,
                &[
                    ("category", Some(args.category.as_str())),
                    ("subject", Some(args.subject.as_str())),
                    ("repo", repo),
                    ("sub_id", *sub_id),
                ],
                &args.prompt.vars,
            )?;
            Ok(ArtifactJob {
                key: CacheKey::new(&args.category, &args.subject, *sub_id)?,
                prompt,
                repository: args.repo.clone(),
                request: request.clone(),
                timeout,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let transport = setup.transport()?;
    let runner = Runner::new(&transport, &setup.config, setup.cache()).with_events(setup.events());

    if let [job] = jobs.as_slice() {
        let mut show = print_message;
        let observer: Option<&mut dyn FnMut(&Message)> = if args.live { Some(&mut show) } else { None };
        let outcome = runner.run(job, observer)?;
        return report(&outcome);
    }

    let results = runner.run_batch(&jobs);
    let mut exit_code = exit_codes::SUCCESS;
    let mut summaries = Vec::with_capacity(results.len());
    for (sub_id, result) in sub_ids.iter().zip(results) {
        let (code, mut summary) = match result {
            Ok(outcome) => (outcome.exit_code(), summarize(&outcome)),
            Err(e) => (e.exit_code(), json!({"status": "error", "error": e.to_string()})),
        };
        if exit_code == exit_codes::SUCCESS {
            exit_code = code;
        }
        summary["sub_id"] = json!(sub_id);
        summaries.push(summary);
    }
    print_json(&summaries)?;
    Ok(exit_code)
}

/// Print a single job's result: the document on stdout, anything else on stderr.
fn report(outcome: &JobOutcome) -> Result<i32> {
    match outcome {
        JobOutcome::Completed {
            document,
            session_id,
            cached,
        } => {
            print_json(document)?;
            if *cached {
                eprintln!("(from cache)");
            } else if let Some(id) = session_id {
                eprintln!("session: {}", id);
            }
        }
        JobOutcome::RemoteFailed { session_id, status } => {
            eprintln!("Session {} ended with status '{}'.", session_id, status);
        }
        JobOutcome::TimedOut { session_id } => {
            eprintln!(
                "Session {} is still running at the deadline.\nResume with: relay watch {}",
                session_id, session_id
            );
        }
        JobOutcome::Unreachable { session_id } => {
            eprintln!(
                "Lost contact with session {}; it may still be running.\nResume with: relay watch {}",
                session_id, session_id
            );
        }
    }
    Ok(outcome.exit_code())
}

fn summarize(outcome: &JobOutcome) -> Value {
    match outcome {
        JobOutcome::Completed {
            document,
            session_id,
            cached,
        } => json!({
            "status": if *cached { "cached" } else { "completed" },
            "session_id": session_id,
            "document": document,
        }),
        JobOutcome::RemoteFailed { session_id, status } => json!({
            "status": "remote_failed",
            "session_id": session_id,
            "remote_status": status.as_str(),
        }),
        JobOutcome::TimedOut { session_id } => json!({
            "status": "timed_out",
            "session_id": session_id,
        }),
        JobOutcome::Unreachable { session_id } => json!({
            "status": "unreachable",
            "session_id": session_id,
        }),
    }
}
