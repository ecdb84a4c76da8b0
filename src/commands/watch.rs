//! Implementation of the `relay watch` command.
//!
//! Picks up a session created earlier (for instance one that timed out in
//! `relay run`) and polls it again with a fresh deadline.

use super::{Setup, parse_timeout_class, print_json, print_message};
use crate::cli::WatchArgs;
use crate::error::Result;
use crate::exit_codes;
use crate::extract::links::find_pull_request_url;
use crate::poller::{PollOptions, PollOutcome, SessionPoller};
use crate::session::Message;
use serde_json::{Value, json};

pub fn cmd_watch(setup: &Setup, args: WatchArgs) -> Result<i32> {
    let class = parse_timeout_class(&args.timeout_class)?;
    let transport = setup.transport()?;
    let poller = SessionPoller::new(&transport, PollOptions::from_config(&setup.config, class));

    let outcome = if args.live {
        let mut show = print_message;
        poller.poll_live(&args.session_id, &mut show as &mut dyn FnMut(&Message))
    } else {
        poller.poll(&args.session_id)
    };

    let (code, summary) = summarize(&outcome);
    print_json(&summary)?;
    Ok(code)
}

fn summarize(outcome: &PollOutcome) -> (i32, Value) {
    match outcome {
        PollOutcome::Finished(session) | PollOutcome::EarlyStop(session) => {
            let code = if session.status.is_failure() {
                exit_codes::REMOTE_FAILED
            } else {
                exit_codes::SUCCESS
            };
            (
                code,
                json!({
                    "session_id": session.id,
                    "status": session.status,
                    "messages": session.messages.len(),
                    "attachments": session.attachments.iter().map(|a| &a.name).collect::<Vec<_>>(),
                    "pr_url": find_pull_request_url(session),
                }),
            )
        }
        PollOutcome::TimedOut {
            session_id,
            last_status,
            elapsed,
            polls,
        } => (
            exit_codes::TIMED_OUT,
            json!({
                "session_id": session_id,
                "status": "timed_out",
                "last_status": last_status,
                "elapsed_secs": elapsed.as_secs(),
                "polls": polls,
            }),
        ),
        PollOutcome::Unreachable {
            session_id,
            consecutive_failures,
            last_error,
        } => (
            exit_codes::UNREACHABLE,
            json!({
                "session_id": session_id,
                "status": "unreachable",
                "consecutive_failures": consecutive_failures,
                "last_error": last_error,
            }),
        ),
    }
}
