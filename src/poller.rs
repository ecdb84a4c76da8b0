//! Waits for a remote session to reach a terminal state.
//!
//! Each poll fetches a snapshot. A terminal status ends the loop; otherwise the
//! poller sleeps and tries again. The delay grows exponentially from
//! `poll_initial_interval_secs` up to `poll_max_interval_secs` and is clamped
//! to the time left before the deadline, so a poll never blocks past the
//! deadline by more than one request.
//!
//! Running out of time and losing contact are reported as [`PollOutcome`]
//! variants rather than errors: the remote task may still be running, and the
//! caller keeps the session id to resume watching later.

use crate::config::{Config, TimeoutClass};
use crate::retry::Backoff;
use crate::session::{Message, Session, Status};
use crate::transport::Transport;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Wall-clock budget for the whole poll.
    pub deadline: Duration,
    /// Delay schedule between polls.
    pub interval: Backoff,
    /// Consecutive failed polls tolerated before reporting `Unreachable`.
    pub max_consecutive_failures: u32,
}

impl PollOptions {
    pub fn from_config(config: &Config, class: TimeoutClass) -> Self {
        Self {
            deadline: config.timeout_for(class),
            interval: Backoff::Exponential {
                initial: Duration::from_secs(config.poll_initial_interval_secs),
                cap: Duration::from_secs(config.poll_max_interval_secs),
            },
            max_consecutive_failures: config.poll_max_consecutive_failures.max(1),
        }
    }
}

/// How a poll ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The session reached a terminal status.
    Finished(Session),
    /// The early-stop predicate matched before the session finished.
    EarlyStop(Session),
    /// The deadline passed while the session was still running.
    TimedOut {
        session_id: String,
        last_status: Option<Status>,
        elapsed: Duration,
        polls: u32,
    },
    /// Too many consecutive transport errors; the session may still be running.
    Unreachable {
        session_id: String,
        consecutive_failures: u32,
        last_error: String,
    },
}

impl PollOutcome {
    pub fn session_id(&self) -> &str {
        match self {
            PollOutcome::Finished(s) | PollOutcome::EarlyStop(s) => &s.id,
            PollOutcome::TimedOut { session_id, .. }
            | PollOutcome::Unreachable { session_id, .. } => session_id,
        }
    }

    /// The last snapshot, when the poll ended with one.
    pub fn session(&self) -> Option<&Session> {
        match self {
            PollOutcome::Finished(s) | PollOutcome::EarlyStop(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_session(self) -> Option<Session> {
        match self {
            PollOutcome::Finished(s) | PollOutcome::EarlyStop(s) => Some(s),
            _ => None,
        }
    }
}

pub struct SessionPoller<'a> {
    transport: &'a dyn Transport,
    options: PollOptions,
}

impl<'a> SessionPoller<'a> {
    pub fn new(transport: &'a dyn Transport, options: PollOptions) -> Self {
        Self { transport, options }
    }

    /// Poll until the session is terminal, the deadline passes, or contact is lost.
    pub fn poll(&self, session_id: &str) -> PollOutcome {
        self.run(session_id, None, None)
    }

    /// Like [`poll`](Self::poll), handing each newly appended message to
    /// `observer` exactly once, in server order.
    pub fn poll_live(&self, session_id: &str, observer: &mut dyn FnMut(&Message)) -> PollOutcome {
        self.run(session_id, None, Some(observer))
    }

    /// Like [`poll`](Self::poll), but also stops as soon as `predicate`
    /// holds for a snapshot. A terminal status on the same snapshot wins.
    pub fn poll_until(
        &self,
        session_id: &str,
        predicate: &dyn Fn(&Session) -> bool,
        observer: Option<&mut dyn FnMut(&Message)>,
    ) -> PollOutcome {
        self.run(session_id, Some(predicate), observer)
    }

    fn run(
        &self,
        session_id: &str,
        stop_when: Option<&dyn Fn(&Session) -> bool>,
        mut observer: Option<&mut dyn FnMut(&Message)>,
    ) -> PollOutcome {
        let start = Instant::now();
        let mut polls: u32 = 0;
        let mut failures: u32 = 0;
        let mut last_status: Option<Status> = None;
        // Locally observed transcript; only ever grows.
        let mut transcript: Vec<Message> = Vec::new();

        loop {
            polls += 1;
            match self.transport.get_session_state(session_id) {
                Ok(mut session) => {
                    failures = 0;

                    if session.messages.len() > transcript.len() {
                        let fresh = &session.messages[transcript.len()..];
                        if let Some(observer) = observer.as_deref_mut() {
                            for message in fresh {
                                observer(message);
                            }
                        }
                        transcript.extend_from_slice(fresh);
                    } else {
                        session.merge_transcript(&transcript);
                    }

                    if last_status.as_ref() != Some(&session.status) {
                        info!(session_id, status = %session.status, "session status");
                        last_status = Some(session.status.clone());
                    }

                    if session.is_terminal() {
                        debug!(session_id, polls, "session reached terminal status");
                        return PollOutcome::Finished(session);
                    }
                    if let Some(predicate) = stop_when
                        && predicate(&session)
                    {
                        debug!(session_id, polls, "early-stop condition met");
                        return PollOutcome::EarlyStop(session);
                    }
                }
                Err(err) => {
                    failures += 1;
                    warn!(
                        session_id,
                        failures,
                        error = %err,
                        "failed to fetch session state"
                    );
                    if failures >= self.options.max_consecutive_failures {
                        return PollOutcome::Unreachable {
                            session_id: session_id.to_string(),
                            consecutive_failures: failures,
                            last_error: err.to_string(),
                        };
                    }
                }
            }

            let elapsed = start.elapsed();
            if elapsed >= self.options.deadline {
                return PollOutcome::TimedOut {
                    session_id: session_id.to_string(),
                    last_status,
                    elapsed,
                    polls,
                };
            }

            let delay = self
                .options
                .interval
                .delay(polls - 1)
                .min(self.options.deadline - elapsed);
            std::thread::sleep(delay);
        }
    }
}
