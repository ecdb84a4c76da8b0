//! End-to-end request paths.
//!
//! [`Runner::run`] is the cached path: answer from the cache when possible,
//! otherwise create a session, wait for it, extract the artifact and store it.
//! [`Runner::run_batch`] drives several jobs on a bounded pool of threads that
//! share one transport (and so one rate limiter). [`Runner::run_execution`]
//! dispatches a change-making session and reports the pull request it opened;
//! those results are never cached.

use crate::cache::{ArtifactCache, CacheKey};
use crate::config::{Config, TimeoutClass};
use crate::error::Result;
use crate::events::{Event, EventAction, EventLog};
use crate::exit_codes;
use crate::extract::links::{find_pull_request_url, has_pull_request_url};
use crate::extract::{ArtifactExtractor, ExtractRequest};
use crate::poller::{PollOptions, PollOutcome, SessionPoller};
use crate::session::{Message, Session, Status};
use crate::transport::Transport;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

/// One cached artifact request.
#[derive(Debug, Clone)]
pub struct ArtifactJob {
    pub key: CacheKey,
    pub prompt: String,
    pub repository: Option<String>,
    pub request: ExtractRequest,
    pub timeout: TimeoutClass,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed {
        document: Value,
        /// `None` when the document came from the cache.
        session_id: Option<String>,
        cached: bool,
    },
    /// The session ended in `failed` or `expired`.
    RemoteFailed { session_id: String, status: Status },
    TimedOut { session_id: String },
    Unreachable { session_id: String },
}

impl JobOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            JobOutcome::Completed { .. } => exit_codes::SUCCESS,
            JobOutcome::RemoteFailed { .. } => exit_codes::REMOTE_FAILED,
            JobOutcome::TimedOut { .. } => exit_codes::TIMED_OUT,
            JobOutcome::Unreachable { .. } => exit_codes::UNREACHABLE,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            JobOutcome::Completed { session_id, .. } => session_id.as_deref(),
            JobOutcome::RemoteFailed { session_id, .. }
            | JobOutcome::TimedOut { session_id }
            | JobOutcome::Unreachable { session_id } => Some(session_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// A pull request URL was found.
    Success,
    /// The session ended without announcing a pull request.
    Failed,
    TimedOut,
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub status: ExecutionStatus,
    pub session_id: String,
    pub pr_url: Option<String>,
}

impl ExecutionReport {
    pub fn exit_code(&self) -> i32 {
        match self.status {
            ExecutionStatus::Success => exit_codes::SUCCESS,
            ExecutionStatus::Failed => exit_codes::REMOTE_FAILED,
            ExecutionStatus::TimedOut => exit_codes::TIMED_OUT,
            ExecutionStatus::Unreachable => exit_codes::UNREACHABLE,
        }
    }
}

pub struct Runner<'a> {
    transport: &'a dyn Transport,
    config: &'a Config,
    cache: ArtifactCache,
    events: Option<EventLog>,
    poll_override: Option<PollOptions>,
}

impl<'a> Runner<'a> {
    pub fn new(transport: &'a dyn Transport, config: &'a Config, cache: ArtifactCache) -> Self {
        Self {
            transport,
            config,
            cache,
            events: None,
            poll_override: None,
        }
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = Some(events);
        self
    }

    /// Use `options` for every poll instead of deriving them from the config.
    pub fn with_poll_options(mut self, options: PollOptions) -> Self {
        self.poll_override = Some(options);
        self
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    fn poll_options(&self, class: TimeoutClass) -> PollOptions {
        self.poll_override
            .unwrap_or_else(|| PollOptions::from_config(self.config, class))
    }

    fn record(&self, event: Event) {
        if let Some(log) = &self.events {
            log.record(event);
        }
    }

    /// Cached path for one job.
    ///
    /// Transport failures while creating the session, cache failures and a
    /// failed extraction are errors. Everything that happens after a session
    /// exists is reported through [`JobOutcome`] so the session id survives.
    pub fn run(
        &self,
        job: &ArtifactJob,
        observer: Option<&mut dyn FnMut(&Message)>,
    ) -> Result<JobOutcome> {
        if let Some(document) = self.cache.get(&job.key)? {
            info!(key = %job.key, "answered from cache");
            self.record(Event::new(EventAction::CacheHit).with_details(json!({
                "key": job.key.to_string(),
            })));
            return Ok(JobOutcome::Completed {
                document,
                session_id: None,
                cached: true,
            });
        }

        let session_id = self.create(&job.prompt, job.repository.as_deref(), &job.key.to_string())?;

        let poller = SessionPoller::new(self.transport, self.poll_options(job.timeout));
        let outcome = match observer {
            Some(observer) => poller.poll_live(&session_id, observer),
            None => poller.poll(&session_id),
        };
        let session = match self.settle(outcome) {
            Ok(session) => session,
            Err(outcome) => return Ok(outcome),
        };

        if session.status.is_failure() {
            warn!(session_id = %session.id, status = %session.status, "remote session failed");
            return Ok(JobOutcome::RemoteFailed {
                session_id: session.id,
                status: session.status,
            });
        }

        let document = ArtifactExtractor::new(self.transport).extract(&session, &job.request)?;
        let path = self.cache.put(&job.key, &document)?;
        self.record(
            Event::new(EventAction::ArtifactStore)
                .with_session(session.id.clone())
                .with_details(json!({
                    "key": job.key.to_string(),
                    "path": path.display().to_string(),
                })),
        );

        Ok(JobOutcome::Completed {
            document,
            session_id: Some(session.id),
            cached: false,
        })
    }

    /// Run every job on at most `max_workers` threads.
    ///
    /// Results are returned in job order.
    pub fn run_batch(&self, jobs: &[ArtifactJob]) -> Vec<Result<JobOutcome>> {
        let workers = self.config.max_workers.clamp(1, jobs.len().max(1));
        let next = AtomicUsize::new(0);
        let results: Mutex<Vec<Option<Result<JobOutcome>>>> =
            Mutex::new(jobs.iter().map(|_| None).collect());

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        let i = next.fetch_add(1, Ordering::SeqCst);
                        let Some(job) = jobs.get(i) else { break };
                        let result = self.run(job, None);
                        let mut slots = results.lock().unwrap_or_else(|p| p.into_inner());
                        slots[i] = Some(result);
                    }
                });
            }
        });

        results
            .into_inner()
            .unwrap_or_else(|p| p.into_inner())
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Err(crate::error::RelayError::UserError(
                        "batch worker exited before finishing its job".to_string(),
                    ))
                })
            })
            .collect()
    }

    /// Dispatch a change-making session and wait until it announces a pull
    /// request or finishes.
    pub fn run_execution(
        &self,
        prompt: &str,
        repository: Option<&str>,
        observer: Option<&mut dyn FnMut(&Message)>,
    ) -> Result<ExecutionReport> {
        let session_id = self.create(prompt, repository, "execution")?;

        let poller = SessionPoller::new(self.transport, self.poll_options(TimeoutClass::Execution));
        let outcome = poller.poll_until(&session_id, &has_pull_request_url, observer);

        let report = match self.settle(outcome) {
            Ok(session) => {
                let pr_url = find_pull_request_url(&session);
                ExecutionReport {
                    status: if pr_url.is_some() {
                        ExecutionStatus::Success
                    } else {
                        ExecutionStatus::Failed
                    },
                    session_id: session.id,
                    pr_url,
                }
            }
            Err(JobOutcome::Unreachable { session_id }) => ExecutionReport {
                status: ExecutionStatus::Unreachable,
                session_id,
                pr_url: None,
            },
            Err(_) => ExecutionReport {
                status: ExecutionStatus::TimedOut,
                session_id,
                pr_url: None,
            },
        };
        info!(session_id = %report.session_id, status = ?report.status, pr_url = ?report.pr_url, "execution finished");
        Ok(report)
    }

    fn create(&self, prompt: &str, repository: Option<&str>, label: &str) -> Result<String> {
        let handle = self.transport.create_session(prompt, repository)?;
        info!(session_id = %handle.id, url = ?handle.url, "session created");
        self.record(
            Event::new(EventAction::SessionCreate)
                .with_session(handle.id.clone())
                .with_details(json!({
                    "for": label,
                    "repository": repository,
                    "url": handle.url,
                })),
        );
        Ok(handle.id)
    }

    /// Record how a poll ended; a snapshot comes back as `Ok`, a lost or
    /// timed-out session as the matching `JobOutcome`.
    fn settle(&self, outcome: PollOutcome) -> std::result::Result<Session, JobOutcome> {
        match outcome {
            PollOutcome::Finished(session) | PollOutcome::EarlyStop(session) => {
                self.record(
                    Event::new(EventAction::SessionFinish)
                        .with_session(session.id.clone())
                        .with_details(json!({
                            "status": session.status.as_str(),
                            "messages": session.messages.len(),
                        })),
                );
                Ok(session)
            }
            PollOutcome::TimedOut {
                session_id,
                last_status,
                elapsed,
                polls,
            } => {
                warn!(%session_id, ?elapsed, polls, "session still running at deadline");
                self.record(
                    Event::new(EventAction::PollTimeout)
                        .with_session(session_id.clone())
                        .with_details(json!({
                            "last_status": last_status.as_ref().map(Status::as_str),
                            "elapsed_secs": elapsed.as_secs_f64(),
                            "polls": polls,
                        })),
                );
                Err(JobOutcome::TimedOut { session_id })
            }
            PollOutcome::Unreachable {
                session_id,
                consecutive_failures,
                last_error,
            } => {
                warn!(%session_id, consecutive_failures, %last_error, "lost contact with session");
                self.record(
                    Event::new(EventAction::PollUnreachable)
                        .with_session(session_id.clone())
                        .with_details(json!({
                            "consecutive_failures": consecutive_failures,
                            "last_error": last_error,
                        })),
                );
                Err(JobOutcome::Unreachable { session_id })
            }
        }
    }
}
