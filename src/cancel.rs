//! Best-effort cancellation of in-flight sessions.
//!
//! The service has no cancel endpoint; a session is asked to stop by posting a
//! message to it. Delivery is retried on a fixed schedule. Cancelling a session
//! that has already reached a terminal state sends nothing.

use crate::config::Config;
use crate::error::RelayError;
use crate::retry::{Backoff, RetryPolicy};
use crate::transport::Transport;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct CancellationController<'a> {
    transport: &'a dyn Transport,
    policy: RetryPolicy,
    message: String,
}

impl<'a> CancellationController<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        max_attempts: u32,
        retry_delay: Duration,
        message: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            policy: RetryPolicy::new(max_attempts, Backoff::Fixed(retry_delay)),
            message: message.into(),
        }
    }

    pub fn from_config(transport: &'a dyn Transport, config: &Config) -> Self {
        Self::new(
            transport,
            config.cancel_max_attempts,
            Duration::from_secs(config.cancel_retry_delay_secs),
            config.cancel_message.clone(),
        )
    }

    /// Ask the session to stop.
    ///
    /// Returns true when the session is already terminal or a stop message was
    /// delivered, false when every delivery attempt failed.
    pub fn cancel(&self, session_id: &str) -> bool {
        match self.transport.get_session_state(session_id) {
            Ok(session) if session.is_terminal() => {
                debug!(session_id, status = %session.status, "already terminal, nothing to cancel");
                return true;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(session_id, error = %e, "status check failed, sending stop message anyway");
            }
        }

        let delivered = self.policy.run(
            |attempt| {
                if self.transport.post_message(session_id, &self.message) {
                    Ok(attempt)
                } else {
                    Err(RelayError::Transport(format!(
                        "stop message to {} not delivered (attempt {})",
                        session_id, attempt
                    )))
                }
            },
            |_| true,
        );

        match delivered {
            Ok(attempt) => {
                info!(session_id, attempt, "stop message delivered");
                true
            }
            Err(e) => {
                warn!(session_id, attempts = self.policy.max_attempts, error = %e, "cancellation gave up");
                false
            }
        }
    }
}
