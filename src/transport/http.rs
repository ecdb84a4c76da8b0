//! HTTP implementation of [`Transport`] over `reqwest::blocking`.

use super::wire::{
    CreateSessionRequest, CreateSessionResponse, PostMessageRequest, SessionResponse,
};
use super::{SessionHandle, Transport};
use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::ratelimit::RateLimiter;
use crate::retry::{Backoff, RetryPolicy};
use crate::session::{Attachment, Session};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{StatusCode, Url};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Status and body of a completed request.
struct Reply {
    status: StatusCode,
    body: Vec<u8>,
}

impl Reply {
    fn snippet(&self) -> String {
        let text = String::from_utf8_lossy(&self.body);
        let trimmed = text.trim();
        if trimmed.chars().count() > 200 {
            format!("{}...", trimmed.chars().take(200).collect::<String>())
        } else {
            trimmed.to_string()
        }
    }
}

pub struct HttpTransport {
    client: Client,
    base: Url,
    api_key: String,
    limiter: Arc<RateLimiter>,
    throttle: RetryPolicy,
}

impl HttpTransport {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        limiter: Arc<RateLimiter>,
        throttle: RetryPolicy,
        request_timeout: Duration,
    ) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| {
            RelayError::UserError(format!("invalid api_base '{}': {}", base_url, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(RelayError::UserError(format!(
                "invalid api_base '{}': not a base URL",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| RelayError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base,
            api_key: api_key.into(),
            limiter,
            throttle,
        })
    }

    /// Build a transport from config, sharing `limiter` with other transports.
    pub fn from_config(config: &Config, limiter: Arc<RateLimiter>) -> Result<Self> {
        let throttle = RetryPolicy::new(
            config.throttle_max_attempts,
            Backoff::Linear {
                base: Duration::from_millis(config.throttle_base_ms),
                cap: Duration::from_millis(config.throttle_max_delay_ms),
            },
        );
        Self::new(
            &config.api_base,
            config.require_api_key()?,
            limiter,
            throttle,
            config.request_timeout(),
        )
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Issue one request under the rate limiter.
    ///
    /// A 429 reply or a network-level failure (connect, timeout, reset) is
    /// retried under the throttle policy. Any other reply is returned as-is,
    /// whatever its status. The body is read while the permit is held so a
    /// serialized limiter covers the whole exchange.
    fn send<F>(&self, what: &str, build: F) -> Result<Reply>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        self.throttle.run(
            |attempt| {
                let _permit = self.limiter.acquire();
                let response = build(&self.client)
                    .bearer_auth(&self.api_key)
                    .send()
                    .map_err(|e| {
                        warn!(attempt, request = what, error = %e, "request failed");
                        RelayError::Transport(format!("{} failed: {}", what, e))
                    })?;
                let status = response.status();
                let body = response
                    .bytes()
                    .map_err(|e| {
                        RelayError::Transport(format!("{} failed reading body: {}", what, e))
                    })?
                    .to_vec();

                if status == StatusCode::TOO_MANY_REQUESTS {
                    warn!(attempt, request = what, "remote service throttled request");
                    return Err(RelayError::RateLimited(format!(
                        "{} still throttled after {} attempt(s)",
                        what, attempt
                    )));
                }
                Ok(Reply { status, body })
            },
            RelayError::is_transient,
        )
    }
}

impl Transport for HttpTransport {
    fn create_session(&self, prompt: &str, repository: Option<&str>) -> Result<SessionHandle> {
        let url = self.endpoint(&["sessions"]);
        let payload = CreateSessionRequest {
            prompt,
            repository_url: repository,
        };
        let reply = self.send("create session", |c| c.post(url.clone()).json(&payload))?;

        if !reply.status.is_success() {
            return Err(RelayError::Transport(format!(
                "create session returned HTTP {}: {}",
                reply.status,
                reply.snippet()
            )));
        }

        let parsed: CreateSessionResponse = serde_json::from_slice(&reply.body).map_err(|e| {
            RelayError::Transport(format!("create session returned malformed JSON: {}", e))
        })?;

        match parsed.session_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => {
                debug!(session_id = %id, "session created");
                Ok(SessionHandle {
                    id,
                    url: parsed.url,
                })
            }
            None => Err(RelayError::Transport(
                "create session response has no session_id".to_string(),
            )),
        }
    }

    fn get_session_state(&self, session_id: &str) -> Result<Session> {
        let url = self.endpoint(&["session", session_id]);
        let reply = self.send("get session", |c| c.get(url.clone()))?;

        if !reply.status.is_success() {
            return Err(RelayError::Transport(format!(
                "get session {} returned HTTP {}: {}",
                session_id,
                reply.status,
                reply.snippet()
            )));
        }

        let parsed: SessionResponse = serde_json::from_slice(&reply.body).map_err(|e| {
            RelayError::Transport(format!(
                "get session {} returned malformed JSON: {}",
                session_id, e
            ))
        })?;

        Ok(parsed.into_session(session_id))
    }

    fn post_message(&self, session_id: &str, text: &str) -> bool {
        let url = self.endpoint(&["session", session_id, "message"]);
        let payload = PostMessageRequest { message: text };
        match self.send("post message", |c| c.post(url.clone()).json(&payload)) {
            Ok(reply) if reply.status.is_success() => true,
            Ok(reply) => {
                debug!(session_id, status = %reply.status, "message not accepted");
                false
            }
            Err(e) => {
                debug!(session_id, error = %e, "message not delivered");
                false
            }
        }
    }

    fn fetch_attachment(&self, attachment: &Attachment) -> Result<Vec<u8>> {
        let url = self.endpoint(&["attachments", &attachment.id, &attachment.name]);
        let reply = self.send("fetch attachment", |c| c.get(url.clone()))?;

        if reply.status == StatusCode::NOT_FOUND {
            return Err(RelayError::NotFound(format!(
                "attachment '{}' ({}) is no longer available",
                attachment.name, attachment.id
            )));
        }
        if !reply.status.is_success() {
            return Err(RelayError::Transport(format!(
                "fetch attachment '{}' returned HTTP {}",
                attachment.name, reply.status
            )));
        }
        Ok(reply.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Status;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(server_uri: &str) -> HttpTransport {
        transport_with_timeout(server_uri, Duration::from_secs(5))
    }

    fn transport_with_timeout(server_uri: &str, request_timeout: Duration) -> HttpTransport {
        let limiter = Arc::new(RateLimiter::sliding_window(100, Duration::from_secs(60)).unwrap());
        let throttle = RetryPolicy::new(
            3,
            Backoff::Linear {
                base: Duration::from_millis(5),
                cap: Duration::from_millis(20),
            },
        );
        HttpTransport::new(
            &format!("{}/v1", server_uri),
            "test-key",
            limiter,
            throttle,
            request_timeout,
        )
        .unwrap()
    }

    /// Run blocking client code off the async runtime's worker threads.
    async fn blocking<T, F>(server: &MockServer, f: F) -> T
    where
        F: FnOnce(HttpTransport) -> T + Send + 'static,
        T: Send + 'static,
    {
        let uri = server.uri();
        tokio::task::spawn_blocking(move || f(transport(&uri)))
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_session_sends_prompt_and_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_json(json!({
                "prompt": "plan it",
                "repository_url": "https://github.com/o/r"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "session_id": "devin-123",
                "url": "https://app/sessions/devin-123"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let handle = blocking(&server, |t| {
            t.create_session("plan it", Some("https://github.com/o/r"))
        })
        .await
        .unwrap();

        assert_eq!(handle.id, "devin-123");
        assert_eq!(
            handle.url.as_deref(),
            Some("https://app/sessions/devin-123")
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_session_without_id_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"url": "x"})))
            .mount(&server)
            .await;

        let result = blocking(&server, |t| t.create_session("p", None)).await;
        assert!(matches!(result, Err(RelayError::Transport(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_session_non_2xx_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let err = blocking(&server, |t| t.create_session("p", None))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Transport(_)));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_get_session_state_parses_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/session/devin-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status_enum": "blocked",
                "messages": [{"type": "devin_message", "message": "done"}],
                "structured_output": {"summary": "ok"}
            })))
            .mount(&server)
            .await;

        let session = blocking(&server, |t| t.get_session_state("devin-123"))
            .await
            .unwrap();

        assert_eq!(session.id, "devin-123");
        assert_eq!(session.status, Status::Blocked);
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.structured_output, Some(json!({"summary": "ok"})));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_throttled_request_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/session/s1"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/session/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status_enum": "working"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = blocking(&server, |t| t.get_session_state("s1"))
            .await
            .unwrap();
        assert_eq!(session.status, Status::Working);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_persistent_throttling_surfaces_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/session/s1"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let result = blocking(&server, |t| t.get_session_state("s1")).await;
        assert!(matches!(result, Err(RelayError::RateLimited(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_timed_out_request_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"session_id": "late"}))
                    .set_delay(Duration::from_secs(2)),
            )
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "session_id": "devin-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let uri = server.uri();
        let handle = tokio::task::spawn_blocking(move || {
            transport_with_timeout(&uri, Duration::from_millis(300)).create_session("p", None)
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(handle.id, "devin-2");
    }

    #[test]
    fn test_unreachable_host_surfaces_transport_error_after_retries() {
        // Nothing listens on port 1.
        let t = transport_with_timeout("http://127.0.0.1:1", Duration::from_millis(300));
        let err = t.get_session_state("s1").unwrap_err();
        assert!(matches!(err, RelayError::Transport(_)));
        assert!(err.to_string().contains("get session failed"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_post_message_reports_delivery() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/session/ok/message"))
            .and(body_json(json!({"message": "STOP"})))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/session/busy/message"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let (ok, busy) = blocking(&server, |t| {
            (t.post_message("ok", "STOP"), t.post_message("busy", "STOP"))
        })
        .await;
        assert!(ok);
        assert!(!busy);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fetch_attachment_bytes_and_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/attachments/a1/plan.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"steps":[]}"#))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/attachments/gone/plan.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (found, missing) = blocking(&server, |t| {
            (
                t.fetch_attachment(&Attachment::new("a1", "plan.json")),
                t.fetch_attachment(&Attachment::new("gone", "plan.json")),
            )
        })
        .await;

        assert_eq!(found.unwrap(), br#"{"steps":[]}"#.to_vec());
        assert!(matches!(missing, Err(RelayError::NotFound(_))));
    }

    #[test]
    fn test_endpoint_joins_segments_under_base_path() {
        let t = transport("http://localhost:1");
        assert_eq!(
            t.endpoint(&["session", "abc", "message"]).as_str(),
            "http://localhost:1/v1/session/abc/message"
        );
        assert_eq!(
            t.endpoint(&["attachments", "id 1", "a b.json"]).as_str(),
            "http://localhost:1/v1/attachments/id%201/a%20b.json"
        );
    }

    #[test]
    fn test_invalid_base_url_is_user_error() {
        let limiter = Arc::new(RateLimiter::sliding_window(1, Duration::from_secs(1)).unwrap());
        let result = HttpTransport::new(
            "not a url",
            "k",
            limiter,
            RetryPolicy::new(1, Backoff::Fixed(Duration::ZERO)),
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(RelayError::UserError(_))));
    }
}
