use crate::error::{RelayError, Result};
use crate::session::{Attachment, Message, MessageKind, Session, Status};
use crate::transport::{SessionHandle, Transport};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// One scripted reply to `get_session_state`.
#[derive(Clone)]
pub(crate) enum Step {
    State(Session),
    Fail(String),
}

/// In-memory transport driven by a script.
///
/// `get_session_state` pops the next step; once the script is down to its last
/// step, that step repeats forever.
pub(crate) struct FakeTransport {
    steps: Mutex<VecDeque<Step>>,
    attachments: Mutex<HashMap<String, Vec<u8>>>,
    post_results: Mutex<VecDeque<bool>>,
    default_post: bool,
    pub(crate) posted: Mutex<Vec<(String, String)>>,
    pub(crate) created: Mutex<Vec<(String, Option<String>)>>,
    pub(crate) create_calls: AtomicUsize,
    pub(crate) state_calls: AtomicUsize,
    pub(crate) fetch_calls: AtomicUsize,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            attachments: Mutex::new(HashMap::new()),
            post_results: Mutex::new(VecDeque::new()),
            default_post: true,
            posted: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            create_calls: AtomicUsize::new(0),
            state_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn then(self, session: Session) -> Self {
        lock(&self.steps).push_back(Step::State(session));
        self
    }

    pub(crate) fn then_fail(self, message: &str) -> Self {
        lock(&self.steps).push_back(Step::Fail(message.to_string()));
        self
    }

    pub(crate) fn with_attachment(self, id: &str, body: &str) -> Self {
        lock(&self.attachments).insert(id.to_string(), body.as_bytes().to_vec());
        self
    }

    /// Results for successive `post_message` calls; afterwards `default`.
    pub(crate) fn with_post_results(mut self, results: &[bool], default: bool) -> Self {
        lock(&self.post_results).extend(results.iter().copied());
        self.default_post = default;
        self
    }

    pub(crate) fn state_calls(&self) -> usize {
        self.state_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn posted_count(&self) -> usize {
        lock(&self.posted).len()
    }
}

impl Transport for FakeTransport {
    fn create_session(&self, prompt: &str, repository: Option<&str>) -> Result<SessionHandle> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        lock(&self.created).push((prompt.to_string(), repository.map(str::to_string)));
        Ok(SessionHandle {
            id: format!("fake-{}", n),
            url: None,
        })
    }

    fn get_session_state(&self, session_id: &str) -> Result<Session> {
        self.state_calls.fetch_add(1, Ordering::SeqCst);
        let step = {
            let mut steps = lock(&self.steps);
            if steps.len() > 1 {
                steps.pop_front()
            } else {
                steps.front().cloned()
            }
        };
        match step {
            Some(Step::State(mut session)) => {
                session.id = session_id.to_string();
                Ok(session)
            }
            Some(Step::Fail(message)) => Err(RelayError::Transport(message)),
            None => Err(RelayError::Transport("no scripted state".to_string())),
        }
    }

    fn post_message(&self, session_id: &str, text: &str) -> bool {
        lock(&self.posted).push((session_id.to_string(), text.to_string()));
        lock(&self.post_results)
            .pop_front()
            .unwrap_or(self.default_post)
    }

    fn fetch_attachment(&self, attachment: &Attachment) -> Result<Vec<u8>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.attachments)
            .get(&attachment.id)
            .cloned()
            .ok_or_else(|| RelayError::NotFound(format!("attachment {}", attachment.id)))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}

pub(crate) fn session(status: Status) -> Session {
    Session::new("s", status)
}

pub(crate) fn with_messages(mut session: Session, messages: &[(MessageKind, &str)]) -> Session {
    session.messages = messages
        .iter()
        .enumerate()
        .map(|(index, (kind, content))| Message {
            kind: kind.clone(),
            content: content.to_string(),
            index,
        })
        .collect();
    session
}

pub(crate) fn agent(content: &str) -> (MessageKind, &str) {
    (MessageKind::Agent, content)
}
