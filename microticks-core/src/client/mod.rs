//! Request queue, drainer and session controller for the Microticks API.
//!
//! ## Architecture
//!
//! All outbound traffic funnels through one FIFO queue with at most one
//! request in flight. A drain step pops the queue head under lock,
//! stamps the current session token and a timestamp onto the payload,
//! and hands it to the transport. Completion clears the busy flag,
//! yields one scheduler turn so completion watchers run, then drains
//! again.
//!
//! Sessions start lazily before the first event. Because the token is
//! stamped at dispatch time rather than enqueue time, events queued
//! behind a pending session start still go out with the token: FIFO
//! order puts the start request in front of them, and its watcher has
//! applied the token by the time they dispatch.

mod queue;
mod session;

pub use queue::Completion;
pub use session::{SessionPhase, DUMMY_TOKEN};

use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::{TrackerConfig, DUMMY_HOST};
use crate::error::{Error, Result};
use crate::transport::{DummyTransport, HttpTransport, Payload, Transport};
use crate::url;

use queue::{DispatchState, QueuedRequest};
use session::SessionState;

/// Event-tracking client for a Microticks server.
///
/// Cheap to clone; clones share one queue and one session. Separate
/// [`Client`] values share nothing.
///
/// Requests dispatch strictly in enqueue order with at most one in
/// flight. There is no cancellation and no transport timeout: a hung
/// request holds the queue until its transport call returns. Dropping
/// the client does not cancel queued requests; an in-flight dispatch
/// chain keeps draining until the queue is empty.
///
/// Methods that enqueue must be called from within a Tokio runtime.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    host: String,
    consumer_key: String,
    debug: bool,
    transport: Box<dyn Transport>,
    dispatch: Mutex<DispatchState>,
    session: Mutex<SessionState>,
}

impl Client {
    /// Create a client from tracker configuration.
    ///
    /// Validates the configuration and selects the HTTP transport, or
    /// the offline [`DummyTransport`] when `host` is
    /// [`DUMMY_HOST`](crate::config::DUMMY_HOST).
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;

        let transport: Box<dyn Transport> = if config.is_dummy() {
            Box::new(DummyTransport)
        } else {
            Box::new(HttpTransport::new())
        };

        Ok(Self::with_transport(config, transport))
    }

    /// Create a client over a caller-supplied transport.
    ///
    /// This is the seam for tests and custom transports; the
    /// configuration is not validated here.
    pub fn with_transport(config: TrackerConfig, transport: Box<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                host: config.host,
                consumer_key: config.consumer_key,
                debug: config.debug,
                transport,
                dispatch: Mutex::new(DispatchState::default()),
                session: Mutex::new(SessionState::default()),
            }),
        }
    }

    /// Append a raw request to the queue tail and attempt a drain.
    ///
    /// `token` and `ts` are stamped onto `payload` at dispatch time,
    /// not now. Returns immediately with the completion handle.
    pub fn enqueue(&self, path: &str, payload: Payload) -> Completion {
        self.inner.enqueue(path, payload)
    }

    /// Register an event.
    ///
    /// Starts a session first when none is active or starting. The
    /// event is queued immediately either way and never waits for the
    /// session start to finish. `data` that fails to serialize rejects
    /// the returned handle without queueing anything.
    pub fn track_event<T>(&self, action: &str, data: &T) -> Completion
    where
        T: Serialize + ?Sized,
    {
        let encoded = match serde_json::to_string(data) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(action, error = %err, "Dropping event with unserializable data");
                return Completion::rejected(Error::Json(err));
            }
        };

        self.inner.ensure_session();

        let mut payload = Payload::new();
        payload.insert("action".to_string(), Value::String(action.to_string()));
        payload.insert("data".to_string(), Value::String(encoded));
        payload.insert(
            "consumer_key".to_string(),
            Value::String(self.inner.consumer_key.clone()),
        );
        self.inner.enqueue("/events", payload)
    }

    /// Start a session unless one is already active or starting.
    ///
    /// Fire-and-forget: the token is applied by a background watcher
    /// when the start request completes, and every request dispatched
    /// after that point carries it automatically.
    pub fn ensure_session(&self) {
        self.inner.ensure_session();
    }

    /// Stop the current session.
    ///
    /// Returns `None` without side effects when no session is active or
    /// starting. Otherwise queues a diagnostic `stopSession` event
    /// carrying `reason`, then the stop request itself, and returns a
    /// handle that resolves once the stop request completed and the
    /// client-side token was cleared. The token clears on success and
    /// on failure alike.
    pub fn stop_session(&self, reason: &str) -> Option<Completion> {
        self.inner.stop_session(reason)
    }

    /// Current lifecycle phase of the session.
    pub fn session_phase(&self) -> SessionPhase {
        self.inner.session.lock().unwrap().phase()
    }

    /// Current session token, if any.
    pub fn session_token(&self) -> Option<String> {
        self.inner
            .session
            .lock()
            .unwrap()
            .token()
            .map(str::to_string)
    }

    /// True while a dispatched request awaits its transport outcome.
    pub fn is_busy(&self) -> bool {
        self.inner.dispatch.lock().unwrap().busy
    }

    /// Number of requests queued behind the one in flight.
    pub fn pending_count(&self) -> usize {
        self.inner.dispatch.lock().unwrap().queue.len()
    }
}

impl Inner {
    fn is_dummy(&self) -> bool {
        self.host == DUMMY_HOST
    }

    fn enqueue(self: &Arc<Self>, path: &str, payload: Payload) -> Completion {
        let (respond, completion) = Completion::channel();
        {
            let mut dispatch = self.dispatch.lock().unwrap();
            dispatch.queue.push_back(QueuedRequest {
                path: path.to_string(),
                payload,
                respond,
            });
        }
        self.drain();
        completion
    }

    /// One drain step: dispatch the queue head unless a request is
    /// already in flight or the queue is empty. Callable at any time;
    /// a superfluous call is a no-op.
    fn drain(self: &Arc<Self>) {
        let job = {
            let mut dispatch = self.dispatch.lock().unwrap();
            if dispatch.busy {
                return;
            }
            let Some(job) = dispatch.queue.pop_front() else {
                return;
            };
            dispatch.busy = true;
            job
        };

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            inner.dispatch_job(job).await;
        });
    }

    /// Send one popped request through the transport, resolve its
    /// handle, then hand control back to the queue.
    async fn dispatch_job(self: Arc<Self>, mut job: QueuedRequest) {
        // Token propagation is "latest known": whatever the session
        // holds at dispatch time, not at enqueue time.
        let token = {
            let session = self.session.lock().unwrap();
            session
                .token()
                .map(|token| Value::String(token.to_string()))
                .unwrap_or(Value::Null)
        };
        job.payload.insert("token".to_string(), token);
        job.payload.insert(
            "ts".to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );

        let url = url::join(&self.host, &job.path);
        if self.debug {
            // A `Value::` path inside the macro collides with tracing's
            // own `Value` trait; bind first.
            let rendered = Value::Object(job.payload.clone());
            debug!(%url, payload = %rendered, "POST");
        }

        match self.transport.send(url.clone(), job.payload).await {
            Ok(body) => {
                // Receiver may be gone for fire-and-forget callers
                let _ = job.respond.send(Ok(body));
            }
            Err(failure) => {
                error!(
                    %url,
                    status = failure.status,
                    status_text = %failure.status_text,
                    body = %failure.body,
                    "Request failed"
                );
                let _ = job.respond.send(Err(Error::Transport(failure)));
                // The failed request may have been the session start
                self.session.lock().unwrap().abort_start();
            }
        }

        self.dispatch.lock().unwrap().busy = false;
        // Defer one scheduler turn so completion watchers (session
        // token updates, caller continuations) run before the next
        // request is stamped and dispatched.
        tokio::task::yield_now().await;
        self.drain();
    }

    fn ensure_session(self: &Arc<Self>) {
        if self.is_dummy() {
            let mut session = self.session.lock().unwrap();
            if session.phase() != SessionPhase::Active {
                session.complete_start(DUMMY_TOKEN.to_string());
                debug!("Dummy session started");
            }
            return;
        }

        if !self.session.lock().unwrap().begin_start() {
            return;
        }

        let mut payload = Payload::new();
        payload.insert(
            "consumer_key".to_string(),
            Value::String(self.consumer_key.clone()),
        );
        let completion = self.enqueue("/sessions", payload);

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            match completion.await {
                Ok(body) => match body.get("token").and_then(Value::as_str) {
                    Some(token) => {
                        inner
                            .session
                            .lock()
                            .unwrap()
                            .complete_start(token.to_string());
                        debug!(token, "Session started");
                    }
                    None => {
                        warn!("Session start response carried no token");
                        inner.session.lock().unwrap().abort_start();
                    }
                },
                // Dispatch failure already disarmed the start guard
                // and logged the cause
                Err(_) => {}
            }
        });
    }

    fn stop_session(self: &Arc<Self>, reason: &str) -> Option<Completion> {
        {
            let session = self.session.lock().unwrap();
            if session.phase() == SessionPhase::NoSession {
                debug!("stop_session without a session is a no-op");
                return None;
            }
        }

        // Diagnostic event first, then the stop itself; FIFO keeps
        // them in that order on the wire.
        let data = serde_json::json!({ "reason": reason }).to_string();
        let mut event = Payload::new();
        event.insert(
            "action".to_string(),
            Value::String("stopSession".to_string()),
        );
        event.insert("data".to_string(), Value::String(data));
        event.insert(
            "consumer_key".to_string(),
            Value::String(self.consumer_key.clone()),
        );
        let _ = self.enqueue("/events", event);

        let completion = self.enqueue("/sessions/stop", Payload::new());

        let (respond, forwarded) = Completion::channel();
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = completion.await;
            inner.session.lock().unwrap().clear();
            if outcome.is_ok() {
                debug!("Session stopped");
            }
            let _ = respond.send(outcome);
        });

        Some(forwarded)
    }
}
