//! Queued requests and their caller-visible completion handles.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::transport::Payload;

/// A request waiting in (or popped from) the dispatch queue.
pub(crate) struct QueuedRequest {
    /// Path under the configured host, e.g. `/events`
    pub path: String,
    /// JSON-object body; `token` and `ts` are stamped at dispatch time
    pub payload: Payload,
    /// Resolves the caller's [`Completion`]
    pub respond: oneshot::Sender<Result<Value>>,
}

/// The FIFO queue plus the single-flight flag, guarded by one mutex so
/// the busy check and the pop are a single atomic step.
#[derive(Default)]
pub(crate) struct DispatchState {
    pub queue: VecDeque<QueuedRequest>,
    pub busy: bool,
}

/// Caller-visible handle for one queued request.
///
/// Resolves with the response body once the request has been dispatched
/// and answered, or with the failure that ended it. Awaiting is
/// optional; dropping the handle does not cancel the request. If the
/// request itself is discarded before producing an outcome, the handle
/// yields [`Error::Dropped`].
pub struct Completion {
    rx: oneshot::Receiver<Result<Value>>,
}

impl Completion {
    /// Create a pending handle plus the sender that resolves it.
    pub(crate) fn channel() -> (oneshot::Sender<Result<Value>>, Completion) {
        let (tx, rx) = oneshot::channel();
        (tx, Completion { rx })
    }

    /// Create a handle that immediately yields `err`.
    pub(crate) fn rejected(err: Error) -> Completion {
        let (tx, completion) = Completion::channel();
        let _ = tx.send(Err(err));
        completion
    }
}

impl Future for Completion {
    type Output = Result<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::Dropped),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_resolves_with_sent_outcome() {
        let (tx, completion) = Completion::channel();
        tx.send(Ok(json!({ "event_id": 7 }))).expect("receiver alive");

        let body = completion.await.expect("should resolve");
        assert_eq!(body["event_id"], 7);
    }

    #[tokio::test]
    async fn test_rejected_handle_yields_the_error() {
        let completion = Completion::rejected(Error::Config("nope".to_string()));
        let err = completion.await.expect_err("should reject");
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_discarded_request_yields_dropped() {
        let (tx, completion) = Completion::channel();
        drop(tx);

        let err = completion.await.expect_err("should reject");
        assert!(matches!(err, Error::Dropped));
    }
}
