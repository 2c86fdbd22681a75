//! Request correlation and the single-reader routing loop.
//!
//! The connection has exactly one consumer of inbound frames: the task
//! spawned by [`spawn_reader`]. It classifies every decoded line and
//! either fulfills the pending call registered under the response's id or
//! hands the notification to the listener slots. Centralizing all reads in
//! one task is what makes the rest of the client race-free: no other code
//! ever touches the read half.
//!
//! ```text
//! caller ──register(id)──► PendingRequests ◄──complete(id)── reader loop
//!    │                                                            ▲
//!    └─────────── write {id, method, params} ──► server ──────────┘
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use futures::stream::SplitStream;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

use elx_protocol::codec::LineCodec;
use elx_protocol::jsonrpc::{Inbound, Response, classify};
use elx_protocol::{Error, Result};

use crate::listeners::Listeners;

/// Completion slot for one in-flight call.
type Waiter = oneshot::Sender<Result<Value>>;

/// Table of in-flight requests keyed by correlation id.
///
/// Callers insert before their request bytes reach the wire; the reader
/// loop removes on the matching response. `HashMap::remove` under the
/// mutex makes fulfillment exactly-once: whichever side removes the entry
/// owns the sender. The mutex is a std mutex and is never held across an
/// await.
pub(crate) struct PendingRequests {
    next_id: AtomicU64,
    waiters: Mutex<HashMap<u64, Waiter>>,
}

impl PendingRequests {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            waiters: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate a fresh correlation id and register its completion slot.
    ///
    /// Registration happens before the request is written, so a response
    /// cannot arrive ahead of its waiter even against a very fast server.
    pub(crate) fn register(&self) -> (u64, oneshot::Receiver<Result<Value>>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.waiters
            .lock()
            .expect("pending table poisoned")
            .insert(id, tx);
        (id, rx)
    }

    /// Drop the slot for `id` without fulfilling it (write failure or a
    /// local timeout). A response arriving later is then reported as
    /// unknown.
    pub(crate) fn discard(&self, id: u64) {
        self.waiters
            .lock()
            .expect("pending table poisoned")
            .remove(&id);
    }

    /// Fulfill the slot matching `response`, if one is registered.
    fn complete(&self, response: Response) {
        let id = response.id;
        let Some(waiter) = self
            .waiters
            .lock()
            .expect("pending table poisoned")
            .remove(&id)
        else {
            tracing::warn!(id, "response for unknown or expired request id");
            return;
        };
        // The receiver may already be gone if the caller timed out between
        // our remove and this send; that is fine, the slot was consumed.
        let _ = waiter.send(response.into_result());
    }

    /// Fail every outstanding call with [`Error::ConnectionClosed`].
    fn drain(&self) {
        let waiters = std::mem::take(&mut *self.waiters.lock().expect("pending table poisoned"));
        if !waiters.is_empty() {
            tracing::debug!(
                count = waiters.len(),
                "failing outstanding requests: connection closed"
            );
        }
        for (_, waiter) in waiters {
            let _ = waiter.send(Err(Error::ConnectionClosed));
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.waiters.lock().expect("pending table poisoned").len()
    }
}

/// Spawn the reader loop for a connection.
///
/// Runs until the server closes the stream, a framing-level desync is
/// detected, or `shutdown` fires. On every exit path it marks the
/// connection closed and drains the pending table; no call is ever left
/// hanging.
pub(crate) fn spawn_reader<S>(
    mut frames: SplitStream<Framed<S, LineCodec>>,
    pending: Arc<PendingRequests>,
    listeners: Arc<Listeners>,
    open: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
) -> JoinHandle<()>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    tracing::debug!("reader loop shutting down");
                    break;
                }
                frame = frames.next() => match frame {
                    Some(Ok(line)) => route_line(&line, &pending, &listeners),
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "fatal transport error, closing connection");
                        break;
                    }
                    None => {
                        tracing::debug!("server closed the stream");
                        break;
                    }
                }
            }
        }
        open.store(false, Ordering::SeqCst);
        pending.drain();
    })
}

/// Classify one wire line and hand it to the pending table or the
/// listener slots.
///
/// Per-line failures are reported and swallowed: a malformed document must
/// never take down the reader loop. Only framing-level errors (handled by
/// the caller) are fatal.
fn route_line(line: &str, pending: &PendingRequests, listeners: &Listeners) {
    let doc: Value = match serde_json::from_str(line) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::warn!(error = %e, line, "discarding line that is not valid JSON");
            return;
        }
    };
    match classify(doc) {
        Ok(Inbound::Response(response)) => pending.complete(response),
        Ok(Inbound::Notification(notification)) => listeners.dispatch(notification),
        Err(e) => tracing::warn!(error = %e, "discarding unclassifiable message"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elx_protocol::jsonrpc::{ResponsePayload, RpcError};
    use serde_json::json;

    fn success(id: u64, result: Value) -> Response {
        Response {
            id,
            payload: ResponsePayload::Success { result },
        }
    }

    #[tokio::test]
    async fn completion_reaches_the_registered_waiter() {
        let pending = PendingRequests::new();
        let (id, rx) = pending.register();
        pending.complete(success(id, json!("header")));
        assert_eq!(rx.await.unwrap().unwrap(), json!("header"));
        assert_eq!(pending.len(), 0);
    }

    #[tokio::test]
    async fn out_of_order_completion_matches_by_id() {
        let pending = PendingRequests::new();
        let (first, rx_first) = pending.register();
        let (second, rx_second) = pending.register();
        assert_ne!(first, second);

        pending.complete(success(second, json!(2)));
        pending.complete(success(first, json!(1)));

        assert_eq!(rx_first.await.unwrap().unwrap(), json!(1));
        assert_eq!(rx_second.await.unwrap().unwrap(), json!(2));
    }

    #[tokio::test]
    async fn error_envelope_becomes_an_rpc_error() {
        let pending = PendingRequests::new();
        let (id, rx) = pending.register();
        pending.complete(Response {
            id,
            payload: ResponsePayload::Error {
                error: RpcError {
                    code: 1,
                    message: "nope".into(),
                },
            },
        });
        assert!(matches!(rx.await.unwrap(), Err(Error::Rpc(_))));
    }

    #[tokio::test]
    async fn unknown_id_is_ignored_without_panicking() {
        let pending = PendingRequests::new();
        let (_id, rx) = pending.register();
        pending.complete(success(9999, json!(null)));
        // The registered waiter is untouched.
        assert_eq!(pending.len(), 1);
        drop(rx);
    }

    #[tokio::test]
    async fn drain_fails_every_outstanding_call_exactly_once() {
        let pending = PendingRequests::new();
        let receivers: Vec<_> = (0..5).map(|_| pending.register().1).collect();
        pending.drain();
        assert_eq!(pending.len(), 0);
        for rx in receivers {
            assert!(matches!(rx.await.unwrap(), Err(Error::ConnectionClosed)));
        }
    }

    #[tokio::test]
    async fn discard_makes_a_late_response_unknown() {
        let pending = PendingRequests::new();
        let (id, rx) = pending.register();
        pending.discard(id);
        drop(rx);
        // Must not panic or fulfill anything.
        pending.complete(success(id, json!(null)));
        assert_eq!(pending.len(), 0);
    }
}
