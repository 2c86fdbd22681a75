//! Single-slot notification callbacks.
//!
//! The protocol has two subscription categories: new block headers and
//! scripthash status changes. Each has at most one registered callback at
//! a time; registering again replaces the previous one, unregistering
//! clears the slot. A well-formed notification with no listener is dropped
//! with a warning (there may legitimately be no listener yet), and a
//! malformed payload is reported, never thrown at the reader loop.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use elx_protocol::jsonrpc::Notification;
use elx_protocol::types::{Header, ScripthashStatus};
use elx_protocol::{Error, Result};

/// Callback invoked for each new block header notification.
pub type HeadersCallback = Arc<dyn Fn(Header) + Send + Sync>;
/// Callback invoked for each scripthash status notification.
pub type ScripthashCallback = Arc<dyn Fn(ScripthashStatus) + Send + Sync>;

pub(crate) const HEADERS_METHOD: &str = "blockchain.headers.subscribe";
pub(crate) const SCRIPTHASH_METHOD: &str = "blockchain.scripthash.subscribe";

#[derive(Default)]
pub(crate) struct Listeners {
    headers: Mutex<Option<HeadersCallback>>,
    scripthash: Mutex<Option<ScripthashCallback>>,
}

impl Listeners {
    pub(crate) fn set_headers(&self, callback: HeadersCallback) {
        *self.headers.lock().expect("listener slot poisoned") = Some(callback);
    }

    pub(crate) fn clear_headers(&self) {
        *self.headers.lock().expect("listener slot poisoned") = None;
    }

    pub(crate) fn set_scripthash(&self, callback: ScripthashCallback) {
        *self.scripthash.lock().expect("listener slot poisoned") = Some(callback);
    }

    pub(crate) fn clear_scripthash(&self) {
        *self.scripthash.lock().expect("listener slot poisoned") = None;
    }

    /// Route one notification to its registered slot.
    pub(crate) fn dispatch(&self, notification: Notification) {
        match notification.method.as_str() {
            HEADERS_METHOD => match decode_header(&notification.params) {
                Ok(header) => self.notify_headers(header),
                Err(e) => tracing::warn!(error = %e, "malformed headers notification"),
            },
            SCRIPTHASH_METHOD => match decode_status(&notification.params) {
                Ok(status) => self.notify_scripthash(status),
                Err(e) => tracing::warn!(error = %e, "malformed scripthash notification"),
            },
            other => {
                tracing::warn!(method = other, "dropping notification for unknown method");
            }
        }
    }

    fn notify_headers(&self, header: Header) {
        // Clone the callback out of the lock so user code runs unlocked.
        let callback = self.headers.lock().expect("listener slot poisoned").clone();
        match callback {
            Some(callback) => callback(header),
            None => tracing::warn!("headers notification dropped: no listener registered"),
        }
    }

    fn notify_scripthash(&self, status: ScripthashStatus) {
        let callback = self
            .scripthash
            .lock()
            .expect("listener slot poisoned")
            .clone();
        match callback {
            Some(callback) => callback(status),
            None => tracing::warn!("scripthash notification dropped: no listener registered"),
        }
    }
}

// Headers notifications carry a one-element positional payload holding the
// header object.
fn decode_header(params: &Value) -> Result<Header> {
    let first = params
        .get(0)
        .ok_or_else(|| Error::Protocol(format!("headers notification params: {params}")))?;
    serde_json::from_value(first.clone())
        .map_err(|e| Error::Protocol(format!("header payload: {e}")))
}

// Scripthash notifications carry the two-element positional payload
// directly: [scripthash, status].
fn decode_status(params: &Value) -> Result<ScripthashStatus> {
    serde_json::from_value(params.clone())
        .map_err(|e| Error::Protocol(format!("scripthash payload: {e}")))
}
