//! JSON-RPC wire messages and inbound classification.
//!
//! The Electrum wire protocol multiplexes two traffic classes on one
//! stream: responses to client-issued requests, and unsolicited
//! subscription notifications. The discriminant is the correlation id:
//! a document carrying an integer `id` is a response to one of our
//! requests (even if a `method` field is also present), while a document
//! carrying a `method` and no id is a push notification. Anything else is
//! a protocol violation and is surfaced, never silently dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// An outgoing request: `{"id": <int>, "method": "<name>", "params": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Client-assigned correlation id, unique per connection.
    pub id: u64,
    /// Method name, e.g. `blockchain.scripthash.get_balance`.
    pub method: String,
    /// Positional or keyed parameters.
    pub params: Value,
}

impl Request {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }
}

/// Response payload: result XOR error, enforced by the type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    /// Successful response carrying a result (possibly `null`).
    Success {
        /// Decoded result value.
        result: Value,
    },
    /// Server-reported application error.
    Error {
        /// The error envelope.
        error: RpcError,
    },
}

/// An inbound response: `{"id": <int>, "result": ...}` or
/// `{"id": <int>, "error": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Correlation id of the request this answers.
    pub id: u64,
    /// Result or error, never both, never neither.
    #[serde(flatten)]
    pub payload: ResponsePayload,
}

impl Response {
    /// Collapse the payload into a `Result`, mapping the error envelope to
    /// [`Error::Rpc`].
    pub fn into_result(self) -> Result<Value> {
        match self.payload {
            ResponsePayload::Success { result } => Ok(result),
            ResponsePayload::Error { error } => Err(Error::Rpc(error)),
        }
    }
}

/// Server-reported error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
}

/// An unsolicited push: `{"method": "<name>", "params": [...]}`, no id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Subscription method this push belongs to.
    pub method: String,
    /// Positional payload.
    #[serde(default)]
    pub params: Value,
}

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Answer to a request we issued.
    Response(Response),
    /// Push for a subscription we registered.
    Notification(Notification),
}

/// Classify a decoded wire document.
///
/// Integer id presence wins: a document with both `id` and `method` is a
/// response. A document with a `method` and no id is a notification.
/// Everything else (non-objects, null or non-integer ids, objects with
/// neither field) is [`Error::Protocol`] carrying the raw document.
pub fn classify(doc: Value) -> Result<Inbound> {
    enum Kind {
        Response,
        Notification,
        NonIntegerId,
        Unknown,
    }
    let kind = match doc.as_object() {
        Some(object) => match object.get("id") {
            Some(id) if id.is_u64() => Kind::Response,
            Some(_) => Kind::NonIntegerId,
            None if object.contains_key("method") => Kind::Notification,
            None => Kind::Unknown,
        },
        None => {
            return Err(Error::Protocol(format!("expected an object, got: {doc}")));
        }
    };
    match kind {
        Kind::Response => match serde_json::from_value::<Response>(doc) {
            Ok(response) => Ok(Inbound::Response(response)),
            Err(e) => Err(Error::Protocol(format!("malformed response: {e}"))),
        },
        Kind::Notification => match serde_json::from_value::<Notification>(doc) {
            Ok(notification) => Ok(Inbound::Notification(notification)),
            Err(e) => Err(Error::Protocol(format!("malformed notification: {e}"))),
        },
        Kind::NonIntegerId => Err(Error::Protocol(format!(
            "non-integer correlation id in: {doc}"
        ))),
        Kind::Unknown => Err(Error::Protocol(format!("unclassifiable message: {doc}"))),
    }
}
