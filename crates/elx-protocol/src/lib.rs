//! Wire-level protocol support for Electrum JSON-RPC clients.
//!
//! The protocol is line-oriented JSON over a persistent TLS stream. One
//! stream carries two traffic classes at once: responses to client-issued
//! requests (correlated by integer id) and unsolicited subscription
//! notifications (a `method` and no id). This crate owns everything below
//! the connection: message shapes ([`jsonrpc`]), newline framing
//! ([`codec`]), classification of inbound documents ([`jsonrpc::classify`]),
//! the error taxonomy ([`error`]), the method-catalogue result types
//! ([`types`]), scripthash derivation ([`scripthash`]), and a list of
//! well-known servers ([`servers`]).
//!
//! The connection runtime lives in `elx-client`.

pub mod codec;
pub mod error;
pub mod jsonrpc;
pub mod scripthash;
pub mod servers;
pub mod types;

pub use codec::LineCodec;
pub use error::{Error, Result};
pub use jsonrpc::{classify, Inbound, Notification, Request, Response, ResponsePayload, RpcError};
