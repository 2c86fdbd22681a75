//! Async client for the Electrum blockchain-indexing protocol.
//!
//! The protocol runs newline-delimited JSON-RPC over one persistent TLS
//! stream that carries both request/response traffic and unsolicited
//! subscription pushes. This crate demultiplexes that stream: a single
//! background reader task correlates responses to callers by id and routes
//! notifications to registered listeners, while any number of tasks issue
//! requests concurrently.
//!
//! # Example
//!
//! ```no_run
//! use elx_client::{Client, ClientConfig};
//! use elx_protocol::scripthash::scripthash;
//!
//! # async fn run() -> elx_protocol::Result<()> {
//! let client = Client::connect(ClientConfig::new("electrum.blockstream.info", 50002)).await?;
//! let version = client.server_version().await?;
//! println!("connected to {}", version.software);
//!
//! let script = hex::decode("76a91462e907b15cbf27d5425399ebf6f0fb50ebb88f1888ac").unwrap();
//! let balance = client.scripthash_balance(&scripthash(&script)).await?;
//! println!("confirmed: {} sat", balance.confirmed);
//!
//! client.on_headers(|header| println!("new tip at height {}", header.height));
//! client.headers_subscribe().await?;
//!
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
mod dispatcher;
mod listeners;
pub mod tls;

pub use client::Client;
pub use config::ClientConfig;
pub use listeners::{HeadersCallback, ScripthashCallback};
pub use tls::TlsPolicy;

pub use elx_protocol as protocol;
pub use elx_protocol::{Error, Result};
