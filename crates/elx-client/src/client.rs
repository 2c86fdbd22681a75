//! The Electrum client: connection lifecycle, the `call` path, and the
//! typed method surface.
//!
//! One connection owns one background reader task (see
//! [`crate::dispatcher`]) and a write half behind an async mutex so that
//! concurrent callers' request bytes never interleave on the wire. Any
//! number of tasks may invoke [`Client::call`] concurrently; correlation
//! is by id, not arrival order, so out-of-order server replies still reach
//! the right caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, Notify};
use tokio_rustls::client::TlsStream;
use tokio_util::codec::Framed;

use elx_protocol::codec::LineCodec;
use elx_protocol::jsonrpc::Request;
use elx_protocol::types::{
    Balance, FeeHistogramEntry, Header, HeaderWithProof, HeadersChunk, HistoryEntry, MerkleProof,
    Peer, ScripthashStatus, ServerFeatures, ServerVersion, TxIdFromPos, UtxoEntry,
    VerboseTransaction,
};
use elx_protocol::{Error, Result};

use crate::config::ClientConfig;
use crate::dispatcher::{PendingRequests, spawn_reader};
use crate::listeners::Listeners;
use crate::tls;

/// Client name reported to the server in `server.version`.
const CLIENT_NAME: &str = concat!("elx ", env!("CARGO_PKG_VERSION"));
/// Protocol version negotiated in `server.version`.
const PROTOCOL_VERSION: &str = "1.4.2";

/// An open connection to an Electrum server.
///
/// Cheap to share behind an `Arc`; every method takes `&self`. The
/// connection is torn down by [`Client::close`] or by dropping the client.
pub struct Client<S = TlsStream<TcpStream>> {
    writer: Mutex<SplitSink<Framed<S, LineCodec>, Request>>,
    pending: Arc<PendingRequests>,
    listeners: Arc<Listeners>,
    open: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    timeout: Option<Duration>,
}

impl Client {
    /// Open an encrypted connection per `config` and start the reader
    /// loop.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let stream = tls::connect(&config.host, config.port, config.tls).await?;
        tracing::debug!(host = %config.host, port = config.port, "connection established");
        Ok(Self::from_parts(stream, config.timeout))
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    /// Build a client over an already-established duplex stream.
    ///
    /// Tests drive the client over `tokio::io::duplex`; the stream stands
    /// in for the TLS socket.
    pub fn from_stream(stream: S) -> Self {
        Self::from_parts(stream, None)
    }

    fn from_parts(stream: S, timeout: Option<Duration>) -> Self {
        let framed = Framed::new(stream, LineCodec::new());
        let (writer, frames) = framed.split();
        let pending = Arc::new(PendingRequests::new());
        let listeners = Arc::new(Listeners::default());
        let open = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::new(Notify::new());
        let _reader = spawn_reader(
            frames,
            pending.clone(),
            listeners.clone(),
            open.clone(),
            shutdown.clone(),
        );
        Self {
            writer: Mutex::new(writer),
            pending,
            listeners,
            open,
            shutdown,
            timeout,
        }
    }

    /// Set the per-call deadline for subsequent calls.
    pub fn set_call_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Whether the connection is still open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Issue one RPC and decode its result into `T`.
    ///
    /// The completion slot is registered before the request bytes are
    /// written, so a response cannot win the race against registration.
    /// Without a configured timeout this suspends until the server answers
    /// or the connection closes.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        if !self.is_open() {
            return Err(Error::AlreadyClosed);
        }
        let (id, slot) = self.pending.register();
        // Teardown may have completed between the open check and the
        // registration. The reader clears `open` before draining, so a
        // registration that still saw `open == true` is covered by the
        // drain; one that races past it lands here and is backed out.
        if !self.is_open() {
            self.pending.discard(id);
            return Err(Error::ConnectionClosed);
        }
        let request = Request::new(id, method, params);
        tracing::debug!(id, method, "sending request");
        {
            let mut writer = self.writer.lock().await;
            if let Err(e) = writer.send(request).await {
                self.pending.discard(id);
                return if self.is_open() {
                    Err(e)
                } else {
                    Err(Error::ConnectionClosed)
                };
            }
        }
        let outcome = match self.timeout {
            Some(deadline) => match tokio::time::timeout(deadline, slot).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    // Local expiry: unregister so a late response is
                    // reported as unknown; other pending calls and the
                    // reader loop are untouched.
                    self.pending.discard(id);
                    return Err(Error::Timeout);
                }
            },
            None => slot.await,
        };
        // A dropped sender means the reader loop is gone without having
        // drained, which only happens on teardown races.
        let result = outcome.map_err(|_| Error::ConnectionClosed)??;
        serde_json::from_value(result).map_err(|e| {
            Error::Protocol(format!("{method} result did not match the expected shape: {e}"))
        })
    }

    /// Close the connection.
    ///
    /// Safe to call while calls are in flight: every outstanding call is
    /// failed with [`Error::ConnectionClosed`], none hang. Closing an
    /// already-closed connection fails with [`Error::AlreadyClosed`].
    pub async fn close(&self) -> Result<()> {
        if !self.open.swap(false, Ordering::SeqCst) {
            return Err(Error::AlreadyClosed);
        }
        self.shutdown.notify_one();
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.close().await {
            tracing::debug!(error = %e, "error shutting down the write half");
        }
        tracing::debug!("connection closed");
        Ok(())
    }

    // Section notifications

    /// Register the block-headers listener, replacing any previous one.
    ///
    /// The callback runs on the reader task: keep it short and never
    /// panic in it.
    pub fn on_headers(&self, callback: impl Fn(Header) + Send + Sync + 'static) {
        self.listeners.set_headers(Arc::new(callback));
    }

    /// Remove the block-headers listener.
    pub fn clear_headers_listener(&self) {
        self.listeners.clear_headers();
    }

    /// Register the scripthash-status listener, replacing any previous
    /// one. Same contract as [`Client::on_headers`].
    pub fn on_scripthash(&self, callback: impl Fn(ScripthashStatus) + Send + Sync + 'static) {
        self.listeners.set_scripthash(Arc::new(callback));
    }

    /// Remove the scripthash-status listener.
    pub fn clear_scripthash_listener(&self) {
        self.listeners.clear_scripthash();
    }

    // Section requests

    /// `blockchain.block.header` with `cp_height` fixed to 0: the raw
    /// header hex.
    pub async fn block_header(&self, height: u64) -> Result<String> {
        self.call(
            "blockchain.block.header",
            json!({"height": height, "cp_height": 0}),
        )
        .await
    }

    /// `blockchain.block.header` with a checkpoint proof.
    pub async fn block_header_with_proof(
        &self,
        height: u64,
        cp_height: u64,
    ) -> Result<HeaderWithProof> {
        self.call(
            "blockchain.block.header",
            json!({"height": height, "cp_height": cp_height}),
        )
        .await
    }

    /// `blockchain.block.headers`: a chunk of consecutive raw headers.
    pub async fn block_headers(
        &self,
        start_height: u64,
        count: u64,
        cp_height: u64,
    ) -> Result<HeadersChunk> {
        self.call(
            "blockchain.block.headers",
            json!({"start_height": start_height, "count": count, "cp_height": cp_height}),
        )
        .await
    }

    /// `blockchain.estimatefee`: coins per kilobyte to confirm within the
    /// given number of blocks, or -1 if the server has no estimate.
    pub async fn estimate_fee(&self, blocks: u64) -> Result<f64> {
        self.call("blockchain.estimatefee", json!({"number": blocks}))
            .await
    }

    /// `blockchain.relayfee`: the server's minimum relay fee rate.
    pub async fn relay_fee(&self) -> Result<f64> {
        self.call("blockchain.relayfee", json!({})).await
    }

    /// `blockchain.headers.subscribe`: subscribe to new headers; returns
    /// the current tip. Pushes arrive on the listener registered with
    /// [`Client::on_headers`].
    pub async fn headers_subscribe(&self) -> Result<Header> {
        self.call("blockchain.headers.subscribe", json!({})).await
    }

    /// `blockchain.scripthash.get_balance`.
    pub async fn scripthash_balance(&self, scripthash: &str) -> Result<Balance> {
        self.call(
            "blockchain.scripthash.get_balance",
            json!({"scripthash": scripthash}),
        )
        .await
    }

    /// `blockchain.scripthash.get_history`: confirmed history, oldest
    /// first, then mempool.
    pub async fn scripthash_history(&self, scripthash: &str) -> Result<Vec<HistoryEntry>> {
        self.call(
            "blockchain.scripthash.get_history",
            json!({"scripthash": scripthash}),
        )
        .await
    }

    /// `blockchain.scripthash.get_mempool`.
    pub async fn scripthash_mempool(&self, scripthash: &str) -> Result<Vec<HistoryEntry>> {
        self.call(
            "blockchain.scripthash.get_mempool",
            json!({"scripthash": scripthash}),
        )
        .await
    }

    /// `blockchain.scripthash.listunspent`.
    pub async fn scripthash_list_unspent(&self, scripthash: &str) -> Result<Vec<UtxoEntry>> {
        self.call(
            "blockchain.scripthash.listunspent",
            json!({"scripthash": scripthash}),
        )
        .await
    }

    /// `blockchain.scripthash.subscribe`: subscribe to status changes;
    /// returns the current status digest, or `None` for a script with no
    /// history. Pushes arrive on the listener registered with
    /// [`Client::on_scripthash`].
    pub async fn scripthash_subscribe(&self, scripthash: &str) -> Result<Option<String>> {
        self.call(
            "blockchain.scripthash.subscribe",
            json!({"scripthash": scripthash}),
        )
        .await
    }

    /// `blockchain.scripthash.unsubscribe`: returns whether the
    /// subscription existed.
    pub async fn scripthash_unsubscribe(&self, scripthash: &str) -> Result<bool> {
        self.call(
            "blockchain.scripthash.unsubscribe",
            json!({"scripthash": scripthash}),
        )
        .await
    }

    /// `blockchain.transaction.broadcast`: returns the transaction hash.
    pub async fn transaction_broadcast(&self, raw_tx: &str) -> Result<String> {
        self.call(
            "blockchain.transaction.broadcast",
            json!({"raw_tx": raw_tx}),
        )
        .await
    }

    /// `blockchain.transaction.get`: the raw transaction, hex encoded.
    pub async fn transaction_get(&self, tx_hash: &str) -> Result<String> {
        self.call(
            "blockchain.transaction.get",
            json!({"tx_hash": tx_hash, "verbose": false}),
        )
        .await
    }

    /// `blockchain.transaction.get` with `verbose`: the decoded
    /// transaction.
    pub async fn transaction_get_verbose(&self, tx_hash: &str) -> Result<VerboseTransaction> {
        self.call(
            "blockchain.transaction.get",
            json!({"tx_hash": tx_hash, "verbose": true}),
        )
        .await
    }

    /// `blockchain.transaction.get_merkle`: inclusion proof for a
    /// confirmed transaction.
    pub async fn transaction_merkle(&self, tx_hash: &str, height: u64) -> Result<MerkleProof> {
        self.call(
            "blockchain.transaction.get_merkle",
            json!({"tx_hash": tx_hash, "height": height}),
        )
        .await
    }

    /// `blockchain.transaction.id_from_pos` without a proof.
    pub async fn transaction_id_from_pos(&self, height: u64, tx_pos: u64) -> Result<String> {
        self.call(
            "blockchain.transaction.id_from_pos",
            json!({"height": height, "tx_pos": tx_pos, "merkle": false}),
        )
        .await
    }

    /// `blockchain.transaction.id_from_pos` with a merkle proof.
    pub async fn transaction_id_from_pos_with_merkle(
        &self,
        height: u64,
        tx_pos: u64,
    ) -> Result<TxIdFromPos> {
        self.call(
            "blockchain.transaction.id_from_pos",
            json!({"height": height, "tx_pos": tx_pos, "merkle": true}),
        )
        .await
    }

    /// `mempool.get_fee_histogram`.
    pub async fn fee_histogram(&self) -> Result<Vec<FeeHistogramEntry>> {
        self.call("mempool.get_fee_histogram", json!({})).await
    }

    /// `server.banner`.
    pub async fn banner(&self) -> Result<String> {
        self.call("server.banner", json!({})).await
    }

    /// `server.donation_address`.
    pub async fn donation_address(&self) -> Result<String> {
        self.call("server.donation_address", json!({})).await
    }

    /// `server.features`.
    pub async fn server_features(&self) -> Result<ServerFeatures> {
        self.call("server.features", json!({})).await
    }

    /// `server.peers.subscribe`: the server's peer list (a plain request
    /// despite the name; servers send no peer notifications).
    pub async fn server_peers(&self) -> Result<Vec<Peer>> {
        self.call("server.peers.subscribe", json!({})).await
    }

    /// `server.ping`: keeps the connection alive.
    pub async fn ping(&self) -> Result<()> {
        let _: Value = self.call("server.ping", json!({})).await?;
        Ok(())
    }

    /// `server.version`: identify ourselves and negotiate the protocol
    /// version. Servers expect this first on a fresh connection.
    pub async fn server_version(&self) -> Result<ServerVersion> {
        self.call(
            "server.version",
            json!({"client_name": CLIENT_NAME, "protocol_version": PROTOCOL_VERSION}),
        )
        .await
    }
}

impl<S> Drop for Client<S> {
    fn drop(&mut self) {
        // Stop the reader task if the caller never closed explicitly; the
        // task drains any remaining pending calls on its way out.
        self.open.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
    }
}

impl<S> std::fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("open", &self.open.load(Ordering::SeqCst))
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
