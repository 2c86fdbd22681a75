//! Result shapes for the Electrum 1.4 method catalogue.
//!
//! These are pure data-transfer types: field names follow the wire, with
//! `#[serde(rename)]` where the wire name is not idiomatic Rust. Methods
//! whose results are positional arrays (`server.version`, the fee
//! histogram, peers, scripthash status pushes) deserialize through a tuple
//! and convert.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A block header, as returned by `blockchain.headers.subscribe` and
/// carried in headers notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Height of the block.
    pub height: u64,
    /// Raw serialized header, hex encoded.
    pub hex: String,
}

/// `blockchain.block.header` result when a checkpoint proof was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderWithProof {
    /// Raw serialized header, hex encoded.
    pub header: String,
    /// Merkle branch connecting the header to the checkpoint root.
    pub branch: Vec<String>,
    /// Checkpoint merkle root.
    pub root: String,
}

/// `blockchain.block.headers` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadersChunk {
    /// Number of headers returned.
    pub count: u64,
    /// Concatenated raw headers, hex encoded.
    pub hex: String,
    /// Maximum chunk size the server will return.
    pub max: u64,
    /// Checkpoint branch, present only when `cp_height` was supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<Vec<String>>,
    /// Checkpoint root, present only when `cp_height` was supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

/// `blockchain.scripthash.get_balance` result, in satoshis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Confirmed balance.
    pub confirmed: i64,
    /// Unconfirmed delta; negative when mempool transactions spend from
    /// the script.
    pub unconfirmed: i64,
}

/// One entry of a `get_history` or `get_mempool` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Confirmation height; `0` for mempool, `-1` for mempool with
    /// unconfirmed parents.
    pub height: i64,
    /// Transaction hash, hex encoded.
    pub tx_hash: String,
    /// Fee in satoshis; only present for mempool entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<u64>,
}

/// One entry of a `blockchain.scripthash.listunspent` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoEntry {
    /// Output index within the funding transaction.
    pub tx_pos: u64,
    /// Output value in satoshis.
    pub value: u64,
    /// Funding transaction hash, hex encoded.
    pub tx_hash: String,
    /// Confirmation height, `0` for mempool.
    pub height: u64,
}

/// Scripthash status push payload: positional `[scripthash, status]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, Option<String>)", into = "(String, Option<String>)")]
pub struct ScripthashStatus {
    /// The subscribed scripthash.
    pub scripthash: String,
    /// Status digest, or `None` when the script has no history.
    pub status: Option<String>,
}

impl From<(String, Option<String>)> for ScripthashStatus {
    fn from((scripthash, status): (String, Option<String>)) -> Self {
        Self { scripthash, status }
    }
}

impl From<ScripthashStatus> for (String, Option<String>) {
    fn from(status: ScripthashStatus) -> Self {
        (status.scripthash, status.status)
    }
}

/// One bucket of the `mempool.get_fee_histogram` result: `[fee, vsize]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(u64, u64)", into = "(u64, u64)")]
pub struct FeeHistogramEntry {
    /// Fee rate in satoshis per virtual byte.
    pub fee: u64,
    /// Cumulative virtual size of mempool transactions paying at least
    /// this rate.
    pub vsize: u64,
}

impl From<(u64, u64)> for FeeHistogramEntry {
    fn from((fee, vsize): (u64, u64)) -> Self {
        Self { fee, vsize }
    }
}

impl From<FeeHistogramEntry> for (u64, u64) {
    fn from(entry: FeeHistogramEntry) -> Self {
        (entry.fee, entry.vsize)
    }
}

/// `blockchain.transaction.get_merkle` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Height of the block containing the transaction.
    pub block_height: u64,
    /// Merkle branch, leaf to root.
    pub merkle: Vec<String>,
    /// Position of the transaction within the block.
    pub pos: u64,
}

/// `blockchain.transaction.id_from_pos` result when a proof was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIdFromPos {
    /// Transaction hash at the requested position.
    pub tx_hash: String,
    /// Merkle branch proving the position.
    pub merkle: Vec<String>,
}

/// `server.version` result: positional `[software, protocol]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct ServerVersion {
    /// Server software identification, e.g. `ElectrumX 1.16.0`.
    pub software: String,
    /// Negotiated protocol version, e.g. `1.4.2`.
    pub protocol: String,
}

impl From<(String, String)> for ServerVersion {
    fn from((software, protocol): (String, String)) -> Self {
        Self { software, protocol }
    }
}

impl From<ServerVersion> for (String, String) {
    fn from(version: ServerVersion) -> Self {
        (version.software, version.protocol)
    }
}

/// `server.features` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerFeatures {
    /// Hostnames the server is reachable at, mapped to their port table.
    pub hosts: HashMap<String, HashMap<String, Option<u16>>>,
    /// Pruning horizon in blocks, or `None` for an unpruned server.
    #[serde(default)]
    pub pruning: Option<u64>,
    /// Server software identification.
    pub server_version: String,
    /// Oldest protocol version the server speaks.
    pub protocol_min: String,
    /// Newest protocol version the server speaks.
    pub protocol_max: String,
    /// Genesis block hash of the served chain.
    pub genesis_hash: String,
    /// Hash function used for scripthashes; always `sha256` today.
    pub hash_function: String,
    /// Optional extra service URLs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<String>>,
}

/// One entry of a `server.peers.subscribe` result:
/// positional `[ip, hostname, features]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "(String, String, Vec<String>)",
    into = "(String, String, Vec<String>)"
)]
pub struct Peer {
    /// Peer IP address.
    pub ip: String,
    /// Peer hostname.
    pub hostname: String,
    /// Feature strings, e.g. `v1.4` or `s50002`.
    pub features: Vec<String>,
}

impl From<(String, String, Vec<String>)> for Peer {
    fn from((ip, hostname, features): (String, String, Vec<String>)) -> Self {
        Self {
            ip,
            hostname,
            features,
        }
    }
}

impl From<Peer> for (String, String, Vec<String>) {
    fn from(peer: Peer) -> Self {
        (peer.ip, peer.hostname, peer.features)
    }
}

/// `blockchain.transaction.get` result with `verbose` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerboseTransaction {
    /// Hash of the containing block; absent for mempool transactions.
    #[serde(rename = "blockhash", default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<String>,
    /// Timestamp of the containing block.
    #[serde(rename = "blocktime", default, skip_serializing_if = "Option::is_none")]
    pub block_time: Option<u64>,
    /// Confirmation count; absent for mempool transactions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,
    /// Witness transaction hash.
    pub hash: String,
    /// Raw transaction, hex encoded.
    pub hex: String,
    /// Transaction lock time.
    pub locktime: u64,
    /// Serialized size in bytes.
    pub size: u64,
    /// Virtual size in vbytes.
    #[serde(default)]
    pub vsize: Option<u64>,
    /// Weight units.
    #[serde(default)]
    pub weight: Option<u64>,
    /// Block timestamp, when confirmed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
    /// Transaction id.
    #[serde(rename = "txid")]
    pub tx_id: String,
    /// Transaction version.
    pub version: u32,
    /// Inputs.
    #[serde(rename = "vin")]
    pub inputs: Vec<TxInput>,
    /// Outputs.
    #[serde(rename = "vout")]
    pub outputs: Vec<TxOutput>,
}

/// One input of a verbose transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxInput {
    /// Coinbase script, only present on coinbase inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coinbase: Option<String>,
    /// Unlocking script, absent on coinbase inputs.
    #[serde(rename = "scriptSig", default, skip_serializing_if = "Option::is_none")]
    pub script_sig: Option<ScriptSig>,
    /// Input sequence number.
    pub sequence: u64,
    /// Funding transaction id, absent on coinbase inputs.
    #[serde(rename = "txid", default, skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
    /// Funding output index, absent on coinbase inputs.
    #[serde(rename = "vout", default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    /// Segwit witness items.
    #[serde(
        rename = "txinwitness",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub witness: Option<Vec<String>>,
}

/// Unlocking script of a transaction input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptSig {
    /// Disassembled script.
    pub asm: String,
    /// Raw script, hex encoded.
    pub hex: String,
}

/// One output of a verbose transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxOutput {
    /// Output index.
    pub n: u32,
    /// Locking script.
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKey,
    /// Output value in whole coins.
    pub value: f64,
}

/// Locking script of a transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptPubKey {
    /// Disassembled script.
    pub asm: String,
    /// Raw script, hex encoded.
    pub hex: String,
    /// Required signature count, for standard multisig scripts.
    #[serde(rename = "reqSigs", default, skip_serializing_if = "Option::is_none")]
    pub req_sigs: Option<u32>,
    /// Script template name, e.g. `pubkeyhash`.
    #[serde(rename = "type")]
    pub script_type: String,
    /// Addresses encoded by the script, when the template has any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Vec<String>>,
}
