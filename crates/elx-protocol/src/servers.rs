//! Well-known public Electrum servers, as `(host, ssl_port)` pairs.
//!
//! All of these present self-signed certificates, which is why
//! `TlsPolicy::TrustAll` is the default in the client crate.

/// Local ElectrumX, e.g. one backed by a regtest bitcoind.
pub const LOCALHOST: (&str, u16) = ("localhost", 50002);
pub const BLOCKSTREAM: (&str, u16) = ("electrum.blockstream.info", 50002);
pub const EMZY: (&str, u16) = ("electrum.emzy.de", 50002);
pub const CORE_1209K: (&str, u16) = ("electrumx-core.1209k.com", 50002);
pub const ERBIUM: (&str, u16) = ("electrumx.erbium.eu", 50002);
pub const HODLERS_BEER: (&str, u16) = ("hodlers.beer", 50002);
