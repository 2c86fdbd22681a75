//! Electrum scripthash derivation.
//!
//! Servers index scripts by the SHA-256 of the serialized output script,
//! byte-reversed and hex encoded. Turning an address into its output
//! script is a wallet concern and stays outside this crate; callers hand
//! in the script bytes.

use sha2::{Digest, Sha256};

/// Derive the scripthash for a serialized output script.
///
/// ```
/// let script = hex::decode("76a91462e907b15cbf27d5425399ebf6f0fb50ebb88f1888ac").unwrap();
/// assert_eq!(
///     elx_protocol::scripthash::scripthash(&script),
///     "8b01df4e368ea28f8dc0423bcf7a4923e3a12d307c875e47a0cfbf90b5c39161"
/// );
/// ```
pub fn scripthash(script: &[u8]) -> String {
    let mut digest: [u8; 32] = Sha256::digest(script).into();
    digest.reverse();
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    // The documented protocol example: the P2PKH output script of the
    // genesis address 1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa.
    #[test]
    fn genesis_address_script_vector() {
        let script = hex::decode("76a91462e907b15cbf27d5425399ebf6f0fb50ebb88f1888ac").unwrap();
        assert_eq!(
            scripthash(&script),
            "8b01df4e368ea28f8dc0423bcf7a4923e3a12d307c875e47a0cfbf90b5c39161"
        );
    }

    #[test]
    fn empty_script_still_hashes() {
        // sha256("") reversed.
        assert_eq!(
            scripthash(&[]),
            "55b852781b9995a44c939b64e441ae2724b96f99c8f4fb9a141cfc9842c4b0e3"
        );
    }
}
