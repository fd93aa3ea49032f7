//! BIP-340 Tagged Hashes
//!
//! Taproot signing on the device is plain pass-through, so the only Schnorr
//! piece the host needs is the tagged hash used by the BIP341/342 signature
//! message and tapleaf hashing.
//!
//! Reference: https://github.com/bitcoin/bips/blob/master/bip-0340.mediawiki

use sha2::{Digest, Sha256};

/// BIP-340 tagged hash
///
/// tagged_hash(tag, msg) = SHA256(SHA256(tag) || SHA256(tag) || msg)
pub fn tagged_hash(tag: &str, msg: &[u8]) -> [u8; 32] {
    let tag_hash = Sha256::digest(tag.as_bytes());

    let mut hasher = Sha256::new();
    hasher.update(tag_hash);
    hasher.update(tag_hash);
    hasher.update(msg);
    hasher.finalize().into()
}

/// Tags used by Taproot signing
pub mod tags {
    pub const TAP_LEAF: &str = "TapLeaf";
    pub const TAP_SIGHASH: &str = "TapSighash";
}
