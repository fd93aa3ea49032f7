//! Cryptographic primitives for hardware signing
//!
//! - secp256k1 signature math (canonical form, DER, public key recovery)
//! - BIP-340 tagged hashes for Taproot

pub mod curves;
pub mod schnorr;

pub use curves::CurveError;
pub use schnorr::{tagged_hash, tags};
