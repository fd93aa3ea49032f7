//! Elliptic Curve Utilities
//!
//! Only secp256k1 is needed here: every chain this crate signs for
//! (Bitcoin-family UTXO chains, EVM chains, Tron) uses it. EdDSA signing
//! is passed through to the device untouched and never re-derived.
//!
//! The hardware device returns bare `(r, s)` pairs. This module turns them
//! into what the chains want:
//! - low-S canonical form and DER for UTXO scripts
//! - the recovery id for account-model chains, found by point recovery

pub mod secp256k1;

pub use secp256k1::{
    canonicalise, decode_der, encode_der, is_canonical, is_public_key_compressed,
    recover_public_key, recover_recovery_id, CURVE_ORDER, FIELD_PRIME, HALF_CURVE_ORDER,
};

/// Errors from curve operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CurveError {
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("No recovery id reproduces the expected public key")]
    RecoveryFailed,
}
