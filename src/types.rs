//! Core types for hardware-backed signing
//!
//! Everything here lives for one signing operation and is dropped once the
//! finished signatures are handed back.

use crate::crypto::curves::{CurveError, CURVE_ORDER, FIELD_PRIME};
use crate::signing::preimage::bitcoin::ScriptType;
use crate::wallet::derivation_path::{DerivationPath, DerivationPathError, HARDENED};
use serde::{Deserialize, Serialize};

// =============================================================================
// Keys
// =============================================================================

/// Reference to a key that only exists on the hardware device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareKeyHandle {
    /// Wallet public key as reported by the card
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub public_key: Vec<u8>,
    /// Path template the derived keys hang off
    pub derivation_path: DerivationPath,
    pub device_id: String,
}

impl HardwareKeyHandle {
    pub fn new(public_key: Vec<u8>, derivation_path: DerivationPath, device_id: impl Into<String>) -> Self {
        Self {
            public_key,
            derivation_path,
            device_id: device_id.into(),
        }
    }
}

/// Which derived key signs a particular input or message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeyRef {
    /// HD-derived address key: `<template>/<change>/<index>`
    Derived {
        #[serde(with = "crate::serde_bytes::hex_vec")]
        public_key: Vec<u8>,
        address_index: u32,
        #[serde(default)]
        is_change: bool,
    },
    /// Account-model chains sign with the template key itself
    Account {
        #[serde(with = "crate::serde_bytes::hex_vec")]
        public_key: Vec<u8>,
    },
}

impl KeyRef {
    pub fn derived(public_key: Vec<u8>, address_index: u32, is_change: bool) -> Self {
        KeyRef::Derived {
            public_key,
            address_index,
            is_change,
        }
    }

    pub fn account(public_key: Vec<u8>) -> Self {
        KeyRef::Account { public_key }
    }

    pub fn public_key(&self) -> &[u8] {
        match self {
            KeyRef::Derived { public_key, .. } | KeyRef::Account { public_key } => public_key,
        }
    }

    /// Address indexes must be non-hardened
    pub fn validate(&self) -> Result<(), DerivationPathError> {
        match self {
            KeyRef::Derived { address_index, .. } if *address_index >= HARDENED => {
                Err(DerivationPathError::IndexOutOfRange(*address_index))
            }
            _ => Ok(()),
        }
    }

    /// Full derivation path under `template`.
    ///
    /// Two key refs are the same signing key iff this is equal.
    pub fn resolve_path(&self, template: &DerivationPath) -> DerivationPath {
        match self {
            KeyRef::Derived {
                address_index,
                is_change,
                ..
            } => template
                .child(if *is_change { 1 } else { 0 }, false)
                .child(*address_index, false),
            KeyRef::Account { .. } => template.clone(),
        }
    }
}

// =============================================================================
// Units of work
// =============================================================================

/// Script type (UTXO) or chain family (account model) a hash belongs to.
///
/// Part of the batching key next to the derivation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptOrChain {
    Script(ScriptType),
    Evm,
    Tron,
}

impl ScriptOrChain {
    /// Hashes under this tag are signed with BIP-340 Schnorr
    pub fn is_schnorr(&self) -> bool {
        matches!(self, ScriptOrChain::Script(script_type) if script_type.is_taproot())
    }
}

/// One hash the device has to sign
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataToSign {
    pub key: KeyRef,
    pub tag: ScriptOrChain,
    #[serde(with = "crate::serde_bytes::hex32")]
    pub hash: [u8; 32],
    /// Transaction input this hash signs (0 for account-model chains)
    pub input_index: usize,
    /// Tapleaf for script-path spends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf_hash: Option<LeafHash>,
}

/// Newtype so the optional leaf hash serializes as hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeafHash(#[serde(with = "crate::serde_bytes::hex32")] pub [u8; 32]);

impl DataToSign {
    pub fn new(key: KeyRef, tag: ScriptOrChain, hash: [u8; 32], input_index: usize) -> Self {
        Self {
            key,
            tag,
            hash,
            input_index,
            leaf_hash: None,
        }
    }

    pub fn with_leaf_hash(mut self, leaf_hash: [u8; 32]) -> Self {
        self.leaf_hash = Some(LeafHash(leaf_hash));
        self
    }
}

// =============================================================================
// Signatures
// =============================================================================

/// The device's only output per hash. Never carries a recovery id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl RawSignature {
    /// Split a 64-byte `r || s` blob
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CurveError> {
        if bytes.len() != 64 {
            return Err(CurveError::InvalidSignature(format!(
                "expected 64 bytes, got {}",
                bytes.len()
            )));
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Ok(Self { r, s })
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r);
        out[32..].copy_from_slice(&self.s);
        out
    }

    /// ECDSA: both scalars must lie in `[1, n)`
    pub fn validate(&self) -> Result<(), CurveError> {
        check_scalar("r", &self.r, &CURVE_ORDER)?;
        check_scalar("s", &self.s, &CURVE_ORDER)
    }

    /// BIP-340: `r` is the x coordinate of R (below p), `s` a scalar below n
    pub fn validate_schnorr(&self) -> Result<(), CurveError> {
        check_scalar("r", &self.r, &FIELD_PRIME)?;
        check_scalar("s", &self.s, &CURVE_ORDER)
    }
}

fn check_scalar(name: &str, value: &[u8; 32], bound: &[u8; 32]) -> Result<(), CurveError> {
    if value.iter().all(|&b| b == 0) {
        return Err(CurveError::InvalidSignature(format!("{} is zero", name)));
    }
    if value >= bound {
        return Err(CurveError::InvalidSignature(format!("{} is out of range", name)));
    }
    Ok(())
}

/// Script pushes for one signed UTXO input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedScript {
    pub input_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leaf_hash: Option<LeafHash>,
    /// `[signature]` or `[signature, public_key]`, hex in JSON
    #[serde(serialize_with = "serialize_hex_items")]
    pub items: Vec<Vec<u8>>,
}

impl SignedScript {
    /// The signature push (always the first item)
    pub fn signature(&self) -> &[u8] {
        self.items.first().map(|v| v.as_slice()).unwrap_or(&[])
    }
}

fn serialize_hex_items<S>(items: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(items.iter().map(hex::encode))
}

/// `{v, r, s}` for account-model chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecoverableSignature {
    pub v: u64,
    #[serde(with = "crate::serde_bytes::hex32")]
    pub r: [u8; 32],
    #[serde(with = "crate::serde_bytes::hex32")]
    pub s: [u8; 32],
}

impl RecoverableSignature {
    /// `r || s || v` with `v` in a single byte (Tron layout)
    pub fn to_rsv_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v as u8;
        out
    }
}

/// Chain-specific final signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FinalSignature {
    /// DER + sighash byte, plus the public key unless P2PK
    Ecdsa(SignedScript),
    /// 64-byte BIP340 signature, plus the sighash byte when not default
    Schnorr(SignedScript),
    Recoverable(RecoverableSignature),
}
