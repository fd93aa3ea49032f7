//! Signature Assembly
//!
//! Turns the device's bare `(r, s)` into what each chain consumes:
//! - UTXO ECDSA: low-S, DER, sighash byte, then the script pushes
//! - Taproot: the 64 bytes unchanged (plus sighash byte when not default)
//! - EVM / Tron: recovery id search, then `v`

use crate::crypto::curves::{canonicalise, encode_der, recover_recovery_id, CurveError};
use crate::error::{SignerError, SignerResult};
use crate::signing::preimage::{ScriptType, SigHashType};
use crate::types::{LeafHash, RawSignature, RecoverableSignature, SignedScript};

/// `[sig]` for P2PK, `[sig, pubkey]` for everything else
pub fn assemble_ecdsa(
    raw: &RawSignature,
    sighash_value: u8,
    script_type: ScriptType,
    public_key: &[u8],
    input_index: usize,
) -> SignedScript {
    let canonical = canonicalise(raw);
    let mut signature = encode_der(&canonical.r, &canonical.s);
    signature.push(sighash_value);

    let items = match script_type {
        ScriptType::P2PK => vec![signature],
        _ => vec![signature, public_key.to_vec()],
    };

    SignedScript {
        input_index,
        leaf_hash: None,
        items,
    }
}

/// BIP340 signature, passed through
pub fn assemble_schnorr(
    raw: &RawSignature,
    sighash_type: SigHashType,
    input_index: usize,
    leaf_hash: Option<LeafHash>,
) -> SignedScript {
    let mut signature = raw.to_bytes().to_vec();
    if sighash_type != SigHashType::Default {
        signature.push(sighash_type.to_byte());
    }

    SignedScript {
        input_index,
        leaf_hash,
        items: vec![signature],
    }
}

/// How `v` is derived from the recovery id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryEncoding {
    /// EIP-155: `recId + 35 + 2 * chainId`
    Eip155 { chain_id: u64 },
    /// Pre-EIP-155 legacy and Tron: `recId + 27`
    Legacy,
    /// Typed transactions carry the parity bit only: `recId`
    Parity,
}

impl RecoveryEncoding {
    pub fn v(&self, recovery_id: u8) -> u64 {
        match self {
            RecoveryEncoding::Eip155 { chain_id } => recovery_id as u64 + 35 + 2 * chain_id,
            RecoveryEncoding::Legacy => recovery_id as u64 + 27,
            RecoveryEncoding::Parity => recovery_id as u64,
        }
    }
}

/// Canonicalise, find the recovery id against `public_key` and encode `v`.
///
/// Failing to reproduce the key is fatal for the whole operation.
pub fn assemble_recoverable(
    raw: &RawSignature,
    hash: &[u8; 32],
    public_key: &[u8],
    encoding: RecoveryEncoding,
    input_index: usize,
) -> SignerResult<RecoverableSignature> {
    let canonical = canonicalise(raw);
    let recovery_id = recover_recovery_id(hash, &canonical, public_key).map_err(|e| match e {
        CurveError::RecoveryFailed => SignerError::recovery_id_not_found(input_index),
        other => SignerError::from(other).at_input(input_index),
    })?;

    Ok(RecoverableSignature {
        v: encoding.v(recovery_id),
        r: canonical.r,
        s: canonical.s,
    })
}
