//! Tron Pre-Image Hashing
//!
//! Tron signs SHA-256 of the protobuf-encoded `raw_data`, which the
//! transaction builder hands over already serialized as hex.

use super::{PreImageError, PreImageResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Unsigned Tron transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTronTransaction {
    /// Hex of the serialized `raw_data` message
    pub raw_data_hex: String,
}

impl UnsignedTronTransaction {
    pub fn new(raw_data_hex: impl Into<String>) -> Self {
        Self {
            raw_data_hex: raw_data_hex.into(),
        }
    }
}

/// Get the signing hash (also the transaction id) for a Tron transaction
pub fn get_tron_signing_hash(tx: &UnsignedTronTransaction) -> PreImageResult<[u8; 32]> {
    let trimmed = tx.raw_data_hex.trim();
    let hex_str = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if hex_str.is_empty() {
        return Err(PreImageError::MissingField("raw_data_hex".to_string()));
    }

    let raw = hex::decode(hex_str)
        .map_err(|e| PreImageError::EncodingError(format!("raw_data_hex: {}", e)))?;

    Ok(Sha256::digest(&raw).into())
}
