//! Hardware Signing Gateway
//!
//! The single boundary to the external device. One call signs a batch of
//! hashes with one key; the transport (NFC, BLE, USB) lives behind the trait.
//!
//! Contract:
//! - every hash in a request shares the same public key and derivation path
//! - the response holds one signature per hash, in request order
//! - failures are reported as [`DeviceError`] and never interpreted here

use crate::wallet::derivation_path::DerivationPath;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One device invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignRequest {
    pub device_id: String,
    /// Wallet public key on the card
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub public_key: Vec<u8>,
    pub derivation_path: DerivationPath,
    #[serde(with = "crate::serde_bytes::hex32_vec")]
    pub hashes: Vec<[u8; 32]>,
}

/// What the device handed back
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignResponse {
    /// Raw `r || s` blobs, one per requested hash
    pub signatures: Vec<Vec<u8>>,
    /// Lifetime signature counter reported by some cards
    pub total_signed_hashes: Option<u32>,
}

impl SignResponse {
    pub fn new(signatures: Vec<Vec<u8>>) -> Self {
        Self {
            signatures,
            total_signed_hashes: None,
        }
    }

    pub fn with_total_signed_hashes(mut self, total: u32) -> Self {
        self.total_signed_hashes = Some(total);
        self
    }
}

/// Device failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceErrorKind {
    /// Device still processing a previous command
    Busy,
    /// User dismissed the prompt or removed the card
    UserCancelled,
    CardNotPresent,
    /// Transport-level failure
    Communication,
    Other,
}

/// Error reported by the device layer, passed through unchanged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("Device error ({kind:?}): {message}")]
pub struct DeviceError {
    pub kind: DeviceErrorKind,
    pub message: String,
}

impl DeviceError {
    pub fn new(kind: DeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Capability to sign hashes on a hardware device.
///
/// Injected into [`HardwareSigner`](super::signer::HardwareSigner); the
/// signer never calls it concurrently.
#[async_trait]
pub trait HardwareSigningGateway: Send + Sync {
    async fn sign(&self, request: SignRequest) -> Result<SignResponse, DeviceError>;
}
