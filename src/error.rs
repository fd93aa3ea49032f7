//! Unified error types for the hardware signer
//!
//! Every failure of a signing operation surfaces as a [`SignerError`].
//! Device failures keep the original [`DeviceError`] so callers can decide
//! whether to re-prompt the user.

use crate::crypto::curves::CurveError;
use crate::signing::gateway::DeviceError;
use crate::signing::preimage::PreImageError;
use crate::wallet::derivation_path::DerivationPathError;
use serde::Serialize;
use std::fmt;

/// Main error type for all signing operations
#[derive(Debug, Clone, Serialize)]
pub struct SignerError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Index of the input (or message) that failed, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_index: Option<usize>,
    /// The device error exactly as the gateway reported it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceError>,
}

impl SignerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            input_index: None,
            device: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn at_input(mut self, index: usize) -> Self {
        self.input_index = Some(index);
        self
    }

    // Convenience constructors
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn malformed_public_key(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedPublicKey, msg)
    }

    pub fn invalid_transaction(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidTransaction, msg)
    }

    pub fn signature_count_mismatch(expected: usize, actual: usize) -> Self {
        Self::new(
            ErrorCode::SignatureCountMismatch,
            format!("Device returned {} signatures for {} hashes", actual, expected),
        )
    }

    pub fn recovery_id_not_found(index: usize) -> Self {
        Self::new(
            ErrorCode::RecoveryIdNotFound,
            "Signature verification failed: no recovery id reproduces the expected public key",
        )
        .at_input(index)
    }

    pub fn invalid_signature(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidSignature, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }

    /// The untouched device error, if this is a device failure
    pub fn device_error(&self) -> Option<&DeviceError> {
        self.device.as_ref()
    }

    pub fn is_device_failure(&self) -> bool {
        self.code == ErrorCode::DeviceFailure
    }
}

impl fmt::Display for SignerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(index) = self.input_index {
            write!(f, " (input {})", index)?;
        }
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for SignerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.device
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Input errors, raised before any device call
    InvalidInput,
    MalformedPublicKey,
    InvalidDerivationPath,
    InvalidTransaction,

    // Device errors
    DeviceFailure,
    SignatureCountMismatch,

    // Crypto errors
    RecoveryIdNotFound,
    InvalidSignature,

    // Internal
    Internal,
}

/// Result type alias for signing operations
pub type SignerResult<T> = Result<T, SignerError>;

// Conversions from module errors

impl From<DeviceError> for SignerError {
    fn from(e: DeviceError) -> Self {
        let mut err = SignerError::new(ErrorCode::DeviceFailure, e.to_string());
        err.device = Some(e);
        err
    }
}

impl From<CurveError> for SignerError {
    fn from(e: CurveError) -> Self {
        let code = match e {
            CurveError::InvalidPublicKey(_) => ErrorCode::MalformedPublicKey,
            CurveError::InvalidSignature(_) => ErrorCode::InvalidSignature,
            CurveError::RecoveryFailed => ErrorCode::RecoveryIdNotFound,
        };
        SignerError::new(code, e.to_string())
    }
}

impl From<PreImageError> for SignerError {
    fn from(e: PreImageError) -> Self {
        let index = match e {
            PreImageError::InvalidInputIndex(i) => Some(i),
            _ => None,
        };
        let mut err = SignerError::new(ErrorCode::InvalidTransaction, e.to_string());
        err.input_index = index;
        err
    }
}

impl From<DerivationPathError> for SignerError {
    fn from(e: DerivationPathError) -> Self {
        SignerError::new(ErrorCode::InvalidDerivationPath, e.to_string())
    }
}

impl From<hex::FromHexError> for SignerError {
    fn from(e: hex::FromHexError) -> Self {
        SignerError::new(ErrorCode::InvalidInput, format!("Invalid hex: {}", e))
    }
}

impl From<serde_json::Error> for SignerError {
    fn from(e: serde_json::Error) -> Self {
        SignerError::new(ErrorCode::InvalidInput, e.to_string())
    }
}
