//! Pre-Image Hash Generation
//!
//! Generates the hash that needs to be signed for each chain family.
//! Builders are pure: they never touch the device.

pub mod bitcoin;
pub mod ethereum;
pub mod rlp;
pub mod tron;

/// Error types for pre-image operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreImageError {
    #[error("Invalid transaction format: {0}")]
    InvalidTransaction(String),

    #[error("Unsupported input type: {0}")]
    UnsupportedType(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid input index: {0}")]
    InvalidInputIndex(usize),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

pub type PreImageResult<T> = Result<T, PreImageError>;

// Re-export chain-specific functions
pub use bitcoin::{
    get_taproot_sighash, get_utxo_sighash, tapleaf_hash, ScriptType, SigHashType,
    UnsignedUtxoTransaction, UtxoInput, UtxoOutput,
};
pub use ethereum::{get_evm_signing_hash, AccessListEntry, EvmFee, UnsignedEvmTransaction};
pub use tron::{get_tron_signing_hash, UnsignedTronTransaction};
