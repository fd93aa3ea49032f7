//! Hardware Signer Core
//!
//! Signs multi-chain transactions with keys that never leave a hardware
//! device (smart card or similar). The device only ever sees 32-byte hashes.
//!
//! # Architecture
//!
//! This crate provides:
//! - **signing::preimage**: sighash / signing-hash builders per chain family
//! - **signing::batch**: grouping of hashes into as few device calls as possible
//! - **signing::gateway**: the async boundary to the device
//! - **signing::assembler**: DER, low-S, recovery id and `v` encoding
//! - **signing::signer**: the end-to-end operations
//! - **crypto**: secp256k1 math and BIP-340 tagged hashes
//! - **wallet**: derivation paths
//!
//! # Example
//!
//! ```rust,ignore
//! use hardware_signer::{HardwareSigner, HardwareKeyHandle, UtxoNetwork};
//!
//! let signer = HardwareSigner::new(handle, gateway);
//! let plan = signer.prepare_utxo_signing(&tx, &UtxoNetwork::bitcoin())?;
//! println!("{} card taps needed", plan.device_call_count());
//! let scripts = signer.sign_utxo_inputs(&tx, &UtxoNetwork::bitcoin()).await?;
//! ```

pub mod crypto;
pub mod error;
pub mod serde_bytes;
pub mod signing;
pub mod types;
pub mod utils;
pub mod wallet;

// Re-export key types for convenience
pub use error::{ErrorCode, SignerError, SignerResult};
pub use types::*;

pub use signing::{
    ChainKind, DeviceError, DeviceErrorKind, HardwareSigner, HardwareSigningGateway, SignRequest,
    SignResponse, SigningGroup, SigningPlan,
};
pub use utils::{SignerSettings, UtxoNetwork};
pub use wallet::DerivationPath;

// Re-export crypto utilities for binaries and tests
pub use crypto::curves::{
    canonicalise, decode_der, encode_der, is_canonical, is_public_key_compressed,
    recover_public_key, recover_recovery_id,
};
pub use signing::preimage::ethereum::keccak256;
