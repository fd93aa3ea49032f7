//! Hardware Signing
//!
//! Pipeline for signing transactions with a key held on an external device:
//! 1. Generate pre-image hashes from unsigned transactions
//! 2. Group hashes that share a key into as few device calls as possible
//! 3. Call the device, one call at a time
//! 4. Assemble chain-specific signatures in input order
//!
//! Supported chains:
//! - Bitcoin family (Legacy, SegWit, FORKID networks, Taproot)
//! - EVM (Legacy, EIP-155, EIP-1559)
//! - Tron

pub mod assembler;
pub mod batch;
pub mod gateway;
pub mod preimage;
pub mod signer;

pub use assembler::RecoveryEncoding;
pub use batch::{ItemLocation, SigningGroup, SigningPlan};
pub use gateway::{DeviceError, DeviceErrorKind, HardwareSigningGateway, SignRequest, SignResponse};
pub use preimage::*;
pub use signer::{ChainKind, HardwareSigner};
