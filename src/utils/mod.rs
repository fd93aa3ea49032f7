//! Utilities Module
//!
//! Logging and runtime configuration shared across the crate.

pub mod logging;
pub mod signer_config;

pub use signer_config::{SignerSettings, UtxoNetwork, SIGHASH_FORKID};
