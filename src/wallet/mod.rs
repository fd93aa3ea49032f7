//! Wallet Module
//!
//! Key naming shared between the host and the hardware device.

pub mod derivation_path;

pub use derivation_path::{DerivationComponent, DerivationPath, DerivationPathError, HARDENED};
