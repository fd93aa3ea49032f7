//! Signer Configuration
//!
//! Two kinds of settings:
//! - `SignerSettings`: how the signer talks to the device (cooldown, logging,
//!   per-call limits)
//! - `UtxoNetwork`: per-chain sighash parameters for Bitcoin-family chains
//!
//! Curve parameters are constants and never configurable.

use crate::error::{SignerError, SignerResult};
use crate::signing::preimage::bitcoin::SigHashType;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest cooldown accepted between device calls
const MAX_DEVICE_COOLDOWN: Duration = Duration::from_secs(60);

/// Settings for one signer instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerSettings {
    /// Delay between consecutive device calls within one signing operation
    #[serde(rename = "device_cooldown_ms", with = "duration_ms")]
    pub device_cooldown: Duration,
    /// Shorten keys and hashes in log output
    pub redact_logs: bool,
    /// Log a warning when an operation needs more than one device tap
    pub warn_on_multiple_device_calls: bool,
    /// Split large groups into several calls. `None` means unlimited.
    pub max_hashes_per_call: Option<usize>,
}

impl Default for SignerSettings {
    fn default() -> Self {
        Self::standard()
    }
}

impl SignerSettings {
    /// Settings for real NFC cards
    pub fn standard() -> Self {
        Self {
            device_cooldown: Duration::from_millis(1500),
            redact_logs: true,
            warn_on_multiple_device_calls: true,
            max_hashes_per_call: None,
        }
    }

    /// No cooldown, for emulators and tests
    pub fn fast() -> Self {
        Self {
            device_cooldown: Duration::ZERO,
            redact_logs: false,
            warn_on_multiple_device_calls: false,
            max_hashes_per_call: None,
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.device_cooldown = cooldown;
        self
    }

    pub fn with_max_hashes_per_call(mut self, max: usize) -> Self {
        self.max_hashes_per_call = Some(max);
        self
    }

    /// Load from JSON. Missing fields take the `standard()` values.
    pub fn from_json(json: &str) -> SignerResult<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings consistency
    pub fn validate(&self) -> SignerResult<()> {
        let mut problems = Vec::new();

        if self.max_hashes_per_call == Some(0) {
            problems.push("max_hashes_per_call must be at least 1".to_string());
        }

        if self.device_cooldown > MAX_DEVICE_COOLDOWN {
            problems.push(format!(
                "device cooldown of {}ms exceeds {}s",
                self.device_cooldown.as_millis(),
                MAX_DEVICE_COOLDOWN.as_secs()
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(SignerError::invalid_input("Invalid signer settings").with_details(problems.join("; ")))
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

// =============================================================================
// UTXO networks
// =============================================================================

/// FORKID flag OR-ed into the sighash byte
pub const SIGHASH_FORKID: u8 = 0x40;

/// Sighash parameters of a Bitcoin-family chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoNetwork {
    /// Base sighash type
    pub sighash_type: SigHashType,
    /// Replay-protected fork: BIP143 digest for every input, FORKID bit set
    #[serde(default)]
    pub sighash_forked: bool,
    #[serde(default)]
    pub fork_id: u32,
}

impl Default for UtxoNetwork {
    fn default() -> Self {
        Self::bitcoin()
    }
}

impl UtxoNetwork {
    pub fn bitcoin() -> Self {
        Self {
            sighash_type: SigHashType::All,
            sighash_forked: false,
            fork_id: 0,
        }
    }

    pub fn litecoin() -> Self {
        Self::bitcoin()
    }

    pub fn dogecoin() -> Self {
        Self::bitcoin()
    }

    pub fn dash() -> Self {
        Self::bitcoin()
    }

    pub fn bitcoin_cash() -> Self {
        Self {
            sighash_type: SigHashType::All,
            sighash_forked: true,
            fork_id: 0,
        }
    }

    pub fn ecash() -> Self {
        Self::bitcoin_cash()
    }

    pub fn bitcoin_gold() -> Self {
        Self {
            sighash_type: SigHashType::All,
            sighash_forked: true,
            fork_id: 79,
        }
    }

    /// Look up a preset by chain name
    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "bitcoin" | "btc" => Some(Self::bitcoin()),
            "litecoin" | "ltc" => Some(Self::litecoin()),
            "dogecoin" | "doge" => Some(Self::dogecoin()),
            "dash" => Some(Self::dash()),
            "bitcoin_cash" | "bch" => Some(Self::bitcoin_cash()),
            "ecash" | "xec" => Some(Self::ecash()),
            "bitcoin_gold" | "btg" => Some(Self::bitcoin_gold()),
            _ => None,
        }
    }

    /// Byte appended to DER signatures
    pub fn sighash_value(&self) -> u8 {
        if self.sighash_forked {
            self.sighash_type.to_byte() | SIGHASH_FORKID
        } else {
            self.sighash_type.to_byte()
        }
    }

    /// 4-byte little-endian suffix of the signature preimage
    pub fn sighash_suffix(&self) -> [u8; 4] {
        let value = if self.sighash_forked {
            (self.sighash_value() as u32) | (self.fork_id << 8)
        } else {
            self.sighash_value() as u32
        };
        value.to_le_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        assert!(SignerSettings::standard().validate().is_ok());
        assert!(SignerSettings::fast().validate().is_ok());
        assert_eq!(SignerSettings::standard().device_cooldown, Duration::from_millis(1500));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let zero_cap = SignerSettings::fast().with_max_hashes_per_call(0);
        assert!(zero_cap.validate().is_err());

        let slow = SignerSettings::fast().with_cooldown(Duration::from_secs(61));
        assert!(slow.validate().is_err());
    }

    #[test]
    fn test_settings_from_json() {
        let settings = SignerSettings::from_json(r#"{"device_cooldown_ms": 250, "max_hashes_per_call": 10}"#).unwrap();
        assert_eq!(settings.device_cooldown, Duration::from_millis(250));
        assert_eq!(settings.max_hashes_per_call, Some(10));
        assert!(settings.redact_logs);

        assert!(SignerSettings::from_json(r#"{"max_hashes_per_call": 0}"#).is_err());
        assert!(SignerSettings::from_json("not json").is_err());
    }

    #[test]
    fn test_sighash_values() {
        assert_eq!(UtxoNetwork::bitcoin().sighash_value(), 0x01);
        assert_eq!(UtxoNetwork::bitcoin().sighash_suffix(), [0x01, 0, 0, 0]);

        assert_eq!(UtxoNetwork::bitcoin_cash().sighash_value(), 0x41);
        assert_eq!(UtxoNetwork::bitcoin_cash().sighash_suffix(), [0x41, 0, 0, 0]);

        // fork id lands in the upper 24 bits
        assert_eq!(UtxoNetwork::bitcoin_gold().sighash_suffix(), [0x41, 79, 0, 0]);
    }

    #[test]
    fn test_network_lookup() {
        assert_eq!(UtxoNetwork::by_name("BCH"), Some(UtxoNetwork::bitcoin_cash()));
        assert_eq!(UtxoNetwork::by_name("doge"), Some(UtxoNetwork::dogecoin()));
        assert_eq!(UtxoNetwork::by_name("monero"), None);
    }
}
