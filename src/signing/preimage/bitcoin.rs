//! Bitcoin-Family Pre-Image Hashing
//!
//! Generates sighashes for UTXO transaction inputs.
//! Supports Legacy, SegWit (BIP-143, also used by FORKID chains) and
//! Taproot (BIP-341 key path, BIP-342 script path) sighash algorithms.

use super::{PreImageError, PreImageResult};
use crate::crypto::schnorr::{tagged_hash, tags};
use crate::types::KeyRef;
use crate::utils::signer_config::UtxoNetwork;
use bitcoin::hashes::{hash160, sha256, sha256d, Hash};
use serde::{Deserialize, Serialize};

/// Tapscript leaf version
pub const TAPSCRIPT_LEAF_VERSION: u8 = 0xc0;

/// Sighash types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigHashType {
    /// Taproot default (implicit SIGHASH_ALL, no trailing byte)
    Default = 0x00,
    /// Sign all inputs and all outputs
    All = 0x01,
    /// Sign all inputs, no outputs
    None = 0x02,
    /// Sign all inputs, only output at same index
    Single = 0x03,
    /// SIGHASH_ALL | ANYONECANPAY (only sign own input, all outputs)
    AllAnyoneCanPay = 0x81,
    /// SIGHASH_NONE | ANYONECANPAY
    NoneAnyoneCanPay = 0x82,
    /// SIGHASH_SINGLE | ANYONECANPAY
    SingleAnyoneCanPay = 0x83,
}

impl SigHashType {
    pub fn to_byte(&self) -> u8 {
        *self as u8
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(Self::Default),
            0x01 => Some(Self::All),
            0x02 => Some(Self::None),
            0x03 => Some(Self::Single),
            0x81 => Some(Self::AllAnyoneCanPay),
            0x82 => Some(Self::NoneAnyoneCanPay),
            0x83 => Some(Self::SingleAnyoneCanPay),
            _ => None,
        }
    }

    pub fn is_anyonecanpay(&self) -> bool {
        self.to_byte() & 0x80 != 0
    }

    fn is_none(&self) -> bool {
        self.to_byte() & 0x1f == 0x02
    }

    fn is_single(&self) -> bool {
        self.to_byte() & 0x1f == 0x03
    }
}

/// Type of the output being spent
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptType {
    /// Pay to public key
    P2PK,
    /// Legacy P2PKH
    P2PKH,
    /// Legacy P2SH
    P2SH,
    /// Native SegWit P2WPKH
    P2WPKH,
    /// Native SegWit P2WSH
    P2WSH,
    /// SegWit-in-P2SH
    P2SH_P2WPKH,
    /// Taproot (key or script path)
    P2TR,
}

impl ScriptType {
    pub fn is_witness(&self) -> bool {
        matches!(self, Self::P2WPKH | Self::P2WSH | Self::P2SH_P2WPKH | Self::P2TR)
    }

    pub fn is_taproot(&self) -> bool {
        matches!(self, Self::P2TR)
    }
}

/// Input of an unsigned UTXO transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoInput {
    /// Previous transaction id, display byte order
    #[serde(with = "crate::serde_bytes::hex32")]
    pub txid: [u8; 32],
    pub vout: u32,
    /// Value of the spent output in satoshis
    pub value: u64,
    #[serde(default = "default_sequence")]
    pub sequence: u32,
    /// scriptPubKey of the spent output
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub script_pubkey: Vec<u8>,
    pub script_type: ScriptType,
    /// Key that owns the spent output
    pub key: KeyRef,
    /// Redeem script (P2SH) or witness script (P2WSH)
    #[serde(default, with = "crate::serde_bytes::hex_vec", skip_serializing_if = "Vec::is_empty")]
    pub redeem_script: Vec<u8>,
    /// Tapleaf hashes to sign for a Taproot script-path spend. Empty means key path.
    #[serde(default, with = "crate::serde_bytes::hex32_vec", skip_serializing_if = "Vec::is_empty")]
    pub leaf_hashes: Vec<[u8; 32]>,
}

fn default_sequence() -> u32 {
    0xffffffff
}

/// Transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoOutput {
    /// Value in satoshis
    pub value: u64,
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub script_pubkey: Vec<u8>,
}

/// Unsigned UTXO transaction for pre-image generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedUtxoTransaction {
    #[serde(default = "default_version")]
    pub version: i32,
    pub inputs: Vec<UtxoInput>,
    pub outputs: Vec<UtxoOutput>,
    #[serde(default)]
    pub locktime: u32,
}

fn default_version() -> i32 {
    2
}

impl UnsignedUtxoTransaction {
    fn input(&self, index: usize) -> PreImageResult<&UtxoInput> {
        self.inputs
            .get(index)
            .ok_or(PreImageError::InvalidInputIndex(index))
    }
}

// MARK: - Dispatch

/// ECDSA sighash of one input.
///
/// Witness inputs, and every input on a FORKID network, use BIP-143.
/// Everything else uses the legacy algorithm.
pub fn get_utxo_sighash(
    tx: &UnsignedUtxoTransaction,
    input_index: usize,
    network: &UtxoNetwork,
) -> PreImageResult<[u8; 32]> {
    let input = tx.input(input_index)?;
    if input.script_type.is_taproot() {
        return Err(PreImageError::UnsupportedType(
            "Taproot inputs use the Schnorr sighash".to_string(),
        ));
    }

    let script_code = script_code(input)?;
    if network.sighash_forked || input.script_type.is_witness() {
        get_segwit_sighash(tx, input_index, &script_code, network)
    } else {
        get_legacy_sighash(tx, input_index, &script_code, network)
    }
}

/// Script code committed to by the signature
pub fn script_code(input: &UtxoInput) -> PreImageResult<Vec<u8>> {
    match input.script_type {
        ScriptType::P2PK | ScriptType::P2PKH => Ok(input.script_pubkey.clone()),
        ScriptType::P2SH | ScriptType::P2WSH => {
            if input.redeem_script.is_empty() {
                return Err(PreImageError::MissingField("redeem_script".to_string()));
            }
            Ok(input.redeem_script.clone())
        }
        ScriptType::P2WPKH | ScriptType::P2SH_P2WPKH => {
            let key_hash = hash160::Hash::hash(input.key.public_key()).to_byte_array();
            Ok(p2pkh_script(&key_hash))
        }
        ScriptType::P2TR => Err(PreImageError::UnsupportedType(
            "Taproot inputs have no script code".to_string(),
        )),
    }
}

/// OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG
fn p2pkh_script(key_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.extend_from_slice(&[0x76, 0xa9, 0x14]);
    script.extend_from_slice(key_hash);
    script.extend_from_slice(&[0x88, 0xac]);
    script
}

// MARK: - Legacy

/// Legacy (pre-SegWit) sighash
fn get_legacy_sighash(
    tx: &UnsignedUtxoTransaction,
    input_index: usize,
    script_code: &[u8],
    network: &UtxoNetwork,
) -> PreImageResult<[u8; 32]> {
    let sighash_type = network.sighash_type;
    tx.input(input_index)?;

    // SIGHASH_SINGLE without a matching output signs the constant 1
    if sighash_type.is_single() && input_index >= tx.outputs.len() {
        let mut one = [0u8; 32];
        one[0] = 1;
        return Ok(one);
    }

    let mut serialized = Vec::new();

    // Version
    serialized.extend_from_slice(&tx.version.to_le_bytes());

    // Inputs
    if sighash_type.is_anyonecanpay() {
        write_compact_size(1, &mut serialized);
    } else {
        write_compact_size(tx.inputs.len() as u64, &mut serialized);
    }

    for (i, input) in tx.inputs.iter().enumerate() {
        if sighash_type.is_anyonecanpay() && i != input_index {
            continue;
        }

        write_outpoint(input, &mut serialized);

        // script (only for the input being signed)
        if i == input_index {
            write_script(script_code, &mut serialized);
        } else {
            serialized.push(0x00);
        }

        let sequence = if i != input_index && (sighash_type.is_none() || sighash_type.is_single()) {
            0
        } else {
            input.sequence
        };
        serialized.extend_from_slice(&sequence.to_le_bytes());
    }

    // Outputs
    if sighash_type.is_none() {
        write_compact_size(0, &mut serialized);
    } else if sighash_type.is_single() {
        write_compact_size(input_index as u64 + 1, &mut serialized);
        for _ in 0..input_index {
            // blanked output: value -1, empty script
            serialized.extend_from_slice(&u64::MAX.to_le_bytes());
            serialized.push(0x00);
        }
        write_output(&tx.outputs[input_index], &mut serialized);
    } else {
        write_compact_size(tx.outputs.len() as u64, &mut serialized);
        for output in &tx.outputs {
            write_output(output, &mut serialized);
        }
    }

    // Locktime
    serialized.extend_from_slice(&tx.locktime.to_le_bytes());

    // Sighash type (4 bytes, little endian)
    serialized.extend_from_slice(&network.sighash_suffix());

    Ok(sha256d::Hash::hash(&serialized).to_byte_array())
}

// MARK: - BIP-143

/// BIP-143 sighash (SegWit v0 and FORKID chains)
fn get_segwit_sighash(
    tx: &UnsignedUtxoTransaction,
    input_index: usize,
    script_code: &[u8],
    network: &UtxoNetwork,
) -> PreImageResult<[u8; 32]> {
    let input = tx.input(input_index)?;
    let sighash_type = network.sighash_type;
    let mut serialized = Vec::new();

    // 1. Version
    serialized.extend_from_slice(&tx.version.to_le_bytes());

    // 2. hashPrevouts
    let hash_prevouts = if sighash_type.is_anyonecanpay() {
        [0u8; 32]
    } else {
        let mut prevouts = Vec::new();
        for inp in &tx.inputs {
            write_outpoint(inp, &mut prevouts);
        }
        sha256d::Hash::hash(&prevouts).to_byte_array()
    };
    serialized.extend_from_slice(&hash_prevouts);

    // 3. hashSequence
    let hash_sequence =
        if sighash_type.is_anyonecanpay() || sighash_type.is_single() || sighash_type.is_none() {
            [0u8; 32]
        } else {
            let mut sequences = Vec::new();
            for inp in &tx.inputs {
                sequences.extend_from_slice(&inp.sequence.to_le_bytes());
            }
            sha256d::Hash::hash(&sequences).to_byte_array()
        };
    serialized.extend_from_slice(&hash_sequence);

    // 4. outpoint
    write_outpoint(input, &mut serialized);

    // 5. scriptCode
    write_script(script_code, &mut serialized);

    // 6. value
    serialized.extend_from_slice(&input.value.to_le_bytes());

    // 7. nSequence
    serialized.extend_from_slice(&input.sequence.to_le_bytes());

    // 8. hashOutputs
    let hash_outputs = if !sighash_type.is_single() && !sighash_type.is_none() {
        let mut outputs = Vec::new();
        for out in &tx.outputs {
            write_output(out, &mut outputs);
        }
        sha256d::Hash::hash(&outputs).to_byte_array()
    } else if sighash_type.is_single() && input_index < tx.outputs.len() {
        let mut output = Vec::new();
        write_output(&tx.outputs[input_index], &mut output);
        sha256d::Hash::hash(&output).to_byte_array()
    } else {
        [0u8; 32]
    };
    serialized.extend_from_slice(&hash_outputs);

    // 9. nLocktime
    serialized.extend_from_slice(&tx.locktime.to_le_bytes());

    // 10. sighash type
    serialized.extend_from_slice(&network.sighash_suffix());

    Ok(sha256d::Hash::hash(&serialized).to_byte_array())
}

// MARK: - Taproot

/// BIP-341 signature message hash.
///
/// `leaf_hash` selects the BIP-342 script-path extension; `None` is a key-path spend.
pub fn get_taproot_sighash(
    tx: &UnsignedUtxoTransaction,
    input_index: usize,
    sighash_type: SigHashType,
    leaf_hash: Option<&[u8; 32]>,
) -> PreImageResult<[u8; 32]> {
    let input = tx.input(input_index)?;
    if !input.script_type.is_taproot() {
        return Err(PreImageError::UnsupportedType(format!(
            "{:?} input signed with the Taproot sighash",
            input.script_type
        )));
    }
    if sighash_type.is_single() && input_index >= tx.outputs.len() {
        return Err(PreImageError::InvalidTransaction(format!(
            "SIGHASH_SINGLE without output {}",
            input_index
        )));
    }

    let anyone_can_pay = sighash_type.is_anyonecanpay();
    let mut serialized = Vec::new();

    // Epoch
    serialized.push(0x00);

    // Control
    serialized.push(sighash_type.to_byte());
    serialized.extend_from_slice(&tx.version.to_le_bytes());
    serialized.extend_from_slice(&tx.locktime.to_le_bytes());

    if !anyone_can_pay {
        let mut prevouts = Vec::new();
        let mut amounts = Vec::new();
        let mut scripts = Vec::new();
        let mut sequences = Vec::new();
        for inp in &tx.inputs {
            write_outpoint(inp, &mut prevouts);
            amounts.extend_from_slice(&inp.value.to_le_bytes());
            write_script(&inp.script_pubkey, &mut scripts);
            sequences.extend_from_slice(&inp.sequence.to_le_bytes());
        }
        serialized.extend_from_slice(&sha256::Hash::hash(&prevouts).to_byte_array());
        serialized.extend_from_slice(&sha256::Hash::hash(&amounts).to_byte_array());
        serialized.extend_from_slice(&sha256::Hash::hash(&scripts).to_byte_array());
        serialized.extend_from_slice(&sha256::Hash::hash(&sequences).to_byte_array());
    }

    if !sighash_type.is_none() && !sighash_type.is_single() {
        let mut outputs = Vec::new();
        for out in &tx.outputs {
            write_output(out, &mut outputs);
        }
        serialized.extend_from_slice(&sha256::Hash::hash(&outputs).to_byte_array());
    }

    // spend_type: ext_flag * 2, no annex
    serialized.push(if leaf_hash.is_some() { 0x02 } else { 0x00 });

    if anyone_can_pay {
        write_outpoint(input, &mut serialized);
        serialized.extend_from_slice(&input.value.to_le_bytes());
        write_script(&input.script_pubkey, &mut serialized);
        serialized.extend_from_slice(&input.sequence.to_le_bytes());
    } else {
        serialized.extend_from_slice(&(input_index as u32).to_le_bytes());
    }

    if sighash_type.is_single() {
        let mut output = Vec::new();
        write_output(&tx.outputs[input_index], &mut output);
        serialized.extend_from_slice(&sha256::Hash::hash(&output).to_byte_array());
    }

    if let Some(leaf_hash) = leaf_hash {
        serialized.extend_from_slice(leaf_hash);
        // key_version
        serialized.push(0x00);
        // codesep_pos: none
        serialized.extend_from_slice(&u32::MAX.to_le_bytes());
    }

    Ok(tagged_hash(tags::TAP_SIGHASH, &serialized))
}

/// BIP-341 tapleaf hash of a script
pub fn tapleaf_hash(script: &[u8], leaf_version: u8) -> [u8; 32] {
    let mut data = Vec::with_capacity(script.len() + 4);
    data.push(leaf_version);
    write_script(script, &mut data);
    tagged_hash(tags::TAP_LEAF, &data)
}

// MARK: - Serialization helpers

fn write_compact_size(value: u64, buf: &mut Vec<u8>) {
    if value < 0xfd {
        buf.push(value as u8);
    } else if value <= 0xffff {
        buf.push(0xfd);
        buf.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffffffff {
        buf.push(0xfe);
        buf.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        buf.push(0xff);
        buf.extend_from_slice(&value.to_le_bytes());
    }
}

fn write_script(script: &[u8], buf: &mut Vec<u8>) {
    write_compact_size(script.len() as u64, buf);
    buf.extend_from_slice(script);
}

/// txid (internal byte order) + vout
fn write_outpoint(input: &UtxoInput, buf: &mut Vec<u8>) {
    let mut txid = input.txid;
    txid.reverse();
    buf.extend_from_slice(&txid);
    buf.extend_from_slice(&input.vout.to_le_bytes());
}

fn write_output(output: &UtxoOutput, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&output.value.to_le_bytes());
    write_script(&output.script_pubkey, buf);
}
