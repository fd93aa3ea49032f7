//! EVM Pre-Image Hashing
//!
//! Generates signing hashes for EVM transactions.
//! Supports Legacy (EIP-155, and pre-EIP-155 when chain id is 0) and
//! EIP-1559 (Fee Market) transactions.

use super::rlp;
use super::PreImageResult;
use serde::{Deserialize, Serialize};
use tiny_keccak::{Hasher, Keccak};

/// Access list entry (EIP-2930)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessListEntry {
    /// Contract address
    #[serde(with = "crate::serde_bytes::hex20")]
    pub address: [u8; 20],
    /// Storage keys
    #[serde(default, with = "crate::serde_bytes::hex32_vec")]
    pub storage_keys: Vec<[u8; 32]>,
}

/// Fee model, which also decides the transaction type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvmFee {
    Legacy {
        gas_price: u128,
    },
    Eip1559 {
        max_priority_fee_per_gas: u128,
        max_fee_per_gas: u128,
        #[serde(default)]
        access_list: Vec<AccessListEntry>,
    },
}

/// Unsigned EVM transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedEvmTransaction {
    /// Chain ID. 0 signs the pre-EIP-155 legacy form.
    pub chain_id: u64,
    /// Sender nonce
    pub nonce: u64,
    pub fee: EvmFee,
    pub gas_limit: u64,
    /// Recipient address (None for contract creation)
    #[serde(default, with = "crate::serde_bytes::hex20_option")]
    pub to: Option<[u8; 20]>,
    /// Value in wei
    #[serde(default)]
    pub value: u128,
    /// Call data
    #[serde(default, with = "crate::serde_bytes::hex_vec")]
    pub data: Vec<u8>,
}

impl UnsignedEvmTransaction {
    pub fn is_typed(&self) -> bool {
        matches!(self.fee, EvmFee::Eip1559 { .. })
    }

    /// EIP-155 replay protection applies to legacy transactions with a chain id
    pub fn is_replay_protected(&self) -> bool {
        !self.is_typed() && self.chain_id != 0
    }
}

/// Get the signing hash for an EVM transaction
pub fn get_evm_signing_hash(tx: &UnsignedEvmTransaction) -> PreImageResult<[u8; 32]> {
    let preimage = match &tx.fee {
        EvmFee::Legacy { gas_price } => legacy_preimage(tx, *gas_price),
        EvmFee::Eip1559 {
            max_priority_fee_per_gas,
            max_fee_per_gas,
            access_list,
        } => eip1559_preimage(tx, *max_priority_fee_per_gas, *max_fee_per_gas, access_list),
    };
    Ok(keccak256(&preimage))
}

/// RLP([nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0]),
/// or the first six fields alone when chain id is 0
fn legacy_preimage(tx: &UnsignedEvmTransaction, gas_price: u128) -> Vec<u8> {
    let mut items = vec![
        rlp::encode_u64(tx.nonce),
        rlp::encode_u128(gas_price),
        rlp::encode_u64(tx.gas_limit),
        rlp::encode_address(tx.to.as_ref()),
        rlp::encode_u128(tx.value),
        rlp::encode_bytes(&tx.data),
    ];

    if tx.chain_id != 0 {
        items.push(rlp::encode_u64(tx.chain_id));
        items.push(rlp::encode_bytes(&[]));
        items.push(rlp::encode_bytes(&[]));
    }

    rlp::encode_list(&items)
}

/// 0x02 || RLP([chainId, nonce, maxPriorityFeePerGas, maxFeePerGas, gasLimit, to, value, data, accessList])
fn eip1559_preimage(
    tx: &UnsignedEvmTransaction,
    max_priority_fee_per_gas: u128,
    max_fee_per_gas: u128,
    access_list: &[AccessListEntry],
) -> Vec<u8> {
    let items = vec![
        rlp::encode_u64(tx.chain_id),
        rlp::encode_u64(tx.nonce),
        rlp::encode_u128(max_priority_fee_per_gas),
        rlp::encode_u128(max_fee_per_gas),
        rlp::encode_u64(tx.gas_limit),
        rlp::encode_address(tx.to.as_ref()),
        rlp::encode_u128(tx.value),
        rlp::encode_bytes(&tx.data),
        encode_access_list(access_list),
    ];

    let mut typed = vec![0x02];
    typed.extend_from_slice(&rlp::encode_list(&items));
    typed
}

fn encode_access_list(list: &[AccessListEntry]) -> Vec<u8> {
    let items: Vec<Vec<u8>> = list
        .iter()
        .map(|entry| {
            let keys: Vec<Vec<u8>> = entry.storage_keys.iter().map(|k| rlp::encode_bytes(k)).collect();
            rlp::encode_list(&[rlp::encode_bytes(&entry.address), rlp::encode_list(&keys)])
        })
        .collect();
    rlp::encode_list(&items)
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}
