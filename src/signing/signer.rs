//! Hardware Signer
//!
//! Drives one signing operation end to end:
//! preimages → batch plan → sequential device calls → assembly in input order.
//!
//! Chain families form a closed set ([`ChainKind`]); each variant knows its
//! preimage builder and its signature assembler. The device is reached only
//! through the injected [`HardwareSigningGateway`].

use crate::crypto::curves::is_public_key_compressed;
use crate::error::{SignerError, SignerResult};
use crate::signing::assembler::{
    assemble_ecdsa, assemble_recoverable, assemble_schnorr, RecoveryEncoding,
};
use crate::signing::batch::{SigningGroup, SigningPlan};
use crate::signing::gateway::{HardwareSigningGateway, SignRequest};
use crate::signing::preimage::{
    get_evm_signing_hash, get_taproot_sighash, get_tron_signing_hash, get_utxo_sighash,
    EvmFee, SigHashType, UnsignedEvmTransaction, UnsignedTronTransaction,
    UnsignedUtxoTransaction,
};
use crate::types::{
    DataToSign, FinalSignature, HardwareKeyHandle, KeyRef, RawSignature, RecoverableSignature,
    ScriptOrChain, SignedScript,
};
use crate::utils::signer_config::{SignerSettings, UtxoNetwork};
use crate::{log_debug, log_error, log_info, log_warn};
use std::sync::Arc;

const MODULE: &str = "signer";

/// The chain families this signer knows, with what each needs to sign
#[derive(Debug, Clone, Copy)]
pub enum ChainKind<'a> {
    /// ECDSA inputs of a Bitcoin-family transaction. `only_input` restricts
    /// signing to one input.
    Utxo {
        tx: &'a UnsignedUtxoTransaction,
        network: UtxoNetwork,
        only_input: Option<usize>,
    },
    /// Taproot inputs, key path or one signature per listed tapleaf
    Taproot {
        tx: &'a UnsignedUtxoTransaction,
        sighash_type: SigHashType,
    },
    Evm {
        tx: &'a UnsignedEvmTransaction,
        key: &'a KeyRef,
    },
    Tron {
        tx: &'a UnsignedTronTransaction,
        key: &'a KeyRef,
    },
}

impl ChainKind<'_> {
    fn name(&self) -> &'static str {
        match self {
            ChainKind::Utxo { .. } => "utxo",
            ChainKind::Taproot { .. } => "taproot",
            ChainKind::Evm { .. } => "evm",
            ChainKind::Tron { .. } => "tron",
        }
    }

    /// Preimage stage: every hash the device must sign, in input order
    pub fn data_to_sign(&self) -> SignerResult<Vec<DataToSign>> {
        let items = match self {
            ChainKind::Utxo { tx, network, only_input } => {
                if let Some(index) = only_input {
                    let input = tx
                        .inputs
                        .get(*index)
                        .ok_or_else(|| SignerError::invalid_input("No such input").at_input(*index))?;
                    if input.script_type.is_taproot() {
                        return Err(SignerError::invalid_input("Taproot input needs Schnorr signing")
                            .at_input(*index));
                    }
                }

                let mut items = Vec::new();
                for (index, input) in tx.inputs.iter().enumerate() {
                    if input.script_type.is_taproot() || only_input.map_or(false, |only| only != index) {
                        continue;
                    }
                    let hash = get_utxo_sighash(tx, index, network)
                        .map_err(|e| SignerError::from(e).at_input(index))?;
                    items.push(DataToSign::new(
                        input.key.clone(),
                        ScriptOrChain::Script(input.script_type),
                        hash,
                        index,
                    ));
                }
                items
            }
            ChainKind::Taproot { tx, sighash_type } => {
                let mut items = Vec::new();
                for (index, input) in tx.inputs.iter().enumerate() {
                    if !input.script_type.is_taproot() {
                        continue;
                    }
                    let tag = ScriptOrChain::Script(input.script_type);
                    if input.leaf_hashes.is_empty() {
                        let hash = get_taproot_sighash(tx, index, *sighash_type, None)
                            .map_err(|e| SignerError::from(e).at_input(index))?;
                        items.push(DataToSign::new(input.key.clone(), tag, hash, index));
                    }
                    for leaf in &input.leaf_hashes {
                        let hash = get_taproot_sighash(tx, index, *sighash_type, Some(leaf))
                            .map_err(|e| SignerError::from(e).at_input(index))?;
                        items.push(DataToSign::new(input.key.clone(), tag, hash, index).with_leaf_hash(*leaf));
                    }
                }
                items
            }
            ChainKind::Evm { tx, key } => {
                let hash = get_evm_signing_hash(tx)?;
                vec![DataToSign::new((*key).clone(), ScriptOrChain::Evm, hash, 0)]
            }
            ChainKind::Tron { tx, key } => {
                let hash = get_tron_signing_hash(tx)?;
                vec![DataToSign::new((*key).clone(), ScriptOrChain::Tron, hash, 0)]
            }
        };

        // Key encodings and address indexes are checked before any device call
        for item in &items {
            is_public_key_compressed(item.key.public_key())
                .map_err(|e| SignerError::from(e).at_input(item.input_index))?;
            item.key
                .validate()
                .map_err(|e| SignerError::from(e).at_input(item.input_index))?;
        }

        Ok(items)
    }

    /// Assembly stage for one item
    pub fn assemble(&self, item: &DataToSign, raw: &RawSignature) -> SignerResult<FinalSignature> {
        match self {
            ChainKind::Utxo { tx, network, .. } => {
                let input = tx.inputs.get(item.input_index).ok_or_else(|| {
                    SignerError::invalid_input("No such input").at_input(item.input_index)
                })?;
                Ok(FinalSignature::Ecdsa(assemble_ecdsa(
                    raw,
                    network.sighash_value(),
                    input.script_type,
                    item.key.public_key(),
                    item.input_index,
                )))
            }
            ChainKind::Taproot { sighash_type, .. } => Ok(FinalSignature::Schnorr(assemble_schnorr(
                raw,
                *sighash_type,
                item.input_index,
                item.leaf_hash,
            ))),
            ChainKind::Evm { tx, .. } => {
                let encoding = match tx.fee {
                    EvmFee::Eip1559 { .. } => RecoveryEncoding::Parity,
                    EvmFee::Legacy { .. } if tx.chain_id == 0 => RecoveryEncoding::Legacy,
                    EvmFee::Legacy { .. } => RecoveryEncoding::Eip155 { chain_id: tx.chain_id },
                };
                assemble_recoverable(raw, &item.hash, item.key.public_key(), encoding, item.input_index)
                    .map(FinalSignature::Recoverable)
            }
            ChainKind::Tron { .. } => assemble_recoverable(
                raw,
                &item.hash,
                item.key.public_key(),
                RecoveryEncoding::Legacy,
                item.input_index,
            )
            .map(FinalSignature::Recoverable),
        }
    }
}

/// Signs transactions with a key held on a hardware device
pub struct HardwareSigner {
    handle: HardwareKeyHandle,
    gateway: Arc<dyn HardwareSigningGateway>,
    settings: SignerSettings,
}

impl HardwareSigner {
    pub fn new(handle: HardwareKeyHandle, gateway: Arc<dyn HardwareSigningGateway>) -> Self {
        Self {
            handle,
            gateway,
            settings: SignerSettings::default(),
        }
    }

    /// Replace the settings; invalid settings are rejected
    pub fn with_settings(mut self, settings: SignerSettings) -> SignerResult<Self> {
        settings.validate()?;
        self.settings = settings;
        Ok(self)
    }

    pub fn handle(&self) -> &HardwareKeyHandle {
        &self.handle
    }

    pub fn settings(&self) -> &SignerSettings {
        &self.settings
    }

    // MARK: - Planning

    /// Build the signing plan for `chain` without touching the device
    pub fn prepare(&self, chain: &ChainKind<'_>) -> SignerResult<SigningPlan> {
        let items = chain.data_to_sign()?;
        let plan = SigningPlan::build(items, &self.handle.derivation_path, self.settings.max_hashes_per_call);

        log_info!(
            redact = self.settings.redact_logs;
            MODULE,
            "Signing plan ready",
            chain = chain.name(),
            hash_count = plan.items().len(),
            device_calls = plan.device_call_count(),
        );
        if plan.device_call_count() > 1 && self.settings.warn_on_multiple_device_calls {
            log_warn!(
                redact = self.settings.redact_logs;
                MODULE,
                "Operation needs several device taps",
                device_calls = plan.device_call_count(),
            );
        }

        Ok(plan)
    }

    /// Plan for the ECDSA inputs of `tx`; `device_call_count()` tells how many taps it takes
    pub fn prepare_utxo_signing(
        &self,
        tx: &UnsignedUtxoTransaction,
        network: &UtxoNetwork,
    ) -> SignerResult<SigningPlan> {
        self.prepare(&ChainKind::Utxo {
            tx,
            network: *network,
            only_input: None,
        })
    }

    /// Plan for the Taproot inputs of `tx`
    pub fn prepare_schnorr_signing(
        &self,
        tx: &UnsignedUtxoTransaction,
        sighash_type: SigHashType,
    ) -> SignerResult<SigningPlan> {
        self.prepare(&ChainKind::Taproot { tx, sighash_type })
    }

    // MARK: - Device calls

    /// Run every group of `plan` through the device, one call at a time,
    /// and return raw signatures in item order.
    pub async fn execute(&self, plan: &SigningPlan) -> SignerResult<Vec<RawSignature>> {
        let mut results = Vec::with_capacity(plan.device_call_count());

        for (call, group) in plan.groups().iter().enumerate() {
            if call > 0 && !self.settings.device_cooldown.is_zero() {
                log_debug!(
                    redact = self.settings.redact_logs;
                    MODULE,
                    "Waiting for device cooldown",
                    cooldown_ms = self.settings.device_cooldown.as_millis(),
                );
                tokio::time::sleep(self.settings.device_cooldown).await;
            }
            results.push(self.sign_group(plan, group).await?);
        }

        plan.scatter(&results)
    }

    async fn sign_group(&self, plan: &SigningPlan, group: &SigningGroup) -> SignerResult<Vec<RawSignature>> {
        let hashes = plan.group_hashes(group);
        let expected = hashes.len();

        log_info!(
            redact = self.settings.redact_logs;
            MODULE,
            "Requesting device signatures",
            device_id = self.handle.device_id,
            path = group.derivation_path,
            hash_count = expected,
        );

        let request = SignRequest {
            device_id: self.handle.device_id.clone(),
            public_key: self.handle.public_key.clone(),
            derivation_path: group.derivation_path.clone(),
            hashes,
        };

        let response = self.gateway.sign(request).await.map_err(|e| {
            log_error!(
                redact = self.settings.redact_logs;
                MODULE,
                "Device call failed",
                path = group.derivation_path,
                error = e,
            );
            SignerError::from(e).with_details(format!("path {}", group.derivation_path))
        })?;

        if let Some(total) = response.total_signed_hashes {
            log_debug!(
                redact = self.settings.redact_logs;
                MODULE,
                "Device signature counter",
                total_signed_hashes = total,
            );
        }

        if response.signatures.len() != expected {
            log_error!(
                redact = self.settings.redact_logs;
                MODULE,
                "Device returned wrong number of signatures",
                expected = expected,
                actual = response.signatures.len(),
            );
            return Err(SignerError::signature_count_mismatch(expected, response.signatures.len())
                .with_details(format!("path {}", group.derivation_path)));
        }

        response
            .signatures
            .iter()
            .zip(&group.item_indices)
            .map(|(bytes, &item_index)| {
                let input_index = plan.items()[item_index].input_index;
                let raw = RawSignature::from_bytes(bytes)
                    .map_err(|e| SignerError::from(e).at_input(input_index))?;
                let checked = if group.tag.is_schnorr() {
                    raw.validate_schnorr()
                } else {
                    raw.validate()
                };
                checked.map_err(|e| SignerError::from(e).at_input(input_index))?;
                Ok(raw)
            })
            .collect()
    }

    /// Full pipeline for one chain: plan, device calls, assembly
    pub async fn sign(&self, chain: &ChainKind<'_>) -> SignerResult<Vec<FinalSignature>> {
        let plan = self.prepare(chain)?;
        self.run(chain, &plan).await
    }

    /// Execute a plan made by [`prepare`](Self::prepare) for the same `chain`.
    ///
    /// A plan whose hashes differ from what `chain` produces is rejected
    /// before the device is called.
    pub async fn sign_with_plan(
        &self,
        chain: &ChainKind<'_>,
        plan: &SigningPlan,
    ) -> SignerResult<Vec<FinalSignature>> {
        if chain.data_to_sign()? != plan.items() {
            log_error!(
                redact = self.settings.redact_logs;
                MODULE,
                "Signing plan does not match the transaction",
                chain = chain.name(),
            );
            return Err(SignerError::invalid_input(
                "Signing plan was prepared for a different transaction",
            ));
        }
        self.run(chain, plan).await
    }

    async fn run(&self, chain: &ChainKind<'_>, plan: &SigningPlan) -> SignerResult<Vec<FinalSignature>> {
        let raw = self.execute(plan).await?;

        plan.items()
            .iter()
            .zip(&raw)
            .map(|(item, raw)| {
                chain.assemble(item, raw).map_err(|e| {
                    log_error!(
                        redact = self.settings.redact_logs;
                        MODULE,
                        "Signature assembly failed",
                        input = item.input_index,
                        error = e,
                    );
                    e
                })
            })
            .collect()
    }

    // MARK: - Exposed operations

    /// Sign every ECDSA input; results are in input order
    pub async fn sign_utxo_inputs(
        &self,
        tx: &UnsignedUtxoTransaction,
        network: &UtxoNetwork,
    ) -> SignerResult<Vec<SignedScript>> {
        let chain = ChainKind::Utxo {
            tx,
            network: *network,
            only_input: None,
        };
        scripts(self.sign(&chain).await?)
    }

    /// Sign a single ECDSA input with one device call
    pub async fn sign_utxo_input(
        &self,
        tx: &UnsignedUtxoTransaction,
        network: &UtxoNetwork,
        input_index: usize,
    ) -> SignerResult<SignedScript> {
        let chain = ChainKind::Utxo {
            tx,
            network: *network,
            only_input: Some(input_index),
        };
        scripts(self.sign(&chain).await?)?
            .pop()
            .ok_or_else(|| SignerError::internal("No signature produced").at_input(input_index))
    }

    /// Sign every Taproot input (one entry per key path or tapleaf)
    pub async fn sign_schnorr_inputs(
        &self,
        tx: &UnsignedUtxoTransaction,
        sighash_type: SigHashType,
    ) -> SignerResult<Vec<SignedScript>> {
        scripts(self.sign(&ChainKind::Taproot { tx, sighash_type }).await?)
    }

    pub async fn sign_evm_transaction(
        &self,
        tx: &UnsignedEvmTransaction,
        key: &KeyRef,
    ) -> SignerResult<RecoverableSignature> {
        single_recoverable(self.sign(&ChainKind::Evm { tx, key }).await?)
    }

    /// Tron signature as `r || s || v`
    pub async fn sign_tron_transaction(
        &self,
        tx: &UnsignedTronTransaction,
        key: &KeyRef,
    ) -> SignerResult<Vec<u8>> {
        let signature = single_recoverable(self.sign(&ChainKind::Tron { tx, key }).await?)?;
        Ok(signature.to_rsv_bytes().to_vec())
    }
}

fn scripts(signatures: Vec<FinalSignature>) -> SignerResult<Vec<SignedScript>> {
    signatures
        .into_iter()
        .map(|signature| match signature {
            FinalSignature::Ecdsa(script) | FinalSignature::Schnorr(script) => Ok(script),
            FinalSignature::Recoverable(_) => Err(SignerError::internal("Expected a script signature")),
        })
        .collect()
}

fn single_recoverable(signatures: Vec<FinalSignature>) -> SignerResult<RecoverableSignature> {
    match signatures.as_slice() {
        [FinalSignature::Recoverable(signature)] => Ok(*signature),
        _ => Err(SignerError::internal("Expected exactly one recoverable signature")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::signing::gateway::{DeviceError, DeviceErrorKind, SignResponse};
    use crate::signing::preimage::{ScriptType, UtxoInput, UtxoOutput};
    use crate::wallet::derivation_path::DerivationPath;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Gateway that returns canned signatures and records requests
    #[derive(Default)]
    struct ScriptedGateway {
        requests: Mutex<Vec<SignRequest>>,
        fail_with: Option<DeviceError>,
        drop_one: bool,
    }

    #[async_trait]
    impl HardwareSigningGateway for ScriptedGateway {
        async fn sign(&self, request: SignRequest) -> Result<SignResponse, DeviceError> {
            let count = request.hashes.len();
            self.requests.lock().unwrap().push(request);
            if let Some(err) = &self.fail_with {
                return Err(err.clone());
            }
            let mut signatures: Vec<Vec<u8>> = (0..count)
                .map(|i| {
                    let mut sig = vec![0x11u8; 64];
                    sig[63] = i as u8 + 1;
                    sig
                })
                .collect();
            if self.drop_one {
                signatures.pop();
            }
            Ok(SignResponse::new(signatures).with_total_signed_hashes(42))
        }
    }

    fn handle() -> HardwareKeyHandle {
        HardwareKeyHandle::new(vec![0x02; 33], DerivationPath::master(), "card-1")
    }

    fn signer(gateway: Arc<ScriptedGateway>) -> HardwareSigner {
        HardwareSigner::new(handle(), gateway)
            .with_settings(SignerSettings::fast())
            .unwrap()
    }

    fn input(address_index: u32, script_type: ScriptType) -> UtxoInput {
        UtxoInput {
            txid: [address_index as u8; 32],
            vout: 0,
            value: 10_000,
            sequence: 0xffffffff,
            script_pubkey: vec![0x76, 0xa9, 0x14],
            script_type,
            key: KeyRef::derived(vec![0x03; 33], address_index, false),
            redeem_script: Vec::new(),
            leaf_hashes: Vec::new(),
        }
    }

    fn tx(inputs: Vec<UtxoInput>) -> UnsignedUtxoTransaction {
        UnsignedUtxoTransaction {
            version: 2,
            inputs,
            outputs: vec![UtxoOutput { value: 9_000, script_pubkey: vec![0x00, 0x14] }],
            locktime: 0,
        }
    }

    #[tokio::test]
    async fn test_two_paths_two_device_calls() {
        let gateway = Arc::new(ScriptedGateway::default());
        let signer = signer(gateway.clone());
        let tx = tx(vec![
            input(0, ScriptType::P2WPKH),
            input(0, ScriptType::P2WPKH),
            input(1, ScriptType::P2WPKH),
        ]);

        let signed = signer.sign_utxo_inputs(&tx, &UtxoNetwork::bitcoin()).await.unwrap();
        assert_eq!(signed.len(), 3);
        assert_eq!(signed.iter().map(|s| s.input_index).collect::<Vec<_>>(), vec![0, 1, 2]);

        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].derivation_path.to_string(), "m/0/0");
        assert_eq!(requests[0].hashes.len(), 2);
        assert_eq!(requests[1].derivation_path.to_string(), "m/0/1");
        assert_eq!(requests[0].device_id, "card-1");
    }

    #[tokio::test]
    async fn test_prepare_does_not_call_device() {
        let gateway = Arc::new(ScriptedGateway::default());
        let signer = signer(gateway.clone());
        let tx = tx(vec![input(0, ScriptType::P2PKH), input(1, ScriptType::P2PKH)]);

        let plan = signer.prepare_utxo_signing(&tx, &UtxoNetwork::bitcoin()).unwrap();
        assert_eq!(plan.device_call_count(), 2);
        assert!(gateway.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_device_error_surfaces_unchanged() {
        let device_error = DeviceError::new(DeviceErrorKind::UserCancelled, "cancelled");
        let gateway = Arc::new(ScriptedGateway {
            fail_with: Some(device_error.clone()),
            ..Default::default()
        });
        let signer = signer(gateway.clone());
        let tx = tx(vec![input(0, ScriptType::P2PKH), input(1, ScriptType::P2PKH)]);

        let err = signer.sign_utxo_inputs(&tx, &UtxoNetwork::bitcoin()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DeviceFailure);
        assert_eq!(err.device_error(), Some(&device_error));
        // No retry, and the second group is never attempted
        assert_eq!(gateway.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_short_response_is_fatal() {
        let gateway = Arc::new(ScriptedGateway {
            drop_one: true,
            ..Default::default()
        });
        let signer = signer(gateway);
        let tx = tx(vec![input(0, ScriptType::P2PKH), input(0, ScriptType::P2PKH)]);

        let err = signer.sign_utxo_inputs(&tx, &UtxoNetwork::bitcoin()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SignatureCountMismatch);
    }

    #[tokio::test]
    async fn test_malformed_key_rejected_before_device() {
        let gateway = Arc::new(ScriptedGateway::default());
        let signer = signer(gateway.clone());
        let mut bad = input(0, ScriptType::P2PKH);
        bad.key = KeyRef::derived(vec![0x05; 33], 0, false);
        let tx = tx(vec![input(1, ScriptType::P2PKH), bad]);

        let err = signer.sign_utxo_inputs(&tx, &UtxoNetwork::bitcoin()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedPublicKey);
        assert_eq!(err.input_index, Some(1));
        assert!(gateway.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_input_signing() {
        let gateway = Arc::new(ScriptedGateway::default());
        let signer = signer(gateway.clone());
        let tx = tx(vec![input(0, ScriptType::P2PKH), input(1, ScriptType::P2PKH)]);

        let signed = signer.sign_utxo_input(&tx, &UtxoNetwork::bitcoin(), 1).await.unwrap();
        assert_eq!(signed.input_index, 1);
        assert_eq!(gateway.requests.lock().unwrap().len(), 1);

        let err = signer.sign_utxo_input(&tx, &UtxoNetwork::bitcoin(), 7).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[tokio::test]
    async fn test_max_hashes_per_call() {
        let gateway = Arc::new(ScriptedGateway::default());
        let signer = HardwareSigner::new(handle(), gateway.clone())
            .with_settings(SignerSettings::fast().with_max_hashes_per_call(1))
            .unwrap();
        let tx = tx(vec![input(0, ScriptType::P2PKH), input(0, ScriptType::P2PKH)]);

        signer.sign_utxo_inputs(&tx, &UtxoNetwork::bitcoin()).await.unwrap();
        assert_eq!(gateway.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_taproot_inputs_skipped_by_ecdsa_path() {
        let gateway = Arc::new(ScriptedGateway::default());
        let signer = signer(gateway.clone());
        let tx = tx(vec![input(0, ScriptType::P2TR), input(1, ScriptType::P2WPKH)]);

        let signed = signer.sign_utxo_inputs(&tx, &UtxoNetwork::bitcoin()).await.unwrap();
        assert_eq!(signed.len(), 1);
        assert_eq!(signed[0].input_index, 1);

        let err = signer.sign_utxo_input(&tx, &UtxoNetwork::bitcoin(), 0).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[tokio::test]
    async fn test_schnorr_leaf_hashes_expand() {
        let gateway = Arc::new(ScriptedGateway::default());
        let signer = signer(gateway.clone());
        let mut taproot = input(0, ScriptType::P2TR);
        taproot.leaf_hashes = vec![[0x01; 32], [0x02; 32]];
        let tx = tx(vec![taproot, input(1, ScriptType::P2TR)]);

        let signed = signer.sign_schnorr_inputs(&tx, SigHashType::Default).await.unwrap();
        assert_eq!(signed.len(), 3);
        assert_eq!(signed[0].input_index, 0);
        assert_eq!(signed[1].input_index, 0);
        assert_eq!(signed[2].input_index, 1);
        assert!(signed[0].leaf_hash.is_some());
        assert!(signed[2].leaf_hash.is_none());
        assert_eq!(signed[2].signature().len(), 64);
    }

    #[tokio::test]
    async fn test_empty_plan_makes_no_calls() {
        let gateway = Arc::new(ScriptedGateway::default());
        let signer = signer(gateway.clone());
        let tx = tx(vec![input(0, ScriptType::P2TR)]);

        let signed = signer.sign_utxo_inputs(&tx, &UtxoNetwork::bitcoin()).await.unwrap();
        assert!(signed.is_empty());
        assert!(gateway.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_device_signature_rejected() {
        struct ZeroGateway;

        #[async_trait]
        impl HardwareSigningGateway for ZeroGateway {
            async fn sign(&self, request: SignRequest) -> Result<SignResponse, DeviceError> {
                Ok(SignResponse::new(vec![vec![0u8; 64]; request.hashes.len()]))
            }
        }

        let signer = HardwareSigner::new(handle(), Arc::new(ZeroGateway))
            .with_settings(SignerSettings::fast())
            .unwrap();
        let tx = tx(vec![input(0, ScriptType::P2PKH)]);

        let err = signer.sign_utxo_inputs(&tx, &UtxoNetwork::bitcoin()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidSignature);
        assert_eq!(err.input_index, Some(0));
    }

    #[tokio::test]
    async fn test_plan_for_other_transaction_rejected() {
        let gateway = Arc::new(ScriptedGateway::default());
        let signer = signer(gateway.clone());
        let network = UtxoNetwork::bitcoin();
        let three = tx(vec![
            input(0, ScriptType::P2PKH),
            input(1, ScriptType::P2PKH),
            input(2, ScriptType::P2PKH),
        ]);
        let one = tx(vec![input(0, ScriptType::P2PKH)]);

        let plan = signer.prepare_utxo_signing(&three, &network).unwrap();
        let chain = ChainKind::Utxo {
            tx: &one,
            network,
            only_input: None,
        };

        let err = signer.sign_with_plan(&chain, &plan).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert!(gateway.requests.lock().unwrap().is_empty());

        // Matching plan still signs
        let chain = ChainKind::Utxo {
            tx: &three,
            network,
            only_input: None,
        };
        assert_eq!(signer.sign_with_plan(&chain, &plan).await.unwrap().len(), 3);
    }

    #[test]
    fn test_assemble_unknown_input_is_an_error() {
        let one = tx(vec![input(0, ScriptType::P2PKH)]);
        let chain = ChainKind::Utxo {
            tx: &one,
            network: UtxoNetwork::bitcoin(),
            only_input: None,
        };
        let item = DataToSign::new(
            KeyRef::derived(vec![0x03; 33], 1, false),
            ScriptOrChain::Script(ScriptType::P2PKH),
            [0x01; 32],
            1,
        );
        let raw = RawSignature { r: [0x11; 32], s: [0x22; 32] };

        let err = chain.assemble(&item, &raw).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert_eq!(err.input_index, Some(1));
    }

    #[tokio::test]
    async fn test_hardened_address_index_rejected_before_device() {
        let gateway = Arc::new(ScriptedGateway::default());
        let signer = signer(gateway.clone());
        let mut hardened = input(0, ScriptType::P2WPKH);
        hardened.key = KeyRef::derived(vec![0x03; 33], crate::wallet::HARDENED, false);
        let tx = tx(vec![input(0, ScriptType::P2WPKH), hardened]);

        let err = signer.sign_utxo_inputs(&tx, &UtxoNetwork::bitcoin()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidDerivationPath);
        assert_eq!(err.input_index, Some(1));
        assert!(gateway.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_settings_do_not_touch_global_redaction() {
        let settings = SignerSettings {
            redact_logs: false,
            ..SignerSettings::fast()
        };
        let signer = HardwareSigner::new(handle(), Arc::new(ScriptedGateway::default()))
            .with_settings(settings)
            .unwrap();

        assert!(!signer.settings().redact_logs);
        assert!(crate::utils::logging::is_redaction_enabled());
    }

    /// Returns `r = n`, a valid BIP-340 x coordinate but not an ECDSA scalar
    struct HighRGateway;

    #[async_trait]
    impl HardwareSigningGateway for HighRGateway {
        async fn sign(&self, request: SignRequest) -> Result<SignResponse, DeviceError> {
            let mut signature = crate::crypto::curves::CURVE_ORDER.to_vec();
            signature.extend_from_slice(&[0x11; 32]);
            Ok(SignResponse::new(vec![signature; request.hashes.len()]))
        }
    }

    #[tokio::test]
    async fn test_schnorr_r_range_differs_from_ecdsa() {
        let signer = HardwareSigner::new(handle(), Arc::new(HighRGateway))
            .with_settings(SignerSettings::fast())
            .unwrap();
        let tx = tx(vec![input(0, ScriptType::P2TR), input(1, ScriptType::P2WPKH)]);

        let signed = signer.sign_schnorr_inputs(&tx, SigHashType::Default).await.unwrap();
        assert_eq!(&signed[0].signature()[..32], &crate::crypto::curves::CURVE_ORDER[..]);

        let err = signer.sign_utxo_inputs(&tx, &UtxoNetwork::bitcoin()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidSignature);
        assert_eq!(err.input_index, Some(1));
    }
}
