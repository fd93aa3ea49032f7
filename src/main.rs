use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use hardware_signer::signing::preimage::{
    SigHashType, UnsignedEvmTransaction, UnsignedTronTransaction, UnsignedUtxoTransaction,
};
use hardware_signer::utils::logging;
use hardware_signer::{
    canonicalise, encode_der, ChainKind, DerivationPath, KeyRef, RawSignature, SigningPlan,
    UtxoNetwork,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::io::{self, Read};

#[derive(Parser)]
#[command(name = "hwsign")]
#[command(about = "Inspect what a hardware signer would be asked to sign", long_about = None)]
struct Cli {
    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the hashes an unsigned transaction needs, grouped by device call
    Preimage {
        #[arg(long, value_enum)]
        chain: Chain,

        /// JSON file, or `-` for stdin
        #[arg(long, default_value = "-")]
        input: String,

        /// UTXO network preset (bitcoin, litecoin, dogecoin, dash, bch, ecash, btg)
        #[arg(long, default_value = "bitcoin")]
        network: String,

        /// Derivation path template of the device key
        #[arg(long, default_value = "m")]
        path: String,

        /// Taproot sighash type (default, all, none, single, all_anyone_can_pay, ...)
        #[arg(long, default_value = "default")]
        sighash: String,

        /// Split groups larger than this into several device calls
        #[arg(long)]
        max_per_call: Option<usize>,
    },

    /// Print the canonical (low-S) DER encoding of a raw signature
    Der {
        /// 32-byte r, hex
        #[arg(long)]
        r: String,

        /// 32-byte s, hex
        #[arg(long)]
        s: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Chain {
    Utxo,
    Taproot,
    Evm,
    Tron,
}

/// Account-model input: the transaction plus the key that signs it
#[derive(Deserialize)]
struct KeyedTransaction<T> {
    transaction: T,
    key: KeyRef,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        logging::enable_debug();
    }

    match cli.command {
        Commands::Preimage {
            chain,
            input,
            network,
            path,
            sighash,
            max_per_call,
        } => preimage(chain, &input, &network, &path, &sighash, max_per_call),
        Commands::Der { r, s } => der(&r, &s),
    }
}

fn preimage(
    chain: Chain,
    input: &str,
    network: &str,
    path: &str,
    sighash: &str,
    max_per_call: Option<usize>,
) -> Result<()> {
    let payload = read_input(input)?;
    let template = DerivationPath::parse(path).with_context(|| format!("invalid path template {path}"))?;

    let plan = match chain {
        Chain::Utxo => {
            let network = UtxoNetwork::by_name(network).ok_or_else(|| anyhow!("unknown network {network}"))?;
            let tx: UnsignedUtxoTransaction = parse(&payload)?;
            plan_for(
                ChainKind::Utxo {
                    tx: &tx,
                    network,
                    only_input: None,
                },
                &template,
                max_per_call,
            )?
        }
        Chain::Taproot => {
            let sighash_type: SigHashType = serde_json::from_value(json!(sighash))
                .map_err(|_| anyhow!("unknown sighash type {sighash}"))?;
            let tx: UnsignedUtxoTransaction = parse(&payload)?;
            plan_for(ChainKind::Taproot { tx: &tx, sighash_type }, &template, max_per_call)?
        }
        Chain::Evm => {
            let keyed: KeyedTransaction<UnsignedEvmTransaction> = parse(&payload)?;
            plan_for(
                ChainKind::Evm {
                    tx: &keyed.transaction,
                    key: &keyed.key,
                },
                &template,
                max_per_call,
            )?
        }
        Chain::Tron => {
            let keyed: KeyedTransaction<UnsignedTronTransaction> = parse(&payload)?;
            plan_for(
                ChainKind::Tron {
                    tx: &keyed.transaction,
                    key: &keyed.key,
                },
                &template,
                max_per_call,
            )?
        }
    };

    let groups: Vec<_> = plan
        .groups()
        .iter()
        .map(|group| {
            let items: Vec<_> = group
                .item_indices
                .iter()
                .map(|&i| {
                    let item = &plan.items()[i];
                    json!({
                        "input_index": item.input_index,
                        "hash": hex::encode(item.hash),
                        "leaf_hash": item.leaf_hash.map(|leaf| hex::encode(leaf.0)),
                    })
                })
                .collect();
            json!({
                "derivation_path": group.derivation_path,
                "tag": group.tag,
                "hashes": items,
            })
        })
        .collect();

    let output = json!({
        "device_calls": plan.device_call_count(),
        "groups": groups,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn plan_for(chain: ChainKind<'_>, template: &DerivationPath, max_per_call: Option<usize>) -> Result<SigningPlan> {
    if max_per_call == Some(0) {
        bail!("--max-per-call must be at least 1");
    }
    let items = chain.data_to_sign()?;
    Ok(SigningPlan::build(items, template, max_per_call))
}

fn der(r: &str, s: &str) -> Result<()> {
    let mut bytes = decode_scalar(r).context("invalid r")?.to_vec();
    bytes.extend_from_slice(&decode_scalar(s).context("invalid s")?);

    let raw = RawSignature::from_bytes(&bytes)?;
    raw.validate()?;
    let canonical = canonicalise(&raw);
    println!("{}", hex::encode(encode_der(&canonical.r, &canonical.s)));
    Ok(())
}

fn decode_scalar(value: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(value.trim_start_matches("0x"))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow!("expected 32 bytes, got {}", b.len()))
}

fn parse<T: DeserializeOwned>(payload: &str) -> Result<T> {
    serde_json::from_str(payload).context("input is not a valid unsigned transaction")
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        fs::read_to_string(input).with_context(|| format!("cannot read {input}"))
    }
}
