use serde_json::{json, Value};
use std::io::Write;
use std::process::{Command, Output, Stdio};

fn run_cli(args: &[&str], stdin: Option<&str>) -> Output {
    let binary_path = assert_cmd::cargo::cargo_bin!("hwsign");
    let mut child = Command::new(binary_path)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("cli starts");

    {
        let mut handle = child.stdin.take().expect("stdin is piped");
        if let Some(payload) = stdin {
            handle.write_all(payload.as_bytes()).expect("stdin accepts payload");
        }
    }

    child.wait_with_output().expect("cli run completes")
}

fn stdout_json(output: &Output) -> Value {
    assert!(output.status.success(), "cli exited unsuccessfully: {:?}", output);
    let stdout = String::from_utf8(output.stdout.clone()).expect("stdout is utf8");
    serde_json::from_str(&stdout).expect("stdout is valid json")
}

fn p2pkh_input(address_index: u32, txid_byte: &str) -> Value {
    json!({
        "txid": txid_byte.repeat(32),
        "vout": 0,
        "value": 50_000,
        "script_pubkey": format!("76a914{}88ac", "ab".repeat(20)),
        "script_type": "p2pkh",
        "key": {
            "kind": "derived",
            "public_key": format!("02{}", "11".repeat(32)),
            "address_index": address_index,
        },
    })
}

#[test]
fn der_outputs_low_s_encoding() {
    let r = format!("{}01", "00".repeat(31));
    // n - 1
    let s = "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364140";

    let output = run_cli(&["der", "--r", &r, "--s", s], None);
    assert!(output.status.success(), "cli exited unsuccessfully: {:?}", output);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "3006020101020101");
}

#[test]
fn der_rejects_zero_scalar() {
    let zero = "00".repeat(32);
    let one = format!("{}01", "00".repeat(31));

    let output = run_cli(&["der", "--r", &zero, "--s", &one], None);
    assert!(!output.status.success());
}

#[test]
fn utxo_preimage_groups_by_path() {
    let tx = json!({
        "inputs": [p2pkh_input(0, "01"), p2pkh_input(0, "02"), p2pkh_input(1, "03")],
        "outputs": [{ "value": 120_000, "script_pubkey": format!("0014{}", "cd".repeat(20)) }],
        "locktime": 0,
    });

    let output = run_cli(
        &["preimage", "--chain", "utxo", "--path", "m/44'/0'/0'"],
        Some(&tx.to_string()),
    );
    let json = stdout_json(&output);

    assert_eq!(json["device_calls"], 2);
    let groups = json["groups"].as_array().expect("groups array");
    assert_eq!(groups[0]["derivation_path"], "m/44'/0'/0'/0/0");
    assert_eq!(groups[0]["hashes"].as_array().unwrap().len(), 2);
    assert_eq!(groups[1]["derivation_path"], "m/44'/0'/0'/0/1");
    assert_eq!(groups[1]["hashes"][0]["input_index"], 2);
    assert_eq!(groups[0]["tag"]["script"], "p2pkh");
}

#[test]
fn evm_preimage_matches_eip155_vector() {
    let payload = json!({
        "transaction": {
            "chain_id": 1,
            "nonce": 9,
            "fee": { "legacy": { "gas_price": 20_000_000_000u64 } },
            "gas_limit": 21_000,
            "to": "0x3535353535353535353535353535353535353535",
            "value": 1_000_000_000_000_000_000u64,
        },
        "key": { "kind": "account", "public_key": format!("03{}", "22".repeat(32)) },
    });

    let output = run_cli(
        &["preimage", "--chain", "evm", "--path", "m/44'/60'/0'/0/0"],
        Some(&payload.to_string()),
    );
    let json = stdout_json(&output);

    assert_eq!(json["device_calls"], 1);
    assert_eq!(json["groups"][0]["derivation_path"], "m/44'/60'/0'/0/0");
    assert_eq!(
        json["groups"][0]["hashes"][0]["hash"],
        "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
    );
}

#[test]
fn unknown_network_fails() {
    let tx = json!({ "inputs": [p2pkh_input(0, "01")], "outputs": [] });
    let output = run_cli(
        &["preimage", "--chain", "utxo", "--network", "notacoin"],
        Some(&tx.to_string()),
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown network"));
}

#[test]
fn tron_preimage_rejects_bad_hex() {
    let payload = json!({
        "transaction": { "raw_data_hex": "zz" },
        "key": { "kind": "account", "public_key": format!("02{}", "33".repeat(32)) },
    });
    let output = run_cli(&["preimage", "--chain", "tron"], Some(&payload.to_string()));
    assert!(!output.status.success());
}
