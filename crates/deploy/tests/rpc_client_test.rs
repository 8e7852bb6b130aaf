//! Integration tests for the JSON-RPC network client against a local anvil node.
//!
//! These tests need the `anvil` binary on the PATH.
//! Run with: cargo test --test rpc_client_test -- --ignored

use std::{path::Path, time::Duration};

use alloy::{node_bindings::Anvil, primitives::Address};
use marketplace_deploy::{
    ArtifactStore, DeployRequest, DeploymentError, EnvSnapshot, NetworkClient, NetworkProfile,
    ProjectConfig, RpcNetworkClient, accounts, network::Endpoint,
};

/// Initcode returning a one-byte runtime (`0x00`).
const STORE_BYTECODE: &str = "0x6001600c60003960016000f300";
/// Initcode that reverts immediately.
const REVERTING_BYTECODE: &str = "0x60006000fd";

fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init()
        .ok();
}

/// Write a minimal Hardhat artifact for `name` below `root`.
fn write_artifact(root: &Path, name: &str, bytecode: &str) {
    let dir = root.join(format!("contracts/{name}.sol"));
    std::fs::create_dir_all(&dir).unwrap();

    let artifact = serde_json::json!({
        "_format": "hh-sol-artifact-1",
        "contractName": name,
        "sourceName": format!("contracts/{name}.sol"),
        "abi": [],
        "bytecode": bytecode,
        "deployedBytecode": "0x00",
        "linkReferences": {},
        "deployedLinkReferences": {}
    });
    std::fs::write(dir.join(format!("{name}.json")), artifact.to_string()).unwrap();
}

/// Test setup: a temporary artifacts directory with the test contracts.
struct TestContext {
    _dir: tempdir::TempDir,
    artifacts: ArtifactStore,
}

impl TestContext {
    fn new() -> Self {
        init_test_tracing();
        let dir = tempdir::TempDir::new("rpc-client").unwrap();
        let root = dir.path().join("artifacts");
        write_artifact(&root, "Store", STORE_BYTECODE);
        write_artifact(&root, "Reverting", REVERTING_BYTECODE);
        Self {
            _dir: dir,
            artifacts: ArtifactStore::new(root),
        }
    }

    fn connect(&self, network: &NetworkProfile, timeout: Duration) -> RpcNetworkClient {
        RpcNetworkClient::connect(network, self.artifacts.clone(), timeout)
            .expect("client connects")
    }
}

fn http_network(url: url::Url, chain_id: u64, confirmations: u64) -> NetworkProfile {
    NetworkProfile {
        name: "localhost".to_string(),
        chain_id,
        endpoint: Endpoint::Http(url),
        credentials: accounts::dev_accounts("localhost").unwrap(),
        confirmations,
    }
}

#[tokio::test]
#[ignore] // Requires anvil
async fn test_deploy_on_ephemeral_network() {
    let ctx = TestContext::new();
    let network = ProjectConfig::default()
        .resolve_active_network("hardhat", &EnvSnapshot::default())
        .unwrap();
    assert!(network.endpoint.is_ephemeral());

    let client = ctx.connect(&network, Duration::from_secs(30));
    let receipt = client
        .deploy(DeployRequest {
            contract: "Store",
            args: &[],
            from: &network.credentials[0],
            wait_confirmations: network.confirmations,
        })
        .await
        .unwrap();

    assert_ne!(receipt.address, Address::ZERO);
    assert!(receipt.gas_used > 0);
    assert!(receipt.block_number.is_some());
    // Automine: the head is the mining block, one confirmation observed.
    assert_eq!(receipt.confirmations, 1);
}

#[tokio::test]
#[ignore] // Requires anvil
async fn test_chain_id_mismatch_sends_nothing() {
    let ctx = TestContext::new();
    let anvil = Anvil::new().try_spawn().unwrap();
    let network = http_network(anvil.endpoint_url(), 1, 1);

    let client = ctx.connect(&network, Duration::from_secs(30));
    let err = client
        .deploy(DeployRequest {
            contract: "Store",
            args: &[],
            from: &network.credentials[0],
            wait_confirmations: 1,
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DeploymentError::ChainIdMismatch {
            expected: 1,
            actual: 31337
        }
    ));
}

#[tokio::test]
#[ignore] // Requires anvil
async fn test_confirmation_wait_is_bounded() {
    let ctx = TestContext::new();
    // Automine produces no block after the deployment, so a third confirmation never comes.
    let anvil = Anvil::new().try_spawn().unwrap();
    let network = http_network(anvil.endpoint_url(), anvil.chain_id(), 3);

    let client = ctx.connect(&network, Duration::from_secs(2));
    let err = client
        .deploy(DeployRequest {
            contract: "Store",
            args: &[],
            from: &network.credentials[0],
            wait_confirmations: 3,
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DeploymentError::ConfirmationTimeout {
            confirmations: 3,
            timeout_secs: 2
        }
    ));
}

#[tokio::test]
#[ignore] // Requires anvil
async fn test_reverting_constructor_fails() {
    let ctx = TestContext::new();
    let anvil = Anvil::new().try_spawn().unwrap();
    let network = http_network(anvil.endpoint_url(), anvil.chain_id(), 1);

    let client = ctx.connect(&network, Duration::from_secs(30));
    let err = client
        .deploy(DeployRequest {
            contract: "Reverting",
            args: &[],
            from: &network.credentials[0],
            wait_confirmations: 1,
        })
        .await
        .unwrap_err();

    // Gas estimation usually rejects it before a transaction is sent.
    assert!(
        matches!(err, DeploymentError::Reverted { .. } | DeploymentError::Rpc(_)),
        "{err:?}"
    );
}
