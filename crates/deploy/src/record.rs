//! Deployment records and the verification requests derived from them.

use std::path::PathBuf;

use alloy::primitives::{Address, TxHash};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{client::DeployReceipt, network::NetworkProfile};

/// A contract that landed on chain.
///
/// Only built from a successful [`DeployReceipt`], so `address` is always set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub network: String,
    pub chain_id: u64,
    pub contract: String,
    pub args: Vec<String>,
    pub address: Address,
    pub deployer: Address,
    pub transaction_hash: TxHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// Wei paid per unit of gas.
    #[serde(default)]
    pub effective_gas_price: u128,
    pub confirmations: u64,
    pub deployed_at: DateTime<Utc>,
}

impl DeploymentRecord {
    pub fn new(
        network: &NetworkProfile,
        contract: &str,
        args: &[String],
        deployer: Address,
        receipt: &DeployReceipt,
    ) -> Self {
        Self {
            network: network.name.clone(),
            chain_id: network.chain_id,
            contract: contract.to_string(),
            args: args.to_vec(),
            address: receipt.address,
            deployer,
            transaction_hash: receipt.tx_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            effective_gas_price: receipt.effective_gas_price,
            confirmations: receipt.confirmations,
            deployed_at: Utc::now(),
        }
    }
}

/// Request to publish the source of a deployed contract.
///
/// Can only be derived from a [`DeploymentRecord`]: verification never precedes
/// a successful deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    contract: String,
    address: Address,
    constructor_args: Vec<String>,
}

impl VerificationRequest {
    pub fn from_record(record: &DeploymentRecord) -> Self {
        Self {
            contract: record.contract.clone(),
            address: record.address,
            constructor_args: record.args.clone(),
        }
    }

    pub fn contract(&self) -> &str {
        &self.contract
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn constructor_args(&self) -> &[String] {
        &self.constructor_args
    }
}

/// Records saved as `<root>/<network>/<Contract>.json`, with the chain id in
/// `<root>/<network>/.chainId`.
#[derive(Debug, Clone)]
pub struct DeploymentStore {
    root: PathBuf,
}

const CHAIN_ID_FILENAME: &str = ".chainId";

impl DeploymentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn record_path(&self, network: &str, contract: &str) -> PathBuf {
        self.root.join(network).join(format!("{contract}.json"))
    }

    /// Save a record, returning the path written.
    pub fn save(&self, record: &DeploymentRecord) -> Result<PathBuf> {
        let dir = self.root.join(&record.network);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create deployments directory {}", dir.display()))?;

        std::fs::write(dir.join(CHAIN_ID_FILENAME), record.chain_id.to_string())
            .context("Failed to write chain id file")?;

        let path = self.record_path(&record.network, &record.contract);
        let json =
            serde_json::to_string_pretty(record).context("Failed to serialize deployment record")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write deployment record to {}", path.display()))?;

        tracing::debug!(path = %path.display(), "Deployment record saved");
        Ok(path)
    }

    /// Load the record of `contract` on `network`.
    pub fn load(&self, network: &str, contract: &str) -> Result<DeploymentRecord> {
        let path = self.record_path(network, contract);
        if !path.exists() {
            anyhow::bail!(
                "No deployment of {} recorded for network {} ({})",
                contract,
                network,
                path.display()
            );
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse deployment record {}", path.display()))
    }
}
