//! The network side of a deployment: send the create transaction and wait for it.

use std::{future::Future, time::Duration};

use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    node_bindings::{Anvil, AnvilInstance},
    primitives::{Address, TxHash},
    providers::{PendingTransactionError, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
};
use url::Url;

use crate::{
    accounts::Credential,
    artifact::ArtifactStore,
    error::DeploymentError,
    network::{Endpoint, NetworkProfile},
};

/// What to deploy and who signs it.
#[derive(Debug, Clone, Copy)]
pub struct DeployRequest<'a> {
    pub contract: &'a str,
    pub args: &'a [String],
    pub from: &'a Credential,
    pub wait_confirmations: u64,
}

/// Result of a confirmed deployment transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReceipt {
    pub address: Address,
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub effective_gas_price: u128,
    /// Confirmations observed once the receipt came back: the mining block
    /// counts as one, each later block adds one. At least the requested count.
    pub confirmations: u64,
}

/// Submits deployment transactions.
///
/// Fails with a [`DeploymentError`] on connectivity problems, rejected or reverted
/// transactions and confirmation timeouts.
pub trait NetworkClient {
    fn deploy(
        &self,
        request: DeployRequest<'_>,
    ) -> impl Future<Output = Result<DeployReceipt, DeploymentError>> + Send;
}

/// [`NetworkClient`] backed by a JSON-RPC node.
pub struct RpcNetworkClient {
    url: Url,
    chain_id: u64,
    artifacts: ArtifactStore,
    confirmation_timeout: Duration,
    /// Keeps the ephemeral node alive for the duration of the run.
    _node: Option<AnvilInstance>,
}

impl RpcNetworkClient {
    /// Connect to the network's node, starting a local one for ephemeral networks.
    pub fn connect(
        network: &NetworkProfile,
        artifacts: ArtifactStore,
        confirmation_timeout: Duration,
    ) -> Result<Self, DeploymentError> {
        let (url, node) = match &network.endpoint {
            Endpoint::Http(url) => (url.clone(), None),
            Endpoint::Ephemeral => {
                tracing::info!(
                    network = %network.name,
                    chain_id = network.chain_id,
                    "Starting local development node..."
                );
                let node = Anvil::new()
                    .chain_id(network.chain_id)
                    .try_spawn()
                    .map_err(|e| {
                        DeploymentError::NodeUnavailable(format!(
                            "failed to start local node (is anvil installed?): {e}"
                        ))
                    })?;
                (node.endpoint_url(), Some(node))
            }
        };

        Ok(Self {
            url,
            chain_id: network.chain_id,
            artifacts,
            confirmation_timeout,
            _node: node,
        })
    }

    async fn check_chain_id(&self, provider: &impl Provider) -> Result<(), DeploymentError> {
        let actual = provider
            .get_chain_id()
            .await
            .map_err(|e| DeploymentError::NodeUnavailable(e.to_string()))?;

        if actual != self.chain_id {
            return Err(DeploymentError::ChainIdMismatch {
                expected: self.chain_id,
                actual,
            });
        }
        Ok(())
    }
}

impl NetworkClient for RpcNetworkClient {
    async fn deploy(&self, request: DeployRequest<'_>) -> Result<DeployReceipt, DeploymentError> {
        // Everything that can fail locally fails before touching the network.
        let artifact = self.artifacts.load(request.contract)?;
        let code = artifact.creation_code(request.args)?;

        let wallet = EthereumWallet::from(request.from.signer().clone());
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(self.url.clone());

        self.check_chain_id(&provider).await?;

        let tx = TransactionRequest::default()
            .with_from(request.from.address())
            .with_deploy_code(code);

        let pending = provider.send_transaction(tx).await?;
        let tx_hash = *pending.tx_hash();
        let confirmations = request.wait_confirmations.max(1);

        tracing::info!(
            contract = %request.contract,
            tx = %tx_hash,
            confirmations,
            "Deploying contract..."
        );

        let receipt = pending
            .with_required_confirmations(confirmations)
            .with_timeout(Some(self.confirmation_timeout))
            .get_receipt()
            .await
            .map_err(|e| match e {
                PendingTransactionError::TxWatcher(_) => DeploymentError::ConfirmationTimeout {
                    confirmations,
                    timeout_secs: self.confirmation_timeout.as_secs(),
                },
                other => DeploymentError::Rpc(other.to_string()),
            })?;

        if !receipt.status() {
            return Err(DeploymentError::Reverted { tx_hash });
        }

        let address = receipt
            .contract_address
            .ok_or(DeploymentError::MissingContractAddress { tx_hash })?;

        let head = provider.get_block_number().await?;
        let observed = receipt
            .block_number
            .map(|mined| head.saturating_sub(mined) + 1)
            .unwrap_or(confirmations)
            .max(confirmations);

        tracing::info!(
            contract = %request.contract,
            address = %address,
            gas_used = receipt.gas_used,
            confirmations = observed,
            "Contract deployed"
        );

        Ok(DeployReceipt {
            address,
            tx_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            effective_gas_price: receipt.effective_gas_price,
            confirmations: observed,
        })
    }
}
