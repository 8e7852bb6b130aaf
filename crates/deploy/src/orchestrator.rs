//! The deploy-then-verify sequence.

use serde::Serialize;

use crate::{
    accounts::{DEPLOYER, NamedAccounts},
    client::{DeployRequest, NetworkClient},
    config::{EnvSnapshot, ProjectConfig},
    error::{DeploymentError, VerificationError},
    network::NetworkProfile,
    record::{DeploymentRecord, VerificationRequest},
    verify::VerificationService,
};

const SEPARATOR: &str = "----------------------------------------------------";

/// Whether a deployment on `network` gets its source verified.
///
/// True only off the development networks and with a non-empty explorer API key.
pub fn should_verify(network: &str, development_networks: &[String], api_key: Option<&str>) -> bool {
    let is_development = development_networks.iter().any(|n| n == network);
    let has_key = api_key.is_some_and(|key| !key.trim().is_empty());
    !is_development && has_key
}

/// How the verification phase ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum VerificationStatus {
    /// The guard did not hold.
    Skipped,
    Verified,
    AlreadyVerified,
    #[strum(to_string = "failed: {0}")]
    Failed(String),
}

impl From<Result<(), VerificationError>> for VerificationStatus {
    fn from(result: Result<(), VerificationError>) -> Self {
        match result {
            Ok(()) => Self::Verified,
            Err(VerificationError::AlreadyVerified { .. }) => Self::AlreadyVerified,
            Err(e) => Self::Failed(e.to_string()),
        }
    }
}

/// A successful deployment and what happened to its verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentOutcome {
    pub record: DeploymentRecord,
    pub verification: VerificationStatus,
}

/// Settings the orchestrator reads for a run.
#[derive(Debug, Clone, Default)]
pub struct RunSettings {
    pub development_networks: Vec<String>,
    pub named_accounts: NamedAccounts,
    /// Explorer API key for the active network, already expanded.
    pub explorer_api_key: Option<String>,
}

impl RunSettings {
    pub fn from_config(config: &ProjectConfig, network: &str, env: &EnvSnapshot) -> Self {
        Self {
            development_networks: config.development_networks.clone(),
            named_accounts: config.named_accounts.clone(),
            explorer_api_key: config.explorer_api_key(network, env),
        }
    }
}

/// Runs a deployment through a [`NetworkClient`] and, when allowed, verifies it
/// through a [`VerificationService`].
pub struct Orchestrator<C, V> {
    client: C,
    verifier: V,
    settings: RunSettings,
}

impl<C: NetworkClient, V: VerificationService> Orchestrator<C, V> {
    pub fn new(client: C, verifier: V, settings: RunSettings) -> Self {
        Self {
            client,
            verifier,
            settings,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Deploy `contract` on `network`, then verify it if the guard holds.
    ///
    /// Verification failures are logged and reported in the outcome, never
    /// returned as errors.
    pub async fn run_deployment(
        &self,
        network: &NetworkProfile,
        contract: &str,
        args: &[String],
    ) -> Result<DeploymentOutcome, DeploymentError> {
        let record = self.deploy_contract(network, contract, args).await?;
        let verification = self.verify_if_allowed(network, &record).await;
        Ok(DeploymentOutcome {
            record,
            verification,
        })
    }

    /// The deploy phase alone: sign with the `deployer` account and wait for
    /// the network's confirmations.
    pub async fn deploy_contract(
        &self,
        network: &NetworkProfile,
        contract: &str,
        args: &[String],
    ) -> Result<DeploymentRecord, DeploymentError> {
        let deployer = self.settings.named_accounts.resolve(DEPLOYER, network)?;

        tracing::info!("{}", SEPARATOR);
        tracing::info!(
            contract = %contract,
            network = %network.name,
            deployer = %deployer.address(),
            confirmations = network.confirmations,
            "Deploying..."
        );

        let receipt = self
            .client
            .deploy(DeployRequest {
                contract,
                args,
                from: deployer,
                wait_confirmations: network.confirmations,
            })
            .await?;

        Ok(DeploymentRecord::new(
            network,
            contract,
            args,
            deployer.address(),
            &receipt,
        ))
    }

    /// The verify phase: runs only when [`should_verify`] holds for `network`.
    pub async fn verify_if_allowed(
        &self,
        network: &NetworkProfile,
        record: &DeploymentRecord,
    ) -> VerificationStatus {
        let verification = if should_verify(
            &network.name,
            &self.settings.development_networks,
            self.settings.explorer_api_key.as_deref(),
        ) {
            self.verify_record(record).await
        } else {
            tracing::debug!(network = %network.name, "Skipping verification");
            VerificationStatus::Skipped
        };

        tracing::info!("{}", SEPARATOR);
        verification
    }

    /// Verify an existing deployment. Never fails: the result is logged and returned.
    pub async fn verify_record(&self, record: &DeploymentRecord) -> VerificationStatus {
        verify_deployment(&self.verifier, record).await
    }
}

/// Verify `record` through `verifier`, logging how it went.
pub async fn verify_deployment<V: VerificationService>(
    verifier: &V,
    record: &DeploymentRecord,
) -> VerificationStatus {
    tracing::info!("Verifying the contract....");

    let request = VerificationRequest::from_record(record);
    let status = VerificationStatus::from(verifier.verify(&request).await);

    match &status {
        VerificationStatus::Verified => tracing::info!("Verification completed..."),
        VerificationStatus::AlreadyVerified => {
            tracing::info!(address = %record.address, "Contract is already verified")
        }
        VerificationStatus::Failed(reason) => {
            tracing::warn!(address = %record.address, reason = %reason, "Verification failed")
        }
        VerificationStatus::Skipped => {}
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;

    fn dev() -> Vec<String> {
        vec!["hardhat".to_string(), "localhost".to_string()]
    }

    #[test]
    fn test_should_verify() {
        assert!(should_verify("sepolia", &dev(), Some("KEY")));
        assert!(!should_verify("sepolia", &dev(), None));
        assert!(!should_verify("sepolia", &dev(), Some("")));
        assert!(!should_verify("sepolia", &dev(), Some("  ")));
        assert!(!should_verify("hardhat", &dev(), Some("KEY")));
        assert!(!should_verify("localhost", &dev(), None));
    }

    #[test]
    fn test_status_from_result() {
        assert_eq!(VerificationStatus::from(Ok(())), VerificationStatus::Verified);
        assert_eq!(
            VerificationStatus::from(Err(VerificationError::AlreadyVerified {
                address: Address::ZERO
            })),
            VerificationStatus::AlreadyVerified
        );
        let failed = VerificationStatus::from(Err(VerificationError::Rejected(
            "Invalid API Key".to_string(),
        )));
        assert_eq!(
            failed.to_string(),
            "failed: explorer rejected verification: Invalid API Key"
        );
        assert_eq!(VerificationStatus::Skipped.to_string(), "skipped");
        assert_eq!(VerificationStatus::AlreadyVerified.to_string(), "already-verified");
    }
}
