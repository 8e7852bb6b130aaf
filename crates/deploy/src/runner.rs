//! Runs the deploy scripts selected by tag.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::{
    artifact::ArtifactStore,
    client::NetworkClient,
    config::{GasReporterConfig, ProjectConfig},
    error::DeploymentError,
    network::NetworkProfile,
    orchestrator::{DeploymentOutcome, Orchestrator},
    record::DeploymentStore,
    report,
    scripts::{self, DeployScript},
    verify::VerificationService,
};

/// Everything around the deployments themselves: preflight, persistence and reports.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub artifacts: ArtifactStore,
    /// Compiler version every artifact must come from.
    pub solidity: String,
    /// Where records are saved. `None` disables persistence.
    pub deployments: Option<DeploymentStore>,
    pub gas_reporter: GasReporterConfig,
    pub contract_sizer: bool,
}

impl RunOptions {
    /// Options for `network`. Deployments on ephemeral networks are not saved.
    pub fn from_config(config: &ProjectConfig, network: &NetworkProfile) -> Self {
        Self {
            artifacts: ArtifactStore::new(&config.artifacts),
            solidity: config.solidity.clone(),
            deployments: (!network.endpoint.is_ephemeral())
                .then(|| DeploymentStore::new(&config.deployments)),
            gas_reporter: config.gas_reporter.clone(),
            contract_sizer: config.contract_sizer.enabled,
        }
    }
}

/// Run every script matching `tags` (all scripts when empty), in order.
///
/// Artifacts of every selected script are checked before the first transaction
/// is sent. The first failed deployment stops the run.
pub async fn run_scripts<C, V>(
    orchestrator: &Orchestrator<C, V>,
    network: &NetworkProfile,
    scripts: &[DeployScript],
    tags: &[String],
    options: &RunOptions,
) -> Result<Vec<DeploymentOutcome>>
where
    C: NetworkClient,
    V: VerificationService,
{
    let selected = scripts::select(scripts, tags);
    if selected.is_empty() {
        tracing::warn!(tags = ?tags, "No deploy script selected, nothing to do");
        return Ok(Vec::new());
    }

    let mut artifacts = Vec::with_capacity(selected.len());
    for script in &selected {
        let artifact = options
            .artifacts
            .load(&script.contract)
            .map_err(DeploymentError::from)?;
        options
            .artifacts
            .check_compiler(&artifact, &options.solidity)
            .map_err(DeploymentError::from)?;
        artifacts.push(artifact);
    }

    if options.contract_sizer {
        report::emit(
            "Contract sizes",
            &report::size_report(&artifacts, options.gas_reporter.no_colors),
            None,
        )?;
    }

    let mut outcomes = Vec::with_capacity(selected.len());
    for script in selected {
        let record = orchestrator
            .deploy_contract(network, &script.contract, &script.args)
            .await?;

        // The record must be on disk before the explorer is contacted.
        if let Some(store) = &options.deployments {
            store.save(&record).with_context(|| {
                format!(
                    "{} was deployed at {} but its record could not be saved",
                    record.contract, record.address
                )
            })?;
        }

        let verification = orchestrator.verify_if_allowed(network, &record).await;

        tracing::info!(
            contract = %record.contract,
            address = %record.address,
            verification = %verification,
            "Deploy script completed"
        );
        outcomes.push(DeploymentOutcome {
            record,
            verification,
        });
    }

    if options.gas_reporter.enabled {
        let records: Vec<_> = outcomes.iter().map(|o| o.record.clone()).collect();
        let output: Option<PathBuf> = options.gas_reporter.output_file.clone();
        report::emit(
            "Gas report",
            &report::gas_report(&records, options.gas_reporter.no_colors),
            output.as_deref(),
        )?;
    }

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use std::{
        path::PathBuf,
        sync::{Arc, Mutex},
    };

    use alloy::primitives::{Address, TxHash};

    use super::*;
    use crate::{
        accounts::{self, NamedAccount, NamedAccounts},
        artifact::fixtures,
        client::{DeployReceipt, DeployRequest},
        error::{ConfigurationError, VerificationError},
        network::Endpoint,
        orchestrator::{RunSettings, VerificationStatus},
        record::VerificationRequest,
    };

    #[derive(Default)]
    struct RecordingClient {
        deployed: Mutex<Vec<String>>,
    }

    impl NetworkClient for RecordingClient {
        async fn deploy(&self, request: DeployRequest<'_>) -> Result<DeployReceipt, DeploymentError> {
            let mut deployed = self.deployed.lock().unwrap();
            deployed.push(request.contract.to_string());
            Ok(DeployReceipt {
                address: Address::repeat_byte(deployed.len() as u8),
                tx_hash: TxHash::repeat_byte(0xee),
                block_number: Some(1),
                gas_used: 21_000,
                effective_gas_price: 1_000_000_000,
                confirmations: request.wait_confirmations,
            })
        }
    }

    struct NoVerifier;

    impl VerificationService for NoVerifier {
        async fn verify(&self, _: &VerificationRequest) -> Result<(), VerificationError> {
            Ok(())
        }
    }

    fn network(endpoint: Endpoint) -> NetworkProfile {
        NetworkProfile {
            name: "localhost".to_string(),
            chain_id: 31337,
            endpoint,
            credentials: accounts::dev_accounts("localhost").unwrap(),
            confirmations: 1,
        }
    }

    /// Records whether the deployment record was on disk when verification started.
    struct RecordCheckingVerifier {
        record_path: PathBuf,
        saw_record: Arc<Mutex<Option<bool>>>,
    }

    impl VerificationService for RecordCheckingVerifier {
        async fn verify(&self, _: &VerificationRequest) -> Result<(), VerificationError> {
            *self.saw_record.lock().unwrap() = Some(self.record_path.exists());
            Ok(())
        }
    }

    fn orchestrator_with<V: VerificationService>(
        verifier: V,
        development_networks: Vec<String>,
        explorer_api_key: Option<&str>,
    ) -> Orchestrator<RecordingClient, V> {
        let mut named_accounts = NamedAccounts::default();
        named_accounts.insert(accounts::DEPLOYER, NamedAccount::default());
        Orchestrator::new(
            RecordingClient::default(),
            verifier,
            RunSettings {
                development_networks,
                named_accounts,
                explorer_api_key: explorer_api_key.map(str::to_string),
            },
        )
    }

    fn orchestrator() -> Orchestrator<RecordingClient, NoVerifier> {
        orchestrator_with(NoVerifier, vec!["localhost".to_string()], None)
    }

    fn options(root: &std::path::Path, solidity: &str, save: bool) -> RunOptions {
        RunOptions {
            artifacts: ArtifactStore::new(root.join("artifacts")),
            solidity: solidity.to_string(),
            deployments: save.then(|| DeploymentStore::new(root.join("deployments"))),
            gas_reporter: GasReporterConfig {
                enabled: true,
                output_file: Some(root.join("gas-report.txt")),
                ..Default::default()
            },
            contract_sizer: true,
        }
    }

    #[tokio::test]
    async fn test_runs_selected_scripts_and_saves_records() {
        let dir = tempdir::TempDir::new("runner").unwrap();
        fixtures::write_artifact(&dir.path().join("artifacts"), "NftMarketPlace", serde_json::json!([]));

        let orchestrator = orchestrator();
        let url = "http://127.0.0.1:8545".parse().unwrap();
        let outcomes = run_scripts(
            &orchestrator,
            &network(Endpoint::Http(url)),
            &[DeployScript::nft_marketplace()],
            &["NftMarketPlace".to_string()],
            &options(dir.path(), fixtures::SOLC_VERSION, true),
        )
        .await
        .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(*orchestrator.client().deployed.lock().unwrap(), vec!["NftMarketPlace"]);

        let saved = DeploymentStore::new(dir.path().join("deployments"))
            .load("localhost", "NftMarketPlace")
            .unwrap();
        assert_eq!(saved.address, outcomes[0].record.address);

        let gas_report = std::fs::read_to_string(dir.path().join("gas-report.txt")).unwrap();
        assert!(gas_report.contains("21000"));
    }

    #[tokio::test]
    async fn test_record_is_saved_before_verification() {
        let dir = tempdir::TempDir::new("runner").unwrap();
        fixtures::write_artifact(&dir.path().join("artifacts"), "NftMarketPlace", serde_json::json!([]));

        let saw_record = Arc::new(Mutex::new(None));
        let verifier = RecordCheckingVerifier {
            record_path: dir.path().join("deployments/localhost/NftMarketPlace.json"),
            saw_record: saw_record.clone(),
        };
        // No development networks and a key, so the guard holds for "localhost".
        let orchestrator = orchestrator_with(verifier, Vec::new(), Some("KEY"));
        let url = "http://127.0.0.1:8545".parse().unwrap();

        let outcomes = run_scripts(
            &orchestrator,
            &network(Endpoint::Http(url)),
            &[DeployScript::nft_marketplace()],
            &[],
            &options(dir.path(), fixtures::SOLC_VERSION, true),
        )
        .await
        .unwrap();

        assert_eq!(outcomes[0].verification, VerificationStatus::Verified);
        assert_eq!(*saw_record.lock().unwrap(), Some(true));
    }

    #[tokio::test]
    async fn test_unknown_tag_deploys_nothing() {
        let dir = tempdir::TempDir::new("runner").unwrap();
        let orchestrator = orchestrator();

        let outcomes = run_scripts(
            &orchestrator,
            &network(Endpoint::Ephemeral),
            &[DeployScript::nft_marketplace()],
            &["mocks".to_string()],
            &options(dir.path(), fixtures::SOLC_VERSION, false),
        )
        .await
        .unwrap();

        assert!(outcomes.is_empty());
        assert!(orchestrator.client().deployed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_compiler_mismatch_stops_before_deploying() {
        let dir = tempdir::TempDir::new("runner").unwrap();
        fixtures::write_artifact(&dir.path().join("artifacts"), "NftMarketPlace", serde_json::json!([]));
        let orchestrator = orchestrator();

        let err = run_scripts(
            &orchestrator,
            &network(Endpoint::Ephemeral),
            &[DeployScript::nft_marketplace()],
            &[],
            &options(dir.path(), "0.8.20", false),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DeploymentError>(),
            Some(DeploymentError::Configuration(ConfigurationError::Artifact(_)))
        ));
        assert!(orchestrator.client().deployed.lock().unwrap().is_empty());
    }
}
