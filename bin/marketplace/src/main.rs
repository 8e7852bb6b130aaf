//! marketplace deploys the NFT marketplace contract and verifies it on Etherscan.

mod cli;

use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Command, DeployArgs, VerifyArgs};
use marketplace_deploy::{
    ArtifactStore, DeploymentStore, EnvSnapshot, EtherscanVerifier, Orchestrator, ProjectConfig,
    RpcNetworkClient, RunOptions, RunSettings, VerificationStatus, config::CONFIG_FILENAME,
    run_scripts, verify_deployment,
};

#[tokio::main]
async fn main() -> Result<()> {
    // `.env` must be loaded before clap reads the environment.
    let dotenv = dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    let env = EnvSnapshot::capture();

    match cli.command {
        Command::Init { force } => init(&cli.config, force),
        Command::Deploy(args) => deploy(&cli.config, args, &env).await,
        Command::Verify(args) => verify(&cli.config, args, &env).await,
    }
}

fn init(path: &Path, force: bool) -> Result<()> {
    let path = if path.is_dir() {
        path.join(CONFIG_FILENAME)
    } else {
        path.to_path_buf()
    };

    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists, pass --force to overwrite it",
            path.display()
        );
    }

    ProjectConfig::default().save_to_file(&path)
}

async fn deploy(config_path: &Path, args: DeployArgs, env: &EnvSnapshot) -> Result<()> {
    let config = ProjectConfig::load(config_path)?;
    let network_name = config.active_network_name(args.network.as_deref());
    let network = config.resolve_active_network(network_name, env)?;

    tracing::info!(
        network = %network.name,
        chain_id = network.chain_id,
        confirmations = network.confirmations,
        "Network selected"
    );

    let options = RunOptions::from_config(&config, &network);
    let settings = RunSettings::from_config(&config, &network.name, env);

    let client = RpcNetworkClient::connect(
        &network,
        options.artifacts.clone(),
        Duration::from_secs(config.confirmation_timeout_secs),
    )?;

    // Only called when the guard holds, which requires a key.
    let verifier = EtherscanVerifier::new(
        config.explorer_endpoint(&network.name, network.chain_id),
        settings.explorer_api_key.clone().unwrap_or_default(),
        options.artifacts.clone(),
    )?;

    let orchestrator = Orchestrator::new(client, verifier, settings);
    let outcomes = run_scripts(&orchestrator, &network, &config.scripts, &args.tags, &options).await?;

    for outcome in &outcomes {
        tracing::info!(
            contract = %outcome.record.contract,
            address = %outcome.record.address,
            tx = %outcome.record.transaction_hash,
            verification = %outcome.verification,
            "Deployed"
        );
    }

    Ok(())
}

async fn verify(config_path: &Path, args: VerifyArgs, env: &EnvSnapshot) -> Result<()> {
    let config = ProjectConfig::load(config_path)?;
    let network_name = config.active_network_name(args.network.as_deref());

    if config.is_development(network_name) {
        anyhow::bail!("{} is a development network, nothing to verify", network_name);
    }

    let api_key = config
        .explorer_api_key(network_name, env)
        .with_context(|| format!("No explorer API key configured for network {}", network_name))?;

    let record = DeploymentStore::new(&config.deployments).load(network_name, &args.contract)?;

    let verifier = EtherscanVerifier::new(
        config.explorer_endpoint(network_name, record.chain_id),
        api_key,
        ArtifactStore::new(&config.artifacts),
    )?;

    match verify_deployment(&verifier, &record).await {
        VerificationStatus::Failed(reason) => {
            anyhow::bail!("Verification of {} failed: {}", record.contract, reason)
        }
        _ => Ok(()),
    }
}
