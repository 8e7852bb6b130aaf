//! Project configuration.
//!
//! The configuration is layered with figment: built-in defaults, then the
//! `Marketplace.toml` file, then `MARKETPLACE_*` environment variables
//! (`__` separates nested keys, e.g. `MARKETPLACE_NETWORKS__SEPOLIA__BLOCK_CONFIRMATIONS`).
//! String values may reference the environment with `${VAR}`; those are expanded
//! only when a network is resolved, against an [`EnvSnapshot`].

mod env;
mod explorer;

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

pub use env::EnvSnapshot;
pub use explorer::{ChainUrls, CustomChain, ETHERSCAN_V2_API_URL, EtherscanConfig, ExplorerEndpoint};

use crate::{
    accounts::{AccountsConfig, DEPLOYER, NamedAccount, NamedAccounts},
    error::ConfigurationError,
    network::{NetworkConfig, NetworkProfile},
    scripts::DeployScript,
};

/// The default name for the project configuration file.
pub const CONFIG_FILENAME: &str = "Marketplace.toml";

/// Prefix of environment variables overriding configuration keys.
pub const ENV_PREFIX: &str = "MARKETPLACE_";

/// Everything a deployment run needs to know about the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Solidity compiler version the artifacts must have been built with.
    pub solidity: String,
    /// Network used when none is selected.
    pub default_network: String,
    /// Networks exempt from source verification.
    pub development_networks: Vec<String>,
    /// Directory holding the compiled artifacts.
    pub artifacts: PathBuf,
    /// Directory where deployment records are written.
    pub deployments: PathBuf,
    /// Upper bound on the confirmation wait.
    pub confirmation_timeout_secs: u64,
    pub named_accounts: NamedAccounts,
    pub networks: BTreeMap<String, NetworkConfig>,
    pub etherscan: EtherscanConfig,
    pub gas_reporter: GasReporterConfig,
    pub contract_sizer: ContractSizerConfig,
    pub scripts: Vec<DeployScript>,
}

/// `[gas_reporter]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasReporterConfig {
    pub enabled: bool,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
    pub no_colors: bool,
}

impl Default for GasReporterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            currency: "USD".to_string(),
            output_file: Some(PathBuf::from("gas-report.txt")),
            no_colors: true,
        }
    }
}

/// `[contract_sizer]` section.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContractSizerConfig {
    pub enabled: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        let mut named_accounts = NamedAccounts::default();
        named_accounts.insert(DEPLOYER, NamedAccount::default());

        let networks = BTreeMap::from([
            (
                "hardhat".to_string(),
                NetworkConfig {
                    chain_id: 313337,
                    url: None,
                    accounts: AccountsConfig::default(),
                    block_confirmations: 1,
                },
            ),
            (
                "localhost".to_string(),
                NetworkConfig {
                    chain_id: 31337,
                    url: Some("http://127.0.0.1:8545".to_string()),
                    accounts: AccountsConfig::default(),
                    block_confirmations: 1,
                },
            ),
            (
                "sepolia".to_string(),
                NetworkConfig {
                    chain_id: 11155111,
                    url: Some("${SEPOLIA_URL}".to_string()),
                    accounts: AccountsConfig::Keys(vec!["${PRIVATE_KEY}".to_string()]),
                    block_confirmations: 6,
                },
            ),
        ]);

        let etherscan = EtherscanConfig {
            api_key: BTreeMap::from([("sepolia".to_string(), "${ETHERSCANAPIKEY}".to_string())]),
            custom_chains: vec![CustomChain {
                network: "goerli".to_string(),
                chain_id: 5,
                urls: ChainUrls {
                    api_url: "https://api-goerli.etherscan.io/api".to_string(),
                    browser_url: "https://goerli.etherscan.io".to_string(),
                },
            }],
        };

        Self {
            solidity: "0.8.24".to_string(),
            default_network: "hardhat".to_string(),
            development_networks: vec!["hardhat".to_string(), "localhost".to_string()],
            artifacts: PathBuf::from("artifacts"),
            deployments: PathBuf::from("deployments"),
            confirmation_timeout_secs: 500,
            named_accounts,
            networks,
            etherscan,
            gas_reporter: GasReporterConfig::default(),
            contract_sizer: ContractSizerConfig::default(),
            scripts: vec![DeployScript::nft_marketplace()],
        }
    }
}

impl ProjectConfig {
    /// Load the configuration, layering the file and the environment over the defaults.
    ///
    /// A missing file is not an error: defaults and environment overrides still apply.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let config_path = if path.is_dir() {
            path.join(CONFIG_FILENAME)
        } else {
            path.to_path_buf()
        };

        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConfigurationError::Load(Box::new(e)))?;

        tracing::debug!(
            path = %config_path.display(),
            networks = config.networks.len(),
            scripts = config.scripts.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    pub fn is_development(&self, network: &str) -> bool {
        self.development_networks.iter().any(|n| n == network)
    }

    /// The requested network name, or the default network.
    pub fn active_network_name<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested.unwrap_or(&self.default_network)
    }

    /// Resolve a network by name into a validated [`NetworkProfile`].
    pub fn resolve_active_network(
        &self,
        name: &str,
        env: &EnvSnapshot,
    ) -> Result<NetworkProfile, ConfigurationError> {
        let network = self
            .networks
            .get(name)
            .ok_or_else(|| ConfigurationError::UnknownNetwork(name.to_string()))?;

        network.resolve(name, self.is_development(name), env)
    }

    /// The explorer API key configured for `network`, if it expands to something.
    pub fn explorer_api_key(&self, network: &str, env: &EnvSnapshot) -> Option<String> {
        self.etherscan
            .api_key
            .get(network)
            .map(|key| env.expand(key).trim().to_string())
            .filter(|key| !key.is_empty())
    }

    pub fn explorer_endpoint(&self, network: &str, chain_id: u64) -> ExplorerEndpoint {
        self.etherscan.endpoint_for(network, chain_id)
    }
}
