//! Network entries of the configuration and the resolved [`NetworkProfile`].

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    accounts::{AccountsConfig, Credential, dev_accounts},
    config::EnvSnapshot,
    error::ConfigurationError,
};

/// Where the node for a network lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// A throwaway local node started for the duration of the run.
    Ephemeral,
    /// An existing JSON-RPC endpoint.
    Http(Url),
}

impl Endpoint {
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Self::Ephemeral)
    }
}

/// A fully resolved network, selected as active for one run.
#[derive(Debug, Clone)]
pub struct NetworkProfile {
    pub name: String,
    pub chain_id: u64,
    pub endpoint: Endpoint,
    pub credentials: Vec<Credential>,
    /// Blocks to wait for after inclusion of the deployment transaction.
    pub confirmations: u64,
}

/// A `[networks.<name>]` entry as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub chain_id: u64,
    /// JSON-RPC url, may contain `${VAR}` placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub accounts: AccountsConfig,
    #[serde(default)]
    pub block_confirmations: u64,
}

impl NetworkConfig {
    /// Resolve this entry into a [`NetworkProfile`].
    ///
    /// Development networks may omit the url (an ephemeral node is used) and the
    /// accounts (the development mnemonic is used). Every other network must
    /// provide both.
    pub fn resolve(
        &self,
        name: &str,
        development: bool,
        env: &EnvSnapshot,
    ) -> Result<NetworkProfile, ConfigurationError> {
        let url = self
            .url
            .as_deref()
            .map(|url| env.expand(url))
            .filter(|url| !url.trim().is_empty());

        let endpoint = match url {
            Some(url) => Endpoint::Http(Url::parse(url.trim()).map_err(|e| {
                ConfigurationError::InvalidUrl {
                    network: name.to_string(),
                    reason: e.to_string(),
                }
            })?),
            None if development => Endpoint::Ephemeral,
            None => {
                return Err(ConfigurationError::MissingUrl {
                    network: name.to_string(),
                });
            }
        };

        let mut credentials = self.accounts.credentials(name, env)?;
        if credentials.is_empty() {
            if !development {
                return Err(ConfigurationError::MissingCredentials {
                    network: name.to_string(),
                });
            }
            credentials = dev_accounts(name)?;
        }

        tracing::debug!(
            network = name,
            chain_id = self.chain_id,
            endpoint = ?endpoint,
            accounts = credentials.len(),
            confirmations = self.block_confirmations,
            "Resolved network profile"
        );

        Ok(NetworkProfile {
            name: name.to_string(),
            chain_id: self.chain_id,
            endpoint,
            credentials,
            confirmations: self.block_confirmations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    fn sepolia() -> NetworkConfig {
        NetworkConfig {
            chain_id: 11155111,
            url: Some("${SEPOLIA_URL}".to_string()),
            accounts: AccountsConfig::Keys(vec!["${PRIVATE_KEY}".to_string()]),
            block_confirmations: 6,
        }
    }

    #[test]
    fn test_remote_network_resolves_from_env() {
        let env: EnvSnapshot = [
            ("SEPOLIA_URL", "https://sepolia.example/rpc"),
            ("PRIVATE_KEY", PRIVATE_KEY),
        ]
        .into_iter()
        .collect();

        let profile = sepolia().resolve("sepolia", false, &env).unwrap();
        assert_eq!(profile.chain_id, 11155111);
        assert_eq!(profile.confirmations, 6);
        assert_eq!(profile.credentials.len(), 1);
        assert_eq!(
            profile.endpoint,
            Endpoint::Http(Url::parse("https://sepolia.example/rpc").unwrap())
        );
    }

    #[test]
    fn test_remote_network_requires_url() {
        let env: EnvSnapshot = [("PRIVATE_KEY", PRIVATE_KEY)].into_iter().collect();
        let err = sepolia().resolve("sepolia", false, &env).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingUrl { .. }));
    }

    #[test]
    fn test_remote_network_requires_credentials() {
        let env: EnvSnapshot = [("SEPOLIA_URL", "https://sepolia.example/rpc")]
            .into_iter()
            .collect();
        let err = sepolia().resolve("sepolia", false, &env).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingCredentials { .. }));
    }

    #[test]
    fn test_invalid_url() {
        let env: EnvSnapshot = [("SEPOLIA_URL", "not a url"), ("PRIVATE_KEY", PRIVATE_KEY)]
            .into_iter()
            .collect();
        let err = sepolia().resolve("sepolia", false, &env).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidUrl { .. }));
    }

    #[test]
    fn test_development_network_defaults() {
        let hardhat = NetworkConfig {
            chain_id: 313337,
            url: None,
            accounts: AccountsConfig::default(),
            block_confirmations: 1,
        };

        let profile = hardhat
            .resolve("hardhat", true, &EnvSnapshot::default())
            .unwrap();
        assert!(profile.endpoint.is_ephemeral());
        assert_eq!(profile.credentials.len(), 10);
    }
}
