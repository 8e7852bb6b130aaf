//! Signing credentials and named-account roles.

use std::collections::BTreeMap;

use alloy::primitives::Address;
use alloy_signer_local::{LocalSignerError, MnemonicBuilder, PrivateKeySigner, coins_bip39::English};
use serde::{Deserialize, Serialize};

use crate::{config::EnvSnapshot, error::ConfigurationError, network::NetworkProfile};

/// Mnemonic of the accounts funded by a fresh development node.
pub const DEV_MNEMONIC: &str = "test test test test test test test test test test test junk";

/// Number of development accounts derived when a network lists none.
pub const DEV_ACCOUNT_COUNT: u32 = 10;

/// The named account that signs deployments.
pub const DEPLOYER: &str = "deployer";

/// A local signing key.
#[derive(Clone)]
pub struct Credential {
    signer: PrivateKeySigner,
}

impl Credential {
    /// Parse a hex private key, with or without `0x`.
    pub fn from_private_key(key: &str) -> Result<Self, LocalSignerError> {
        Ok(Self {
            signer: key.trim().parse()?,
        })
    }

    /// Derive the key at `m/44'/60'/0'/0/{index}`.
    pub fn from_mnemonic(phrase: &str, index: u32) -> Result<Self, LocalSignerError> {
        let signer = MnemonicBuilder::<English>::default()
            .phrase(phrase.trim())
            .index(index)?
            .build()?;
        Ok(Self { signer })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Accounts of a network entry: a list of private keys or a mnemonic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccountsConfig {
    Keys(Vec<String>),
    Mnemonic(MnemonicConfig),
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self::Keys(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MnemonicConfig {
    pub mnemonic: String,
    #[serde(default)]
    pub initial_index: u32,
    #[serde(default = "default_mnemonic_count")]
    pub count: u32,
}

fn default_mnemonic_count() -> u32 {
    DEV_ACCOUNT_COUNT
}

impl AccountsConfig {
    /// Build the credentials, expanding placeholders first.
    ///
    /// Entries that expand to nothing (unset variables) are skipped.
    pub fn credentials(
        &self,
        network: &str,
        env: &EnvSnapshot,
    ) -> Result<Vec<Credential>, ConfigurationError> {
        let invalid = |index: usize, err: LocalSignerError| ConfigurationError::InvalidCredential {
            network: network.to_string(),
            index,
            reason: err.to_string(),
        };

        match self {
            Self::Keys(keys) => keys
                .iter()
                .map(|key| env.expand(key))
                .filter(|key| !key.trim().is_empty())
                .enumerate()
                .map(|(i, key)| Credential::from_private_key(&key).map_err(|e| invalid(i, e)))
                .collect(),
            Self::Mnemonic(config) => {
                let phrase = env.expand(&config.mnemonic);
                if phrase.trim().is_empty() {
                    return Ok(Vec::new());
                }
                derive_accounts(&phrase, config.initial_index, config.count)
                    .map_err(|(i, e)| invalid(i, e))
            }
        }
    }
}

/// The accounts a fresh development node funds.
pub fn dev_accounts(network: &str) -> Result<Vec<Credential>, ConfigurationError> {
    derive_accounts(DEV_MNEMONIC, 0, DEV_ACCOUNT_COUNT).map_err(|(index, e)| {
        ConfigurationError::InvalidCredential {
            network: network.to_string(),
            index,
            reason: e.to_string(),
        }
    })
}

fn derive_accounts(
    phrase: &str,
    initial_index: u32,
    count: u32,
) -> Result<Vec<Credential>, (usize, LocalSignerError)> {
    (0..count)
        .map(|offset| {
            Credential::from_mnemonic(phrase, initial_index + offset)
                .map_err(|e| (offset as usize, e))
        })
        .collect()
}

/// Index of a role's credential, with optional per-network overrides.
///
/// Mirrors `{ default = 0, sepolia = 1 }` in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedAccount {
    pub default: usize,
    #[serde(flatten)]
    pub networks: BTreeMap<String, usize>,
}

impl NamedAccount {
    pub fn index_for(&self, network: &str) -> usize {
        self.networks.get(network).copied().unwrap_or(self.default)
    }
}

/// Role name to credential index mapping.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamedAccounts(BTreeMap<String, NamedAccount>);

impl NamedAccounts {
    pub fn insert(&mut self, role: impl Into<String>, account: NamedAccount) {
        self.0.insert(role.into(), account);
    }

    /// Pick the credential playing `role` on `network`.
    pub fn resolve<'a>(
        &self,
        role: &str,
        network: &'a NetworkProfile,
    ) -> Result<&'a Credential, ConfigurationError> {
        let account = self
            .0
            .get(role)
            .ok_or_else(|| ConfigurationError::UnknownNamedAccount(role.to_string()))?;
        let index = account.index_for(&network.name);

        network
            .credentials
            .get(index)
            .ok_or_else(|| ConfigurationError::MissingNamedAccount {
                account: role.to_string(),
                network: network.name.clone(),
                index,
                available: network.credentials.len(),
            })
    }
}

impl Default for NamedAccount {
    fn default() -> Self {
        Self {
            default: 0,
            networks: BTreeMap::new(),
        }
    }
}
