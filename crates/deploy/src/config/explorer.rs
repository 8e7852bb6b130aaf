//! Block explorer settings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Etherscan multichain API; the target chain is selected with `chainid`.
pub const ETHERSCAN_V2_API_URL: &str = "https://api.etherscan.io/v2/api";

/// `[etherscan]` section of the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EtherscanConfig {
    /// API key per network name, may contain `${VAR}` placeholders.
    #[serde(default)]
    pub api_key: BTreeMap<String, String>,
    /// Explorers that are not served by the multichain API.
    #[serde(default)]
    pub custom_chains: Vec<CustomChain>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomChain {
    pub network: String,
    pub chain_id: u64,
    pub urls: ChainUrls,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainUrls {
    pub api_url: String,
    pub browser_url: String,
}

/// Where verification requests for a network go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerEndpoint {
    pub api_url: String,
    /// Sent as the `chainid` query parameter (multichain API only).
    pub chain_id: Option<u64>,
    pub browser_url: Option<String>,
}

impl EtherscanConfig {
    pub fn endpoint_for(&self, network: &str, chain_id: u64) -> ExplorerEndpoint {
        if let Some(custom) = self.custom_chains.iter().find(|c| c.network == network) {
            return ExplorerEndpoint {
                api_url: custom.urls.api_url.clone(),
                chain_id: None,
                browser_url: Some(custom.urls.browser_url.clone()),
            };
        }

        ExplorerEndpoint {
            api_url: ETHERSCAN_V2_API_URL.to_string(),
            chain_id: Some(chain_id),
            browser_url: known_browser_url(chain_id).map(str::to_string),
        }
    }
}

fn known_browser_url(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        1 => Some("https://etherscan.io"),
        11155111 => Some("https://sepolia.etherscan.io"),
        17000 => Some("https://holesky.etherscan.io"),
        10 => Some("https://optimistic.etherscan.io"),
        8453 => Some("https://basescan.org"),
        84532 => Some("https://sepolia.basescan.org"),
        42161 => Some("https://arbiscan.io"),
        137 => Some("https://polygonscan.com"),
        _ => None,
    }
}

impl ExplorerEndpoint {
    /// Link to the verified source of `address`, if the browser is known.
    pub fn code_url(&self, address: impl std::fmt::Display) -> Option<String> {
        self.browser_url
            .as_ref()
            .map(|base| format!("{}/address/{}#code", base.trim_end_matches('/'), address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goerli() -> CustomChain {
        CustomChain {
            network: "goerli".to_string(),
            chain_id: 5,
            urls: ChainUrls {
                api_url: "https://api-goerli.etherscan.io/api".to_string(),
                browser_url: "https://goerli.etherscan.io".to_string(),
            },
        }
    }

    #[test]
    fn test_multichain_endpoint() {
        let config = EtherscanConfig::default();
        let endpoint = config.endpoint_for("sepolia", 11155111);
        assert_eq!(endpoint.api_url, ETHERSCAN_V2_API_URL);
        assert_eq!(endpoint.chain_id, Some(11155111));
        assert_eq!(
            endpoint.code_url("0xabc").as_deref(),
            Some("https://sepolia.etherscan.io/address/0xabc#code")
        );
    }

    #[test]
    fn test_custom_chain_wins() {
        let config = EtherscanConfig {
            custom_chains: vec![goerli()],
            ..Default::default()
        };
        let endpoint = config.endpoint_for("goerli", 5);
        assert_eq!(endpoint.api_url, "https://api-goerli.etherscan.io/api");
        assert_eq!(endpoint.chain_id, None);
        assert_eq!(endpoint.browser_url.as_deref(), Some("https://goerli.etherscan.io"));
    }

    #[test]
    fn test_unknown_chain_has_no_browser() {
        let endpoint = EtherscanConfig::default().endpoint_for("devnet", 424242);
        assert!(endpoint.code_url("0xabc").is_none());
    }
}
