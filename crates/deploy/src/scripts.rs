//! Deploy scripts and tag selection.

use serde::{Deserialize, Serialize};

/// Tag carried by every script so that `--tags all` runs everything.
pub const TAG_ALL: &str = "all";

/// One deployment step: a contract, its constructor arguments and its tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployScript {
    pub contract: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl DeployScript {
    /// The marketplace deployment step.
    pub fn nft_marketplace() -> Self {
        Self {
            contract: "NftMarketPlace".to_string(),
            args: Vec::new(),
            tags: vec![TAG_ALL.to_string(), "NftMarketPlace".to_string()],
        }
    }

    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        self.tags.iter().any(|t| tags.contains(t))
    }
}

/// Scripts to run for the requested tags, in configuration order.
///
/// No tags selects every script.
pub fn select<'a>(scripts: &'a [DeployScript], tags: &[String]) -> Vec<&'a DeployScript> {
    if tags.is_empty() {
        return scripts.iter().collect();
    }

    for tag in tags {
        if !scripts.iter().any(|s| s.tags.contains(tag)) {
            tracing::warn!(tag = %tag, "No deploy script carries this tag");
        }
    }

    scripts.iter().filter(|s| s.has_any_tag(tags)).collect()
}
