use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use marketplace_deploy::config::CONFIG_FILENAME;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "marketplace")]
#[command(
    author,
    version,
    about = "Deploy the NFT marketplace contract and verify it on Etherscan"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, global = true, env = "MARKETPLACE_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to the project configuration file, or to the directory holding it.
    ///
    /// A missing file is fine: built-in defaults and environment overrides apply.
    #[arg(long, alias = "conf", global = true, env = "MARKETPLACE_CONFIG", default_value = CONFIG_FILENAME)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the deploy scripts, then verify the contracts on non-development networks.
    Deploy(DeployArgs),

    /// Verify a contract from its saved deployment record.
    Verify(VerifyArgs),

    /// Write the default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
pub struct DeployArgs {
    /// The network to deploy to. Defaults to the configured default network.
    #[arg(short, long, env = "MARKETPLACE_NETWORK")]
    pub network: Option<String>,

    /// Only run the deploy scripts carrying one of these tags.
    ///
    /// If not provided, every script runs.
    #[arg(short, long, env = "MARKETPLACE_TAGS", value_delimiter = ',')]
    pub tags: Vec<String>,
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// The network the contract was deployed to.
    #[arg(short, long, env = "MARKETPLACE_NETWORK")]
    pub network: Option<String>,

    /// The contract name, as used by the deploy script.
    #[arg(short, long, env = "MARKETPLACE_CONTRACT")]
    pub contract: String,
}
