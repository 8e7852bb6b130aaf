//! marketplace-deploy - Deployment library for the NFT marketplace contracts.
//!
//! This crate deploys compiled Hardhat artifacts to an EVM network, waits for
//! confirmations and verifies the contract source on an Etherscan-compatible
//! explorer when the network and the environment allow it.

pub mod accounts;
pub mod artifact;
pub mod client;
pub mod config;
pub mod error;
pub mod network;
pub mod orchestrator;
pub mod record;
pub mod report;
pub mod runner;
pub mod scripts;
pub mod verify;

pub use accounts::{Credential, NamedAccount, NamedAccounts};
pub use artifact::{ArtifactStore, ContractArtifact};
pub use client::{DeployReceipt, DeployRequest, NetworkClient, RpcNetworkClient};
pub use config::{EnvSnapshot, ProjectConfig};
pub use error::{ArtifactError, ConfigurationError, DeploymentError, VerificationError};
pub use network::{Endpoint, NetworkProfile};
pub use orchestrator::{
    DeploymentOutcome, Orchestrator, RunSettings, VerificationStatus, should_verify,
    verify_deployment,
};
pub use record::{DeploymentRecord, DeploymentStore, VerificationRequest};
pub use runner::{RunOptions, run_scripts};
pub use scripts::DeployScript;
pub use verify::{EtherscanVerifier, PollSettings, VerificationService};
