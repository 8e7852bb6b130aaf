//! Error taxonomy for a deployment run.
//!
//! [`ConfigurationError`] and [`DeploymentError`] are fatal and abort the run.
//! [`VerificationError`] is reported but never fails a deployment that already
//! landed on chain.

use std::path::PathBuf;

use alloy::primitives::{Address, TxHash};

/// Problems with the project configuration or the compiled artifacts.
///
/// Always raised before any transaction is sent.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("unknown network `{0}`")]
    UnknownNetwork(String),

    #[error("network `{network}` requires an RPC url")]
    MissingUrl { network: String },

    #[error("invalid RPC url for network `{network}`: {reason}")]
    InvalidUrl { network: String, reason: String },

    #[error("network `{network}` requires at least one signing credential")]
    MissingCredentials { network: String },

    #[error("invalid credential #{index} for network `{network}`: {reason}")]
    InvalidCredential {
        network: String,
        index: usize,
        reason: String,
    },

    #[error("named account `{0}` is not configured")]
    UnknownNamedAccount(String),

    #[error(
        "named account `{account}` maps to index {index} but network `{network}` only has {available} credential(s)"
    )]
    MissingNamedAccount {
        account: String,
        network: String,
        index: usize,
        available: usize,
    },

    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Problems locating or interpreting a compiled contract artifact.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("no compiled artifact named `{0}` (did you compile the contracts?)")]
    NotFound(String),

    #[error("artifact name `{name}` is ambiguous: {candidates:?}")]
    Ambiguous {
        name: String,
        candidates: Vec<PathBuf>,
    },

    #[error("invalid artifact search pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid bytecode for `{contract}`: {reason}")]
    InvalidBytecode { contract: String, reason: String },

    #[error("`{contract}` has unlinked library references")]
    UnlinkedLibraries { contract: String },

    #[error("`{contract}` constructor takes {expected} argument(s), got {got}")]
    ConstructorArity {
        contract: String,
        expected: usize,
        got: usize,
    },

    #[error("invalid constructor argument `{param}` for `{contract}`: {reason}")]
    ConstructorArg {
        contract: String,
        param: String,
        reason: String,
    },

    #[error("`{contract}` was compiled with solc {found}, project expects {expected}")]
    CompilerMismatch {
        contract: String,
        expected: String,
        found: String,
    },
}

/// The deployment transaction could not be completed.
#[derive(Debug, thiserror::Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("node unavailable: {0}")]
    NodeUnavailable(String),

    #[error("connected to chain {actual}, network expects chain {expected}")]
    ChainIdMismatch { expected: u64, actual: u64 },

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("deployment tx {tx_hash} reverted")]
    Reverted { tx_hash: TxHash },

    #[error("deployment tx {tx_hash} has no contract address in its receipt")]
    MissingContractAddress { tx_hash: TxHash },

    #[error("timed out after {timeout_secs}s waiting for {confirmations} confirmation(s)")]
    ConfirmationTimeout { confirmations: u64, timeout_secs: u64 },
}

impl From<ArtifactError> for DeploymentError {
    fn from(err: ArtifactError) -> Self {
        Self::Configuration(err.into())
    }
}

impl From<alloy::transports::RpcError<alloy::transports::TransportErrorKind>> for DeploymentError {
    fn from(err: alloy::transports::RpcError<alloy::transports::TransportErrorKind>) -> Self {
        Self::Rpc(err.to_string())
    }
}

/// Source verification on the block explorer failed.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("contract {address} is already verified")]
    AlreadyVerified { address: Address },

    #[error("explorer unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    #[error("explorer has not indexed the bytecode at {address} yet")]
    NotIndexed { address: Address },

    #[error("explorer rate limit hit: {0}")]
    RateLimited(String),

    #[error("explorer rejected verification: {0}")]
    Rejected(String),

    #[error("verification {guid} still pending after polling budget")]
    Timeout { guid: String },

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}
