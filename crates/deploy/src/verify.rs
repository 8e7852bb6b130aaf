//! Source verification on Etherscan-compatible explorers.

use std::{future::Future, time::Duration};

use alloy::primitives::Address;
use anyhow::Context;
use backon::{ConstantBuilder, Retryable};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    artifact::ArtifactStore, config::ExplorerEndpoint, error::VerificationError,
    record::VerificationRequest,
};

/// Explorer endpoints can be slow to accept large source payloads.
const EXPLORER_TIMEOUT: Duration = Duration::from_secs(30);

/// Publishes the source of deployed contracts.
pub trait VerificationService {
    fn verify(
        &self,
        request: &VerificationRequest,
    ) -> impl Future<Output = Result<(), VerificationError>> + Send;
}

/// How long to wait on the explorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// Attempts while the explorer has not indexed the bytecode yet.
    pub submit_attempts: usize,
    /// Attempts while the verification job is queued.
    pub status_attempts: usize,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            submit_attempts: 6,
            status_attempts: 20,
        }
    }
}

/// Raw `{ status, message, result }` envelope of the Etherscan API.
#[derive(Debug, Clone, Deserialize)]
struct ExplorerResponse {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: Value,
}

impl ExplorerResponse {
    fn ok(&self) -> bool {
        self.status == "1"
    }

    fn result_text(&self) -> String {
        match &self.result {
            Value::String(s) => s.clone(),
            Value::Null => self.message.clone(),
            other => other.to_string(),
        }
    }

    fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.result_text().to_lowercase().contains(&needle)
            || self.message.to_lowercase().contains(&needle)
    }
}

/// [`VerificationService`] for the Etherscan API family.
pub struct EtherscanVerifier {
    endpoint: ExplorerEndpoint,
    api_key: String,
    artifacts: ArtifactStore,
    http: reqwest::Client,
    poll: PollSettings,
}

impl EtherscanVerifier {
    pub fn new(
        endpoint: ExplorerEndpoint,
        api_key: impl Into<String>,
        artifacts: ArtifactStore,
    ) -> Result<Self, anyhow::Error> {
        Ok(Self {
            endpoint,
            api_key: api_key.into(),
            artifacts,
            http: reqwest::Client::builder()
                .timeout(EXPLORER_TIMEOUT)
                .build()
                .context("Failed to create HTTP client")?,
            poll: PollSettings::default(),
        })
    }

    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    fn chain_query(&self) -> Vec<(&'static str, String)> {
        self.endpoint
            .chain_id
            .map(|id| vec![("chainid", id.to_string())])
            .unwrap_or_default()
    }

    async fn get(&self, params: &[(&str, String)]) -> Result<ExplorerResponse, VerificationError> {
        Ok(self
            .http
            .get(&self.endpoint.api_url)
            .query(&self.chain_query())
            .query(&[("apikey", self.api_key.as_str())])
            .query(params)
            .send()
            .await?
            .json()
            .await?)
    }

    /// Whether the explorer already has source code for `address`.
    async fn is_verified(&self, address: Address) -> Result<bool, VerificationError> {
        let response = self
            .get(&[
                ("module", "contract".to_string()),
                ("action", "getsourcecode".to_string()),
                ("address", address.to_string()),
            ])
            .await?;

        if !response.ok() {
            tracing::debug!(reply = %response.result_text(), "Source lookup failed, submitting anyway");
            return Ok(false);
        }

        Ok(has_source_code(&response.result))
    }

    async fn submit(&self, form: &[(&'static str, String)], address: Address) -> Result<String, VerificationError> {
        let response: ExplorerResponse = self
            .http
            .post(&self.endpoint.api_url)
            .query(&self.chain_query())
            .form(form)
            .send()
            .await?
            .json()
            .await?;

        classify_submission(&response, address)
    }

    async fn check_status(&self, guid: &str, address: Address) -> Result<(), VerificationError> {
        let response = self
            .get(&[
                ("module", "contract".to_string()),
                ("action", "checkverifystatus".to_string()),
                ("guid", guid.to_string()),
            ])
            .await?;

        classify_status(&response, guid, address)
    }
}

impl VerificationService for EtherscanVerifier {
    async fn verify(&self, request: &VerificationRequest) -> Result<(), VerificationError> {
        let address = request.address();

        if self.is_verified(address).await? {
            return Err(VerificationError::AlreadyVerified { address });
        }

        let artifact = self.artifacts.load(request.contract())?;
        let build_info = self.artifacts.build_info(&artifact)?;
        let encoded_args = artifact.encode_constructor_args(request.constructor_args())?;

        let form = build_submission_form(
            &self.api_key,
            address,
            &artifact.fully_qualified_name(),
            &build_info.input,
            &build_info.solc_long_version,
            &encoded_args,
        );

        let guid = (|| self.submit(&form, address))
            .retry(
                ConstantBuilder::default()
                    .with_delay(self.poll.interval)
                    .with_max_times(self.poll.submit_attempts),
            )
            .when(|e| matches!(e, VerificationError::NotIndexed { .. }))
            .notify(|_, delay| {
                tracing::info!(
                    address = %address,
                    retry_in = ?delay,
                    "Explorer has not indexed the contract yet, retrying..."
                );
            })
            .await?;

        tracing::info!(guid = %guid, contract = %artifact.fully_qualified_name(), "Source submitted for verification");

        (|| self.check_status(&guid, address))
            .retry(
                ConstantBuilder::default()
                    .with_delay(self.poll.interval)
                    .with_max_times(self.poll.status_attempts),
            )
            .when(|e| matches!(e, VerificationError::Timeout { .. }))
            .await?;

        match self.endpoint.code_url(address) {
            Some(url) => tracing::info!(url = %url, "Successfully verified contract"),
            None => tracing::info!(address = %address, "Successfully verified contract"),
        }
        Ok(())
    }
}

fn build_submission_form(
    api_key: &str,
    address: Address,
    contract_name: &str,
    standard_json_input: &Value,
    solc_long_version: &str,
    encoded_args: &[u8],
) -> Vec<(&'static str, String)> {
    vec![
        ("apikey", api_key.to_string()),
        ("module", "contract".to_string()),
        ("action", "verifysourcecode".to_string()),
        ("contractaddress", address.to_string()),
        ("sourceCode", standard_json_input.to_string()),
        ("codeformat", "solidity-standard-json-input".to_string()),
        ("contractname", contract_name.to_string()),
        ("compilerversion", format!("v{}", solc_long_version)),
        // Misspelling is part of the API.
        ("constructorArguements", hex::encode(encoded_args)),
    ]
}

fn has_source_code(result: &Value) -> bool {
    result
        .as_array()
        .and_then(|entries| entries.first())
        .and_then(|entry| entry.get("SourceCode"))
        .and_then(Value::as_str)
        .is_some_and(|source| !source.trim().is_empty())
}

fn classify_submission(
    response: &ExplorerResponse,
    address: Address,
) -> Result<String, VerificationError> {
    if response.ok() {
        return Ok(response.result_text());
    }
    if response.mentions("already verified") {
        return Err(VerificationError::AlreadyVerified { address });
    }
    if response.mentions("unable to locate contractcode") {
        return Err(VerificationError::NotIndexed { address });
    }
    if response.mentions("rate limit") {
        return Err(VerificationError::RateLimited(response.result_text()));
    }
    Err(VerificationError::Rejected(response.result_text()))
}

fn classify_status(
    response: &ExplorerResponse,
    guid: &str,
    address: Address,
) -> Result<(), VerificationError> {
    if response.mentions("pending in queue") {
        return Err(VerificationError::Timeout {
            guid: guid.to_string(),
        });
    }
    if response.mentions("already verified") {
        return Err(VerificationError::AlreadyVerified { address });
    }
    if response.ok() && response.mentions("pass") {
        return Ok(());
    }
    if response.mentions("rate limit") {
        return Err(VerificationError::RateLimited(response.result_text()));
    }
    Err(VerificationError::Rejected(response.result_text()))
}
