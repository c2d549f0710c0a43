use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use split_core::model::{DeviceId, Question, QuestionId, VoteHistoryItem, VoteOption, VoteResult};

use crate::error::BackendError;
use crate::repository::{DeviceRegistry, QuestionSource, VoteRepository};

const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Clone, Debug)]
pub struct RpcConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl RpcConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Reads `SPLIT_API_URL`, `SPLIT_API_KEY` and `SPLIT_API_TIMEOUT_SECS`.
    ///
    /// Returns `None` unless both the URL and key are set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("SPLIT_API_URL").ok()?;
        let api_key = env::var("SPLIT_API_KEY").ok()?;
        if base_url.trim().is_empty() || api_key.trim().is_empty() {
            return None;
        }
        let timeout = env::var("SPLIT_API_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS), Duration::from_secs);
        Some(Self {
            base_url,
            api_key,
            timeout,
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn function_url(&self, function: &str) -> String {
        format!(
            "{}/rest/v1/rpc/{function}",
            self.base_url.trim_end_matches('/')
        )
    }
}

/// Client for the hosted backend's remote procedures.
#[derive(Clone)]
pub struct RpcBackend {
    client: Client,
    config: RpcConfig,
}

impl RpcBackend {
    /// # Errors
    ///
    /// Returns `BackendError::Network` if the HTTP client cannot be built.
    pub fn new(config: RpcConfig) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    async fn call<B, T>(&self, function: &str, body: &B) -> Result<Option<T>, BackendError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        let url = self.config.function_url(function);
        tracing::trace!(%url, "rpc call");

        let response = self
            .client
            .post(url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(decode_failure(status, &bytes));
        }
        decode_body(&bytes)
    }
}

fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<Option<T>, BackendError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(serde_json::from_slice::<Option<T>>(bytes)?)
}

fn decode_failure(status: reqwest::StatusCode, bytes: &[u8]) -> BackendError {
    match serde_json::from_slice::<RpcErrorBody>(bytes) {
        Ok(body) if body.message.is_some() => BackendError::Server {
            code: body.code,
            message: body.message.unwrap_or_default(),
        },
        _ => BackendError::HttpStatus(status),
    }
}

#[async_trait]
impl QuestionSource for RpcBackend {
    async fn next_question(&self, device: &DeviceId) -> Result<Option<Question>, BackendError> {
        let rows: Option<Vec<Question>> = self
            .call("get_next_question", &DeviceParams::new(device))
            .await?;
        Ok(rows.and_then(|rows| rows.into_iter().next()))
    }
}

#[async_trait]
impl DeviceRegistry for RpcBackend {
    async fn register_device(&self, device: &DeviceId) -> Result<(), BackendError> {
        let _: Option<serde_json::Value> = self
            .call("register_device", &DeviceParams::new(device))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl VoteRepository for RpcBackend {
    async fn submit_vote(
        &self,
        device: &DeviceId,
        question_id: &QuestionId,
        option: VoteOption,
    ) -> Result<VoteResult, BackendError> {
        let params = VoteParams {
            p_device_uuid: device.as_str(),
            p_question_id: question_id.as_str(),
            p_selected_option: option,
        };
        let rows: Option<Vec<VoteResult>> = self
            .call("submit_vote_and_get_results_v2", &params)
            .await?;
        rows.and_then(|rows| rows.into_iter().next())
            .ok_or(BackendError::EmptyResponse)
    }

    async fn vote_history(&self, device: &DeviceId) -> Result<Vec<VoteHistoryItem>, BackendError> {
        let rows: Option<Vec<VoteHistoryItem>> = self
            .call("get_vote_history", &DeviceParams::new(device))
            .await?;
        Ok(rows.unwrap_or_default())
    }
}

#[derive(Debug, Serialize)]
struct DeviceParams<'a> {
    p_device_uuid: &'a str,
}

impl<'a> DeviceParams<'a> {
    fn new(device: &'a DeviceId) -> Self {
        Self {
            p_device_uuid: device.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
struct VoteParams<'a> {
    p_device_uuid: &'a str,
    p_question_id: &'a str,
    p_selected_option: VoteOption,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: Option<String>,
    message: Option<String>,
}
