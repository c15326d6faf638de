//! Platform endpoints: chat completions, credits, metrics, listings and datasets.

pub mod blocking;

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use unify_ox_common::{
    ChatCompletion, ChatMessage, Endpoint, HttpMethod, MultipartForm, RequestBuilder, SseParser,
    Timestamp,
};

use crate::{ApiConfig, ChatPayload, UnifyError, endpoint::split_endpoint};

pub use blocking::BlockingUnifyApi;

/// The credits endpoint is the only call with a timeout.
pub const CREDITS_TIMEOUT: Duration = Duration::from_secs(10);

/// Latency and cost snapshot for one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Time to first token, in milliseconds
    #[serde(rename = "ttft")]
    pub time_to_first_token: f64,
    /// Inter-token latency, in milliseconds
    #[serde(rename = "itl")]
    pub inter_token_latency: f64,
    pub input_cost: f64,
    pub output_cost: f64,
    pub measured_at: Timestamp,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub seq_len: Option<String>,
}

/// One record of an evaluation dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub query: DatasetQuery,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_answer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetQuery {
    pub messages: Vec<ChatMessage>,
}

impl DatasetEntry {
    pub fn new(messages: Vec<ChatMessage>, ref_answer: Option<String>) -> Self {
        Self {
            query: DatasetQuery { messages },
            ref_answer,
        }
    }
}

#[derive(Deserialize)]
struct CreditsResponse {
    credits: f64,
}

pub(crate) mod routes {
    use super::{CREDITS_TIMEOUT, Endpoint, HttpMethod, UnifyError, split_endpoint};

    pub fn credits() -> Endpoint {
        Endpoint::new("credits", HttpMethod::Get).with_timeout(CREDITS_TIMEOUT)
    }

    pub fn endpoint_metrics(endpoint: &str) -> Result<Endpoint, UnifyError> {
        let (model, provider) = split_endpoint(endpoint)?;
        Ok(Endpoint::new("endpoint-metrics", HttpMethod::Get)
            .with_query_param("model", model)
            .with_query_param("provider", provider))
    }

    fn listing(path: &str, filters: &[(&str, Option<&str>)]) -> Endpoint {
        filters
            .iter()
            .filter_map(|&(key, value)| value.map(|v| (key, v)))
            .fold(Endpoint::new(path, HttpMethod::Get), |endpoint, (key, value)| {
                endpoint.with_query_param(key, value)
            })
    }

    pub fn endpoints(model: Option<&str>, provider: Option<&str>) -> Endpoint {
        listing("endpoints", &[("model", model), ("provider", provider)])
    }

    pub fn models(provider: Option<&str>) -> Endpoint {
        listing("models", &[("provider", provider)])
    }

    pub fn providers(model: Option<&str>) -> Endpoint {
        listing("providers", &[("model", model)])
    }

    pub fn dataset_upload() -> Endpoint {
        Endpoint::new("dataset", HttpMethod::Post)
    }

    pub fn dataset(name: &str, method: HttpMethod) -> Endpoint {
        Endpoint::new("dataset", method).with_query_param("name", name)
    }

    pub fn dataset_list() -> Endpoint {
        Endpoint::new("dataset/list", HttpMethod::Get)
    }
}

pub(crate) fn first_metrics(endpoint: &str, records: Vec<Metrics>) -> Result<Metrics, UnifyError> {
    records
        .into_iter()
        .next()
        .ok_or_else(|| UnifyError::Value(format!("no metrics recorded for endpoint '{endpoint}'")))
}

/// Parse newline-delimited dataset records, skipping blank lines.
pub fn parse_dataset(contents: &str) -> Result<Vec<DatasetEntry>, UnifyError> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| {
                UnifyError::Value(format!("invalid dataset entry on line {}: {e}", index + 1))
            })
        })
        .collect()
}

fn dataset_bytes(entries: &[DatasetEntry]) -> Result<Vec<u8>, UnifyError> {
    let mut bytes = Vec::new();
    for entry in entries {
        serde_json::to_writer(&mut bytes, entry)?;
        bytes.push(b'\n');
    }
    Ok(bytes)
}

/// Async access to the platform API.
#[derive(Debug, Clone)]
pub struct UnifyApi {
    request_builder: RequestBuilder,
}

impl UnifyApi {
    pub fn new(config: &ApiConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: &ApiConfig) -> Self {
        Self {
            request_builder: RequestBuilder::new(client, config.request_config()),
        }
    }

    pub async fn chat_completion(&self, payload: &ChatPayload) -> Result<ChatCompletion, UnifyError> {
        Ok(self
            .request_builder
            .request_json(&payload.endpoint(), Some(&payload.body))
            .await?)
    }

    /// Send a streaming request; status errors surface here, chunks are read lazily.
    pub async fn open_chat_stream(&self, payload: &ChatPayload) -> Result<SseParser, UnifyError> {
        let response = self
            .request_builder
            .open_stream(&payload.endpoint(), &payload.body)
            .await?;
        Ok(SseParser::new(response))
    }

    pub async fn get_credit_balance(&self) -> Result<f64, UnifyError> {
        let response: CreditsResponse = self.request_builder.request(&routes::credits()).await?;
        Ok(response.credits)
    }

    pub async fn get_endpoint_metrics(&self, endpoint: &str) -> Result<Metrics, UnifyError> {
        let records = self
            .request_builder
            .request(&routes::endpoint_metrics(endpoint)?)
            .await?;
        first_metrics(endpoint, records)
    }

    pub async fn list_endpoints(
        &self,
        model: Option<&str>,
        provider: Option<&str>,
    ) -> Result<Vec<String>, UnifyError> {
        Ok(self
            .request_builder
            .request(&routes::endpoints(model, provider))
            .await?)
    }

    pub async fn list_models(&self, provider: Option<&str>) -> Result<Vec<String>, UnifyError> {
        Ok(self.request_builder.request(&routes::models(provider)).await?)
    }

    pub async fn list_providers(&self, model: Option<&str>) -> Result<Vec<String>, UnifyError> {
        Ok(self.request_builder.request(&routes::providers(model)).await?)
    }

    /// Upload a JSONL file after checking that every line is a [`DatasetEntry`].
    pub async fn upload_dataset_from_file(
        &self,
        name: &str,
        path: impl AsRef<Path>,
    ) -> Result<Value, UnifyError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        parse_dataset(&contents)?;

        let filename = path
            .file_name()
            .map_or_else(|| format!("{name}.jsonl"), |f| f.to_string_lossy().into_owned());
        self.upload_dataset(name, filename, contents.into_bytes()).await
    }

    pub async fn upload_dataset_from_dictionary(
        &self,
        name: &str,
        entries: &[DatasetEntry],
    ) -> Result<Value, UnifyError> {
        self.upload_dataset(name, format!("{name}.jsonl"), dataset_bytes(entries)?)
            .await
    }

    async fn upload_dataset(
        &self,
        name: &str,
        filename: String,
        bytes: Vec<u8>,
    ) -> Result<Value, UnifyError> {
        let form = MultipartForm::new()
            .text("name", name)
            .file_from_bytes("file", filename, bytes)
            .build();
        Ok(self
            .request_builder
            .request_multipart(&routes::dataset_upload(), form)
            .await?)
    }

    pub async fn download_dataset(&self, name: &str) -> Result<Vec<DatasetEntry>, UnifyError> {
        Ok(self
            .request_builder
            .request(&routes::dataset(name, HttpMethod::Get))
            .await?)
    }

    pub async fn delete_dataset(&self, name: &str) -> Result<(), UnifyError> {
        Ok(self
            .request_builder
            .request_unit(&routes::dataset(name, HttpMethod::Delete))
            .await?)
    }

    pub async fn list_datasets(&self) -> Result<Vec<String>, UnifyError> {
        Ok(self.request_builder.request(&routes::dataset_list()).await?)
    }
}
