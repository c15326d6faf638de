//! Blocking counterpart of [`super::UnifyApi`].
//!
//! Dataset management is only offered on the async API.

use std::io::BufReader;

use unify_ox_common::{BlockingRequestBuilder, ChatCompletion, ChatCompletionChunk, SseLines};

use super::{CreditsResponse, Metrics, first_metrics, routes};
use crate::{ApiConfig, ChatPayload, UnifyError};

/// Lazily decoded chunks of a blocking streaming response.
pub type ChunkLines = SseLines<BufReader<reqwest::blocking::Response>, ChatCompletionChunk>;

#[derive(Debug, Clone)]
pub struct BlockingUnifyApi {
    request_builder: BlockingRequestBuilder,
}

impl BlockingUnifyApi {
    pub fn new(config: &ApiConfig) -> Self {
        Self::with_client(reqwest::blocking::Client::new(), config)
    }

    pub fn with_client(client: reqwest::blocking::Client, config: &ApiConfig) -> Self {
        Self {
            request_builder: BlockingRequestBuilder::new(client, config.request_config()),
        }
    }

    pub fn chat_completion(&self, payload: &ChatPayload) -> Result<ChatCompletion, UnifyError> {
        Ok(self
            .request_builder
            .request_json(&payload.endpoint(), Some(&payload.body))?)
    }

    pub fn open_chat_stream(&self, payload: &ChatPayload) -> Result<ChunkLines, UnifyError> {
        Ok(self
            .request_builder
            .open_stream(&payload.endpoint(), &payload.body)?)
    }

    pub fn get_credit_balance(&self) -> Result<f64, UnifyError> {
        let response: CreditsResponse = self.request_builder.request(&routes::credits())?;
        Ok(response.credits)
    }

    pub fn get_endpoint_metrics(&self, endpoint: &str) -> Result<Metrics, UnifyError> {
        let records = self
            .request_builder
            .request(&routes::endpoint_metrics(endpoint)?)?;
        first_metrics(endpoint, records)
    }

    pub fn list_endpoints(
        &self,
        model: Option<&str>,
        provider: Option<&str>,
    ) -> Result<Vec<String>, UnifyError> {
        Ok(self.request_builder.request(&routes::endpoints(model, provider))?)
    }

    pub fn list_models(&self, provider: Option<&str>) -> Result<Vec<String>, UnifyError> {
        Ok(self.request_builder.request(&routes::models(provider))?)
    }

    pub fn list_providers(&self, model: Option<&str>) -> Result<Vec<String>, UnifyError> {
        Ok(self.request_builder.request(&routes::providers(model))?)
    }
}
