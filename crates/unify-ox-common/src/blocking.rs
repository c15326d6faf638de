//! Blocking counterpart of [`crate::RequestBuilder`], built on `reqwest::blocking`.
//!
//! Must not be driven from inside an async runtime; `reqwest::blocking` runs
//! its own executor on a background thread.

use crate::{
    error::{self, CommonRequestError},
    request_builder::{AuthMethod, Endpoint, RequestConfig, decode_json},
    streaming::SseLines,
};
use reqwest::{
    Method,
    blocking::{Client, RequestBuilder as ReqwestRequestBuilder, Response},
};
use serde::{Deserialize, Serialize};
use std::io::BufReader;

#[derive(Debug, Clone)]
pub struct BlockingRequestBuilder {
    client: Client,
    config: RequestConfig,
}

impl BlockingRequestBuilder {
    pub fn new(client: Client, config: RequestConfig) -> Self {
        Self { client, config }
    }

    #[must_use]
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    pub fn build_request(&self, endpoint: &Endpoint) -> ReqwestRequestBuilder {
        let url = self.config.url_for(endpoint);
        let method: Method = endpoint.method.into();

        let mut req = self.client.request(method, &url);

        if !endpoint.query_params.is_empty() {
            req = req.query(&endpoint.query_params);
        }

        if let Some(AuthMethod::Bearer(token)) = &self.config.auth {
            req = req.bearer_auth(token);
        }

        for (key, value) in self.config.headers_for(endpoint) {
            req = req.header(key, value);
        }

        if let Some(timeout) = endpoint.timeout {
            req = req.timeout(timeout);
        }

        if endpoint.sends_json() {
            req = req.header("content-type", "application/json");
        }

        req
    }

    pub fn request_json<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        endpoint: &Endpoint,
        body: Option<&B>,
    ) -> Result<T, CommonRequestError> {
        let mut req = self.build_request(endpoint);

        if let Some(body) = body {
            let val = serde_json::to_value(body)?;
            log::debug!("{:?} {} payload: {}", endpoint.method, endpoint.path, val);
            req = req.json(&val);
        } else {
            log::debug!("{:?} {}", endpoint.method, endpoint.path);
        }

        Self::handle_response(req.send()?)
    }

    pub fn request<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &Endpoint,
    ) -> Result<T, CommonRequestError> {
        self.request_json(endpoint, None::<&()>)
    }

    /// Send a JSON body and return an iterator over the decoded SSE events.
    pub fn open_stream<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &Endpoint,
        body: &serde_json::Value,
    ) -> Result<SseLines<BufReader<Response>, T>, CommonRequestError> {
        log::debug!("STREAM {} payload: {}", endpoint.path, body);
        let response = self.build_request(endpoint).json(body).send()?;
        let status = response.status();

        if status.is_success() {
            Ok(SseLines::new(BufReader::new(response)))
        } else {
            let bytes = response.bytes()?;
            Err(error::parse_error_response(status, &bytes))
        }
    }

    fn handle_response<T: for<'de> Deserialize<'de>>(
        res: Response,
    ) -> Result<T, CommonRequestError> {
        let status = res.status();
        let bytes = res.bytes()?;

        if status.is_success() {
            decode_json(status, &bytes)
        } else {
            Err(error::parse_error_response(status, &bytes))
        }
    }
}
