use crate::error::{self, CommonRequestError};
use reqwest::{Method, RequestBuilder as ReqwestRequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, time::Duration};

/// HTTP method for API endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

/// Represents an API endpoint with its per-request configuration
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub path: String,
    pub method: HttpMethod,
    pub extra_headers: BTreeMap<String, String>,
    pub query_params: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl Endpoint {
    pub fn new(path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            path: path.into(),
            method,
            extra_headers: BTreeMap::new(),
            query_params: Vec::new(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.extra_headers.extend(headers);
        self
    }

    #[must_use]
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_query_params(mut self, params: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query_params.extend(params);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Whether the request carries a JSON body by default.
    pub(crate) fn sends_json(&self) -> bool {
        matches!(self.method, HttpMethod::Post)
    }
}

/// Authentication method for API requests
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// Bearer token authentication (Authorization: Bearer <token>)
    Bearer(String),
}

/// Configuration for request building
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub base_url: String,
    pub auth: Option<AuthMethod>,
    pub default_headers: BTreeMap<String, String>,
    pub user_agent: Option<String>,
}

impl RequestConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth: None,
            default_headers: BTreeMap::new(),
            user_agent: None,
        }
    }

    #[must_use]
    pub fn with_auth(mut self, auth: AuthMethod) -> Self {
        self.auth = Some(auth);
        self
    }

    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Full URL for an endpoint path, tolerant of stray slashes on either side.
    #[must_use]
    pub fn url_for(&self, endpoint: &Endpoint) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.path.trim_start_matches('/')
        )
    }

    /// Headers applied to every request: defaults, endpoint extras, user agent.
    /// Later entries win when the same header name appears twice.
    pub(crate) fn headers_for<'a>(
        &'a self,
        endpoint: &'a Endpoint,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.default_headers
            .iter()
            .chain(endpoint.extra_headers.iter())
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(self.user_agent.as_deref().map(|ua| ("user-agent", ua)))
    }
}

/// Decode a JSON body, reporting the raw text when it does not match `T`.
pub(crate) fn decode_json<T: for<'de> Deserialize<'de>>(
    status: reqwest::StatusCode,
    bytes: &[u8],
) -> Result<T, CommonRequestError> {
    serde_json::from_slice::<T>(bytes).map_err(|e| {
        CommonRequestError::UnexpectedResponse(format!(
            "HTTP {} but failed to decode JSON: {}; body: {}",
            status.as_u16(),
            e,
            String::from_utf8_lossy(bytes)
        ))
    })
}

/// Async request builder that handles the common HTTP patterns
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    client: reqwest::Client,
    config: RequestConfig,
}

impl RequestBuilder {
    pub fn new(client: reqwest::Client, config: RequestConfig) -> Self {
        Self { client, config }
    }

    #[must_use]
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Build a reqwest RequestBuilder for the given endpoint
    pub fn build_request(&self, endpoint: &Endpoint) -> ReqwestRequestBuilder {
        self.build_request_with_options(endpoint, true)
    }

    /// Build a reqwest RequestBuilder with options for content-type handling
    pub fn build_request_with_options(
        &self,
        endpoint: &Endpoint,
        add_json_content_type: bool,
    ) -> ReqwestRequestBuilder {
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

        if add_json_content_type && endpoint.sends_json() {
            req = req.header("content-type", "application/json");
        }

        req
    }

    /// Execute a request with an optional JSON body and return the deserialized response
    pub async fn request_json<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        endpoint: &Endpoint,
        body: Option<&B>,
    ) -> Result<T, CommonRequestError> {
        let mut req = self.build_request(endpoint);

        if let Some(body) = body {
            // Normalize body to serde_json::Value to avoid any accidental double-encoding
            let val = serde_json::to_value(body)?;
            log::debug!("{:?} {} payload: {}", endpoint.method, endpoint.path, val);
            req = req.json(&val);
        } else {
            log::debug!("{:?} {}", endpoint.method, endpoint.path);
        }

        let res = req.send().await?;
        Self::handle_response(res).await
    }

    /// Execute a request without body and return the deserialized response
    pub async fn request<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &Endpoint,
    ) -> Result<T, CommonRequestError> {
        self.request_json(endpoint, None::<&()>).await
    }

    /// Execute a request and discard the body (for delete operations)
    pub async fn request_unit(&self, endpoint: &Endpoint) -> Result<(), CommonRequestError> {
        log::debug!("{:?} {}", endpoint.method, endpoint.path);
        let res = self.build_request(endpoint).send().await?;

        let status = res.status();
        if status.is_success() {
            Ok(())
        } else {
            let bytes = res.bytes().await?;
            Err(error::parse_error_response(status, &bytes))
        }
    }

    /// Send a JSON body and hand back the successful response for streaming.
    ///
    /// The caller decodes the body, typically with [`crate::SseParser`].
    pub async fn open_stream(
        &self,
        endpoint: &Endpoint,
        body: &serde_json::Value,
    ) -> Result<Response, CommonRequestError> {
        log::debug!("STREAM {} payload: {}", endpoint.path, body);
        let response = self.build_request(endpoint).json(body).send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else {
            let bytes = response.bytes().await?;
            Err(error::parse_error_response(status, &bytes))
        }
    }

    /// Execute a multipart form request (for file uploads)
    pub async fn request_multipart<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &Endpoint,
        form: reqwest::multipart::Form,
    ) -> Result<T, CommonRequestError> {
        log::debug!("{:?} {} (multipart)", endpoint.method, endpoint.path);
        // reqwest sets the multipart boundary content-type itself
        let req = self.build_request_with_options(endpoint, false).multipart(form);

        let res = req.send().await?;
        Self::handle_response(res).await
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        res: Response,
    ) -> Result<T, CommonRequestError> {
        let status = res.status();
        let bytes = res.bytes().await?;

        if status.is_success() {
            decode_json(status, &bytes)
        } else {
            Err(error::parse_error_response(status, &bytes))
        }
    }
}

/// Helper struct for building multipart forms
pub struct MultipartForm {
    form: reqwest::multipart::Form,
}

impl MultipartForm {
    /// Create a new multipart form
    pub fn new() -> Self {
        Self {
            form: reqwest::multipart::Form::new(),
        }
    }

    /// Add a text field
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form = self.form.text(name.into(), value.into());
        self
    }

    /// Add a file from bytes
    #[must_use]
    pub fn file_from_bytes(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        let part = reqwest::multipart::Part::bytes(data).file_name(filename.into());
        self.form = self.form.part(name.into(), part);
        self
    }

    /// Build the final form
    pub fn build(self) -> reqwest::multipart::Form {
        self.form
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}
