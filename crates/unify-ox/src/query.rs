use std::collections::BTreeMap;

use bon::Builder;
use serde::Serialize;
use serde_json::{Map, Value, json};
use unify_ox_common::{
    ChatMessage, Endpoint, HttpMethod, ResponseFormat, Stop, StreamOptions, Tool, ToolChoice,
};

use crate::{GenerateParams, UnifyError};

/// Client identifier sent with every completion request.
pub const SIGNATURE: &str = "rust";

/// Outbound chat-completion parameters for a single call.
#[derive(Debug, Clone, Serialize, Builder)]
#[builder(builder_type(vis = "pub"), state_mod(vis = "pub"))]
pub struct Query {
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<BTreeMap<String, i32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_logprobs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Stop>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,

    #[serde(skip)]
    #[builder(default)]
    pub extra_headers: BTreeMap<String, String>,
    #[serde(skip)]
    #[builder(default)]
    pub extra_query: BTreeMap<String, String>,
    #[serde(skip)]
    #[builder(default)]
    pub extra_body: Map<String, Value>,
}

/// Platform fields merged into the top level of every request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformArgs {
    pub use_custom_keys: bool,
    pub tags: Option<Vec<String>>,
}

impl Query {
    /// Take the query fields of already-resolved parameters.
    pub fn from_params(messages: Vec<ChatMessage>, params: &GenerateParams) -> Self {
        Self::builder()
            .messages(messages)
            .maybe_frequency_penalty(params.frequency_penalty)
            .maybe_logit_bias(params.logit_bias.clone())
            .maybe_logprobs(params.logprobs)
            .maybe_top_logprobs(params.top_logprobs)
            .maybe_max_tokens(params.max_tokens)
            .maybe_n(params.n)
            .maybe_presence_penalty(params.presence_penalty)
            .maybe_response_format(params.response_format.clone())
            .maybe_seed(params.seed)
            .maybe_stop(params.stop.clone())
            .maybe_temperature(params.temperature)
            .maybe_top_p(params.top_p)
            .maybe_tools(params.tools.clone())
            .maybe_tool_choice(params.tool_choice.clone())
            .maybe_parallel_tool_calls(params.parallel_tool_calls)
            .extra_headers(params.extra_headers.clone().unwrap_or_default())
            .extra_query(params.extra_query.clone().unwrap_or_default())
            .extra_body(params.extra_body.clone().unwrap_or_default())
            .build()
    }

    /// Build the request for `endpoint`.
    ///
    /// `stream` is `Some` for streaming calls and carries the optional stream options.
    pub fn into_payload(
        self,
        endpoint: &str,
        platform: &PlatformArgs,
        stream: Option<Option<&StreamOptions>>,
    ) -> Result<ChatPayload, UnifyError> {
        let Value::Object(mut body) = serde_json::to_value(&self)? else {
            return Err(UnifyError::Value("query did not serialize to an object".into()));
        };

        body.insert("model".into(), json!(endpoint));
        if let Some(options) = stream {
            body.insert("stream".into(), json!(true));
            if let Some(options) = options {
                body.insert("stream_options".into(), serde_json::to_value(options)?);
            }
        }

        body.insert("signature".into(), json!(SIGNATURE));
        body.insert("use_custom_keys".into(), json!(platform.use_custom_keys));
        if let Some(tags) = &platform.tags {
            body.insert("tags".into(), json!(tags));
        }

        body.extend(self.extra_body);
        body.retain(|_, value| !value.is_null());

        Ok(ChatPayload {
            body: Value::Object(body),
            headers: self.extra_headers,
            query: self.extra_query,
        })
    }
}

/// Fully built chat-completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatPayload {
    pub body: Value,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
}

impl ChatPayload {
    /// Canonical string used to key the response cache.
    ///
    /// Object keys serialize in sorted order, so equal payloads give equal keys.
    pub fn cache_key(&self) -> Result<String, UnifyError> {
        Ok(serde_json::to_string(self)?)
    }

    pub(crate) fn endpoint(&self) -> Endpoint {
        Endpoint::new("chat/completions", HttpMethod::Post)
            .with_headers(self.headers.clone())
            .with_query_params(self.query.clone())
    }
}
