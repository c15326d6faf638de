use std::collections::BTreeMap;

use bon::Builder;
use serde_json::{Map, Value};
use unify_ox_common::{ChatMessage, ResponseFormat, Stop, StreamOptions, Tool, ToolChoice};

/// Declares the parameter record and its field-wise merge.
///
/// Every listed field is an `Option`; `fill_unset` copies a field from the
/// defaults only when it is still unset. `extra_body` merges key by key and
/// is handled outside the macro. Builder `field` members go first.
macro_rules! generate_params {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                pub $field:ident: Option<$ty:ty>,
            )*
        }
    ) => {
        $(#[$meta])*
        pub struct $name {
            /// Passthrough fields merged into the top level of the request body.
            #[builder(field)]
            pub extra_body: Option<Map<String, Value>>,

            $(
                $(#[$field_meta])*
                pub $field: Option<$ty>,
            )*
        }

        impl $name {
            fn fill_unset(&mut self, defaults: &Self) {
                $(
                    if self.$field.is_none() {
                        self.$field.clone_from(&defaults.$field);
                    }
                )*
            }
        }
    };
}

generate_params! {
    /// Generation parameters, usable both as client-level defaults and as
    /// per-call overrides.
    ///
    /// Unset fields mean "inherit": a call resolves as
    /// `call.or(&client_defaults).or(&GenerateParams::fallback())`.
    #[derive(Debug, Clone, Default, PartialEq, Builder)]
    #[builder(builder_type(vis = "pub"), state_mod(vis = "pub"))]
    pub struct GenerateParams {
        /// Conversation history. Mutually exclusive with a user prompt.
        #[builder(field)]
        pub messages: Option<Vec<ChatMessage>>,
        /// Prepended to the conversation as a system message.
        #[builder(into)]
        pub system_prompt: Option<String>,
        pub frequency_penalty: Option<f64>,
        pub logit_bias: Option<BTreeMap<String, i32>>,
        pub logprobs: Option<bool>,
        pub top_logprobs: Option<u32>,
        pub max_tokens: Option<u32>,
        pub n: Option<u32>,
        pub presence_penalty: Option<f64>,
        pub response_format: Option<ResponseFormat>,
        pub seed: Option<i64>,
        #[builder(into)]
        pub stop: Option<Stop>,
        pub stream: Option<bool>,
        pub stream_options: Option<StreamOptions>,
        pub temperature: Option<f64>,
        pub top_p: Option<f64>,
        pub tools: Option<Vec<Tool>>,
        pub tool_choice: Option<ToolChoice>,
        pub parallel_tool_calls: Option<bool>,
        /// Bill the call against the caller's own provider keys.
        pub use_custom_keys: Option<bool>,
        pub tags: Option<Vec<String>>,
        /// Return only the text of the first choice instead of the full completion.
        pub message_content_only: Option<bool>,
        /// Serve repeated non-streaming requests from the local cache.
        pub cache: Option<bool>,
        pub extra_headers: Option<BTreeMap<String, String>>,
        pub extra_query: Option<BTreeMap<String, String>>,
    }
}

impl<S: generate_params_builder::State> GenerateParamsBuilder<S> {
    pub fn messages(mut self, messages: impl IntoIterator<Item = ChatMessage>) -> Self {
        self.messages = Some(messages.into_iter().collect());
        self
    }

    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.get_or_insert_with(Vec::new).push(message);
        self
    }

    pub fn extra_body(mut self, extra_body: Map<String, Value>) -> Self {
        self.extra_body = Some(extra_body);
        self
    }

    pub fn extra_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra_body
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }
}

impl GenerateParams {
    /// Built-in values used when neither the call nor the client sets a field.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            temperature: Some(1.0),
            max_tokens: Some(1024),
            stream: Some(false),
            use_custom_keys: Some(false),
            message_content_only: Some(true),
            cache: Some(false),
            ..Self::default()
        }
    }

    /// Fill every unset field from `defaults`.
    ///
    /// `extra_body` is merged per key, with keys already present in `self` winning.
    #[must_use]
    pub fn or(mut self, defaults: &Self) -> Self {
        self.fill_unset(defaults);
        self.extra_body = match (self.extra_body.take(), &defaults.extra_body) {
            (Some(mut own), Some(inherited)) => {
                for (key, value) in inherited {
                    own.entry(key.clone()).or_insert_with(|| value.clone());
                }
                Some(own)
            }
            (Some(own), None) => Some(own),
            (None, inherited) => inherited.clone(),
        };
        self
    }

    pub(crate) fn has_tools(&self) -> bool {
        self.tools.as_ref().is_some_and(|tools| !tools.is_empty())
    }

    /// Whether the call should return only message text.
    ///
    /// Tools force the full completion so tool calls stay visible.
    pub(crate) fn content_only(&self) -> bool {
        self.message_content_only.unwrap_or(true) && !self.has_tools()
    }
}
