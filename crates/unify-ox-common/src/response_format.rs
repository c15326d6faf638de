use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Requested output format for a completion.
///
/// The endpoint expects a tagged object with a `type` discriminator;
/// `JsonSchema` nests the schema payload beneath a `json_schema` key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    JsonObject,
    JsonSchema { json_schema: Value },
}

impl ResponseFormat {
    /// Structured output constrained by `schema`, registered under `name`.
    #[must_use]
    pub fn json_schema(name: impl Into<String>, schema: Value) -> Self {
        Self::JsonSchema {
            json_schema: serde_json::json!({
                "name": name.into(),
                "schema": schema,
            }),
        }
    }
}
