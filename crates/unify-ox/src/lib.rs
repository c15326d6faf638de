#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(clippy::pedantic, clippy::unwrap_used)]

//! Client for the Unify LLM routing API
//!
//! A client is pinned to one `model@provider` endpoint and carries default
//! generation parameters. Each `generate` call resolves its own overrides
//! over those defaults, builds an OpenAI-compatible chat-completions request
//! and returns text, a full completion, or a stream.

pub mod api;
pub mod cache;
pub mod chatbot;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod params;
pub mod query;

pub use api::{BlockingUnifyApi, DatasetEntry, Metrics, UnifyApi};
pub use cache::ResponseCache;
pub use chatbot::ChatBot;
pub use client::{AsyncUnify, ChunkStream, Client, Generation, StreamItem, TextStream, Unify};
pub use config::ApiConfig;
pub use endpoint::EndpointIdentity;
pub use error::UnifyError;
pub use params::GenerateParams;
pub use query::{ChatPayload, PlatformArgs, Query};

pub use unify_ox_common::{
    ApiError, ApiErrorKind, ChatCompletion, ChatCompletionChunk, ChatMessage, MessageRole,
    ResponseFormat, Stop, StreamOptions, Tool, ToolChoice, ToolChoiceMode,
};
