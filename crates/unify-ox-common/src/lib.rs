#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(clippy::pedantic, clippy::unwrap_used)]

//! Shared HTTP plumbing for the Unify client
//!
//! Request building (async and blocking), server-sent event decoding, the
//! status-code error taxonomy and the OpenAI-compatible wire types used by
//! the chat-completions endpoint.

pub mod blocking;
pub mod error;
pub mod openai_format;
pub mod request_builder;
pub mod response_format;
pub mod streaming;
pub mod timestamp;

pub use blocking::BlockingRequestBuilder;
pub use error::{ApiError, ApiErrorKind, CommonRequestError};
pub use openai_format::*;
pub use request_builder::{AuthMethod, Endpoint, HttpMethod, MultipartForm, RequestBuilder, RequestConfig};
pub use response_format::ResponseFormat;
pub use streaming::{SseDecoder, SseLines, SseParser};
pub use timestamp::Timestamp;
