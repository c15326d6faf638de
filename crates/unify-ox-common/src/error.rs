use serde::Deserialize;
use strum::{Display, IntoStaticStr};
use thiserror::Error;

/// Errors that can occur while talking to the Unify HTTP API
#[derive(Error, Debug)]
pub enum CommonRequestError {
    /// HTTP request failed before a status was received
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The service answered with a non-success status
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A success status whose body could not be decoded
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid event data in streaming response
    #[error("Invalid event data: {0}")]
    InvalidEventData(String),

    /// UTF-8 conversion error
    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),

    /// I/O error while reading a blocking stream
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Kind of failure reported by the service, derived from the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum ApiErrorKind {
    #[strum(serialize = "bad request")]
    BadRequest,
    #[strum(serialize = "authentication error")]
    Authentication,
    #[strum(serialize = "permission denied")]
    PermissionDenied,
    #[strum(serialize = "not found")]
    NotFound,
    #[strum(serialize = "conflict")]
    Conflict,
    #[strum(serialize = "unprocessable entity")]
    UnprocessableEntity,
    #[strum(serialize = "rate limit exceeded")]
    RateLimit,
    #[strum(serialize = "internal server error")]
    InternalServer,
    #[strum(serialize = "unexpected status")]
    Unknown,
}

impl ApiErrorKind {
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Authentication,
            403 => Self::PermissionDenied,
            404 => Self::NotFound,
            409 => Self::Conflict,
            422 => Self::UnprocessableEntity,
            429 => Self::RateLimit,
            500..=599 => Self::InternalServer,
            _ => Self::Unknown,
        }
    }
}

/// A non-success response, carrying the service-provided message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} (HTTP {status}): {message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub status: u16,
    pub message: String,
}

/// Map a failed response to a typed [`ApiError`].
///
/// The message is taken from the JSON body when the service sent one of the
/// usual shapes (`{"error": {"message": ..}}`, `{"error": ".."}`,
/// `{"detail": ..}`, `{"message": ..}`), otherwise the raw body is used.
pub fn parse_error_response(status: reqwest::StatusCode, body: &[u8]) -> CommonRequestError {
    let code = status.as_u16();
    let message = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|json| extract_error_message(&json))
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());

    CommonRequestError::Api(ApiError {
        kind: ApiErrorKind::from_status(code),
        status: code,
        message,
    })
}

fn extract_error_message(json: &serde_json::Value) -> Option<String> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ErrorField {
        Message { message: String },
        Text(String),
    }

    if let Some(error) = json.get("error") {
        if let Ok(field) = ErrorField::deserialize(error) {
            return Some(match field {
                ErrorField::Message { message } | ErrorField::Text(message) => message,
            });
        }
    }

    // FastAPI-style validation errors put a string or a list under `detail`
    match json.get("detail") {
        Some(serde_json::Value::String(detail)) => return Some(detail.clone()),
        Some(detail @ serde_json::Value::Array(_)) => return Some(detail.to_string()),
        _ => {}
    }

    json.get("message")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}
