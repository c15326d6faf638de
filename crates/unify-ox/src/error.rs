use thiserror::Error;
use unify_ox_common::{ApiError, ApiErrorKind, CommonRequestError};

#[derive(Debug, Error)]
pub enum UnifyError {
    /// No API key was given and `UNIFY_KEY` is not set
    #[error("UNIFY_KEY is missing. Please make sure it is set correctly!")]
    MissingApiKey,

    /// Conflicting, missing or unsupported arguments
    #[error("{0}")]
    Usage(String),

    /// The service rejected the request with an error status
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Network or transport failure before a response arrived
    #[error("There was an error with the request: {0}")]
    Request(#[source] reqwest::Error),

    /// The response body was not the JSON we expected
    #[error("Error parsing JSON response: {0}")]
    Value(String),

    /// Malformed or in-band error event in a streaming response
    #[error("Invalid stream event: {0}")]
    Stream(String),

    /// Local file access (response cache, dataset files)
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl UnifyError {
    pub(crate) fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Kind of the mapped HTTP status error, if this is one.
    #[must_use]
    pub fn api_kind(&self) -> Option<ApiErrorKind> {
        match self {
            Self::Api(err) => Some(err.kind),
            _ => None,
        }
    }
}

impl From<CommonRequestError> for UnifyError {
    fn from(err: CommonRequestError) -> Self {
        match err {
            CommonRequestError::Http(e) => Self::Request(e),
            CommonRequestError::Api(e) => Self::Api(e),
            CommonRequestError::Json(e) => Self::Value(e.to_string()),
            CommonRequestError::UnexpectedResponse(msg) => Self::Value(msg),
            CommonRequestError::InvalidEventData(msg) => Self::Stream(msg),
            CommonRequestError::Utf8Error(e) => Self::Stream(e.to_string()),
            CommonRequestError::Io(e) => Self::Io(e),
        }
    }
}

impl From<serde_json::Error> for UnifyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Value(err.to_string())
    }
}
