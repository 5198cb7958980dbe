use thiserror::Error;

/// Errors returned by the price queries.
///
/// Rows and columns that fail to parse are not errors; they are dropped
/// while normalizing the payload.
#[derive(Debug, Error)]
pub enum PriceError {
    #[error("malformed {field} '{value}': {reason}")]
    MalformedInput {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("unexpected response payload: {0}")]
    Decode(String),

    #[error("no price found for {0}")]
    NotFound(String),
}

impl From<serde_json::Error> for PriceError {
    fn from(err: serde_json::Error) -> Self {
        PriceError::Decode(err.to_string())
    }
}

pub type Result<T, E = PriceError> = std::result::Result<T, E>;
