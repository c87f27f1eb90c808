//! Error types for the Manifold API client.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The API key is missing from the environment.
    #[error("MANIFOLD_API_KEY environment variable not set")]
    MissingCredential,

    /// Invalid configuration (base URL, settings file).
    #[error("configuration error: {0}")]
    Config(String),

    /// Rejected locally before any request was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Non-2xx response from the API.
    #[error("{}", describe_api_error(*status, message.as_deref(), body))]
    Api {
        status: StatusCode,
        message: Option<String>,
        body: String,
    },

    /// Connection, DNS or timeout failure; no response was received.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A success response whose body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build an `Api` error from a status and raw response body, extracting
    /// the `message` field when the body is a JSON object carrying one.
    pub fn from_response(status: StatusCode, body: String) -> Self {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message);
        Error::Api {
            status,
            message,
            body,
        }
    }

    /// Human-readable detail of a remote rejection, if any.
    pub fn api_message(&self) -> Option<&str> {
        match self {
            Error::Api { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport(e) if e.is_timeout())
    }
}

/// Error payload returned by the API on failure.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

fn describe_api_error(status: StatusCode, message: Option<&str>, body: &str) -> String {
    match message {
        Some(msg) => format!("API error ({}): {msg}", status.as_u16()),
        None => format!("API request failed ({}): {body}", status.as_u16()),
    }
}
