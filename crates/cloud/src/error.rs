//! Error type shared by every Yandex Cloud service client.

use thiserror::Error;

/// Errors that can occur while talking to Yandex Cloud.
#[derive(Error, Debug)]
pub enum CloudError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Authentication error.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Long-running operation did not finish in time.
    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    /// Long-running operation finished with an error.
    #[error("Operation {id} failed: {code} - {message}")]
    Operation {
        /// Operation ID.
        id: String,
        /// gRPC status code.
        code: i32,
        /// Error message.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// XML (object storage) decoding error.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// Service account JWT could not be signed.
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl CloudError {
    /// Whether the error means the requested resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
