//! Error types for the DaData client.
//!
//! # Design
//! Three kinds of failure reach the caller from a round-trip: the network
//! failed (`Transport`), a success body was not JSON (`Decode`), or the API
//! answered with something other than what the operation needs (`Api`).
//! `Api` covers both non-200 statuses and 200 responses whose envelope is
//! missing the expected field. A record a selector cannot resolve is not an
//! error; it shows up as `None` in the batch output.

use thiserror::Error;

/// Detail text attached to `Api` errors when a 200 envelope has the wrong shape.
pub const UNEXPECTED_ANSWER: &str = "Unexpected answer";

/// Errors returned by `DaDataClient` and its building blocks.
#[derive(Debug, Error)]
pub enum Error {
    /// DNS, connect, TLS, timeout or body-read failure. Never retried.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The body of a 200 response is not valid JSON.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// The API rejected the call or answered with an unexpected shape.
    #[error("API error (HTTP {status}){}", .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    Api { status: u16, detail: Option<String> },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Credentials or client configuration could not be loaded.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl Error {
    pub(crate) fn unexpected_answer(status: u16) -> Self {
        Error::Api {
            status,
            detail: Some(UNEXPECTED_ANSWER.to_string()),
        }
    }

    /// Status code carried by an `Api` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-supplied (or client-assigned) detail text of an `Api` error.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Error::Api { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
