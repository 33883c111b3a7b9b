//! Error types for MAAS operations.
//!
//! The taxonomy is closed: every failure surfaced by the readers or the
//! controller is one of the variants below. Schema and shape failures become
//! [`Error::Deserialization`], a missing version strategy becomes
//! [`Error::UnsupportedVersion`], and HTTP status codes are classified by
//! [`Error::from_status`].

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

use crate::schema::SchemaError;
use crate::version::ApiVersion;

/// Main error type for MAAS operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A response did not match the expected schema.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// No reader is registered for the negotiated server version.
    #[error("Unsupported version: no {type_name} read function for version {version}")]
    UnsupportedVersion {
        /// Resource type that was being read
        type_name: String,
        /// Version requested by the caller
        version: ApiVersion,
    },

    /// Local argument validation failed before any request was made.
    #[error("Not valid: {0}")]
    NotValid(String),

    /// Resource not found (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// No machine matched the allocation constraints
    #[error("No match: {0}")]
    NoMatch(String),

    /// The caller lacks permission (HTTP 401/403)
    #[error("Permission denied: {0}")]
    Permission(String),

    /// The server rejected the request parameters (HTTP 400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The request conflicts with the resource state (HTTP 409)
    #[error("Cannot complete: {0}")]
    CannotComplete(String),

    /// Any other non-success response
    #[error("Unexpected response {status}: {body}")]
    Unexpected {
        /// HTTP status code
        status: u16,
        /// Response body, lossily decoded
        body: String,
    },

    /// MAAS is temporarily unavailable
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Operation timed out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid endpoint
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Specialized result type for MAAS operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Builds a deserialization error with a stage prefix, e.g.
    /// `"machine 2.0 schema check failed: hostname: expected string, got nothing"`.
    pub fn deserialization(stage: impl fmt::Display, cause: impl fmt::Display) -> Self {
        Self::Deserialization(format!("{stage}: {cause}"))
    }

    /// Builds an unsupported version error for a resource type.
    pub fn unsupported_version(type_name: impl Into<String>, version: ApiVersion) -> Self {
        Self::UnsupportedVersion {
            type_name: type_name.into(),
            version,
        }
    }

    /// Prefixes context (a list index or field name) onto a deserialization
    /// error. Other variants pass through untouched so the innermost cause is
    /// never lost.
    #[must_use]
    pub fn annotate(self, context: impl fmt::Display) -> Self {
        match self {
            Self::Deserialization(message) => {
                Self::Deserialization(format!("{context}: {message}"))
            }
            other => other,
        }
    }

    /// Classifies a non-success HTTP status into the error taxonomy.
    pub fn from_status(status: StatusCode, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            StatusCode::BAD_REQUEST => Self::BadRequest(body),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Permission(body),
            StatusCode::NOT_FOUND => Self::NotFound(body),
            StatusCode::CONFLICT => Self::CannotComplete(body),
            StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT => {
                Self::ServiceUnavailable(format!("MAAS temporarily unavailable ({status}): {body}"))
            }
            _ => Self::Unexpected {
                status: status.as_u16(),
                body,
            },
        }
    }

    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Deserialization(_) => "DESERIALIZATION_ERROR",
            Self::UnsupportedVersion { .. } => "UNSUPPORTED_VERSION",
            Self::NotValid(_) => "NOT_VALID",
            Self::NotFound(_) => "NOT_FOUND",
            Self::NoMatch(_) => "NO_MATCH",
            Self::Permission(_) => "PERMISSION",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::CannotComplete(_) => "CANNOT_COMPLETE",
            Self::Unexpected { .. } => "UNEXPECTED",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::HttpError(_) => "HTTP_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
        }
    }

    /// Returns true if the transport may retry the request that produced this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnavailable(_) | Self::Timeout(_) | Self::HttpError(_)
        )
    }

    /// Returns true if this error indicates a contract problem between client
    /// and server rather than an ordinary request failure.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(
            self,
            Self::Deserialization(_) | Self::UnsupportedVersion { .. } | Self::Unexpected { .. }
        )
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ServiceUnavailable(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Deserialization(err.to_string())
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Self::Deserialization(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ConfigError(err.to_string())
    }
}
