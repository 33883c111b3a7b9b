//! Request authorization.
//!
//! The controller does not sign requests itself. An [`Authorizer`] supplies
//! the `Authorization` header value for every outgoing request.

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::Result;

/// Produces the `Authorization` header for a request.
#[cfg_attr(test, mockall::automock)]
pub trait Authorizer: Send + Sync {
    /// Header value for a request of `method` to `url`.
    ///
    /// # Errors
    ///
    /// Implementations return an error when no credential can be produced;
    /// the request is then not sent.
    fn authorize(&self, method: &Method, url: &Url) -> Result<String>;
}

/// Sends the same pre-computed header value with every request.
pub struct StaticAuthorizer {
    header: SecretString,
}

impl StaticAuthorizer {
    /// Wraps a ready-made `Authorization` header value.
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: SecretString::from(header.into()),
        }
    }
}

impl std::fmt::Debug for StaticAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticAuthorizer")
            .field("header", &"[REDACTED]")
            .finish()
    }
}

impl Authorizer for StaticAuthorizer {
    fn authorize(&self, _method: &Method, _url: &Url) -> Result<String> {
        Ok(self.header.expose_secret().to_string())
    }
}
