//! Strongly-typed identifiers for MAAS nodes.
//!
//! Machines, devices and controllers are all "nodes" in MAAS and share the
//! same short alphanumeric system id namespace (e.g. `4y3h7n`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// System id of a MAAS node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SystemId(String);

impl SystemId {
    /// Parses a system id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotValid`] for empty input or characters other than
    /// ASCII letters, digits, `-` and `_`.
    pub fn parse_str(input: &str) -> Result<Self> {
        let valid = !input.is_empty()
            && input
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(input.to_string()))
        } else {
            Err(Error::NotValid(format!("invalid system id {input:?}")))
        }
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Converts into the inner string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl FromStr for SystemId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SystemId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse_str(&value)
    }
}

impl From<SystemId> for String {
    fn from(id: SystemId) -> Self {
        id.0
    }
}

impl AsRef<str> for SystemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for SystemId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SystemId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
