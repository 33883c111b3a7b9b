//! API versions and version-keyed strategy tables.
//!
//! The MAAS wire format has changed across releases. Each resource type keeps
//! a table of strategies keyed by the version that introduced them, and
//! [`VersionTable::select`] picks the newest strategy the server can speak.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A `major.minor.patch` MAAS API version.
///
/// Parsing accepts one to three dot-separated components; missing components
/// are zero, so `"2.0"` and `"2.0.0"` are the same version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiVersion {
    /// Major component
    pub major: u32,
    /// Minor component
    pub minor: u32,
    /// Patch component
    pub patch: u32,
}

impl ApiVersion {
    /// The 2.0 API, the oldest wire format this crate reads.
    pub const V2_0: Self = Self::new(2, 0, 0);

    /// Creates a version from its components.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parses a version string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotValid`] if the string is not one to three
    /// dot-separated unsigned integers.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || Error::NotValid(format!("invalid API version {input:?}"));
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let mut parts = [0u32; 3];
        for (index, part) in trimmed.split('.').enumerate() {
            if index >= parts.len() {
                return Err(invalid());
            }
            parts[index] = part.parse().map_err(|_| invalid())?;
        }

        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl FromStr for ApiVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ApiVersion {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ApiVersion> for String {
    fn from(version: ApiVersion) -> Self {
        version.to_string()
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Static table of strategies keyed by the version that introduced them.
///
/// Tables are built once as `static` data and never mutated, so concurrent
/// readers need no locking. Versions in a table are unique.
#[derive(Debug)]
pub struct VersionTable<F: 'static> {
    type_name: &'static str,
    entries: &'static [(ApiVersion, F)],
}

impl<F: Copy + 'static> VersionTable<F> {
    /// Creates a table for the named resource type.
    #[must_use]
    pub const fn new(type_name: &'static str, entries: &'static [(ApiVersion, F)]) -> Self {
        Self {
            type_name,
            entries,
        }
    }

    /// Resource type the table serves, used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Registered versions in table order.
    pub fn versions(&self) -> impl Iterator<Item = ApiVersion> + '_ {
        self.entries.iter().map(|(version, _)| *version)
    }

    /// Selects the strategy with the highest registered version not
    /// exceeding `requested`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedVersion`] when every registered version is
    /// newer than `requested`.
    pub fn select(&self, requested: ApiVersion) -> Result<(ApiVersion, F)> {
        self.entries
            .iter()
            .filter(|(version, _)| *version <= requested)
            .max_by_key(|(version, _)| *version)
            .map(|(version, strategy)| (*version, *strategy))
            .ok_or_else(|| Error::unsupported_version(self.type_name, requested))
    }
}
