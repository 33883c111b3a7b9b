//! The controller version document.

use std::collections::BTreeSet;

use maas_core::{check_fields, ApiVersion, Checker, Error, FieldMap, Readers, Resource, Result};
use serde_json::Value;

/// Capability advertised by controllers that support network deployment.
pub const NETWORK_DEPLOYMENT_UBUNTU: &str = "network-deployment-ubuntu";

/// Version and capabilities reported by `api/2.0/version/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    /// MAAS release, e.g. `2.0.0`. The release number is reported, not the
    /// wire format version.
    pub version: ApiVersion,
    /// Build string, e.g. `beta3+bzr4941`.
    pub subversion: String,
    /// Capability names.
    pub capabilities: BTreeSet<String>,
}

impl VersionInfo {
    /// Returns true when the controller advertises `capability`.
    #[must_use]
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}

pub(crate) static VERSION_INFO: Readers<VersionInfo> =
    Readers::new("version", &[(ApiVersion::V2_0, version_info_2_0)]);

impl Resource for VersionInfo {
    fn readers() -> &'static Readers<Self> {
        &VERSION_INFO
    }
}

fn version_info_2_0(_version: ApiVersion, source: &Value) -> Result<VersionInfo> {
    let fields = FieldMap::new()
        .required("version", Checker::String)
        .with_default("subversion", Checker::nullable(Checker::String), "")
        .required("capabilities", Checker::list(Checker::String));
    let record = check_fields(&fields, source, "version 2.0 schema check failed")?;

    // Development builds report e.g. "2.1.0~beta1"; keep the numeric prefix.
    let raw = record.string("version")?;
    let numeric = raw.split(['~', '+', '-', ' ']).next().unwrap_or_default();
    let version = ApiVersion::parse(numeric)
        .map_err(|err| Error::deserialization("version 2.0 schema check failed: version", err))?;

    Ok(VersionInfo {
        version,
        subversion: record.string("subversion")?,
        capabilities: record.strings("capabilities")?.into_iter().collect(),
    })
}
