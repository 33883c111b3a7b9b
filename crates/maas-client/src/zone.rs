//! Availability zones.

use maas_core::{check_fields, ApiVersion, Checker, FieldMap, Readers, Resource, Result};
use serde_json::Value;

/// A MAAS availability zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    /// Zone name.
    pub name: String,
    /// Free-form description, `""` when unset.
    pub description: String,
    /// Canonical API path of the zone.
    pub resource_uri: String,
}

pub(crate) static ZONES: Readers<Zone> = Readers::new("zone", &[(ApiVersion::V2_0, zone_2_0)]);

impl Resource for Zone {
    fn readers() -> &'static Readers<Self> {
        &ZONES
    }
}

fn zone_2_0(_version: ApiVersion, source: &Value) -> Result<Zone> {
    let fields = FieldMap::new()
        .required("name", Checker::String)
        .with_default("description", Checker::nullable(Checker::String), "")
        .with_default("resource_uri", Checker::nullable(Checker::String), "");
    let record = check_fields(&fields, source, "zone 2.0 schema check failed")?;

    Ok(Zone {
        name: record.string("name")?,
        description: record.string("description")?,
        resource_uri: record.string("resource_uri")?,
    })
}
