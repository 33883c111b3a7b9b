//! Spaces.

use maas_core::{check_fields, ApiVersion, Checker, FieldMap, Readers, Resource, Result};
use serde_json::Value;

use crate::subnet::{Subnet, SUBNETS};

/// A named group of subnets that can reach each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Space {
    /// Database id.
    pub id: i64,
    /// Canonical API path.
    pub resource_uri: String,
    /// Space name.
    pub name: String,
    /// Member subnets.
    pub subnets: Vec<Subnet>,
}

pub(crate) static SPACES: Readers<Space> = Readers::new("space", &[(ApiVersion::V2_0, space_2_0)]);

impl Resource for Space {
    fn readers() -> &'static Readers<Self> {
        &SPACES
    }
}

fn space_2_0(version: ApiVersion, source: &Value) -> Result<Space> {
    let fields = FieldMap::new()
        .required("resource_uri", Checker::String)
        .required("id", Checker::ForceInt)
        .required("name", Checker::String)
        .required("subnets", Checker::list(Checker::object()));
    let record = check_fields(&fields, source, "space 2.0 schema check failed")?;

    Ok(Space {
        id: record.int("id")?,
        resource_uri: record.string("resource_uri")?,
        name: record.string("name")?,
        subnets: SUBNETS.read_list_field(version, &record, "subnets")?,
    })
}
