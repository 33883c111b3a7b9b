//! VLANs.

use maas_core::{check_fields, ApiVersion, Checker, FieldMap, Readers, Resource, Result};
use serde_json::Value;

/// A virtual LAN inside a fabric.
///
/// The fabric is referenced by name only; VLANs never point back at a
/// [`crate::Fabric`] value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vlan {
    /// Database id.
    pub id: i64,
    /// Canonical API path.
    pub resource_uri: String,
    /// VLAN name. The implicit default VLAN of a fabric has none, read as `""`.
    pub name: String,
    /// Name of the owning fabric.
    pub fabric: String,
    /// 802.1Q VLAN id. 0 for the untagged VLAN.
    pub vid: i64,
    /// MTU of the VLAN.
    pub mtu: i64,
    /// Whether MAAS serves DHCP on this VLAN.
    pub dhcp: bool,
    /// System id of the primary rack controller, `""` when unset.
    pub primary_rack: String,
    /// System id of the secondary rack controller, `""` when unset.
    pub secondary_rack: String,
}

pub(crate) static VLANS: Readers<Vlan> = Readers::new("vlan", &[(ApiVersion::V2_0, vlan_2_0)]);

impl Resource for Vlan {
    fn readers() -> &'static Readers<Self> {
        &VLANS
    }
}

fn vlan_2_0(_version: ApiVersion, source: &Value) -> Result<Vlan> {
    let fields = FieldMap::new()
        .required("id", Checker::ForceInt)
        .required("resource_uri", Checker::String)
        .with_default("name", Checker::nullable(Checker::String), "")
        .required("fabric", Checker::String)
        .required("vid", Checker::ForceInt)
        .required("mtu", Checker::ForceInt)
        .required("dhcp_on", Checker::Bool)
        // racks are not always set
        .with_default("primary_rack", Checker::nullable(Checker::String), "")
        .with_default("secondary_rack", Checker::nullable(Checker::String), "");
    let record = check_fields(&fields, source, "vlan 2.0 schema check failed")?;

    Ok(Vlan {
        id: record.int("id")?,
        resource_uri: record.string("resource_uri")?,
        name: record.string("name")?,
        fabric: record.string("fabric")?,
        vid: record.int("vid")?,
        mtu: record.int("mtu")?,
        dhcp: record.bool("dhcp_on")?,
        primary_rack: record.string("primary_rack")?,
        secondary_rack: record.string("secondary_rack")?,
    })
}
