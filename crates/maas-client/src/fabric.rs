//! Fabrics.

use maas_core::{check_fields, ApiVersion, Checker, FieldMap, Readers, Resource, Result};
use serde_json::Value;

use crate::vlan::{Vlan, VLANS};

/// A set of mutually reachable VLANs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fabric {
    /// Database id.
    pub id: i64,
    /// Canonical API path.
    pub resource_uri: String,
    /// Fabric name.
    pub name: String,
    /// Optional class, `""` when unset.
    pub class_type: String,
    /// VLANs on this fabric.
    pub vlans: Vec<Vlan>,
}

impl Fabric {
    /// The untagged (vid 0) VLAN every fabric carries.
    #[must_use]
    pub fn default_vlan(&self) -> Option<&Vlan> {
        self.vlans.iter().find(|vlan| vlan.vid == 0)
    }
}

pub(crate) static FABRICS: Readers<Fabric> =
    Readers::new("fabric", &[(ApiVersion::V2_0, fabric_2_0)]);

impl Resource for Fabric {
    fn readers() -> &'static Readers<Self> {
        &FABRICS
    }
}

fn fabric_2_0(version: ApiVersion, source: &Value) -> Result<Fabric> {
    let fields = FieldMap::new()
        .required("resource_uri", Checker::String)
        .required("id", Checker::ForceInt)
        .required("name", Checker::String)
        .with_default("class_type", Checker::nullable(Checker::String), "")
        .required("vlans", Checker::list(Checker::object()));
    let record = check_fields(&fields, source, "fabric 2.0 schema check failed")?;

    Ok(Fabric {
        id: record.int("id")?,
        resource_uri: record.string("resource_uri")?,
        name: record.string("name")?,
        class_type: record.string("class_type")?,
        vlans: VLANS.read_list_field(version, &record, "vlans")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fabric_json() -> Value {
        json!({
            "name": "fabric-0",
            "id": 0,
            "class_type": null,
            "resource_uri": "/MAAS/api/2.0/fabrics/0/",
            "vlans": [
                {
                    "id": 5001,
                    "resource_uri": "/MAAS/api/2.0/vlans/5001/",
                    "name": "untagged",
                    "fabric": "fabric-0",
                    "vid": 0,
                    "mtu": 1500,
                    "dhcp_on": false,
                    "primary_rack": null,
                    "secondary_rack": null
                },
                {
                    "id": 5004,
                    "resource_uri": "/MAAS/api/2.0/vlans/5004/",
                    "name": "admin",
                    "fabric": "fabric-0",
                    "vid": 100,
                    "mtu": 1500,
                    "dhcp_on": true,
                    "primary_rack": "4y3h7n",
                    "secondary_rack": null
                }
            ]
        })
    }

    #[test]
    fn reads_fabric_with_vlans() {
        let fabric = Fabric::read(ApiVersion::V2_0, &fabric_json()).unwrap();
        assert_eq!(fabric.name, "fabric-0");
        assert_eq!(fabric.class_type, "");
        assert_eq!(fabric.vlans.len(), 2);
        assert_eq!(fabric.default_vlan().map(|vlan| vlan.id), Some(5001));
        assert_eq!(fabric.vlans[1].primary_rack, "4y3h7n");
    }

    #[test]
    fn bad_vlan_is_annotated_with_index() {
        let mut source = fabric_json();
        source["vlans"][1]["vid"] = json!([]);
        let err = Fabric::read(ApiVersion::V2_0, &source).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Deserialization error: vlans: vlan 1: vlan 2.0 schema check failed: \
             vid: expected int, got list(len 0)"
        );
    }

    #[test]
    fn vlans_must_be_a_list() {
        let mut source = fabric_json();
        source["vlans"] = json!({"id": 1});
        let err = Fabric::read(ApiVersion::V2_0, &source).unwrap_err();
        assert!(err
            .to_string()
            .contains("fabric 2.0 schema check failed: vlans: expected list, got map"));
    }
}
