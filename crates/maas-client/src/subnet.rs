//! Subnets.

use maas_core::{check_fields, ApiVersion, Checker, FieldMap, Readers, Resource, Result};
use serde_json::Value;

use crate::vlan::{Vlan, VLANS};

/// An IP subnet on a VLAN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subnet {
    /// Database id.
    pub id: i64,
    /// Canonical API path.
    pub resource_uri: String,
    /// Subnet name, usually the CIDR.
    pub name: String,
    /// Name of the space the subnet belongs to.
    pub space: String,
    /// VLAN the subnet lives on.
    pub vlan: Vlan,
    /// Default gateway, `""` when unset.
    pub gateway: String,
    /// Network in CIDR notation.
    pub cidr: String,
    /// DNS servers handed out for the subnet.
    pub dns_servers: Vec<String>,
}

pub(crate) static SUBNETS: Readers<Subnet> =
    Readers::new("subnet", &[(ApiVersion::V2_0, subnet_2_0)]);

impl Resource for Subnet {
    fn readers() -> &'static Readers<Self> {
        &SUBNETS
    }
}

fn subnet_2_0(version: ApiVersion, source: &Value) -> Result<Subnet> {
    let fields = FieldMap::new()
        .required("resource_uri", Checker::String)
        .required("id", Checker::ForceInt)
        .required("name", Checker::String)
        .required("space", Checker::String)
        .with_default("gateway_ip", Checker::nullable(Checker::String), "")
        .required("cidr", Checker::String)
        .required("vlan", Checker::object())
        .with_default(
            "dns_servers",
            Checker::nullable(Checker::list(Checker::String)),
            Value::Array(Vec::new()),
        );
    let record = check_fields(&fields, source, "subnet 2.0 schema check failed")?;

    Ok(Subnet {
        id: record.int("id")?,
        resource_uri: record.string("resource_uri")?,
        name: record.string("name")?,
        space: record.string("space")?,
        vlan: VLANS.read_field(version, &record, "vlan")?,
        gateway: record.string("gateway_ip")?,
        cidr: record.string("cidr")?,
        dns_servers: record.strings("dns_servers")?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn subnet_json(id: i64, cidr: &str) -> Value {
        json!({
            "id": id,
            "resource_uri": format!("/MAAS/api/2.0/subnets/{id}/"),
            "name": cidr,
            "space": "space-0",
            "gateway_ip": null,
            "cidr": cidr,
            "vlan": {
                "id": 1,
                "resource_uri": "/MAAS/api/2.0/vlans/1/",
                "name": "untagged",
                "fabric": "fabric-0",
                "vid": 0,
                "mtu": 1500,
                "dhcp_on": true,
                "primary_rack": "4y3h7n",
                "secondary_rack": null
            },
            "dns_servers": ["8.8.8.8"],
            "rdns_mode": 2,
            "active_discovery": false
        })
    }

    #[test]
    fn reads_subnet_with_embedded_vlan() {
        let subnet = Subnet::read(ApiVersion::V2_0, &subnet_json(1, "192.168.100.0/24")).unwrap();
        assert_eq!(subnet.cidr, "192.168.100.0/24");
        assert_eq!(subnet.space, "space-0");
        assert_eq!(subnet.gateway, "");
        assert_eq!(subnet.vlan.id, 1);
        assert_eq!(subnet.vlan.primary_rack, "4y3h7n");
        assert_eq!(subnet.dns_servers, vec!["8.8.8.8".to_string()]);
    }

    #[test]
    fn null_dns_servers_read_as_empty() {
        let mut source = subnet_json(2, "10.0.0.0/8");
        source["dns_servers"] = Value::Null;
        let subnet = Subnet::read(ApiVersion::V2_0, &source).unwrap();
        assert!(subnet.dns_servers.is_empty());
    }

    #[test]
    fn bad_vlan_names_the_field() {
        let mut source = subnet_json(3, "10.0.0.0/8");
        source["vlan"]["fabric"] = json!(7);
        let err = Subnet::read(ApiVersion::V2_0, &source).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Deserialization error: vlan: vlan 2.0 schema check failed: fabric: expected string, got int(7)"
        );
    }
}
