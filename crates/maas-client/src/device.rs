//! Devices: non-deployable nodes such as containers or appliances.

use maas_core::{
    check_fields, ApiVersion, Checker, Error, FieldMap, Readers, Resource, Result, SystemId,
};
use serde_json::Value;

use crate::interface::{Interface, INTERFACES};
use crate::zone::{Zone, ZONES};

/// A device registered with MAAS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Node system id.
    pub system_id: SystemId,
    /// Canonical API path.
    pub resource_uri: String,
    /// Short hostname.
    pub hostname: String,
    /// Fully qualified domain name.
    pub fqdn: String,
    /// System id of the parent node, `""` for standalone devices.
    pub parent: String,
    /// Owning user, `""` when none.
    pub owner: String,
    /// Addresses assigned to the device.
    pub ip_addresses: Vec<String>,
    /// Network interfaces.
    pub interfaces: Vec<Interface>,
    /// Availability zone.
    pub zone: Zone,
}

impl Device {
    /// Looks up an interface by id.
    #[must_use]
    pub fn interface(&self, id: i64) -> Option<&Interface> {
        self.interfaces.iter().find(|iface| iface.id == id)
    }

    /// Replaces this device's state with a freshly read copy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Deserialization`] when `fresh` is another device.
    pub fn update_from(&mut self, fresh: Device) -> Result<()> {
        if fresh.system_id != self.system_id {
            return Err(Error::Deserialization(format!(
                "device update: expected system id {}, got {}",
                self.system_id, fresh.system_id
            )));
        }
        *self = fresh;
        Ok(())
    }
}

pub(crate) static DEVICES: Readers<Device> =
    Readers::new("device", &[(ApiVersion::V2_0, device_2_0)]);

impl Resource for Device {
    fn readers() -> &'static Readers<Self> {
        &DEVICES
    }
}

fn device_2_0(version: ApiVersion, source: &Value) -> Result<Device> {
    let fields = FieldMap::new()
        .required("resource_uri", Checker::String)
        .required("system_id", Checker::String)
        .required("hostname", Checker::String)
        .required("fqdn", Checker::String)
        .with_default("parent", Checker::nullable(Checker::String), "")
        .with_default("owner", Checker::nullable(Checker::String), "")
        .required("ip_addresses", Checker::list(Checker::String))
        .required("interface_set", Checker::list(Checker::object()))
        .required("zone", Checker::object());
    let record = check_fields(&fields, source, "device 2.0 schema check failed")?;

    let system_id = SystemId::parse_str(&record.string("system_id")?)
        .map_err(|err| Error::deserialization("device 2.0 schema check failed: system_id", err))?;

    Ok(Device {
        system_id,
        resource_uri: record.string("resource_uri")?,
        hostname: record.string("hostname")?,
        fqdn: record.string("fqdn")?,
        parent: record.string("parent")?,
        owner: record.string("owner")?,
        ip_addresses: record.strings("ip_addresses")?,
        interfaces: INTERFACES.read_list_field(version, &record, "interface_set")?,
        zone: ZONES.read_field(version, &record, "zone")?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::interface::tests::interface_json;
    use serde_json::json;

    pub(crate) fn device_json(system_id: &str) -> Value {
        json!({
            "system_id": system_id,
            "resource_uri": format!("/MAAS/api/2.0/devices/{system_id}/"),
            "hostname": "furnacelike-brittney",
            "fqdn": "furnacelike-brittney.maas",
            "domain": {"name": "maas", "id": 0},
            "parent": null,
            "owner": null,
            "tag_names": [],
            "ip_addresses": [],
            "interface_set": [interface_json(48, "eth0")],
            "zone": {
                "name": "default",
                "description": "",
                "resource_uri": "/MAAS/api/2.0/zones/default/"
            }
        })
    }

    #[test]
    fn null_owner_and_parent_read_as_empty() {
        let device = Device::read(ApiVersion::V2_0, &device_json("4y3haf")).unwrap();
        assert_eq!(device.system_id, "4y3haf");
        assert_eq!(device.owner, "");
        assert_eq!(device.parent, "");
        assert!(device.ip_addresses.is_empty());
        assert_eq!(device.interface(48).map(|iface| iface.name.as_str()), Some("eth0"));
    }

    #[test]
    fn owned_device_with_parent() {
        let mut source = device_json("4y3haf");
        source["owner"] = json!("thumper");
        source["parent"] = json!("4y3ha3");
        let device = Device::read(ApiVersion::V2_0, &source).unwrap();
        assert_eq!(device.owner, "thumper");
        assert_eq!(device.parent, "4y3ha3");
    }

    #[test]
    fn list_reader_rejects_scalar() {
        let err = Device::read_list(ApiVersion::V2_0, &json!("wat?")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Deserialization error: device base schema check failed: expected list, got string(\"wat?\")"
        );
    }

    #[test]
    fn malformed_system_id_is_rejected() {
        let mut source = device_json("4y3haf");
        source["system_id"] = json!("");
        let err = Device::read(ApiVersion::V2_0, &source).unwrap_err();
        assert!(matches!(err, Error::Deserialization(message) if message.contains("system_id")));
    }

    #[test]
    fn update_from_checks_identity() {
        let mut device = Device::read(ApiVersion::V2_0, &device_json("4y3haf")).unwrap();
        let mut source = device_json("4y3haf");
        source["interface_set"] = json!([interface_json(48, "eth0"), interface_json(49, "eth1")]);
        device
            .update_from(Device::read(ApiVersion::V2_0, &source).unwrap())
            .unwrap();
        assert_eq!(device.interfaces.len(), 2);

        let other = Device::read(ApiVersion::V2_0, &device_json("4y3hag")).unwrap();
        assert!(device.update_from(other).is_err());
    }
}
