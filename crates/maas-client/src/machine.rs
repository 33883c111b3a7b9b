//! Machines.

use std::collections::BTreeMap;

use maas_core::{
    check_fields, ApiVersion, Checker, Error, FieldMap, Readers, Resource, Result, SystemId,
};
use serde_json::Value;

use crate::block_device::{BlockDevice, BLOCK_DEVICES};
use crate::interface::{Interface, INTERFACES};
use crate::zone::{Zone, ZONES};

/// A bare-metal machine managed by MAAS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    /// Node system id.
    pub system_id: SystemId,
    /// Canonical API path.
    pub resource_uri: String,
    /// Short hostname.
    pub hostname: String,
    /// Fully qualified domain name.
    pub fqdn: String,
    /// Tag names.
    pub tags: Vec<String>,
    /// Owning user, `""` when unallocated.
    pub owner: String,
    /// Caller supplied key/value data attached to the allocation.
    pub owner_data: BTreeMap<String, String>,
    /// Deployed operating system, e.g. `ubuntu`.
    pub operating_system: String,
    /// Release of the operating system, e.g. `xenial`.
    pub distro_series: String,
    /// Architecture, e.g. `amd64/generic`. `""` when unknown.
    pub architecture: String,
    /// Memory in MiB.
    pub memory: i64,
    /// Number of CPU cores.
    pub cpu_count: i64,
    /// Addresses assigned to the machine.
    pub ip_addresses: Vec<String>,
    /// Power state, e.g. `on`, `off`, `unknown`.
    pub power_state: String,
    /// Lifecycle status, e.g. `Ready`, `Deployed`.
    pub status_name: String,
    /// Last status message, `""` when none.
    pub status_message: String,
    /// Interface the machine PXE boots from.
    pub boot_interface: Option<Interface>,
    /// All network interfaces.
    pub interfaces: Vec<Interface>,
    /// Availability zone.
    pub zone: Zone,
    /// Physical disks.
    pub physical_block_devices: Vec<BlockDevice>,
    /// All block devices, physical and virtual.
    pub block_devices: Vec<BlockDevice>,
}

impl Machine {
    /// Looks up an interface by id.
    #[must_use]
    pub fn interface(&self, id: i64) -> Option<&Interface> {
        self.interfaces.iter().find(|iface| iface.id == id)
    }

    /// Looks up a physical block device by id.
    #[must_use]
    pub fn physical_block_device(&self, id: i64) -> Option<&BlockDevice> {
        self.physical_block_devices
            .iter()
            .find(|device| device.id == id)
    }

    /// Looks up a block device by id, physical or virtual.
    #[must_use]
    pub fn block_device(&self, id: i64) -> Option<&BlockDevice> {
        self.block_devices
            .iter()
            .find(|device| device.id == id)
            .or_else(|| self.physical_block_device(id))
    }

    /// Replaces this machine's state with a freshly read copy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Deserialization`] when `fresh` is another machine.
    pub fn update_from(&mut self, fresh: Machine) -> Result<()> {
        if fresh.system_id != self.system_id {
            return Err(Error::Deserialization(format!(
                "machine update: expected system id {}, got {}",
                self.system_id, fresh.system_id
            )));
        }
        *self = fresh;
        Ok(())
    }
}

pub(crate) static MACHINES: Readers<Machine> =
    Readers::new("machine", &[(ApiVersion::V2_0, machine_2_0)]);

impl Resource for Machine {
    fn readers() -> &'static Readers<Self> {
        &MACHINES
    }
}

fn machine_2_0(version: ApiVersion, source: &Value) -> Result<Machine> {
    let fields = FieldMap::new()
        .required("resource_uri", Checker::String)
        .required("system_id", Checker::String)
        .required("hostname", Checker::String)
        .required("fqdn", Checker::String)
        .required("tag_names", Checker::list(Checker::String))
        .with_default("owner", Checker::nullable(Checker::String), "")
        .with_default(
            "owner_data",
            Checker::string_map(Checker::String),
            Value::Object(serde_json::Map::new()),
        )
        .required("osystem", Checker::String)
        .required("distro_series", Checker::String)
        .with_default("architecture", Checker::nullable(Checker::String), "")
        .required("memory", Checker::ForceInt)
        .required("cpu_count", Checker::ForceInt)
        .required("ip_addresses", Checker::list(Checker::String))
        .required("power_state", Checker::String)
        .required("status_name", Checker::String)
        .with_default("status_message", Checker::nullable(Checker::String), "")
        .optional("boot_interface", Checker::nullable(Checker::object()))
        .required("interface_set", Checker::list(Checker::object()))
        .required("zone", Checker::object())
        .required("physicalblockdevice_set", Checker::list(Checker::object()))
        .required("blockdevice_set", Checker::list(Checker::object()));
    let record = check_fields(&fields, source, "machine 2.0 schema check failed")?;

    let system_id = SystemId::parse_str(&record.string("system_id")?)
        .map_err(|err| Error::deserialization("machine 2.0 schema check failed: system_id", err))?;

    Ok(Machine {
        system_id,
        resource_uri: record.string("resource_uri")?,
        hostname: record.string("hostname")?,
        fqdn: record.string("fqdn")?,
        tags: record.strings("tag_names")?,
        owner: record.string("owner")?,
        owner_data: record.string_map("owner_data")?,
        operating_system: record.string("osystem")?,
        distro_series: record.string("distro_series")?,
        architecture: record.string("architecture")?,
        memory: record.int("memory")?,
        cpu_count: record.int("cpu_count")?,
        ip_addresses: record.strings("ip_addresses")?,
        power_state: record.string("power_state")?,
        status_name: record.string("status_name")?,
        status_message: record.string("status_message")?,
        boot_interface: INTERFACES.read_optional_field(version, &record, "boot_interface")?,
        interfaces: INTERFACES.read_list_field(version, &record, "interface_set")?,
        zone: ZONES.read_field(version, &record, "zone")?,
        physical_block_devices: BLOCK_DEVICES.read_list_field(
            version,
            &record,
            "physicalblockdevice_set",
        )?,
        block_devices: BLOCK_DEVICES.read_list_field(version, &record, "blockdevice_set")?,
    })
}
