//! Request arguments for controller operations.
//!
//! Each argument type validates locally before any request is made and
//! renders itself as form parameters. Empty strings and empty lists mean
//! "not given" and are left out of the request.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use maas_core::query::QueryParams;
use maas_core::{Error, Result};

use crate::interface::LinkMode;
use crate::machine::Machine;
use crate::subnet::Subnet;

/// Filters for listing machines.
#[derive(Debug, Default, Clone)]
pub struct MachinesArgs {
    /// Match any of these hostnames.
    pub hostnames: Vec<String>,
    /// Match any of these system ids.
    pub system_ids: Vec<String>,
    /// Match this domain.
    pub domain: String,
    /// Match this zone.
    pub zone: String,
    /// Match this agent name.
    pub agent_name: String,
    /// Match any of these MAC addresses.
    pub mac_addresses: Vec<String>,
    /// Keep only machines whose owner data contains every entry. Applied
    /// client side; MAAS has no server filter for it.
    pub owner_data: BTreeMap<String, String>,
}

impl MachinesArgs {
    /// Convert the filters into request parameters.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryParams::new();
        params.push_each("hostname", &self.hostnames);
        params.push_each("mac_address", &self.mac_addresses);
        params.push_each("id", &self.system_ids);
        params.push_nonempty("domain", &self.domain);
        params.push_nonempty("zone", &self.zone);
        params.push_nonempty("agent_name", &self.agent_name);
        params.into_pairs()
    }

    /// Returns true when `machine` carries every requested owner data entry.
    #[must_use]
    pub fn matches_owner_data(&self, machine: &Machine) -> bool {
        self.owner_data
            .iter()
            .all(|(key, value)| machine.owner_data.get(key) == Some(value))
    }
}

/// A labelled network constraint for allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSpec {
    /// Label used to report which interfaces matched.
    pub label: String,
    /// Space the interface must be attached to.
    pub space: String,
}

impl InterfaceSpec {
    fn validate(&self) -> Result<()> {
        if self.label.is_empty() {
            return Err(Error::NotValid("interface spec: missing label".to_string()));
        }
        if self.space.is_empty() {
            return Err(Error::NotValid(format!(
                "interface spec {:?}: missing space",
                self.label
            )));
        }
        Ok(())
    }

    fn render(&self) -> String {
        format!("{}:space={}", self.label, self.space)
    }
}

/// A storage constraint for allocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageSpec {
    /// Optional label used to report which devices matched.
    pub label: String,
    /// Minimum size in GB.
    pub size: u64,
    /// Tags the device must carry.
    pub tags: Vec<String>,
}

impl StorageSpec {
    fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::NotValid(format!(
                "storage spec {:?}: size must be positive",
                self.label
            )));
        }
        if self.tags.iter().any(String::is_empty) {
            return Err(Error::NotValid(format!(
                "storage spec {:?}: empty tag",
                self.label
            )));
        }
        Ok(())
    }

    fn render(&self) -> String {
        let mut rendered = String::new();
        if !self.label.is_empty() {
            rendered.push_str(&self.label);
            rendered.push(':');
        }
        rendered.push_str(&self.size.to_string());
        if !self.tags.is_empty() {
            rendered.push('(');
            rendered.push_str(&self.tags.join(","));
            rendered.push(')');
        }
        rendered
    }
}

/// Constraints for allocating a machine.
#[derive(Debug, Default, Clone)]
pub struct AllocateMachineArgs {
    /// Exact hostname.
    pub hostname: String,
    /// Exact system id.
    pub system_id: String,
    /// Architecture, e.g. `amd64/generic`.
    pub architecture: String,
    /// Minimum number of CPU cores.
    pub min_cpu_count: Option<u32>,
    /// Minimum memory in MiB.
    pub min_memory: Option<u64>,
    /// Tags the machine must carry.
    pub tags: Vec<String>,
    /// Tags the machine must not carry.
    pub not_tags: Vec<String>,
    /// Zone the machine must be in.
    pub zone: String,
    /// Zones the machine must not be in.
    pub not_in_zone: Vec<String>,
    /// Labelled network constraints.
    pub interfaces: Vec<InterfaceSpec>,
    /// Spaces the machine must not be attached to.
    pub not_space: Vec<String>,
    /// Storage constraints.
    pub storage: Vec<StorageSpec>,
    /// Agent name recorded on the allocation.
    pub agent_name: String,
    /// Comment recorded in the event log.
    pub comment: String,
    /// Ask MAAS which machine would match without allocating it.
    pub dry_run: bool,
}

impl AllocateMachineArgs {
    /// Check the constraints locally.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotValid`] for missing or duplicate interface labels,
    /// an interface without a space, an empty `not_space` entry, a storage spec
    /// without a positive size, or duplicate storage labels.
    pub fn validate(&self) -> Result<()> {
        let mut labels = HashSet::new();
        for spec in &self.interfaces {
            spec.validate()?;
            if !labels.insert(spec.label.as_str()) {
                return Err(Error::NotValid(format!(
                    "duplicate interface label {:?}",
                    spec.label
                )));
            }
        }
        if self.not_space.iter().any(String::is_empty) {
            return Err(Error::NotValid("empty not_space value".to_string()));
        }

        let mut labels = HashSet::new();
        for spec in &self.storage {
            spec.validate()?;
            if !spec.label.is_empty() && !labels.insert(spec.label.as_str()) {
                return Err(Error::NotValid(format!(
                    "duplicate storage label {:?}",
                    spec.label
                )));
            }
        }
        Ok(())
    }

    /// Convert the constraints into request parameters.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryParams::new();
        params.push_nonempty("name", &self.hostname);
        params.push_nonempty("system_id", &self.system_id);
        params.push_nonempty("arch", &self.architecture);
        params.push_opt("cpu_count", self.min_cpu_count);
        params.push_opt("mem", self.min_memory);
        params.push_nonempty("tags", &self.tags.join(","));
        params.push_nonempty("not_tags", &self.not_tags.join(","));
        params.push_nonempty("zone", &self.zone);
        params.push_each("not_in_zone", &self.not_in_zone);
        params.push_nonempty(
            "interfaces",
            &self
                .interfaces
                .iter()
                .map(InterfaceSpec::render)
                .collect::<Vec<_>>()
                .join(";"),
        );
        params.push_each(
            "not_networks",
            self.not_space.iter().map(|space| format!("space:{space}")),
        );
        params.push_nonempty(
            "storage",
            &self
                .storage
                .iter()
                .map(StorageSpec::render)
                .collect::<Vec<_>>()
                .join(","),
        );
        params.push_nonempty("agent_name", &self.agent_name);
        params.push_nonempty("comment", &self.comment);
        params.push_flag("dry_run", self.dry_run);
        params.into_pairs()
    }
}

/// Machines to release back to the pool.
#[derive(Debug, Default, Clone)]
pub struct ReleaseMachinesArgs {
    /// System ids to release.
    pub system_ids: Vec<String>,
    /// Comment recorded in the event log.
    pub comment: String,
}

impl ReleaseMachinesArgs {
    /// Convert into request parameters.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryParams::new();
        params.push_each("machines", &self.system_ids);
        params.push_nonempty("comment", &self.comment);
        params.into_pairs()
    }
}

/// Deployment options for starting a machine.
#[derive(Debug, Default, Clone)]
pub struct StartArgs {
    /// Base64 encoded cloud-init user data.
    pub user_data: String,
    /// OS release to deploy.
    pub distro_series: String,
    /// Kernel to deploy, e.g. `hwe-16.04`.
    pub kernel: String,
    /// Comment recorded in the event log.
    pub comment: String,
}

impl StartArgs {
    /// Convert into request parameters.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryParams::new();
        params.push_nonempty("user_data", &self.user_data);
        params.push_nonempty("distro_series", &self.distro_series);
        params.push_nonempty("hwe_kernel", &self.kernel);
        params.push_nonempty("comment", &self.comment);
        params.into_pairs()
    }
}

/// Filters for listing devices.
#[derive(Debug, Default, Clone)]
pub struct DevicesArgs {
    /// Match any of these hostnames.
    pub hostnames: Vec<String>,
    /// Match any of these MAC addresses.
    pub mac_addresses: Vec<String>,
    /// Match any of these system ids.
    pub system_ids: Vec<String>,
    /// Match this domain.
    pub domain: String,
    /// Match this zone.
    pub zone: String,
    /// Match this agent name.
    pub agent_name: String,
}

impl DevicesArgs {
    /// Convert the filters into request parameters.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryParams::new();
        params.push_each("hostname", &self.hostnames);
        params.push_each("mac_address", &self.mac_addresses);
        params.push_each("id", &self.system_ids);
        params.push_nonempty("domain", &self.domain);
        params.push_nonempty("zone", &self.zone);
        params.push_nonempty("agent_name", &self.agent_name);
        params.into_pairs()
    }
}

/// A new device.
#[derive(Debug, Default, Clone)]
pub struct CreateDeviceArgs {
    /// Hostname; MAAS generates one when empty.
    pub hostname: String,
    /// MAC addresses of the device. At least one is required.
    pub mac_addresses: Vec<String>,
    /// Domain to place the device in.
    pub domain: String,
    /// System id of the parent node.
    pub parent: String,
}

impl CreateDeviceArgs {
    /// Check the arguments locally.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotValid`] when no MAC address is given.
    pub fn validate(&self) -> Result<()> {
        if self.mac_addresses.iter().all(String::is_empty) {
            return Err(Error::NotValid(
                "at least one MAC address must be specified".to_string(),
            ));
        }
        Ok(())
    }

    /// Convert into request parameters.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryParams::new();
        params.push_nonempty("hostname", &self.hostname);
        params.push_nonempty("domain", &self.domain);
        params.push_each("mac_addresses", &self.mac_addresses);
        params.push_nonempty("parent", &self.parent);
        params.into_pairs()
    }
}

/// A device to create as a child of a machine, with its single interface.
#[derive(Debug, Default, Clone)]
pub struct CreateMachineDeviceArgs {
    /// Hostname; MAAS generates one when empty.
    pub hostname: String,
    /// Name of the device's interface.
    pub interface_name: String,
    /// MAC address of the device's interface.
    pub mac_address: String,
    /// Subnet to statically link the interface to.
    pub subnet: Option<Subnet>,
    /// VLAN id to attach the interface to. Defaults to the subnet's VLAN.
    pub vlan_id: Option<i64>,
}

impl CreateMachineDeviceArgs {
    /// Check the arguments locally.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotValid`] when the interface name or MAC address is
    /// missing, neither a subnet nor a VLAN is given, or the VLAN disagrees
    /// with the subnet.
    pub fn validate(&self) -> Result<()> {
        if self.interface_name.is_empty() {
            return Err(Error::NotValid("missing interface name".to_string()));
        }
        if self.mac_address.is_empty() {
            return Err(Error::NotValid("missing MAC address".to_string()));
        }
        match (&self.subnet, self.vlan_id) {
            (None, None) => Err(Error::NotValid(
                "missing subnet and VLAN, one must be specified".to_string(),
            )),
            (Some(subnet), Some(vlan_id)) if subnet.vlan.id != vlan_id => {
                Err(Error::NotValid(format!(
                    "given subnet {:?} on VLAN {}, but VLAN {vlan_id} requested",
                    subnet.cidr, subnet.vlan.id
                )))
            }
            _ => Ok(()),
        }
    }

    /// VLAN the interface ends up on.
    #[must_use]
    pub fn effective_vlan_id(&self) -> Option<i64> {
        self.vlan_id
            .or_else(|| self.subnet.as_ref().map(|subnet| subnet.vlan.id))
    }
}

/// A new physical interface on a device.
#[derive(Debug, Default, Clone)]
pub struct CreateInterfaceArgs {
    /// Interface name.
    pub name: String,
    /// MAC address.
    pub mac_address: String,
    /// VLAN id to attach the interface to.
    pub vlan_id: i64,
    /// Interface tags.
    pub tags: Vec<String>,
    /// MTU override.
    pub mtu: Option<i64>,
    /// Accept router advertisements.
    pub accept_ra: bool,
    /// Perform stateless autoconfiguration.
    pub autoconf: bool,
}

impl CreateInterfaceArgs {
    /// Check the arguments locally.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotValid`] when the name or MAC address is missing.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::NotValid("missing name".to_string()));
        }
        if self.mac_address.is_empty() {
            return Err(Error::NotValid("missing MAC address".to_string()));
        }
        Ok(())
    }

    /// Convert into request parameters.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryParams::new();
        params.push("name", &self.name);
        params.push("mac_address", &self.mac_address);
        params.push("vlan", self.vlan_id);
        params.push_nonempty("tags", &self.tags.join(","));
        params.push_opt("mtu", self.mtu);
        params.push_flag("accept_ra", self.accept_ra);
        params.push_flag("autoconf", self.autoconf);
        params.into_pairs()
    }
}

/// Changes to an interface. Empty or absent fields are left unchanged.
#[derive(Debug, Default, Clone)]
pub struct UpdateInterfaceArgs {
    /// New name.
    pub name: String,
    /// New MAC address.
    pub mac_address: String,
    /// New VLAN id.
    pub vlan_id: Option<i64>,
}

impl UpdateInterfaceArgs {
    /// Convert into request parameters.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryParams::new();
        params.push_nonempty("name", &self.name);
        params.push_nonempty("mac_address", &self.mac_address);
        params.push_opt("vlan", self.vlan_id);
        params.into_pairs()
    }

    /// Returns true when nothing would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.mac_address.is_empty() && self.vlan_id.is_none()
    }
}

/// Linking an interface to a subnet.
#[derive(Debug, Clone)]
pub struct LinkSubnetArgs {
    /// Addressing mode.
    pub mode: LinkMode,
    /// Subnet id to link to.
    pub subnet_id: i64,
    /// Address to claim. Only valid in static mode.
    pub ip_address: String,
    /// Use the subnet's gateway as the default route. Only valid in auto or
    /// static mode.
    pub default_gateway: bool,
}

impl LinkSubnetArgs {
    /// A link in `mode` to `subnet` with no address or gateway options.
    #[must_use]
    pub fn new(mode: LinkMode, subnet: &Subnet) -> Self {
        Self {
            mode,
            subnet_id: subnet.id,
            ip_address: String::new(),
            default_gateway: false,
        }
    }

    /// Check the arguments locally.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotValid`] for an unknown mode, an address outside
    /// static mode, or a default gateway outside auto and static modes.
    pub fn validate(&self) -> Result<()> {
        if let LinkMode::Other(mode) = &self.mode {
            return Err(Error::NotValid(format!("unknown link mode {mode:?}")));
        }
        if !self.ip_address.is_empty() && self.mode != LinkMode::Static {
            return Err(Error::NotValid(format!(
                "setting an IP address is only valid in static mode, not {}",
                self.mode
            )));
        }
        if self.default_gateway && !matches!(self.mode, LinkMode::Auto | LinkMode::Static) {
            return Err(Error::NotValid(format!(
                "specifying default gateway is only valid in auto or static mode, not {}",
                self.mode
            )));
        }
        Ok(())
    }

    /// Convert into request parameters.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryParams::new();
        params.push("mode", self.mode.as_str().to_ascii_uppercase());
        params.push("subnet", self.subnet_id);
        params.push_nonempty("ip_address", &self.ip_address);
        params.push_flag("default_gateway", self.default_gateway);
        params.into_pairs()
    }
}

/// A file to upload. Exactly one of `content` and `path` must be set.
#[derive(Debug, Default, Clone)]
pub struct AddFileArgs {
    /// Name to store the file under.
    pub filename: String,
    /// Bytes to upload.
    pub content: Option<Vec<u8>>,
    /// Local file to upload.
    pub path: Option<PathBuf>,
}

impl AddFileArgs {
    /// Check the arguments locally.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotValid`] when the filename is missing or not
    /// exactly one source is given.
    pub fn validate(&self) -> Result<()> {
        if self.filename.is_empty() {
            return Err(Error::NotValid("missing filename".to_string()));
        }
        match (&self.content, &self.path) {
            (Some(_), None) | (None, Some(_)) => Ok(()),
            (None, None) => Err(Error::NotValid(
                "missing content or path, one must be specified".to_string(),
            )),
            (Some(_), Some(_)) => Err(Error::NotValid(
                "both content and path specified, only one allowed".to_string(),
            )),
        }
    }
}
