//! Network interfaces and their subnet links.

use std::fmt;

use maas_core::{check_fields, ApiVersion, Checker, Error, FieldMap, Readers, Resource, Result};
use serde_json::Value;

use crate::subnet::{Subnet, SUBNETS};
use crate::vlan::{Vlan, VLANS};

/// How an interface obtains its address on a linked subnet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LinkMode {
    /// Address assigned by DHCP.
    Dhcp,
    /// Fixed address chosen by MAAS or the caller.
    Static,
    /// Interface is up on the subnet without an address.
    LinkUp,
    /// MAAS picks a static address at deploy time.
    Auto,
    /// A mode this client does not know about, kept verbatim.
    Other(String),
}

impl LinkMode {
    /// Wire form of the mode.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Dhcp => "dhcp",
            Self::Static => "static",
            Self::LinkUp => "link_up",
            Self::Auto => "auto",
            Self::Other(mode) => mode,
        }
    }
}

impl From<&str> for LinkMode {
    fn from(mode: &str) -> Self {
        match mode.to_ascii_lowercase().as_str() {
            "dhcp" => Self::Dhcp,
            "static" => Self::Static,
            "link_up" => Self::LinkUp,
            "auto" => Self::Auto,
            _ => Self::Other(mode.to_string()),
        }
    }
}

impl fmt::Display for LinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection of an interface to a subnet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Database id.
    pub id: i64,
    /// Addressing mode.
    pub mode: LinkMode,
    /// Linked subnet. Absent for unconfigured links.
    pub subnet: Option<Subnet>,
    /// Assigned address, `""` when none.
    pub ip_address: String,
}

pub(crate) static LINKS: Readers<Link> = Readers::new("link", &[(ApiVersion::V2_0, link_2_0)]);

impl Resource for Link {
    fn readers() -> &'static Readers<Self> {
        &LINKS
    }
}

fn link_2_0(version: ApiVersion, source: &Value) -> Result<Link> {
    let fields = FieldMap::new()
        .required("id", Checker::ForceInt)
        .required("mode", Checker::String)
        .optional("subnet", Checker::object())
        .with_default("ip_address", Checker::nullable(Checker::String), "");
    let record = check_fields(&fields, source, "link 2.0 schema check failed")?;

    Ok(Link {
        id: record.int("id")?,
        mode: LinkMode::from(record.string("mode")?.as_str()),
        subnet: SUBNETS.read_optional_field(version, &record, "subnet")?,
        ip_address: record.string("ip_address")?,
    })
}

/// A network interface on a machine or device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    /// Database id.
    pub id: i64,
    /// Canonical API path.
    pub resource_uri: String,
    /// Interface name, e.g. `eth0`.
    pub name: String,
    /// Interface type: `physical`, `bond`, `vlan`, `bridge`.
    pub kind: String,
    /// Whether the interface is enabled.
    pub enabled: bool,
    /// Interface tags.
    pub tags: Vec<String>,
    /// VLAN the interface is attached to. Disconnected interfaces have none.
    pub vlan: Option<Vlan>,
    /// Subnet links.
    pub links: Vec<Link>,
    /// Hardware address, `""` when unknown.
    pub mac_address: String,
    /// MTU in effect.
    pub effective_mtu: i64,
    /// Names of the parent interfaces.
    pub parents: Vec<String>,
    /// Names of the child interfaces.
    pub children: Vec<String>,
}

impl Interface {
    /// The link to the subnet with id `subnet_id`, if any.
    #[must_use]
    pub fn link_for_subnet(&self, subnet_id: i64) -> Option<&Link> {
        self.links
            .iter()
            .find(|link| link.subnet.as_ref().is_some_and(|subnet| subnet.id == subnet_id))
    }

    /// Replaces every field with the values of a freshly read copy of the
    /// same interface.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Deserialization`] when `fresh` has a different id.
    pub fn update_from(&mut self, fresh: Interface) -> Result<()> {
        if fresh.id != self.id {
            return Err(Error::Deserialization(format!(
                "interface update: expected id {}, got {}",
                self.id, fresh.id
            )));
        }
        *self = fresh;
        Ok(())
    }
}

pub(crate) static INTERFACES: Readers<Interface> =
    Readers::new("interface", &[(ApiVersion::V2_0, interface_2_0)]);

impl Resource for Interface {
    fn readers() -> &'static Readers<Self> {
        &INTERFACES
    }
}

fn interface_2_0(version: ApiVersion, source: &Value) -> Result<Interface> {
    let fields = FieldMap::new()
        .required("resource_uri", Checker::String)
        .required("id", Checker::ForceInt)
        .required("name", Checker::String)
        .required("type", Checker::String)
        .required("enabled", Checker::Bool)
        .with_default(
            "tags",
            Checker::nullable(Checker::list(Checker::String)),
            Value::Array(Vec::new()),
        )
        .required("vlan", Checker::nullable(Checker::object()))
        .required("links", Checker::list(Checker::object()))
        .with_default("mac_address", Checker::nullable(Checker::String), "")
        .required("effective_mtu", Checker::ForceInt)
        .required("parents", Checker::list(Checker::String))
        .required("children", Checker::list(Checker::String));
    let record = check_fields(&fields, source, "interface 2.0 schema check failed")?;

    Ok(Interface {
        id: record.int("id")?,
        resource_uri: record.string("resource_uri")?,
        name: record.string("name")?,
        kind: record.string("type")?,
        enabled: record.bool("enabled")?,
        tags: record.strings("tags")?,
        vlan: VLANS.read_optional_field(version, &record, "vlan")?,
        links: LINKS.read_list_field(version, &record, "links")?,
        mac_address: record.string("mac_address")?,
        effective_mtu: record.int("effective_mtu")?,
        parents: record.strings("parents")?,
        children: record.strings("children")?,
    })
}
