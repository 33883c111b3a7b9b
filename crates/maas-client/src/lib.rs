//! Typed client for the MAAS bare-metal provisioning API.
//!
//! Responses are read through versioned per-type readers: each resource type
//! registers one reader per API version, the controller's negotiated version
//! selects the newest reader not newer than it, and every nested resource is
//! read with the same version. Shape problems surface as
//! [`Error::Deserialization`] naming the path to the offending field.
//!
//! ```no_run
//! use maas_client::{Controller, MachinesArgs};
//!
//! # async fn run() -> maas_client::Result<()> {
//! let controller = Controller::connect("http://maas.example.com:5240/MAAS/").await?;
//! for machine in controller.machines(&MachinesArgs::default()).await? {
//!     println!("{} {}", machine.system_id, machine.status_name);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod args;
pub mod auth;
pub mod block_device;
pub mod boot_resource;
pub mod client;
pub mod constraints;
pub mod device;
pub mod fabric;
pub mod file;
pub mod interface;
pub mod machine;
pub mod space;
pub mod static_route;
pub mod subnet;
pub mod version_info;
pub mod vlan;
pub mod zone;

pub use args::{
    AddFileArgs, AllocateMachineArgs, CreateDeviceArgs, CreateInterfaceArgs,
    CreateMachineDeviceArgs, DevicesArgs, InterfaceSpec, LinkSubnetArgs, MachinesArgs,
    ReleaseMachinesArgs, StartArgs, StorageSpec, UpdateInterfaceArgs,
};
pub use auth::{Authorizer, StaticAuthorizer};
pub use block_device::{BlockDevice, Filesystem, Partition};
pub use boot_resource::BootResource;
pub use client::{Controller, ControllerBuilder};
pub use constraints::{resolve, AllocatedMachine, ConstraintMatches};
pub use device::Device;
pub use fabric::Fabric;
pub use file::File;
pub use interface::{Interface, Link, LinkMode};
pub use machine::Machine;
pub use maas_core::{ApiVersion, Error, Resource, SystemId};
pub use space::Space;
pub use static_route::StaticRoute;
pub use subnet::Subnet;
pub use version_info::{VersionInfo, NETWORK_DEPLOYMENT_UBUNTU};
pub use vlan::Vlan;
pub use zone::Zone;

/// Convenient result alias sharing the `maas-core` error type.
pub type Result<T> = maas_core::Result<T>;
