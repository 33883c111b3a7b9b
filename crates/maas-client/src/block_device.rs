//! Storage: block devices, their partitions, and filesystems.

use maas_core::{check_fields, ApiVersion, Checker, FieldMap, Readers, Resource, Result};
use serde_json::Value;

/// A formatted filesystem on a partition or block device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filesystem {
    /// Filesystem type, e.g. `ext4`.
    pub fs_type: String,
    /// Mount point, `""` when unmounted.
    pub mount_point: String,
    /// Filesystem label, `""` when unset.
    pub label: String,
    /// Filesystem UUID, `""` when unset.
    pub uuid: String,
}

pub(crate) static FILESYSTEMS: Readers<Filesystem> =
    Readers::new("filesystem", &[(ApiVersion::V2_0, filesystem_2_0)]);

impl Resource for Filesystem {
    fn readers() -> &'static Readers<Self> {
        &FILESYSTEMS
    }
}

fn filesystem_2_0(_version: ApiVersion, source: &Value) -> Result<Filesystem> {
    let fields = FieldMap::new()
        .required("fstype", Checker::String)
        .with_default("mount_point", Checker::nullable(Checker::String), "")
        .with_default("label", Checker::nullable(Checker::String), "")
        .with_default("uuid", Checker::nullable(Checker::String), "");
    let record = check_fields(&fields, source, "filesystem 2.0 schema check failed")?;

    Ok(Filesystem {
        fs_type: record.string("fstype")?,
        mount_point: record.string("mount_point")?,
        label: record.string("label")?,
        uuid: record.string("uuid")?,
    })
}

/// A partition on a block device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Database id.
    pub id: i64,
    /// Canonical API path.
    pub resource_uri: String,
    /// Device path on the node.
    pub path: String,
    /// Partition UUID, `""` when unset.
    pub uuid: String,
    /// What the partition is used for, as reported by MAAS.
    pub used_for: String,
    /// Size in bytes.
    pub size: u64,
    /// Filesystem on the partition, if formatted.
    pub filesystem: Option<Filesystem>,
}

pub(crate) static PARTITIONS: Readers<Partition> =
    Readers::new("partition", &[(ApiVersion::V2_0, partition_2_0)]);

impl Resource for Partition {
    fn readers() -> &'static Readers<Self> {
        &PARTITIONS
    }
}

fn partition_2_0(version: ApiVersion, source: &Value) -> Result<Partition> {
    let fields = FieldMap::new()
        .required("resource_uri", Checker::String)
        .required("id", Checker::ForceInt)
        .required("path", Checker::String)
        .with_default("uuid", Checker::nullable(Checker::String), "")
        .required("used_for", Checker::String)
        .required("size", Checker::ForceUint)
        .optional("filesystem", Checker::nullable(Checker::object()));
    let record = check_fields(&fields, source, "partition 2.0 schema check failed")?;

    Ok(Partition {
        id: record.int("id")?,
        resource_uri: record.string("resource_uri")?,
        path: record.string("path")?,
        uuid: record.string("uuid")?,
        used_for: record.string("used_for")?,
        size: record.uint("size")?,
        filesystem: FILESYSTEMS.read_optional_field(version, &record, "filesystem")?,
    })
}

/// A physical or virtual block device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDevice {
    /// Database id.
    pub id: i64,
    /// Canonical API path.
    pub resource_uri: String,
    /// Device UUID, `""` when unset.
    pub uuid: String,
    /// Device name, e.g. `sda`.
    pub name: String,
    /// Hardware model, `""` for virtual devices.
    pub model: String,
    /// Stable `/dev/disk/by-id` path, `""` when unknown.
    pub id_path: String,
    /// Device path on the node.
    pub path: String,
    /// What the device is used for, as reported by MAAS.
    pub used_for: String,
    /// Device tags.
    pub tags: Vec<String>,
    /// Block size in bytes.
    pub block_size: u64,
    /// Bytes already allocated to partitions or filesystems.
    pub used_size: u64,
    /// Total size in bytes.
    pub size: u64,
    /// Partitions on the device.
    pub partitions: Vec<Partition>,
}

impl BlockDevice {
    /// Bytes not yet allocated.
    #[must_use]
    pub fn available_size(&self) -> u64 {
        self.size.saturating_sub(self.used_size)
    }
}

pub(crate) static BLOCK_DEVICES: Readers<BlockDevice> =
    Readers::new("blockdevice", &[(ApiVersion::V2_0, block_device_2_0)]);

impl Resource for BlockDevice {
    fn readers() -> &'static Readers<Self> {
        &BLOCK_DEVICES
    }
}

fn block_device_2_0(version: ApiVersion, source: &Value) -> Result<BlockDevice> {
    let fields = FieldMap::new()
        .required("resource_uri", Checker::String)
        .required("id", Checker::ForceInt)
        .with_default("uuid", Checker::nullable(Checker::String), "")
        .required("name", Checker::String)
        .with_default("model", Checker::nullable(Checker::String), "")
        .with_default("id_path", Checker::nullable(Checker::String), "")
        .required("path", Checker::String)
        .required("used_for", Checker::String)
        .required("tags", Checker::list(Checker::String))
        .required("block_size", Checker::ForceUint)
        .required("used_size", Checker::ForceUint)
        .required("size", Checker::ForceUint)
        .required("partitions", Checker::list(Checker::object()));
    let record = check_fields(&fields, source, "blockdevice 2.0 schema check failed")?;

    Ok(BlockDevice {
        id: record.int("id")?,
        resource_uri: record.string("resource_uri")?,
        uuid: record.string("uuid")?,
        name: record.string("name")?,
        model: record.string("model")?,
        id_path: record.string("id_path")?,
        path: record.string("path")?,
        used_for: record.string("used_for")?,
        tags: record.strings("tags")?,
        block_size: record.uint("block_size")?,
        used_size: record.uint("used_size")?,
        size: record.uint("size")?,
        partitions: PARTITIONS.read_list_field(version, &record, "partitions")?,
    })
}
