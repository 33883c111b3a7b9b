//! Boot images available for deployment.

use std::collections::BTreeSet;

use maas_core::{check_fields, ApiVersion, Checker, FieldMap, Readers, Resource, Result};
use serde_json::Value;

/// A boot resource synced or uploaded to the region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootResource {
    /// Database id.
    pub id: i64,
    /// Canonical API path.
    pub resource_uri: String,
    /// Resource name, e.g. `ubuntu/xenial`.
    pub name: String,
    /// `Synced`, `Uploaded` or `Generated`.
    pub kind: String,
    /// Architecture, e.g. `amd64/hwe-16.04`.
    pub architecture: String,
    /// Sub-architectures the image supports.
    pub sub_architectures: BTreeSet<String>,
    /// Kernel flavour, `""` when not reported.
    pub kernel_flavor: String,
}

pub(crate) static BOOT_RESOURCES: Readers<BootResource> =
    Readers::new("boot resource", &[(ApiVersion::V2_0, boot_resource_2_0)]);

impl Resource for BootResource {
    fn readers() -> &'static Readers<Self> {
        &BOOT_RESOURCES
    }
}

fn boot_resource_2_0(_version: ApiVersion, source: &Value) -> Result<BootResource> {
    let fields = FieldMap::new()
        .required("resource_uri", Checker::String)
        .required("id", Checker::ForceInt)
        .required("name", Checker::String)
        .required("type", Checker::String)
        .required("architecture", Checker::String)
        .with_default("subarches", Checker::nullable(Checker::String), "")
        .with_default("kflavor", Checker::nullable(Checker::String), "");
    let record = check_fields(&fields, source, "boot resource 2.0 schema check failed")?;

    let sub_architectures = record
        .string("subarches")?
        .split(',')
        .map(str::trim)
        .filter(|arch| !arch.is_empty())
        .map(str::to_string)
        .collect();

    Ok(BootResource {
        id: record.int("id")?,
        resource_uri: record.string("resource_uri")?,
        name: record.string("name")?,
        kind: record.string("type")?,
        architecture: record.string("architecture")?,
        sub_architectures,
        kernel_flavor: record.string("kflavor")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn splits_sub_architectures() {
        let resources = BootResource::read_list(
            ApiVersion::V2_0,
            &json!([
                {
                    "id": 5,
                    "resource_uri": "/MAAS/api/2.0/boot-resources/5/",
                    "name": "ubuntu/trusty",
                    "type": "Synced",
                    "architecture": "amd64/hwe-x",
                    "subarches": "generic,hwe-p,hwe-q,hwe-r,hwe-s,hwe-t,hwe-u,hwe-v,hwe-w,hwe-x",
                    "kflavor": "generic"
                },
                {
                    "id": 12,
                    "resource_uri": "/MAAS/api/2.0/boot-resources/12/",
                    "name": "centos/centos70",
                    "type": "Uploaded",
                    "architecture": "amd64/generic"
                }
            ]),
        )
        .unwrap();

        assert_eq!(resources[0].sub_architectures.len(), 10);
        assert!(resources[0].sub_architectures.contains("hwe-p"));
        assert_eq!(resources[0].kernel_flavor, "generic");
        assert!(resources[1].sub_architectures.is_empty());
        assert_eq!(resources[1].kernel_flavor, "");
        assert_eq!(resources[1].kind, "Uploaded");
    }
}
