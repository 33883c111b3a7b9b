//! Resolution of allocation constraint matches.
//!
//! An allocation response reports which interfaces and block devices satisfied
//! each labelled constraint, by id:
//!
//! ```json
//! {"interfaces": {"db": [48]}, "storage": {"root": [1]}}
//! ```
//!
//! Resolution turns those ids into references into the allocated machine.
//! The resulting [`ConstraintMatches`] borrows the machine, so it cannot
//! outlive it.

use std::collections::BTreeMap;

use maas_core::{check_fields, ApiVersion, Checker, Error, FieldMap, Record, Resource, Result};
use serde_json::Value;
use tracing::debug;

use crate::block_device::BlockDevice;
use crate::interface::Interface;
use crate::machine::Machine;

const STAGE: &str = "constraint match schema check failed";

/// Interfaces and block devices matched per constraint label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintMatches<'m> {
    interfaces: BTreeMap<String, Vec<&'m Interface>>,
    storage: BTreeMap<String, Vec<&'m BlockDevice>>,
}

impl<'m> ConstraintMatches<'m> {
    /// Interfaces matched by the interface constraint `label`.
    #[must_use]
    pub fn interfaces(&self, label: &str) -> &[&'m Interface] {
        self.interfaces.get(label).map(Vec::as_slice).unwrap_or_default()
    }

    /// Block devices matched by the storage constraint `label`.
    #[must_use]
    pub fn storage(&self, label: &str) -> &[&'m BlockDevice] {
        self.storage.get(label).map(Vec::as_slice).unwrap_or_default()
    }

    /// Interface constraint labels, sorted.
    pub fn interface_labels(&self) -> impl Iterator<Item = &str> {
        self.interfaces.keys().map(String::as_str)
    }

    /// Storage constraint labels, sorted.
    pub fn storage_labels(&self) -> impl Iterator<Item = &str> {
        self.storage.keys().map(String::as_str)
    }

    /// Returns true when nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty() && self.storage.is_empty()
    }
}

/// Resolves a constraint match map against `machine`.
///
/// Interface ids are looked up among the machine's interfaces; storage ids
/// among its block devices, then its physical block devices.
///
/// # Errors
///
/// Returns [`Error::Deserialization`] when the map is malformed or names an id
/// the machine does not have. The message names the label and the id.
pub fn resolve<'m>(source: &Value, machine: &'m Machine) -> Result<ConstraintMatches<'m>> {
    Ok(Positions::locate(source, machine)?.view(machine))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StorageSlot {
    Block(usize),
    Physical(usize),
}

/// Validated constraint matches stored as indices into the machine's lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Positions {
    interfaces: BTreeMap<String, Vec<usize>>,
    storage: BTreeMap<String, Vec<StorageSlot>>,
}

impl Positions {
    fn locate(source: &Value, machine: &Machine) -> Result<Self> {
        let ids = Checker::nullable(Checker::list(Checker::ForceInt));
        let fields = FieldMap::new()
            .optional("interfaces", Checker::string_map(ids.clone()))
            .optional("storage", Checker::string_map(ids));
        let record = check_fields(&fields, source, STAGE)?;

        let mut positions = Self::default();
        for (label, ids) in labelled_ids(&record, "interfaces")? {
            let slots = ids
                .into_iter()
                .map(|id| {
                    machine
                        .interfaces
                        .iter()
                        .position(|iface| iface.id == id)
                        .ok_or_else(|| unknown_id("interface", "interface", &label, id))
                })
                .collect::<Result<Vec<_>>>()?;
            positions.interfaces.insert(label, slots);
        }
        for (label, ids) in labelled_ids(&record, "storage")? {
            let slots = ids
                .into_iter()
                .map(|id| {
                    storage_slot(machine, id)
                        .ok_or_else(|| unknown_id("storage", "block device", &label, id))
                })
                .collect::<Result<Vec<_>>>()?;
            positions.storage.insert(label, slots);
        }

        debug!(
            system_id = %machine.system_id,
            interfaces = positions.interfaces.len(),
            storage = positions.storage.len(),
            "resolved constraint matches"
        );
        Ok(positions)
    }

    fn view<'m>(&self, machine: &'m Machine) -> ConstraintMatches<'m> {
        let interfaces = self
            .interfaces
            .iter()
            .map(|(label, slots)| {
                let matched = slots
                    .iter()
                    .filter_map(|&slot| machine.interfaces.get(slot))
                    .collect();
                (label.clone(), matched)
            })
            .collect();
        let storage = self
            .storage
            .iter()
            .map(|(label, slots)| {
                let matched = slots
                    .iter()
                    .filter_map(|slot| match *slot {
                        StorageSlot::Block(index) => machine.block_devices.get(index),
                        StorageSlot::Physical(index) => machine.physical_block_devices.get(index),
                    })
                    .collect();
                (label.clone(), matched)
            })
            .collect();

        ConstraintMatches {
            interfaces,
            storage,
        }
    }
}

fn storage_slot(machine: &Machine, id: i64) -> Option<StorageSlot> {
    machine
        .block_devices
        .iter()
        .position(|device| device.id == id)
        .map(StorageSlot::Block)
        .or_else(|| {
            machine
                .physical_block_devices
                .iter()
                .position(|device| device.id == id)
                .map(StorageSlot::Physical)
        })
}

fn labelled_ids(record: &Record, field: &str) -> Result<Vec<(String, Vec<i64>)>> {
    let Some(Value::Object(labels)) = record.opt_value(field)? else {
        return Ok(Vec::new());
    };

    Ok(labels
        .iter()
        .map(|(label, ids)| {
            let ids = ids
                .as_array()
                .map(Vec::as_slice)
                .unwrap_or_default()
                .iter()
                .filter_map(Value::as_i64)
                .collect();
            (label.clone(), ids)
        })
        .collect())
}

fn unknown_id(kind: &str, noun: &str, label: &str, id: i64) -> Error {
    Error::Deserialization(format!(
        "constraint match {kind} {label:?}: no {noun} with id {id} on machine"
    ))
}

/// A machine returned by allocation together with its constraint matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedMachine {
    machine: Machine,
    positions: Positions,
}

impl AllocatedMachine {
    /// Reads an allocation response: a machine whose `constraints_by_type`
    /// field holds the constraint match map.
    ///
    /// # Errors
    ///
    /// Fails when the machine does not read or the matches do not resolve.
    pub fn read(version: ApiVersion, source: &Value) -> Result<Self> {
        let machine = Machine::read(version, source)?;
        let positions = match source.get("constraints_by_type") {
            None | Some(Value::Null) => Positions::default(),
            Some(matches) => Positions::locate(matches, &machine)
                .map_err(|err| err.annotate("constraints_by_type"))?,
        };
        Ok(Self { machine, positions })
    }

    /// The allocated machine.
    #[must_use]
    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// Constraint matches borrowing the allocated machine.
    #[must_use]
    pub fn matches(&self) -> ConstraintMatches<'_> {
        self.positions.view(&self.machine)
    }

    /// Gives up the matches and returns the machine.
    #[must_use]
    pub fn into_machine(self) -> Machine {
        self.machine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::tests::machine_json;
    use serde_json::json;

    fn machine() -> Machine {
        Machine::read(ApiVersion::V2_0, &machine_json("4y3ha3")).unwrap()
    }

    #[test]
    fn resolves_interfaces_and_storage_by_id() {
        let machine = machine();
        let matches = resolve(
            &json!({"interfaces": {"db": [48]}, "storage": {"root": [1]}}),
            &machine,
        )
        .unwrap();

        let db = matches.interfaces("db");
        assert_eq!(db.len(), 1);
        assert_eq!(db[0].id, 48);
        assert_eq!(matches.storage("root")[0].name, "md0");
        assert!(matches.interfaces("missing").is_empty());
        assert_eq!(matches.interface_labels().collect::<Vec<_>>(), vec!["db"]);
    }

    #[test]
    fn storage_falls_back_to_physical_devices() {
        let mut machine = machine();
        machine.block_devices.clear();
        let matches = resolve(&json!({"storage": {"root": ["34"]}}), &machine).unwrap();
        assert_eq!(matches.storage("root")[0].id, 34);
    }

    #[test]
    fn unknown_interface_id_names_label_and_id() {
        let machine = machine();
        let err = resolve(&json!({"interfaces": {"db": [48, 99]}}), &machine).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Deserialization error: constraint match interface \"db\": no interface with id 99 on machine"
        );
    }

    #[test]
    fn unknown_storage_id_fails() {
        let machine = machine();
        let err = resolve(&json!({"storage": {"root": [99]}}), &machine).unwrap_err();
        assert!(matches!(err, Error::Deserialization(message) if message.contains("99")));
    }

    #[test]
    fn empty_map_resolves_to_nothing() {
        let machine = machine();
        assert!(resolve(&json!({}), &machine).unwrap().is_empty());
    }

    #[test]
    fn malformed_ids_are_rejected() {
        let machine = machine();
        let err = resolve(&json!({"interfaces": {"db": "48"}}), &machine).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Deserialization error: constraint match schema check failed: \
             interfaces.db: expected null or list, got string(\"48\")"
        );
    }

    #[test]
    fn allocated_machine_reads_constraints_by_type() {
        let mut source = machine_json("4y3ha3");
        source["constraints_by_type"] = json!({
            "interfaces": {"db": [48], "public": [48, 49]},
            "storage": {"root": [34]}
        });
        let allocated = AllocatedMachine::read(ApiVersion::V2_0, &source).unwrap();
        let matches = allocated.matches();
        let public: Vec<i64> = matches.interfaces("public").iter().map(|iface| iface.id).collect();
        assert_eq!(public, vec![48, 49]);
        assert_eq!(matches.storage("root")[0].name, "sda");
        assert_eq!(allocated.machine().system_id, "4y3ha3");
    }

    #[test]
    fn allocated_machine_errors_name_the_field() {
        let mut source = machine_json("4y3ha3");
        source["constraints_by_type"] = json!({"storage": {"root": [99]}});
        let err = AllocatedMachine::read(ApiVersion::V2_0, &source).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Deserialization error: constraints_by_type: constraint match storage"));
    }
}
