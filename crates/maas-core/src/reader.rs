//! Versioned reader pipeline shared by every resource type.
//!
//! A [`Readers`] value pairs a resource type name with its version table.
//! Reading runs in a fixed order: base shape check (one map, or a list of
//! maps), version selection, then the selected per-version reader, which
//! checks its own field schema and recurses into nested readers with the same
//! server version.

use serde_json::Value;
use std::fmt;
use tracing::debug;

use crate::error::{Error, Result};
use crate::schema::{expect_map, expect_map_list, FieldMap, Record, SchemaError};
use crate::version::{ApiVersion, VersionTable};

/// Per-version reader for one object of type `T`.
///
/// Receives the negotiated server version (for nested reads) and a value
/// already known to be a map.
pub type ReadFn<T> = fn(ApiVersion, &Value) -> Result<T>;

/// Version table of readers for one resource type.
#[derive(Debug)]
pub struct Readers<T: 'static> {
    table: VersionTable<ReadFn<T>>,
}

impl<T: 'static> Readers<T> {
    /// Creates the reader set for `type_name`.
    #[must_use]
    pub const fn new(type_name: &'static str, entries: &'static [(ApiVersion, ReadFn<T>)]) -> Self {
        Self {
            table: VersionTable::new(type_name, entries),
        }
    }

    /// Resource type name used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.table.type_name()
    }

    /// Selects the reader for `version`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedVersion`] when no reader covers `version`.
    pub fn select(&self, version: ApiVersion) -> Result<ReadFn<T>> {
        let (chosen, read) = self.table.select(version)?;
        debug!(
            type_name = self.type_name(),
            %version,
            %chosen,
            "selected reader"
        );
        Ok(read)
    }

    /// Reads a single-resource response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Deserialization`] when the value is not a map or fails
    /// the per-version schema, and [`Error::UnsupportedVersion`] when no reader
    /// covers `version`.
    pub fn read(&self, version: ApiVersion, source: &Value) -> Result<T> {
        expect_map(source).map_err(|err| self.base_error(err))?;
        let read = self.select(version)?;
        read(version, source)
    }

    /// Reads a list-endpoint response. Failures name the element index.
    ///
    /// # Errors
    ///
    /// As [`Readers::read`], plus a deserialization error when the value is
    /// not a list of maps.
    pub fn read_list(&self, version: ApiVersion, source: &Value) -> Result<Vec<T>> {
        let items = expect_map_list(source).map_err(|err| self.base_error(err))?;
        let read = self.select(version)?;

        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                read(version, item)
                    .map_err(|err| err.annotate(format!("{} {index}", self.type_name())))
            })
            .collect()
    }

    /// Reads the embedded object held in `field` of `record`.
    ///
    /// # Errors
    ///
    /// As [`Readers::read`], annotated with the field name.
    pub fn read_field(&self, version: ApiVersion, record: &Record, field: &str) -> Result<T> {
        let value = record.value(field)?;
        self.read(version, value).map_err(|err| err.annotate(field))
    }

    /// Reads the embedded object held in `field`, if it is present and not null.
    ///
    /// # Errors
    ///
    /// As [`Readers::read`], annotated with the field name.
    pub fn read_optional_field(
        &self,
        version: ApiVersion,
        record: &Record,
        field: &str,
    ) -> Result<Option<T>> {
        record
            .opt_value(field)?
            .map(|value| self.read(version, value).map_err(|err| err.annotate(field)))
            .transpose()
    }

    /// Reads the list of embedded objects held in `field`. Missing or null
    /// reads as empty.
    ///
    /// # Errors
    ///
    /// As [`Readers::read_list`], annotated with the field name.
    pub fn read_list_field(
        &self,
        version: ApiVersion,
        record: &Record,
        field: &str,
    ) -> Result<Vec<T>> {
        match record.opt_value(field)? {
            Some(value) => self
                .read_list(version, value)
                .map_err(|err| err.annotate(field)),
            None => Ok(Vec::new()),
        }
    }

    fn base_error(&self, err: SchemaError) -> Error {
        Error::deserialization(format!("{} base schema check failed", self.type_name()), err)
    }
}

/// A resource type with a registered set of versioned readers.
pub trait Resource: Sized + 'static {
    /// The type's reader table.
    fn readers() -> &'static Readers<Self>;

    /// Reads one resource from a single-resource response.
    ///
    /// # Errors
    ///
    /// See [`Readers::read`].
    fn read(version: ApiVersion, source: &Value) -> Result<Self> {
        Self::readers().read(version, source)
    }

    /// Reads every resource from a list-endpoint response.
    ///
    /// # Errors
    ///
    /// See [`Readers::read_list`].
    fn read_list(version: ApiVersion, source: &Value) -> Result<Vec<Self>> {
        Self::readers().read_list(version, source)
    }
}

/// Runs `fields` over `source`, labelling failures with the reader stage,
/// e.g. `"machine 2.0 schema check failed"`.
///
/// # Errors
///
/// Returns [`Error::Deserialization`] prefixed with `stage`.
pub fn check_fields(
    fields: &FieldMap,
    source: &Value,
    stage: impl fmt::Display,
) -> Result<Record> {
    fields
        .check(source)
        .map_err(|err| Error::deserialization(stage, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Checker;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    struct Widget {
        id: i64,
        label: String,
        parts: Vec<Part>,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Part {
        size: u64,
    }

    static WIDGETS: Readers<Widget> = Readers::new(
        "widget",
        &[
            (ApiVersion::new(2, 0, 0), widget_2_0),
            (ApiVersion::new(2, 5, 0), widget_2_5),
        ],
    );

    static PARTS: Readers<Part> = Readers::new("part", &[(ApiVersion::new(2, 0, 0), part_2_0)]);

    fn widget_2_0(version: ApiVersion, source: &Value) -> Result<Widget> {
        let fields = FieldMap::new()
            .required("id", Checker::ForceInt)
            .required("parts", Checker::list(Checker::object()));
        let record = check_fields(&fields, source, "widget 2.0 schema check failed")?;
        Ok(Widget {
            id: record.int("id")?,
            label: String::new(),
            parts: PARTS.read_list_field(version, &record, "parts")?,
        })
    }

    fn widget_2_5(version: ApiVersion, source: &Value) -> Result<Widget> {
        let fields = FieldMap::new()
            .required("id", Checker::ForceInt)
            .with_default("label", Checker::nullable(Checker::String), "")
            .required("parts", Checker::list(Checker::object()));
        let record = check_fields(&fields, source, "widget 2.5 schema check failed")?;
        Ok(Widget {
            id: record.int("id")?,
            label: record.string("label")?,
            parts: PARTS.read_list_field(version, &record, "parts")?,
        })
    }

    fn part_2_0(_version: ApiVersion, source: &Value) -> Result<Part> {
        let fields = FieldMap::new().required("size", Checker::ForceUint);
        let record = check_fields(&fields, source, "part 2.0 schema check failed")?;
        Ok(Part {
            size: record.uint("size")?,
        })
    }

    fn v(input: &str) -> ApiVersion {
        input.parse().unwrap()
    }

    #[test]
    fn read_list_rejects_scalar_input() {
        let err = WIDGETS.read_list(v("2.0"), &json!("wat?")).unwrap_err();
        assert_eq!(
            err,
            Error::Deserialization(
                "widget base schema check failed: expected list, got string(\"wat?\")".to_string()
            )
        );
    }

    #[test]
    fn read_list_names_the_element_that_is_not_a_map() {
        let err = WIDGETS
            .read_list(v("2.0"), &json!([{"id": 1, "parts": []}, 7]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Deserialization error: widget base schema check failed: [1]: expected map, got int(7)"
        );
    }

    #[test]
    fn read_rejects_non_map_input() {
        let err = WIDGETS.read(v("2.0"), &json!([1])).unwrap_err();
        assert!(err.to_string().contains("widget base schema check failed: expected map"));
    }

    #[test]
    fn read_selects_by_version() {
        let source = json!({"id": "3", "label": "spare", "parts": [{"size": 10}]});
        let old = WIDGETS.read(v("2.4.9"), &source).unwrap();
        assert_eq!(old.label, "");
        let new = WIDGETS.read(v("2.5"), &source).unwrap();
        assert_eq!(new.label, "spare");
        assert_eq!(new.parts, vec![Part { size: 10 }]);
    }

    #[test]
    fn read_below_first_version_is_unsupported() {
        let err = WIDGETS.read(v("1.9"), &json!({})).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { type_name, .. } if type_name == "widget"));
    }

    #[test]
    fn nested_failures_carry_index_and_field() {
        let source = json!([
            {"id": 1, "parts": []},
            {"id": 2, "parts": [{"size": 1}, {"size": "big"}]}
        ]);
        let err = WIDGETS.read_list(v("2.0"), &source).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Deserialization error: widget 1: parts: part 1: part 2.0 schema check failed: \
             size: expected uint, got string(\"big\")"
        );
    }

    #[test]
    fn stage_names_the_type_and_version() {
        let err = WIDGETS.read(v("2.0"), &json!({"parts": []})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Deserialization error: widget 2.0 schema check failed: id: expected int, got nothing"
        );
    }

    #[test]
    fn reading_twice_is_deterministic() {
        let source = json!([{"id": 9, "parts": [{"size": "4"}]}]);
        let first = WIDGETS.read_list(v("2.0"), &source).unwrap();
        let second = WIDGETS.read_list(v("2.0"), &source).unwrap();
        assert_eq!(first, second);
    }
}
