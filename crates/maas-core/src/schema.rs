//! Structural checking and coercion of decoded JSON.
//!
//! MAAS responses are loosely typed: numbers arrive as numbers or numeric
//! strings, optional strings arrive as `null`, missing, or a value. A
//! [`Checker`] describes the shape a value must have and coerces it into a
//! normalized [`Value`]; a [`FieldMap`] does the same for objects and yields a
//! [`Record`] from which readers pull typed fields.
//!
//! Checking is strict about shape (a list checker rejects a scalar) and
//! permissive about representation (`ForceInt` accepts `"42"`). Fields not
//! declared in a [`FieldMap`] are dropped, and a [`Record`] refuses to hand
//! out a field its schema never declared.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Failure produced while checking a value, naming where and what went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    path: String,
    message: String,
}

impl SchemaError {
    fn mismatch(path: &str, expected: &str, got: Option<&Value>) -> Self {
        Self {
            path: path.to_string(),
            message: format!("expected {expected}, got {}", describe(got)),
        }
    }

    fn undeclared(name: &str) -> Self {
        Self {
            path: name.to_string(),
            message: "field not declared in schema".to_string(),
        }
    }

    /// Location of the failure, e.g. `interface_set[0].vlan`. Empty at the root.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Failure description without the path.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

impl std::error::Error for SchemaError {}

/// Describes the kind and (for scalars) the value of `value` for error messages.
fn describe(value: Option<&Value>) -> String {
    match value {
        None => "nothing".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(b)) => format!("bool({b})"),
        Some(Value::Number(n)) if n.is_f64() => format!("float({n})"),
        Some(Value::Number(n)) => format!("int({n})"),
        Some(Value::String(s)) => format!("string({s:?})"),
        Some(Value::Array(items)) => format!("list(len {})", items.len()),
        Some(Value::Object(_)) => "map".to_string(),
    }
}

fn field_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn index_path(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

/// Confirms `value` is a map. Same error as `Checker::object()`, without
/// building a coerced copy.
pub(crate) fn expect_map(value: &Value) -> Result<&Map<String, Value>, SchemaError> {
    value
        .as_object()
        .ok_or_else(|| SchemaError::mismatch("", "map", Some(value)))
}

/// Confirms `value` is a list of maps and returns its elements. Same errors
/// as `Checker::list(Checker::object())`, without building a coerced copy.
pub(crate) fn expect_map_list(value: &Value) -> Result<&[Value], SchemaError> {
    let items = value
        .as_array()
        .ok_or_else(|| SchemaError::mismatch("", "list", Some(value)))?;
    for (index, item) in items.iter().enumerate() {
        if !item.is_object() {
            return Err(SchemaError::mismatch(
                &index_path("", index),
                "map",
                Some(item),
            ));
        }
    }
    Ok(items)
}

/// Shape declaration for a decoded JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum Checker {
    /// A JSON string.
    String,
    /// An integral JSON number.
    Int,
    /// An integer given as a number or a numeric string. Floats truncate.
    ForceInt,
    /// A non-negative integral JSON number.
    Uint,
    /// A non-negative integer given as a number or a numeric string.
    ForceUint,
    /// A JSON boolean.
    Bool,
    /// JSON `null` only.
    Null,
    /// Anything, passed through untouched.
    Any,
    /// A homogeneous list.
    List(Box<Checker>),
    /// A map with string keys and homogeneous values.
    StringMap(Box<Checker>),
    /// The first alternative that accepts the value wins.
    OneOf(Vec<Checker>),
    /// A nested object with its own field declarations.
    Fields(FieldMap),
}

impl Checker {
    /// `List(item)`.
    #[must_use]
    pub fn list(item: Checker) -> Self {
        Self::List(Box::new(item))
    }

    /// `StringMap(value)`.
    #[must_use]
    pub fn string_map(value: Checker) -> Self {
        Self::StringMap(Box::new(value))
    }

    /// `null` or `inner`.
    #[must_use]
    pub fn nullable(inner: Checker) -> Self {
        Self::OneOf(vec![Self::Null, inner])
    }

    /// A map of arbitrary values, the usual shape of an embedded object.
    #[must_use]
    pub fn object() -> Self {
        Self::string_map(Self::Any)
    }

    /// Human readable name of the accepted shape.
    #[must_use]
    pub fn expected(&self) -> String {
        match self {
            Self::String => "string".to_string(),
            Self::Int | Self::ForceInt => "int".to_string(),
            Self::Uint | Self::ForceUint => "uint".to_string(),
            Self::Bool => "bool".to_string(),
            Self::Null => "null".to_string(),
            Self::Any => "any value".to_string(),
            Self::List(_) => "list".to_string(),
            Self::StringMap(_) | Self::Fields(_) => "map".to_string(),
            Self::OneOf(alternatives) => alternatives
                .iter()
                .map(Self::expected)
                .collect::<Vec<_>>()
                .join(" or "),
        }
    }

    /// Checks `value` and returns its coerced form.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] naming the offending location when the value
    /// does not have the declared shape.
    pub fn coerce(&self, value: &Value) -> Result<Value, SchemaError> {
        self.coerce_at(value, "")
    }

    fn coerce_at(&self, value: &Value, path: &str) -> Result<Value, SchemaError> {
        let mismatch = || SchemaError::mismatch(path, &self.expected(), Some(value));

        match self {
            Self::String => match value {
                Value::String(_) => Ok(value.clone()),
                _ => Err(mismatch()),
            },
            Self::Int => integral(value).map(Value::from).ok_or_else(mismatch),
            Self::ForceInt => forced_int(value).map(Value::from).ok_or_else(mismatch),
            Self::Uint => integral_unsigned(value)
                .map(Value::from)
                .ok_or_else(mismatch),
            Self::ForceUint => forced_uint(value).map(Value::from).ok_or_else(mismatch),
            Self::Bool => match value {
                Value::Bool(_) => Ok(value.clone()),
                _ => Err(mismatch()),
            },
            Self::Null => match value {
                Value::Null => Ok(Value::Null),
                _ => Err(mismatch()),
            },
            Self::Any => Ok(value.clone()),
            Self::List(item) => match value {
                Value::Array(items) => items
                    .iter()
                    .enumerate()
                    .map(|(index, element)| item.coerce_at(element, &index_path(path, index)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                _ => Err(mismatch()),
            },
            Self::StringMap(inner) => match value {
                Value::Object(map) => map
                    .iter()
                    .map(|(key, element)| {
                        inner
                            .coerce_at(element, &field_path(path, key))
                            .map(|coerced| (key.clone(), coerced))
                    })
                    .collect::<Result<Map<_, _>, _>>()
                    .map(Value::Object),
                _ => Err(mismatch()),
            },
            Self::OneOf(alternatives) => {
                let mut deeper = None;
                for alternative in alternatives {
                    match alternative.coerce_at(value, path) {
                        Ok(coerced) => return Ok(coerced),
                        Err(err) if err.path != path && deeper.is_none() => deeper = Some(err),
                        Err(_) => {}
                    }
                }
                // An alternative that matched the outer shape but failed inside
                // says more than "expected null or map".
                Err(deeper.unwrap_or_else(mismatch))
            }
            Self::Fields(fields) => match value {
                Value::Object(map) => fields
                    .check_map(map, path)
                    .map(|record| Value::Object(record.values)),
                _ => Err(mismatch()),
            },
        }
    }
}

fn integral(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).and_then(float_to_i64)),
        _ => None,
    }
}

fn integral_unsigned(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).and_then(float_to_u64)),
        _ => None,
    }
}

fn forced_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(float_to_i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(float_to_i64))
        }
        _ => None,
    }
}

fn forced_uint(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(float_to_u64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(float_to_u64))
        }
        _ => None,
    }
}

/// Truncates `f` towards zero. `None` when the result does not fit in `i64`.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_to_i64(f: f64) -> Option<i64> {
    let whole = f.trunc();
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range.
    (whole.is_finite() && whole >= i64::MIN as f64 && whole < i64::MAX as f64)
        .then_some(whole as i64)
}

/// Truncates `f` towards zero. `None` for negatives and values past `u64`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn float_to_u64(f: f64) -> Option<u64> {
    let whole = f.trunc();
    (f.is_finite() && f >= 0.0 && whole < u64::MAX as f64).then_some(whole as u64)
}

/// What happens when a declared field is missing (or, for `Value`, null).
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
    /// Missing is an error; null goes through the field's checker.
    Required,
    /// Missing or null is replaced by this value.
    Value(Value),
    /// Missing is left out of the record; null goes through the checker.
    Omit,
}

#[derive(Debug, Clone, PartialEq)]
struct Field {
    name: &'static str,
    checker: Checker,
    default: FieldDefault,
}

/// Field declarations for an object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    fields: Vec<Field>,
}

impl FieldMap {
    /// Creates an empty declaration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a field that must be present.
    #[must_use]
    pub fn required(self, name: &'static str, checker: Checker) -> Self {
        self.field(name, checker, FieldDefault::Required)
    }

    /// Declares a field replaced by `default` when missing or null.
    #[must_use]
    pub fn with_default(
        self,
        name: &'static str,
        checker: Checker,
        default: impl Into<Value>,
    ) -> Self {
        self.field(name, checker, FieldDefault::Value(default.into()))
    }

    /// Declares a field that may be missing.
    #[must_use]
    pub fn optional(self, name: &'static str, checker: Checker) -> Self {
        self.field(name, checker, FieldDefault::Omit)
    }

    /// Declares a field with an explicit default rule.
    #[must_use]
    pub fn field(mut self, name: &'static str, checker: Checker, default: FieldDefault) -> Self {
        self.fields.push(Field {
            name,
            checker,
            default,
        });
        self
    }

    /// Checks `value` against the declarations.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] when `value` is not a map, a required field
    /// is missing, or a field has the wrong shape.
    pub fn check(&self, value: &Value) -> Result<Record, SchemaError> {
        match value {
            Value::Object(map) => self.check_map(map, ""),
            other => Err(SchemaError::mismatch("", "map", Some(other))),
        }
    }

    fn check_map(&self, map: &Map<String, Value>, path: &str) -> Result<Record, SchemaError> {
        let mut values = Map::new();

        for field in &self.fields {
            let location = field_path(path, field.name);
            let source = map.get(field.name);

            match (source, &field.default) {
                (None | Some(Value::Null), FieldDefault::Value(default)) => {
                    values.insert(field.name.to_string(), default.clone());
                }
                (Some(value), _) => {
                    values.insert(field.name.to_string(), field.checker.coerce_at(value, &location)?);
                }
                (None, FieldDefault::Omit) => {}
                (None, FieldDefault::Required) => {
                    return Err(SchemaError::mismatch(&location, &field.checker.expected(), None));
                }
            }
        }

        Ok(Record {
            declared: self.fields.iter().map(|field| field.name).collect(),
            values,
        })
    }
}

/// Checked, coerced fields of one object.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    declared: BTreeSet<&'static str>,
    values: Map<String, Value>,
}

impl Record {
    fn lookup(&self, name: &str) -> Result<Option<&Value>, SchemaError> {
        if self.declared.contains(name) {
            Ok(self.values.get(name))
        } else {
            Err(SchemaError::undeclared(name))
        }
    }

    fn present(&self, name: &str, expected: &str) -> Result<&Value, SchemaError> {
        self.lookup(name)?
            .ok_or_else(|| SchemaError::mismatch(name, expected, None))
    }

    /// A required string field.
    ///
    /// # Errors
    ///
    /// Fails when the field is undeclared, missing, or not a string.
    pub fn string(&self, name: &str) -> Result<String, SchemaError> {
        let value = self.present(name, "string")?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| SchemaError::mismatch(name, "string", Some(value)))
    }

    /// A string field that may be missing or null.
    ///
    /// # Errors
    ///
    /// Fails when the field is undeclared or holds a non-string value.
    pub fn opt_string(&self, name: &str) -> Result<Option<String>, SchemaError> {
        match self.lookup(name)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(SchemaError::mismatch(name, "string", Some(other))),
        }
    }

    /// A required integer field.
    ///
    /// # Errors
    ///
    /// Fails when the field is undeclared, missing, or not an integer.
    pub fn int(&self, name: &str) -> Result<i64, SchemaError> {
        let value = self.present(name, "int")?;
        value
            .as_i64()
            .ok_or_else(|| SchemaError::mismatch(name, "int", Some(value)))
    }

    /// A required unsigned integer field.
    ///
    /// # Errors
    ///
    /// Fails when the field is undeclared, missing, or not an unsigned integer.
    pub fn uint(&self, name: &str) -> Result<u64, SchemaError> {
        let value = self.present(name, "uint")?;
        value
            .as_u64()
            .ok_or_else(|| SchemaError::mismatch(name, "uint", Some(value)))
    }

    /// A required boolean field.
    ///
    /// # Errors
    ///
    /// Fails when the field is undeclared, missing, or not a boolean.
    pub fn bool(&self, name: &str) -> Result<bool, SchemaError> {
        let value = self.present(name, "bool")?;
        value
            .as_bool()
            .ok_or_else(|| SchemaError::mismatch(name, "bool", Some(value)))
    }

    /// A list of strings. Missing or null reads as empty.
    ///
    /// # Errors
    ///
    /// Fails when the field is undeclared or not a list of strings.
    pub fn strings(&self, name: &str) -> Result<Vec<String>, SchemaError> {
        match self.lookup(name)? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        SchemaError::mismatch(&index_path(name, index), "string", Some(item))
                    })
                })
                .collect(),
            Some(other) => Err(SchemaError::mismatch(name, "list", Some(other))),
        }
    }

    /// A map of strings. Missing or null reads as empty.
    ///
    /// # Errors
    ///
    /// Fails when the field is undeclared or not a map of strings.
    pub fn string_map(&self, name: &str) -> Result<BTreeMap<String, String>, SchemaError> {
        match self.lookup(name)? {
            None | Some(Value::Null) => Ok(BTreeMap::new()),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(key, item)| {
                    item.as_str()
                        .map(|s| (key.clone(), s.to_string()))
                        .ok_or_else(|| {
                            SchemaError::mismatch(&field_path(name, key), "string", Some(item))
                        })
                })
                .collect(),
            Some(other) => Err(SchemaError::mismatch(name, "map", Some(other))),
        }
    }

    /// A required field of any shape, typically an embedded object or list
    /// handed to a nested reader.
    ///
    /// # Errors
    ///
    /// Fails when the field is undeclared or missing.
    pub fn value(&self, name: &str) -> Result<&Value, SchemaError> {
        self.present(name, "any value")
    }

    /// A field of any shape that may be missing or null.
    ///
    /// # Errors
    ///
    /// Fails when the field is undeclared.
    pub fn opt_value(&self, name: &str) -> Result<Option<&Value>, SchemaError> {
        Ok(self.lookup(name)?.filter(|value| !value.is_null()))
    }

    /// Returns true when the record holds the field (after defaults).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nullable_string() -> Checker {
        Checker::nullable(Checker::String)
    }

    #[test]
    fn string_accepts_only_strings() {
        assert_eq!(Checker::String.coerce(&json!("x")).unwrap(), json!("x"));
        let err = Checker::String.coerce(&json!(5)).unwrap_err();
        assert_eq!(err.to_string(), "expected string, got int(5)");
    }

    #[test]
    fn force_int_accepts_numeric_strings() {
        assert_eq!(Checker::ForceInt.coerce(&json!("42")).unwrap(), json!(42));
        assert_eq!(Checker::ForceInt.coerce(&json!(" -7 ")).unwrap(), json!(-7));
        assert_eq!(Checker::ForceInt.coerce(&json!(1.9)).unwrap(), json!(1));
        assert_eq!(Checker::ForceInt.coerce(&json!("3.0")).unwrap(), json!(3));
        assert!(Checker::ForceInt.coerce(&json!("lots")).is_err());
        assert!(Checker::ForceInt.coerce(&json!(null)).is_err());
    }

    #[test]
    fn int_rejects_strings_and_fractions() {
        assert_eq!(Checker::Int.coerce(&json!(12)).unwrap(), json!(12));
        assert_eq!(Checker::Int.coerce(&json!(12.0)).unwrap(), json!(12));
        assert!(Checker::Int.coerce(&json!("12")).is_err());
        assert!(Checker::Int.coerce(&json!(1.5)).is_err());
    }

    #[test]
    fn uint_rejects_negatives() {
        assert_eq!(Checker::Uint.coerce(&json!(8)).unwrap(), json!(8));
        assert!(Checker::Uint.coerce(&json!(-1)).is_err());
        assert_eq!(
            Checker::ForceUint.coerce(&json!("8589934592")).unwrap(),
            json!(8_589_934_592_u64)
        );
        assert!(Checker::ForceUint.coerce(&json!("-1")).is_err());
        let err = Checker::ForceUint.coerce(&json!(true)).unwrap_err();
        assert_eq!(err.to_string(), "expected uint, got bool(true)");
    }

    #[test]
    fn out_of_range_numbers_are_rejected() {
        assert!(Checker::ForceInt.coerce(&json!("99999999999999999999")).is_err());
        assert!(Checker::ForceInt.coerce(&json!("-1e19")).is_err());
        assert!(Checker::ForceInt.coerce(&json!(1e30)).is_err());
        assert!(Checker::Int.coerce(&json!(1e19)).is_err());
        assert!(Checker::Uint.coerce(&json!(1e20)).is_err());
        assert!(Checker::ForceUint.coerce(&json!(1e20)).is_err());
        assert!(Checker::ForceUint.coerce(&json!("1e20")).is_err());

        let err = Checker::ForceInt
            .coerce(&json!("99999999999999999999"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected int, got string(\"99999999999999999999\")"
        );
    }

    #[test]
    fn large_values_inside_range_are_kept() {
        assert_eq!(
            Checker::ForceInt.coerce(&json!(i64::MIN)).unwrap(),
            json!(i64::MIN)
        );
        assert_eq!(
            Checker::ForceUint.coerce(&json!(u64::MAX)).unwrap(),
            json!(u64::MAX)
        );
        assert_eq!(
            Checker::Uint.coerce(&json!(1e19)).unwrap(),
            json!(10_000_000_000_000_000_000_u64)
        );
    }

    #[test]
    fn force_uint_truncates_decimal_strings_like_force_int() {
        assert_eq!(Checker::ForceUint.coerce(&json!("3.0")).unwrap(), json!(3));
        assert_eq!(Checker::ForceUint.coerce(&json!("3.7")).unwrap(), json!(3));
        assert_eq!(Checker::ForceInt.coerce(&json!("3.7")).unwrap(), json!(3));
        assert!(Checker::ForceUint.coerce(&json!("-0.5")).is_err());
    }

    #[test]
    fn borrowed_shape_checks_match_checker_errors() {
        let maps = Checker::list(Checker::object());
        for value in [json!("wat?"), json!(null), json!([{}, 3]), json!([[]])] {
            assert_eq!(
                expect_map_list(&value).unwrap_err(),
                maps.coerce(&value).unwrap_err()
            );
        }
        for value in [json!([1]), json!("x"), json!(null)] {
            assert_eq!(
                expect_map(&value).unwrap_err(),
                Checker::object().coerce(&value).unwrap_err()
            );
        }
        assert_eq!(expect_map_list(&json!([{}, {"a": 1}])).unwrap().len(), 2);
        assert!(expect_map(&json!({"a": 1})).is_ok());
    }

    #[test]
    fn list_rejects_scalars_and_reports_index() {
        let checker = Checker::list(Checker::String);
        let err = checker.coerce(&json!("wat?")).unwrap_err();
        assert_eq!(err.to_string(), "expected list, got string(\"wat?\")");

        let err = checker.coerce(&json!(["a", 2])).unwrap_err();
        assert_eq!(err.path(), "[1]");
        assert_eq!(err.message(), "expected string, got int(2)");
    }

    #[test]
    fn string_map_coerces_values() {
        let checker = Checker::string_map(Checker::ForceInt);
        assert_eq!(
            checker.coerce(&json!({"a": "1", "b": 2})).unwrap(),
            json!({"a": 1, "b": 2})
        );
        let err = checker.coerce(&json!({"a": "x"})).unwrap_err();
        assert_eq!(err.to_string(), "a: expected int, got string(\"x\")");
        assert!(checker.coerce(&json!([1])).is_err());
    }

    #[test]
    fn nullable_accepts_null_or_inner() {
        assert_eq!(nullable_string().coerce(&json!(null)).unwrap(), json!(null));
        assert_eq!(nullable_string().coerce(&json!("a")).unwrap(), json!("a"));
        let err = nullable_string().coerce(&json!(3)).unwrap_err();
        assert_eq!(err.to_string(), "expected null or string, got int(3)");
    }

    #[test]
    fn one_of_prefers_deeper_errors() {
        let checker = Checker::nullable(Checker::Fields(
            FieldMap::new().required("id", Checker::ForceInt),
        ));
        let err = checker.coerce(&json!({"id": "nope"})).unwrap_err();
        assert_eq!(err.to_string(), "id: expected int, got string(\"nope\")");
    }

    #[test]
    fn any_passes_through() {
        let value = json!({"nested": [1, "two", null]});
        assert_eq!(Checker::Any.coerce(&value).unwrap(), value);
    }

    #[test]
    fn field_map_reports_missing_required_field() {
        let fields = FieldMap::new()
            .required("hostname", Checker::String)
            .required("memory", Checker::ForceInt);
        let err = fields.check(&json!({"memory": 1024})).unwrap_err();
        assert_eq!(err.to_string(), "hostname: expected string, got nothing");
    }

    #[test]
    fn field_map_rejects_non_map() {
        let err = FieldMap::new().check(&json!(["x"])).unwrap_err();
        assert_eq!(err.to_string(), "expected map, got list(len 1)");
    }

    #[test]
    fn field_map_substitutes_defaults_for_missing_and_null() {
        let fields = FieldMap::new()
            .with_default("owner", nullable_string(), "")
            .with_default("parent", nullable_string(), "");
        let record = fields.check(&json!({"owner": null})).unwrap();
        assert_eq!(record.string("owner").unwrap(), "");
        assert_eq!(record.string("parent").unwrap(), "");
    }

    #[test]
    fn field_map_null_without_default_goes_through_checker() {
        let fields = FieldMap::new()
            .required("vlan", Checker::nullable(Checker::object()))
            .required("name", Checker::String);
        let record = fields.check(&json!({"vlan": null, "name": "eth0"})).unwrap();
        assert!(record.opt_value("vlan").unwrap().is_none());

        let err = fields.check(&json!({"vlan": null, "name": null})).unwrap_err();
        assert_eq!(err.to_string(), "name: expected string, got null");
    }

    #[test]
    fn field_map_omits_missing_optional_fields() {
        let fields = FieldMap::new().optional("subnet", Checker::object());
        let record = fields.check(&json!({})).unwrap();
        assert!(!record.contains("subnet"));
        assert!(record.opt_value("subnet").unwrap().is_none());
    }

    #[test]
    fn field_map_drops_extra_fields() {
        let fields = FieldMap::new().required("name", Checker::String);
        let record = fields.check(&json!({"name": "a", "surprise": 1})).unwrap();
        assert!(!record.contains("surprise"));
    }

    #[test]
    fn record_fails_closed_on_undeclared_fields() {
        let fields = FieldMap::new().required("name", Checker::String);
        let record = fields.check(&json!({"name": "a", "other": "b"})).unwrap();
        let err = record.string("other").unwrap_err();
        assert_eq!(err.to_string(), "other: field not declared in schema");
    }

    #[test]
    fn nested_fields_carry_paths() {
        let fields = FieldMap::new().required(
            "interface_set",
            Checker::list(Checker::Fields(
                FieldMap::new().required("vlan", Checker::Fields(
                    FieldMap::new().required("vid", Checker::ForceInt),
                )),
            )),
        );
        let err = fields
            .check(&json!({"interface_set": [{"vlan": {"vid": 1}}, {"vlan": {}}]}))
            .unwrap_err();
        assert_eq!(err.path(), "interface_set[1].vlan.vid");
        assert_eq!(err.message(), "expected int, got nothing");
    }

    #[test]
    fn record_typed_getters() {
        let fields = FieldMap::new()
            .required("id", Checker::ForceInt)
            .required("size", Checker::ForceUint)
            .required("enabled", Checker::Bool)
            .required("tags", Checker::list(Checker::String))
            .required("owner_data", Checker::string_map(Checker::String))
            .with_default("model", nullable_string(), "");
        let record = fields
            .check(&json!({
                "id": "5",
                "size": 1024,
                "enabled": false,
                "tags": ["ssd"],
                "owner_data": {"k": "v"},
                "model": null
            }))
            .unwrap();

        assert_eq!(record.int("id").unwrap(), 5);
        assert_eq!(record.uint("size").unwrap(), 1024);
        assert!(!record.bool("enabled").unwrap());
        assert_eq!(record.strings("tags").unwrap(), vec!["ssd".to_string()]);
        assert_eq!(record.string_map("owner_data").unwrap().get("k").map(String::as_str), Some("v"));
        assert_eq!(record.string("model").unwrap(), "");
        assert!(record.bool("id").is_err());
    }

    #[test]
    fn checking_is_pure() {
        let fields = FieldMap::new().required("id", Checker::ForceInt);
        let value = json!({"id": "7"});
        let first = fields.check(&value).unwrap();
        let second = fields.check(&value).unwrap();
        assert_eq!(first, second);
        assert_eq!(value, json!({"id": "7"}));
    }
}
