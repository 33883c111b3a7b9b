//! Builder for MAAS request parameters.
//!
//! MAAS 2.0 takes form-encoded parameters, repeats a key once per element for
//! list arguments (`hostname=a&hostname=b`), and treats an empty value as
//! "not given". The helpers here skip empty and absent values so request
//! argument types can push everything unconditionally.

use std::fmt::Display;

/// Builder for assembling parameter pairs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(&'static str, String)>,
}

impl QueryParams {
    /// Create a new, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Append a required key/value pair.
    pub fn push<T>(&mut self, key: &'static str, value: T)
    where
        T: Display,
    {
        self.pairs.push((key, value.to_string()));
    }

    /// Append a key/value pair when the value is present.
    pub fn push_opt<T>(&mut self, key: &'static str, value: Option<T>)
    where
        T: Display,
    {
        if let Some(value) = value {
            self.push(key, value);
        }
    }

    /// Append a string value unless it is empty.
    pub fn push_nonempty(&mut self, key: &'static str, value: &str) {
        if !value.is_empty() {
            self.pairs.push((key, value.to_string()));
        }
    }

    /// Append one pair per element, skipping empty elements.
    pub fn push_each<I, T>(&mut self, key: &'static str, values: I)
    where
        I: IntoIterator<Item = T>,
        T: Display,
    {
        for value in values {
            let value = value.to_string();
            if !value.is_empty() {
                self.pairs.push((key, value));
            }
        }
    }

    /// Append a boolean only when it is `true`.
    pub fn push_flag(&mut self, key: &'static str, value: bool) {
        if value {
            self.pairs.push((key, "true".to_string()));
        }
    }

    /// Return the collected key/value pairs.
    #[must_use]
    pub fn into_pairs(self) -> Vec<(&'static str, String)> {
        self.pairs
    }

    /// Borrow the collected key/value pairs.
    #[must_use]
    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }

    /// Returns true if no parameters have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
