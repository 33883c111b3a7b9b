//! # maas-core
//!
//! Core types and utilities for working with the MAAS API.
//!
//! This crate provides the pieces every MAAS resource reader shares: a
//! structural schema checker for decoded JSON, API versions and version
//! keyed reader tables, the error taxonomy, and HTTP client settings.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy and HTTP status classification
//! - [`schema`] - Shape checking and coercion of decoded JSON
//! - [`version`] - API versions and version selection
//! - [`reader`] - The versioned per-type reader pipeline
//! - [`ids`] - Strongly-typed node identifiers
//! - [`config`] - Configuration for MAAS clients
//! - [`client`] - HTTP client settings and retry policy
//! - [`query`] - Request parameter builder

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod ids;
pub mod query;
pub mod reader;
pub mod schema;
pub mod version;

// Re-export commonly used types
pub use error::{Error, Result};
pub use ids::SystemId;
pub use reader::{check_fields, ReadFn, Readers, Resource};
pub use schema::{Checker, FieldDefault, FieldMap, Record, SchemaError};
pub use version::{ApiVersion, VersionTable};
