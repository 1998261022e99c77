//! # envtree-rs
//!
//! Materializes strongly-typed, nested configuration from flat, prefixed
//! environment variables.
//!
//! Keys nest on a doubled separator (`DB_POOL__MAX_SIZE`), leaf values are
//! coerced to the declared field types, and variables the schema does not
//! declare are kept as raw string extra fields.

pub mod config;
pub mod env;
pub mod error;
pub mod model;
pub mod printable;
pub mod resolver;
pub mod schema;
pub mod telemetry;
pub mod tree;

pub use error::{Error, Result};
pub use model::{Config, Value};
pub use resolver::{ResolveOptions, resolve, resolve_from, resolve_with_diagnostics};
pub use schema::{FieldDefault, FieldSpec, FieldType, Schema};
