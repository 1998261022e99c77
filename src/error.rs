//! Error types for envtree-rs.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot coerce {field}={value:?} to {expected}")]
    Coercion {
        field: String,
        value: String,
        expected: &'static str,
    },

    #[error("{schema}: missing required field '{field}'")]
    MissingField { schema: String, field: String },

    #[error("{schema}.{field}: expected {expected}, found {found}")]
    Validation {
        schema: String,
        field: String,
        expected: String,
        found: &'static str,
    },

    #[error("failed to read env file {}: {source}", path.display())]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
