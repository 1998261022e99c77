//! Settings wrapper: env-file aware loading of schema configs.
//!
//! [`Settings`] carries the loader's own configuration (which env file to
//! read, log level) and forwards `(schema, prefix)` to the resolver. Values
//! from the env file sit underneath the process environment: a variable set
//! in the process always wins.

pub mod secrets;

use crate::env::EnvSnapshot;
use crate::error::{Error, Result};
use crate::model::Config;
use crate::resolver::{ResolveOptions, resolve_from};
use crate::schema::Schema;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_ENV_FILE: &str = ".env";

/// Overrides the env file; an empty value disables env files.
pub const ENV_FILE_VAR: &str = "ENVTREE_ENV_FILE";
pub const LOG_LEVEL_VAR: &str = "ENVTREE_LOG_LEVEL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub env_file: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env_file: Some(PathBuf::from(DEFAULT_ENV_FILE)),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Settings reading `env_file` instead of the default `.env`.
    pub fn with_env_file(env_file: Option<PathBuf>) -> Self {
        Self {
            env_file,
            ..Self::default()
        }
    }

    /// Load the wrapper's own settings from the process environment.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let env_file = match std::env::var(ENV_FILE_VAR) {
            Ok(path) if path.is_empty() => None,
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => defaults.env_file,
        };
        Self {
            env_file,
            log_level: std::env::var(LOG_LEVEL_VAR).unwrap_or(defaults.log_level),
        }
    }

    pub fn env_file(&self) -> Option<&Path> {
        self.env_file.as_deref()
    }

    /// Process environment under `prefix`, backed by the env file.
    pub fn snapshot(&self, prefix: &str) -> Result<EnvSnapshot> {
        let process = EnvSnapshot::from_process(prefix);
        match self.env_file() {
            Some(path) => Ok(process.with_fallback(read_env_file(path, prefix)?)),
            None => Ok(process),
        }
    }

    /// Resolve `schema` under `prefix` with default options.
    pub fn load_config(&self, schema: &'static Schema, prefix: &str) -> Result<Config> {
        self.load_config_with(schema, &ResolveOptions::new(prefix))
    }

    pub fn load_config_with(
        &self,
        schema: &'static Schema,
        options: &ResolveOptions,
    ) -> Result<Config> {
        let snapshot = self.snapshot(&options.prefix)?;
        resolve_from(schema, &snapshot, options)
    }
}

/// Parse an env file without touching the process environment.
///
/// A missing file yields an empty snapshot.
fn read_env_file(path: &Path, prefix: &str) -> Result<EnvSnapshot> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) if e.not_found() => {
            debug!(path = %path.display(), "env file not found, skipping");
            return Ok(EnvSnapshot::default());
        }
        Err(source) => {
            return Err(Error::EnvFile {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let mut vars = Vec::new();
    for item in iter {
        let (key, value) = item.map_err(|source| Error::EnvFile {
            path: path.to_path_buf(),
            source,
        })?;
        vars.push((key, value));
    }
    debug!(path = %path.display(), vars = vars.len(), "loaded env file");
    Ok(EnvSnapshot::from_vars(vars, prefix))
}
