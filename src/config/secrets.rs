//! Secret handling utilities.
//!
//! Re-exports secrecy types so callers of [`crate::model::Config::secret`]
//! need no direct dependency on secrecy.

pub use secrecy::{ExposeSecret, SecretString};
