//! Environment-to-schema resolution.
//!
//! Resolution snapshots the environment under a prefix, builds an
//! [`EnvTree`] once, then walks the schema against it: leaves are coerced
//! to the declared scalar types, sub-trees become nested instances up to
//! `max_depth`, and anything the schema does not declare is kept as a raw
//! string extra field.

pub mod coerce;

use crate::env::EnvSnapshot;
use crate::error::Result;
use crate::model::{Config, Value};
use crate::schema::{Schema, env_key, field_name_for_key};
use crate::telemetry;
use crate::tree::EnvTree;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::{debug, warn};

pub use coerce::coerce;

pub const DEFAULT_SEPARATOR: &str = "_";
pub const DEFAULT_MAX_DEPTH: usize = 3;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Parameters of a single resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveOptions {
    /// Stripped from variable names before matching. Case-insensitive.
    pub prefix: String,
    /// Word separator inside a field's env key; doubled, it marks nesting.
    pub separator: String,
    /// Deepest nesting level instantiated as a nested schema.
    pub max_depth: usize,
    /// Top-level fallbacks used when a field has no env value. Not validated
    /// here and never applied to nested levels.
    pub defaults: BTreeMap<String, Value>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            separator: DEFAULT_SEPARATOR.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            defaults: BTreeMap::new(),
        }
    }
}

impl ResolveOptions {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn default_value(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(field.into(), value.into());
        self
    }

    /// The token that separates nesting levels.
    pub fn nesting_token(&self) -> String {
        self.separator.repeat(2)
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// A nested field that hit the depth ceiling and was treated as a scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Dotted path from the root schema, e.g. `database.connection`.
    pub field: String,
    pub depth: usize,
    pub max_depth: usize,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "max depth ({}) exceeded for nested field '{}' at depth {}; treated as a simple value",
            self.max_depth, self.field, self.depth
        )
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Resolve `schema` from the process environment.
pub fn resolve(schema: &'static Schema, options: &ResolveOptions) -> Result<Config> {
    let snapshot = EnvSnapshot::from_process(&options.prefix);
    resolve_from(schema, &snapshot, options)
}

/// Resolve `schema` from a snapshot already filtered by `options.prefix`.
pub fn resolve_from(
    schema: &'static Schema,
    snapshot: &EnvSnapshot,
    options: &ResolveOptions,
) -> Result<Config> {
    resolve_with_diagnostics(schema, snapshot, options).map(|(config, _)| config)
}

/// Like [`resolve_from`], also returning the depth-ceiling diagnostics.
pub fn resolve_with_diagnostics(
    schema: &'static Schema,
    snapshot: &EnvSnapshot,
    options: &ResolveOptions,
) -> Result<(Config, Vec<Diagnostic>)> {
    let span = telemetry::resolve::start_resolve_span(schema.name, &options.prefix);
    let _entered = span.enter();

    let tree = EnvTree::build(snapshot, &options.nesting_token());
    debug!(vars = snapshot.len(), "resolving config from environment");

    let mut resolver = Resolver {
        separator: &options.separator,
        max_depth: options.max_depth,
        diagnostics: Vec::new(),
    };
    let mut values = resolver.resolve_fields(schema, &tree, &options.defaults, 0, "")?;
    resolver.fold_extras(schema, &tree, &mut values);

    let config = schema.instantiate(values)?;
    telemetry::resolve::record_outcome(
        &span,
        config.extra_configs().len(),
        resolver.diagnostics.len(),
    );
    Ok((config, resolver.diagnostics))
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

struct Resolver<'a> {
    separator: &'a str,
    max_depth: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Resolver<'_> {
    /// Values for the declared fields of `schema` found in `tree`.
    ///
    /// Fields with neither an env value nor a default are left out; the
    /// schema decides at instantiation whether that is acceptable.
    fn resolve_fields(
        &mut self,
        schema: &'static Schema,
        tree: &EnvTree,
        defaults: &BTreeMap<String, Value>,
        depth: usize,
        path: &str,
    ) -> Result<BTreeMap<String, Value>> {
        let mut result = BTreeMap::new();

        for field in schema.fields {
            let key = env_key(field.name, self.separator);
            let field_path = join_path(path, field.name);
            let default = defaults.get(field.name);

            if let Some(nested) = field.ty.nested_schema() {
                if depth >= self.max_depth {
                    warn!(
                        field = %field_path,
                        depth,
                        max_depth = self.max_depth,
                        "max depth exceeded for nested field, treating it as a simple value"
                    );
                    self.diagnostics.push(Diagnostic {
                        field: field_path.clone(),
                        depth,
                        max_depth: self.max_depth,
                    });
                    if let Some(raw) = tree.leaf(&key) {
                        result.insert(field.name.to_string(), coerce(&field_path, raw, &field.ty)?);
                    } else if let Some(default) = default {
                        result.insert(field.name.to_string(), default.clone());
                    }
                } else if let Some(subtree) = tree.subtree(&key) {
                    let mut nested_values =
                        self.resolve_fields(nested, subtree, &BTreeMap::new(), depth + 1, &field_path)?;
                    self.fold_extras(nested, subtree, &mut nested_values);

                    if !nested_values.is_empty() {
                        let instance = nested.instantiate(nested_values)?;
                        result.insert(field.name.to_string(), Value::Config(Box::new(instance)));
                    } else if let Some(default) = default {
                        result.insert(field.name.to_string(), default.clone());
                    }
                } else if let Some(default) = default {
                    result.insert(field.name.to_string(), default.clone());
                }
                continue;
            }

            if let Some(raw) = tree.leaf(&key) {
                result.insert(field.name.to_string(), coerce(&field_path, raw, &field.ty)?);
            } else if let Some(default) = default {
                result.insert(field.name.to_string(), default.clone());
            }
        }

        Ok(result)
    }

    /// Add every leaf of `tree` that no declared field of `schema` claims as
    /// a raw string extra field.
    fn fold_extras(
        &self,
        schema: &'static Schema,
        tree: &EnvTree,
        values: &mut BTreeMap<String, Value>,
    ) {
        let declared_keys: HashSet<String> = schema
            .fields
            .iter()
            .map(|f| env_key(f.name, self.separator))
            .collect();

        for (key, node) in tree.iter() {
            let Some(raw) = node.as_leaf() else {
                continue;
            };
            if declared_keys.contains(key) {
                continue;
            }
            let name = field_name_for_key(key, self.separator);
            if schema.field(&name).is_some() {
                continue;
            }
            values
                .entry(name)
                .or_insert_with(|| Value::Str(raw.to_string()));
        }
    }
}

fn join_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}
