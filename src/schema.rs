//! Schema definitions.
//!
//! A schema is plain data: field names, declared types, nested schema
//! references and optional intrinsic defaults. Everything here is
//! `const`-constructible, so schemas are usually declared as statics:
//!
//! ```
//! use envtree_rs::schema::{FieldDefault, FieldSpec, FieldType, Schema};
//!
//! static POOL: Schema = Schema::new(
//!     "Pool",
//!     &[
//!         FieldSpec::new("max_size", FieldType::Int).default(FieldDefault::Int(10)),
//!         FieldSpec::new("min_size", FieldType::Int).default(FieldDefault::Int(2)),
//!     ],
//! );
//!
//! static DATABASE: Schema = Schema::new(
//!     "Database",
//!     &[
//!         FieldSpec::new("host", FieldType::Str),
//!         FieldSpec::new("pool", FieldType::Nested(&POOL)).default(FieldDefault::Nested),
//!     ],
//! );
//! ```

use crate::error::{Error, Result};
use crate::model::{Config, Value};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Field Type
// ---------------------------------------------------------------------------

/// Declared type of a schema field.
#[derive(Clone, Copy, PartialEq)]
pub enum FieldType {
    Bool,
    Int,
    Float,
    Str,
    /// Comma-separated list of strings.
    StrList,
    Nested(&'static Schema),
    /// `T` or null.
    Optional(&'static FieldType),
}

impl FieldType {
    /// Strip every `Optional` wrapper.
    pub fn unwrap_optional(&self) -> &FieldType {
        let mut ty = self;
        while let FieldType::Optional(inner) = ty {
            ty = *inner;
        }
        ty
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, FieldType::Optional(_))
    }

    /// The nested schema behind any optional wrappers, if this is one.
    pub fn nested_schema(&self) -> Option<&'static Schema> {
        match self.unwrap_optional() {
            FieldType::Nested(schema) => Some(*schema),
            _ => None,
        }
    }
}

// Nested schemas print by name only; a schema may refer to itself.
impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Bool => f.write_str("Bool"),
            FieldType::Int => f.write_str("Int"),
            FieldType::Float => f.write_str("Float"),
            FieldType::Str => f.write_str("Str"),
            FieldType::StrList => f.write_str("StrList"),
            FieldType::Nested(schema) => f.debug_tuple("Nested").field(&schema.name).finish(),
            FieldType::Optional(inner) => f.debug_tuple("Optional").field(inner).finish(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Bool => write!(f, "boolean"),
            FieldType::Int => write!(f, "integer"),
            FieldType::Float => write!(f, "float"),
            FieldType::Str => write!(f, "string"),
            FieldType::StrList => write!(f, "list<string>"),
            FieldType::Nested(schema) => write!(f, "{}", schema.name),
            FieldType::Optional(inner) => write!(f, "optional<{inner}>"),
        }
    }
}

// ---------------------------------------------------------------------------
// Field Default
// ---------------------------------------------------------------------------

/// Intrinsic default carried by the schema itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(&'static str),
    StrList(&'static [&'static str]),
    /// The nested schema's own all-defaults instance.
    Nested,
}

// ---------------------------------------------------------------------------
// Field / Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub default: Option<FieldDefault>,
}

impl FieldSpec {
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            default: None,
        }
    }

    pub const fn default(self, default: FieldDefault) -> Self {
        Self {
            default: Some(default),
            ..self
        }
    }

    /// Environment key for this field under `separator`.
    pub fn env_key(&self, separator: &str) -> String {
        env_key(self.name, separator)
    }
}

/// A named set of declared fields.
///
/// Schemas compare by identity: two schemas are equal only when they are
/// the same static.
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for Schema {}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish()
    }
}

impl Schema {
    pub const fn new(name: &'static str, fields: &'static [FieldSpec]) -> Self {
        Self { name, fields }
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Build an instance from field values.
    ///
    /// Declared fields are validated against their type; missing ones take
    /// the intrinsic default, null for optional fields, or fail. Names the
    /// schema does not declare are kept as extra fields.
    pub fn instantiate(&'static self, mut values: BTreeMap<String, Value>) -> Result<Config> {
        let mut resolved = Vec::with_capacity(self.fields.len());
        for field in self.fields {
            let value = match values.remove(field.name) {
                Some(value) => self.validate(field, value)?,
                None => match field.default {
                    Some(default) => {
                        let value = self.default_value(field, default)?;
                        self.validate(field, value)?
                    }
                    None if field.ty.is_optional() => Value::Null,
                    None => {
                        return Err(Error::MissingField {
                            schema: self.name.to_string(),
                            field: field.name.to_string(),
                        });
                    }
                },
            };
            resolved.push(value);
        }
        Ok(Config::from_parts(self, resolved, values))
    }

    /// The instance produced when nothing is supplied.
    pub fn defaults(&'static self) -> Result<Config> {
        self.instantiate(BTreeMap::new())
    }

    /// Check `value` against the declared type of `field`.
    ///
    /// Integers widen to floats and maps instantiate nested schemas;
    /// everything else must match exactly.
    pub fn validate(&self, field: &FieldSpec, value: Value) -> Result<Value> {
        self.validate_as(field, &field.ty, value)
    }

    fn validate_as(&self, field: &FieldSpec, ty: &FieldType, value: Value) -> Result<Value> {
        match (ty, value) {
            (FieldType::Optional(_), Value::Null) => Ok(Value::Null),
            (FieldType::Optional(inner), value) => self.validate_as(field, inner, value),
            (FieldType::Bool, value @ Value::Bool(_)) => Ok(value),
            (FieldType::Int, value @ Value::Int(_)) => Ok(value),
            (FieldType::Float, value @ Value::Float(_)) => Ok(value),
            (FieldType::Float, Value::Int(n)) => Ok(Value::Float(n as f64)),
            (FieldType::Str, value @ Value::Str(_)) => Ok(value),
            (FieldType::StrList, value @ Value::List(_)) => Ok(value),
            (FieldType::Nested(schema), Value::Config(config))
                if std::ptr::eq(config.schema(), *schema) =>
            {
                Ok(Value::Config(config))
            }
            (FieldType::Nested(schema), Value::Map(map)) => {
                Ok(Value::Config(Box::new(schema.instantiate(map)?)))
            }
            (ty, value) => Err(Error::Validation {
                schema: self.name.to_string(),
                field: field.name.to_string(),
                expected: ty.to_string(),
                found: value.kind(),
            }),
        }
    }

    fn default_value(&self, field: &FieldSpec, default: FieldDefault) -> Result<Value> {
        Ok(match default {
            FieldDefault::Null => Value::Null,
            FieldDefault::Bool(b) => Value::Bool(b),
            FieldDefault::Int(n) => Value::Int(n),
            FieldDefault::Float(x) => Value::Float(x),
            FieldDefault::Str(s) => Value::Str(s.to_string()),
            FieldDefault::StrList(items) => {
                Value::List(items.iter().map(|s| s.to_string()).collect())
            }
            FieldDefault::Nested => match field.ty.nested_schema() {
                Some(nested) => Value::Config(Box::new(nested.defaults()?)),
                None => {
                    return Err(Error::Validation {
                        schema: self.name.to_string(),
                        field: field.name.to_string(),
                        expected: field.ty.to_string(),
                        found: "nested default",
                    });
                }
            },
        })
    }
}

/// Environment key for `field_name`.
///
/// With the default `_` separator this is just the upper-cased name; any
/// other separator replaces the underscores first (`max_size` with `.`
/// becomes `MAX.SIZE`).
pub fn env_key(field_name: &str, separator: &str) -> String {
    if separator == "_" {
        field_name.to_uppercase()
    } else {
        field_name.replace('_', separator).to_uppercase()
    }
}

/// Field name for an undeclared env key: the inverse of [`env_key`].
pub fn field_name_for_key(key: &str, separator: &str) -> String {
    if separator == "_" || separator.is_empty() {
        key.to_lowercase()
    } else {
        key.replace(separator, "_").to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static RETRY: Schema = Schema::new(
        "Retry",
        &[
            FieldSpec::new("max_attempts", FieldType::Int).default(FieldDefault::Int(3)),
            FieldSpec::new("backoff_factor", FieldType::Float).default(FieldDefault::Float(2.0)),
        ],
    );

    static SERVICE: Schema = Schema::new(
        "Service",
        &[
            FieldSpec::new("name", FieldType::Str),
            FieldSpec::new("timeout", FieldType::Float).default(FieldDefault::Int(30)),
            FieldSpec::new("tags", FieldType::StrList).default(FieldDefault::StrList(&["a"])),
            FieldSpec::new("retry", FieldType::Nested(&RETRY)).default(FieldDefault::Nested),
            FieldSpec::new("port", FieldType::Optional(&FieldType::Int)),
        ],
    );

    #[test]
    fn env_key_uses_separator() {
        assert_eq!(env_key("max_size", "_"), "MAX_SIZE");
        assert_eq!(env_key("max_size", "."), "MAX.SIZE");
        assert_eq!(field_name_for_key("MAX.SIZE", "."), "max_size");
        assert_eq!(field_name_for_key("DEBUG_MODE", "_"), "debug_mode");
    }

    #[test]
    fn unwrap_optional_strips_all_layers() {
        static INNER: FieldType = FieldType::Optional(&FieldType::Bool);
        let ty = FieldType::Optional(&INNER);
        assert_eq!(ty.unwrap_optional(), &FieldType::Bool);
        assert!(ty.is_optional());
        assert_eq!(ty.to_string(), "optional<optional<boolean>>");
    }

    #[test]
    fn instantiate_fills_defaults() {
        let mut values = BTreeMap::new();
        values.insert("name".to_string(), Value::from("svc"));
        let config = SERVICE.instantiate(values).unwrap();

        assert_eq!(config.get_str("name"), Some("svc"));
        assert_eq!(config.get("timeout"), Some(&Value::Float(30.0)));
        assert_eq!(config.get("port"), Some(&Value::Null));
        let retry = config.get_config("retry").unwrap();
        assert_eq!(retry.get_i64("max_attempts"), Some(3));
    }

    #[test]
    fn instantiate_requires_mandatory_fields() {
        let err = SERVICE.instantiate(BTreeMap::new()).unwrap_err();
        assert!(matches!(err, Error::MissingField { ref field, .. } if field == "name"));
    }

    #[test]
    fn instantiate_rejects_wrong_type() {
        let mut values = BTreeMap::new();
        values.insert("name".to_string(), Value::from("svc"));
        values.insert("retry".to_string(), Value::from("not a table"));
        let err = SERVICE.instantiate(values).unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, found: "string", .. } if field == "retry"));
    }

    #[test]
    fn instantiate_accepts_map_for_nested() {
        let mut retry = BTreeMap::new();
        retry.insert("max_attempts".to_string(), Value::Int(9));
        let mut values = BTreeMap::new();
        values.insert("name".to_string(), Value::from("svc"));
        values.insert("retry".to_string(), Value::Map(retry));
        let config = SERVICE.instantiate(values).unwrap();
        let retry = config.get_config("retry").unwrap();
        assert_eq!(retry.get_i64("max_attempts"), Some(9));
        assert_eq!(retry.get_f64("backoff_factor"), Some(2.0));
    }

    static TREE_NODE: Schema = Schema::new(
        "TreeNode",
        &[
            FieldSpec::new("label", FieldType::Optional(&FieldType::Str)),
            FieldSpec::new("child", FieldType::Optional(&FieldType::Nested(&TREE_NODE))),
        ],
    );

    static OTHER_NODE: Schema = Schema::new("TreeNode", &[]);

    #[test]
    fn self_referencing_schema_compares_and_prints() {
        assert_eq!(TREE_NODE, TREE_NODE);
        assert_ne!(TREE_NODE, OTHER_NODE);
        let debug = format!("{TREE_NODE:?}");
        assert!(debug.contains("Nested(\"TreeNode\")"), "{debug}");
        assert_eq!(TREE_NODE.fields[1].ty.to_string(), "optional<TreeNode>");
    }

    #[test]
    fn self_referencing_schema_accepts_nested_instance() {
        let child = TREE_NODE.defaults().unwrap();
        let mut values = BTreeMap::new();
        values.insert("child".to_string(), Value::Config(Box::new(child.clone())));
        let parent = TREE_NODE.instantiate(values).unwrap();
        assert_eq!(parent.get_config("child"), Some(&child));
        assert!(format!("{parent:?}").contains("TreeNode"));
    }
}
