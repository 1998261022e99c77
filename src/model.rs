//! Resolved configuration instances and their dynamic values.
//!
//! A [`Config`] holds one value per declared field of its [`Schema`], in
//! declaration order, plus an open set of extra fields the schema does not
//! declare.

use crate::config::secrets::SecretString;
use crate::error::{Error, Result};
use crate::schema::Schema;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A dynamically typed configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<String>),
    /// Untyped nested mapping, e.g. a caller default for a nested field.
    Map(BTreeMap<String, Value>),
    /// An instantiated nested schema.
    Config(Box<Config>),
}

impl Value {
    /// Short name of the variant, used in validation errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Config(_) => "config",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Floats, or integers widened to float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_config(&self) -> Option<&Config> {
        match self {
            Value::Config(config) => Some(config),
            _ => None,
        }
    }

    /// JSON form of this value. Non-finite floats become null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Float(x) => serde_json::Number::from_f64(*x)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().cloned().map(serde_json::Value::String).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Config(config) => serde_json::Value::Object(config.dump()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

impl From<Vec<&str>> for Value {
    fn from(items: Vec<&str>) -> Self {
        Value::List(items.into_iter().map(String::from).collect())
    }
}

impl From<Config> for Value {
    fn from(config: Config) -> Self {
        Value::Config(Box::new(config))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// A schema instance: declared field values plus extras.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    schema: &'static Schema,
    values: Vec<Value>,
    extras: BTreeMap<String, Value>,
}

impl Config {
    /// `values` must line up with `schema.fields`.
    pub(crate) fn from_parts(
        schema: &'static Schema,
        values: Vec<Value>,
        extras: BTreeMap<String, Value>,
    ) -> Self {
        debug_assert_eq!(values.len(), schema.fields.len());
        Self {
            schema,
            values,
            extras,
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Value of a declared or extra field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self.schema.position(name) {
            Some(idx) => self.values.get(idx),
            None => self.extras.get(name),
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_list(&self, name: &str) -> Option<&[String]> {
        self.get(name).and_then(Value::as_list)
    }

    pub fn get_config(&self, name: &str) -> Option<&Config> {
        self.get(name).and_then(Value::as_config)
    }

    /// A string field wrapped as a secret, so it stays out of logs.
    pub fn secret(&self, name: &str) -> Option<SecretString> {
        self.get_str(name).map(SecretString::from)
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.schema.fields.iter().map(|f| f.name).zip(self.values.iter())
    }

    /// Only the fields the schema does not declare.
    pub fn extra_configs(&self) -> &BTreeMap<String, Value> {
        &self.extras
    }

    /// Assign a field. Declared fields are validated against their type;
    /// any other name is stored as an extra field.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        match self.schema.position(name) {
            Some(idx) => {
                let field = &self.schema.fields[idx];
                self.values[idx] = self.schema.validate(field, value)?;
            }
            None => {
                self.extras.insert(name.to_string(), value);
            }
        }
        Ok(())
    }

    /// Full field dump: declared fields first, then extras.
    ///
    /// Non-finite floats have no JSON form and dump as null. Coercion never
    /// produces them; they can only arrive through `set` or a schema default.
    pub fn dump(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        for (name, value) in self.fields() {
            map.insert(name.to_string(), value.to_json());
        }
        for (name, value) in &self.extras {
            map.insert(name.clone(), value.to_json());
        }
        map
    }

    /// Dump with sensitive fields masked; see [`crate::printable`].
    pub fn printable(&self) -> serde_json::Map<String, serde_json::Value> {
        crate::printable::printable(self)
    }

    /// Convert into any deserializable type, e.g. an application struct.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(serde_json::Value::Object(self.dump())).map_err(Error::from)
    }
}

impl Serialize for Config {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.dump().serialize(serializer)
    }
}
