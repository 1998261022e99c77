//! String-to-type coercion for leaf environment values.

use crate::error::{Error, Result};
use crate::model::Value;
use crate::schema::FieldType;

/// Values (compared lower-cased) that read as `true`; anything else is `false`.
pub const TRUTHY: [&str; 4] = ["true", "1", "yes", "on"];

/// Coerce a raw environment value to `ty`.
///
/// `field` only labels the error. Strings, nested types and anything
/// unrecognized pass through unchanged.
pub fn coerce(field: &str, raw: &str, ty: &FieldType) -> Result<Value> {
    match ty.unwrap_optional() {
        FieldType::Bool => Ok(Value::Bool(TRUTHY.contains(&raw.to_lowercase().as_str()))),
        FieldType::Int => raw
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| coercion_error(field, raw, "integer")),
        // inf and NaN parse, but have no JSON form
        FieldType::Float => match raw.trim().parse::<f64>() {
            Ok(x) if x.is_finite() => Ok(Value::Float(x)),
            _ => Err(coercion_error(field, raw, "float")),
        },
        FieldType::StrList => Ok(Value::List(split_list(raw))),
        FieldType::Str | FieldType::Nested(_) | FieldType::Optional(_) => {
            Ok(Value::Str(raw.to_string()))
        }
    }
}

/// Split on commas, trimming pieces and dropping empty ones.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

fn coercion_error(field: &str, raw: &str, expected: &'static str) -> Error {
    Error::Coercion {
        field: field.to_string(),
        value: raw.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleans() {
        for raw in ["true", "TRUE", "1", "yes", "On"] {
            assert_eq!(coerce("f", raw, &FieldType::Bool).unwrap(), Value::Bool(true), "{raw}");
        }
        for raw in ["false", "0", "no", "", "enabled"] {
            assert_eq!(coerce("f", raw, &FieldType::Bool).unwrap(), Value::Bool(false), "{raw}");
        }
    }

    #[test]
    fn numbers() {
        assert_eq!(coerce("f", "9000", &FieldType::Int).unwrap(), Value::Int(9000));
        assert_eq!(coerce("f", " -3 ", &FieldType::Int).unwrap(), Value::Int(-3));
        assert_eq!(coerce("f", "60.5", &FieldType::Float).unwrap(), Value::Float(60.5));
        assert_eq!(coerce("f", "2", &FieldType::Float).unwrap(), Value::Float(2.0));
    }

    #[test]
    fn non_numeric_input_fails() {
        let err = coerce("pool.max_size", "lots", &FieldType::Int).unwrap_err();
        match err {
            Error::Coercion {
                field,
                value,
                expected,
            } => {
                assert_eq!(field, "pool.max_size");
                assert_eq!(value, "lots");
                assert_eq!(expected, "integer");
            }
            other => panic!("expected Coercion, got {:?}", other),
        }
        assert!(coerce("f", "1.5.2", &FieldType::Float).is_err());
        assert!(coerce("f", "1.5", &FieldType::Int).is_err());
    }

    #[test]
    fn non_finite_floats_fail() {
        for raw in ["inf", "-infinity", "NaN", "1e999"] {
            let err = coerce("ratio", raw, &FieldType::Float).unwrap_err();
            assert!(matches!(err, Error::Coercion { expected: "float", .. }), "{raw}");
        }
    }

    #[test]
    fn lists() {
        assert_eq!(
            coerce("f", "a, b,,c ,", &FieldType::StrList).unwrap(),
            Value::from(vec!["a", "b", "c"])
        );
        assert_eq!(coerce("f", " , ", &FieldType::StrList).unwrap(), Value::List(vec![]));
    }

    #[test]
    fn optional_unwraps_before_coercion() {
        let ty = FieldType::Optional(&FieldType::Int);
        assert_eq!(coerce("f", "42", &ty).unwrap(), Value::Int(42));
    }

    #[test]
    fn strings_pass_through() {
        assert_eq!(coerce("f", " raw ", &FieldType::Str).unwrap(), Value::from(" raw "));
    }
}
