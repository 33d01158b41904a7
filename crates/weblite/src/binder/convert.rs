use serde_json::{Number, Value};

use crate::binder::TargetType;
use crate::error::BoxError;

/// Converts a raw string into a declared target type.
///
/// Stateless and shared across requests; the binder invokes it for every raw
/// value whose target is not `String`.
#[cfg_attr(test, mockall::automock)]
pub trait TypeConverter: Send + Sync {
    fn from_string(&self, raw: &str, target: TargetType) -> Result<Value, BoxError>;
}

/// Conversions through the standard `FromStr` impls and `serde_json`.
#[derive(Debug, Default)]
pub struct DefaultConverter;

impl TypeConverter for DefaultConverter {
    fn from_string(&self, raw: &str, target: TargetType) -> Result<Value, BoxError> {
        match target {
            TargetType::String => Ok(Value::String(raw.to_owned())),
            TargetType::Bool => raw.parse::<bool>().map(Value::Bool).map_err(Into::into),
            TargetType::Int => raw.parse::<i64>().map(Value::from).map_err(Into::into),
            TargetType::Float => {
                let parsed = raw.parse::<f64>()?;
                Number::from_f64(parsed)
                    .map(Value::Number)
                    .ok_or_else(|| format!("{raw:?} is not a finite number").into())
            }
            TargetType::Value => serde_json::from_str(raw).map_err(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_primitives() {
        let converter = DefaultConverter;
        assert_eq!(converter.from_string("true", TargetType::Bool).unwrap(), Value::Bool(true));
        assert_eq!(converter.from_string("42", TargetType::Int).unwrap(), Value::from(42));
        assert_eq!(converter.from_string("2.5", TargetType::Float).unwrap(), Value::from(2.5));
        assert_eq!(
            converter.from_string("plain", TargetType::String).unwrap(),
            Value::String("plain".to_owned())
        );
    }

    #[test]
    fn value_target_parses_json() {
        let value = DefaultConverter.from_string(r#"{"a":1}"#, TargetType::Value).unwrap();
        assert_eq!(value["a"], Value::from(1));
    }

    #[test]
    fn rejects_garbage_and_nonfinite() {
        assert!(DefaultConverter.from_string("yes", TargetType::Bool).is_err());
        assert!(DefaultConverter.from_string("4x", TargetType::Int).is_err());
        assert!(DefaultConverter.from_string("NaN", TargetType::Float).is_err());
    }
}
