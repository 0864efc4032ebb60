//! Typed feature values and descriptors

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FeatureError;

/// Kind of a device feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    Integer,
    Float,
    Enum,
    Boolean,
}

impl FeatureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Integer => "Integer",
            FeatureKind::Float => "Float",
            FeatureKind::Enum => "Enum",
            FeatureKind::Boolean => "Boolean",
        }
    }
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current or requested value of a feature
///
/// Serialized as `{"type": "Float", "value": 12.5}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum FeatureValue {
    Integer(i64),
    Float(f64),
    Enum(String),
    Boolean(bool),
}

impl FeatureValue {
    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureValue::Integer(_) => FeatureKind::Integer,
            FeatureValue::Float(_) => FeatureKind::Float,
            FeatureValue::Enum(_) => FeatureKind::Enum,
            FeatureValue::Boolean(_) => FeatureKind::Boolean,
        }
    }
}

impl std::fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureValue::Integer(v) => write!(f, "{}", v),
            FeatureValue::Float(v) => write!(f, "{}", v),
            FeatureValue::Enum(v) => f.write_str(v),
            FeatureValue::Boolean(v) => write!(f, "{}", v),
        }
    }
}

/// Value constraint advertised by a feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    None,
    IntRange { min: i64, max: i64 },
    FloatRange { min: f64, max: f64 },
    Options { options: Vec<String> },
}

/// Description of one readable feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDescriptor {
    pub name: String,
    pub value: FeatureValue,
    pub constraint: Constraint,
    pub writable: bool,
}

impl FeatureDescriptor {
    pub fn integer(name: &str, value: i64, min: i64, max: i64) -> Self {
        Self {
            name: name.to_string(),
            value: FeatureValue::Integer(value),
            constraint: Constraint::IntRange { min, max },
            writable: true,
        }
    }

    pub fn float(name: &str, value: f64, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            value: FeatureValue::Float(value),
            constraint: Constraint::FloatRange { min, max },
            writable: true,
        }
    }

    pub fn enumeration(name: &str, value: &str, options: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            value: FeatureValue::Enum(value.to_string()),
            constraint: Constraint::Options {
                options: options.iter().map(|o| o.to_string()).collect(),
            },
            writable: true,
        }
    }

    pub fn boolean(name: &str, value: bool) -> Self {
        Self {
            name: name.to_string(),
            value: FeatureValue::Boolean(value),
            constraint: Constraint::None,
            writable: true,
        }
    }

    /// Mark the feature read-only
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn kind(&self) -> FeatureKind {
        self.value.kind()
    }

    /// Convert a loosely typed JSON setting into this feature's kind
    ///
    /// JSON integers are accepted for float features; nothing else is coerced.
    pub fn coerce(&self, json: &Value) -> Result<FeatureValue, FeatureError> {
        let value = match (self.kind(), json) {
            (FeatureKind::Integer, Value::Number(n)) => n.as_i64().map(FeatureValue::Integer),
            (FeatureKind::Float, Value::Number(n)) => n.as_f64().map(FeatureValue::Float),
            (FeatureKind::Enum, Value::String(s)) => Some(FeatureValue::Enum(s.clone())),
            (FeatureKind::Boolean, Value::Bool(b)) => Some(FeatureValue::Boolean(*b)),
            _ => None,
        };

        value.ok_or_else(|| FeatureError::TypeMismatch {
            name: self.name.clone(),
            expected: self.kind().as_str(),
            found: json.to_string(),
        })
    }

    /// Check a typed value against kind and constraint
    pub fn validate(&self, value: &FeatureValue) -> Result<(), FeatureError> {
        if value.kind() != self.kind() {
            return Err(FeatureError::TypeMismatch {
                name: self.name.clone(),
                expected: self.kind().as_str(),
                found: value.kind().as_str().to_string(),
            });
        }

        let in_range = match (&self.constraint, value) {
            (Constraint::IntRange { min, max }, FeatureValue::Integer(v)) => v >= min && v <= max,
            (Constraint::FloatRange { min, max }, FeatureValue::Float(v)) => {
                v.is_finite() && v >= min && v <= max
            }
            (Constraint::Options { options }, FeatureValue::Enum(v)) => {
                if !options.iter().any(|o| o == v) {
                    return Err(FeatureError::InvalidOption {
                        name: self.name.clone(),
                        value: v.clone(),
                    });
                }
                true
            }
            _ => true,
        };

        if in_range {
            Ok(())
        } else {
            Err(FeatureError::OutOfRange {
                name: self.name.clone(),
                value: value.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_coerce_accepts_integer_for_float() {
        let gain = FeatureDescriptor::float("Gain", 0.0, 0.0, 24.0);
        assert_eq!(gain.coerce(&json!(12)).unwrap(), FeatureValue::Float(12.0));
        assert_eq!(gain.coerce(&json!(1.5)).unwrap(), FeatureValue::Float(1.5));
    }

    #[test]
    fn test_coerce_rejects_float_for_integer() {
        let width = FeatureDescriptor::integer("Width", 640, 16, 1920);
        let err = width.coerce(&json!(640.5)).unwrap_err();
        assert!(matches!(err, FeatureError::TypeMismatch { expected: "Integer", .. }));
    }

    #[test]
    fn test_coerce_rejects_string_for_boolean() {
        let reverse = FeatureDescriptor::boolean("ReverseX", false);
        assert!(reverse.coerce(&json!("true")).is_err());
        assert_eq!(reverse.coerce(&json!(true)).unwrap(), FeatureValue::Boolean(true));
    }

    #[test]
    fn test_validate_ranges_and_options() {
        let width = FeatureDescriptor::integer("Width", 640, 16, 1920);
        assert!(width.validate(&FeatureValue::Integer(1920)).is_ok());
        assert!(matches!(
            width.validate(&FeatureValue::Integer(4000)),
            Err(FeatureError::OutOfRange { .. })
        ));

        let gain = FeatureDescriptor::float("Gain", 0.0, 0.0, 24.0);
        assert!(gain.validate(&FeatureValue::Float(f64::NAN)).is_err());

        let format = FeatureDescriptor::enumeration("PixelFormat", "Mono8", &["Mono8", "BayerRG8"]);
        assert!(format.validate(&FeatureValue::Enum("BayerRG8".into())).is_ok());
        assert!(matches!(
            format.validate(&FeatureValue::Enum("RGB8".into())),
            Err(FeatureError::InvalidOption { .. })
        ));
        assert!(matches!(
            format.validate(&FeatureValue::Boolean(true)),
            Err(FeatureError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_value_serde_shape() {
        let value = FeatureValue::Float(12.5);
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({"type": "Float", "value": 12.5})
        );
        let back: FeatureValue = serde_json::from_value(json!({"type": "Enum", "value": "Mono8"})).unwrap();
        assert_eq!(back, FeatureValue::Enum("Mono8".into()));
    }
}
