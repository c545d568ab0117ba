//! Universal field value type shared by editor nodes and config documents.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ModelOption;

/// A value held by an editor field.
///
/// Covers everything an editor widget can hold:
/// - Scalars: Bool, Int, Float, String
/// - Containers: List, Map
/// - Model selections: a catalog entry picked from a model dropdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    Model(Box<ModelOption>),
}

// ============================================================================
// Type checking
// ============================================================================

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::String(_) => "STRING",
            Value::List(_) => "LIST",
            Value::Map(_) => "MAP",
            Value::Model(_) => "MODEL",
        }
    }

    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }
    pub fn is_numeric(&self) -> bool { matches!(self, Value::Int(_) | Value::Float(_)) }

    /// Config-document truthiness: zero, NaN, empty strings and null are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Attempt to extract as i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Attempt to extract as f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Like [`Value::as_float`], but also accepts strings holding a number
    /// (`"900"`). Used by importers that round sizes.
    pub fn as_float_lenient(&self) -> Option<f64> {
        match self {
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            other => other.as_float(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempt to extract as &str
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&ModelOption> {
        match self {
            Value::Model(m) => Some(m),
            _ => None,
        }
    }

    /// Semantic equality: numbers compare by magnitude regardless of
    /// Int/Float representation, everything else structurally.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_numeric() && b.is_numeric() => a.as_float() == b.as_float(),
            (a, b) => a == b,
        }
    }
}

// ============================================================================
// JSON bridge (config documents are JSON)
// ============================================================================

impl Value {
    /// Convert a parsed JSON value. Integral numbers become `Int`.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.iter().map(|(k, v)| (k.clone(), Value::from_json(v))).collect(),
            ),
        }
    }

    /// Convert to JSON. Model selections export as their file name; non-finite
    /// floats export as null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Model(m) => serde_json::Value::String(m.file.clone()),
        }
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v as i64) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Float(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::String(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::String(v.to_owned()) } }
impl From<ModelOption> for Value { fn from(v: ModelOption) -> Self { Value::Model(Box::new(v)) } }
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self { Value::List(v.into_iter().map(Into::into).collect()) }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self { v.map(Into::into).unwrap_or(Value::Null) }
}

// ============================================================================
// Display
// ============================================================================

/// Renders the way the editor shows values in notifications: strings bare,
/// model selections by name.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "{s}"),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Model(m) => write!(f, "{}", m.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from() {
        assert_eq!(Value::from("hello"), Value::String("hello".into()));
        assert_eq!(Value::from(42), Value::Int(42));
        assert_eq!(Value::from(3.5), Value::Float(3.5));
        assert_eq!(Value::from(true), Value::Bool(true));
    }

    #[test]
    fn test_same_as_crosses_numeric_types() {
        assert!(Value::Int(3).same_as(&Value::Float(3.0)));
        assert!(!Value::Int(3).same_as(&Value::Float(3.5)));
        assert!(!Value::Int(1).same_as(&Value::Bool(true)));
    }

    #[test]
    fn test_lenient_float() {
        assert_eq!(Value::from("900").as_float_lenient(), Some(900.0));
        assert_eq!(Value::from("apple").as_float_lenient(), None);
        assert_eq!(Value::Bool(true).as_float_lenient(), None);
    }

    #[test]
    fn test_json_numbers() {
        let json: serde_json::Value = serde_json::from_str("[3, 2.5, -1]").unwrap();
        assert_eq!(
            Value::from_json(&json),
            Value::List(vec![Value::Int(3), Value::Float(2.5), Value::Int(-1)])
        );
    }

    #[test]
    fn test_display_is_bare() {
        assert_eq!(Value::from("apple").to_string(), "apple");
        assert_eq!(Value::Float(1.0).to_string(), "1");
    }
}
