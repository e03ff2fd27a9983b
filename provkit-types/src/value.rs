//! Persisted state values.
//!
//! A resource's persisted state is a string-keyed map of heterogeneous
//! values. [`StateValue`] is the tagged union those values are read into;
//! every access that expects a particular variant goes through a checked
//! accessor that reports a [`StateFormatError`] rather than coercing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Attribute map of one persisted entity.
pub type StateMap = BTreeMap<String, StateValue>;

/// A single value in a persisted state map.
///
/// Serializes to and from plain JSON: `null`, booleans, numbers, strings,
/// arrays and objects. Integral numbers that fit an `i64` become
/// [`StateValue::Int`], every other number becomes [`StateValue::Float`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<StateValue>),
    Map(StateMap),
}

impl StateValue {
    /// Name of the variant, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats accept integral values too.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[StateValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&StateMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for StateValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for StateValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for StateValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for StateValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<StateValue>> for StateValue {
    fn from(value: Vec<StateValue>) -> Self {
        Self::List(value)
    }
}

impl From<StateMap> for StateValue {
    fn from(value: StateMap) -> Self {
        Self::Map(value)
    }
}

impl From<serde_json::Value> for StateValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(fields) => {
                Self::Map(fields.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<StateValue> for serde_json::Value {
    fn from(value: StateValue) -> Self {
        use serde_json::Value;
        match value {
            StateValue::Null => Value::Null,
            StateValue::Bool(b) => Value::Bool(b),
            StateValue::Int(i) => Value::from(i),
            // Non-finite floats have no JSON form.
            StateValue::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            StateValue::String(s) => Value::String(s),
            StateValue::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            StateValue::Map(fields) => {
                Value::Object(fields.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// A state map did not have the shape a reader expected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateFormatError {
    #[error("state attribute `{key}` is missing")]
    Missing { key: String },

    #[error("state attribute `{key}` is a {found}, expected {expected}")]
    WrongType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("state attribute `{key}` holds {value:?}, expected {expected}")]
    Invalid {
        key: String,
        value: String,
        expected: String,
    },
}

impl StateFormatError {
    pub fn invalid(key: impl Into<String>, value: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }
}

/// Checked accessors over a [`StateMap`].
///
/// `get_*` treat an absent key or an explicit null as `None`; `require_*`
/// and `take_*` fail on both. A present value of the wrong variant is always
/// an error.
pub trait StateMapExt {
    fn get_str(&self, key: &str) -> Result<Option<&str>, StateFormatError>;
    fn get_int(&self, key: &str) -> Result<Option<i64>, StateFormatError>;
    fn get_bool(&self, key: &str) -> Result<Option<bool>, StateFormatError>;

    fn require_str(&self, key: &str) -> Result<&str, StateFormatError>;
    fn require_int(&self, key: &str) -> Result<i64, StateFormatError>;

    /// Removes a string attribute and returns it. On error the map is left
    /// as it was.
    fn take_str(&mut self, key: &str) -> Result<String, StateFormatError>;

    /// Moves the value under `from` to `to`. Returns false when `from` is absent.
    fn rename_key(&mut self, from: &str, to: &str) -> bool;
}

fn present<'a>(map: &'a StateMap, key: &str) -> Option<&'a StateValue> {
    map.get(key).filter(|v| !v.is_null())
}

fn wrong_type(key: &str, expected: &'static str, found: &StateValue) -> StateFormatError {
    StateFormatError::WrongType {
        key: key.to_string(),
        expected,
        found: found.type_name(),
    }
}

fn missing(key: &str) -> StateFormatError {
    StateFormatError::Missing {
        key: key.to_string(),
    }
}

impl StateMapExt for StateMap {
    fn get_str(&self, key: &str) -> Result<Option<&str>, StateFormatError> {
        present(self, key)
            .map(|v| v.as_str().ok_or_else(|| wrong_type(key, "string", v)))
            .transpose()
    }

    fn get_int(&self, key: &str) -> Result<Option<i64>, StateFormatError> {
        present(self, key)
            .map(|v| v.as_int().ok_or_else(|| wrong_type(key, "int", v)))
            .transpose()
    }

    fn get_bool(&self, key: &str) -> Result<Option<bool>, StateFormatError> {
        present(self, key)
            .map(|v| v.as_bool().ok_or_else(|| wrong_type(key, "bool", v)))
            .transpose()
    }

    fn require_str(&self, key: &str) -> Result<&str, StateFormatError> {
        self.get_str(key)?.ok_or_else(|| missing(key))
    }

    fn require_int(&self, key: &str) -> Result<i64, StateFormatError> {
        self.get_int(key)?.ok_or_else(|| missing(key))
    }

    fn take_str(&mut self, key: &str) -> Result<String, StateFormatError> {
        match self.remove(key) {
            Some(StateValue::String(s)) => Ok(s),
            Some(StateValue::Null) => {
                self.insert(key.to_string(), StateValue::Null);
                Err(missing(key))
            }
            None => Err(missing(key)),
            Some(other) => {
                let err = wrong_type(key, "string", &other);
                self.insert(key.to_string(), other);
                Err(err)
            }
        }
    }

    fn rename_key(&mut self, from: &str, to: &str) -> bool {
        match self.remove(from) {
            Some(value) => {
                self.insert(to.to_string(), value);
                true
            }
            None => false,
        }
    }
}
