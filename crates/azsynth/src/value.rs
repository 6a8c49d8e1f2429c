//! value representation
//!
//! The emitted template model contains the following data types
//! - boolean (true/false)
//! - integer (signed, currently: i64 - may change)
//! - decimal (currently: f64 - may change)
//! - string (utf-8)
//! - array ("list" of values)
//! - object (order-preserving "map"/"dictionary", where the key is of type string)
//!
//! Additionally:
//! - there is no `null`/`None` value. A field that was never set is omitted, which is not the same as an empty one.
//! - there is no deferred reference. Those only exist as [crate::reference::Property] and must be resolved into a
//!   [Value] before anything is emitted.
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serializer,
};

/// All possible value types
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Array(Vec<Value>),
    Object(indexmap::IndexMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl From<hcl::Number> for Value {
    fn from(value: hcl::Number) -> Self {
        if let Some(int) = value.as_i64() {
            return Value::Integer(int);
        }

        Value::Decimal(
            value
                .as_f64()
                .expect("a numeric value that is not an integer must be a float"),
        )
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<K: ToString, V: Into<Value>> From<indexmap::IndexMap<K, V>> for Value {
    fn from(value: indexmap::IndexMap<K, V>) -> Self {
        Value::Object(
            value
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into()))
                .collect(),
        )
    }
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Decimal(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::Array(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Object(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn serializes_in_insertion_order() {
        let value = Value::Object(indexmap::indexmap! {
            "zeta".to_string() => Value::from(1i64),
            "alpha".to_string() => Value::from(vec!["a", "b"]),
        });

        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"zeta":1,"alpha":["a","b"]}"#
        );
    }
}
