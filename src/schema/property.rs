//! Typed, flagged property key descriptors.

use serde::{Deserialize, Serialize};

use crate::model::{Value, ValueType};

/// A named, typed field descriptor contributed by a trait.
///
/// Keys are owned by the trait that declares them and referenced by every
/// descriptor composed from it. Names are unique within one trait; across
/// traits the composition order decides which declaration wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyKey {
    pub name: String,
    pub value_type: ValueType,
    pub indexed: bool,
    pub unique: bool,
    pub read_only: bool,
    pub required: bool,
    /// Declared default, materialized during creation/validation when the
    /// raw field is absent.
    pub default_value: Option<Value>,
}

impl PropertyKey {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            indexed: false,
            unique: false,
            read_only: false,
            required: false,
            default_value: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self { Self::new(name, ValueType::String) }
    pub fn int(name: impl Into<String>) -> Self { Self::new(name, ValueType::Int) }
    pub fn float(name: impl Into<String>) -> Self { Self::new(name, ValueType::Float) }
    pub fn boolean(name: impl Into<String>) -> Self { Self::new(name, ValueType::Bool) }
    pub fn bytes(name: impl Into<String>) -> Self { Self::new(name, ValueType::Bytes) }
    pub fn list(name: impl Into<String>) -> Self { Self::new(name, ValueType::List) }
    pub fn map(name: impl Into<String>) -> Self { Self::new(name, ValueType::Map) }
    pub fn date(name: impl Into<String>) -> Self { Self::new(name, ValueType::Date) }
    pub fn datetime(name: impl Into<String>) -> Self { Self::new(name, ValueType::DateTime) }
    pub fn any(name: impl Into<String>) -> Self { Self::new(name, ValueType::Any) }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Whether a value is assignable to this key.
    pub fn accepts(&self, value: &Value) -> bool {
        self.value_type.accepts(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_chain() {
        let key = PropertyKey::string("name").indexed().unique().required();
        assert!(key.indexed && key.unique && key.required);
        assert!(!key.read_only);
    }

    #[test]
    fn test_accepts() {
        let key = PropertyKey::int("age");
        assert!(key.accepts(&Value::Int(3)));
        assert!(key.accepts(&Value::Null));
        assert!(!key.accepts(&Value::from("three")));
    }

    #[test]
    fn test_default_value() {
        let key = PropertyKey::string("visibility").with_default("private");
        assert_eq!(key.default_value, Some(Value::from("private")));
    }
}
