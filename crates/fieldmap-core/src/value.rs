//! Dynamic value model shared by sources, hooks and results.
//!
//! A source handed to a mapper may be:
//! - a [`Record`] (looked up with get-with-default semantics),
//! - an [`Object`] (attribute access, missing attributes are detectable),
//! - a sequence of either,
//! - `Null`.
//!
//! Any value may also be a zero-argument [`Callable`] producing the real value.

use indexmap::IndexMap;
use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;
use std::sync::Arc;

/// Insertion-ordered associative container of string keys.
pub type Record = IndexMap<String, Value>;

/// An attribute-bearing source object.
pub trait Object: Send + Sync {
    /// Name used in diagnostics.
    fn type_name(&self) -> &str;

    /// Attribute lookup. `None` means the attribute is not defined.
    fn attr(&self, name: &str) -> Option<Value>;
}

/// A zero-argument callable value.
#[derive(Clone)]
pub struct Callable(Arc<dyn Fn() -> Value + Send + Sync>);

impl Callable {
    pub fn new(f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self) -> Value {
        (self.0)()
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<callable>")
    }
}

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(Record),
    Object(Arc<dyn Object>),
    Callable(Callable),
}

impl Value {
    /// Wrap an attribute-bearing object.
    pub fn object(object: impl Object + 'static) -> Self {
        Self::Object(Arc::new(object))
    }

    /// Wrap a zero-argument callable.
    pub fn callable(f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Self::Callable(Callable::new(f))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Callable(_))
    }

    /// Call the value once if it is callable, otherwise return it unchanged.
    pub fn invoke(self) -> Self {
        match self {
            Self::Callable(callable) => callable.call(),
            other => other,
        }
    }

    /// Truthiness in the usual dynamic-language sense.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Map(record) => !record.is_empty(),
            Self::Object(_) | Self::Callable(_) => true,
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
            Self::Callable(_) => "callable",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Record> {
        match self {
            Self::Map(record) => Some(record),
            _ => None,
        }
    }

    /// Key lookup on records, attribute lookup on objects.
    ///
    /// Returns `None` for every other variant.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Self::Map(record) => record.get(key).cloned(),
            Self::Object(object) => object.attr(key),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => (*a as f64) == *b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            (Self::Callable(a), Self::Callable(b)) => Arc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::List(items) => f.debug_list().entries(items).finish(),
            Self::Map(record) => f.debug_map().entries(record.iter()).finish(),
            Self::Object(object) => write!(f, "<{} object>", object.type_name()),
            Self::Callable(callable) => fmt::Debug::fmt(callable, f),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(x) => serializer.serialize_f64(*x),
            Self::Str(s) => serializer.serialize_str(s),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(record) => {
                let mut map = serializer.serialize_map(Some(record.len()))?;
                for (key, value) in record {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Self::Object(object) => Err(S::Error::custom(format!(
                "cannot serialize opaque {} object",
                object.type_name()
            ))),
            Self::Callable(_) => Err(S::Error::custom("cannot serialize a callable")),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Self::Map(record)
    }
}

impl From<Callable> for Value {
    fn from(callable: Callable) -> Self {
        Self::Callable(callable)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::Str(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

/// A named bag of attributes implementing [`Object`].
///
/// Unlike a [`Record`], reading an attribute it does not hold is an error
/// during extraction rather than a silent null.
#[derive(Debug, Clone)]
pub struct Attrs {
    type_name: String,
    attrs: Record,
}

impl Attrs {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            attrs: Record::new(),
        }
    }

    /// Builder-style attribute assignment.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attrs.insert(name.into(), value.into());
    }

    /// Finish building and wrap as a [`Value::Object`].
    pub fn into_value(self) -> Value {
        Value::object(self)
    }
}

impl Object for Attrs {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn attr(&self, name: &str) -> Option<Value> {
        self.attrs.get(name).cloned()
    }
}

/// Build a [`Record`] from `key => value` pairs.
#[macro_export]
macro_rules! record {
    () => { $crate::Record::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::Record::new();
        $( record.insert(::std::string::String::from($key), $crate::Value::from($value)); )+
        record
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_objects_keep_key_order() {
        let value = Value::from(json!({"b": 1, "a": {"c": [true, null]}}));
        let record = value.as_map().expect("map");
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, ["b", "a"]);
        assert_eq!(
            record["a"].get("c"),
            Some(Value::List(vec![Value::Bool(true), Value::Null]))
        );
    }

    #[test]
    fn invoke_calls_once_and_passes_other_values_through() {
        let nested = Value::callable(|| Value::callable(|| Value::from("inner")));
        assert!(nested.invoke().is_callable());
        assert_eq!(Value::from(3).invoke(), Value::Int(3));
    }

    #[test]
    fn objects_compare_by_identity() {
        let a = Attrs::new("Spam").with("egg", 1).into_value();
        let b = Attrs::new("Spam").with("egg", 1).into_value();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(format!("{a:?}"), "<Spam object>");
    }

    #[test]
    fn serialize_refuses_opaque_values() {
        let ok = Value::from(record! {"spam" => "egg", "n" => 2});
        assert_eq!(
            serde_json::to_string(&ok).expect("serialize"),
            r#"{"spam":"egg","n":2}"#
        );
        let opaque = Value::List(vec![Attrs::new("Spam").into_value()]);
        assert!(serde_json::to_string(&opaque).is_err());
    }

    #[test]
    fn truthiness_follows_emptiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(!Value::List(Vec::new()).is_truthy());
        assert!(Attrs::new("Spam").into_value().is_truthy());
    }
}
