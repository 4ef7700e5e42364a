//! Values produced by evaluating annotation arguments.
//!
//! The scripting runtime that evaluates annotation arguments lives outside
//! this crate; it hands over its results as [`Value`]s. Every consumer
//! matches on the variant instead of probing at runtime.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Number, Value as Literal};

/// Signature of an assertion predicate over a data value.
pub type PredicateFn = dyn Fn(&Literal) -> bool + Send + Sync;

/// A function value.
#[derive(Clone)]
pub struct Callable {
    name: String,
    func: Arc<PredicateFn>,
}

impl Callable {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Literal) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, value: &Literal) -> bool {
        (self.func)(value)
    }

    /// True when both handles point at the same function.
    pub fn same_as(&self, other: &Callable) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.name)
    }
}

/// A runtime object exposing named attributes (e.g. a pre-built assertion).
pub trait HasAttrs: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &str;

    /// Look up an attribute; `None` when the object has no such attribute.
    fn attr(&self, name: &str) -> Option<Value>;
}

/// Plain attribute bag, the shape the runtime uses for `struct(...)` values.
#[derive(Debug, Clone)]
pub struct AttrStruct {
    type_name: String,
    attrs: Vec<(String, Value)>,
}

impl AttrStruct {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            attrs: Vec::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }
}

impl HasAttrs for AttrStruct {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn attr(&self, name: &str) -> Option<Value> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }
}

/// An evaluated annotation argument.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Tuple(Vec<Value>),
    Sequence(Vec<Value>),
    Mapping(Vec<(String, Value)>),
    Callable(Callable),
    Object(Arc<dyn HasAttrs>),
}

impl Value {
    pub fn tuple(first: impl Into<Value>, second: impl Into<Value>) -> Self {
        Value::Tuple(vec![first.into(), second.into()])
    }

    pub fn object(obj: impl HasAttrs + 'static) -> Self {
        Value::Object(Arc::new(obj))
    }

    /// Type name as the runtime reports it in diagnostics.
    pub fn type_name(&self) -> String {
        match self {
            Value::None => "NoneType".to_string(),
            Value::String(_) => "string".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Tuple(_) => "tuple".to_string(),
            Value::Sequence(_) => "list".to_string(),
            Value::Mapping(_) => "dict".to_string(),
            Value::Callable(_) => "function".to_string(),
            Value::Object(obj) => obj.type_name().to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer conversion accepted wherever a count is expected.
    ///
    /// Finite floats truncate toward zero.
    pub fn to_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            _ => None,
        }
    }

    /// Elements of a tuple or list.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(items) | Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Convert to a plain data value.
    ///
    /// Returns the type name of the first element that has no data
    /// representation (functions, objects, non-finite floats).
    pub fn to_literal(&self) -> Result<Literal, String> {
        match self {
            Value::None => Ok(Literal::Null),
            Value::String(s) => Ok(Literal::String(s.clone())),
            Value::Bool(b) => Ok(Literal::Bool(*b)),
            Value::Int(i) => Ok(Literal::Number((*i).into())),
            Value::Float(f) => Number::from_f64(*f)
                .map(Literal::Number)
                .ok_or_else(|| "float".to_string()),
            Value::Tuple(items) | Value::Sequence(items) => items
                .iter()
                .map(Value::to_literal)
                .collect::<Result<Vec<_>, _>>()
                .map(Literal::Array),
            Value::Mapping(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key.clone(), value.to_literal()?);
                }
                Ok(Literal::Object(map))
            }
            Value::Callable(_) | Value::Object(_) => Err(self.type_name()),
        }
    }

    /// Build a value from a plain data value. Arrays become lists.
    pub fn from_literal(literal: &Literal) -> Self {
        match literal {
            Literal::Null => Value::None,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Literal::String(s) => Value::String(s.clone()),
            Literal::Array(items) => Value::Sequence(items.iter().map(Value::from_literal).collect()),
            Literal::Object(map) => Value::Mapping(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_literal(v)))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) | (Value::Sequence(a), Value::Sequence(b)) => a == b,
            (Value::Mapping(a), Value::Mapping(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a.same_as(b),
            (Value::Object(a), Value::Object(b)) => {
                Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Tuple(items) => {
                f.write_str("(")?;
                write_joined(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Value::Sequence(items) => {
                f.write_str("[")?;
                write_joined(f, items)?;
                f.write_str("]")
            }
            Value::Mapping(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:?}: {}", key, value)?;
                }
                f.write_str("}")
            }
            Value::Callable(c) => write!(f, "<function {}>", c.name()),
            Value::Object(obj) => write!(f, "<{}>", obj.type_name()),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<Callable> for Value {
    fn from(c: Callable) -> Self {
        Value::Callable(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn to_literal_converts_nested_values() {
        let value = Value::Sequence(vec![
            Value::Mapping(vec![("bar".into(), "thing 1".into())]),
            Value::None,
            Value::Float(1.5),
        ]);
        assert_eq!(
            value.to_literal().unwrap(),
            json!([{"bar": "thing 1"}, null, 1.5])
        );
    }

    #[test]
    fn to_literal_rejects_functions() {
        let value = Value::Sequence(vec![Value::Int(1), Callable::new("f", |_| true).into()]);
        assert_eq!(value.to_literal().unwrap_err(), "function");
    }

    #[test]
    fn to_int_accepts_numbers_only() {
        assert_eq!(Value::Int(3).to_int(), Some(3));
        assert_eq!(Value::Float(3.9).to_int(), Some(3));
        assert_eq!(Value::Float(f64::INFINITY).to_int(), None);
        assert_eq!(Value::from("3").to_int(), None);
    }

    #[test]
    fn attr_struct_lookup() {
        let obj = AttrStruct::new("struct").with("check", Callable::new("positive", |_| true));
        assert!(matches!(obj.attr("check"), Some(Value::Callable(_))));
        assert!(obj.attr("missing").is_none());
        assert_eq!(Value::object(obj).type_name(), "struct");
    }

    #[test]
    fn display_uses_runtime_repr() {
        assert_eq!(Value::tuple("a", 1i64).to_string(), "(\"a\", 1)");
        assert_eq!(Value::Tuple(vec![Value::Bool(true)]).to_string(), "(True,)");
        assert_eq!(Value::None.to_string(), "None");
    }

    #[test]
    fn callables_compare_by_identity() {
        let f = Callable::new("f", |_| true);
        let g = Callable::new("f", |_| true);
        assert_eq!(Value::from(f.clone()), Value::from(f.clone()));
        assert_ne!(Value::from(f), Value::from(g));
    }

    #[test]
    fn from_literal_roundtrips_shape() {
        let literal = json!({"a": [1, 2.5, "x"], "b": null});
        assert_eq!(Value::from_literal(&literal).to_literal().unwrap(), literal);
    }
}
