//! Attribute value types
//!
//! This module defines:
//! - Value: unified enum for every attribute a restored object can hold
//! - AttrMap: the "raw state" attribute map transform functions operate on
//! - ObjectRef: shared handle to a restored sibling object
//!
//! ## Value Model
//!
//! The enum mirrors what the underlying byte stream can express: primitive
//! scalars, ordered sequences, key/value maps, plus `Object` — a reference to
//! another restored instance in the same stream. Back-references (shared and
//! cyclic sub-objects) all collapse to `Object` by the time transform
//! functions or `apply_state` see the map.
//!
//! ## Type Equality
//!
//! Different variants are never equal (`Int(1) != Float(1.0)`), floats follow
//! IEEE-754 (`NaN != NaN`), and `Object` values compare by handle identity,
//! not by contents — two references are equal iff they point at the same
//! restored instance.

use crate::traits::Restorable;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a restored object
///
/// Restoration is single-threaded by contract, so object handles are `Rc`,
/// not `Arc`; interior mutability is needed because initializer coroutines
/// mutate objects after construction.
pub type ObjectRef = Rc<RefCell<dyn Restorable>>;

/// Raw state of an object under restoration: attribute name to value
pub type AttrMap = HashMap<String, Value>;

/// Unified attribute value
#[derive(Clone)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// UTF-8 string
    Str(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Ordered sequence of values
    List(Vec<Value>),
    /// String-keyed map of values
    Map(HashMap<String, Value>),
    /// Reference to a restored sibling object
    Object(ObjectRef),
}

impl Value {
    /// Get the variant name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Str(_) => "Str",
            Value::Bytes(_) => "Bytes",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Object(_) => "Object",
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the boolean if this is a `Bool`
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the integer if this is an `Int`
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the float if this is a `Float`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get the string slice if this is a `Str`
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the list if this is a `List`
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get the map if this is a `Map`
    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Get the object handle if this is an `Object`
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            // IEEE-754: NaN != NaN, -0.0 == 0.0
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
            }
            // Handle identity, not structural equality
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            // Different variants are never equal
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Map(m) => f.debug_tuple("Map").field(m).finish(),
            // Objects may be mid-mutation when printed from an initializer
            Value::Object(o) => match o.try_borrow() {
                Ok(obj) => write!(f, "Object({})", obj.class_key()),
                Err(_) => f.write_str("Object(<borrowed>)"),
            },
        }
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
    fn from(f: f64) -> Self {
        Value::Float(f)
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

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::key::ClassKey;
    use std::any::Any;

    struct Dummy;

    impl Restorable for Dummy {
        fn class_key(&self) -> ClassKey {
            ClassKey::new("test", "Dummy")
        }

        fn apply_state(&mut self, _state: AttrMap) -> Result<()> {
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_different_variants_never_equal() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Bytes(b"hi".to_vec()), Value::Str("hi".into()));
        assert_ne!(Value::Null, Value::Bool(false));
    }

    #[test]
    fn test_float_ieee754_equality() {
        assert_ne!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_eq!(Value::Float(-0.0), Value::Float(0.0));
    }

    #[test]
    fn test_object_equality_is_identity() {
        let a: ObjectRef = Rc::new(RefCell::new(Dummy));
        let b: ObjectRef = Rc::new(RefCell::new(Dummy));
        assert_eq!(Value::Object(a.clone()), Value::Object(a.clone()));
        assert_ne!(Value::Object(a), Value::Object(b));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Int(7).as_i64(), Some(7));
        assert_eq!(Value::Str("x".into()).as_str(), Some("x"));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int(7).as_str(), None);
        assert!(Value::Null.is_null());
    }

    #[test]
    fn test_debug_names_object_class() {
        let a: ObjectRef = Rc::new(RefCell::new(Dummy));
        let printed = format!("{:?}", Value::Object(a));
        assert!(printed.contains("test.Dummy"));
    }
}
