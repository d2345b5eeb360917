//! PackStream value types.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::structures::{Node, Relationship};

/// String-keyed map of values.
///
/// Entry order carries no meaning in the protocol; a sorted map keeps the
/// encoded bytes deterministic.
pub type PackStreamMap = BTreeMap<String, PackStreamValue>;

/// A PackStream value that can be serialized/deserialized.
///
/// `Node` and `Relationship` never come straight off the wire: the decoder
/// yields `Structure`, and hydration turns graph signatures into the typed
/// variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PackStreamValue {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point
    Float(f64),
    /// UTF-8 text
    String(String),
    /// List of values
    List(Vec<PackStreamValue>),
    /// Map of string keys to values
    Map(PackStreamMap),
    /// Structure (signature + fields)
    Structure(PackStreamStructure),
    /// Hydrated graph node
    Node(Node),
    /// Hydrated graph relationship
    Relationship(Relationship),
}

/// A PackStream structure with a signature byte and fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackStreamStructure {
    /// Signature byte (identifies the message or entity kind)
    pub signature: u8,
    /// Structure fields
    pub fields: Vec<PackStreamValue>,
}

impl PackStreamStructure {
    /// Create a new structure with given signature and fields.
    pub fn new(signature: u8, fields: Vec<PackStreamValue>) -> Self {
        Self { signature, fields }
    }

    /// Get the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the structure has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl PackStreamValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, PackStreamValue::Null)
    }

    /// Try to get as boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PackStreamValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PackStreamValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            PackStreamValue::Float(f) => Some(*f),
            PackStreamValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PackStreamValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as list reference.
    pub fn as_list(&self) -> Option<&[PackStreamValue]> {
        match self {
            PackStreamValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Try to get as map reference.
    pub fn as_map(&self) -> Option<&PackStreamMap> {
        match self {
            PackStreamValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Try to get as structure reference.
    pub fn as_structure(&self) -> Option<&PackStreamStructure> {
        match self {
            PackStreamValue::Structure(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as node reference.
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            PackStreamValue::Node(n) => Some(n),
            _ => None,
        }
    }

    /// Try to get as relationship reference.
    pub fn as_relationship(&self) -> Option<&Relationship> {
        match self {
            PackStreamValue::Relationship(r) => Some(r),
            _ => None,
        }
    }

    /// Get the type name for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            PackStreamValue::Null => "Null",
            PackStreamValue::Boolean(_) => "Boolean",
            PackStreamValue::Integer(_) => "Integer",
            PackStreamValue::Float(_) => "Float",
            PackStreamValue::String(_) => "String",
            PackStreamValue::List(_) => "List",
            PackStreamValue::Map(_) => "Map",
            PackStreamValue::Structure(_) => "Structure",
            PackStreamValue::Node(_) => "Node",
            PackStreamValue::Relationship(_) => "Relationship",
        }
    }
}

/// Writes `{key:value,...}` the way node and relationship properties are rendered.
pub(crate) fn fmt_properties(f: &mut fmt::Formatter<'_>, map: &PackStreamMap) -> fmt::Result {
    write!(f, "{{")?;
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{}:{}", key, value)?;
    }
    write!(f, "}}")
}

impl fmt::Display for PackStreamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackStreamValue::Null => write!(f, "null"),
            PackStreamValue::Boolean(b) => write!(f, "{}", b),
            PackStreamValue::Integer(i) => write!(f, "{}", i),
            PackStreamValue::Float(v) => write!(f, "{}", v),
            PackStreamValue::String(s) => write!(f, "{:?}", s),
            PackStreamValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            PackStreamValue::Map(map) => fmt_properties(f, map),
            PackStreamValue::Structure(s) => {
                write!(f, "Structure<0x{:02X}>", s.signature)?;
                write!(f, "(")?;
                for (i, field) in s.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", field)?;
                }
                write!(f, ")")
            }
            PackStreamValue::Node(n) => write!(f, "{}", n),
            PackStreamValue::Relationship(r) => write!(f, "{}", r),
        }
    }
}

// Conversion traits
impl From<bool> for PackStreamValue {
    fn from(v: bool) -> Self {
        PackStreamValue::Boolean(v)
    }
}

impl From<i64> for PackStreamValue {
    fn from(v: i64) -> Self {
        PackStreamValue::Integer(v)
    }
}

impl From<i32> for PackStreamValue {
    fn from(v: i32) -> Self {
        PackStreamValue::Integer(v as i64)
    }
}

impl From<f64> for PackStreamValue {
    fn from(v: f64) -> Self {
        PackStreamValue::Float(v)
    }
}

impl From<String> for PackStreamValue {
    fn from(v: String) -> Self {
        PackStreamValue::String(v)
    }
}

impl From<&str> for PackStreamValue {
    fn from(v: &str) -> Self {
        PackStreamValue::String(v.to_string())
    }
}

impl From<Vec<PackStreamValue>> for PackStreamValue {
    fn from(v: Vec<PackStreamValue>) -> Self {
        PackStreamValue::List(v)
    }
}

impl From<PackStreamMap> for PackStreamValue {
    fn from(v: PackStreamMap) -> Self {
        PackStreamValue::Map(v)
    }
}

impl From<PackStreamStructure> for PackStreamValue {
    fn from(v: PackStreamStructure) -> Self {
        PackStreamValue::Structure(v)
    }
}

impl From<Node> for PackStreamValue {
    fn from(v: Node) -> Self {
        PackStreamValue::Node(v)
    }
}

impl From<Relationship> for PackStreamValue {
    fn from(v: Relationship) -> Self {
        PackStreamValue::Relationship(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null() {
        let v = PackStreamValue::Null;
        assert!(v.is_null());
        assert_eq!(v.type_name(), "Null");
    }

    #[test]
    fn test_integer() {
        let v = PackStreamValue::Integer(42);
        assert_eq!(v.as_int(), Some(42));
        assert_eq!(v.as_float(), Some(42.0));
        assert_eq!(v.as_str(), None);
    }

    #[test]
    fn test_map() {
        let mut map = PackStreamMap::new();
        map.insert("key".to_string(), PackStreamValue::Integer(42));
        let v = PackStreamValue::Map(map);
        assert_eq!(v.as_map().unwrap().get("key").unwrap().as_int(), Some(42));
    }

    #[test]
    fn test_structure() {
        let s = PackStreamStructure::new(0x4E, vec![PackStreamValue::Integer(1)]);
        assert_eq!(s.signature, 0x4E);
        assert_eq!(s.len(), 1);
        assert!(!s.is_empty());
        assert!(PackStreamValue::Structure(s).as_structure().is_some());
    }

    #[test]
    fn test_display() {
        let mut map = PackStreamMap::new();
        map.insert("b".to_string(), PackStreamValue::from("x"));
        map.insert("a".to_string(), PackStreamValue::List(vec![1.into(), PackStreamValue::Null]));
        assert_eq!(PackStreamValue::Map(map).to_string(), r#"{a:[1,null],b:"x"}"#);

        let s = PackStreamStructure::new(0x70, vec![true.into()]);
        assert_eq!(PackStreamValue::Structure(s).to_string(), "Structure<0x70>(true)");
    }

    #[test]
    fn test_serialize_untagged() {
        let mut map = PackStreamMap::new();
        map.insert("n".to_string(), PackStreamValue::Integer(1));
        map.insert("s".to_string(), PackStreamValue::from("hi"));
        map.insert("z".to_string(), PackStreamValue::Null);
        let json = serde_json::to_string(&PackStreamValue::Map(map)).unwrap();
        assert_eq!(json, r#"{"n":1,"s":"hi","z":null}"#);
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(PackStreamValue::from(true), PackStreamValue::Boolean(true));
        assert_eq!(PackStreamValue::from(7i32), PackStreamValue::Integer(7));
        assert_eq!(PackStreamValue::from(2.5f64), PackStreamValue::Float(2.5));
        assert_eq!(PackStreamValue::from("x"), PackStreamValue::String("x".into()));
    }
}
