//! Graph entities and hydration.
//!
//! The same structure encoding carries protocol envelopes (SUCCESS, RECORD,
//! ...) and graph values embedded in record payloads. Hydration only rewrites
//! the latter: structures signed NODE or RELATIONSHIP become typed entities,
//! every other structure is left untouched.

use std::fmt;

use serde::Serialize;

use super::marker::{NODE_SIGNATURE, RELATIONSHIP_SIGNATURE};
use super::types::{fmt_properties, PackStreamMap, PackStreamStructure, PackStreamValue};
use super::PackStreamError;

/// A graph node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    /// Server-assigned identity, `<scope>/<number>` (e.g. `node/42`)
    pub identity: String,
    /// Node labels
    pub labels: Vec<String>,
    /// Node properties
    pub properties: PackStreamMap,
}

impl Node {
    /// Create a new node.
    pub fn new(identity: impl Into<String>, labels: Vec<String>, properties: PackStreamMap) -> Self {
        Self {
            identity: identity.into(),
            labels,
            properties,
        }
    }

    /// Numeric part of the identity, if it has one.
    pub fn id(&self) -> Option<i64> {
        identity_number(&self.identity)
    }

    /// Check whether the node carries a label.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Get a property value.
    pub fn get(&self, key: &str) -> Option<&PackStreamValue> {
        self.properties.get(key)
    }

    /// Structure form used on the wire.
    pub fn to_structure(&self) -> PackStreamStructure {
        PackStreamStructure::new(
            NODE_SIGNATURE,
            vec![
                PackStreamValue::String(self.identity.clone()),
                PackStreamValue::List(
                    self.labels
                        .iter()
                        .map(|s| PackStreamValue::String(s.clone()))
                        .collect(),
                ),
                PackStreamValue::Map(self.properties.clone()),
            ],
        )
    }

    /// Build a node from a NODE structure.
    pub fn from_structure(s: &PackStreamStructure) -> Result<Self, PackStreamError> {
        expect_shape(s, NODE_SIGNATURE, 3, "Node")?;

        let identity = text_field(&s.fields[0], "Node identity")?;
        let labels = s.fields[1]
            .as_list()
            .ok_or_else(|| PackStreamError::InvalidStructure("Node labels must be list".into()))?
            .iter()
            .map(|v| text_field(v, "Node label"))
            .collect::<Result<Vec<_>, _>>()?;
        let properties = map_field(s.fields[2].clone(), "Node properties")?;

        Ok(Self {
            identity,
            labels,
            properties,
        })
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", short_identity(&self.identity))?;
        for label in &self.labels {
            write!(f, ":{}", label)?;
        }
        if !self.properties.is_empty() {
            write!(f, " ")?;
            fmt_properties(f, &self.properties)?;
        }
        write!(f, ")")
    }
}

/// A graph relationship.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relationship {
    /// Server-assigned identity (e.g. `rel/7`)
    pub identity: String,
    /// Identity of the start node
    pub start: String,
    /// Identity of the end node
    pub end: String,
    /// Relationship type
    #[serde(rename = "type")]
    pub rel_type: String,
    /// Relationship properties
    pub properties: PackStreamMap,
}

impl Relationship {
    /// Create a new relationship.
    pub fn new(
        identity: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
        rel_type: impl Into<String>,
        properties: PackStreamMap,
    ) -> Self {
        Self {
            identity: identity.into(),
            start: start.into(),
            end: end.into(),
            rel_type: rel_type.into(),
            properties,
        }
    }

    /// Numeric part of the identity, if it has one.
    pub fn id(&self) -> Option<i64> {
        identity_number(&self.identity)
    }

    /// Get a property value.
    pub fn get(&self, key: &str) -> Option<&PackStreamValue> {
        self.properties.get(key)
    }

    /// Structure form used on the wire.
    pub fn to_structure(&self) -> PackStreamStructure {
        PackStreamStructure::new(
            RELATIONSHIP_SIGNATURE,
            vec![
                PackStreamValue::String(self.identity.clone()),
                PackStreamValue::String(self.start.clone()),
                PackStreamValue::String(self.end.clone()),
                PackStreamValue::String(self.rel_type.clone()),
                PackStreamValue::Map(self.properties.clone()),
            ],
        )
    }

    /// Build a relationship from a RELATIONSHIP structure.
    pub fn from_structure(s: &PackStreamStructure) -> Result<Self, PackStreamError> {
        expect_shape(s, RELATIONSHIP_SIGNATURE, 5, "Relationship")?;

        Ok(Self {
            identity: text_field(&s.fields[0], "Relationship identity")?,
            start: text_field(&s.fields[1], "Relationship start")?,
            end: text_field(&s.fields[2], "Relationship end")?,
            rel_type: text_field(&s.fields[3], "Relationship type")?,
            properties: map_field(s.fields[4].clone(), "Relationship properties")?,
        })
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})-[:{}", short_identity(&self.start), self.rel_type)?;
        if !self.properties.is_empty() {
            write!(f, " ")?;
            fmt_properties(f, &self.properties)?;
        }
        write!(f, "]->({})", short_identity(&self.end))
    }
}

/// Replace graph structures inside `value` with typed entities.
///
/// Lists and map values are walked recursively. Structures with other
/// signatures are returned unchanged, and so are values that were already
/// hydrated.
pub fn hydrate(value: PackStreamValue) -> Result<PackStreamValue, PackStreamError> {
    match value {
        PackStreamValue::List(items) => Ok(PackStreamValue::List(
            items.into_iter().map(hydrate).collect::<Result<_, _>>()?,
        )),
        PackStreamValue::Map(map) => Ok(PackStreamValue::Map(
            map.into_iter()
                .map(|(k, v)| hydrate(v).map(|v| (k, v)))
                .collect::<Result<_, _>>()?,
        )),
        PackStreamValue::Structure(s) => match s.signature {
            NODE_SIGNATURE => Ok(PackStreamValue::Node(Node::from_structure(&s)?)),
            RELATIONSHIP_SIGNATURE => {
                Ok(PackStreamValue::Relationship(Relationship::from_structure(&s)?))
            }
            _ => Ok(PackStreamValue::Structure(s)),
        },
        other => Ok(other),
    }
}

fn expect_shape(
    s: &PackStreamStructure,
    signature: u8,
    fields: usize,
    name: &str,
) -> Result<(), PackStreamError> {
    if s.signature != signature {
        return Err(PackStreamError::InvalidStructure(format!(
            "expected {} signature 0x{:02X}, got 0x{:02X}",
            name, signature, s.signature
        )));
    }
    if s.fields.len() != fields {
        return Err(PackStreamError::InvalidStructure(format!(
            "{} requires {} fields, got {}",
            name,
            fields,
            s.fields.len()
        )));
    }
    Ok(())
}

fn text_field(value: &PackStreamValue, what: &str) -> Result<String, PackStreamError> {
    value
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| PackStreamError::InvalidStructure(format!("{} must be text", what)))
}

fn map_field(value: PackStreamValue, what: &str) -> Result<PackStreamMap, PackStreamError> {
    match hydrate(value)? {
        PackStreamValue::Map(m) => Ok(m),
        _ => Err(PackStreamError::InvalidStructure(format!("{} must be map", what))),
    }
}

fn short_identity(identity: &str) -> &str {
    identity.split_once('/').map_or(identity, |(_, n)| n)
}

fn identity_number(identity: &str) -> Option<i64> {
    short_identity(identity).parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(entries: &[(&str, PackStreamValue)]) -> PackStreamMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn node_structure() -> PackStreamValue {
        Node::new(
            "node/42",
            vec!["Person".into(), "Admin".into()],
            props(&[("name", "Alice".into())]),
        )
        .to_structure()
        .into()
    }

    #[test]
    fn test_hydrate_node() {
        let hydrated = hydrate(node_structure()).unwrap();
        let node = hydrated.as_node().unwrap();
        assert_eq!(node.identity, "node/42");
        assert_eq!(node.id(), Some(42));
        assert!(node.has_label("Admin"));
        assert_eq!(node.get("name").unwrap().as_str(), Some("Alice"));
    }

    #[test]
    fn test_hydrate_relationship() {
        let rel = Relationship::new("rel/7", "node/1", "node/2", "KNOWS", PackStreamMap::new());
        let hydrated = hydrate(rel.to_structure().into()).unwrap();
        assert_eq!(hydrated, PackStreamValue::Relationship(rel));
    }

    #[test]
    fn test_hydrate_walks_lists_and_maps() {
        let mut map = PackStreamMap::new();
        map.insert("n".to_string(), node_structure());
        let value = PackStreamValue::List(vec![
            PackStreamValue::Integer(1),
            PackStreamValue::List(vec![node_structure()]),
            PackStreamValue::Map(map),
        ]);

        let hydrated = hydrate(value).unwrap();
        let items = hydrated.as_list().unwrap();
        assert_eq!(items[0], PackStreamValue::Integer(1));
        assert!(items[1].as_list().unwrap()[0].as_node().is_some());
        assert!(items[2].as_map().unwrap()["n"].as_node().is_some());
    }

    #[test]
    fn test_hydrate_leaves_other_structures() {
        let envelope = PackStreamValue::Structure(PackStreamStructure::new(
            0x70,
            vec![PackStreamValue::Map(PackStreamMap::new())],
        ));
        assert_eq!(hydrate(envelope.clone()).unwrap(), envelope);
    }

    #[test]
    fn test_hydrate_is_idempotent() {
        let once = hydrate(PackStreamValue::List(vec![node_structure()])).unwrap();
        let twice = hydrate(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_hydrate_rejects_malformed_node() {
        let bad = PackStreamStructure::new(NODE_SIGNATURE, vec![PackStreamValue::Integer(1)]);
        let err = hydrate(bad.into()).unwrap_err();
        assert!(matches!(err, PackStreamError::InvalidStructure(_)));

        let bad = PackStreamStructure::new(
            NODE_SIGNATURE,
            vec![
                PackStreamValue::Integer(1),
                PackStreamValue::List(vec![]),
                PackStreamValue::Map(PackStreamMap::new()),
            ],
        );
        assert!(hydrate(bad.into()).is_err());
    }

    #[test]
    fn test_node_display() {
        let node = Node::new(
            "node/42",
            vec!["Person".into()],
            props(&[("age", 30.into()), ("name", "Alice".into())]),
        );
        assert_eq!(node.to_string(), r#"(42:Person {age:30,name:"Alice"})"#);

        let bare = Node::new("node/1", vec![], PackStreamMap::new());
        assert_eq!(bare.to_string(), "(1)");
    }

    #[test]
    fn test_relationship_display() {
        let rel = Relationship::new(
            "rel/9",
            "node/1",
            "node/2",
            "KNOWS",
            props(&[("since", 1999.into())]),
        );
        assert_eq!(rel.to_string(), "(1)-[:KNOWS {since:1999}]->(2)");
    }

    #[test]
    fn test_serialize_node() {
        let node = Node::new("node/3", vec!["A".into()], PackStreamMap::new());
        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(json, r#"{"identity":"node/3","labels":["A"],"properties":{}}"#);
    }
}
