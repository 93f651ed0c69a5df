//! Ordered frontmatter fields attached to a planned page.
//!
//! Frontmatter is kept as an association list so that serialization order is
//! the insertion order, independent of hashing.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A loosely-typed frontmatter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrontmatterValue {
    /// `true` / `false`.
    Bool(bool),
    /// Any JSON number.
    Number(f64),
    /// Text.
    String(String),
    /// Nested list of values.
    List(Vec<FrontmatterValue>),
}

impl FrontmatterValue {
    /// Converts a JSON value. Nulls are dropped and objects are kept as their
    /// JSON text.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number),
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            serde_json::Value::Array(items) => Some(Self::List(items.iter().filter_map(Self::from_json).collect())),
            serde_json::Value::Object(_) => Some(Self::String(value.to_string())),
        }
    }

    /// The value as text, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FrontmatterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for FrontmatterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FrontmatterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for FrontmatterValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for FrontmatterValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// Ordered key/value frontmatter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter(Vec<(String, FrontmatterValue)>);

impl Frontmatter {
    /// Creates empty frontmatter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, replacing an existing value in place or appending.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FrontmatterValue>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Looks up `key`.
    pub fn get(&self, key: &str) -> Option<&FrontmatterValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FrontmatterValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Builds frontmatter from a JSON object, keeping the object's order.
    pub fn from_json_object(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut frontmatter = Self::new();
        for (key, value) in object {
            if let Some(value) = FrontmatterValue::from_json(value) {
                frontmatter.insert(key.clone(), value);
            }
        }
        frontmatter
    }
}

impl Serialize for Frontmatter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Frontmatter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FrontmatterVisitor;

        impl<'de> Visitor<'de> for FrontmatterVisitor {
            type Value = Frontmatter;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of frontmatter fields")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut frontmatter = Frontmatter::new();
                while let Some((key, value)) = access.next_entry::<String, FrontmatterValue>()? {
                    frontmatter.insert(key, value);
                }
                Ok(frontmatter)
            }
        }

        deserializer.deserialize_map(FrontmatterVisitor)
    }
}
