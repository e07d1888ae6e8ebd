use std::fmt;

use serde::{Deserialize, Serialize};

/// Type of an application attribute.
///
/// When attributes are written to the registry, their type determines the
/// type of registry value that is written.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    #[default]
    None,
    String,
    Expand,
    Uint32,
}

impl AttributeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::String => "string",
            Self::Expand => "expand",
            Self::Uint32 => "uint32",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An application attribute that can be recorded in the registry.
///
/// `data` always holds the textual form of the value; numeric attributes
/// carry their base-10 representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AttributeValue {
    pub name: String,
    pub data: String,
    #[serde(rename = "type", default)]
    pub kind: AttributeType,
}

impl AttributeValue {
    pub fn new(name: impl Into<String>, data: impl Into<String>, kind: AttributeType) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            kind,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.data)
    }
}

/// Parses the decimal text of a `uint32` attribute.
///
/// Only ASCII digits are accepted: signs, surrounding whitespace and the empty
/// string are rejected, as are values above `u32::MAX`.
pub fn parse_decimal_u32(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// An ordered list of application attributes.
///
/// Names are not required to be unique; lookups return the first match.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AttributeList(Vec<AttributeValue>);

impl AttributeList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Returns the first attribute with the given name, if present.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0.iter().find(|attr| attr.name == name)
    }

    /// Returns the data of the first attribute with the given name, or an
    /// empty string when no such attribute exists.
    ///
    /// An absent attribute and an attribute with empty data look the same
    /// here; use [`AttributeList::get`] to tell them apart.
    pub fn get_string(&self, name: &str) -> &str {
        self.get(name).map(|attr| attr.data.as_str()).unwrap_or("")
    }

    pub fn push(&mut self, value: AttributeValue) {
        self.0.push(value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AttributeValue> {
        self.0.iter()
    }
}

impl From<Vec<AttributeValue>> for AttributeList {
    fn from(value: Vec<AttributeValue>) -> Self {
        Self(value)
    }
}

impl FromIterator<AttributeValue> for AttributeList {
    fn from_iter<I: IntoIterator<Item = AttributeValue>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for AttributeList {
    type Item = AttributeValue;
    type IntoIter = std::vec::IntoIter<AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a AttributeList {
    type Item = &'a AttributeValue;
    type IntoIter = std::slice::Iter<'a, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
