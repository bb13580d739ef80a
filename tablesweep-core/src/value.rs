/*!
Typed attribute values, rows, and key schemas.

The value model mirrors the store's typed-value encoding (the serde
representation is the familiar `{"S": "..."}` wire shape) while keeping the
core independent of any SDK type. Rows are attribute-name → value maps; the
subset named by a table's key schema is the row's identity.
*/

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};

/// A row: mapping from attribute name to typed value.
pub type Row = HashMap<String, AttrValue>;

/// A typed attribute value.
///
/// Covers the full value model of the backing store so that rows copied
/// during reconciliation round-trip without loss. Only the scalar tags
/// (`S`, `N`, `B`, `BOOL`) can be constructed from a wire type-tag and
/// literal; the rest appear only in rows read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrValue {
    /// String
    S(String),
    /// Number, kept as its decimal string representation
    N(String),
    /// Binary
    B(Vec<u8>),
    /// Boolean
    #[serde(rename = "BOOL")]
    Bool(bool),
    /// Null
    #[serde(rename = "NULL")]
    Null(bool),
    /// List
    L(Vec<AttrValue>),
    /// Map
    M(HashMap<String, AttrValue>),
    /// String set
    #[serde(rename = "SS")]
    Ss(Vec<String>),
    /// Number set
    #[serde(rename = "NS")]
    Ns(Vec<String>),
    /// Binary set
    #[serde(rename = "BS")]
    Bs(Vec<Vec<u8>>),
}

impl AttrValue {
    /// Construct a scalar value from a wire type-tag and literal.
    ///
    /// # Errors
    /// `MalformedRequest` if the tag is not one of `S`, `N`, `B`, `BOOL`,
    /// or if a `BOOL` literal is not `true`/`false`.
    pub fn from_tagged(tag: &str, literal: &str) -> Result<Self> {
        match tag {
            "S" => Ok(AttrValue::S(literal.to_string())),
            "N" => Ok(AttrValue::N(literal.to_string())),
            "B" => Ok(AttrValue::B(literal.as_bytes().to_vec())),
            "BOOL" => match literal.to_ascii_lowercase().as_str() {
                "true" => Ok(AttrValue::Bool(true)),
                "false" => Ok(AttrValue::Bool(false)),
                other => Err(SweepError::malformed(format!(
                    "invalid BOOL literal '{other}'"
                ))),
            },
            other => Err(SweepError::malformed(format!(
                "unknown attribute type tag '{other}' (expected S, N, B, or BOOL)"
            ))),
        }
    }
}

// Manual impl: map variants have no derivable hash. Map entries are hashed
// in key order so the hash agrees with the order-insensitive equality.
impl Hash for AttrValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            AttrValue::S(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            AttrValue::N(n) => {
                1u8.hash(state);
                n.hash(state);
            }
            AttrValue::B(b) => {
                2u8.hash(state);
                b.hash(state);
            }
            AttrValue::Bool(b) => {
                3u8.hash(state);
                b.hash(state);
            }
            AttrValue::Null(b) => {
                4u8.hash(state);
                b.hash(state);
            }
            AttrValue::L(items) => {
                5u8.hash(state);
                items.hash(state);
            }
            AttrValue::M(map) => {
                6u8.hash(state);
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_by_key(|(k, _)| k.as_str());
                for (k, v) in entries {
                    k.hash(state);
                    v.hash(state);
                }
            }
            AttrValue::Ss(items) => {
                7u8.hash(state);
                items.hash(state);
            }
            AttrValue::Ns(items) => {
                8u8.hash(state);
                items.hash(state);
            }
            AttrValue::Bs(items) => {
                9u8.hash(state);
                items.hash(state);
            }
        }
    }
}

/// The role a key attribute plays within a table's key schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyRole {
    Hash,
    Range,
}

/// A single key attribute definition (name + role).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyElement {
    pub name: String,
    pub role: KeyRole,
}

/// The ordered set of attributes that identify a row within a table.
///
/// Fetched once per table per operation and held immutable for the
/// operation's duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySchema {
    pub elements: Vec<KeyElement>,
}

impl KeySchema {
    pub fn new(elements: Vec<KeyElement>) -> Self {
        Self { elements }
    }

    /// A single hash-key schema, the common case.
    pub fn hash_key<S: Into<String>>(name: S) -> Self {
        Self {
            elements: vec![KeyElement {
                name: name.into(),
                role: KeyRole::Hash,
            }],
        }
    }

    /// Extract a row's identity: the sub-row holding exactly the key
    /// attributes. Returns `None` if the row is missing any of them.
    pub fn extract(&self, row: &Row) -> Option<Row> {
        let mut key = Row::with_capacity(self.elements.len());
        for element in &self.elements {
            let value = row.get(&element.name)?;
            key.insert(element.name.clone(), value.clone());
        }
        Some(key)
    }
}
