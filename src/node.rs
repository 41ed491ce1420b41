//! # Generic Data Model
//!
//! A format-agnostic tree of maps, lists, scalars, byte strings, and
//! content-address links. It sits between the wire formats (CBOR, JSON) and
//! the typed JOSE object: decoders produce it, the assembler consumes it, and
//! the view produces it again for encoding.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use cid::Cid;

use crate::error::{Error, Result};

/// A generic tree value.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// Explicit null.
    Null,

    /// Boolean value.
    Bool(bool),

    /// Integer value. Wide enough for both signed and unsigned 64-bit input.
    Integer(i128),

    /// Floating point value.
    Float(f64),

    /// UTF-8 string.
    String(String),

    /// Opaque byte string.
    Bytes(Vec<u8>),

    /// Ordered list of values.
    List(Vec<Node>),

    /// String-keyed map.
    Map(BTreeMap<String, Node>),

    /// Content-address link.
    Link(Cid),
}

/// The kind of a [`Node`], used when reporting type mismatches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    /// [`Node::Null`]
    Null,
    /// [`Node::Bool`]
    Bool,
    /// [`Node::Integer`]
    Integer,
    /// [`Node::Float`]
    Float,
    /// [`Node::String`]
    String,
    /// [`Node::Bytes`]
    Bytes,
    /// [`Node::List`]
    List,
    /// [`Node::Map`]
    Map,
    /// [`Node::Link`]
    Link,
}

impl Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::List => "list",
            Self::Map => "map",
            Self::Link => "link",
        };
        write!(f, "{name}")
    }
}

impl Node {
    /// The kind of this node.
    #[must_use]
    pub const fn kind(&self) -> Kind {
        match self {
            Self::Null => Kind::Null,
            Self::Bool(_) => Kind::Bool,
            Self::Integer(_) => Kind::Integer,
            Self::Float(_) => Kind::Float,
            Self::String(_) => Kind::String,
            Self::Bytes(_) => Kind::Bytes,
            Self::List(_) => Kind::List,
            Self::Map(_) => Kind::Map,
            Self::Link(_) => Kind::Link,
        }
    }

    /// Returns `true` if the node is [`Node::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Look up `key` in a map node.
    ///
    /// A missing key is `Ok(None)`: absence is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongKind`] if the node is not a map.
    pub fn lookup(&self, key: &str) -> Result<Option<&Self>> {
        match self {
            Self::Map(entries) => Ok(entries.get(key)),
            other => Err(Error::wrong_kind(key, Kind::Map, other.kind())),
        }
    }

    /// The bytes held by a [`Node::Bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongKind`], naming `field`, for any other kind.
    pub fn as_bytes(&self, field: &str) -> Result<&[u8]> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            other => Err(Error::wrong_kind(field, Kind::Bytes, other.kind())),
        }
    }
}

impl From<Vec<u8>> for Node {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Node {
    fn from(n: i64) -> Self {
        Self::Integer(i128::from(n))
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Cid> for Node {
    fn from(cid: Cid) -> Self {
        Self::Link(cid)
    }
}

impl From<BTreeMap<String, Self>> for Node {
    fn from(entries: BTreeMap<String, Self>) -> Self {
        Self::Map(entries)
    }
}
