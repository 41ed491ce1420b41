//! # Schema Field Tables
//!
//! Every keyed structure the assembler builds (the top-level JOSE object, a
//! signature, a recipient) is described by a static table of [`Field`]s. The
//! table maps a key to the kind of value it admits and the function that
//! stores that value, so a single state machine validates all of them.

use crate::assemble::Entries;
use crate::error::{Error, Result};
use crate::jose::Header;
use crate::node::{Kind, Node};

/// A keyed structure that can be built by the assembler.
pub trait Schema: Default + 'static {
    /// Type name used in error messages.
    const NAME: &'static str;

    /// The closed set of keys the structure accepts.
    const FIELDS: &'static [Field<Self>];

    /// Keys that must be present when assembly finishes.
    const REQUIRED: &'static [&'static str] = &[];

    /// Cross-field checks run once every key has been assembled.
    ///
    /// # Errors
    ///
    /// Returns an error when the combination of present fields is invalid.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Position of `key` in the field table.
    #[must_use]
    fn position(key: &str) -> Option<usize> {
        Self::FIELDS.iter().position(|f| f.name == key)
    }
}

/// One entry in a schema's field table.
pub struct Field<S> {
    pub(crate) name: &'static str,
    pub(crate) kind: Kind,
    pub(crate) setter: Setter<S>,
    pub(crate) clear: fn(&mut S),
}

/// How a field stores its value.
pub(crate) enum Setter<S> {
    /// A scalar, byte or map value, coerced and stored in one step.
    Value(fn(&mut S, Node) -> Result<()>),

    /// A sequence of nested entries. Returns the sequence, creating it if
    /// absent.
    List(fn(&mut S) -> &mut dyn Entries),
}

impl<S> Field<S> {
    /// The field's key.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The kind of value the field admits.
    #[must_use]
    pub const fn kind(&self) -> Kind {
        self.kind
    }
}

/// Take the bytes out of `node`, naming `field` on failure.
pub(crate) fn bytes(field: &str, node: Node) -> Result<Vec<u8>> {
    match node {
        Node::Bytes(bytes) => Ok(bytes),
        other => Err(Error::wrong_kind(field, Kind::Bytes, other.kind())),
    }
}

/// Take the map out of `node`, naming `field` on failure.
pub(crate) fn header(field: &str, node: Node) -> Result<Header> {
    match node {
        Node::Map(entries) => Ok(entries),
        other => Err(Error::wrong_kind(field, Kind::Map, other.kind())),
    }
}
