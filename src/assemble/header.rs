//! Header map builder.

use std::collections::btree_map;

use super::State;
use crate::error::{Error, Result};
use crate::jose::Header;
use crate::node::Node;

/// Stores the finished map in the parent structure.
type Commit<'a> = Box<dyn FnOnce(Node) -> Result<()> + 'a>;

/// Builds the string-keyed map held by a `header` or `unprotected` field.
///
/// Values are arbitrary [`Node`]s. The map is committed to the parent field
/// by [`HeaderAssembler::finish`], which also returns the parent to
/// [`State::Initial`].
pub struct HeaderAssembler<'a> {
    field: &'static str,
    entries: Header,
    commit: Commit<'a>,
    state: &'a mut State,
}

impl<'a> HeaderAssembler<'a> {
    pub(super) fn new(field: &'static str, commit: Commit<'a>, state: &'a mut State) -> Self {
        Self {
            field,
            entries: Header::new(),
            commit,
            state,
        }
    }

    /// Add an entry to the map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RepeatedField`] if `key` is already present.
    pub fn insert(&mut self, key: impl Into<String>, value: Node) -> Result<()> {
        match self.entries.entry(key.into()) {
            btree_map::Entry::Occupied(entry) => {
                Err(Error::RepeatedField(format!("{}.{}", self.field, entry.key())))
            }
            btree_map::Entry::Vacant(entry) => {
                entry.insert(value);
                Ok(())
            }
        }
    }

    /// Store the map in the parent field.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the parent field's setter.
    pub fn finish(self) -> Result<()> {
        let Self {
            entries,
            commit,
            state,
            ..
        } = self;
        commit(Node::Map(entries))?;
        *state = State::Initial;
        Ok(())
    }
}
