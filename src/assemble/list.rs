//! List builders for signature and recipient sequences.

use super::{Assembler, MapAssembler, State};
use crate::error::Result;
use crate::node::Node;
use crate::schema::Schema;

/// A growable sequence of schema entries.
pub trait Entries {
    /// Reserve capacity for at least `additional` more entries.
    fn reserve(&mut self, additional: usize);

    /// Append a default entry and return an assembler bound to it.
    ///
    /// The entry is appended before the assembler is created, so the
    /// assembler never observes the sequence reallocating underneath it.
    /// `done` is set once the entry assembler finishes successfully.
    fn assemble_entry<'s>(&'s mut self, done: &'s mut bool) -> Box<dyn MapAssembler + 's>;
}

impl<S: Schema> Entries for Vec<S> {
    fn reserve(&mut self, additional: usize) {
        Self::reserve(self, additional);
    }

    fn assemble_entry<'s>(&'s mut self, done: &'s mut bool) -> Box<dyn MapAssembler + 's> {
        self.push(S::default());
        let index = self.len() - 1;
        Box::new(Assembler::entry(self, index, done))
    }
}

/// Assembles the entries of a `signatures` or `recipients` list.
///
/// Only one entry assembler is live at a time. Each must be finished before
/// the next entry starts and before the list itself finishes.
///
/// # Panics
///
/// [`ListAssembler::assemble_value`] and [`ListAssembler::finish`] panic if
/// the previous entry assembler was dropped without finishing.
pub struct ListAssembler<'a> {
    entries: &'a mut dyn Entries,
    state: &'a mut State,
    done: bool,
}

impl<'a> ListAssembler<'a> {
    pub(super) fn new(entries: &'a mut dyn Entries, state: &'a mut State) -> Self {
        Self {
            entries,
            state,
            done: true,
        }
    }

    /// Start the next entry.
    pub fn assemble_value(&mut self) -> Box<dyn MapAssembler + '_> {
        assert!(self.done, "list: assemble_value called before the previous entry finished");
        self.done = false;
        self.entries.assemble_entry(&mut self.done)
    }

    /// Assemble the next entry from an already-built map.
    ///
    /// # Errors
    ///
    /// Returns any error raised while assembling the entry.
    pub fn assign_node(&mut self, node: Node) -> Result<()> {
        self.assemble_value().assign_map(node)
    }

    /// Complete the list, returning the parent to [`State::Initial`].
    pub fn finish(self) {
        assert!(self.done, "list: finish called with an unfinished entry");
        *self.state = State::Initial;
    }
}
