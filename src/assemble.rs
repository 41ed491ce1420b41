//! # Assembler
//!
//! Builds a keyed structure from a stream of key/value events. The same
//! state machine serves every [`Schema`]: the top-level JOSE object, each
//! signature, and each recipient.
//!
//! The event protocol is:
//!
//! ```text
//! Initial --assemble_key--> MidKey --assign_key--> ExpectValue
//!     ^                                                |
//!     |                                          assemble_value
//!     |                                                v
//!     +--- assign_* / ListAssembler::finish /------ MidValue
//!          HeaderAssembler::finish
//!
//! Initial --finish--> Finished
//! ```
//!
//! Calling a method in the wrong state is a bug in the driving decoder and
//! panics. Bad input data (unknown keys, wrong kinds, invalid CIDs) is
//! reported through [`Result`].

mod header;
mod list;

pub use self::header::HeaderAssembler;
pub use self::list::{Entries, ListAssembler};
use crate::error::{Error, Result};
use crate::node::{Kind, Node};
use crate::schema::{Field, Schema, Setter};

/// Assembler states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// Expecting a key, or the end of the map.
    Initial,

    /// A key is being assembled.
    MidKey,

    /// A key has been accepted; the only valid call is `assemble_value`.
    ExpectValue,

    /// A value is being assembled.
    MidValue,

    /// Assembly is complete.
    Finished,
}

/// The key/value event protocol for building a map-shaped structure.
///
/// # Panics
///
/// Every method panics when called in a state the protocol does not allow.
pub trait MapAssembler {
    /// Name of the structure being assembled, for error messages.
    fn type_name(&self) -> &'static str;

    /// Start a new key. Valid in [`State::Initial`].
    fn assemble_key(&mut self);

    /// Resolve the key started by [`MapAssembler::assemble_key`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchField`] for a key outside the schema and
    /// [`Error::RepeatedField`] for a key already assembled.
    fn assign_key(&mut self, key: &str) -> Result<()>;

    /// Start the value for the resolved key. Valid in [`State::ExpectValue`].
    fn assemble_value(&mut self);

    /// Assign a complete value to the current key. [`Node::Null`] clears the
    /// field to absent.
    ///
    /// # Errors
    ///
    /// Returns an error when the value's kind does not fit the field or the
    /// value fails the field's coercion.
    fn assign_node(&mut self, value: Node) -> Result<()>;

    /// Start a list value for the current key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongKind`] if the field does not hold a list.
    fn begin_list(&mut self, size_hint: usize) -> Result<ListAssembler<'_>>;

    /// Start a map value for the current key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongKind`] if the field does not hold a map.
    fn begin_map(&mut self, size_hint: usize) -> Result<HeaderAssembler<'_>>;

    /// Complete assembly. Valid in [`State::Initial`].
    ///
    /// # Errors
    ///
    /// Returns an error if a mandatory field is missing or the assembled
    /// fields are inconsistent.
    fn finish(&mut self) -> Result<()>;

    /// Assign null to the current key, clearing the field.
    ///
    /// # Errors
    ///
    /// Never fails for a resolved key; see [`MapAssembler::assign_node`].
    fn assign_null(&mut self) -> Result<()> {
        self.assign_node(Node::Null)
    }

    /// Assign a byte string to the current key.
    ///
    /// # Errors
    ///
    /// See [`MapAssembler::assign_node`].
    fn assign_bytes(&mut self, bytes: Vec<u8>) -> Result<()> {
        self.assign_node(Node::Bytes(bytes))
    }

    /// Assign a string to the current key.
    ///
    /// # Errors
    ///
    /// See [`MapAssembler::assign_node`].
    fn assign_string(&mut self, value: String) -> Result<()> {
        self.assign_node(Node::String(value))
    }

    /// `assemble_key`, `assign_key`, and `assemble_value` in one call.
    ///
    /// # Errors
    ///
    /// See [`MapAssembler::assign_key`].
    fn assemble_entry(&mut self, key: &str) -> Result<()> {
        self.assemble_key();
        self.assign_key(key)?;
        self.assemble_value();
        Ok(())
    }

    /// Assemble from an already-built tree, then finish.
    ///
    /// Entries are re-emitted through the key/value protocol in the order the
    /// map provides, so pre-built and streamed input share one validation
    /// path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongKind`] if `node` is not a map, or any error
    /// raised while assembling its entries.
    fn assign_map(&mut self, node: Node) -> Result<()> {
        let kind = node.kind();
        let Node::Map(entries) = node else {
            return Err(Error::wrong_kind(self.type_name(), Kind::Map, kind));
        };
        for (key, value) in entries {
            self.assemble_entry(&key)?;
            self.assign_node(value)?;
        }
        self.finish()
    }
}

/// Resolves the structure an [`Assembler`] writes into.
pub trait Slot<S> {
    /// The live target.
    fn resolve(&mut self) -> &mut S;

    /// Called once the target has been assembled and validated.
    fn finished(&mut self) {}
}

/// The assembler owns its target.
#[derive(Debug, Default)]
pub struct Owned<S>(S);

impl<S> Slot<S> for Owned<S> {
    fn resolve(&mut self) -> &mut S {
        &mut self.0
    }
}

/// The target is an element of a sequence owned elsewhere, addressed by
/// index and resolved only when written.
#[derive(Debug)]
pub struct Entry<'a, S> {
    entries: &'a mut Vec<S>,
    index: usize,
    done: &'a mut bool,
}

impl<S> Slot<S> for Entry<'_, S> {
    fn resolve(&mut self) -> &mut S {
        &mut self.entries[self.index]
    }

    fn finished(&mut self) {
        *self.done = true;
    }
}

/// Schema-validating assembler for one keyed structure.
#[derive(Debug)]
pub struct Assembler<S, T> {
    slot: T,
    state: State,
    field: Option<usize>,
    seen: u64,
    present: u64,
    _schema: std::marker::PhantomData<S>,
}

impl<S: Schema> Assembler<S, Owned<S>> {
    /// An assembler that builds a new, owned `S`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_slot(Owned(S::default()))
    }

    /// The assembled structure.
    ///
    /// # Panics
    ///
    /// Panics if assembly has not finished.
    #[must_use]
    pub fn into_inner(self) -> S {
        assert!(
            self.state == State::Finished,
            "{}: into_inner called in state {:?}",
            S::NAME,
            self.state
        );
        self.slot.0
    }
}

impl<S: Schema> Default for Assembler<S, Owned<S>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, S: Schema> Assembler<S, Entry<'a, S>> {
    /// An assembler writing into `entries[index]`, setting `done` when it
    /// finishes.
    pub(crate) fn entry(entries: &'a mut Vec<S>, index: usize, done: &'a mut bool) -> Self {
        Self::with_slot(Entry {
            entries,
            index,
            done,
        })
    }
}

impl<S: Schema, T: Slot<S>> Assembler<S, T> {
    fn with_slot(slot: T) -> Self {
        debug_assert!(S::FIELDS.len() <= 64, "field table too large");
        Self {
            slot,
            state: State::Initial,
            field: None,
            seen: 0,
            present: 0,
            _schema: std::marker::PhantomData,
        }
    }

    /// The current protocol state.
    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    fn expect_state(&self, expected: State, op: &str) {
        assert!(
            self.state == expected,
            "{}: {op} called in state {:?}, expected {expected:?}",
            S::NAME,
            self.state
        );
    }

    // The field resolved by `assign_key`, valid while a value is assembled.
    fn current(&self, op: &str) -> (usize, &'static Field<S>) {
        self.expect_state(State::MidValue, op);
        let index = self.field.unwrap_or_else(|| panic!("{}: {op} without a key", S::NAME));
        (index, &S::FIELDS[index])
    }
}

impl<S: Schema, T: Slot<S>> MapAssembler for Assembler<S, T> {
    fn type_name(&self) -> &'static str {
        S::NAME
    }

    fn assemble_key(&mut self) {
        self.expect_state(State::Initial, "assemble_key");
        self.state = State::MidKey;
    }

    fn assign_key(&mut self, key: &str) -> Result<()> {
        self.expect_state(State::MidKey, "assign_key");
        tracing::trace!(schema = S::NAME, key, "assign key");

        let Some(index) = S::position(key) else {
            return Err(Error::NoSuchField {
                type_name: S::NAME,
                field: key.to_string(),
            });
        };
        let bit = 1 << index;
        if self.seen & bit != 0 {
            return Err(Error::RepeatedField(key.to_string()));
        }

        self.seen |= bit;
        self.field = Some(index);
        self.state = State::ExpectValue;
        Ok(())
    }

    fn assemble_value(&mut self) {
        self.expect_state(State::ExpectValue, "assemble_value");
        self.state = State::MidValue;
    }

    fn assign_node(&mut self, value: Node) -> Result<()> {
        let (index, field) = self.current("assign_node");
        let target = self.slot.resolve();

        if value.is_null() {
            (field.clear)(target);
            self.present &= !(1 << index);
        } else {
            match (&field.setter, value) {
                (Setter::Value(set), value) => set(target, value)?,
                (Setter::List(entries), Node::List(items)) => {
                    let entries = entries(target);
                    entries.reserve(items.len());
                    for item in items {
                        let mut done = false;
                        entries.assemble_entry(&mut done).assign_map(item)?;
                    }
                }
                (Setter::List(_), other) => {
                    return Err(Error::wrong_kind(field.name, Kind::List, other.kind()));
                }
            }
            self.present |= 1 << index;
        }

        self.field = None;
        self.state = State::Initial;
        Ok(())
    }

    fn begin_list(&mut self, size_hint: usize) -> Result<ListAssembler<'_>> {
        let (index, field) = self.current("begin_list");
        let Setter::List(entries) = &field.setter else {
            return Err(Error::wrong_kind(field.name, field.kind, Kind::List));
        };

        self.present |= 1 << index;
        self.field = None;

        // grow the owning sequence before handing out entry assemblers
        let entries = entries(self.slot.resolve());
        entries.reserve(size_hint);
        Ok(ListAssembler::new(entries, &mut self.state))
    }

    fn begin_map(&mut self, _size_hint: usize) -> Result<HeaderAssembler<'_>> {
        let (index, field) = self.current("begin_map");
        let (Setter::Value(set), Kind::Map) = (&field.setter, field.kind) else {
            return Err(Error::wrong_kind(field.name, field.kind, Kind::Map));
        };

        self.present |= 1 << index;
        self.field = None;

        let set = *set;
        let target = self.slot.resolve();
        let commit = Box::new(move |node| set(target, node));
        Ok(HeaderAssembler::new(field.name, commit, &mut self.state))
    }

    fn finish(&mut self) -> Result<()> {
        self.expect_state(State::Initial, "finish");

        for name in S::REQUIRED {
            let present = S::position(name).is_some_and(|i| self.present & (1 << i) != 0);
            if !present {
                return Err(Error::MissingField((*name).to_string()));
            }
        }
        self.slot.resolve().validate()?;
        self.slot.finished();

        self.state = State::Finished;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jose::{JoseAssembler, Recipient, Signature};

    fn recipients_list(asm: &mut JoseAssembler) -> ListAssembler<'_> {
        asm.assemble_entry("recipients").expect("known key");
        asm.begin_list(2).expect("recipients is a list")
    }

    #[test]
    fn streams_a_signature() {
        let mut asm = Assembler::<Signature, _>::new();
        asm.assemble_entry("protected").expect("known key");
        asm.assign_bytes(vec![1, 2, 3]).expect("bytes accepted");
        asm.assemble_entry("signature").expect("known key");
        asm.assign_bytes(vec![4, 5, 6]).expect("bytes accepted");
        asm.finish().expect("should finish");

        let sig = asm.into_inner();
        assert_eq!(sig.protected(), Some([1, 2, 3].as_slice()));
        assert_eq!(sig.signature(), &[4, 5, 6]);
        assert!(sig.header().is_none());
    }

    #[test]
    fn unknown_key_is_recoverable() {
        let mut asm = Assembler::<Recipient, _>::new();
        asm.assemble_key();
        let err = asm.assign_key("alg").expect_err("should reject");
        assert_eq!(err.to_string(), "no such field: Recipient.alg");
    }

    #[test]
    fn repeated_key() {
        let mut asm = Assembler::<Recipient, _>::new();
        asm.assemble_entry("encrypted_key").expect("known key");
        asm.assign_bytes(vec![1]).expect("bytes accepted");
        asm.assemble_key();
        let err = asm.assign_key("encrypted_key").expect_err("should reject");
        assert!(matches!(err, Error::RepeatedField(_)));
    }

    #[test]
    fn missing_signature() {
        let mut asm = Assembler::<Signature, _>::new();
        asm.assemble_entry("protected").expect("known key");
        asm.assign_bytes(vec![1]).expect("bytes accepted");
        let err = asm.finish().expect_err("signature is mandatory");
        assert_eq!(err.to_string(), "missing required field: 'signature'");
    }

    #[test]
    fn null_clears_field() {
        let mut asm = Assembler::<Recipient, _>::new();
        asm.assemble_entry("encrypted_key").expect("known key");
        asm.assign_null().expect("null accepted");
        asm.finish().expect("should finish");
        assert!(asm.into_inner().encrypted_key().is_none());
    }

    #[test]
    fn header_map_value() {
        let mut asm = Assembler::<Recipient, _>::new();
        asm.assemble_entry("header").expect("known key");
        {
            let mut header = asm.begin_map(1).expect("header is a map");
            header.insert("kid", Node::from("did:example:123#key-1")).expect("new key");
            let err = header.insert("kid", Node::from("again")).expect_err("repeated");
            assert!(matches!(err, Error::RepeatedField(_)));
            header.finish().expect("should commit");
        }
        asm.finish().expect("should finish");

        let recipient = asm.into_inner();
        let header = recipient.header().expect("header present");
        assert_eq!(header.get("kid"), Some(&Node::from("did:example:123#key-1")));
    }

    #[test]
    fn bytes_for_map_is_wrong_kind() {
        let mut asm = Assembler::<Recipient, _>::new();
        asm.assemble_entry("header").expect("known key");
        let err = asm.assign_bytes(vec![1]).expect_err("should reject");
        assert!(matches!(err, Error::WrongKind { expected: Kind::Map, actual: Kind::Bytes, .. }));
    }

    #[test]
    fn assign_map_rejects_non_map() {
        let mut asm = Assembler::<Signature, _>::new();
        let err = asm.assign_map(Node::from(vec![1_u8])).expect_err("should reject");
        assert_eq!(err.to_string(), "wrong kind for 'Signature': expected map, found bytes");
    }

    #[test]
    #[should_panic(expected = "assemble_value called in state Initial")]
    fn value_before_key_panics() {
        let mut asm = Assembler::<Signature, _>::new();
        asm.assemble_value();
    }

    #[test]
    #[should_panic(expected = "finish called in state ExpectValue")]
    fn finish_mid_entry_panics() {
        let mut asm = Assembler::<Signature, _>::new();
        asm.assemble_key();
        asm.assign_key("signature").expect("known key");
        let _ = asm.finish();
    }

    #[test]
    fn finished_entries_complete_the_list() {
        let mut asm = JoseAssembler::new();
        asm.assemble_entry("ciphertext").expect("known key");
        asm.assign_bytes(b"ct".to_vec()).expect("bytes accepted");
        {
            let mut list = recipients_list(&mut asm);
            for key in [b"k1", b"k2"] {
                let mut entry = list.assemble_value();
                entry.assemble_entry("encrypted_key").expect("known key");
                entry.assign_bytes(key.to_vec()).expect("bytes accepted");
                entry.finish().expect("entry complete");
            }
            list.finish();
        }
        asm.finish().expect("valid JWE");

        let jose = asm.build().expect("should build");
        let jwe = jose.as_jwe().expect("is a JWE");
        assert_eq!(jwe.recipients().map(<[_]>::len), Some(2));
    }

    #[test]
    #[should_panic(expected = "list: finish called with an unfinished entry")]
    fn list_finish_over_dropped_entry_panics() {
        let mut asm = JoseAssembler::new();
        let mut list = recipients_list(&mut asm);
        drop(list.assemble_value());
        list.finish();
    }

    #[test]
    #[should_panic(expected = "list: assemble_value called before the previous entry finished")]
    fn entry_after_dropped_entry_panics() {
        let mut asm = JoseAssembler::new();
        let mut list = recipients_list(&mut asm);
        let mut entry = list.assemble_value();
        entry.assemble_entry("encrypted_key").expect("known key");
        drop(entry);
        let _entry = list.assemble_value();
    }

    #[test]
    #[should_panic(expected = "into_inner called in state Initial")]
    fn into_inner_before_finish_panics() {
        let asm = Assembler::<Signature, _>::new();
        let _ = asm.into_inner();
    }
}
