//! # Generic Data-Model View
//!
//! Presents a built [`Jose`] object as a read-only map so that tooling
//! written against the generic tree (traversal, diffing, re-encoding) can
//! consume it. Only present fields are exposed, always in [`FIELD_ORDER`].

use cid::Cid;

use crate::jose::{Header, Jose, Recipient, Signature};
use crate::node::Node;

/// Top-level field names in iteration order.
pub const FIELD_ORDER: [&str; 9] = [
    "payload",
    "signatures",
    "protected",
    "unprotected",
    "iv",
    "aad",
    "ciphertext",
    "tag",
    "recipients",
];

/// A borrowed field value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldValue<'a> {
    /// JWS payload.
    Cid(&'a Cid),

    /// Opaque byte string.
    Bytes(&'a [u8]),

    /// Shared unprotected header.
    Header(&'a Header),

    /// JWS signatures.
    Signatures(&'a [Signature]),

    /// JWE recipients.
    Recipients(&'a [Recipient]),
}

impl FieldValue<'_> {
    /// Convert to an owned [`Node`].
    ///
    /// The payload CID becomes its binary form, matching what the assembler
    /// accepts for `payload`.
    #[must_use]
    pub fn to_node(&self) -> Node {
        match self {
            Self::Cid(cid) => Node::Bytes(cid.to_bytes()),
            Self::Bytes(bytes) => Node::Bytes(bytes.to_vec()),
            Self::Header(header) => Node::Map((*header).clone()),
            Self::Signatures(signatures) => {
                Node::List(signatures.iter().map(Signature::to_node).collect())
            }
            Self::Recipients(recipients) => {
                Node::List(recipients.iter().map(Recipient::to_node).collect())
            }
        }
    }
}

/// Read-only map view over a [`Jose`] object.
#[derive(Clone, Copy, Debug)]
pub struct JoseView<'a>(&'a Jose);

impl<'a> JoseView<'a> {
    /// Look up a top-level field.
    ///
    /// Absent fields, and keys outside the schema, are `None`.
    #[must_use]
    pub fn lookup_by_key(&self, key: &str) -> Option<FieldValue<'a>> {
        match self.0 {
            Jose::Jws(jws) => match key {
                "payload" => Some(FieldValue::Cid(jws.payload())),
                "signatures" => jws.signatures().map(FieldValue::Signatures),
                _ => None,
            },
            Jose::Jwe(jwe) => match key {
                "protected" => jwe.protected().map(FieldValue::Bytes),
                "unprotected" => jwe.unprotected().map(FieldValue::Header),
                "iv" => jwe.iv().map(FieldValue::Bytes),
                "aad" => jwe.aad().map(FieldValue::Bytes),
                "ciphertext" => Some(FieldValue::Bytes(jwe.ciphertext())),
                "tag" => jwe.tag().map(FieldValue::Bytes),
                "recipients" => jwe.recipients().map(FieldValue::Recipients),
                _ => None,
            },
        }
    }

    /// Present fields, in [`FIELD_ORDER`].
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, FieldValue<'a>)> + '_ {
        FIELD_ORDER.into_iter().filter_map(|key| self.lookup_by_key(key).map(|value| (key, value)))
    }

    /// Number of present fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Always `false`: a JWS has a payload and a JWE a ciphertext.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert to an owned [`Node::Map`] of the present fields.
    #[must_use]
    pub fn to_node(&self) -> Node {
        to_map(self.iter())
    }
}

impl Jose {
    /// A generic map view of this object.
    #[must_use]
    pub const fn view(&self) -> JoseView<'_> {
        JoseView(self)
    }

    /// The object as an owned generic tree.
    #[must_use]
    pub fn to_node(&self) -> Node {
        self.view().to_node()
    }
}

impl Signature {
    /// Present fields of the signature.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, FieldValue<'_>)> {
        [
            ("protected", self.protected().map(FieldValue::Bytes)),
            ("header", self.header().map(FieldValue::Header)),
            ("signature", Some(FieldValue::Bytes(self.signature()))),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| (key, value)))
    }

    /// The signature as a generic map of its present fields.
    #[must_use]
    pub fn to_node(&self) -> Node {
        to_map(self.fields())
    }
}

impl Recipient {
    /// Present fields of the recipient.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, FieldValue<'_>)> {
        [
            ("header", self.header().map(FieldValue::Header)),
            ("encrypted_key", self.encrypted_key().map(FieldValue::Bytes)),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| (key, value)))
    }

    /// The recipient as a generic map of its present fields.
    #[must_use]
    pub fn to_node(&self) -> Node {
        to_map(self.fields())
    }
}

fn to_map<'a>(fields: impl Iterator<Item = (&'static str, FieldValue<'a>)>) -> Node {
    Node::Map(fields.map(|(key, value)| (key.to_string(), value.to_node())).collect())
}
