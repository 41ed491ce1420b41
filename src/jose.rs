//! # JOSE Objects
//!
//! The typed representation of a DAG-JOSE object: either a JSON Web Signature
//! ([RFC7515]) over a content identifier, or a JSON Web Encryption
//! ([RFC7516]) object.
//!
//! Objects are created by the [`JoseAssembler`] (driven by a CBOR or JSON
//! decoder, or handed a pre-built [`Node`] tree), or directly with the
//! `with_*` constructors. Once built, they are read-only.
//!
//! [RFC7515]: https://www.rfc-editor.org/rfc/rfc7515
//! [RFC7516]: https://www.rfc-editor.org/rfc/rfc7516

use std::collections::BTreeMap;

use cid::Cid;

use crate::assemble::{Assembler, Entries, HeaderAssembler, ListAssembler, MapAssembler, Owned};
use crate::error::{Error, Result};
use crate::node::{Kind, Node};
use crate::schema::{self, Field, Schema, Setter};

/// Per-signature, per-recipient, or shared unprotected header.
pub type Header = BTreeMap<String, Node>;

/// A DAG-JOSE object: exactly one of a JWS or a JWE.
#[derive(Clone, Debug, PartialEq)]
pub enum Jose {
    /// JSON Web Signature.
    Jws(Jws),

    /// JSON Web Encryption.
    Jwe(Jwe),
}

impl Jose {
    /// Build a JOSE object from a generic tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree is not a map, contains keys outside the
    /// JOSE schema, or does not form a valid JWS or JWE.
    pub fn from_node(node: Node) -> Result<Self> {
        let mut asm = JoseAssembler::new();
        asm.assign_map(node)?;
        asm.build()
    }

    /// Returns `true` if the object is a JWS.
    #[must_use]
    pub const fn is_jws(&self) -> bool {
        matches!(self, Self::Jws(_))
    }

    /// Returns `true` if the object is a JWE.
    #[must_use]
    pub const fn is_jwe(&self) -> bool {
        matches!(self, Self::Jwe(_))
    }

    /// The JWS, if this is one.
    #[must_use]
    pub const fn as_jws(&self) -> Option<&Jws> {
        match self {
            Self::Jws(jws) => Some(jws),
            Self::Jwe(_) => None,
        }
    }

    /// The JWE, if this is one.
    #[must_use]
    pub const fn as_jwe(&self) -> Option<&Jwe> {
        match self {
            Self::Jws(_) => None,
            Self::Jwe(jwe) => Some(jwe),
        }
    }

    /// Link to the signed content, for link-following tooling.
    ///
    /// Derived from the JWS payload; it is never part of the encoded form.
    #[must_use]
    pub const fn link(&self) -> Option<&Cid> {
        match self {
            Self::Jws(jws) => Some(&jws.payload),
            Self::Jwe(_) => None,
        }
    }
}

impl From<Jws> for Jose {
    fn from(jws: Jws) -> Self {
        Self::Jws(jws)
    }
}

impl From<Jwe> for Jose {
    fn from(jwe: Jwe) -> Self {
        Self::Jwe(jwe)
    }
}

/// JSON Web Signature over a content identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct Jws {
    payload: Cid,
    signatures: Option<Vec<Signature>>,
}

impl Jws {
    /// A JWS over `payload` with no `signatures` member.
    #[must_use]
    pub const fn new(payload: Cid) -> Self {
        Self {
            payload,
            signatures: None,
        }
    }

    /// Append a signature.
    #[must_use]
    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signatures.get_or_insert_with(Vec::new).push(signature);
        self
    }

    /// Replace the signatures. An empty list is kept as a present, empty
    /// `signatures` member.
    #[must_use]
    pub fn with_signatures(mut self, signatures: impl IntoIterator<Item = Signature>) -> Self {
        self.signatures = Some(signatures.into_iter().collect());
        self
    }

    /// The signed content's identifier.
    #[must_use]
    pub const fn payload(&self) -> &Cid {
        &self.payload
    }

    /// Signatures, in order, if the member is present.
    #[must_use]
    pub fn signatures(&self) -> Option<&[Signature]> {
        self.signatures.as_deref()
    }
}

/// JSON Web Encryption object.
#[derive(Clone, Debug, PartialEq)]
pub struct Jwe {
    protected: Option<Vec<u8>>,
    unprotected: Option<Header>,
    iv: Option<Vec<u8>>,
    aad: Option<Vec<u8>>,
    ciphertext: Vec<u8>,
    tag: Option<Vec<u8>>,
    recipients: Option<Vec<Recipient>>,
}

impl Jwe {
    /// A JWE holding `ciphertext` and nothing else.
    #[must_use]
    pub fn new(ciphertext: impl Into<Vec<u8>>) -> Self {
        Self {
            protected: None,
            unprotected: None,
            iv: None,
            aad: None,
            ciphertext: ciphertext.into(),
            tag: None,
            recipients: None,
        }
    }

    /// Set the protected header (already serialized).
    #[must_use]
    pub fn with_protected(mut self, protected: impl Into<Vec<u8>>) -> Self {
        self.protected = Some(protected.into());
        self
    }

    /// Set the shared unprotected header.
    #[must_use]
    pub fn with_unprotected(mut self, unprotected: Header) -> Self {
        self.unprotected = Some(unprotected);
        self
    }

    /// Set the initialization vector.
    #[must_use]
    pub fn with_iv(mut self, iv: impl Into<Vec<u8>>) -> Self {
        self.iv = Some(iv.into());
        self
    }

    /// Set the additional authenticated data.
    #[must_use]
    pub fn with_aad(mut self, aad: impl Into<Vec<u8>>) -> Self {
        self.aad = Some(aad.into());
        self
    }

    /// Set the authentication tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<Vec<u8>>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Append a recipient.
    #[must_use]
    pub fn with_recipient(mut self, recipient: Recipient) -> Self {
        self.recipients.get_or_insert_with(Vec::new).push(recipient);
        self
    }

    /// Replace the recipients. An empty list is kept as a present, empty
    /// `recipients` member.
    #[must_use]
    pub fn with_recipients(mut self, recipients: impl IntoIterator<Item = Recipient>) -> Self {
        self.recipients = Some(recipients.into_iter().collect());
        self
    }

    /// Protected header bytes.
    #[must_use]
    pub fn protected(&self) -> Option<&[u8]> {
        self.protected.as_deref()
    }

    /// Shared unprotected header.
    #[must_use]
    pub const fn unprotected(&self) -> Option<&Header> {
        self.unprotected.as_ref()
    }

    /// Initialization vector.
    #[must_use]
    pub fn iv(&self) -> Option<&[u8]> {
        self.iv.as_deref()
    }

    /// Additional authenticated data.
    #[must_use]
    pub fn aad(&self) -> Option<&[u8]> {
        self.aad.as_deref()
    }

    /// Ciphertext.
    #[must_use]
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Authentication tag.
    #[must_use]
    pub fn tag(&self) -> Option<&[u8]> {
        self.tag.as_deref()
    }

    /// Recipients, in order, if the member is present.
    #[must_use]
    pub fn recipients(&self) -> Option<&[Recipient]> {
        self.recipients.as_deref()
    }
}

/// One signature of a JWS.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Signature {
    protected: Option<Vec<u8>>,
    header: Option<Header>,
    signature: Vec<u8>,
}

impl Signature {
    /// A signature with no headers.
    #[must_use]
    pub fn new(signature: impl Into<Vec<u8>>) -> Self {
        Self {
            signature: signature.into(),
            ..Self::default()
        }
    }

    /// Set the protected header (already serialized).
    #[must_use]
    pub fn with_protected(mut self, protected: impl Into<Vec<u8>>) -> Self {
        self.protected = Some(protected.into());
        self
    }

    /// Set the unprotected header.
    #[must_use]
    pub fn with_header(mut self, header: Header) -> Self {
        self.header = Some(header);
        self
    }

    /// Protected header bytes.
    #[must_use]
    pub fn protected(&self) -> Option<&[u8]> {
        self.protected.as_deref()
    }

    /// Unprotected header.
    #[must_use]
    pub const fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    /// Signature bytes.
    #[must_use]
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }
}

/// Per-recipient information of a JWE.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Recipient {
    header: Option<Header>,
    encrypted_key: Option<Vec<u8>>,
}

impl Recipient {
    /// A recipient with no header and no encrypted key.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-recipient unprotected header.
    #[must_use]
    pub fn with_header(mut self, header: Header) -> Self {
        self.header = Some(header);
        self
    }

    /// Set the encrypted content encryption key.
    #[must_use]
    pub fn with_encrypted_key(mut self, encrypted_key: impl Into<Vec<u8>>) -> Self {
        self.encrypted_key = Some(encrypted_key.into());
        self
    }

    /// Per-recipient unprotected header.
    #[must_use]
    pub const fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    /// Encrypted key.
    #[must_use]
    pub fn encrypted_key(&self) -> Option<&[u8]> {
        self.encrypted_key.as_deref()
    }

    /// Returns `true` if neither field is present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.header.is_none() && self.encrypted_key.is_none()
    }
}

// ---- Field tables ----

impl Schema for Signature {
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            name: "protected",
            kind: Kind::Bytes,
            setter: Setter::Value(sig_set_protected),
            clear: |s| s.protected = None,
        },
        Field {
            name: "header",
            kind: Kind::Map,
            setter: Setter::Value(sig_set_header),
            clear: |s| s.header = None,
        },
        Field {
            name: "signature",
            kind: Kind::Bytes,
            setter: Setter::Value(sig_set_signature),
            clear: |s| s.signature = Vec::new(),
        },
    ];
    const NAME: &'static str = "Signature";
    const REQUIRED: &'static [&'static str] = &["signature"];
}

fn sig_set_protected(s: &mut Signature, node: Node) -> Result<()> {
    s.protected = Some(schema::bytes("protected", node)?);
    Ok(())
}

fn sig_set_header(s: &mut Signature, node: Node) -> Result<()> {
    s.header = Some(schema::header("header", node)?);
    Ok(())
}

fn sig_set_signature(s: &mut Signature, node: Node) -> Result<()> {
    s.signature = schema::bytes("signature", node)?;
    Ok(())
}

impl Schema for Recipient {
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            name: "header",
            kind: Kind::Map,
            setter: Setter::Value(rcpt_set_header),
            clear: |r| r.header = None,
        },
        Field {
            name: "encrypted_key",
            kind: Kind::Bytes,
            setter: Setter::Value(rcpt_set_encrypted_key),
            clear: |r| r.encrypted_key = None,
        },
    ];
    const NAME: &'static str = "Recipient";
}

fn rcpt_set_header(r: &mut Recipient, node: Node) -> Result<()> {
    r.header = Some(schema::header("header", node)?);
    Ok(())
}

fn rcpt_set_encrypted_key(r: &mut Recipient, node: Node) -> Result<()> {
    r.encrypted_key = Some(schema::bytes("encrypted_key", node)?);
    Ok(())
}

/// The nine top-level fields, as assembled before the JWS/JWE shape is known.
#[derive(Debug, Default)]
pub(crate) struct JoseFields {
    payload: Option<Cid>,
    signatures: Option<Vec<Signature>>,
    protected: Option<Vec<u8>>,
    unprotected: Option<Header>,
    iv: Option<Vec<u8>>,
    aad: Option<Vec<u8>>,
    ciphertext: Option<Vec<u8>>,
    tag: Option<Vec<u8>>,
    recipients: Option<Vec<Recipient>>,
}

impl Schema for JoseFields {
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            name: "payload",
            kind: Kind::Bytes,
            setter: Setter::Value(set_payload),
            clear: |j| j.payload = None,
        },
        Field {
            name: "signatures",
            kind: Kind::List,
            setter: Setter::List(signatures),
            clear: |j| j.signatures = None,
        },
        Field {
            name: "protected",
            kind: Kind::Bytes,
            setter: Setter::Value(set_protected),
            clear: |j| j.protected = None,
        },
        Field {
            name: "unprotected",
            kind: Kind::Map,
            setter: Setter::Value(set_unprotected),
            clear: |j| j.unprotected = None,
        },
        Field {
            name: "iv",
            kind: Kind::Bytes,
            setter: Setter::Value(set_iv),
            clear: |j| j.iv = None,
        },
        Field {
            name: "aad",
            kind: Kind::Bytes,
            setter: Setter::Value(set_aad),
            clear: |j| j.aad = None,
        },
        Field {
            name: "ciphertext",
            kind: Kind::Bytes,
            setter: Setter::Value(set_ciphertext),
            clear: |j| j.ciphertext = None,
        },
        Field {
            name: "tag",
            kind: Kind::Bytes,
            setter: Setter::Value(set_tag),
            clear: |j| j.tag = None,
        },
        Field {
            name: "recipients",
            kind: Kind::List,
            setter: Setter::List(recipients),
            clear: |j| j.recipients = None,
        },
    ];
    const NAME: &'static str = "JOSE";

    fn validate(&self) -> Result<()> {
        match (&self.payload, &self.ciphertext) {
            (Some(_), Some(_)) => Err(Error::InvalidJose(
                "cannot contain both a 'payload' and a 'ciphertext'".into(),
            )),
            (Some(_), None) => {
                let jwe_only = [
                    ("protected", self.protected.is_some()),
                    ("unprotected", self.unprotected.is_some()),
                    ("iv", self.iv.is_some()),
                    ("aad", self.aad.is_some()),
                    ("tag", self.tag.is_some()),
                    ("recipients", self.recipients.is_some()),
                ];
                if let Some((name, _)) = jwe_only.iter().find(|(_, present)| *present) {
                    return Err(Error::InvalidJws(format!("cannot contain JWE member '{name}'")));
                }
                Ok(())
            }
            (None, Some(_)) => {
                if self.signatures.is_some() {
                    return Err(Error::InvalidJwe("cannot contain 'signatures'".into()));
                }
                Ok(())
            }
            (None, None) => {
                if self.signatures.is_some() {
                    return Err(Error::MissingField("payload".into()));
                }
                if self.recipients.is_some() || self.iv.is_some() || self.tag.is_some() {
                    return Err(Error::MissingField("ciphertext".into()));
                }
                Err(Error::InvalidJose("must contain either a 'payload' or a 'ciphertext'".into()))
            }
        }
    }
}

fn set_payload(j: &mut JoseFields, node: Node) -> Result<()> {
    let bytes = schema::bytes("payload", node)?;
    let cid = Cid::try_from(bytes.as_slice()).map_err(|e| Error::InvalidCid(e.to_string()))?;

    // reject trailing bytes so re-encoding reproduces the input
    if cid.to_bytes() != bytes {
        return Err(Error::InvalidCid("unexpected trailing bytes".into()));
    }
    j.payload = Some(cid);
    Ok(())
}

fn signatures(j: &mut JoseFields) -> &mut dyn Entries {
    j.signatures.get_or_insert_with(Vec::new)
}

fn set_protected(j: &mut JoseFields, node: Node) -> Result<()> {
    j.protected = Some(schema::bytes("protected", node)?);
    Ok(())
}

fn set_unprotected(j: &mut JoseFields, node: Node) -> Result<()> {
    j.unprotected = Some(schema::header("unprotected", node)?);
    Ok(())
}

fn set_iv(j: &mut JoseFields, node: Node) -> Result<()> {
    j.iv = Some(schema::bytes("iv", node)?);
    Ok(())
}

fn set_aad(j: &mut JoseFields, node: Node) -> Result<()> {
    j.aad = Some(schema::bytes("aad", node)?);
    Ok(())
}

fn set_ciphertext(j: &mut JoseFields, node: Node) -> Result<()> {
    j.ciphertext = Some(schema::bytes("ciphertext", node)?);
    Ok(())
}

fn set_tag(j: &mut JoseFields, node: Node) -> Result<()> {
    j.tag = Some(schema::bytes("tag", node)?);
    Ok(())
}

fn recipients(j: &mut JoseFields) -> &mut dyn Entries {
    j.recipients.get_or_insert_with(Vec::new)
}

impl TryFrom<JoseFields> for Jose {
    type Error = Error;

    fn try_from(fields: JoseFields) -> Result<Self> {
        fields.validate()?;

        if let Some(payload) = fields.payload {
            return Ok(Self::Jws(Jws {
                payload,
                signatures: fields.signatures,
            }));
        }
        let Some(ciphertext) = fields.ciphertext else {
            return Err(Error::InvalidJose(
                "must contain either a 'payload' or a 'ciphertext'".into(),
            ));
        };
        Ok(Self::Jwe(Jwe {
            protected: fields.protected,
            unprotected: fields.unprotected,
            iv: fields.iv,
            aad: fields.aad,
            ciphertext,
            tag: fields.tag,
            recipients: fields.recipients,
        }))
    }
}

/// Assembles a [`Jose`] object from key/value events.
///
/// ```rust
/// use dag_jose::{JoseAssembler, MapAssembler};
///
/// let mut asm = JoseAssembler::new();
/// asm.assemble_entry("ciphertext").expect("known key");
/// asm.assign_bytes(b"secret".to_vec()).expect("bytes accepted");
/// asm.finish().expect("valid JWE");
///
/// let jose = asm.build().expect("should build");
/// assert!(jose.is_jwe());
/// ```
#[derive(Debug, Default)]
pub struct JoseAssembler(Assembler<JoseFields, Owned<JoseFields>>);

impl JoseAssembler {
    /// A new, empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The assembled object.
    ///
    /// # Errors
    ///
    /// Returns an error if the assembled fields do not form a JWS or JWE.
    ///
    /// # Panics
    ///
    /// Panics if [`MapAssembler::finish`] has not completed successfully.
    pub fn build(self) -> Result<Jose> {
        Jose::try_from(self.0.into_inner())
    }
}

impl MapAssembler for JoseAssembler {
    fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    fn assemble_key(&mut self) {
        self.0.assemble_key();
    }

    fn assign_key(&mut self, key: &str) -> Result<()> {
        self.0.assign_key(key)
    }

    fn assemble_value(&mut self) {
        self.0.assemble_value();
    }

    fn assign_node(&mut self, value: Node) -> Result<()> {
        self.0.assign_node(value)
    }

    fn begin_list(&mut self, size_hint: usize) -> Result<ListAssembler<'_>> {
        self.0.begin_list(size_hint)
    }

    fn begin_map(&mut self, size_hint: usize) -> Result<HeaderAssembler<'_>> {
        self.0.begin_map(size_hint)
    }

    fn finish(&mut self) -> Result<()> {
        self.0.finish()
    }
}

#[cfg(test)]
mod tests {
    use cid::multihash::Multihash;

    use super::*;

    fn payload() -> Cid {
        let hash = Multihash::<64>::wrap(0x12, &[7; 32]).expect("valid digest");
        Cid::new_v1(0x71, hash)
    }

    #[test]
    fn assembles_jws_with_streamed_signatures() {
        let mut asm = JoseAssembler::new();
        asm.assemble_entry("payload").expect("known key");
        asm.assign_bytes(payload().to_bytes()).expect("valid CID");

        asm.assemble_entry("signatures").expect("known key");
        {
            let mut list = asm.begin_list(2).expect("signatures is a list");
            for sig in [b"first", b"other"] {
                let mut entry = list.assemble_value();
                entry.assemble_entry("signature").expect("known key");
                entry.assign_bytes(sig.to_vec()).expect("bytes accepted");
                entry.finish().expect("entry complete");
            }
            list.finish();
        }
        asm.finish().expect("valid JWS");

        let jose = asm.build().expect("should build");
        let jws = jose.as_jws().expect("is a JWS");
        assert_eq!(jws.payload(), &payload());
        let signatures = jws.signatures().expect("should have signatures");
        assert_eq!(signatures.len(), 2);
        assert_eq!(signatures[1].signature(), b"other");
        assert_eq!(jose.link(), Some(&payload()));
    }

    #[test]
    fn invalid_payload_cid() {
        let mut asm = JoseAssembler::new();
        asm.assemble_entry("payload").expect("known key");
        let err = asm.assign_bytes(b"not a cid".to_vec()).expect_err("should reject");
        assert!(err.to_string().contains("payload is not a valid CID"));
    }

    #[test]
    fn bytes_for_signatures_is_wrong_kind() {
        let mut asm = JoseAssembler::new();
        asm.assemble_entry("signatures").expect("known key");
        let err = asm.assign_bytes(vec![1, 2, 3]).expect_err("should reject");
        assert_eq!(err.to_string(), "wrong kind for 'signatures': expected list, found bytes");
    }

    #[test]
    fn list_for_bytes_field_is_wrong_kind() {
        let mut asm = JoseAssembler::new();
        asm.assemble_entry("iv").expect("known key");
        let Err(err) = asm.begin_list(0) else {
            panic!("iv is not a list");
        };
        assert!(matches!(err, Error::WrongKind { expected: Kind::Bytes, actual: Kind::List, .. }));
    }

    #[test]
    fn unknown_top_level_key() {
        let mut asm = JoseAssembler::new();
        asm.assemble_key();
        let err = asm.assign_key("signature").expect_err("should reject");
        assert_eq!(err.to_string(), "no such field: JOSE.signature");
    }

    #[test]
    fn payload_and_ciphertext() {
        let node = Node::Map(BTreeMap::from([
            ("payload".to_string(), Node::Bytes(payload().to_bytes())),
            ("ciphertext".to_string(), Node::Bytes(vec![1])),
        ]));
        let err = Jose::from_node(node).expect_err("should reject");
        assert!(matches!(err, Error::InvalidJose(_)));
    }

    #[test]
    fn jws_with_jwe_member() {
        let node = Node::Map(BTreeMap::from([
            ("payload".to_string(), Node::Bytes(payload().to_bytes())),
            ("iv".to_string(), Node::Bytes(vec![1])),
        ]));
        let err = Jose::from_node(node).expect_err("should reject");
        assert_eq!(err.to_string(), "invalid JWS serialization: cannot contain JWE member 'iv'");
    }

    #[test]
    fn null_payload_is_absent() {
        let node = Node::Map(BTreeMap::from([
            ("payload".to_string(), Node::Null),
            ("ciphertext".to_string(), Node::Bytes(vec![1])),
        ]));
        let jose = Jose::from_node(node).expect("should build");
        assert!(jose.is_jwe());
    }

    #[test]
    fn signatures_without_payload() {
        let node = Node::Map(BTreeMap::from([("signatures".to_string(), Node::List(vec![]))]));
        let err = Jose::from_node(node).expect_err("should reject");
        assert_eq!(err.to_string(), "missing required field: 'payload'");
    }

    #[test]
    fn empty_lists_stay_present() {
        let node = Node::Map(BTreeMap::from([
            ("payload".to_string(), Node::Bytes(payload().to_bytes())),
            ("signatures".to_string(), Node::List(vec![])),
        ]));
        let jose = Jose::from_node(node).expect("should build");
        assert_eq!(jose, Jose::from(Jws::new(payload()).with_signatures(Vec::<Signature>::new())));
        assert_ne!(jose, Jose::from(Jws::new(payload())));

        let node = Node::Map(BTreeMap::from([
            ("ciphertext".to_string(), Node::Bytes(vec![1])),
            ("recipients".to_string(), Node::List(vec![])),
        ]));
        let jose = Jose::from_node(node).expect("should build");
        let jwe = jose.as_jwe().expect("is a JWE");
        assert_eq!(jwe.recipients(), Some(&[][..]));
    }

    #[test]
    fn not_jose() {
        let err = Jose::from_node(Node::Map(BTreeMap::new())).expect_err("should reject");
        assert!(err.to_string().starts_with("invalid JOSE object"));

        let err = Jose::from_node(Node::from("jose")).expect_err("should reject");
        assert_eq!(err.to_string(), "wrong kind for 'JOSE': expected map, found string");
    }

    #[test]
    fn nested_entry_errors_propagate() {
        let entry = Node::Map(BTreeMap::from([("protected".to_string(), Node::Bytes(vec![1]))]));
        let node = Node::Map(BTreeMap::from([
            ("payload".to_string(), Node::Bytes(payload().to_bytes())),
            ("signatures".to_string(), Node::List(vec![entry])),
        ]));
        let err = Jose::from_node(node).expect_err("should reject");
        assert_eq!(err.to_string(), "missing required field: 'signature'");
    }
}
