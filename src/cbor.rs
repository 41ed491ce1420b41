//! # Canonical CBOR
//!
//! Encodes a [`Jose`] object to its canonical binary form and decodes it
//! back. The encoding is deterministic: map keys are sorted by length, then
//! bytewise, integers and lengths use their shortest form, floats are always
//! 64-bit, and links use CBOR tag 42. Logically equal objects therefore
//! always produce identical bytes and identical content identifiers.

use std::cmp::Ordering;
use std::io::Cursor;

use anyhow::anyhow;
use ciborium::value::Value;
use ciborium_ll::{Encoder, simple};
use cid::Cid;
use cid::multihash::Multihash;
use sha3::{Digest, Sha3_384};

use crate::assemble::MapAssembler;
use crate::error::{Error, Result};
use crate::jose::{Header, Jose, JoseAssembler};
use crate::node::{Kind, Node};
use crate::view::FieldValue;

/// Multicodec code for DAG-JOSE.
pub const DAG_JOSE: u64 = 0x85;

/// Multihash code for SHA3-384.
pub const SHA3_384: u64 = 0x15;

/// CBOR tag for content-address links.
const CID_TAG: u64 = 42;

/// Initial byte of a 64-bit float (major type 7, additional info 27).
const FLOAT64: u8 = 0xfb;

/// Encode `jose` to canonical CBOR.
///
/// Fields are written straight from the object's [view](Jose::view), without
/// copying its byte strings.
///
/// # Errors
///
/// Returns an error if a header holds a value CBOR cannot represent: an
/// integer outside the 64-bit range or a non-finite float.
pub fn encode(jose: &Jose) -> Result<Vec<u8>> {
    tracing::debug!("cbor::encode");

    let mut buf = Vec::new();
    write_fields(&mut buf, jose.view().iter())?;
    Ok(buf)
}

/// Decode canonical CBOR into a [`Jose`] object.
///
/// # Errors
///
/// Returns an error if the bytes are not a single well-formed CBOR item, or
/// the item is not a valid JWS or JWE.
pub fn decode(bytes: &[u8]) -> Result<Jose> {
    tracing::debug!("cbor::decode");

    let entries = match from_slice(bytes)? {
        Value::Map(entries) => entries,
        other => return Err(Error::wrong_kind("JOSE", Kind::Map, to_node(other)?.kind())),
    };

    let mut asm = JoseAssembler::new();
    drive(entries, &mut asm)?;
    asm.build()
}

/// The content identifier of `jose`: CIDv1 with the DAG-JOSE codec over the
/// SHA3-384 digest of its canonical encoding.
///
/// # Errors
///
/// Returns an error if the object cannot be encoded.
pub fn cid(jose: &Jose) -> Result<Cid> {
    let digest = Sha3_384::digest(encode(jose)?);
    let hash = Multihash::<64>::wrap(SHA3_384, &digest)
        .map_err(|e| anyhow!("issue wrapping digest: {e}"))?;
    Ok(Cid::new_v1(DAG_JOSE, hash))
}

/// Order map keys the way deterministic CBOR requires: shorter keys first,
/// then bytewise.
#[must_use]
pub fn canonical_order(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.as_bytes().cmp(b.as_bytes()))
}

fn from_slice(bytes: &[u8]) -> Result<Value> {
    let mut reader = Cursor::new(bytes);
    let value: Value =
        ciborium::from_reader(&mut reader).map_err(|e| Error::Cbor(e.to_string()))?;

    if usize::try_from(reader.position()).ok() != Some(bytes.len()) {
        return Err(Error::Cbor("unexpected trailing bytes".into()));
    }
    Ok(value)
}

// ---- Encoding ----

// Item heads (major type and argument) in their shortest form.
fn head(buf: &mut Vec<u8>, header: ciborium_ll::Header) -> Result<()> {
    Encoder::from(buf).push(header).map_err(|e| Error::Cbor(e.to_string()))
}

fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    head(buf, ciborium_ll::Header::Bytes(Some(bytes.len())))?;
    buf.extend_from_slice(bytes);
    Ok(())
}

fn write_text(buf: &mut Vec<u8>, text: &str) -> Result<()> {
    head(buf, ciborium_ll::Header::Text(Some(text.len())))?;
    buf.extend_from_slice(text.as_bytes());
    Ok(())
}

fn write_fields<'a>(
    buf: &mut Vec<u8>, fields: impl Iterator<Item = (&'static str, FieldValue<'a>)>,
) -> Result<()> {
    let mut fields: Vec<_> = fields.collect();
    fields.sort_by(|(a, _), (b, _)| canonical_order(a, b));

    head(buf, ciborium_ll::Header::Map(Some(fields.len())))?;
    for (key, value) in fields {
        write_text(buf, key)?;
        write_field(buf, value)?;
    }
    Ok(())
}

fn write_field(buf: &mut Vec<u8>, value: FieldValue<'_>) -> Result<()> {
    match value {
        FieldValue::Cid(cid) => write_bytes(buf, &cid.to_bytes()),
        FieldValue::Bytes(bytes) => write_bytes(buf, bytes),
        FieldValue::Header(header) => write_map(buf, header),
        FieldValue::Signatures(signatures) => {
            head(buf, ciborium_ll::Header::Array(Some(signatures.len())))?;
            signatures.iter().try_for_each(|signature| write_fields(buf, signature.fields()))
        }
        FieldValue::Recipients(recipients) => {
            head(buf, ciborium_ll::Header::Array(Some(recipients.len())))?;
            recipients.iter().try_for_each(|recipient| write_fields(buf, recipient.fields()))
        }
    }
}

fn write_map(buf: &mut Vec<u8>, map: &Header) -> Result<()> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|(a, _), (b, _)| canonical_order(a, b));

    head(buf, ciborium_ll::Header::Map(Some(entries.len())))?;
    for (key, value) in entries {
        write_text(buf, key)?;
        write_node(buf, value)?;
    }
    Ok(())
}

fn write_node(buf: &mut Vec<u8>, node: &Node) -> Result<()> {
    match node {
        Node::Null => head(buf, ciborium_ll::Header::Simple(simple::NULL)),
        Node::Bool(b) => {
            let value = if *b { simple::TRUE } else { simple::FALSE };
            head(buf, ciborium_ll::Header::Simple(value))
        }
        Node::Integer(n) => head(buf, integer(*n)?),
        Node::Float(f) => {
            if !f.is_finite() {
                return Err(Error::Cbor(format!("non-finite float: {f}")));
            }
            buf.push(FLOAT64);
            buf.extend_from_slice(&f.to_be_bytes());
            Ok(())
        }
        Node::String(s) => write_text(buf, s),
        Node::Bytes(b) => write_bytes(buf, b),
        Node::List(items) => {
            head(buf, ciborium_ll::Header::Array(Some(items.len())))?;
            items.iter().try_for_each(|item| write_node(buf, item))
        }
        Node::Map(map) => write_map(buf, map),
        Node::Link(cid) => {
            // tag 42 content is the CID prefixed with the identity multibase
            let cid = cid.to_bytes();
            head(buf, ciborium_ll::Header::Tag(CID_TAG))?;
            head(buf, ciborium_ll::Header::Bytes(Some(cid.len() + 1)))?;
            buf.push(0x00);
            buf.extend_from_slice(&cid);
            Ok(())
        }
    }
}

fn integer(n: i128) -> Result<ciborium_ll::Header> {
    if let Ok(n) = u64::try_from(n) {
        return Ok(ciborium_ll::Header::Positive(n));
    }
    // major type 1 carries -1 - n
    u64::try_from(-1 - n)
        .map(ciborium_ll::Header::Negative)
        .map_err(|_| Error::Cbor(format!("integer out of range: {n}")))
}

// ---- Decoding ----

// Feed a decoded CBOR map to the assembler one event at a time.
fn drive(entries: Vec<(Value, Value)>, asm: &mut dyn MapAssembler) -> Result<()> {
    for (key, value) in entries {
        let Value::Text(key) = key else {
            return Err(Error::Cbor("map keys must be strings".into()));
        };
        asm.assemble_key();
        asm.assign_key(&key)?;
        asm.assemble_value();

        match value {
            Value::Null => asm.assign_null()?,
            Value::Bytes(bytes) => asm.assign_bytes(bytes)?,
            Value::Text(text) => asm.assign_string(text)?,
            Value::Array(items) => {
                let mut list = asm.begin_list(items.len())?;
                for item in items {
                    let entries = match item {
                        Value::Map(entries) => entries,
                        other => {
                            return Err(Error::wrong_kind(&key, Kind::Map, to_node(other)?.kind()));
                        }
                    };
                    drive(entries, &mut *list.assemble_value())?;
                }
                list.finish();
            }
            Value::Map(entries) => {
                let mut header = asm.begin_map(entries.len())?;
                for (k, v) in entries {
                    let Value::Text(k) = k else {
                        return Err(Error::Cbor(format!("'{key}' keys must be strings")));
                    };
                    header.insert(k, to_node(v)?)?;
                }
                header.finish()?;
            }
            other => asm.assign_node(to_node(other)?)?,
        }
    }
    asm.finish()
}

/// Convert a CBOR value to a generic tree.
///
/// # Errors
///
/// Returns an error for non-string map keys, tags other than 42, malformed
/// links, and values outside the data model such as `undefined`.
pub fn to_node(value: Value) -> Result<Node> {
    let node = match value {
        Value::Null => Node::Null,
        Value::Bool(b) => Node::Bool(b),
        Value::Integer(n) => Node::Integer(i128::from(n)),
        Value::Float(f) => Node::Float(f),
        Value::Text(s) => Node::String(s),
        Value::Bytes(b) => Node::Bytes(b),
        Value::Array(items) => Node::List(items.into_iter().map(to_node).collect::<Result<_>>()?),
        Value::Map(entries) => {
            let mut map = Header::new();
            for (k, v) in entries {
                let Value::Text(k) = k else {
                    return Err(Error::Cbor("map keys must be strings".into()));
                };
                if map.insert(k.clone(), to_node(v)?).is_some() {
                    return Err(Error::RepeatedField(k));
                }
            }
            Node::Map(map)
        }
        Value::Tag(CID_TAG, inner) => {
            let Value::Bytes(bytes) = *inner else {
                return Err(Error::Cbor("tag 42 must wrap a byte string".into()));
            };
            let Some((0x00, cid)) = bytes.split_first() else {
                return Err(Error::Cbor("tag 42 must start with the identity multibase".into()));
            };
            Node::Link(Cid::try_from(cid).map_err(|e| Error::Cbor(format!("invalid link: {e}")))?)
        }
        Value::Tag(tag, _) => return Err(Error::Cbor(format!("unsupported tag: {tag}"))),
        _ => return Err(Error::Cbor("unsupported value".into())),
    };
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jose::{Jwe, Jws, Recipient, Signature};

    fn payload() -> Cid {
        Cid::new_v1(0x55, Multihash::<64>::wrap(0x12, &[9; 32]).expect("valid digest"))
    }

    fn to_vec(value: &Value) -> Vec<u8> {
        let mut bytes = Vec::new();
        ciborium::into_writer(value, &mut bytes).expect("should write CBOR");
        bytes
    }

    fn node_bytes(node: &Node) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        write_node(&mut buf, node)?;
        Ok(buf)
    }

    #[test]
    fn canonical_key_order() {
        let mut keys = vec!["recipients", "tag", "iv", "ciphertext", "aad", "protected"];
        keys.sort_by(|a, b| canonical_order(a, b));
        assert_eq!(keys, ["iv", "aad", "tag", "protected", "ciphertext", "recipients"]);
    }

    #[test]
    fn jwe_keys_are_sorted_on_the_wire() {
        let jose =
            Jose::from(Jwe::new(b"ct".to_vec()).with_iv(b"iv".to_vec()).with_aad(b"a".to_vec()));
        let bytes = encode(&jose).expect("should encode");

        let Value::Map(entries) = from_slice(&bytes).expect("valid CBOR") else {
            panic!("should be a map");
        };
        let keys: Vec<_> = entries.iter().filter_map(|(k, _)| k.as_text()).collect();
        assert_eq!(keys, ["iv", "aad", "ciphertext"]);
    }

    #[test]
    fn jws_round_trip() {
        let header = Header::from([
            ("kid".to_string(), Node::from("did:key:z6Mk#0")),
            ("n".to_string(), Node::Integer(-7)),
            ("link".to_string(), Node::Link(payload())),
        ]);
        let jose = Jose::from(
            Jws::new(payload())
                .with_signature(Signature::new(b"s1".to_vec()).with_protected(b"p1".to_vec()))
                .with_signature(Signature::new(b"s2".to_vec()).with_header(header)),
        );

        let bytes = encode(&jose).expect("should encode");
        let decoded = decode(&bytes).expect("should decode");
        assert_eq!(decoded, jose);
        assert_eq!(encode(&decoded).expect("should encode"), bytes);
    }

    #[test]
    fn jwe_round_trip() {
        let jose = Jose::from(
            Jwe::new(b"ciphertext".to_vec())
                .with_protected(b"protected".to_vec())
                .with_unprotected(Header::from([("cty".to_string(), Node::from("json"))]))
                .with_tag(b"tag".to_vec())
                .with_recipient(Recipient::new().with_encrypted_key(b"k1".to_vec()))
                .with_recipient(Recipient::new()),
        );

        let decoded = decode(&encode(&jose).expect("should encode")).expect("should decode");
        assert_eq!(decoded, jose);
    }

    #[test]
    fn invalid_payload() {
        let value = Value::Map(vec![(Value::Text("payload".into()), Value::Bytes(b"no".to_vec()))]);
        let err = decode(&to_vec(&value)).expect_err("should reject");
        assert!(err.to_string().contains("payload is not a valid CID"));
    }

    #[test]
    fn signatures_must_be_maps() {
        let value = Value::Map(vec![
            (Value::Text("payload".into()), Value::Bytes(payload().to_bytes())),
            (Value::Text("signatures".into()), Value::Array(vec![Value::Bytes(vec![1])])),
        ]);
        let err = decode(&to_vec(&value)).expect_err("should reject");
        assert_eq!(err.to_string(), "wrong kind for 'signatures': expected map, found bytes");
    }

    #[test]
    fn floats_are_always_64_bit() {
        let bytes = node_bytes(&Node::Float(0.5)).expect("should encode");
        assert_eq!(bytes, [0xfb, 0x3f, 0xe0, 0, 0, 0, 0, 0, 0]);

        let err = node_bytes(&Node::Float(f64::NAN)).expect_err("should reject");
        assert_eq!(err.to_string(), "invalid CBOR: non-finite float: NaN");
    }

    #[test]
    fn integers_use_shortest_form() {
        assert_eq!(node_bytes(&Node::Integer(23)).expect("should encode"), [0x17]);
        assert_eq!(node_bytes(&Node::Integer(24)).expect("should encode"), [0x18, 0x18]);
        assert_eq!(node_bytes(&Node::Integer(-7)).expect("should encode"), [0x26]);
        assert_eq!(node_bytes(&Node::Integer(-1000)).expect("should encode"), [0x39, 0x03, 0xe7]);

        let min = -i128::from(u64::MAX) - 1;
        assert_eq!(node_bytes(&Node::Integer(min)).expect("should encode"), [
            0x3b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff
        ]);
        assert!(node_bytes(&Node::Integer(min - 1)).is_err());
        assert!(node_bytes(&Node::Integer(i128::from(u64::MAX) + 1)).is_err());
    }

    #[test]
    fn unsupported_values_are_cbor_errors() {
        let tagged = Value::Tag(99, Box::new(Value::Bytes(vec![1])));
        let err = decode(&to_vec(&tagged)).expect_err("should reject");
        assert_eq!(err.to_string(), "invalid CBOR: unsupported tag: 99");

        let value = Value::Map(vec![
            (Value::Text("payload".into()), Value::Bytes(payload().to_bytes())),
            (Value::Text("signatures".into()), Value::Array(vec![tagged])),
        ]);
        let err = decode(&to_vec(&value)).expect_err("should reject");
        assert!(matches!(err, Error::Cbor(_)));
    }

    #[test]
    fn trailing_bytes() {
        let jose = Jose::from(Jwe::new(b"ct".to_vec()));
        let mut bytes = encode(&jose).expect("should encode");
        bytes.push(0x00);
        let err = decode(&bytes).expect_err("should reject");
        assert_eq!(err.to_string(), "invalid CBOR: unexpected trailing bytes");
    }

    #[test]
    fn cid_uses_dag_jose_and_sha3() {
        let jose = Jose::from(Jwe::new(b"ct".to_vec()));
        let cid = cid(&jose).expect("should hash");

        assert_eq!(cid.version(), cid::Version::V1);
        assert_eq!(cid.codec(), DAG_JOSE);
        assert_eq!(cid.hash().code(), SHA3_384);
        assert_eq!(cid.hash().size(), 48);
    }
}
