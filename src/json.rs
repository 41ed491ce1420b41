//! # JSON Serializations
//!
//! Converts [`Jose`] objects to and from the JSON serializations defined by
//! [RFC7515] (JWS) and [RFC7516] (JWE): the general form, the flattened form
//! for single-signature or single-recipient objects, and the compact form.
//!
//! Byte members are base64url encoded without padding. Header values keep
//! their JSON types, except that byte strings are rendered as base64url
//! strings and links as `{"/": "<cid>"}`.
//!
//! Parsing normalizes every shape to the general form and hands it to the
//! same assembler used for CBOR, so both paths apply identical validation.
//! Unrecognized members are ignored.
//!
//! [RFC7515]: https://www.rfc-editor.org/rfc/rfc7515
//! [RFC7516]: https://www.rfc-editor.org/rfc/rfc7516

use anyhow::anyhow;
use base64ct::{Base64UrlUnpadded, Encoding};
use cid::Cid;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value, json};

use crate::error::{Error, Result};
use crate::jose::{Header, Jose, Jwe, Recipient, Signature};
use crate::node::Node;

/// JOSE members as they appear in any of the JSON shapes.
#[derive(Debug, Default, Deserialize, Serialize)]
struct JsonJose {
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    signatures: Option<Vec<JsonSignature>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    protected: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    header: Option<Map<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    unprotected: Option<Map<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    iv: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    aad: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    ciphertext: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    recipients: Option<Vec<JsonRecipient>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    encrypted_key: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct JsonSignature {
    #[serde(skip_serializing_if = "Option::is_none")]
    protected: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    header: Option<Map<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct JsonRecipient {
    #[serde(skip_serializing_if = "Option::is_none")]
    header: Option<Map<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    encrypted_key: Option<String>,
}

// ---- Discriminators ----

/// Returns `true` if `value` carries a `payload` member.
///
/// # Errors
///
/// Returns an error if `value` is not a JSON object, or `payload` is not a
/// string.
pub fn is_jws(value: &Value) -> Result<bool> {
    has_member(value, "payload")
}

/// Returns `true` if `value` carries a `ciphertext` member.
///
/// # Errors
///
/// Returns an error if `value` is not a JSON object, or `ciphertext` is not a
/// string.
pub fn is_jwe(value: &Value) -> Result<bool> {
    has_member(value, "ciphertext")
}

fn has_member(value: &Value, member: &str) -> Result<bool> {
    let Value::Object(object) = value else {
        return Err(Error::InvalidJose("expected a JSON object".into()));
    };
    match object.get(member) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::String(_)) => Ok(true),
        Some(_) => Err(Error::InvalidJose(format!("'{member}' must be a base64url string"))),
    }
}

// ---- Parsing ----

/// Parse a general or flattened JSON serialization.
///
/// # Errors
///
/// Returns an error if the text is not JSON, or does not describe a valid
/// JWS or JWE.
pub fn from_json(json: &str) -> Result<Jose> {
    from_value(serde_json::from_str(json)?)
}

/// Parse a general or flattened JSON serialization that has already been
/// read into a [`Value`].
///
/// # Errors
///
/// Returns an error if `value` does not describe a valid JWS or JWE.
pub fn from_value(value: Value) -> Result<Jose> {
    tracing::debug!("json::from_value");

    let jws = is_jws(&value)?;
    let jwe = is_jwe(&value)?;
    let json: JsonJose = serde_json::from_value(value)?;

    match (jws, jwe) {
        (true, true) => {
            Err(Error::InvalidJose("cannot contain both a 'payload' and a 'ciphertext'".into()))
        }
        (true, false) => unflatten_jws(json),
        (false, true) => unflatten_jwe(json),
        (false, false) => {
            // let the matching shape report its missing mandatory member
            if json.signatures.is_some() || json.signature.is_some() {
                return unflatten_jws(json);
            }
            if json.recipients.is_some()
                || json.encrypted_key.is_some()
                || json.iv.is_some()
                || json.tag.is_some()
            {
                return unflatten_jwe(json);
            }
            Err(Error::InvalidJose("must contain either a 'payload' or a 'ciphertext'".into()))
        }
    }
}

fn unflatten_jws(json: JsonJose) -> Result<Jose> {
    if json.signatures.is_some() {
        if json.signature.is_some() {
            return Err(Error::InvalidJws(
                "cannot contain both a 'signature' and a 'signatures'".into(),
            ));
        }
        if json.protected.is_some() || json.header.is_some() {
            return Err(Error::InvalidJws(
                "cannot contain 'protected' or 'header' alongside 'signatures'".into(),
            ));
        }
    }
    if let Some(name) = jwe_member(&json) {
        return Err(Error::InvalidJws(format!("cannot contain JWE member '{name}'")));
    }
    let Some(payload) = json.payload else {
        return Err(Error::MissingField("payload".into()));
    };

    let signatures = match json.signatures {
        Some(signatures) if signatures.is_empty() => {
            return Err(Error::InvalidJws("must contain at least one signature".into()));
        }
        Some(signatures) => signatures,
        None => vec![JsonSignature {
            protected: json.protected,
            header: json.header,
            signature: json.signature,
        }],
    };

    let mut map = Header::new();
    map.insert("payload".into(), Node::Bytes(decode("payload", &payload)?));
    let signatures = signatures.into_iter().map(JsonSignature::into_node).collect::<Result<_>>()?;
    map.insert("signatures".into(), Node::List(signatures));

    Jose::from_node(Node::Map(map))
}

fn jwe_member(json: &JsonJose) -> Option<&'static str> {
    [
        ("unprotected", json.unprotected.is_some()),
        ("iv", json.iv.is_some()),
        ("aad", json.aad.is_some()),
        ("tag", json.tag.is_some()),
        ("recipients", json.recipients.is_some()),
        ("encrypted_key", json.encrypted_key.is_some()),
    ]
    .into_iter()
    .find_map(|(name, present)| present.then_some(name))
}

fn unflatten_jwe(json: JsonJose) -> Result<Jose> {
    if json.recipients.is_some() && (json.encrypted_key.is_some() || json.header.is_some()) {
        return Err(Error::InvalidJwe(
            "cannot contain 'recipients' and either 'encrypted_key' or 'header'".into(),
        ));
    }
    if json.signatures.is_some() {
        return Err(Error::InvalidJwe("cannot contain 'signatures'".into()));
    }
    if json.signature.is_some() {
        return Err(Error::InvalidJwe("cannot contain 'signature'".into()));
    }
    let Some(ciphertext) = json.ciphertext else {
        return Err(Error::MissingField("ciphertext".into()));
    };

    let recipients = match json.recipients {
        Some(recipients) => Some(recipients),
        None if json.header.is_some() || json.encrypted_key.is_some() => Some(vec![JsonRecipient {
            header: json.header,
            encrypted_key: json.encrypted_key,
        }]),
        None => None,
    };

    let mut map = Header::new();
    insert_bytes(&mut map, "protected", json.protected)?;
    insert_header(&mut map, "unprotected", json.unprotected)?;
    insert_bytes(&mut map, "iv", json.iv)?;
    insert_bytes(&mut map, "aad", json.aad)?;
    insert_bytes(&mut map, "ciphertext", Some(ciphertext))?;
    insert_bytes(&mut map, "tag", json.tag)?;
    if let Some(recipients) = recipients {
        let recipients =
            recipients.into_iter().map(JsonRecipient::into_node).collect::<Result<_>>()?;
        map.insert("recipients".into(), Node::List(recipients));
    }

    Jose::from_node(Node::Map(map))
}

impl JsonSignature {
    fn into_node(self) -> Result<Node> {
        let mut map = Header::new();
        insert_bytes(&mut map, "protected", self.protected)?;
        insert_header(&mut map, "header", self.header)?;
        insert_bytes(&mut map, "signature", self.signature)?;
        Ok(Node::Map(map))
    }
}

impl JsonRecipient {
    fn into_node(self) -> Result<Node> {
        let mut map = Header::new();
        insert_header(&mut map, "header", self.header)?;
        insert_bytes(&mut map, "encrypted_key", self.encrypted_key)?;
        Ok(Node::Map(map))
    }
}

fn insert_bytes(map: &mut Header, field: &str, value: Option<String>) -> Result<()> {
    if let Some(value) = value {
        map.insert(field.into(), Node::Bytes(decode(field, &value)?));
    }
    Ok(())
}

fn insert_header(map: &mut Header, field: &str, value: Option<Map<String, Value>>) -> Result<()> {
    if let Some(value) = value {
        map.insert(field.into(), Node::Map(header_from_json(value)?));
    }
    Ok(())
}

// ---- Serialization ----

/// Render `jose` in the general JSON serialization.
///
/// # Errors
///
/// Returns an error if a JWS has no signatures, or a header holds a value
/// JSON cannot represent.
pub fn general_json(jose: &Jose) -> Result<String> {
    Ok(serde_json::to_string(&general(jose)?)?)
}

/// Render `jose` in the general JSON serialization as a [`Value`].
///
/// # Errors
///
/// See [`general_json`].
pub fn to_general_value(jose: &Jose) -> Result<Value> {
    Ok(serde_json::to_value(general(jose)?)?)
}

/// Render `jose` in the flattened JSON serialization.
///
/// # Errors
///
/// Returns [`Error::Flatten`] for a JWS with more than one signature, or a
/// JWE with more than one recipient or a present but empty recipient list.
pub fn flattened_json(jose: &Jose) -> Result<String> {
    Ok(serde_json::to_string(&flattened(jose)?)?)
}

/// Render `jose` in the flattened JSON serialization as a [`Value`].
///
/// # Errors
///
/// See [`flattened_json`].
pub fn to_flattened_value(jose: &Jose) -> Result<Value> {
    Ok(serde_json::to_value(flattened(jose)?)?)
}

fn general(jose: &Jose) -> Result<JsonJose> {
    tracing::debug!("json::general");

    match jose {
        Jose::Jws(jws) => {
            let signatures = jws.signatures().unwrap_or_default();
            if signatures.is_empty() {
                return Err(Error::InvalidJws("must contain at least one signature".into()));
            }
            let signatures =
                signatures.iter().map(JsonSignature::try_from).collect::<Result<_>>()?;
            Ok(JsonJose {
                payload: Some(encode(&jws.payload().to_bytes())),
                signatures: Some(signatures),
                ..JsonJose::default()
            })
        }
        Jose::Jwe(jwe) => {
            let mut json = JsonJose::try_from(jwe)?;
            if let Some(recipients) = jwe.recipients() {
                let recipients =
                    recipients.iter().map(JsonRecipient::try_from).collect::<Result<_>>()?;
                json.recipients = Some(recipients);
            }
            Ok(json)
        }
    }
}

fn flattened(jose: &Jose) -> Result<JsonJose> {
    tracing::debug!("json::flattened");

    match jose {
        Jose::Jws(jws) => {
            let signature = match jws.signatures().unwrap_or_default() {
                [signature] => JsonSignature::try_from(signature)?,
                [] => return Err(Error::InvalidJws("must contain at least one signature".into())),
                _ => return Err(Error::Flatten("a JWS with more than one signature".into())),
            };
            Ok(JsonJose {
                payload: Some(encode(&jws.payload().to_bytes())),
                protected: signature.protected,
                header: signature.header,
                signature: signature.signature,
                ..JsonJose::default()
            })
        }
        Jose::Jwe(jwe) => {
            let mut json = JsonJose::try_from(jwe)?;
            match jwe.recipients() {
                None => {}
                Some([recipient]) => {
                    let recipient = JsonRecipient::try_from(recipient)?;
                    json.header = recipient.header;
                    json.encrypted_key = recipient.encrypted_key;
                }
                Some([]) => return Err(Error::Flatten("a JWE with an empty recipient list".into())),
                Some(_) => return Err(Error::Flatten("a JWE with more than one recipient".into())),
            }
            Ok(json)
        }
    }
}

// shared JWE members, without recipients
impl TryFrom<&Jwe> for JsonJose {
    type Error = Error;

    fn try_from(jwe: &Jwe) -> Result<Self> {
        Ok(Self {
            protected: jwe.protected().map(encode),
            unprotected: jwe.unprotected().map(header_to_json).transpose()?,
            iv: jwe.iv().map(encode),
            aad: jwe.aad().map(encode),
            ciphertext: Some(encode(jwe.ciphertext())),
            tag: jwe.tag().map(encode),
            ..Self::default()
        })
    }
}

impl TryFrom<&Signature> for JsonSignature {
    type Error = Error;

    fn try_from(signature: &Signature) -> Result<Self> {
        Ok(Self {
            protected: signature.protected().map(encode),
            header: signature.header().map(header_to_json).transpose()?,
            signature: Some(encode(signature.signature())),
        })
    }
}

impl TryFrom<&Recipient> for JsonRecipient {
    type Error = Error;

    fn try_from(recipient: &Recipient) -> Result<Self> {
        Ok(Self {
            header: recipient.header().map(header_to_json).transpose()?,
            encrypted_key: recipient.encrypted_key().map(encode),
        })
    }
}

// ---- Compact ----

/// Render `jose` in the compact serialization.
///
/// A JWS needs exactly one signature, with a protected header and no
/// unprotected header. A JWE needs a protected header, no shared unprotected
/// header, no additional authenticated data, and either no recipient list or
/// exactly one recipient without a header.
///
/// # Errors
///
/// Returns [`Error::Compact`] when the object cannot be expressed compactly.
pub fn compact(jose: &Jose) -> Result<String> {
    tracing::debug!("json::compact");

    match jose {
        Jose::Jws(jws) => {
            let Some([signature]) = jws.signatures() else {
                return Err(Error::Compact("a JWS without exactly one signature".into()));
            };
            let Some(protected) = signature.protected() else {
                return Err(Error::Compact("a JWS signature without a protected header".into()));
            };
            if signature.header().is_some() {
                return Err(Error::Compact("a JWS signature with an unprotected header".into()));
            }
            Ok(format!(
                "{}.{}.{}",
                encode(protected),
                encode(&jws.payload().to_bytes()),
                encode(signature.signature())
            ))
        }
        Jose::Jwe(jwe) => {
            let Some(protected) = jwe.protected() else {
                return Err(Error::Compact("a JWE without a protected header".into()));
            };
            if jwe.unprotected().is_some() {
                return Err(Error::Compact("a JWE with a shared unprotected header".into()));
            }
            if jwe.aad().is_some() {
                return Err(Error::Compact("a JWE with additional authenticated data".into()));
            }
            let encrypted_key = match jwe.recipients() {
                None => None,
                Some([recipient]) if recipient.header().is_none() => recipient.encrypted_key(),
                Some([_]) => {
                    return Err(Error::Compact("a JWE recipient with an unprotected header".into()));
                }
                Some([]) => return Err(Error::Compact("a JWE with an empty recipient list".into())),
                Some(_) => return Err(Error::Compact("a JWE with more than one recipient".into())),
            };

            let parts =
                [Some(protected), encrypted_key, jwe.iv(), Some(jwe.ciphertext()), jwe.tag()];
            let parts: Vec<String> =
                parts.into_iter().map(|part| part.map(encode).unwrap_or_default()).collect();
            Ok(parts.join("."))
        }
    }
}

/// Parse a compact serialization: three parts for a JWS, five for a JWE.
///
/// # Errors
///
/// Returns an error if the part count is wrong, a part is not base64url, or
/// the parts do not form a valid JWS or JWE.
pub fn from_compact(compact: &str) -> Result<Jose> {
    tracing::debug!("json::from_compact");

    let parts: Vec<&str> = compact.split('.').collect();
    let mut map = Header::new();

    match parts.as_slice() {
        [protected, payload, signature] => {
            let mut entry = Header::new();
            entry.insert("protected".into(), Node::Bytes(decode("protected", protected)?));
            entry.insert("signature".into(), Node::Bytes(decode("signature", signature)?));

            map.insert("payload".into(), Node::Bytes(decode("payload", payload)?));
            map.insert("signatures".into(), Node::List(vec![Node::Map(entry)]));
        }
        [protected, encrypted_key, iv, ciphertext, tag] => {
            if protected.is_empty() {
                return Err(Error::MissingField("protected".into()));
            }
            map.insert("protected".into(), Node::Bytes(decode("protected", protected)?));
            map.insert("ciphertext".into(), Node::Bytes(decode("ciphertext", ciphertext)?));
            insert_part(&mut map, "iv", iv)?;
            insert_part(&mut map, "tag", tag)?;

            let mut recipient = Header::new();
            insert_part(&mut recipient, "encrypted_key", encrypted_key)?;
            if !recipient.is_empty() {
                map.insert("recipients".into(), Node::List(vec![Node::Map(recipient)]));
            }
        }
        _ => {
            return Err(Error::InvalidJose(format!(
                "compact serialization has {} parts, expected 3 or 5",
                parts.len()
            )));
        }
    }

    Jose::from_node(Node::Map(map))
}

// empty compact parts are absent
fn insert_part(map: &mut Header, field: &str, part: &str) -> Result<()> {
    if !part.is_empty() {
        map.insert(field.into(), Node::Bytes(decode(field, part)?));
    }
    Ok(())
}

// ---- Values ----

fn encode(bytes: &[u8]) -> String {
    Base64UrlUnpadded::encode_string(bytes)
}

fn decode(field: &str, value: &str) -> Result<Vec<u8>> {
    Base64UrlUnpadded::decode_vec(value).map_err(|e| Error::Base64 {
        field: field.into(),
        message: e.to_string(),
    })
}

fn header_from_json(map: Map<String, Value>) -> Result<Header> {
    map.into_iter().map(|(key, value)| Ok((key, json_to_node(value)?))).collect()
}

fn header_to_json(header: &Header) -> Result<Map<String, Value>> {
    header.iter().map(|(key, value)| Ok((key.clone(), node_to_json(value)?))).collect()
}

/// Convert a JSON header value to a generic tree.
///
/// An object whose only member is `"/"` holding a string is read as a link.
///
/// # Errors
///
/// Returns an error if a link does not hold a valid CID.
pub fn json_to_node(value: Value) -> Result<Node> {
    let node = match value {
        Value::Null => Node::Null,
        Value::Bool(b) => Node::Bool(b),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => Node::Integer(i.into()),
            (None, Some(u), _) => Node::Integer(u.into()),
            (None, None, Some(f)) => Node::Float(f),
            (None, None, None) => return Err(anyhow!("unsupported number: {n}").into()),
        },
        Value::String(s) => Node::String(s),
        Value::Array(items) => {
            Node::List(items.into_iter().map(json_to_node).collect::<Result<_>>()?)
        }
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(link)) = map.get("/") {
                    let cid = Cid::try_from(link.as_str())
                        .map_err(|e| anyhow!("invalid link '{link}': {e}"))?;
                    return Ok(Node::Link(cid));
                }
            }
            Node::Map(header_from_json(map)?)
        }
    };
    Ok(node)
}

/// Convert a generic tree to a JSON header value.
///
/// # Errors
///
/// Returns an error for integers outside the 64-bit range and non-finite
/// floats.
pub fn node_to_json(node: &Node) -> Result<Value> {
    let value = match node {
        Node::Null => Value::Null,
        Node::Bool(b) => Value::Bool(*b),
        Node::Integer(n) => {
            if let Ok(i) = i64::try_from(*n) {
                Value::from(i)
            } else if let Ok(u) = u64::try_from(*n) {
                Value::from(u)
            } else {
                return Err(anyhow!("integer out of range: {n}").into());
            }
        }
        Node::Float(f) => {
            Value::Number(Number::from_f64(*f).ok_or_else(|| anyhow!("non-finite float: {f}"))?)
        }
        Node::String(s) => Value::String(s.clone()),
        Node::Bytes(bytes) => Value::String(encode(bytes)),
        Node::List(items) => Value::Array(items.iter().map(node_to_json).collect::<Result<_>>()?),
        Node::Map(entries) => Value::Object(header_to_json(entries)?),
        Node::Link(cid) => json!({ "/": cid.to_string() }),
    };
    Ok(value)
}
