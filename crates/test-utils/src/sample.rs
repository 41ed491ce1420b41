//! Sample JOSE objects.

use cid::Cid;
use cid::multihash::Multihash;
use dag_jose::{Header, Jose, Jwe, Jws, Node, Recipient, Signature};
use sha3::{Digest, Sha3_256};

/// Multicodec for raw bytes.
const RAW: u64 = 0x55;

/// Multihash code for SHA3-256.
const SHA3_256: u64 = 0x16;

/// The CID of `content` as raw bytes.
///
/// # Panics
///
/// Panics if the digest cannot be wrapped as a multihash.
#[must_use]
pub fn payload_cid(content: &[u8]) -> Cid {
    let digest = Sha3_256::digest(content);
    let hash = Multihash::<64>::wrap(SHA3_256, &digest).expect("should wrap digest");
    Cid::new_v1(RAW, hash)
}

/// A protected header as it is carried on the wire.
#[must_use]
pub fn protected(alg: &str) -> Vec<u8> {
    format!(r#"{{"alg":"{alg}"}}"#).into_bytes()
}

/// An unprotected header with a key id.
#[must_use]
pub fn key_header(kid: &str) -> Header {
    Header::from([("kid".to_string(), Node::from(kid))])
}

/// A JWS with one signature carrying a protected header only.
#[must_use]
pub fn sample_jws() -> Jose {
    let signature = Signature::new(b"signature-1".to_vec()).with_protected(protected("ES256K"));
    Jose::from(Jws::new(payload_cid(b"hello world")).with_signature(signature))
}

/// A JWS with two signatures, one of which carries an unprotected header.
#[must_use]
pub fn sample_multi_jws() -> Jose {
    let first = Signature::new(b"signature-1".to_vec()).with_protected(protected("ES256K"));
    let second = Signature::new(b"signature-2".to_vec())
        .with_protected(protected("EdDSA"))
        .with_header(key_header("did:example:123#key-1"));

    Jose::from(
        Jws::new(payload_cid(b"hello world")).with_signature(first).with_signature(second),
    )
}

/// A JWE with a single recipient.
#[must_use]
pub fn sample_jwe() -> Jose {
    Jose::from(
        Jwe::new(b"ciphertext".to_vec())
            .with_protected(br#"{"enc":"A256GCM"}"#.to_vec())
            .with_iv(b"initialization-v".to_vec())
            .with_tag(b"authentication-t".to_vec())
            .with_recipient(
                Recipient::new()
                    .with_header(key_header("did:example:456#key-1"))
                    .with_encrypted_key(b"encrypted-key".to_vec()),
            ),
    )
}

/// A JWE with every field present and two recipients.
#[must_use]
pub fn sample_multi_jwe() -> Jose {
    let mut unprotected = Header::new();
    unprotected.insert("cty".to_string(), Node::from("application/json"));
    unprotected.insert("epoch".to_string(), Node::from(1_700_000_000_i64));
    unprotected.insert("parent".to_string(), Node::from(payload_cid(b"parent")));

    Jose::from(
        Jwe::new(b"ciphertext".to_vec())
            .with_protected(br#"{"enc":"A256GCM"}"#.to_vec())
            .with_unprotected(unprotected)
            .with_iv(b"initialization-v".to_vec())
            .with_aad(b"additional".to_vec())
            .with_tag(b"authentication-t".to_vec())
            .with_recipient(Recipient::new().with_encrypted_key(b"key-1".to_vec()))
            .with_recipient(
                Recipient::new()
                    .with_header(key_header("did:example:789#key-2"))
                    .with_encrypted_key(b"key-2".to_vec()),
            ),
    )
}
