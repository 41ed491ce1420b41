//! # DAG-JOSE Errors
//!
//! Data validation errors raised while assembling, encoding, or decoding a
//! JOSE object. Each variant names the offending field so callers can report
//! it directly.
//!
//! Misuse of the assembler protocol (calling it out of sequence) is not an
//! error: it is a bug in the driving decoder and panics instead.

use thiserror::Error;

use crate::node::Kind;

/// Result type for DAG-JOSE operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// DAG-JOSE error codes.
#[derive(Error, Debug)]
pub enum Error {
    /// The key is not a field of the schema being assembled.
    #[error("no such field: {type_name}.{field}")]
    NoSuchField {
        /// Name of the schema type.
        type_name: &'static str,
        /// The unrecognized key.
        field: String,
    },

    /// The same key occurred more than once in a single map.
    #[error("repeated map key: {0}")]
    RepeatedField(String),

    /// A value of the wrong kind was supplied for a field.
    #[error("wrong kind for '{field}': expected {expected}, found {actual}")]
    WrongKind {
        /// The field (or type) that received the value.
        field: String,
        /// The kind the field accepts.
        expected: Kind,
        /// The kind that was supplied.
        actual: Kind,
    },

    /// The payload bytes do not parse as a content identifier.
    #[error("payload is not a valid CID: {0}")]
    InvalidCid(String),

    /// A mandatory field is absent.
    #[error("missing required field: '{0}'")]
    MissingField(String),

    /// The object is not a well-formed JWS.
    #[error("invalid JWS serialization: {0}")]
    InvalidJws(String),

    /// The object is not a well-formed JWE.
    #[error("invalid JWE serialization: {0}")]
    InvalidJwe(String),

    /// The object is neither a JWS nor a JWE.
    #[error("invalid JOSE object: {0}")]
    InvalidJose(String),

    /// The object cannot be expressed in the flattened JSON serialization.
    #[error("cannot create a flattened serialization for {0}")]
    Flatten(String),

    /// The object cannot be expressed in the compact serialization.
    #[error("cannot create a compact serialization for {0}")]
    Compact(String),

    /// A base64url-encoded member could not be decoded.
    #[error("issue decoding '{field}': {message}")]
    Base64 {
        /// The member holding the bad value.
        field: String,
        /// Decoder message.
        message: String,
    },

    /// CBOR input is malformed, or a value has no canonical CBOR form.
    #[error("invalid CBOR: {0}")]
    Cbor(String),

    /// JSON (de)serialization failed.
    #[cfg(feature = "json")]
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Other, unspecified errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Shorthand for a [`Error::WrongKind`] error.
    pub(crate) fn wrong_kind(field: impl Into<String>, expected: Kind, actual: Kind) -> Self {
        Self::WrongKind {
            field: field.into(),
            expected,
            actual,
        }
    }
}
