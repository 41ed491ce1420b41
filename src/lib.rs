//! # DAG-JOSE
//!
//! A codec for [DAG-JOSE](https://ipld.io/specs/codecs/dag-jose/spec/): JOSE
//! objects ([JWS](https://www.rfc-editor.org/rfc/rfc7515) and
//! [JWE](https://www.rfc-editor.org/rfc/rfc7516)) stored as content-addressed
//! data.
//!
//! A signed object's payload is the content identifier (CID) of the data it
//! signs, so the signature and the data are linked. Objects are encoded to a
//! canonical binary form (multicodec `0x85`) whose bytes, and therefore CID,
//! are identical for logically equal objects.
//!
//! ```rust
//! use dag_jose::{Jose, Jwe, cbor};
//!
//! let jose = Jose::from(Jwe::new(b"ciphertext".to_vec()).with_iv(b"iv".to_vec()));
//! let bytes = cbor::encode(&jose).expect("should encode");
//! assert_eq!(cbor::decode(&bytes).expect("should decode"), jose);
//! ```
//!
//! # Feature Flags
//!
//! * `json` (default) - Enables the general, flattened and compact JSON
//!   serializations.

pub mod assemble;
pub mod cbor;
mod error;
mod jose;
#[cfg(feature = "json")]
pub mod json;
mod node;
pub mod schema;
mod view;

pub use crate::assemble::MapAssembler;
pub use crate::cbor::{DAG_JOSE, cid, decode, encode};
pub use crate::error::{Error, Result};
pub use crate::jose::{Header, Jose, JoseAssembler, Jwe, Jws, Recipient, Signature};
pub use crate::node::{Kind, Node};
pub use crate::view::{FIELD_ORDER, FieldValue, JoseView};
