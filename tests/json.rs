//! Tests for the JSON serializations.

#![cfg(feature = "json")]

use dag_jose::json::{self, compact, flattened_json, from_compact, from_json, general_json};
use dag_jose::{Error, Jose, Jwe, Recipient};
use insta::assert_json_snapshot;
use rstest::rstest;
use serde_json::json;
use test_utils::sample;

#[rstest]
#[case::jws(sample::sample_jws)]
#[case::multi_jws(sample::sample_multi_jws)]
#[case::jwe(sample::sample_jwe)]
#[case::multi_jwe(sample::sample_multi_jwe)]
fn general_round_trip(#[case] sample: fn() -> Jose) {
    test_utils::init_tracer();
    let jose = sample();

    let text = general_json(&jose).expect("should serialize");
    let parsed = from_json(&text).expect("should parse");
    assert_eq!(parsed, jose);

    // JSON and CBOR agree on the content identifier
    assert_eq!(
        dag_jose::cid(&parsed).expect("should hash"),
        dag_jose::cid(&jose).expect("should hash")
    );
}

#[rstest]
#[case::jws(sample::sample_jws)]
#[case::jwe(sample::sample_jwe)]
fn flattened_round_trip(#[case] sample: fn() -> Jose) {
    test_utils::init_tracer();
    let jose = sample();

    let text = flattened_json(&jose).expect("should serialize");
    assert_eq!(from_json(&text).expect("should parse"), jose);
}

#[rstest]
#[case::jws(sample::sample_multi_jws, "a JWS with more than one signature")]
#[case::jwe(sample::sample_multi_jwe, "a JWE with more than one recipient")]
fn cannot_flatten(#[case] sample: fn() -> Jose, #[case] reason: &str) {
    test_utils::init_tracer();

    let Err(Error::Flatten(message)) = flattened_json(&sample()) else {
        panic!("should not flatten");
    };
    assert_eq!(message, reason);
}

#[test]
fn general_jws_shape() {
    test_utils::init_tracer();

    let value = json::to_general_value(&sample::sample_jws()).expect("should serialize");
    assert_json_snapshot!(value, @r#"
    {
      "payload": "AVUWIGRLzH5WQ3MECZmqyJ52IvPKcfuh2XL9lKMcO_vyTjk4",
      "signatures": [
        {
          "protected": "eyJhbGciOiJFUzI1NksifQ",
          "signature": "c2lnbmF0dXJlLTE"
        }
      ]
    }
    "#);
}

#[test]
fn header_link_survives_json() {
    test_utils::init_tracer();

    let jose = sample::sample_multi_jwe();
    let value = json::to_general_value(&jose).expect("should serialize");
    let parent = sample::payload_cid(b"parent").to_string();

    assert_eq!(value["unprotected"]["parent"], json!({ "/": parent }));
    assert_eq!(value["unprotected"]["epoch"], json!(1_700_000_000));
    assert_eq!(json::from_value(value).expect("should parse"), jose);
}

#[test]
fn compact_jws_round_trip() {
    test_utils::init_tracer();
    let jose = sample::sample_jws();

    let text = compact(&jose).expect("should serialize");
    assert_eq!(text.split('.').count(), 3);
    assert_eq!(from_compact(&text).expect("should parse"), jose);
}

#[test]
fn compact_jwe_round_trip() {
    test_utils::init_tracer();
    let jose = Jose::from(
        Jwe::new(b"ciphertext".to_vec())
            .with_protected(br#"{"alg":"ECDH-ES","enc":"A256GCM"}"#.to_vec())
            .with_iv(b"iv".to_vec())
            .with_tag(b"tag".to_vec()),
    );

    let text = compact(&jose).expect("should serialize");
    assert_eq!(text.split('.').nth(1), Some(""));
    assert_eq!(from_compact(&text).expect("should parse"), jose);
}

#[rstest]
#[case::multiple_signatures(sample::sample_multi_jws)]
#[case::recipient_header(sample::sample_jwe)]
#[case::shared_header(sample::sample_multi_jwe)]
fn cannot_compact(#[case] sample: fn() -> Jose) {
    test_utils::init_tracer();
    assert!(matches!(compact(&sample()), Err(Error::Compact(_))));
}

#[test]
fn compact_recipient_has_no_header() {
    test_utils::init_tracer();
    let jose = Jose::from(
        Jwe::new(b"ct".to_vec())
            .with_protected(b"{}".to_vec())
            .with_recipient(Recipient::new().with_encrypted_key(b"key".to_vec())),
    );

    let text = compact(&jose).expect("should serialize");
    let parsed = from_compact(&text).expect("should parse");
    let jwe = parsed.as_jwe().expect("should be a JWE");
    let recipients = jwe.recipients().expect("should have recipients");
    assert_eq!(recipients.len(), 1);
    assert!(recipients[0].header().is_none());
}

#[test]
fn discriminators_are_total() {
    test_utils::init_tracer();

    for value in [
        json!({}),
        json!({ "payload": "AA" }),
        json!({ "ciphertext": "AA" }),
        json!({ "payload": null }),
        json!({ "unrelated": 1 }),
    ] {
        assert!(json::is_jws(&value).is_ok());
        assert!(json::is_jwe(&value).is_ok());
    }
    assert!(json::is_jws(&json!({ "payload": [] })).is_err());
    assert!(json::is_jwe(&json!({ "ciphertext": {} })).is_err());
}

#[test]
fn both_payload_and_ciphertext() {
    test_utils::init_tracer();

    let err = from_json(r#"{"payload":"AA","ciphertext":"AA"}"#).expect_err("should reject");
    assert!(matches!(err, Error::InvalidJose(_)));
}

#[test]
fn malformed_text() {
    test_utils::init_tracer();
    assert!(matches!(from_json("{"), Err(Error::Json(_))));
}
