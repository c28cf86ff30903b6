//! Canvas `signed_request` verification - core logic.
//!
//! Wire format: `<base64url(signature)>.<base64url(json body)>`, no padding.
//! The signature is HMAC-SHA256 over the *encoded* body segment, keyed with the
//! app secret.
//!
//! This module is pure: it knows nothing about axum or configuration, so the
//! gatekeeper and tests can call `verify` directly.

use base64::{Engine as _, engine::general_purpose::URL_SAFE};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("malformed signed_request")]
    MalformedPayload,
    #[error("signed_request signature mismatch")]
    SignatureMismatch,
}

/// Decoded claims of a verified `signed_request`.
///
/// Platform identity fields are opaque to us; they are kept as-is and passed
/// through to handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayloadBody(Map<String, Value>);

impl PayloadBody {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// `None` means the user has not completed the authorization dialog yet.
    pub fn oauth_token(&self) -> Option<&str> {
        self.get("oauth_token").and_then(Value::as_str)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.get("user_id").and_then(Value::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Verify a raw `signed_request` value against the app secret.
///
/// - exactly two non-empty segments separated by `.`
/// - signature compared in constant time
/// - body must decode to a JSON object
pub fn verify(raw: &str, secret: &[u8]) -> Result<PayloadBody, VerificationError> {
    let (encoded_sig, encoded_body) = raw
        .split_once('.')
        .ok_or(VerificationError::MalformedPayload)?;

    if encoded_sig.is_empty() || encoded_body.is_empty() || encoded_body.contains('.') {
        return Err(VerificationError::MalformedPayload);
    }

    let sig = decode_segment(encoded_sig)?;
    let body = decode_segment(encoded_body)?;

    // HMAC is computed over the encoded segment, not the decoded JSON.
    let expected = compute_signature(encoded_body.as_bytes(), secret);
    if !bool::from(expected.ct_eq(&sig)) {
        return Err(VerificationError::SignatureMismatch);
    }

    let fields: Map<String, Value> =
        serde_json::from_slice(&body).map_err(|_| VerificationError::MalformedPayload)?;

    Ok(PayloadBody(fields))
}

/// Base64url-decode one segment, restoring the `=` padding the platform strips.
fn decode_segment(segment: &str) -> Result<Vec<u8>, VerificationError> {
    let mut padded = String::with_capacity(segment.len() + 3);
    padded.push_str(segment);
    while padded.len() % 4 != 0 {
        padded.push('=');
    }

    URL_SAFE
        .decode(padded.as_bytes())
        .map_err(|_| VerificationError::MalformedPayload)
}

fn compute_signature(encoded_body: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(encoded_body);
    mac.finalize().into_bytes().to_vec()
}

/// Produce a `signed_request` the way the platform does. Test helper.
#[cfg(test)]
pub fn sign(body: &Value, secret: &[u8]) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let encoded_body = URL_SAFE_NO_PAD.encode(body.to_string().as_bytes());
    let sig = compute_signature(encoded_body.as_bytes(), secret);
    format!("{}.{}", URL_SAFE_NO_PAD.encode(sig), encoded_body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    const SECRET: &[u8] = b"app-secret";

    fn sample_body() -> Value {
        json!({
            "algorithm": "HMAC-SHA256",
            "issued_at": 1_700_000_000,
            "user_id": "100001",
            "oauth_token": "token-abc",
            "user": { "country": "jp", "locale": "ja_JP" }
        })
    }

    #[test]
    fn verify_returns_signed_body() {
        let raw = sign(&sample_body(), SECRET);

        let body = verify(&raw, SECRET).unwrap();

        assert_eq!(Value::Object(body.as_map().clone()), sample_body());
        assert_eq!(body.oauth_token(), Some("token-abc"));
        assert_eq!(body.user_id(), Some("100001"));
    }

    #[test]
    fn verify_handles_every_padding_length() {
        // Body lengths chosen so the encoded segment needs 0, 1 and 2 pad chars.
        for filler in ["", "a", "ab", "abc"] {
            let body = json!({ "f": filler });
            let raw = sign(&body, SECRET);
            let parsed = verify(&raw, SECRET).unwrap();
            assert_eq!(parsed.get("f"), Some(&json!(filler)));
        }
    }

    #[test]
    fn body_without_token_verifies() {
        let raw = sign(&json!({ "algorithm": "HMAC-SHA256" }), SECRET);

        let body = verify(&raw, SECRET).unwrap();

        assert_eq!(body.oauth_token(), None);
    }

    #[test]
    fn flipped_signature_bit_is_rejected() {
        let raw = sign(&sample_body(), SECRET);
        let (sig, body) = raw.split_once('.').unwrap();
        let mut sig = URL_SAFE_NO_PAD.decode(sig).unwrap();

        for i in 0..sig.len() * 8 {
            sig[i / 8] ^= 1 << (i % 8);
            let tampered = format!("{}.{}", URL_SAFE_NO_PAD.encode(&sig), body);
            assert_eq!(
                verify(&tampered, SECRET),
                Err(VerificationError::SignatureMismatch)
            );
            sig[i / 8] ^= 1 << (i % 8);
        }
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let raw = sign(&sample_body(), b"other-secret");

        assert_eq!(verify(&raw, SECRET), Err(VerificationError::SignatureMismatch));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let raw = sign(&sample_body(), SECRET);
        let (sig, _) = raw.split_once('.').unwrap();
        let forged = URL_SAFE_NO_PAD.encode(json!({ "oauth_token": "stolen" }).to_string());

        assert_eq!(
            verify(&format!("{sig}.{forged}"), SECRET),
            Err(VerificationError::SignatureMismatch)
        );
    }

    #[test]
    fn truncated_signature_is_rejected() {
        let raw = sign(&sample_body(), SECRET);
        let (sig, body) = raw.split_once('.').unwrap();
        let short = URL_SAFE_NO_PAD.encode(&URL_SAFE_NO_PAD.decode(sig).unwrap()[..16]);

        assert_eq!(
            verify(&format!("{short}.{body}"), SECRET),
            Err(VerificationError::SignatureMismatch)
        );
    }

    #[test]
    fn missing_separator_is_malformed() {
        let raw = sign(&sample_body(), SECRET).replace('.', "");

        assert_eq!(verify(&raw, SECRET), Err(VerificationError::MalformedPayload));
        assert_eq!(verify("", SECRET), Err(VerificationError::MalformedPayload));
    }

    #[test]
    fn empty_segments_are_malformed() {
        let raw = sign(&sample_body(), SECRET);
        let (sig, body) = raw.split_once('.').unwrap();

        assert_eq!(
            verify(&format!(".{body}"), SECRET),
            Err(VerificationError::MalformedPayload)
        );
        assert_eq!(
            verify(&format!("{sig}."), SECRET),
            Err(VerificationError::MalformedPayload)
        );
    }

    #[test]
    fn extra_segment_is_malformed() {
        let raw = sign(&sample_body(), SECRET);

        assert_eq!(
            verify(&format!("{raw}.extra"), SECRET),
            Err(VerificationError::MalformedPayload)
        );
    }

    #[test]
    fn invalid_base64_is_malformed() {
        assert_eq!(
            verify("not*base64.eyJhIjoxfQ", SECRET),
            Err(VerificationError::MalformedPayload)
        );
        // A single trailing sextet can never be valid base64.
        assert_eq!(
            verify("abcde.eyJhIjoxfQ", SECRET),
            Err(VerificationError::MalformedPayload)
        );
    }

    #[test]
    fn signed_non_json_body_is_malformed() {
        let encoded_body = URL_SAFE_NO_PAD.encode(b"not json");
        let sig = compute_signature(encoded_body.as_bytes(), SECRET);
        let raw = format!("{}.{}", URL_SAFE_NO_PAD.encode(sig), encoded_body);

        assert_eq!(verify(&raw, SECRET), Err(VerificationError::MalformedPayload));
    }

    #[test]
    fn signed_non_object_json_is_malformed() {
        let raw = sign(&json!(["oauth_token", "x"]), SECRET);

        assert_eq!(verify(&raw, SECRET), Err(VerificationError::MalformedPayload));
    }

    #[test]
    fn non_string_token_is_treated_as_absent() {
        let raw = sign(&json!({ "oauth_token": 42 }), SECRET);

        let body = verify(&raw, SECRET).unwrap();

        assert_eq!(body.oauth_token(), None);
    }

    mod proptests {
        use super::*;
        use base64::Engine as _;
        use proptest::prelude::*;

        // Floats are left out: serde_json does not promise an exact f64 round-trip.
        fn arb_json() -> impl Strategy<Value = Value> {
            let leaf = prop_oneof![
                Just(Value::Null),
                any::<bool>().prop_map(Value::from),
                any::<i64>().prop_map(Value::from),
                ".{0,24}".prop_map(Value::from),
            ];
            leaf.prop_recursive(3, 32, 6, |inner| {
                prop_oneof![
                    prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                    prop::collection::btree_map(".{0,12}", inner, 0..6)
                        .prop_map(|m| Value::Object(m.into_iter().collect())),
                ]
            })
        }

        fn arb_body() -> impl Strategy<Value = Value> {
            prop::collection::btree_map(".{0,12}", arb_json(), 0..8)
                .prop_map(|m| Value::Object(m.into_iter().collect()))
        }

        fn arb_secret() -> impl Strategy<Value = Vec<u8>> {
            prop::collection::vec(any::<u8>(), 0..64)
        }

        proptest! {
            /// Any object signed with the secret verifies back to the same object.
            #[test]
            fn proptest_signed_body_round_trips(body in arb_body(), secret in arb_secret()) {
                let raw = sign(&body, &secret);

                let parsed = verify(&raw, &secret).expect("signed body should verify");

                prop_assert_eq!(Value::Object(parsed.as_map().clone()), body);
            }

            /// Flipping any single signature bit is a mismatch.
            #[test]
            fn proptest_any_signature_bit_flip_is_rejected(
                body in arb_body(),
                secret in arb_secret(),
                bit in 0usize..256,
            ) {
                let raw = sign(&body, &secret);
                let (sig, encoded_body) = raw.split_once('.').unwrap();
                let mut sig = URL_SAFE_NO_PAD.decode(sig).unwrap();
                sig[bit / 8] ^= 1 << (bit % 8);
                let tampered = format!("{}.{}", URL_SAFE_NO_PAD.encode(&sig), encoded_body);

                prop_assert_eq!(
                    verify(&tampered, &secret),
                    Err(VerificationError::SignatureMismatch)
                );
            }

            /// A value with no `.` is malformed whatever the secret.
            #[test]
            fn proptest_value_without_separator_is_malformed(
                raw in "[^.]{0,128}",
                secret in arb_secret(),
            ) {
                prop_assert_eq!(verify(&raw, &secret), Err(VerificationError::MalformedPayload));
            }

            /// A signature made with another secret never verifies.
            // Equal-length keys: HMAC zero-pads short keys, so `k` and `k\0` collide.
            #[test]
            fn proptest_other_secret_is_rejected(
                body in arb_body(),
                secret in prop::collection::vec(any::<u8>(), 32),
                other in prop::collection::vec(any::<u8>(), 32),
            ) {
                prop_assume!(secret != other);

                prop_assert_eq!(
                    verify(&sign(&body, &other), &secret),
                    Err(VerificationError::SignatureMismatch)
                );
            }
        }
    }
}
