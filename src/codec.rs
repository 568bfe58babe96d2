//! Encoding/decoding of the signed session token.
//!
//! The on-wire shape is `payload.signature`: `payload` is the URL-safe base64 encoding of a
//! versioned JSON envelope around the session data, and `signature` is the URL-safe base64
//! encoding of an HMAC-SHA256 tag over the payload text. The base64 alphabet cannot produce
//! `.`, so the delimiter is unambiguous.
//!
//! Note: the on-wire format is versioned, but it is still considered an implementation detail
//! and may evolve.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::{Error, Secret, SessionData};

type HmacSha256 = Hmac<Sha256>;

const VERSION: u8 = 1;
const DELIMITER: char = '.';

/// Default ceiling on the encoded token, matching the common per-cookie limit browsers
/// enforce.
pub const DEFAULT_MAX_TOKEN_BYTES: usize = 4096;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    v: u8,
    data: SessionData,
}

/// Why an incoming token was rejected. Server-side diagnostics only: every variant maps to
/// the same observable outcome (an empty session), so clients get no oracle for how close a
/// forgery came.
#[derive(Debug, Error)]
pub(crate) enum DecodeError {
    #[error("token does not split into payload and signature")]
    Malformed,
    #[error("signature verification failed")]
    SignatureMismatch,
    #[error("payload does not deserialize: {0}")]
    Payload(String),
    #[error("unsupported token version: {0}")]
    Version(u8),
}

/// Converts between [`SessionData`] and the tamper-evident cookie value.
///
/// Pure and stateless: safe to clone into every request handler and call concurrently. The
/// client can always read the payload (it is only base64), but cannot undetectably alter it
/// without the secret.
#[derive(Debug, Clone)]
pub struct SignedSessionCodec {
    secret: Secret,
    max_token_bytes: usize,
}

impl SignedSessionCodec {
    #[must_use]
    pub fn new(secret: Secret) -> Self {
        Self {
            secret,
            max_token_bytes: DEFAULT_MAX_TOKEN_BYTES,
        }
    }

    #[must_use]
    pub fn with_max_token_bytes(mut self, max_token_bytes: usize) -> Self {
        self.max_token_bytes = max_token_bytes;
        self
    }

    /// Encode session data into a signed token.
    ///
    /// Returns [`Error::PayloadTooLarge`] when the finished token exceeds the configured
    /// ceiling; the data is never truncated to fit.
    pub fn encode(&self, data: &SessionData) -> Result<String, Error> {
        let envelope = Envelope {
            v: VERSION,
            data: data.clone(),
        };

        let bytes = serde_json::to_vec(&envelope)?;
        let payload = URL_SAFE_NO_PAD.encode(bytes);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(&payload));
        let token = format!("{payload}{DELIMITER}{signature}");

        if token.len() > self.max_token_bytes {
            return Err(Error::PayloadTooLarge {
                size: token.len(),
                limit: self.max_token_bytes,
            });
        }

        Ok(token)
    }

    /// Decode a token back into session data.
    ///
    /// Total: an absent, malformed, tampered, or wrong-key token yields the empty mapping.
    /// Never trusts any part of a token whose signature does not verify.
    pub fn decode(&self, token: Option<&str>) -> SessionData {
        match token {
            Some(token) => self.try_decode(token).unwrap_or_default(),
            None => SessionData::new(),
        }
    }

    pub(crate) fn try_decode(&self, token: &str) -> Result<SessionData, DecodeError> {
        let (payload, signature) = token.split_once(DELIMITER).ok_or(DecodeError::Malformed)?;
        if payload.is_empty() || signature.is_empty() || signature.contains(DELIMITER) {
            return Err(DecodeError::Malformed);
        }

        let tag = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| DecodeError::Malformed)?;

        // Verify before touching the payload; `verify_slice` compares in constant time.
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(payload.as_bytes());
        mac.verify_slice(&tag)
            .map_err(|_| DecodeError::SignatureMismatch)?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| DecodeError::Malformed)?;
        let envelope: Envelope = serde_json::from_slice(&bytes)
            .map_err(|err| DecodeError::Payload(err.to_string()))?;

        if envelope.v != VERSION {
            return Err(DecodeError::Version(envelope.v));
        }

        Ok(envelope.data)
    }

    fn sign(&self, payload: &str) -> impl AsRef<[u8]> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(secret: &str) -> SignedSessionCodec {
        SignedSessionCodec::new(Secret::new(secret).expect("secret builds from bytes"))
    }

    fn sample_data() -> SessionData {
        let mut data = SessionData::new();
        data.insert("nickname", "Al");
        data.insert("lucky_number", 7);
        data
    }

    #[test]
    fn empty_data_round_trips() {
        let codec = codec("secret1");
        let token = codec.encode(&SessionData::new()).expect("encode succeeds");
        assert_eq!(codec.decode(Some(&token)), SessionData::new());
    }

    #[test]
    fn nested_data_round_trips() {
        use crate::Value;

        let mut data = sample_data();
        data.insert(
            "cart",
            Value::Seq(vec![Value::Int(2), Value::Int(2), Value::Int(2)]),
        );
        data.insert(
            "prefs",
            Value::Map(
                [("dark_mode".to_owned(), Value::Bool(true))]
                    .into_iter()
                    .collect(),
            ),
        );

        let codec = codec("secret1");
        let token = codec.encode(&data).expect("encode succeeds");
        assert_eq!(codec.decode(Some(&token)), data);
    }

    #[test]
    fn wrong_secret_yields_empty() {
        let token = codec("secret1")
            .encode(&sample_data())
            .expect("encode succeeds");
        assert_eq!(codec("secret2").decode(Some(&token)), SessionData::new());
    }

    #[test]
    fn flipping_any_signature_character_yields_empty() {
        let codec = codec("secret1");
        let token = codec.encode(&sample_data()).expect("encode succeeds");
        let dot = token.find('.').expect("token contains a delimiter");

        for i in dot + 1..token.len() {
            let mut tampered: Vec<char> = token.chars().collect();
            tampered[i] = if tampered[i] == 'A' { 'B' } else { 'A' };
            let tampered: String = tampered.into_iter().collect();
            assert_eq!(codec.decode(Some(&tampered)), SessionData::new());
        }
    }

    #[test]
    fn altering_any_payload_character_yields_empty() {
        let codec = codec("secret1");
        let token = codec.encode(&sample_data()).expect("encode succeeds");
        let dot = token.find('.').expect("token contains a delimiter");

        for i in 0..dot {
            let mut tampered: Vec<char> = token.chars().collect();
            tampered[i] = if tampered[i] == 'A' { 'B' } else { 'A' };
            let tampered: String = tampered.into_iter().collect();
            assert_eq!(codec.decode(Some(&tampered)), SessionData::new());
        }
    }

    #[test]
    fn malformed_tokens_yield_empty() {
        let codec = codec("secret1");
        assert_eq!(codec.decode(None), SessionData::new());
        assert_eq!(codec.decode(Some("")), SessionData::new());
        assert_eq!(codec.decode(Some("garbage-no-delimiter")), SessionData::new());
        assert_eq!(codec.decode(Some(".")), SessionData::new());
        assert_eq!(codec.decode(Some("a.")), SessionData::new());
        assert_eq!(codec.decode(Some(".b")), SessionData::new());
        assert_eq!(codec.decode(Some("a.b.c")), SessionData::new());
        assert_eq!(codec.decode(Some("not/base64!.AAAA")), SessionData::new());
    }

    #[test]
    fn unsupported_version_yields_empty() {
        let codec = codec("secret1");

        // A properly signed token whose envelope carries a future version number.
        let payload = URL_SAFE_NO_PAD.encode(br#"{"v":2,"data":{}}"#);
        let signature = URL_SAFE_NO_PAD.encode(codec.sign(&payload));
        let token = format!("{payload}.{signature}");

        assert!(matches!(
            codec.try_decode(&token),
            Err(DecodeError::Version(2))
        ));
        assert_eq!(codec.decode(Some(&token)), SessionData::new());
    }

    #[test]
    fn valid_signature_with_garbage_payload_yields_empty() {
        let codec = codec("secret1");

        let payload = URL_SAFE_NO_PAD.encode(b"not json at all");
        let signature = URL_SAFE_NO_PAD.encode(codec.sign(&payload));
        let token = format!("{payload}.{signature}");

        assert_eq!(codec.decode(Some(&token)), SessionData::new());
    }

    #[test]
    fn oversized_token_is_an_error() {
        let codec = codec("secret1").with_max_token_bytes(64);
        let mut data = SessionData::new();
        data.insert("blob", "x".repeat(256));

        match codec.encode(&data) {
            Err(Error::PayloadTooLarge { size, limit }) => {
                assert!(size > limit);
                assert_eq!(limit, 64);
            }
            other => panic!("expected PayloadTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn encoding_is_stable() {
        let codec = codec("secret1");
        let data = sample_data();

        let first = codec.encode(&data).expect("encode succeeds");
        let second = codec.encode(&data).expect("encode succeeds");

        assert_eq!(codec.decode(Some(&first)), data);
        assert_eq!(codec.decode(Some(&second)), data);
    }

    #[test]
    fn token_is_cookie_legal() {
        let codec = codec("secret1");
        let token = codec.encode(&sample_data()).expect("encode succeeds");

        assert_eq!(token.matches('.').count(), 1);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        );
    }
}
