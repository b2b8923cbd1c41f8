//! Cryptographic utilities for webhook verification.
//!
//! Stripe signs each delivery with HMAC-SHA256 over `"{timestamp}.{body}"`
//! and sends the result in the `Stripe-Signature` header as
//! `t=<timestamp>,v1=<sig>[,v1=<sig>...]`. Multiple `v1` entries appear
//! while a secret is being rolled; any one matching is sufficient.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Errors from Stripe signature verification.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// The header carries no `t=` timestamp component.
    #[error("signature header missing timestamp")]
    MissingTimestamp,

    /// The header carries no `v1=` signature component.
    #[error("signature header missing v1 signature")]
    MissingSignature,

    /// No candidate signature matched the computed one.
    #[error("signature mismatch")]
    Mismatch,
}

/// Verify a Stripe webhook signature header against the raw request body.
///
/// # Errors
///
/// Returns a [`SignatureError`] describing which part of the scheme
/// failed. Callers at the HTTP boundary collapse all variants into one
/// 4xx rejection.
pub fn verify_stripe_signature(
    payload: &str,
    signature_header: &str,
    secret: &str,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        let mut kv = part.trim().splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some("t"), Some(ts)) => timestamp = Some(ts),
            (Some("v1"), Some(sig)) => signatures.push(sig),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;

    if signatures.is_empty() {
        return Err(SignatureError::MissingSignature);
    }

    let signed_payload = format!("{timestamp}.{payload}");
    let expected = hmac_sha256_hex(secret, &signed_payload);

    if signatures.iter().any(|sig| constant_time_eq(&expected, sig)) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Compute HMAC-SHA256 and return hex-encoded result.
///
/// # Panics
///
/// This function will never panic in practice. The `expect` call is guarded by
/// the invariant that HMAC-SHA256 accepts keys of any size per RFC 2104.
#[must_use]
pub fn hmac_sha256_hex(secret: &str, message: &str) -> String {
    // INVARIANT: HMAC-SHA256 accepts keys of any size per RFC 2104, so
    // `new_from_slice` only fails if the Hmac implementation is broken.
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC-SHA256 accepts any key size");
    mac.update(message.as_bytes());
    let result = mac.finalize();

    hex::encode(result.into_bytes())
}

/// Constant-time string comparison to prevent timing attacks.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Build a valid `Stripe-Signature` header for a payload. Test support for
/// this crate's own suites; a real sender is Stripe itself.
#[must_use]
pub fn sign_stripe_payload(payload: &str, secret: &str, timestamp: i64) -> String {
    let signed_payload = format!("{timestamp}.{payload}");
    format!("t={timestamp},v1={}", hmac_sha256_hex(secret, &signed_payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_sha256_produces_correct_length() {
        let result = hmac_sha256_hex("key", "The quick brown fox jumps over the lazy dog");
        assert_eq!(result.len(), 64); // SHA256 = 32 bytes = 64 hex chars
    }

    #[test]
    fn hmac_sha256_is_deterministic() {
        assert_eq!(
            hmac_sha256_hex("secret", "message"),
            hmac_sha256_hex("secret", "message")
        );
        assert_ne!(
            hmac_sha256_hex("secret", "message1"),
            hmac_sha256_hex("secret", "message2")
        );
    }

    #[test]
    fn constant_time_eq_cases() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(constant_time_eq("", ""));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "ab"));
        assert!(!constant_time_eq("abc", "ABC"));
    }

    #[test]
    fn signed_payload_verifies() {
        let header = sign_stripe_payload("{\"id\":\"evt_1\"}", "whsec_test", 1_700_000_000);
        assert!(verify_stripe_signature("{\"id\":\"evt_1\"}", &header, "whsec_test").is_ok());
    }

    #[test]
    fn tampered_body_is_rejected() {
        let header = sign_stripe_payload("{\"id\":\"evt_1\"}", "whsec_test", 1_700_000_000);
        assert!(matches!(
            verify_stripe_signature("{\"id\":\"evt_2\"}", &header, "whsec_test"),
            Err(SignatureError::Mismatch)
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let header = sign_stripe_payload("body", "whsec_a", 1_700_000_000);
        assert!(verify_stripe_signature("body", &header, "whsec_b").is_err());
    }

    #[test]
    fn any_matching_v1_candidate_is_accepted() {
        let body = "body";
        let ts = 1_700_000_000;
        let good = hmac_sha256_hex("whsec_test", &format!("{ts}.{body}"));
        let header = format!("t={ts},v1=deadbeef,v1={good}");
        assert!(verify_stripe_signature(body, &header, "whsec_test").is_ok());
    }

    #[test]
    fn header_without_timestamp_is_rejected() {
        assert!(matches!(
            verify_stripe_signature("body", "v1=deadbeef", "whsec_test"),
            Err(SignatureError::MissingTimestamp)
        ));
    }

    #[test]
    fn header_without_signature_is_rejected() {
        assert!(matches!(
            verify_stripe_signature("body", "t=123", "whsec_test"),
            Err(SignatureError::MissingSignature)
        ));
    }
}
