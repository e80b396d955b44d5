//! Webhook signature verification.
//!
//! The gateway signs the raw request body with HMAC-SHA512 keyed by the
//! shared webhook secret and sends the hex digest in a header. Verification
//! happens at the HTTP boundary, before any payload reaches the
//! orchestrator.

use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Hex HMAC-SHA512 digest of `body`. Used by tests and by gateway
/// simulators; the verification side never compares strings directly.
#[must_use]
pub fn sign(body: &[u8], secret: &str) -> String {
    let Ok(mut mac) = HmacSha512::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a hex signature against the raw body in constant time.
#[must_use]
pub fn verify(body: &[u8], signature_hex: &str, secret: &str) -> bool {
    let Ok(mut mac) = HmacSha512::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_signature_is_accepted() {
        let body = br#"{"event":"charge.success","data":{"reference":"klo-1"}}"#;
        let signature = sign(body, "whsec-test");
        assert!(verify(body, &signature, "whsec-test"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let body = br#"{"event":"charge.success","data":{"reference":"klo-1"}}"#;
        let signature = sign(body, "whsec-other");
        assert!(!verify(body, &signature, "whsec-test"));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let body = br#"{"event":"charge.success","data":{"reference":"klo-1"}}"#;
        let signature = sign(body, "whsec-test");
        let tampered = br#"{"event":"charge.success","data":{"reference":"klo-2"}}"#;
        assert!(!verify(tampered, &signature, "whsec-test"));
    }

    #[test]
    fn non_hex_signature_is_rejected() {
        assert!(!verify(b"{}", "not-hex!", "whsec-test"));
    }
}
