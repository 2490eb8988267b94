//! Signed, time-limited identity tokens.
//!
//! A token is `base64url(claims JSON) + "." + base64url(HMAC-SHA256 tag)`,
//! signed with a single shared secret. Verification treats every malformed,
//! mis-signed, or expired token as "no identity" rather than an error, so the
//! authentication stage can fall through to anonymous handling.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{DomainError, DomainResult};

type HmacSha256 = Hmac<Sha256>;

/// Claims embedded in every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    /// Subject, set to the username.
    sub: String,
    /// Issued-at, epoch milliseconds.
    iat: i64,
    /// Expiry, epoch milliseconds.
    exp: i64,
}

/// Issues and verifies identity tokens for a single shared secret.
#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
    ttl_millis: i64,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the secret.
        f.debug_struct("TokenService")
            .field("ttl_millis", &self.ttl_millis)
            .finish()
    }
}

impl TokenService {
    /// Creates a token service. The secret must be non-empty.
    pub fn new(secret: impl Into<Vec<u8>>, ttl_millis: i64) -> DomainResult<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(DomainError::InvalidSecret {
                reason: "secret must not be empty".to_string(),
            });
        }
        Ok(Self { secret, ttl_millis })
    }

    /// Issues a token for `subject` expiring `ttl_millis` from now.
    pub fn issue(&self, subject: &str) -> String {
        self.issue_at(subject, chrono::Utc::now().timestamp_millis())
    }

    /// Verifies signature and expiry, returning the embedded subject.
    ///
    /// Any malformed input yields `None`; this path never errors.
    pub fn verify(&self, token: &str) -> Option<String> {
        self.verify_at(token, chrono::Utc::now().timestamp_millis())
    }

    /// Verifies the token and additionally requires the embedded subject to
    /// equal `expected_subject`.
    pub fn matches(&self, token: &str, expected_subject: &str) -> bool {
        self.verify(token)
            .is_some_and(|sub| sub == expected_subject)
    }

    fn issue_at(&self, subject: &str, now_millis: i64) -> String {
        let claims = Claims {
            sub: subject.to_string(),
            iat: now_millis,
            exp: now_millis + self.ttl_millis,
        };
        // Claims is a plain struct of strings and ints; serialization cannot fail.
        let payload = serde_json::to_vec(&claims).unwrap_or_default();
        let encoded = URL_SAFE_NO_PAD.encode(&payload);
        let tag = self.sign(encoded.as_bytes());
        format!("{encoded}.{}", URL_SAFE_NO_PAD.encode(tag))
    }

    fn verify_at(&self, token: &str, now_millis: i64) -> Option<String> {
        let (payload, signature) = token.split_once('.')?;
        let tag = URL_SAFE_NO_PAD.decode(signature).ok()?;

        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        // Constant-time comparison of the tag.
        mac.verify_slice(&tag).ok()?;

        let claims: Claims = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).ok()?).ok()?;
        if claims.exp <= now_millis {
            return None;
        }
        Some(claims.sub)
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        let mut mac = self.mac();
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any non-zero length; emptiness is rejected in new().
        HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key size")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-hmac-sha256-must-be-at-least-32-chars";

    fn service() -> TokenService {
        TokenService::new(SECRET, 3_600_000).unwrap()
    }

    #[test]
    fn issue_then_verify_round_trips_subject() {
        let svc = service();
        let token = svc.issue("testuser");
        assert!(!token.is_empty());
        assert_eq!(svc.verify(&token).as_deref(), Some("testuser"));
    }

    #[test]
    fn matches_requires_same_subject() {
        let svc = service();
        let token = svc.issue("john");
        assert!(svc.matches(&token, "john"));
        assert!(!svc.matches(&token, "jane"));
    }

    #[test]
    fn malformed_tokens_are_invalid_not_errors() {
        let svc = service();
        assert_eq!(svc.verify(""), None);
        assert_eq!(svc.verify("bad.token.here"), None);
        assert_eq!(svc.verify("no-dot-at-all"), None);
        assert_eq!(svc.verify("!!!.###"), None);
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let svc = service();
        let token = svc.issue("john");
        let (payload, sig) = token.split_once('.').unwrap();
        // Re-encode a different subject but keep the original signature.
        let forged_payload =
            URL_SAFE_NO_PAD.encode(br#"{"sub":"admin","iat":0,"exp":9999999999999}"#);
        let forged = format!("{forged_payload}.{sig}");
        assert_eq!(svc.verify(&forged), None);
        // Original payload with a truncated signature also fails.
        let truncated = format!("{payload}.{}", &sig[..sig.len() - 4]);
        assert_eq!(svc.verify(&truncated), None);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let svc = service();
        let other = TokenService::new("another-secret-entirely-with-enough-len", 3_600_000).unwrap();
        let token = svc.issue("john");
        assert_eq!(other.verify(&token), None);
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = service();
        let token = svc.issue_at("john", 1_000);
        // Still valid one millisecond before expiry.
        assert_eq!(
            svc.verify_at(&token, 1_000 + 3_600_000 - 1).as_deref(),
            Some("john")
        );
        // Invalid at and after expiry.
        assert_eq!(svc.verify_at(&token, 1_000 + 3_600_000), None);
        assert_eq!(svc.verify_at(&token, i64::MAX), None);
    }

    #[test]
    fn empty_secret_is_rejected_at_construction() {
        assert!(TokenService::new("", 1000).is_err());
    }
}
