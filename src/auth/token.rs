//! Session Token Signer
//! Mission: Issue and verify HS256 session tokens with a fixed lifetime
//!
//! Wire format:
//! `b64url({"typ":"JWT","alg":"HS256"}) . b64url({"iat":..,"exp":..,..claims}) . b64url(hmac)`
//! where the MAC is HMAC-SHA256 over the first two segments joined by `.`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Sha256;
use std::fmt;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Fixed token header. Serialized once, byte-for-byte.
const HEADER_JSON: &str = r#"{"typ":"JWT","alg":"HS256"}"#;

/// Claim names owned by the signer itself.
const RESERVED_CLAIMS: [&str; 2] = ["iat", "exp"];

/// Default lifetime when none is configured (1 hour).
pub const DEFAULT_TTL_SECS: i64 = 3600;

/// Longest lifetime the service accepts from configuration (365 days).
pub const MAX_TTL_SECS: i64 = 31_536_000;

/// Token issuance and verification failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Not three dot-separated segments, or an undecodable payload
    MalformedToken,
    /// MAC does not match the header and payload
    InvalidSignature,
    /// `now >= exp`
    TokenExpired,
    /// Claim set is not a JSON object or uses a reserved name
    InvalidClaims(String),
    /// Signer constructed without a usable secret
    MissingSecret,
    /// `now + ttl` does not fit in an `i64`
    ExpiryOverflow,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::MalformedToken => write!(f, "Malformed token"),
            TokenError::InvalidSignature => write!(f, "Invalid token signature"),
            TokenError::TokenExpired => write!(f, "Token expired"),
            TokenError::InvalidClaims(reason) => write!(f, "Invalid claims: {}", reason),
            TokenError::MissingSecret => write!(f, "Signing secret is empty"),
            TokenError::ExpiryOverflow => write!(f, "Token expiry out of range"),
        }
    }
}

impl std::error::Error for TokenError {}

#[derive(Serialize)]
struct OutgoingPayload<'a> {
    iat: i64,
    exp: i64,
    #[serde(flatten)]
    claims: &'a Map<String, Value>,
}

#[derive(Deserialize)]
struct IncomingPayload<C> {
    #[allow(dead_code)]
    iat: Option<i64>,
    exp: i64,
    #[serde(flatten)]
    claims: C,
}

/// HS256 token signer keyed with the process-wide secret
#[derive(Clone)]
pub struct TokenSigner {
    keyed_mac: HmacSha256,
    ttl_secs: i64,
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"<redacted>")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

impl TokenSigner {
    /// Key a signer. The secret is consumed into the MAC state and not kept around.
    pub fn new(secret: impl AsRef<[u8]>, ttl_secs: i64) -> Result<Self, TokenError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        let keyed_mac =
            HmacSha256::new_from_slice(secret).map_err(|_| TokenError::MissingSecret)?;

        Ok(Self {
            keyed_mac,
            ttl_secs,
        })
    }

    /// Lifetime of every issued token, in seconds
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Issue a token for `claims` at the current wall-clock time
    pub fn issue_now<C: Serialize>(&self, claims: &C) -> Result<String, TokenError> {
        self.issue(claims, Utc::now().timestamp())
    }

    /// Verify a token at the current wall-clock time
    pub fn verify_now<C: DeserializeOwned>(&self, token: &str) -> Result<C, TokenError> {
        self.verify(token, Utc::now().timestamp())
    }

    /// Issue a token with `iat = now` and `exp = now + ttl`.
    ///
    /// `claims` must serialize to a JSON object that does not contain `iat` or `exp`.
    pub fn issue<C: Serialize>(&self, claims: &C, now: i64) -> Result<String, TokenError> {
        let claims = match serde_json::to_value(claims) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(TokenError::InvalidClaims(
                    "claims must be a JSON object".to_string(),
                ))
            }
            Err(e) => return Err(TokenError::InvalidClaims(e.to_string())),
        };

        if let Some(name) = RESERVED_CLAIMS.iter().find(|n| claims.contains_key(**n)) {
            return Err(TokenError::InvalidClaims(format!(
                "'{}' is set by the signer",
                name
            )));
        }

        let exp = now
            .checked_add(self.ttl_secs)
            .ok_or(TokenError::ExpiryOverflow)?;
        let payload = OutgoingPayload {
            iat: now,
            exp,
            claims: &claims,
        };
        let payload_json = serde_json::to_vec(&payload)
            .map_err(|e| TokenError::InvalidClaims(e.to_string()))?;

        let header_b64 = URL_SAFE_NO_PAD.encode(HEADER_JSON);
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload_json);
        let signing_input = format!("{}.{}", header_b64, payload_b64);
        let signature = self.mac(signing_input.as_bytes()).finalize().into_bytes();
        let signature_b64 = URL_SAFE_NO_PAD.encode(signature);

        debug!(iat = now, exp = payload.exp, "Issued session token");

        Ok(format!("{}.{}", signing_input, signature_b64))
    }

    /// Verify structure, then signature, then expiry, and return the embedded claims.
    pub fn verify<C: DeserializeOwned>(&self, token: &str, now: i64) -> Result<C, TokenError> {
        let parts: Vec<&str> = token.split('.').collect();
        let &[header_b64, payload_b64, signature_b64] = parts.as_slice() else {
            return Err(TokenError::MalformedToken);
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::InvalidSignature)?;

        let mut mac = self.mac(header_b64.as_bytes());
        mac.update(b".");
        mac.update(payload_b64.as_bytes());
        // verify_slice compares in constant time
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let payload_json = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::MalformedToken)?;
        let payload: IncomingPayload<C> =
            serde_json::from_slice(&payload_json).map_err(|_| TokenError::MalformedToken)?;

        if now >= payload.exp {
            return Err(TokenError::TokenExpired);
        }

        Ok(payload.claims)
    }

    fn mac(&self, data: &[u8]) -> HmacSha256 {
        let mut mac = self.keyed_mac.clone();
        mac.update(data);
        mac
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn signer() -> TokenSigner {
        TokenSigner::new("test-secret-key-12345", 3600).unwrap()
    }

    fn member_claims() -> Map<String, Value> {
        json!({"sub": 42, "role": "member"})
            .as_object()
            .cloned()
            .unwrap()
    }

    fn decode_segment(segment: &str) -> Value {
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap()
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let signer = signer();
        let token = signer.issue(&member_claims(), 1000).unwrap();

        let claims: Map<String, Value> = signer.verify(&token, 1000).unwrap();
        assert_eq!(claims, member_claims());
    }

    #[test]
    fn test_expiry_boundary() {
        let signer = signer();
        let token = signer.issue(&member_claims(), 1000).unwrap();

        assert!(signer.verify::<Map<String, Value>>(&token, 4599).is_ok());
        assert_eq!(
            signer.verify::<Map<String, Value>>(&token, 4600),
            Err(TokenError::TokenExpired)
        );
        assert_eq!(
            signer.verify::<Map<String, Value>>(&token, 10_000),
            Err(TokenError::TokenExpired)
        );
    }

    #[test]
    fn test_wire_format() {
        let token = signer().issue(&member_claims(), 1000).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);

        let header = URL_SAFE_NO_PAD.decode(parts[0]).unwrap();
        assert_eq!(header, br#"{"typ":"JWT","alg":"HS256"}"#);

        let payload = String::from_utf8(URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        assert!(payload.starts_with(r#"{"iat":1000,"exp":4600,"#));
        assert_eq!(
            decode_segment(parts[1]),
            json!({"iat": 1000, "exp": 4600, "sub": 42, "role": "member"})
        );

        // No padding, URL-safe alphabet only
        assert!(!token.contains('='));
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
    }

    #[test]
    fn test_signature_matches_independent_hmac() {
        let token = signer().issue(&member_claims(), 1000).unwrap();
        let (signing_input, signature_b64) = token.rsplit_once('.').unwrap();

        let mut mac = HmacSha256::new_from_slice(b"test-secret-key-12345").unwrap();
        mac.update(signing_input.as_bytes());
        let expected = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        assert_eq!(signature_b64, expected);
    }

    #[test]
    fn test_different_secrets_reject() {
        let token = TokenSigner::new("secret1", 3600)
            .unwrap()
            .issue(&member_claims(), 1000)
            .unwrap();

        let result = TokenSigner::new("secret2", 3600)
            .unwrap()
            .verify::<Map<String, Value>>(&token, 1000);
        assert_eq!(result, Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_payload_tampering_rejected() {
        let signer = signer();
        let token = signer.issue(&member_claims(), 1000).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let payload = parts[1];

        for i in 0..payload.len() {
            let original = payload.as_bytes()[i];
            let replacement = if original == b'A' { b'B' } else { b'A' };
            let mut tampered = payload.as_bytes().to_vec();
            tampered[i] = replacement;
            let tampered = String::from_utf8(tampered).unwrap();

            let forged = format!("{}.{}.{}", parts[0], tampered, parts[2]);
            assert!(
                signer.verify::<Map<String, Value>>(&forged, 1000).is_err(),
                "tampering at index {} was accepted",
                i
            );
        }
    }

    #[test]
    fn test_forged_expiry_rejected() {
        let signer = signer();
        let token = signer.issue(&member_claims(), 1000).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let extended = URL_SAFE_NO_PAD
            .encode(r#"{"iat":1000,"exp":999999999,"sub":42,"role":"member"}"#);
        let forged = format!("{}.{}.{}", parts[0], extended, parts[2]);

        assert_eq!(
            signer.verify::<Map<String, Value>>(&forged, 5000),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_wrong_segment_count_is_malformed() {
        let signer = signer();
        let token = signer.issue(&member_claims(), 1000).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let two = format!("{}.{}", parts[0], parts[1]);
        let four = format!("{}.x", token);

        assert_eq!(
            signer.verify::<Map<String, Value>>(&two, 1000),
            Err(TokenError::MalformedToken)
        );
        assert_eq!(
            signer.verify::<Map<String, Value>>(&four, 1000),
            Err(TokenError::MalformedToken)
        );
        assert_eq!(
            signer.verify::<Map<String, Value>>("", 1000),
            Err(TokenError::MalformedToken)
        );
    }

    #[test]
    fn test_garbage_signature_rejected() {
        let result = signer().verify::<Map<String, Value>>("invalid.token.here", 1000);
        assert_eq!(result, Err(TokenError::InvalidSignature));

        let result = signer().verify::<Map<String, Value>>("a.b.!!!", 1000);
        assert_eq!(result, Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_signed_but_undecodable_payload_is_malformed() {
        let signer = signer();
        let header_b64 = URL_SAFE_NO_PAD.encode(HEADER_JSON);
        let payload_b64 = URL_SAFE_NO_PAD.encode("not json");
        let signing_input = format!("{}.{}", header_b64, payload_b64);
        let signature = URL_SAFE_NO_PAD.encode(
            signer
                .mac(signing_input.as_bytes())
                .finalize()
                .into_bytes(),
        );
        let token = format!("{}.{}", signing_input, signature);

        assert_eq!(
            signer.verify::<Map<String, Value>>(&token, 1000),
            Err(TokenError::MalformedToken)
        );
    }

    #[test]
    fn test_reserved_claims_rejected() {
        let claims = json!({"sub": 1, "exp": 99});
        assert!(matches!(
            signer().issue(&claims, 1000),
            Err(TokenError::InvalidClaims(_))
        ));

        let claims = json!({"iat": 1});
        assert!(matches!(
            signer().issue(&claims, 1000),
            Err(TokenError::InvalidClaims(_))
        ));
    }

    #[test]
    fn test_non_object_claims_rejected() {
        assert!(matches!(
            signer().issue(&json!([1, 2, 3]), 1000),
            Err(TokenError::InvalidClaims(_))
        ));
        assert!(matches!(
            signer().issue(&"subject", 1000),
            Err(TokenError::InvalidClaims(_))
        ));
    }

    #[test]
    fn test_typed_claims_roundtrip() {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        struct Typed {
            sub: i64,
            role: String,
        }

        let signer = signer();
        let claims = Typed {
            sub: 7,
            role: "admin".to_string(),
        };
        let token = signer.issue(&claims, 50).unwrap();
        let decoded: Typed = signer.verify(&token, 60).unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn test_now_helpers_use_wall_clock() {
        let signer = signer();
        let token = signer.issue_now(&member_claims()).unwrap();
        let claims: Map<String, Value> = signer.verify_now(&token).unwrap();
        assert_eq!(claims["sub"], json!(42));
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert_eq!(
            TokenSigner::new("", 3600).unwrap_err(),
            TokenError::MissingSecret
        );
    }

    #[test]
    fn test_expiry_overflow_is_an_error() {
        let signer = signer();
        assert_eq!(
            signer.issue(&member_claims(), i64::MAX).unwrap_err(),
            TokenError::ExpiryOverflow
        );

        let long_lived = TokenSigner::new("test-secret-key-12345", i64::MAX).unwrap();
        assert_eq!(
            long_lived.issue_now(&member_claims()).unwrap_err(),
            TokenError::ExpiryOverflow
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", signer());
        assert!(!rendered.contains("test-secret-key-12345"));
        assert!(rendered.contains("ttl_secs: 3600"));
    }
}
