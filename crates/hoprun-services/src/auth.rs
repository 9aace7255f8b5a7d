//! Password hashing and bearer tokens
//!
//! Passwords are stored as `pbkdf2-sha256$<iterations>$<salt>$<hash>` with
//! base64 fields. Tokens are HS256 JSON Web Tokens carrying [`Claims`].

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use ring::{hmac, pbkdf2};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use uuid::Uuid;

use crate::{ServiceError, ServiceResult};

const HASH_SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;
const DEFAULT_ITERATIONS: u32 = 100_000;
const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// PBKDF2-HMAC-SHA256 password hasher
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    iterations: NonZeroU32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::with_iterations(DEFAULT_ITERATIONS)
    }
}

impl PasswordHasher {
    /// Zero is clamped to one iteration
    pub fn with_iterations(iterations: u32) -> Self {
        Self {
            iterations: NonZeroU32::new(iterations).unwrap_or(NonZeroU32::MIN),
        }
    }

    pub fn hash(&self, password: &str) -> ServiceResult<String> {
        let mut salt = [0u8; SALT_LEN];
        SystemRandom::new()
            .fill(&mut salt)
            .map_err(|_| ServiceError::Internal("random source unavailable".to_string()))?;

        let mut hash = [0u8; HASH_LEN];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            self.iterations,
            &salt,
            password.as_bytes(),
            &mut hash,
        );

        Ok(format!(
            "{}${}${}${}",
            HASH_SCHEME,
            self.iterations,
            STANDARD.encode(salt),
            STANDARD.encode(hash)
        ))
    }

    /// A well-formed hash at this hasher's work factor that matches no
    /// password. Verifying against it costs the same as a real check.
    pub fn placeholder_hash(&self) -> String {
        format!(
            "{}${}${}${}",
            HASH_SCHEME,
            self.iterations,
            STANDARD.encode([0u8; SALT_LEN]),
            STANDARD.encode([0u8; HASH_LEN])
        )
    }

    /// Constant-time check of `password` against a stored hash.
    ///
    /// The iteration count stored with the hash is used, so hashes stay
    /// valid when the configured count changes. Malformed hashes never match.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let mut parts = stored.split('$');
        let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return false;
        };
        if scheme != HASH_SCHEME {
            return false;
        }

        let Some(iterations) = iterations.parse::<u32>().ok().and_then(NonZeroU32::new) else {
            return false;
        };
        let (Ok(salt), Ok(hash)) = (STANDARD.decode(salt), STANDARD.decode(hash)) else {
            return false;
        };

        pbkdf2::verify(
            pbkdf2::PBKDF2_HMAC_SHA256,
            iterations,
            &salt,
            password.as_bytes(),
            &hash,
        )
        .is_ok()
    }
}

/// Token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    /// Expiry, seconds since the Unix epoch
    pub exp: i64,
}

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Issues and verifies HS256 tokens
#[derive(Clone)]
pub struct TokenSigner {
    key: hmac::Key,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret),
            ttl: Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn issue(&self, user_id: Uuid) -> ServiceResult<String> {
        let claims = Claims {
            user_id,
            exp: (Utc::now() + self.ttl).timestamp(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> ServiceResult<String> {
        let header = Header {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        };
        let signing_input = format!("{}.{}", encode_segment(&header)?, encode_segment(claims)?);
        let signature = hmac::sign(&self.key, signing_input.as_bytes());
        Ok(format!(
            "{}.{}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature.as_ref())
        ))
    }

    /// Check signature, algorithm and expiry
    pub fn verify(&self, token: &str) -> ServiceResult<Claims> {
        let invalid = |reason: &str| ServiceError::Unauthorized(reason.to_string());

        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid("malformed token"));
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| invalid("malformed signature"))?;
        let signing_input = &token[..header.len() + 1 + payload.len()];
        hmac::verify(&self.key, signing_input.as_bytes(), &signature)
            .map_err(|_| invalid("bad signature"))?;

        let header: Header = decode_segment(header).ok_or_else(|| invalid("malformed header"))?;
        if header.alg != "HS256" {
            return Err(invalid("unsupported algorithm"));
        }

        let claims: Claims = decode_segment(payload).ok_or_else(|| invalid("malformed claims"))?;
        if claims.exp <= Utc::now().timestamp() {
            return Err(invalid("token expired"));
        }
        Ok(claims)
    }
}

fn encode_segment<T: Serialize>(value: &T) -> ServiceResult<String> {
    serde_json::to_vec(value)
        .map(|bytes| URL_SAFE_NO_PAD.encode(bytes))
        .map_err(|e| ServiceError::Internal(format!("failed to encode token: {e}")))
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Option<T> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn password_hash_verifies_and_is_salted() {
        let hasher = PasswordHasher::with_iterations(1_000);
        let first = hasher.hash("correct horse").unwrap();
        let second = hasher.hash("correct horse").unwrap();

        assert!(first.starts_with("pbkdf2-sha256$1000$"));
        assert_ne!(first, second);
        assert!(hasher.verify("correct horse", &first));
        assert!(!hasher.verify("wrong horse", &first));
    }

    #[test]
    fn verify_uses_stored_iterations() {
        let stored = PasswordHasher::with_iterations(500).hash("pw").unwrap();
        assert!(PasswordHasher::default().verify("pw", &stored));
    }

    #[test]
    fn placeholder_hash_is_well_formed_and_never_matches() {
        let hasher = PasswordHasher::with_iterations(1_000);
        let placeholder = hasher.placeholder_hash();

        assert!(placeholder.starts_with("pbkdf2-sha256$1000$"));
        assert_eq!(placeholder.split('$').count(), 4);
        assert!(!hasher.verify("", &placeholder));
        assert!(!hasher.verify("hunter2", &placeholder));
    }

    #[test]
    fn malformed_hashes_never_match() {
        let hasher = PasswordHasher::default();
        for stored in ["", "pw", "md5$1$a$b", "pbkdf2-sha256$0$AAAA$AAAA", "pbkdf2-sha256$10$!!$AAAA"] {
            assert!(!hasher.verify("pw", stored), "{stored}");
        }
    }

    #[test]
    fn token_round_trips_claims() {
        let signer = TokenSigner::new(b"secret");
        let user_id = Uuid::new_v4();

        let token = signer.issue(user_id).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert!(claims.exp > Utc::now().timestamp() + 23 * 3600);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = TokenSigner::new(b"one").issue(Uuid::new_v4()).unwrap();
        let err = TokenSigner::new(b"two").verify(&token).unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let signer = TokenSigner::new(b"secret").with_ttl(Duration::seconds(-5));
        let token = signer.issue(Uuid::new_v4()).unwrap();
        assert!(matches!(
            signer.verify(&token),
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let signer = TokenSigner::new(b"secret");
        let token = signer.issue(Uuid::new_v4()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let forged = Claims {
            user_id: Uuid::new_v4(),
            exp: Utc::now().timestamp() + 3600,
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let forged_token = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert!(signer.verify(&forged_token).is_err());
        assert!(signer.verify("not-a-token").is_err());
        assert!(signer.verify("a.b.c.d").is_err());
    }
}
