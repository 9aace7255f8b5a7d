//! Encryption at rest for stored connection passwords
//!
//! AES-256-GCM with a random 96-bit nonce per value. The stored form is
//! `base64(nonce || ciphertext || tag)`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};

use crate::{StorageError, StorageResult};

const KEY_LEN: usize = 32;

pub struct CredentialCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl CredentialCipher {
    /// Build a cipher from a raw 32-byte key
    pub fn new(key: &[u8]) -> StorageResult<Self> {
        if key.len() != KEY_LEN {
            return Err(StorageError::Encryption(format!(
                "encryption key must be {KEY_LEN} bytes, got {}",
                key.len()
            )));
        }
        let unbound = UnboundKey::new(&AES_256_GCM, key)
            .map_err(|_| StorageError::Encryption("invalid encryption key".to_string()))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Build a cipher from a base64-encoded 32-byte key
    pub fn from_base64(encoded: &str) -> StorageResult<Self> {
        let key = STANDARD
            .decode(encoded.trim())
            .map_err(|e| StorageError::Encryption(format!("encryption key is not base64: {e}")))?;
        Self::new(&key)
    }

    /// Generate a fresh base64-encoded key
    pub fn generate_key() -> StorageResult<String> {
        let mut key = [0u8; KEY_LEN];
        SystemRandom::new()
            .fill(&mut key)
            .map_err(|_| StorageError::Encryption("random source unavailable".to_string()))?;
        Ok(STANDARD.encode(key))
    }

    pub fn encrypt(&self, plaintext: &str) -> StorageResult<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| StorageError::Encryption("random source unavailable".to_string()))?;

        let mut in_out = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| StorageError::Encryption("failed to seal value".to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + in_out.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&in_out);
        Ok(STANDARD.encode(out))
    }

    pub fn decrypt(&self, encoded: &str) -> StorageResult<String> {
        let raw = STANDARD
            .decode(encoded)
            .map_err(|e| StorageError::Encryption(format!("stored value is not base64: {e}")))?;
        if raw.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(StorageError::Encryption("stored value is too short".to_string()));
        }

        let (nonce_bytes, sealed) = raw.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| StorageError::Encryption("invalid nonce".to_string()))?;

        let mut sealed = sealed.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut sealed)
            .map_err(|_| StorageError::Encryption("failed to open value".to_string()))?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|_| StorageError::Encryption("decrypted value is not UTF-8".to_string()))
    }
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher").finish_non_exhaustive()
    }
}
