use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;

use crate::error::{DbError, Result};

/// Prefix marking a ciphertext-at-rest value. Anything stored
/// without this prefix is legacy plaintext and is passed through unchanged.
const CIPHERTEXT_TAG: &str = "enc:v1:";

pub fn encrypt(key: &[u8; 32], plaintext: &str) -> Result<String> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| DbError::PersistenceFailed(format!("encryption failed: {e}")))?;

    let mut blob = nonce.to_vec();
    blob.extend_from_slice(&ciphertext);
    Ok(format!("{CIPHERTEXT_TAG}{}", B64.encode(blob)))
}

/// Decrypt a stored value. Values that don't carry `CIPHERTEXT_TAG` are
/// legacy plaintext and are returned as-is.
pub fn decrypt(key: &[u8; 32], stored: &str) -> Result<String> {
    let Some(b64) = stored.strip_prefix(CIPHERTEXT_TAG) else {
        return Ok(stored.to_string());
    };

    let blob = B64
        .decode(b64)
        .map_err(|e| DbError::PersistenceFailed(format!("bad ciphertext encoding: {e}")))?;
    if blob.len() < 12 {
        return Err(DbError::PersistenceFailed("ciphertext too short".into()));
    }
    let (nonce_bytes, ciphertext) = blob.split_at(12);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| DbError::PersistenceFailed(format!("decryption failed: {e}")))?;

    String::from_utf8(plaintext).map_err(|e| DbError::PersistenceFailed(format!("decrypted value not utf8: {e}")))
}

pub fn is_ciphertext(stored: &str) -> bool {
    stored.starts_with(CIPHERTEXT_TAG)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; 32] {
        [7u8; 32]
    }

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let key = test_key();
        let ct = encrypt(&key, "super-secret-refresh-token").unwrap();
        assert!(is_ciphertext(&ct));
        let pt = decrypt(&key, &ct).unwrap();
        assert_eq!(pt, "super-secret-refresh-token");
    }

    #[test]
    fn legacy_plaintext_passes_through_unchanged() {
        let key = test_key();
        let legacy = "plain-old-token-value";
        assert!(!is_ciphertext(legacy));
        assert_eq!(decrypt(&key, legacy).unwrap(), legacy);
    }
}
