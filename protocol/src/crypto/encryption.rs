//! # Key-At-Rest Encryption
//!
//! Password-based authenticated encryption for wallet secret keys:
//! scrypt for key derivation, AES-256-GCM for the encryption itself.
//!
//! scrypt is memory-hard — every password guess costs an attacker real
//! RAM, not just cycles, which is what keeps GPU farms honest. The
//! parameters (N=16384, r=8, p=1) are deliberate and
//! compatibility-relevant: change them and every previously encrypted
//! key becomes undecryptable.
//!
//! ## Stored format
//!
//! An [`EncryptedKey`] carries salt, nonce (IV), authentication tag, and
//! ciphertext as separate hex strings. GCM normally appends the tag to
//! the ciphertext; we split it out so the persisted structure is
//! self-describing and each component is independently inspectable.
//!
//! ## Nonce management
//!
//! GCM is notoriously unforgiving about nonce reuse. We generate a fresh
//! random 96-bit nonce per encryption from the OS CSPRNG; with a fresh
//! scrypt salt per encryption the (key, nonce) pair never repeats.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use scrypt::Params;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{
    AES_KEY_LENGTH, AES_NONCE_LENGTH, AES_TAG_LENGTH, SCRYPT_LOG_N, SCRYPT_P, SCRYPT_R,
    SCRYPT_SALT_LENGTH,
};

/// Errors that can occur during key encryption/decryption.
///
/// We intentionally keep these vague. The difference between "wrong
/// password" and "corrupted ciphertext" is none of an attacker's
/// business.
#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("encryption failed")]
    EncryptFailed,

    #[error("decryption failed -- wrong password or corrupted data")]
    DecryptFailed,

    #[error("malformed encrypted key structure")]
    MalformedStructure,
}

// ---------------------------------------------------------------------------
// EncryptedKey
// ---------------------------------------------------------------------------

/// A password-encrypted secret key as persisted to disk.
///
/// All fields are hex strings. Tampering with any of them is detected at
/// decryption time by the GCM authentication tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKey {
    /// AES-256-GCM ciphertext (tag excluded).
    pub ciphertext: String,
    /// scrypt salt, 16 bytes.
    pub salt: String,
    /// GCM nonce, 12 bytes.
    pub iv: String,
    /// GCM authentication tag, 16 bytes.
    pub tag: String,
}

/// Derives a 32-byte AES key from a password and salt via scrypt.
fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; AES_KEY_LENGTH], EncryptionError> {
    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, AES_KEY_LENGTH)
        .map_err(|_| EncryptionError::EncryptFailed)?;
    let mut key = [0u8; AES_KEY_LENGTH];
    scrypt::scrypt(password.as_bytes(), salt, &params, &mut key)
        .map_err(|_| EncryptionError::EncryptFailed)?;
    Ok(key)
}

/// Encrypts secret key material under a password.
///
/// Generates a fresh random salt and nonce for every call, so encrypting
/// the same key twice produces unrelated ciphertexts.
pub fn encrypt_secret_key(secret: &[u8], password: &str) -> Result<EncryptedKey, EncryptionError> {
    let mut salt = [0u8; SCRYPT_SALT_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    let mut nonce_bytes = [0u8; AES_NONCE_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);

    let key = derive_key(password, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| EncryptionError::EncryptFailed)?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    // aes-gcm appends the 16-byte tag to the ciphertext; split it off so
    // the stored structure carries the tag as its own field.
    let mut sealed = cipher
        .encrypt(nonce, secret)
        .map_err(|_| EncryptionError::EncryptFailed)?;
    if sealed.len() < AES_TAG_LENGTH {
        return Err(EncryptionError::EncryptFailed);
    }
    let tag = sealed.split_off(sealed.len() - AES_TAG_LENGTH);

    Ok(EncryptedKey {
        ciphertext: hex::encode(sealed),
        salt: hex::encode(salt),
        iv: hex::encode(nonce_bytes),
        tag: hex::encode(tag),
    })
}

/// Decrypts an [`EncryptedKey`] with a password, returning the original
/// secret key material.
///
/// # Errors
///
/// Returns [`EncryptionError::DecryptFailed`] for a wrong password or any
/// modification to ciphertext, salt, nonce, or tag — authentication means
/// tampering never yields garbage plaintext, only an error.
pub fn decrypt_secret_key(
    encrypted: &EncryptedKey,
    password: &str,
) -> Result<Vec<u8>, EncryptionError> {
    let salt = hex::decode(&encrypted.salt).map_err(|_| EncryptionError::MalformedStructure)?;
    let iv = hex::decode(&encrypted.iv).map_err(|_| EncryptionError::MalformedStructure)?;
    let tag = hex::decode(&encrypted.tag).map_err(|_| EncryptionError::MalformedStructure)?;
    let ciphertext =
        hex::decode(&encrypted.ciphertext).map_err(|_| EncryptionError::MalformedStructure)?;

    if iv.len() != AES_NONCE_LENGTH || tag.len() != AES_TAG_LENGTH {
        return Err(EncryptionError::MalformedStructure);
    }

    let key = derive_key(password, &salt).map_err(|_| EncryptionError::DecryptFailed)?;
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| EncryptionError::DecryptFailed)?;
    let nonce = Nonce::from_slice(&iv);

    // Reassemble ciphertext || tag, the layout aes-gcm expects.
    let mut sealed = ciphertext;
    sealed.extend_from_slice(&tag);

    cipher
        .decrypt(nonce, sealed.as_slice())
        .map_err(|_| EncryptionError::DecryptFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let secret = [0x42u8; 32];
        let sealed = encrypt_secret_key(&secret, "hunter2").unwrap();
        let recovered = decrypt_secret_key(&sealed, "hunter2").unwrap();
        assert_eq!(recovered, secret);
    }

    #[test]
    fn wrong_password_rejected() {
        let sealed = encrypt_secret_key(&[1u8; 32], "correct horse").unwrap();
        let result = decrypt_secret_key(&sealed, "battery staple");
        assert!(matches!(result, Err(EncryptionError::DecryptFailed)));
    }

    #[test]
    fn tampered_ciphertext_rejected() {
        let mut sealed = encrypt_secret_key(&[7u8; 32], "pw").unwrap();
        // Flip one nibble of the ciphertext.
        let mut chars: Vec<char> = sealed.ciphertext.chars().collect();
        chars[0] = if chars[0] == '0' { '1' } else { '0' };
        sealed.ciphertext = chars.into_iter().collect();

        assert!(decrypt_secret_key(&sealed, "pw").is_err());
    }

    #[test]
    fn tampered_tag_rejected() {
        let mut sealed = encrypt_secret_key(&[7u8; 32], "pw").unwrap();
        let mut chars: Vec<char> = sealed.tag.chars().collect();
        chars[0] = if chars[0] == 'f' { 'e' } else { 'f' };
        sealed.tag = chars.into_iter().collect();

        assert!(decrypt_secret_key(&sealed, "pw").is_err());
    }

    #[test]
    fn fresh_salt_and_nonce_per_encryption() {
        let secret = [9u8; 32];
        let a = encrypt_secret_key(&secret, "pw").unwrap();
        let b = encrypt_secret_key(&secret, "pw").unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn field_lengths_match_parameters() {
        let sealed = encrypt_secret_key(&[0u8; 32], "pw").unwrap();
        assert_eq!(sealed.salt.len(), SCRYPT_SALT_LENGTH * 2);
        assert_eq!(sealed.iv.len(), AES_NONCE_LENGTH * 2);
        assert_eq!(sealed.tag.len(), AES_TAG_LENGTH * 2);
    }

    #[test]
    fn serde_roundtrip() {
        let sealed = encrypt_secret_key(&[3u8; 32], "pw").unwrap();
        let json = serde_json::to_string(&sealed).unwrap();
        let recovered: EncryptedKey = serde_json::from_str(&json).unwrap();
        assert_eq!(sealed, recovered);
        assert_eq!(decrypt_secret_key(&recovered, "pw").unwrap(), vec![3u8; 32]);
    }
}
