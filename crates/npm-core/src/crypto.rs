//! Credential ciphertext encrypt/decrypt.
//!
//! Ports `CryptoService` from the original Python source
//! (`apps/npm/src/npm/services/crypto.py`) exactly: key = scrypt(secret, salt=b"salt", N=16384,
//! r=8, p=1, dklen=32); AEAD = AES-256-GCM, no associated data; wire format is three
//! colon-separated hex fields `iv:tag:ciphertext` with a 12-byte IV and 16-byte tag.
//!
//! Resolves the open question in spec §9: the source contains multiple incompatible schemes
//! (Fernet+PBKDF2 variants, AES-GCM+scrypt); only the AES-GCM+scrypt form is implemented here,
//! matching the one the collector actually reads.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use scrypt::Params;

use crate::error::CryptoError;

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;
const SCRYPT_LOG_N: u8 = 14; // N = 16384 = 2^14
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;
const SCRYPT_SALT: &[u8] = b"salt";

/// Derives the 32-byte AES-256 key from the process-wide secret.
fn derive_key(secret: &str) -> [u8; 32] {
    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, 32)
        .expect("static scrypt params are always valid");
    let mut out = [0u8; 32];
    scrypt::scrypt(secret.as_bytes(), SCRYPT_SALT, &params, &mut out)
        .expect("scrypt with a 32-byte output never fails");
    out
}

/// Encrypts `plaintext`, returning `iv_hex:tag_hex:ciphertext_hex`.
pub fn encrypt(secret: &str, plaintext: &str) -> String {
    let key_bytes = derive_key(secret);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));

    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);
    let nonce = Nonce::from_slice(&iv);

    let mut ciphertext_with_tag = cipher
        .encrypt(nonce, Payload { msg: plaintext.as_bytes(), aad: &[] })
        .expect("AES-256-GCM encryption with a valid key never fails");

    let tag = ciphertext_with_tag.split_off(ciphertext_with_tag.len() - TAG_LEN);

    format!(
        "{}:{}:{}",
        hex::encode(iv),
        hex::encode(tag),
        hex::encode(ciphertext_with_tag)
    )
}

/// Decrypts a `iv_hex:tag_hex:ciphertext_hex` string produced by [`encrypt`].
pub fn decrypt(secret: &str, ciphertext: &str) -> Result<String, CryptoError> {
    let mut parts = ciphertext.split(':');
    let (iv_hex, tag_hex, data_hex) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(iv), Some(tag), Some(data), None) => (iv, tag, data),
        _ => return Err(CryptoError::MalformedCiphertext),
    };

    let iv = hex::decode(iv_hex).map_err(|_| CryptoError::InvalidHex("iv".into()))?;
    let tag = hex::decode(tag_hex).map_err(|_| CryptoError::InvalidHex("tag".into()))?;
    let data = hex::decode(data_hex).map_err(|_| CryptoError::InvalidHex("ciphertext".into()))?;

    if iv.len() != IV_LEN || tag.len() != TAG_LEN {
        return Err(CryptoError::MalformedCiphertext);
    }

    let mut combined = data;
    combined.extend_from_slice(&tag);

    let key_bytes = derive_key(secret);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
    let nonce = Nonce::from_slice(&iv);

    let plaintext = cipher
        .decrypt(nonce, Payload { msg: &combined, aad: &[] })
        .map_err(|_| CryptoError::AeadFailure)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::AeadFailure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let secret = "super-secret-process-wide-key";
        let ct = encrypt(secret, "my-snmp-auth-password");
        let pt = decrypt(secret, &ct).unwrap();
        assert_eq!(pt, "my-snmp-auth-password");
    }

    #[test]
    fn wire_format_has_three_hex_fields() {
        let ct = encrypt("secret", "hunter2");
        let fields: Vec<&str> = ct.split(':').collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(hex::decode(fields[0]).unwrap().len(), IV_LEN);
        assert_eq!(hex::decode(fields[1]).unwrap().len(), TAG_LEN);
    }

    #[test]
    fn wrong_secret_fails_to_decrypt() {
        let ct = encrypt("secret-a", "payload");
        assert!(decrypt("secret-b", &ct).is_err());
    }

    #[test]
    fn malformed_ciphertext_rejected() {
        assert!(decrypt("secret", "not-the-right-shape").is_err());
        assert!(decrypt("secret", "aa:bb").is_err());
    }
}
