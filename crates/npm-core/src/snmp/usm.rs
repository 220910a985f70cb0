//! SNMPv3 User-based Security Model (RFC 3414, extended per RFC 7860 for the SHA-2 auth
//! protocols and RFC 3826 for AES-CFB128 privacy).
//!
//! Built on primitive crates (`hmac`, `sha1`, `sha2`, `aes`, `cfb-mode`) rather than a vendored
//! SNMP library — no async, USM-capable Rust crate was available in the dependency stack (see
//! DESIGN.md).

use aes::{Aes128, Aes192, Aes256};
use aes::cipher::{AsyncStreamCipher, KeyIvInit};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};

use crate::device::{AuthProtocol, PrivProtocol};

type Aes128CfbEnc = cfb_mode::Encryptor<Aes128>;
type Aes128CfbDec = cfb_mode::Decryptor<Aes128>;
type Aes192CfbEnc = cfb_mode::Encryptor<Aes192>;
type Aes192CfbDec = cfb_mode::Decryptor<Aes192>;
type Aes256CfbEnc = cfb_mode::Encryptor<Aes256>;
type Aes256CfbDec = cfb_mode::Decryptor<Aes256>;

/// One megabyte, the password-to-key expansion target length (RFC 3414 Appendix A.2).
const PASSWORD_BUF_LEN: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgo {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgo {
    pub fn from_auth_protocol(p: AuthProtocol) -> Option<HashAlgo> {
        match p {
            AuthProtocol::Sha => Some(HashAlgo::Sha1),
            AuthProtocol::Sha224 => Some(HashAlgo::Sha224),
            AuthProtocol::Sha256 => Some(HashAlgo::Sha256),
            AuthProtocol::Sha384 => Some(HashAlgo::Sha384),
            AuthProtocol::Sha512 => Some(HashAlgo::Sha512),
            AuthProtocol::None => None,
        }
    }

    pub fn output_len(self) -> usize {
        match self {
            HashAlgo::Sha1 => 20,
            HashAlgo::Sha224 => 28,
            HashAlgo::Sha256 => 32,
            HashAlgo::Sha384 => 48,
            HashAlgo::Sha512 => 64,
        }
    }

    /// The HMAC truncation length used on the wire: 96 bits for SHA-1 (RFC 3414), and per
    /// RFC 7860 for the SHA-2 family (half the output length, rounded as specified there).
    pub fn auth_truncation_len(self) -> usize {
        match self {
            HashAlgo::Sha1 => 12,
            HashAlgo::Sha224 => 16,
            HashAlgo::Sha256 => 24,
            HashAlgo::Sha384 => 32,
            HashAlgo::Sha512 => 48,
        }
    }

    fn digest(self, data: &[u8]) -> Vec<u8> {
        use sha1::Digest as _;
        match self {
            HashAlgo::Sha1 => Sha1::digest(data).to_vec(),
            HashAlgo::Sha224 => Sha224::digest(data).to_vec(),
            HashAlgo::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgo::Sha384 => Sha384::digest(data).to_vec(),
            HashAlgo::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    fn hmac(self, key: &[u8], data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgo::Sha1 => {
                let mut mac = Hmac::<Sha1>::new_from_slice(key).expect("HMAC accepts any key length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            HashAlgo::Sha224 => {
                let mut mac = Hmac::<Sha224>::new_from_slice(key).expect("HMAC accepts any key length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            HashAlgo::Sha256 => {
                let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts any key length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            HashAlgo::Sha384 => {
                let mut mac = Hmac::<Sha384>::new_from_slice(key).expect("HMAC accepts any key length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            HashAlgo::Sha512 => {
                let mut mac = Hmac::<Sha512>::new_from_slice(key).expect("HMAC accepts any key length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
        }
    }
}

/// Password-to-key algorithm, RFC 3414 Appendix A.2: the password is repeated to fill exactly
/// one megabyte, then hashed once. Generalized to the SHA-2 family per RFC 7860.
pub fn password_to_key(password: &[u8], algo: HashAlgo) -> Vec<u8> {
    if password.is_empty() {
        return algo.digest(&[]);
    }
    let mut buf = Vec::with_capacity(PASSWORD_BUF_LEN);
    while buf.len() < PASSWORD_BUF_LEN {
        let take = (PASSWORD_BUF_LEN - buf.len()).min(password.len());
        buf.extend_from_slice(&password[..take]);
    }
    algo.digest(&buf)
}

/// Key localization, RFC 3414 Appendix A.2: `Kl = Hash(Ku || engineID || Ku)`.
pub fn localize_key(ku: &[u8], engine_id: &[u8], algo: HashAlgo) -> Vec<u8> {
    let mut buf = Vec::with_capacity(ku.len() * 2 + engine_id.len());
    buf.extend_from_slice(ku);
    buf.extend_from_slice(engine_id);
    buf.extend_from_slice(ku);
    algo.digest(&buf)
}

/// Convenience: password -> localized key in one call.
pub fn password_to_localized_key(password: &[u8], engine_id: &[u8], algo: HashAlgo) -> Vec<u8> {
    let ku = password_to_key(password, algo);
    localize_key(&ku, engine_id, algo)
}

/// Extends a localized key to `needed_len` bytes when the privacy algorithm needs more key
/// material than the hash produces (e.g. AES-192/256 from a SHA-1-localized key), per the
/// key-extension algorithm referenced by RFC 3826 Section 3.1.2.1: repeatedly hash the
/// previous block and append until enough bytes are available.
pub fn extend_key(key: &[u8], needed_len: usize, algo: HashAlgo) -> Vec<u8> {
    let mut out = key.to_vec();
    while out.len() < needed_len {
        let last_block_start = out.len().saturating_sub(algo.output_len());
        let next = algo.digest(&out[last_block_start..]);
        out.extend_from_slice(&next);
    }
    out.truncate(needed_len);
    out
}

/// Computes the truncated HMAC authentication code over `whole_message` (the full serialized
/// SNMPv3 message with the authParameters field zeroed).
pub fn authenticate(auth_key: &[u8], algo: HashAlgo, whole_message: &[u8]) -> Vec<u8> {
    let mac = algo.hmac(auth_key, whole_message);
    mac[..algo.auth_truncation_len()].to_vec()
}

pub fn verify(auth_key: &[u8], algo: HashAlgo, whole_message: &[u8], received: &[u8]) -> bool {
    authenticate(auth_key, algo, whole_message) == received
}

fn aes_key_len(priv_protocol: PrivProtocol) -> usize {
    match priv_protocol {
        PrivProtocol::Aes128 => 16,
        PrivProtocol::Aes192 => 24,
        PrivProtocol::Aes256 => 32,
        PrivProtocol::None => 0,
    }
}

/// Builds the RFC 3826 AES-CFB128 IV: `engineBoots(4) || engineTime(4) || salt(8)`.
fn build_iv(engine_boots: u32, engine_time: u32, salt: u64) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[0..4].copy_from_slice(&engine_boots.to_be_bytes());
    iv[4..8].copy_from_slice(&engine_time.to_be_bytes());
    iv[8..16].copy_from_slice(&salt.to_be_bytes());
    iv
}

/// Encrypts `plaintext` (a BER-encoded ScopedPDU) with AES-CFB128, returning the ciphertext and
/// the 8-byte `msgPrivacyParameters` (the salt) to place on the wire. The cipher width (AES-128/
/// 192/256) is selected by `priv_protocol`, each keyed with its own full `aes_key_len` bytes.
pub fn aes_cfb_encrypt(
    priv_key: &[u8],
    priv_protocol: PrivProtocol,
    engine_boots: u32,
    engine_time: u32,
    salt: u64,
    plaintext: &[u8],
) -> (Vec<u8>, [u8; 8]) {
    let key_len = aes_key_len(priv_protocol);
    let key = &priv_key[..key_len.min(priv_key.len())];
    let iv = build_iv(engine_boots, engine_time, salt);

    let mut buf = plaintext.to_vec();
    match priv_protocol {
        PrivProtocol::Aes128 => Aes128CfbEnc::new_from_slices(key, &iv).expect("16-byte key/IV").encrypt(&mut buf),
        PrivProtocol::Aes192 => Aes192CfbEnc::new_from_slices(key, &iv).expect("24-byte key/16-byte IV").encrypt(&mut buf),
        PrivProtocol::Aes256 => Aes256CfbEnc::new_from_slices(key, &iv).expect("32-byte key/16-byte IV").encrypt(&mut buf),
        PrivProtocol::None => {}
    }

    (buf, salt.to_be_bytes())
}

pub fn aes_cfb_decrypt(
    priv_key: &[u8],
    priv_protocol: PrivProtocol,
    engine_boots: u32,
    engine_time: u32,
    priv_parameters: &[u8; 8],
    ciphertext: &[u8],
) -> Vec<u8> {
    let key_len = aes_key_len(priv_protocol);
    let key = &priv_key[..key_len.min(priv_key.len())];
    let salt = u64::from_be_bytes(*priv_parameters);
    let iv = build_iv(engine_boots, engine_time, salt);

    let mut buf = ciphertext.to_vec();
    match priv_protocol {
        PrivProtocol::Aes128 => Aes128CfbDec::new_from_slices(key, &iv).expect("16-byte key/IV").decrypt(&mut buf),
        PrivProtocol::Aes192 => Aes192CfbDec::new_from_slices(key, &iv).expect("24-byte key/16-byte IV").decrypt(&mut buf),
        PrivProtocol::Aes256 => Aes256CfbDec::new_from_slices(key, &iv).expect("32-byte key/16-byte IV").decrypt(&mut buf),
        PrivProtocol::None => {}
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_to_key_is_deterministic() {
        let k1 = password_to_key(b"maplesyrup", HashAlgo::Sha1);
        let k2 = password_to_key(b"maplesyrup", HashAlgo::Sha1);
        assert_eq!(k1, k2);
        assert_eq!(k1.len(), 20);
    }

    #[test]
    fn localized_key_depends_on_engine_id() {
        let ku = password_to_key(b"maplesyrup", HashAlgo::Sha1);
        let kl_a = localize_key(&ku, b"engine-a", HashAlgo::Sha1);
        let kl_b = localize_key(&ku, b"engine-b", HashAlgo::Sha1);
        assert_ne!(kl_a, kl_b);
    }

    #[test]
    fn auth_truncation_lengths_match_protocol_table() {
        assert_eq!(HashAlgo::Sha1.auth_truncation_len(), 12);
        assert_eq!(HashAlgo::Sha224.auth_truncation_len(), 16);
        assert_eq!(HashAlgo::Sha256.auth_truncation_len(), 24);
        assert_eq!(HashAlgo::Sha384.auth_truncation_len(), 32);
        assert_eq!(HashAlgo::Sha512.auth_truncation_len(), 48);
    }

    #[test]
    fn authenticate_and_verify_round_trip() {
        let key = password_to_localized_key(b"authpass", b"engine-id-bytes", HashAlgo::Sha256);
        let msg = b"whole SNMPv3 message bytes";
        let tag = authenticate(&key, HashAlgo::Sha256, msg);
        assert_eq!(tag.len(), HashAlgo::Sha256.auth_truncation_len());
        assert!(verify(&key, HashAlgo::Sha256, msg, &tag));
        assert!(!verify(&key, HashAlgo::Sha256, b"tampered message", &tag));
    }

    #[test]
    fn extend_key_produces_requested_length() {
        let short = password_to_key(b"p", HashAlgo::Sha1); // 20 bytes
        let extended = extend_key(&short, 32, HashAlgo::Sha1);
        assert_eq!(extended.len(), 32);
        assert_eq!(&extended[..20], &short[..]);
    }

    #[test]
    fn aes_cfb_round_trips() {
        let priv_key = password_to_localized_key(b"privpass", b"engine-id", HashAlgo::Sha1);
        let priv_key = extend_key(&priv_key, 16, HashAlgo::Sha1);
        let plaintext = b"a ScopedPDU worth of bytes......";
        let (ciphertext, salt) =
            aes_cfb_encrypt(&priv_key, PrivProtocol::Aes128, 5, 1000, 0xDEAD_BEEF, plaintext);
        let decrypted = aes_cfb_decrypt(&priv_key, PrivProtocol::Aes128, 5, 1000, &salt, &ciphertext);
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn aes192_cfb_round_trips() {
        let priv_key = password_to_localized_key(b"privpass", b"engine-id", HashAlgo::Sha1);
        let priv_key = extend_key(&priv_key, aes_key_len(PrivProtocol::Aes192), HashAlgo::Sha1);
        let plaintext = b"a ScopedPDU worth of bytes......";
        let (ciphertext, salt) =
            aes_cfb_encrypt(&priv_key, PrivProtocol::Aes192, 5, 1000, 0xDEAD_BEEF, plaintext);
        assert_ne!(ciphertext, plaintext);
        let decrypted = aes_cfb_decrypt(&priv_key, PrivProtocol::Aes192, 5, 1000, &salt, &ciphertext);
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn aes256_cfb_round_trips() {
        let priv_key = password_to_localized_key(b"privpass", b"engine-id", HashAlgo::Sha256);
        let priv_key = extend_key(&priv_key, aes_key_len(PrivProtocol::Aes256), HashAlgo::Sha256);
        let plaintext = b"a ScopedPDU worth of bytes......";
        let (ciphertext, salt) =
            aes_cfb_encrypt(&priv_key, PrivProtocol::Aes256, 5, 1000, 0xDEAD_BEEF, plaintext);
        assert_ne!(ciphertext, plaintext);
        let decrypted = aes_cfb_decrypt(&priv_key, PrivProtocol::Aes256, 5, 1000, &salt, &ciphertext);
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn different_key_sizes_produce_different_ciphertext() {
        let priv_key = password_to_localized_key(b"privpass", b"engine-id", HashAlgo::Sha256);
        let key128 = extend_key(&priv_key, aes_key_len(PrivProtocol::Aes128), HashAlgo::Sha256);
        let key256 = extend_key(&priv_key, aes_key_len(PrivProtocol::Aes256), HashAlgo::Sha256);
        let plaintext = b"a ScopedPDU worth of bytes......";
        let (ct128, _) = aes_cfb_encrypt(&key128, PrivProtocol::Aes128, 5, 1000, 0xDEAD_BEEF, plaintext);
        let (ct256, _) = aes_cfb_encrypt(&key256, PrivProtocol::Aes256, 5, 1000, 0xDEAD_BEEF, plaintext);
        assert_ne!(ct128, ct256);
    }
}
