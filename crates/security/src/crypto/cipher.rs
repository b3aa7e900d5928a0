//! AES-256-GCM-SIV sealing and opening of individual field values.
//!
//! Every call to [`seal`] draws a fresh 96-bit nonce from the OS CSPRNG, so
//! the same plaintext stored twice yields two different ciphertexts. The
//! field name is bound in as associated data: a ciphertext copied into a
//! different column fails authentication.

use aes_gcm_siv::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng, Payload},
    Aes256GcmSiv, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use thiserror::Error;

use super::key::KeyBytes;

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Scheme tag at the start of every stored ciphertext.
///
/// Changing the algorithm, the key derivation, or the associated data means a
/// new tag and an explicit re-key of stored data.
pub const SCHEME_VERSION: &str = "v1";

/// A sealed field value as stored at rest.
///
/// The string form is `v1.<base64url(nonce)>.<base64url(ciphertext+tag)>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedValue {
    /// Raw nonce bytes.
    pub nonce: [u8; NONCE_LEN],
    /// Raw ciphertext + authentication tag bytes.
    pub ciphertext: Vec<u8>,
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// AES-GCM-SIV encryption or authentication failed.
    #[error("aead operation failed")]
    AeadFailure,

    /// The stored string is not `v1.<nonce>.<ciphertext>`.
    #[error("malformed ciphertext")]
    Malformed,

    /// The stored string carries a scheme tag this build cannot open.
    #[error("unsupported ciphertext scheme `{0}`")]
    UnsupportedScheme(String),

    /// The opened plaintext is not valid UTF-8.
    #[error("plaintext is not valid UTF-8")]
    NotUtf8,
}

impl SealedValue {
    /// Encode to the stored string form.
    pub fn encode(&self) -> String {
        format!(
            "{}.{}.{}",
            SCHEME_VERSION,
            URL_SAFE_NO_PAD.encode(self.nonce),
            URL_SAFE_NO_PAD.encode(&self.ciphertext),
        )
    }

    /// Parse the stored string form.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::UnsupportedScheme`] for a well-formed value with
    /// a different scheme tag, and [`CipherError::Malformed`] for anything else
    /// that does not parse.
    pub fn decode(s: &str) -> Result<Self, CipherError> {
        let mut parts = s.splitn(3, '.');
        let (Some(scheme), Some(nonce_b64), Some(ct_b64)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(CipherError::Malformed);
        };
        if scheme != SCHEME_VERSION {
            return Err(CipherError::UnsupportedScheme(scheme.to_owned()));
        }

        let nonce_bytes = URL_SAFE_NO_PAD
            .decode(nonce_b64)
            .map_err(|_| CipherError::Malformed)?;
        let nonce: [u8; NONCE_LEN] = nonce_bytes
            .as_slice()
            .try_into()
            .map_err(|_| CipherError::Malformed)?;

        let ciphertext = URL_SAFE_NO_PAD
            .decode(ct_b64)
            .map_err(|_| CipherError::Malformed)?;

        Ok(Self { nonce, ciphertext })
    }
}

/// Seal `plaintext` under `key`, binding `aad` (the field name).
///
/// # Errors
///
/// Returns [`CipherError::AeadFailure`] on an internal AEAD error.
pub fn seal(plaintext: &[u8], aad: &[u8], key: &KeyBytes) -> Result<SealedValue, CipherError> {
    let cipher = build_cipher(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce_bytes),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| CipherError::AeadFailure)?;

    Ok(SealedValue {
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Open a [`SealedValue`] back to plaintext bytes.
///
/// # Errors
///
/// Returns [`CipherError::AeadFailure`] if authentication fails: wrong key,
/// wrong field, or tampered bytes.
pub fn open(sealed: &SealedValue, aad: &[u8], key: &KeyBytes) -> Result<Vec<u8>, CipherError> {
    let cipher = build_cipher(key)?;
    cipher
        .decrypt(
            Nonce::from_slice(&sealed.nonce),
            Payload {
                msg: sealed.ciphertext.as_ref(),
                aad,
            },
        )
        .map_err(|_| CipherError::AeadFailure)
}

/// Seal a UTF-8 string and return the stored string form.
pub fn seal_str(plaintext: &str, aad: &str, key: &KeyBytes) -> Result<String, CipherError> {
    seal(plaintext.as_bytes(), aad.as_bytes(), key).map(|sealed| sealed.encode())
}

/// Parse and open a stored string, returning the UTF-8 plaintext.
pub fn open_str(stored: &str, aad: &str, key: &KeyBytes) -> Result<String, CipherError> {
    let sealed = SealedValue::decode(stored)?;
    let bytes = open(&sealed, aad.as_bytes(), key)?;
    String::from_utf8(bytes).map_err(|_| CipherError::NotUtf8)
}

fn build_cipher(key: &KeyBytes) -> Result<Aes256GcmSiv, CipherError> {
    Aes256GcmSiv::new_from_slice(key.as_bytes()).map_err(|_| CipherError::AeadFailure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KEY_LEN;

    fn random_key() -> KeyBytes {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        KeyBytes::from_slice(&key).unwrap()
    }

    #[test]
    fn seal_open_round_trip() {
        let key = random_key();
        let stored = seal_str("123-45-6789", "ssn", &key).unwrap();
        assert!(stored.starts_with("v1."));
        assert_ne!(stored, "123-45-6789");
        assert_eq!(open_str(&stored, "ssn", &key).unwrap(), "123-45-6789");
    }

    #[test]
    fn fresh_nonce_per_seal() {
        let key = random_key();
        let a = seal_str("same", "ssn", &key).unwrap();
        let b = seal_str("same", "ssn", &key).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails() {
        let stored = seal_str("secret", "ssn", &random_key()).unwrap();
        assert_eq!(
            open_str(&stored, "ssn", &random_key()),
            Err(CipherError::AeadFailure)
        );
    }

    #[test]
    fn moved_to_other_field_fails() {
        let key = random_key();
        let stored = seal_str("secret", "ssn", &key).unwrap();
        assert_eq!(open_str(&stored, "email", &key), Err(CipherError::AeadFailure));
    }

    #[test]
    fn tampered_ciphertext_fails_auth() {
        let key = random_key();
        let mut sealed = seal(b"tamper me", b"ssn", &key).unwrap();
        sealed.ciphertext[0] ^= 0x01;
        assert!(open(&sealed, b"ssn", &key).is_err());
    }

    #[test]
    fn decode_rejects_other_scheme() {
        assert_eq!(
            SealedValue::decode("v2.abc.def"),
            Err(CipherError::UnsupportedScheme("v2".into()))
        );
    }

    #[test]
    fn decode_rejects_plaintext() {
        assert_eq!(SealedValue::decode("123-45-6789"), Err(CipherError::Malformed));
        assert_eq!(SealedValue::decode("v1.abc"), Err(CipherError::Malformed));
        assert_eq!(SealedValue::decode("v1.!!!.abc"), Err(CipherError::Malformed));
    }

    #[test]
    fn decode_rejects_short_nonce() {
        let short = URL_SAFE_NO_PAD.encode([0u8; 4]);
        assert_eq!(
            SealedValue::decode(&format!("v1.{short}.AAAA")),
            Err(CipherError::Malformed)
        );
    }
}
