//! AES-256-GCM authenticated encryption
//!
//! Sealed blob format: `{iv}{ciphertext}{auth_tag}`
//! - IV: 12 bytes (96 bits) - standard for GCM
//! - Ciphertext: variable length
//! - Auth tag: 16 bytes (128 bits)

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use zeroize::Zeroizing;

use super::MasterKey;
use crate::error::{GhostpassError, Result};

/// GCM nonce length
pub const IV_LEN: usize = 12;

/// GCM authentication tag length
pub const TAG_LEN: usize = 16;

/// Symmetric authenticated cipher used to seal field secrets.
///
/// `seal` output must be self-describing; `open` must fail with
/// [`GhostpassError::Authentication`] on a wrong key or any tampering.
pub trait EnvelopeCipher {
    fn seal(&self, key: &MasterKey, plaintext: &[u8]) -> Result<Vec<u8>>;

    fn open(&self, key: &MasterKey, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>>;
}

/// Default cipher: AES-256-GCM with a random nonce per seal
#[derive(Debug, Clone, Copy, Default)]
pub struct Aes256GcmCipher;

impl EnvelopeCipher for Aes256GcmCipher {
    fn seal(&self, key: &MasterKey, plaintext: &[u8]) -> Result<Vec<u8>> {
        Ok(encrypt(plaintext, key)?.to_bytes())
    }

    fn open(&self, key: &MasterKey, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let encrypted = EncryptedData::from_bytes(sealed)?;
        decrypt(&encrypted, key)
    }
}

/// Encrypted data with IV and auth tag
#[derive(Debug, Clone)]
pub struct EncryptedData {
    /// Initialization vector (12 bytes for GCM)
    pub iv: [u8; IV_LEN],
    /// Authentication tag (16 bytes)
    pub auth_tag: [u8; TAG_LEN],
    /// Encrypted ciphertext
    pub ciphertext: Vec<u8>,
}

impl EncryptedData {
    /// Serialize to the sealed blob layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(IV_LEN + self.ciphertext.len() + TAG_LEN);
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&self.auth_tag);
        out
    }

    /// Parse a sealed blob. A truncated blob is reported as an
    /// authentication failure, same as any other tampering.
    pub fn from_bytes(blob: &[u8]) -> Result<Self> {
        if blob.len() < IV_LEN + TAG_LEN {
            return Err(GhostpassError::Authentication);
        }

        let (iv_bytes, rest) = blob.split_at(IV_LEN);
        let (ciphertext, tag_bytes) = rest.split_at(rest.len() - TAG_LEN);

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(iv_bytes);

        let mut auth_tag = [0u8; TAG_LEN];
        auth_tag.copy_from_slice(tag_bytes);

        Ok(Self {
            iv,
            auth_tag,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// Encrypt plaintext using AES-256-GCM
///
/// # Arguments
/// * `plaintext` - The data to encrypt
/// * `key` - The 256-bit encryption key
///
/// # Returns
/// Encrypted data containing IV, auth tag, and ciphertext
pub fn encrypt(plaintext: &[u8], key: &MasterKey) -> Result<EncryptedData> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| GhostpassError::Encryption(e.to_string()))?;

    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);
    let nonce = Nonce::from_slice(&iv);

    // aes-gcm appends the auth tag to the ciphertext
    let ciphertext_with_tag = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| GhostpassError::Encryption(e.to_string()))?;

    if ciphertext_with_tag.len() < TAG_LEN {
        return Err(GhostpassError::Encryption(
            "Ciphertext too short".to_string(),
        ));
    }

    let tag_start = ciphertext_with_tag.len() - TAG_LEN;
    let ciphertext = ciphertext_with_tag[..tag_start].to_vec();
    let mut auth_tag = [0u8; TAG_LEN];
    auth_tag.copy_from_slice(&ciphertext_with_tag[tag_start..]);

    Ok(EncryptedData {
        iv,
        auth_tag,
        ciphertext,
    })
}

/// Decrypt ciphertext using AES-256-GCM
///
/// The returned plaintext is wiped when dropped.
pub fn decrypt(encrypted: &EncryptedData, key: &MasterKey) -> Result<Zeroizing<Vec<u8>>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| GhostpassError::Encryption(e.to_string()))?;

    let nonce = Nonce::from_slice(&encrypted.iv);

    let mut ciphertext_with_tag = encrypted.ciphertext.clone();
    ciphertext_with_tag.extend_from_slice(&encrypted.auth_tag);

    cipher
        .decrypt(nonce, ciphertext_with_tag.as_slice())
        .map(Zeroizing::new)
        .map_err(|_| GhostpassError::Authentication)
}
