//! Cryptographic primitives for field secrets
//!
//! This module provides:
//! - AES-256-GCM authenticated encryption behind the [`EnvelopeCipher`] seam
//! - Argon2id key derivation from master passwords
//! - Guarded secret memory with zeroize

mod encryption;
mod key_derivation;
mod secure_memory;

pub use encryption::{decrypt, encrypt, Aes256GcmCipher, EncryptedData, EnvelopeCipher, IV_LEN, TAG_LEN};
pub use key_derivation::{derive_key, generate_salt, KeyDerivationParams};
pub use secure_memory::{GuardedSecret, MasterKey, SecretView, KEY_LEN};
