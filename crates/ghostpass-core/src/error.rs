//! Error types for ghostpass-core

use thiserror::Error;

/// Result type alias for ghostpass operations
pub type Result<T> = std::result::Result<T, GhostpassError>;

/// Ghostpass error types
#[derive(Error, Debug)]
pub enum GhostpassError {
    /// Reconstruction or rederivation attempted without a stored ciphertext
    #[error("No secret in field - nothing to rederive")]
    MissingSecret,

    /// AEAD open failed: wrong key or tampered ciphertext
    #[error("Authentication failed - wrong key or corrupted ciphertext")]
    Authentication,

    /// Decrypted plaintext could not be split into a username and password
    #[error("Malformed plaintext: {0}")]
    MalformedPlaintext(String),

    /// Guarded memory could not provide a cleartext view
    #[error("Guarded secret unavailable: {0}")]
    GuardedSecret(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Invalid master password")]
    InvalidPassword,

    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("Field already exists: {0}")]
    FieldExists(String),

    #[error("Store not found: {0}")]
    StoreNotFound(String),

    #[error("Store already exists: {0}")]
    StoreExists(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
