//! # ghostpass-core
//!
//! Core Ghostpass functionality including:
//! - Credential fields: a username/password pair sealed into one AES-256-GCM blob
//! - Guarded, zeroize-on-drop secret memory with scoped views
//! - Deniable decoy pairs attached to a field (in memory, not yet key-bound)
//! - Argon2id master-password stores with JSON persistence

pub mod crypto;
pub mod error;
pub mod field;
pub mod settings;
pub mod storage;
pub mod store;

pub use crypto::{derive_key, generate_salt, GuardedSecret, KeyDerivationParams, MasterKey, SecretView};
pub use error::{GhostpassError, Result};
pub use field::{DecodedPair, Field};
pub use settings::{Settings, SettingsManager};
pub use storage::{default_data_dir, FileBackend, MemoryBackend, StoreBackend};
pub use store::{SecretStore, StoreManager};
