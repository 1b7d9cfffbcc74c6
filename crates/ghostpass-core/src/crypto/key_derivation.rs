//! Argon2id derivation of a store's master key

use argon2::{Algorithm, Argon2, Params, Version};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use super::secure_memory::KEY_LEN;
use super::MasterKey;
use crate::error::{GhostpassError, Result};

/// Salt length in bytes
pub const SALT_LEN: usize = 16;

/// Argon2id cost settings.
///
/// Every store records the params it was created with, so a store keeps
/// opening after the defaults in settings change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDerivationParams {
    /// KiB
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for KeyDerivationParams {
    fn default() -> Self {
        Self {
            memory_cost: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl KeyDerivationParams {
    fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            Some(KEY_LEN),
        )
        .map_err(|e| GhostpassError::KeyDerivation(e.to_string()))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Fresh random salt for a new store, hex encoded
pub fn generate_salt() -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    hex::encode(salt)
}

/// Derive a store's master key from its password, salt and params.
///
/// The Argon2 output is written straight into the key buffer, so no
/// unwiped copy of the key is left behind.
pub fn derive_key(password: &str, salt: &str, params: &KeyDerivationParams) -> Result<MasterKey> {
    let salt = hex::decode(salt)
        .map_err(|e| GhostpassError::KeyDerivation(format!("Invalid salt: {}", e)))?;

    let mut key = MasterKey::new([0u8; KEY_LEN]);
    params
        .argon2()?
        .hash_password_into(password.as_bytes(), &salt, key.as_bytes_mut())
        .map_err(|e| GhostpassError::KeyDerivation(e.to_string()))?;

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> KeyDerivationParams {
        KeyDerivationParams {
            memory_cost: 8192,
            time_cost: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_salt_shape() {
        let salt = generate_salt();
        assert_eq!(salt.len(), SALT_LEN * 2);
        assert_ne!(salt, generate_salt());
    }

    #[test]
    fn test_reopening_store_gives_same_key() {
        let salt = generate_salt();

        let created = derive_key("master-password", &salt, &fast()).unwrap();
        let reopened = derive_key("master-password", &salt, &fast()).unwrap();

        assert_eq!(created.as_bytes(), reopened.as_bytes());
    }

    #[test]
    fn test_stores_with_same_password_get_different_keys() {
        let personal = derive_key("master-password", &generate_salt(), &fast()).unwrap();
        let work = derive_key("master-password", &generate_salt(), &fast()).unwrap();

        assert_ne!(personal.as_bytes(), work.as_bytes());
    }

    #[test]
    fn test_key_depends_on_password_and_params() {
        let salt = generate_salt();
        let base = derive_key("master-password", &salt, &fast()).unwrap();

        let other_password = derive_key("guess", &salt, &fast()).unwrap();
        assert_ne!(base.as_bytes(), other_password.as_bytes());

        let slower = KeyDerivationParams {
            time_cost: 2,
            ..fast()
        };
        let other_params = derive_key("master-password", &salt, &slower).unwrap();
        assert_ne!(base.as_bytes(), other_params.as_bytes());
    }

    #[test]
    fn test_params_json_shape() {
        let json = serde_json::to_string(&fast()).unwrap();
        assert_eq!(json, r#"{"memoryCost":8192,"timeCost":1,"parallelism":1}"#);

        let parsed: KeyDerivationParams = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, fast());
    }

    #[test]
    fn test_bad_salt_rejected() {
        for salt in ["not-hex", "abcd"] {
            assert!(matches!(
                derive_key("master-password", salt, &fast()),
                Err(GhostpassError::KeyDerivation(_))
            ));
        }
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = KeyDerivationParams {
            memory_cost: 1,
            time_cost: 0,
            parallelism: 0,
        };
        let result = derive_key("master-password", &generate_salt(), &params);
        assert!(matches!(result, Err(GhostpassError::KeyDerivation(_))));
    }
}
