//! Secret store type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::crypto::{
    derive_key, generate_salt, Aes256GcmCipher, EnvelopeCipher, GuardedSecret,
    KeyDerivationParams, MasterKey,
};
use crate::error::{GhostpassError, Result};
use crate::field::Field;

/// Known plaintext sealed into every store to verify derived keys
const CHECKSUM_PLAINTEXT: &[u8] = b"ghostpass-checksum";

/// Current store file version
pub const STORE_VERSION: u32 = 1;

/// A named collection of fields sharing one master password.
///
/// The master key is never held by the store; every operation that needs it
/// takes it as an argument.
#[derive(Debug, Serialize, Deserialize)]
pub struct SecretStore {
    /// Store name (also its storage key)
    pub name: String,

    /// Store file version
    pub version: u32,

    /// Argon2 salt for the master password
    salt: String,

    /// KDF parameters the store was created with
    kdf: KeyDerivationParams,

    /// Sealed known plaintext (hex)
    checksum: String,

    /// Fields keyed by service name
    fields: BTreeMap<String, Field>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl SecretStore {
    /// Create an empty store and derive its master key
    pub fn initialize(
        name: &str,
        master_password: &str,
        params: Option<KeyDerivationParams>,
    ) -> Result<(Self, MasterKey)> {
        validate_store_name(name)?;
        if master_password.is_empty() {
            return Err(GhostpassError::InvalidInput(
                "master password is not optional".to_string(),
            ));
        }

        let kdf = params.unwrap_or_default();
        let salt = generate_salt();
        let key = derive_key(master_password, &salt, &kdf)?;
        let checksum = hex::encode(Aes256GcmCipher.seal(&key, CHECKSUM_PLAINTEXT)?);

        let now = Utc::now();
        let store = Self {
            name: name.to_string(),
            version: STORE_VERSION,
            salt,
            kdf,
            checksum,
            fields: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        };

        info!("Initialized store: {}", name);
        Ok((store, key))
    }

    /// Derive the master key from a password and verify it against the checksum
    pub fn unlock(&self, master_password: &str) -> Result<MasterKey> {
        let key = derive_key(master_password, &self.salt, &self.kdf)?;

        if !self.verify_key(&key)? {
            return Err(GhostpassError::InvalidPassword);
        }

        debug!("Unlocked store: {}", self.name);
        Ok(key)
    }

    /// Check whether `key` opens this store's checksum
    pub fn verify_key(&self, key: &MasterKey) -> Result<bool> {
        let sealed = hex::decode(&self.checksum)
            .map_err(|e| GhostpassError::Storage(format!("Invalid checksum hex: {}", e)))?;

        match Aes256GcmCipher.open(key, &sealed) {
            Ok(plaintext) => Ok(plaintext.as_slice() == CHECKSUM_PLAINTEXT),
            Err(GhostpassError::Authentication) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Rederive the cleartext handles of every field
    pub fn rederive_all(&mut self, key: &MasterKey) -> Result<()> {
        for (service, field) in self.fields.iter_mut() {
            field.rederive(key).map_err(|e| {
                debug!("Failed to rederive field {}: {}", service, e);
                e
            })?;
        }

        debug!("Rederived {} fields in store {}", self.fields.len(), self.name);
        Ok(())
    }

    /// Wipe every field's cleartext handles
    pub fn lock(&mut self) {
        for field in self.fields.values_mut() {
            field.forget_cleartext();
        }
        debug!("Locked store: {}", self.name);
    }

    /// Add a new field for `service`
    pub fn add_field(
        &mut self,
        key: &MasterKey,
        service: &str,
        username: &str,
        password: GuardedSecret,
    ) -> Result<()> {
        validate_service(service)?;
        self.ensure_key(key)?;

        if self.fields.contains_key(service) {
            return Err(GhostpassError::FieldExists(service.to_string()));
        }

        let field = Field::new(key, username, password)?;
        self.fields.insert(service.to_string(), field);
        self.touch();

        info!("Added field: {}", service);
        Ok(())
    }

    /// Replace the credentials of an existing field
    pub fn overwrite_field(
        &mut self,
        key: &MasterKey,
        service: &str,
        username: &str,
        password: GuardedSecret,
    ) -> Result<()> {
        self.ensure_key(key)?;

        let slot = self
            .fields
            .get_mut(service)
            .ok_or_else(|| GhostpassError::FieldNotFound(service.to_string()))?;

        *slot = Field::new(key, username, password)?;
        self.touch();

        info!("Overwrote field: {}", service);
        Ok(())
    }

    /// Remove a field, returning it
    pub fn remove_field(&mut self, service: &str) -> Result<Field> {
        let field = self
            .fields
            .remove(service)
            .ok_or_else(|| GhostpassError::FieldNotFound(service.to_string()))?;
        self.touch();

        info!("Removed field: {}", service);
        Ok(field)
    }

    /// Attach a decoy pair to an existing field (in memory only)
    pub fn add_deniable(
        &mut self,
        service: &str,
        username: &str,
        password: &GuardedSecret,
    ) -> Result<()> {
        self.fields
            .get_mut(service)
            .ok_or_else(|| GhostpassError::FieldNotFound(service.to_string()))?
            .add_deniable_secret(username, password)
    }

    /// Insert a field from its exported hex auth pair
    pub fn import_field(&mut self, key: &MasterKey, service: &str, encoded: &str) -> Result<()> {
        validate_service(service)?;
        self.ensure_key(key)?;

        if self.fields.contains_key(service) {
            return Err(GhostpassError::FieldExists(service.to_string()));
        }

        let field = Field::from_hex(key, encoded)?;
        self.fields.insert(service.to_string(), field);
        self.touch();

        info!("Imported field: {}", service);
        Ok(())
    }

    /// Look up a field by service name
    pub fn field(&self, service: &str) -> Result<&Field> {
        self.fields
            .get(service)
            .ok_or_else(|| GhostpassError::FieldNotFound(service.to_string()))
    }

    /// Iterate over all fields in service order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn ensure_key(&self, key: &MasterKey) -> Result<()> {
        if self.verify_key(key)? {
            Ok(())
        } else {
            Err(GhostpassError::InvalidPassword)
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn validate_service(service: &str) -> Result<()> {
    if service.trim().is_empty() {
        return Err(GhostpassError::InvalidInput(
            "service name must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Store names double as file stems, so keep them to a conservative charset
pub(crate) fn validate_store_name(name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && name.len() <= 128
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if ok {
        Ok(())
    } else {
        Err(GhostpassError::InvalidInput(format!(
            "invalid store name: {:?}",
            name
        )))
    }
}
