//! Store manager for create/load/save/delete of secret stores

use std::sync::Arc;
use tracing::{debug, info};

use super::types::{validate_store_name, SecretStore};
use crate::crypto::{KeyDerivationParams, MasterKey};
use crate::error::{GhostpassError, Result};
use crate::storage::StoreBackend;

/// Store manager
pub struct StoreManager {
    /// Storage backend
    backend: Arc<dyn StoreBackend>,
}

impl StoreManager {
    /// Create a new store manager
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    /// Name of the underlying backend
    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Create and persist a new store
    pub async fn create(
        &self,
        name: &str,
        master_password: &str,
        params: Option<KeyDerivationParams>,
    ) -> Result<(SecretStore, MasterKey)> {
        validate_store_name(name)?;

        if self.backend.exists(name).await? {
            return Err(GhostpassError::StoreExists(name.to_string()));
        }

        let (store, key) = SecretStore::initialize(name, master_password, params)?;
        self.save(&store).await?;

        info!("Created store: {} ({})", name, self.backend.backend_name());
        Ok((store, key))
    }

    /// Load a store without deriving any cleartext
    pub async fn load(&self, name: &str) -> Result<SecretStore> {
        validate_store_name(name)?;

        let data = self
            .backend
            .retrieve(name)
            .await?
            .ok_or_else(|| GhostpassError::StoreNotFound(name.to_string()))?;

        let store: SecretStore = serde_json::from_slice(&data)?;
        debug!("Loaded store {} with {} fields", name, store.len());
        Ok(store)
    }

    /// Load a store, unlock it, and rederive every field
    pub async fn open(&self, name: &str, master_password: &str) -> Result<(SecretStore, MasterKey)> {
        let mut store = self.load(name).await?;
        let key = store.unlock(master_password)?;
        store.rederive_all(&key)?;

        info!("Opened store: {}", name);
        Ok((store, key))
    }

    /// Persist a store
    pub async fn save(&self, store: &SecretStore) -> Result<()> {
        validate_store_name(&store.name)?;

        let data = serde_json::to_vec_pretty(store)?;
        self.backend.store(&store.name, &data).await?;

        debug!("Saved store {} ({} fields)", store.name, store.len());
        Ok(())
    }

    /// Delete a store
    pub async fn delete(&self, name: &str) -> Result<()> {
        validate_store_name(name)?;

        if !self.backend.delete(name).await? {
            return Err(GhostpassError::StoreNotFound(name.to_string()));
        }

        info!("Deleted store: {}", name);
        Ok(())
    }

    /// Check whether a store exists
    pub async fn exists(&self, name: &str) -> Result<bool> {
        validate_store_name(name)?;
        self.backend.exists(name).await
    }

    /// List all store names
    pub async fn list(&self) -> Result<Vec<String>> {
        self.backend.list().await
    }
}
