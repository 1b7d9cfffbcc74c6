//! Storage trait definitions

use crate::error::Result;
use async_trait::async_trait;

/// Trait for store persistence backends.
///
/// Values are serialized stores. Only sealed auth pairs ever reach a
/// backend, so backends do not encrypt on their own.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Store a value under the given store name
    async fn store(&self, name: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a value by store name
    async fn retrieve(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a value, returning whether it existed
    async fn delete(&self, name: &str) -> Result<bool>;

    /// Check if a store name exists
    async fn exists(&self, name: &str) -> Result<bool>;

    /// List all stored names, sorted
    async fn list(&self) -> Result<Vec<String>>;

    /// Get a human-readable name for this backend
    fn backend_name(&self) -> &'static str;
}
