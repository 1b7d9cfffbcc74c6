use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::StoreBackend;
use crate::error::Result;

/// In-memory backend; contents vanish with the process
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn store(&self, name: &str, value: &[u8]) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(name.to_string(), value.to_vec());
        Ok(())
    }

    async fn retrieve(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(name).cloned())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(name).is_some())
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.entries.read().await.contains_key(name))
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }

    fn backend_name(&self) -> &'static str {
        "Memory Storage"
    }
}
