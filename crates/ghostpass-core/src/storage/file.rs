//! File storage backend
//!
//! Each store is one JSON file under `<data_dir>/stores/<name>.json`.
//! Writes go through a temp file and a rename so a crash never leaves a
//! half-written store behind.

use async_trait::async_trait;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::StoreBackend;
use crate::error::{GhostpassError, Result};

const STORE_EXTENSION: &str = "json";

/// Get the default data directory for ghostpass
pub fn default_data_dir() -> Result<PathBuf> {
    ProjectDirs::from("io", "ghostpass", "ghostpass")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| GhostpassError::Storage("Could not determine data directory".to_string()))
}

/// JSON file storage backend
pub struct FileBackend {
    /// Root directory, also home to `settings.json`
    data_dir: PathBuf,
    /// Directory holding one file per store
    stores_dir: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at the default data directory
    pub fn new() -> Result<Self> {
        Self::with_dir(default_data_dir()?)
    }

    /// Create with a custom data directory
    pub fn with_dir(data_dir: PathBuf) -> Result<Self> {
        let stores_dir = data_dir.join("stores");
        std::fs::create_dir_all(&stores_dir)?;

        debug!("File storage initialized at: {:?}", stores_dir);
        Ok(Self {
            data_dir,
            stores_dir,
        })
    }

    /// Get the root data directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the directory holding store files
    pub fn stores_dir(&self) -> &Path {
        &self.stores_dir
    }

    fn store_path(&self, name: &str) -> PathBuf {
        self.stores_dir.join(format!("{}.{}", name, STORE_EXTENSION))
    }
}

#[async_trait]
impl StoreBackend for FileBackend {
    async fn store(&self, name: &str, value: &[u8]) -> Result<()> {
        let path = self.store_path(name);

        // Write atomically using a temp file
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, value).await?;
        tokio::fs::rename(&temp_path, &path).await?;

        debug!("Stored {} bytes to {:?}", value.len(), path);
        Ok(())
    }

    async fn retrieve(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.store_path(name);

        if !path.exists() {
            debug!("Store file not found: {:?}", path);
            return Ok(None);
        }

        let contents = tokio::fs::read(&path).await?;
        debug!("Retrieved {} bytes from {:?}", contents.len(), path);
        Ok(Some(contents))
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let path = self.store_path(name);

        if !path.exists() {
            return Ok(false);
        }

        tokio::fs::remove_file(&path).await?;
        debug!("Deleted store file: {:?}", path);
        Ok(true)
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.store_path(name).exists())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.stores_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(STORE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    fn backend_name(&self) -> &'static str {
        "File Storage"
    }
}
