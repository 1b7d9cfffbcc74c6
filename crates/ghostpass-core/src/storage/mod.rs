//! Storage backends for store persistence
//!
//! This module provides two backends:
//! 1. JSON files under the platform data directory
//! 2. In-memory map (tests and ephemeral stores)

mod traits;
mod file;
mod memory;

pub use traits::StoreBackend;
pub use file::{default_data_dir, FileBackend};
pub use memory::MemoryBackend;
