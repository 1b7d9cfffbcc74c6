//! Secret stores: named collections of fields under one master password

mod manager;
mod types;

pub use manager::StoreManager;
pub use types::{SecretStore, STORE_VERSION};
