//! Cloud backup sync for FleetDesk.
//!
//! Provides best-effort replication of the console's local key-value data to
//! a shared remote document store:
//! - Change-detected push of global and per-tenant keys
//! - Destructive full restore from the remote collection
//! - Layered remote configuration (environment, explicit, bundled, persisted)
//! - HTTP client for the document API with anonymous sessions
//! - Typed change bus for telling other components to re-read local data

pub mod api_client;
pub mod change_bus;
pub mod config;
pub mod error;
pub mod keys;
pub mod local_store;
pub mod remote_store;
pub mod sync_engine;
pub mod types;

pub use change_bus::{ChangeBus, DataChange, RefreshTopic};
pub use config::{CoreConfig, RemoteStoreConfig};
pub use error::{CloudError, CloudResult};
pub use local_store::{FileLocalStore, LocalStore, MemoryLocalStore};
pub use remote_store::{MemoryRemoteStore, RemoteStore};
pub use sync_engine::SyncEngine;
pub use types::*;
