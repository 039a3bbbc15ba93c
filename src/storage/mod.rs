//! Storage module for the local database, flags and configuration.

pub mod config;
pub mod database;
pub mod flags;
pub mod local;
pub mod schema;

pub use config::{AppConfig, ConfigError, IdentitySettings, StorageSettings, SyncSettings};
pub use database::{Database, DatabaseError};
pub use flags::{flag_key, FlagError, FlagStore};
pub use local::LocalStore;
