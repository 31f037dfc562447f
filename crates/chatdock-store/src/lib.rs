//! # chatdock-store
//!
//! Durable client-side key/value storage for chatdock.
//!
//! The docking engine only needs a small string-keyed store to survive
//! restarts. This crate exposes that capability as the [`KeyValueStore`]
//! trait with two implementations: [`SqliteStore`], backed by a local SQLite
//! file in the platform data directory, and [`MemoryStore`] for tests and
//! environments without persistent storage.

pub mod database;
pub mod kv;
pub mod memory;
pub mod migrations;

mod error;

pub use database::SqliteStore;
pub use error::{Result, StoreError};
pub use kv::{load_json, save_json, KeyValueStore};
pub use memory::MemoryStore;
