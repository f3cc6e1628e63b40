//! SQLite-backed store of named, versioned cache areas.
//!
//! This module provides a persistent response cache using SQLite with async
//! access via tokio-rusqlite. It supports:
//!
//! - Areas named with a version suffix, grouped under an application prefix
//! - Request-identity keys using SHA-256 hashing
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Version reaping and full clears scoped to the application prefix

pub mod areas;
pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use areas::{AreaPurpose, CacheArea};
pub use connection::CacheDb;
pub use entries::CacheEntry;
