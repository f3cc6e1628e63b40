//! Core types and shared functionality for precache.
//!
//! This crate provides:
//! - Cache area store with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{AreaPurpose, CacheArea, CacheDb, CacheEntry};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
