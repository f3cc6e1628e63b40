//! Cache-related MCP tools.
//!
//! This module provides read-only views of the worker's cache areas.

pub mod areas;
pub mod get;

pub use areas::{CacheAreasParams, areas_impl};
pub use get::{CacheGetParams, get_impl};
