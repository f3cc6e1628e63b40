//! Client side of precache.
//!
//! This crate provides the request router, the caching strategy executors,
//! the store manager, and the worker that ties them to lifecycle, message,
//! sync, and push events.

pub mod fetch;
pub mod offline;
pub mod router;
pub mod store;
pub mod strategy;
pub mod worker;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use fetch::{Destination, Fetch, FetchClient, FetchConfig, FetchRequest, FetchResponse, ResponseSource};
pub use router::{Router, Strategy};
pub use store::{ProvisionReport, StoreManager};
pub use strategy::StrategyExecutor;
pub use worker::{
    ClientEvent, ClientMessage, LogNotifier, MessageReply, Notification, Notifier, RawMessage, Worker, WorkerState,
};
