//! precache worker entry point.
//!
//! Boots one worker generation for the configured version, installs and
//! activates it, then serves its event surface as MCP tools on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use precache_client::{FetchClient, FetchConfig, Worker};
use precache_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(version = %config.version, origin = %config.origin, "starting precache worker on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let fetcher = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let worker = Worker::new(config, db.clone(), fetcher)?;

    let report = worker.install().await?;
    if !report.is_complete() {
        tracing::warn!(failed = report.failed.len(), "installed with missing static assets");
    }
    worker.activate().await?;

    let handler = handler::PrecacheServer::new(Arc::new(worker), db.clone());
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;
    db.close().await?;

    Ok(())
}
