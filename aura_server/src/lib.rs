// SPDX-License-Identifier: MIT OR Apache-2.0
//! AuraScan progression server.
//!
//! Exposes the [`ProgressionEngine`] over a JSON REST API:
//!
//! - Progression records, XP grants and karma adjustments
//! - Quest assignment, progress and claims
//! - Achievement listing, evaluation and manual unlocks
//! - Ledger reconciliation and health checks
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use aura_progression::{MemoryStore, ProgressionConfig, ProgressionEngine};
//! use aura_server::{AuraServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = ProgressionEngine::new(Arc::new(MemoryStore::new()), ProgressionConfig::default())?;
//!     let server = AuraServer::new(Arc::new(engine), ServerConfig::default());
//!     server.serve().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::unused_async)]

use std::future::Future;
use std::sync::Arc;

use aura_progression::ProgressionEngine;
use axum::Router;
use tokio::net::TcpListener;

pub mod audit;
pub mod config;
pub mod error;
pub mod rest;
pub mod signals;

pub use audit::{AuditConfig, AuditEntry, AuditEvent, AuditLogger};
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use rest::{ProgressionApiContext, RestConfig};

/// The progression HTTP server.
#[derive(Debug)]
pub struct AuraServer {
    engine: Arc<ProgressionEngine>,
    config: ServerConfig,
    audit_logger: Option<Arc<AuditLogger>>,
}

impl AuraServer {
    /// Create a new server around an engine.
    #[must_use]
    pub fn new(engine: Arc<ProgressionEngine>, config: ServerConfig) -> Self {
        let audit_logger = config
            .audit
            .as_ref()
            .map(|c| Arc::new(AuditLogger::new(c.clone())));

        Self {
            engine,
            config,
            audit_logger,
        }
    }

    /// Get the audit logger, if auditing is enabled.
    #[must_use]
    pub fn audit_logger(&self) -> Option<&Arc<AuditLogger>> {
        self.audit_logger.as_ref()
    }

    /// Get the server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the HTTP router without binding a socket.
    pub fn router(&self) -> Router {
        let ctx = ProgressionApiContext::new(Arc::clone(&self.engine))
            .with_audit_logger(self.audit_logger.clone());
        let rest_config = RestConfig::new().with_max_body_size(self.config.max_body_size);
        rest::router_with_config(Arc::new(ctx), &rest_config)
    }

    /// Start the server and run until SIGTERM or SIGINT.
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(signals::wait_for_shutdown_signal())
            .await
    }

    /// Start the server and run until `shutdown` completes.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.config.validate()?;

        let addr = self.config.bind_addr;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Starting AuraScan progression server on {}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Server shut down");
        Ok(())
    }
}
