// SPDX-License-Identifier: MIT OR Apache-2.0
//! REST API for user progression.
//!
//! All routes live under `/api/v1`. Handlers are thin: they parse the
//! request, call the engine, audit the change and serialize the outcome.

use std::sync::Arc;

use aura_progression::ProgressionEngine;
use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::audit::{AuditEvent, AuditLogger};
use crate::config::DEFAULT_MAX_BODY_SIZE;

pub mod achievements;
pub mod error;
pub mod progression;
pub mod quests;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use types::*;

/// Context shared across REST handlers.
#[derive(Debug)]
pub struct ProgressionApiContext {
    /// Progression engine.
    pub engine: Arc<ProgressionEngine>,
    /// Audit logger.
    pub audit_logger: Option<Arc<AuditLogger>>,
}

impl ProgressionApiContext {
    /// Create a new context around an engine.
    #[must_use]
    pub const fn new(engine: Arc<ProgressionEngine>) -> Self {
        Self {
            engine,
            audit_logger: None,
        }
    }

    /// Add audit logger.
    #[must_use]
    pub fn with_audit_logger(mut self, audit_logger: Option<Arc<AuditLogger>>) -> Self {
        self.audit_logger = audit_logger;
        self
    }

    pub(crate) fn audit(&self, event: AuditEvent) {
        if let Some(ref logger) = self.audit_logger {
            logger.record(event);
        }
    }
}

/// REST API configuration.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl RestConfig {
    /// Create a new REST configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum body size.
    #[must_use]
    pub const fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }
}

/// Create the REST API router.
pub fn router(ctx: Arc<ProgressionApiContext>) -> Router {
    router_with_config(ctx, &RestConfig::default())
}

/// Create the REST API router with custom configuration.
pub fn router_with_config(ctx: Arc<ProgressionApiContext>, config: &RestConfig) -> Router {
    let api = Router::new()
        // Progression
        .route("/users/{user_id}", post(progression::create).get(progression::get))
        .route(
            "/users/{user_id}/xp",
            post(progression::grant).get(progression::history),
        )
        .route("/users/{user_id}/karma", post(progression::adjust_karma))
        .route("/users/{user_id}/activity", post(progression::record_activity))
        .route("/users/{user_id}/reconcile", post(progression::reconcile))
        .route("/levels/{total_xp}", get(progression::level_lookup))
        // Quests
        .route(
            "/users/{user_id}/quests",
            get(quests::list).post(quests::assign),
        )
        .route(
            "/users/{user_id}/quests/{quest_id}/progress",
            post(quests::progress),
        )
        .route("/users/{user_id}/quests/{quest_id}/claim", post(quests::claim))
        // Achievements
        .route("/achievements", get(achievements::catalogue))
        .route("/users/{user_id}/achievements", get(achievements::list))
        .route(
            "/users/{user_id}/achievements/{achievement_id}/evaluate",
            post(achievements::evaluate),
        )
        .route(
            "/users/{user_id}/achievements/{achievement_id}/unlock",
            post(achievements::unlock),
        )
        .route("/health", get(progression::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(config.max_body_size))
        .with_state(ctx)
}
