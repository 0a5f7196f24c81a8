// SPDX-License-Identifier: MIT OR Apache-2.0
//! AuraScan progression server binary entry point.

use std::sync::Arc;

use aura_progression::{MemoryStore, ProgressionEngine};
use aura_server::{AuraServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aura_server=info".parse()?)
                .add_directive("aura_progression=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    // Load configuration from environment or defaults
    let config = ServerConfig::from_env()?;
    config.validate()?;
    let progression = config.progression_config()?;

    tracing::info!(
        level_ceiling = progression.curve.level_ceiling,
        achievements = progression.achievements.len(),
        "Loaded progression config"
    );

    let engine = ProgressionEngine::new(Arc::new(MemoryStore::new()), progression)?;
    let server = AuraServer::new(Arc::new(engine), config);
    server.serve().await?;

    Ok(())
}
