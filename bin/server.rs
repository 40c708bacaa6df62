// CardForge - Web Server
// REST API with Axum over the request façade

use anyhow::{Context, Result};
use cardforge::config::AppConfig;
use cardforge::server::{router, SESSION_HEADER};
use cardforge::Forge;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "cardforge.toml";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = AppConfig::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path))?;
    let bind = config.server.bind.clone();

    let forge = Forge::open(config).context("opening config store")?;
    info!(
        store = %forge.store().path(),
        addresses = forge.dataset().count(),
        "🌐 CardForge server ready"
    );

    let app = router(Arc::new(forge));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {}", bind))?;

    info!("🚀 listening on http://{}", bind);
    info!("   admin requests carry the `{}` header", SESSION_HEADER);

    axum::serve(listener, app)
        .await
        .context("server stopped")?;

    Ok(())
}
