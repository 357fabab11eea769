//! Storefront checkout service

use anyhow::Result;
use storefront_checkout::api::{router, AppState};
use storefront_checkout::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let port = config.port;
    tracing::info!(data_dir = %config.data_dir.display(), bulk_threshold = %config.pricing.bulk_threshold, "configuration loaded");
    let app = router(AppState::from_config(config));

    tracing::info!("🚀 Storefront checkout listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}
