//! Relist API server entry point.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relist_server::notify::Notifier;
use relist_server::storage::ImageStore;
use relist_server::{create_router, db, AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "relist_server=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting relist API server");

    let config = AppConfig::from_env();

    std::fs::create_dir_all(&config.media_root)?;

    let pool = db::create_pool(&config.database_url).await?;
    info!("Connected to database");

    db::run_migrations(&pool).await?;
    info!("Database migrations complete");

    let images = ImageStore::new(
        &config.media_root,
        &config.listing_bucket,
        &config.public_base_url,
    );
    let notifier = Notifier::new(
        config.telegram_bot_token.clone(),
        &config.telegram_channel_id,
    );

    let state = Arc::new(AppState {
        db: pool,
        config: config.clone(),
        images,
        notifier,
    });

    let app = create_router(state);

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
