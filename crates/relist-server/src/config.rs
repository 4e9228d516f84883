//! Application configuration, read once from the environment at startup.

use std::env;

use tracing::warn;

/// Default bucket used when `LISTING_BUCKET` is unset.
pub const DEFAULT_BUCKET: &str = "listing-images";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Root directory for stored media files.
    pub media_root: String,
    /// Externally reachable base URL, used to build public image URLs.
    pub public_base_url: String,
    /// Bucket (subdirectory) listing images are stored under.
    pub listing_bucket: String,
    /// Telegram bot token. Notification delivery is inert when unset.
    pub telegram_bot_token: Option<String>,
    /// Telegram channel identifier (`@name` or numeric id).
    pub telegram_channel_id: String,
    /// Shared operator bearer token. Mutating endpoints are open when unset.
    pub operator_token: Option<String>,
}

impl AppConfig {
    /// Loads configuration from environment variables, falling back to
    /// development defaults.
    pub fn from_env() -> Self {
        let config = Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/relist".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            media_root: env::var("MEDIA_ROOT").unwrap_or_else(|_| "./data/media".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            listing_bucket: env::var("LISTING_BUCKET").unwrap_or_else(|_| DEFAULT_BUCKET.to_string()),
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok().filter(|t| !t.is_empty()),
            telegram_channel_id: env::var("TELEGRAM_CHANNEL_ID")
                .unwrap_or_else(|_| "@relistmarket".to_string()),
            operator_token: env::var("OPERATOR_TOKEN").ok().filter(|t| !t.is_empty()),
        };

        if config.telegram_bot_token.is_none() {
            warn!("TELEGRAM_BOT_TOKEN not set, channel notifications disabled");
        }
        if config.operator_token.is_none() {
            warn!("OPERATOR_TOKEN not set, mutating endpoints are unauthenticated");
        }

        config
    }
}
