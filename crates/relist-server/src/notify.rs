//! Best-effort channel notification for newly published listings.
//!
//! Failures here are logged and swallowed: delivery must never block or
//! fail the publish that triggered it.

use reqwest::Client;
use serde_json::json;
use tracing::{info, warn};

use crate::models::Listing;

/// Telegram media groups accept at most ten photos.
const MAX_GROUP_PHOTOS: usize = 10;

/// Normalizes a channel identifier for the Bot API.
///
/// Usernames (`@name`) and already-prefixed ids pass through; a bare
/// positive numeric id gets the `-100` supergroup prefix.
pub fn format_channel_id(raw: &str) -> String {
    if raw.starts_with('@') || raw.starts_with('-') {
        return raw.to_string();
    }
    match raw.parse::<i64>() {
        Ok(n) if n > 0 => format!("-100{n}"),
        _ => raw.to_string(),
    }
}

/// Groups an integer's digits with thousands separators: `42000` → `42,000`.
fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - offset) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Formats a listing into the channel's HTML message.
pub fn format_listing_message(listing: &Listing) -> String {
    let mut lines: Vec<String> = Vec::new();

    let title = listing.title.as_deref().unwrap_or("PC Listing");
    lines.push(format!("🖥️ <b>{title}</b>"));

    let digits: String = listing.price.chars().filter(|c| c.is_ascii_digit()).collect();
    if !digits.is_empty() {
        lines.push(format!("💰 <b>Price:</b> {} ETB", group_thousands(&digits)));
    }

    lines.push(String::new());
    lines.push("📋 <b>Specifications:</b>".to_string());

    let brand_model: Vec<&str> = [listing.brand.as_deref(), listing.model.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !brand_model.is_empty() {
        lines.push(format!("🖥️ <b>Brand/Model:</b> {}", brand_model.join(" ")));
    }

    if let Some(cpu) = &listing.cpu {
        lines.push(format!("⚙️ <b>CPU:</b> {cpu}"));
    }

    if let Some(ram_gb) = &listing.ram_gb {
        let mut parts = vec![format!("{ram_gb}GB")];
        if let Some(t) = &listing.ram_type {
            parts.push(t.clone());
        }
        if let Some(s) = &listing.ram_speed_mhz {
            parts.push(format!("{s}MHz"));
        }
        lines.push(format!("💾 <b>RAM:</b> {}", parts.join(" ")));
    }

    let storage_info: Vec<String> = listing
        .storage
        .0
        .iter()
        .map(|d| format!("{}GB {}", d.size_gb, d.kind).trim().to_string())
        .collect();
    if !storage_info.is_empty() {
        lines.push(format!("💿 <b>Storage:</b> {}", storage_info.join(" + ")));
    }

    if let Some(gpu) = &listing.gpu {
        lines.push(format!("🎮 <b>GPU:</b> {gpu}"));
    }

    match (&listing.display_resolution, listing.screen_size_inch) {
        (Some(res), Some(size)) => lines.push(format!("🖥️ <b>Display:</b> {res} ({size}\")")),
        (Some(res), None) => lines.push(format!("🖥️ <b>Display:</b> {res}")),
        (None, Some(size)) => lines.push(format!("🖥️ <b>Display:</b> {size}\"")),
        (None, None) => {}
    }

    if let Some(os) = &listing.os {
        lines.push(format!("💻 <b>OS:</b> {os}"));
    }

    if listing.condition.is_some() || listing.battery.is_some() || listing.negotiable.is_some() {
        lines.push(String::new());
        lines.push("ℹ️ <b>Additional Info:</b>".to_string());
        if let Some(condition) = &listing.condition {
            lines.push(format!("📦 <b>Condition:</b> {condition}"));
        }
        if let Some(battery) = &listing.battery {
            lines.push(format!("🔋 <b>Battery:</b> {battery}"));
        }
        if let Some(negotiable) = listing.negotiable {
            let label = if negotiable { "Negotiable" } else { "Fixed" };
            lines.push(format!("💬 <b>Price:</b> {label}"));
        }
    }

    if let Some(features) = &listing.special_features {
        if !features.is_empty() {
            lines.push(format!("✨ <b>Special Features:</b> {}", features.join(", ")));
        }
    }

    let guarantee: Vec<String> = [
        listing.guarantee_months.map(|m| format!("{m} months")),
        listing.guarantee_provider.clone(),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !guarantee.is_empty() {
        lines.push(format!("🛡️ <b>Guarantee:</b> {}", guarantee.join(" - ")));
    }

    lines.join("\n")
}

/// Telegram notification client. Inert when no bot token is configured.
#[derive(Debug, Clone)]
pub struct Notifier {
    token: Option<String>,
    chat_id: String,
    http: Client,
}

impl Notifier {
    pub fn new(token: Option<String>, channel_id: &str) -> Self {
        Self {
            token,
            chat_id: format_channel_id(channel_id),
            http: Client::new(),
        }
    }

    /// Dispatches the notification as a detached task. Called after the
    /// publish transaction commits; the HTTP response never waits on it.
    pub fn spawn_notify(&self, listing: Listing) {
        let notifier = self.clone();
        tokio::spawn(async move {
            notifier.send_listing(&listing).await;
        });
    }

    /// Sends a listing to the channel: a media group with the formatted
    /// caption when images exist, a plain message otherwise.
    pub async fn send_listing(&self, listing: &Listing) {
        let Some(token) = &self.token else {
            info!("notification skipped: no bot token configured");
            return;
        };

        let text = format_listing_message(listing);
        let images = listing.images.clone().unwrap_or_default();

        let result = if images.is_empty() {
            self.send_message(token, &text).await
        } else {
            self.send_media_group(token, &images, &text).await
        };

        if let Err(e) = result {
            warn!(listing_id = %listing.id, "channel notification failed: {e}");
        }
    }

    async fn send_message(&self, token: &str, text: &str) -> Result<(), reqwest::Error> {
        let url = format!("https://api.telegram.org/bot{token}/sendMessage");
        self.http
            .post(&url)
            .json(&json!({
                "chat_id": self.chat_id,
                "text": text,
                "parse_mode": "HTML",
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn send_media_group(
        &self,
        token: &str,
        images: &[String],
        caption: &str,
    ) -> Result<(), reqwest::Error> {
        let media: Vec<serde_json::Value> = images
            .iter()
            .take(MAX_GROUP_PHOTOS)
            .enumerate()
            .map(|(i, url)| {
                if i == 0 {
                    json!({"type": "photo", "media": url, "caption": caption, "parse_mode": "HTML"})
                } else {
                    json!({"type": "photo", "media": url})
                }
            })
            .collect();

        let url = format!("https://api.telegram.org/bot{token}/sendMediaGroup");
        self.http
            .post(&url)
            .json(&json!({"chat_id": self.chat_id, "media": media}))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListingStatus, StorageDevice};
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    #[test]
    fn test_format_channel_id() {
        assert_eq!(format_channel_id("@relistmarket"), "@relistmarket");
        assert_eq!(format_channel_id("-1001234567890"), "-1001234567890");
        assert_eq!(format_channel_id("-42"), "-42");
        assert_eq!(format_channel_id("1234567890"), "-1001234567890");
        assert_eq!(format_channel_id("not-numeric"), "not-numeric");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("42000"), "42,000");
        assert_eq!(group_thousands("999"), "999");
        assert_eq!(group_thousands("1234567"), "1,234,567");
    }

    fn sample_listing() -> Listing {
        Listing {
            id: Uuid::new_v4(),
            scan_id: None,
            title: Some("HP EliteBook 840 G5".to_string()),
            price: "42000".to_string(),
            status: ListingStatus::Published,
            brand: Some("HP".to_string()),
            model: Some("EliteBook 840 G5".to_string()),
            cpu: Some("Intel Core i5-8350U".to_string()),
            cores: None,
            threads: None,
            base_speed_mhz: None,
            ram_gb: Some("16".to_string()),
            ram_type: Some("DDR4".to_string()),
            ram_speed_mhz: Some("2400".to_string()),
            storage: Json(vec![StorageDevice {
                model: None,
                size_gb: 256.0,
                kind: "SSD".to_string(),
                bus_type: None,
            }]),
            gpu: Some("Intel UHD Graphics 620".to_string()),
            display_resolution: Some("1920x1080".to_string()),
            screen_size_inch: Some(14.0),
            os: Some("Windows 11 Pro".to_string()),
            images: None,
            condition: Some("Used - Excellent".to_string()),
            negotiable: Some(true),
            battery: Some("90-100%".to_string()),
            special_features: Some(vec!["Backlit keyboard".to_string()]),
            guarantee_months: Some(6),
            guarantee_provider: Some("Shop".to_string()),
            extras: None,
            published_at: Some(Utc::now()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_format_listing_message() {
        let message = format_listing_message(&sample_listing());
        assert!(message.contains("<b>HP EliteBook 840 G5</b>"));
        assert!(message.contains("💰 <b>Price:</b> 42,000 ETB"));
        assert!(message.contains("💾 <b>RAM:</b> 16GB DDR4 2400MHz"));
        assert!(message.contains("💿 <b>Storage:</b> 256GB SSD"));
        assert!(message.contains("🖥️ <b>Display:</b> 1920x1080 (14\")"));
        assert!(message.contains("💬 <b>Price:</b> Negotiable"));
        assert!(message.contains("🛡️ <b>Guarantee:</b> 6 months - Shop"));
    }

    #[test]
    fn test_format_listing_message_minimal() {
        let mut listing = sample_listing();
        listing.title = None;
        listing.price = String::new();
        listing.condition = None;
        listing.negotiable = None;
        listing.battery = None;
        listing.special_features = None;
        listing.guarantee_months = None;
        listing.guarantee_provider = None;

        let message = format_listing_message(&listing);
        assert!(message.contains("PC Listing"));
        assert!(!message.contains("Price:</b> "));
        assert!(!message.contains("Additional Info"));
        assert!(!message.contains("Guarantee"));
    }
}
