//! Listing model: a published marketplace entry, denormalized from a scan
//! plus commercial fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::scan::StorageDevice;

/// Lifecycle status of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "listing_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    /// Not yet visible to buyers
    Draft,
    /// Live on the buyer surface
    Published,
    /// Sold; kept for receipts and history
    Sold,
}

/// A listing row.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Listing {
    pub id: Uuid,
    /// Source scan, null for manually entered listings.
    pub scan_id: Option<String>,
    pub title: Option<String>,
    /// Always the string form of a number, regardless of numeric input.
    pub price: String,
    pub status: ListingStatus,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub cpu: Option<String>,
    pub cores: Option<String>,
    pub threads: Option<String>,
    pub base_speed_mhz: Option<String>,
    pub ram_gb: Option<String>,
    pub ram_type: Option<String>,
    pub ram_speed_mhz: Option<String>,
    pub storage: Json<Vec<StorageDevice>>,
    pub gpu: Option<String>,
    pub display_resolution: Option<String>,
    pub screen_size_inch: Option<f64>,
    pub os: Option<String>,
    /// Public image URLs, 1-4 entries for published listings.
    pub images: Option<Vec<String>>,
    pub condition: Option<String>,
    pub negotiable: Option<bool>,
    pub battery: Option<String>,
    pub special_features: Option<Vec<String>>,
    pub guarantee_months: Option<i32>,
    pub guarantee_provider: Option<String>,
    /// Free-form commercial extras without first-class columns.
    pub extras: Option<serde_json::Value>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Buyer-facing projection of a listing, keyed like the scanner wire shape.
#[derive(Debug, Clone, Serialize)]
pub struct ListingSummary {
    pub id: Uuid,
    #[serde(rename = "Brand")]
    pub brand: Option<String>,
    #[serde(rename = "Model")]
    pub model: Option<String>,
    #[serde(rename = "CPU")]
    pub cpu: Option<String>,
    #[serde(rename = "RAM_GB")]
    pub ram_gb: Option<String>,
    #[serde(rename = "RAM_Type")]
    pub ram_type: Option<String>,
    #[serde(rename = "RAM_Speed_MHz")]
    pub ram_speed_mhz: Option<String>,
    #[serde(rename = "Storage")]
    pub storage: Vec<StorageDevice>,
    #[serde(rename = "GPU")]
    pub gpu: Option<String>,
    #[serde(rename = "Display_Resolution")]
    pub display_resolution: Option<String>,
    #[serde(rename = "Screen_Size_inch")]
    pub screen_size_inch: Option<f64>,
    #[serde(rename = "OS")]
    pub os: Option<String>,
    pub title: Option<String>,
    pub price: String,
    pub status: ListingStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    pub images: Vec<String>,
}

impl From<Listing> for ListingSummary {
    fn from(l: Listing) -> Self {
        Self {
            id: l.id,
            brand: l.brand,
            model: l.model,
            cpu: l.cpu,
            ram_gb: l.ram_gb,
            ram_type: l.ram_type,
            ram_speed_mhz: l.ram_speed_mhz,
            storage: l.storage.0,
            gpu: l.gpu,
            display_resolution: l.display_resolution,
            screen_size_inch: l.screen_size_inch,
            os: l.os,
            title: l.title,
            price: l.price,
            status: l.status,
            created_at: l.created_at,
            images: l.images.unwrap_or_default(),
        }
    }
}
