//! Listing endpoints: the publish pipeline and the buyer read surface.
//!
//! Publishing takes either a stored scan (reference path) or manually
//! typed fields (manual path) plus images, and produces exactly one
//! published listing. The reference path claims the scan inside the same
//! transaction as the listing insert, so one scan can never yield two
//! listings and a half-published state is unreachable.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json as Db;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Listing, ListingStatus, ListingSummary, SpecOverrides, StorageDevice};
use crate::parse::{parse_capacity_gb, slugify, take_number};
use crate::routes::{no_store, ok, require_operator, AppState};

const LISTING_COLUMNS: &str = "id, scan_id, title, price, status, brand, model, cpu, cores, \
     threads, base_speed_mhz, ram_gb, ram_type, ram_speed_mhz, storage, gpu, \
     display_resolution, screen_size_inch, os, images, condition, negotiable, battery, \
     special_features, guarantee_months, guarantee_provider, extras, published_at, created_at";

/// Commercial extras sent by the attach form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtrasInput {
    pub condition: Option<String>,
    pub negotiable: Option<bool>,
    pub battery: Option<String>,
    pub special_features: Option<Vec<String>>,
    pub guarantee_months: Option<i32>,
    pub guarantee_provider: Option<String>,
}

/// Publish request body. The two shapes share one struct: presence of
/// `id` selects the reference path, everything after `extras` belongs to
/// the manual path.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub id: Option<String>,
    pub title: Option<String>,
    pub price: Option<serde_json::Value>,
    #[serde(default)]
    pub images: Vec<String>,
    pub form_data: Option<SpecOverrides>,
    pub extras: Option<ExtrasInput>,

    // manual path
    pub brand: Option<String>,
    pub series: Option<String>,
    pub model: Option<String>,
    pub cpu_brand: Option<String>,
    pub cpu_series: Option<String>,
    pub cpu_generation: Option<String>,
    pub cpu_model: Option<String>,
    pub ram_type: Option<String>,
    pub ram_capacity: Option<String>,
    pub storage_type_main: Option<String>,
    pub storage_capacity: Option<String>,
    pub resolution: Option<String>,
    pub screen_size: Option<String>,
    pub gpu_type: Option<String>,
    pub gpu_brand: Option<String>,
    pub gpu_series: Option<String>,
    pub gpu_vram: Option<String>,
    pub condition: Option<String>,
    pub negotiable: Option<bool>,
    pub battery_condition: Option<String>,
    pub extra_items: Option<Vec<String>>,
    pub warranty: Option<String>,
    pub refresh_rate: Option<String>,
    pub specs: Option<String>,
}

/// Values for one listing insert.
struct NewListing {
    scan_id: Option<String>,
    title: Option<String>,
    price: String,
    brand: Option<String>,
    model: Option<String>,
    cpu: Option<String>,
    cores: Option<String>,
    threads: Option<String>,
    base_speed_mhz: Option<String>,
    ram_gb: Option<String>,
    ram_type: Option<String>,
    ram_speed_mhz: Option<String>,
    storage: Vec<StorageDevice>,
    gpu: Option<String>,
    display_resolution: Option<String>,
    screen_size_inch: Option<f64>,
    os: Option<String>,
    images: Vec<String>,
    condition: Option<String>,
    negotiable: Option<bool>,
    battery: Option<String>,
    special_features: Option<Vec<String>>,
    guarantee_months: Option<i32>,
    guarantee_provider: Option<String>,
    extras: Option<serde_json::Value>,
    published_at: DateTime<Utc>,
}

/// Creates the listings router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_listings))
        .route("/publish", post(publish))
        .route("/{id}", get(get_listing))
}

/// POST /api/listings/publish
async fn publish(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<PublishRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_operator(&state, &headers)?;

    let price = normalize_price(req.price.as_ref())?;

    let listing = match req.id.clone() {
        Some(scan_id) => publish_from_scan(&state, &scan_id, &price, req).await?,
        None => publish_manual(&state, &price, req).await?,
    };

    // Best-effort channel broadcast, after the write is committed. The
    // response never waits on it and its failures never surface.
    state.notifier.spawn_notify(listing.clone());

    Ok(ok(listing))
}

/// Reference path: merge overrides onto the stored scan, claim the scan
/// and insert the listing in one transaction.
async fn publish_from_scan(
    state: &AppState,
    scan_id: &str,
    price: &str,
    req: PublishRequest,
) -> Result<Listing, AppError> {
    let scan = super::scans::get_active_scan(&state.db, scan_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Scan not found".to_string()))?;

    let image_urls = state.images.upload_images(scan_id, &req.images).await;
    if image_urls.is_empty() {
        return Err(AppError::Validation(
            "At least one image is required to publish".to_string(),
        ));
    }

    let resolved = req.form_data.unwrap_or_default().resolve(&scan);

    let title = req
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| compose_title(&[resolved.brand.as_deref(), resolved.model.as_deref()]));

    let extras = req.extras.unwrap_or_default();
    let now = Utc::now();

    let new = NewListing {
        scan_id: Some(scan_id.to_string()),
        title: Some(title.clone()),
        price: price.to_string(),
        brand: resolved.brand,
        model: resolved.model,
        cpu: resolved.cpu,
        cores: resolved.cores,
        threads: resolved.threads,
        base_speed_mhz: resolved.base_speed_mhz,
        ram_gb: resolved.ram_gb,
        ram_type: resolved.ram_type,
        ram_speed_mhz: resolved.ram_speed_mhz,
        storage: resolved.storage,
        gpu: resolved.gpu,
        display_resolution: resolved.display_resolution,
        screen_size_inch: resolved.screen_size_inch,
        os: resolved.os,
        images: image_urls,
        condition: extras.condition.clone(),
        negotiable: extras.negotiable,
        battery: extras.battery.clone(),
        special_features: extras.special_features.clone(),
        guarantee_months: extras.guarantee_months,
        guarantee_provider: extras.guarantee_provider.clone(),
        extras: Some(serde_json::to_value(&extras).map_err(|e| AppError::Internal(e.to_string()))?),
        published_at: now,
    };

    let mut tx = state.db.begin().await?;

    // Optimistic claim: consuming an already-published scan affects zero
    // rows and aborts before anything is inserted, so concurrent publishes
    // of the same scan cannot both succeed.
    let claimed = sqlx::query(
        "UPDATE scans SET status = 'published', title = $2, price = $3, published_at = $4 \
         WHERE id = $1 AND (status IS NULL OR status <> 'published')",
    )
    .bind(scan_id)
    .bind(&title)
    .bind(price)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    if claimed.rows_affected() == 0 {
        return Err(AppError::Conflict("Scan already published".to_string()));
    }

    let listing = insert_listing(&mut *tx, &new).await?;
    tx.commit().await?;

    tracing::info!(listing_id = %listing.id, %scan_id, "scan published");
    Ok(listing)
}

/// Manual path: parse free-text fields into columns and insert. No scan
/// to claim, so a plain insert suffices.
async fn publish_manual(
    state: &AppState,
    price: &str,
    req: PublishRequest,
) -> Result<Listing, AppError> {
    let extras = req.extras.clone().unwrap_or_default();

    let cpu = compose_part(&[
        req.cpu_brand.as_deref(),
        req.cpu_series.as_deref(),
        req.cpu_generation.as_deref(),
        req.cpu_model.as_deref(),
    ]);
    let gpu = compose_part(&[
        req.gpu_type.as_deref(),
        req.gpu_brand.as_deref(),
        req.gpu_series.as_deref(),
        req.gpu_vram.as_deref(),
    ]);

    let ram_gb = req
        .ram_capacity
        .as_deref()
        .and_then(parse_capacity_gb)
        .map(|v| v.to_string());

    let storage = manual_storage(req.storage_type_main.clone(), req.storage_capacity.as_deref());

    let screen_size_inch = req.screen_size.as_deref().and_then(take_number);

    let title = req
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| {
            let composed = compose_title(&[
                req.brand.as_deref(),
                req.series.as_deref(),
                req.model.as_deref(),
            ]);
            (!composed.is_empty()).then_some(composed)
        });

    let key_prefix = title
        .as_deref()
        .and_then(slugify)
        .unwrap_or_else(|| "manual".to_string());

    let image_urls = state.images.upload_images(&key_prefix, &req.images).await;
    if image_urls.is_empty() {
        return Err(AppError::Validation(
            "At least one image is required to publish".to_string(),
        ));
    }

    // Only fields without first-class columns go into extras.
    let lean_extras = serde_json::json!({
        "warranty": req.warranty,
        "refreshRate": req.refresh_rate,
        "specs": req.specs,
    });

    let new = NewListing {
        scan_id: None,
        title,
        price: price.to_string(),
        brand: req.brand.filter(|s| !s.is_empty()),
        model: req.model.filter(|s| !s.is_empty()),
        cpu,
        cores: None,
        threads: None,
        base_speed_mhz: None,
        ram_gb,
        ram_type: req.ram_type,
        ram_speed_mhz: None,
        storage,
        gpu,
        display_resolution: req.resolution,
        screen_size_inch,
        os: None,
        images: image_urls,
        condition: req.condition.or(extras.condition),
        negotiable: req.negotiable.or(extras.negotiable),
        battery: req.battery_condition.or(extras.battery),
        special_features: req.extra_items.or(extras.special_features),
        guarantee_months: extras.guarantee_months,
        guarantee_provider: extras.guarantee_provider,
        extras: Some(lean_extras),
        published_at: Utc::now(),
    };

    let listing = insert_listing(&state.db, &new).await?;
    tracing::info!(listing_id = %listing.id, "manual listing published");
    Ok(listing)
}

/// GET /api/listings
///
/// Published listings, newest first, projected to the buyer shape.
async fn list_listings(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let listings: Vec<Listing> = sqlx::query_as(&format!(
        "SELECT {LISTING_COLUMNS} FROM listings \
         WHERE status = 'published' ORDER BY created_at DESC"
    ))
    .fetch_all(&state.db)
    .await?;

    let summaries: Vec<ListingSummary> = listings.into_iter().map(Into::into).collect();
    Ok((no_store(), ok(summaries)))
}

/// GET /api/listings/{id} — full listing row.
async fn get_listing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let listing = fetch_listing(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;
    Ok(ok(listing))
}

/// Fetches a listing by id. Shared with the receipt flow.
pub(crate) async fn fetch_listing(pool: &PgPool, id: Uuid) -> Result<Option<Listing>, AppError> {
    let listing: Option<Listing> =
        sqlx::query_as(&format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(listing)
}

async fn insert_listing<'e, E>(executor: E, new: &NewListing) -> Result<Listing, AppError>
where
    E: sqlx::PgExecutor<'e>,
{
    let listing: Listing = sqlx::query_as(&format!(
        "INSERT INTO listings (scan_id, title, price, status, brand, model, cpu, cores, \
             threads, base_speed_mhz, ram_gb, ram_type, ram_speed_mhz, storage, gpu, \
             display_resolution, screen_size_inch, os, images, condition, negotiable, battery, \
             special_features, guarantee_months, guarantee_provider, extras, published_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
             $18, $19, $20, $21, $22, $23, $24, $25, $26, $27) \
         RETURNING {LISTING_COLUMNS}"
    ))
    .bind(&new.scan_id)
    .bind(&new.title)
    .bind(&new.price)
    .bind(ListingStatus::Published)
    .bind(&new.brand)
    .bind(&new.model)
    .bind(&new.cpu)
    .bind(&new.cores)
    .bind(&new.threads)
    .bind(&new.base_speed_mhz)
    .bind(&new.ram_gb)
    .bind(&new.ram_type)
    .bind(&new.ram_speed_mhz)
    .bind(Db(new.storage.clone()))
    .bind(&new.gpu)
    .bind(&new.display_resolution)
    .bind(new.screen_size_inch)
    .bind(&new.os)
    .bind(&new.images)
    .bind(&new.condition)
    .bind(new.negotiable)
    .bind(&new.battery)
    .bind(&new.special_features)
    .bind(new.guarantee_months)
    .bind(&new.guarantee_provider)
    .bind(&new.extras)
    .bind(new.published_at)
    .fetch_one(executor)
    .await?;
    Ok(listing)
}

/// Coerces the submitted price to the stored string form.
///
/// Inputs may be numeric or string; anything that does not parse to a
/// positive number (including the untouched form default of zero) is a
/// validation error.
fn normalize_price(price: Option<&serde_json::Value>) -> Result<String, AppError> {
    let value = match price {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match value {
        Some(v) if v.is_finite() && v > 0.0 => {
            if v.fract() == 0.0 {
                Ok(format!("{}", v as i64))
            } else {
                Ok(format!("{v}"))
            }
        }
        _ => Err(AppError::Validation(
            "Price must be a positive number".to_string(),
        )),
    }
}

/// Joins non-empty parts with single spaces.
fn compose_part(parts: &[Option<&str>]) -> Option<String> {
    let joined = compose_title(parts);
    (!joined.is_empty()).then_some(joined)
}

fn compose_title(parts: &[Option<&str>]) -> String {
    parts
        .iter()
        .flatten()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Manual-path storage: a single device when a type or size was supplied,
/// otherwise empty. Missing size parses to zero, not an error.
fn manual_storage(kind: Option<String>, capacity: Option<&str>) -> Vec<StorageDevice> {
    let size_gb = capacity.and_then(parse_capacity_gb);
    if kind.is_none() && size_gb.is_none() {
        return Vec::new();
    }
    vec![StorageDevice {
        model: None,
        size_gb: size_gb.unwrap_or(0) as f64,
        kind: kind.unwrap_or_default(),
        bus_type: None,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_price_number_becomes_string() {
        let price = serde_json::json!(799);
        assert_eq!(normalize_price(Some(&price)).unwrap(), "799");
        let price = serde_json::json!(799.5);
        assert_eq!(normalize_price(Some(&price)).unwrap(), "799.5");
    }

    #[test]
    fn test_normalize_price_string_input() {
        let price = serde_json::json!("42000");
        assert_eq!(normalize_price(Some(&price)).unwrap(), "42000");
        let price = serde_json::json!(" 1250 ");
        assert_eq!(normalize_price(Some(&price)).unwrap(), "1250");
    }

    #[test]
    fn test_normalize_price_rejects_default_and_garbage() {
        assert!(normalize_price(None).is_err());
        assert!(normalize_price(Some(&serde_json::json!(0))).is_err());
        assert!(normalize_price(Some(&serde_json::json!(""))).is_err());
        assert!(normalize_price(Some(&serde_json::json!("free"))).is_err());
        assert!(normalize_price(Some(&serde_json::json!(-5))).is_err());
    }

    #[test]
    fn test_compose_title_skips_empty_parts() {
        assert_eq!(
            compose_title(&[Some("HP"), None, Some("EliteBook")]),
            "HP EliteBook"
        );
        assert_eq!(compose_title(&[Some(""), Some("  ")]), "");
    }

    #[test]
    fn test_compose_cpu_from_parts() {
        assert_eq!(
            compose_part(&[Some("Intel"), Some("Core i7"), Some("8th Gen"), Some("8650U")]),
            Some("Intel Core i7 8th Gen 8650U".to_string())
        );
        assert_eq!(compose_part(&[None, None, None, None]), None);
    }

    #[test]
    fn test_manual_storage_shapes() {
        assert!(manual_storage(None, None).is_empty());
        assert!(manual_storage(None, Some("no digits")).is_empty());

        let devices = manual_storage(Some("SSD".to_string()), Some("1TB"));
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].size_gb, 1024.0);
        assert_eq!(devices[0].kind, "SSD");
        assert_eq!(devices[0].model, None);
        assert_eq!(devices[0].bus_type, None);

        // type without a parseable size still records the device
        let devices = manual_storage(Some("HDD".to_string()), None);
        assert_eq!(devices[0].size_gb, 0.0);
    }

    #[test]
    fn test_publish_request_wire_shape() {
        let body = serde_json::json!({
            "id": "scan_1700000000000",
            "title": "HP EliteBook 840 G5",
            "price": 42000,
            "images": ["data:image/png;base64,AAAA"],
            "formData": {
                "ram_gb": "32",
                "storage": [
                    {"Model": null, "Size_GB": 512.0, "Type": "SSD", "BusType": null}
                ]
            },
            "extras": {
                "condition": "Used - Excellent",
                "negotiable": true,
                "guaranteeMonths": 6,
                "specialFeatures": ["Backlit keyboard"]
            }
        });
        let req: PublishRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.id.as_deref(), Some("scan_1700000000000"));
        let form = req.form_data.unwrap();
        assert_eq!(form.ram_gb.as_deref(), Some("32"));
        assert_eq!(form.storage.unwrap()[0].size_gb, 512.0);
        let extras = req.extras.unwrap();
        assert_eq!(extras.guarantee_months, Some(6));
        assert_eq!(extras.negotiable, Some(true));
    }

    #[test]
    fn test_manual_request_wire_shape() {
        let body = serde_json::json!({
            "brand": "Dell",
            "series": "Latitude",
            "model": "7490",
            "cpuBrand": "Intel",
            "cpuModel": "i5-8350U",
            "ramType": "DDR4",
            "ramCapacity": "16GB",
            "storageTypeMain": "SSD",
            "storageCapacity": "512GB",
            "screenSize": "14",
            "batteryCondition": "80-90%",
            "extraItems": ["Charger"],
            "refreshRate": "60Hz",
            "price": "15000",
            "images": []
        });
        let req: PublishRequest = serde_json::from_value(body).unwrap();
        assert!(req.id.is_none());
        assert_eq!(req.ram_capacity.as_deref(), Some("16GB"));
        assert_eq!(req.storage_type_main.as_deref(), Some("SSD"));
        assert_eq!(req.battery_condition.as_deref(), Some("80-90%"));
        assert_eq!(req.refresh_rate.as_deref(), Some("60Hz"));
    }
}
