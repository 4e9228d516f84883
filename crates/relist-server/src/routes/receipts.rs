//! Receipt lifecycle: create with a point-in-time spec snapshot, read,
//! and soft delete. Receipts outlive the listings they reference.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use bigdecimal::BigDecimal;
use chrono::{Datelike, Utc};
use rand::Rng;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Listing, NewReceipt, Receipt};
use crate::routes::{ok, require_operator, AppState};

const RECEIPT_COLUMNS: &str = "id, listing_id, receipt_number, buyer_name, buyer_phone, \
     buyer_address, sale_date, purchase_price, seller_signature, pc_specs_snapshot, notes, \
     deleted_at, created_at, updated_at";

/// Creates the receipts router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_receipts).post(create_receipt))
        .route("/{id}", get(get_receipt).delete(soft_delete_receipt))
}

/// POST /api/receipts
///
/// Snapshots the referenced listing's spec by value at creation time;
/// later listing edits or deletes leave the receipt untouched.
async fn create_receipt(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(new): Json<NewReceipt>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_operator(&state, &headers)?;

    if new.buyer_name.trim().is_empty() || new.buyer_phone.trim().is_empty() {
        return Err(AppError::Validation(
            "Buyer name and phone are required".to_string(),
        ));
    }
    if new.purchase_price <= BigDecimal::from(0) {
        return Err(AppError::Validation(
            "Purchase price must be a positive number".to_string(),
        ));
    }

    let snapshot = match new.listing_id {
        Some(listing_id) => {
            let listing = super::listings::fetch_listing(&state.db, listing_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;
            snapshot_from_listing(&listing)
        }
        // A sale of unlisted stock: the caller supplies the snapshot.
        None => new.pc_specs_snapshot.clone().ok_or_else(|| {
            AppError::Validation(
                "pc_specs_snapshot is required when no listing is referenced".to_string(),
            )
        })?,
    };

    let receipt_number = new
        .receipt_number
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(generate_receipt_number);

    let receipt = insert_receipt(&state.db, &new, &receipt_number, &snapshot).await?;
    tracing::info!(receipt_id = %receipt.id, %receipt_number, "receipt created");
    Ok(ok(receipt))
}

/// GET /api/receipts — non-deleted receipts, newest first.
async fn list_receipts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let receipts: Vec<Receipt> = sqlx::query_as(&format!(
        "SELECT {RECEIPT_COLUMNS} FROM receipts \
         WHERE deleted_at IS NULL ORDER BY created_at DESC"
    ))
    .fetch_all(&state.db)
    .await?;
    Ok(ok(receipts))
}

/// GET /api/receipts/{id} — soft-deleted receipts behave as not-found.
async fn get_receipt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let receipt: Option<Receipt> = sqlx::query_as(&format!(
        "SELECT {RECEIPT_COLUMNS} FROM receipts WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(&state.db)
    .await?;

    let receipt = receipt.ok_or_else(|| AppError::NotFound("Receipt not found".to_string()))?;
    Ok(ok(receipt))
}

/// DELETE /api/receipts/{id}
///
/// Sets `deleted_at` instead of removing the row, keeping the record for
/// audit while excluding it from reads.
async fn soft_delete_receipt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    require_operator(&state, &headers)?;

    let receipt: Option<Receipt> = sqlx::query_as(&format!(
        "UPDATE receipts SET deleted_at = NOW(), updated_at = NOW() \
         WHERE id = $1 AND deleted_at IS NULL \
         RETURNING {RECEIPT_COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(&state.db)
    .await?;

    let receipt = receipt
        .ok_or_else(|| AppError::NotFound("Receipt not found or already deleted".to_string()))?;
    Ok(ok(receipt))
}

/// Copies the spec fields a receipt needs out of a listing.
fn snapshot_from_listing(listing: &Listing) -> serde_json::Value {
    serde_json::json!({
        "brand": listing.brand,
        "model": listing.model,
        "cpu": listing.cpu,
        "ram_gb": listing.ram_gb,
        "ram_type": listing.ram_type,
        "gpu": listing.gpu,
        "display_resolution": listing.display_resolution,
        "screen_size_inch": listing.screen_size_inch,
        "os": listing.os,
        "storage": listing.storage.0,
        "original_price": listing.price,
    })
}

/// Format: RCPT-YYYY-MMDD-NNN with a random 3-digit suffix. Collisions
/// within a day are possible and not retried; the primary key is the
/// receipt's UUID.
fn generate_receipt_number() -> String {
    let now = Utc::now();
    let suffix: u32 = rand::thread_rng().gen_range(0..1000);
    format!(
        "RCPT-{}-{:02}{:02}-{:03}",
        now.year(),
        now.month(),
        now.day(),
        suffix
    )
}

async fn insert_receipt(
    pool: &PgPool,
    new: &NewReceipt,
    receipt_number: &str,
    snapshot: &serde_json::Value,
) -> Result<Receipt, AppError> {
    let receipt: Receipt = sqlx::query_as(&format!(
        "INSERT INTO receipts (listing_id, receipt_number, buyer_name, buyer_phone, \
             buyer_address, purchase_price, seller_signature, pc_specs_snapshot, notes) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING {RECEIPT_COLUMNS}"
    ))
    .bind(new.listing_id)
    .bind(receipt_number)
    .bind(new.buyer_name.trim())
    .bind(new.buyer_phone.trim())
    .bind(&new.buyer_address)
    .bind(&new.purchase_price)
    .bind(&new.seller_signature)
    .bind(snapshot)
    .bind(&new.notes)
    .fetch_one(pool)
    .await?;
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListingStatus, StorageDevice};
    use sqlx::types::Json as Db;

    #[test]
    fn test_receipt_number_format() {
        let number = generate_receipt_number();
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "RCPT");
        assert_eq!(parts[1].len(), 4);
        assert_eq!(parts[2].len(), 4);
        assert_eq!(parts[3].len(), 3);
        assert!(parts[3].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_snapshot_copies_spec_by_value() {
        let listing = Listing {
            id: Uuid::new_v4(),
            scan_id: None,
            title: Some("HP EliteBook".to_string()),
            price: "42000".to_string(),
            status: ListingStatus::Published,
            brand: Some("HP".to_string()),
            model: Some("EliteBook 840 G5".to_string()),
            cpu: Some("i5-8350U".to_string()),
            cores: None,
            threads: None,
            base_speed_mhz: None,
            ram_gb: Some("16".to_string()),
            ram_type: Some("DDR4".to_string()),
            ram_speed_mhz: None,
            storage: Db(vec![StorageDevice {
                model: None,
                size_gb: 256.0,
                kind: "SSD".to_string(),
                bus_type: Some("SATA".to_string()),
            }]),
            gpu: Some("UHD 620".to_string()),
            display_resolution: Some("1920x1080".to_string()),
            screen_size_inch: Some(14.0),
            os: Some("Windows 11".to_string()),
            images: None,
            condition: None,
            negotiable: None,
            battery: None,
            special_features: None,
            guarantee_months: None,
            guarantee_provider: None,
            extras: None,
            published_at: None,
            created_at: Utc::now(),
        };

        let snapshot = snapshot_from_listing(&listing);
        assert_eq!(snapshot["brand"], "HP");
        assert_eq!(snapshot["original_price"], "42000");
        assert_eq!(snapshot["storage"][0]["Size_GB"], 256.0);
        assert_eq!(snapshot["storage"][0]["BusType"], "SATA");
        // commercial fields are deliberately not part of the snapshot
        assert!(snapshot.get("images").is_none());
        assert!(snapshot.get("status").is_none());
    }
}
