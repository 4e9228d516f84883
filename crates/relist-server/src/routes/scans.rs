//! Scan ingest and lookup endpoints.
//!
//! Scans arrive from the external scanner tool, sit in `pending` until an
//! operator publishes them, and are treated as consumed (not found) by the
//! primary lookup paths once published.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use sqlx::types::Json as Db;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::{Scan, ScanIngest};
use crate::routes::{no_store, ok, require_operator, AppState};

const SCAN_COLUMNS: &str = "id, brand, model, cpu, cores, threads, base_speed_mhz, ram_gb, \
     ram_type, ram_speed_mhz, storage, gpu, display_resolution, screen_size_inch, os, \
     scan_time, status, created_at";

/// Creates the scans router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_scans).post(ingest_scan))
        .route("/latest", get(latest_scan))
        .route("/{id}", get(get_scan).delete(delete_scan))
}

/// POST /api/scans
///
/// Ingests a spec snapshot from the scanner tool. Brand, Model and CPU are
/// required. Responds with the generated `pc_id` at the root, which the
/// tool passes on to the attach flow.
async fn ingest_scan(
    State(state): State<Arc<AppState>>,
    Json(ingest): Json<ScanIngest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let missing: Vec<&str> = [
        ("Brand", &ingest.brand),
        ("Model", &ingest.model),
        ("CPU", &ingest.cpu),
    ]
    .iter()
    .filter(|(_, v)| v.as_deref().map_or(true, str::is_empty))
    .map(|(k, _)| *k)
    .collect();
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let now = Utc::now();
    let pc_id = format!("scan_{}", now.timestamp_millis());
    let scan_time = ingest.scan_time.clone().unwrap_or_else(|| now.to_rfc3339());

    let scan = upsert_scan(&state.db, &pc_id, &ingest, &scan_time).await?;
    tracing::info!(%pc_id, "scan ingested");

    Ok(Json(serde_json::json!({
        "status": "ok",
        "message": "PC specifications received successfully",
        "pc_id": pc_id,
        "data": scan,
        "timestamp": now.to_rfc3339(),
    })))
}

/// GET /api/scans
///
/// All scans, newest first. Deliberately unfiltered: this is the admin
/// inventory view and shows published scans too.
async fn list_scans(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let scans: Vec<Scan> =
        sqlx::query_as(&format!("SELECT {SCAN_COLUMNS} FROM scans ORDER BY created_at DESC"))
            .fetch_all(&state.db)
            .await?;
    Ok(ok(scans))
}

/// GET /api/scans/latest
///
/// Most recent unconsumed scan, for the cross-device hand-off flow: scan
/// on one machine, attach and publish on another without passing an id.
async fn latest_scan(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let scan: Option<Scan> = sqlx::query_as(&format!(
        "SELECT {SCAN_COLUMNS} FROM scans \
         WHERE status IS NULL OR status <> 'published' \
         ORDER BY created_at DESC LIMIT 1"
    ))
    .fetch_optional(&state.db)
    .await?;

    let scan = scan.ok_or_else(|| AppError::NotFound("No pending scan available".to_string()))?;
    Ok((no_store(), ok(scan)))
}

/// GET /api/scans/{id}
///
/// Published scans are consumed and behave as not-found here.
async fn get_scan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let scan = get_active_scan(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Scan not found".to_string()))?;
    Ok((no_store(), ok(scan)))
}

/// DELETE /api/scans/{id} — hard delete.
async fn delete_scan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    require_operator(&state, &headers)?;

    let result = sqlx::query("DELETE FROM scans WHERE id = $1")
        .bind(&id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Scan not found".to_string()));
    }
    Ok(ok(serde_json::json!({"id": id})))
}

/// Fetches a scan by id, treating published scans as absent. Shared with
/// the publish pipeline.
pub(crate) async fn get_active_scan(pool: &PgPool, id: &str) -> Result<Option<Scan>, AppError> {
    let scan: Option<Scan> = sqlx::query_as(&format!(
        "SELECT {SCAN_COLUMNS} FROM scans \
         WHERE id = $1 AND (status IS NULL OR status <> 'published')"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(scan)
}

async fn upsert_scan(
    pool: &PgPool,
    id: &str,
    ingest: &ScanIngest,
    scan_time: &str,
) -> Result<Scan, AppError> {
    let scan: Scan = sqlx::query_as(&format!(
        "INSERT INTO scans (id, brand, model, cpu, cores, threads, base_speed_mhz, ram_gb, \
             ram_type, ram_speed_mhz, storage, gpu, display_resolution, screen_size_inch, os, \
             scan_time, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, 'pending') \
         ON CONFLICT (id) DO UPDATE SET \
             brand = EXCLUDED.brand, model = EXCLUDED.model, cpu = EXCLUDED.cpu, \
             cores = EXCLUDED.cores, threads = EXCLUDED.threads, \
             base_speed_mhz = EXCLUDED.base_speed_mhz, ram_gb = EXCLUDED.ram_gb, \
             ram_type = EXCLUDED.ram_type, ram_speed_mhz = EXCLUDED.ram_speed_mhz, \
             storage = EXCLUDED.storage, gpu = EXCLUDED.gpu, \
             display_resolution = EXCLUDED.display_resolution, \
             screen_size_inch = EXCLUDED.screen_size_inch, os = EXCLUDED.os, \
             scan_time = EXCLUDED.scan_time, status = EXCLUDED.status \
         RETURNING {SCAN_COLUMNS}"
    ))
    .bind(id)
    .bind(&ingest.brand)
    .bind(&ingest.model)
    .bind(&ingest.cpu)
    .bind(&ingest.cores)
    .bind(&ingest.threads)
    .bind(&ingest.base_speed_mhz)
    .bind(&ingest.ram_gb)
    .bind(&ingest.ram_type)
    .bind(&ingest.ram_speed_mhz)
    .bind(Db(ingest.storage.clone()))
    .bind(&ingest.gpu)
    .bind(&ingest.display_resolution)
    .bind(ingest.screen_size_inch)
    .bind(&ingest.os)
    .bind(scan_time)
    .fetch_one(pool)
    .await?;
    Ok(scan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required_fields_detection() {
        let ingest: ScanIngest = serde_json::from_value(serde_json::json!({
            "Brand": "HP",
            "CPU": ""
        }))
        .unwrap();
        let missing: Vec<&str> = [
            ("Brand", &ingest.brand),
            ("Model", &ingest.model),
            ("CPU", &ingest.cpu),
        ]
        .iter()
        .filter(|(_, v)| v.as_deref().map_or(true, str::is_empty))
        .map(|(k, _)| *k)
        .collect();
        assert_eq!(missing, vec!["Model", "CPU"]);
    }

    #[test]
    fn test_ingest_accepts_scanner_payload() {
        let ingest: ScanIngest = serde_json::from_value(serde_json::json!({
            "Brand": "Lenovo",
            "Model": "ThinkPad T480",
            "CPU": "Intel Core i7-8650U",
            "Cores": "4",
            "Threads": "8",
            "BaseSpeed_MHz": "1900",
            "RAM_GB": "16",
            "RAM_Type": "DDR4",
            "RAM_Speed_MHz": "2400",
            "Storage": [
                {"Model": "Samsung PM981", "Size_GB": 512.0, "Type": "SSD", "BusType": "NVMe"}
            ],
            "GPU": "Intel UHD Graphics 620",
            "Display_Resolution": "1920x1080",
            "Screen_Size_inch": 14.0,
            "OS": "Windows 10 Pro",
            "Scan_Time": "2026-08-01T09:30:00Z"
        }))
        .unwrap();
        assert_eq!(ingest.brand.as_deref(), Some("Lenovo"));
        assert_eq!(ingest.storage.len(), 1);
        assert_eq!(ingest.storage[0].size_gb, 512.0);
        assert_eq!(ingest.scan_time.as_deref(), Some("2026-08-01T09:30:00Z"));
    }

    #[test]
    fn test_storage_defaults_to_empty() {
        let ingest: ScanIngest = serde_json::from_value(serde_json::json!({
            "Brand": "Dell", "Model": "Latitude", "CPU": "i5"
        }))
        .unwrap();
        assert!(ingest.storage.is_empty());
    }
}
