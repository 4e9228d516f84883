//! Receipt model: an immutable record of a completed sale with a
//! point-in-time spec snapshot, decoupled from the listing lifecycle.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A stored receipt row.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Receipt {
    pub id: Uuid,
    /// The sold listing; null for sales of unlisted stock.
    pub listing_id: Option<Uuid>,
    /// Human-facing number, format RCPT-YYYY-MMDD-NNN.
    pub receipt_number: String,
    pub buyer_name: String,
    pub buyer_phone: String,
    pub buyer_address: Option<String>,
    pub sale_date: DateTime<Utc>,
    pub purchase_price: BigDecimal,
    pub seller_signature: Option<String>,
    /// Copy of the listing spec at sale time; never re-derived, so later
    /// listing edits or deletes leave historical receipts intact.
    pub pc_specs_snapshot: serde_json::Value,
    pub notes: Option<String>,
    /// Soft-delete marker; non-null rows are excluded from all reads.
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a receipt.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReceipt {
    pub listing_id: Option<Uuid>,
    /// Caller-supplied number; generated when absent.
    pub receipt_number: Option<String>,
    pub buyer_name: String,
    pub buyer_phone: String,
    pub buyer_address: Option<String>,
    pub purchase_price: BigDecimal,
    pub seller_signature: Option<String>,
    /// Explicit snapshot, honored only when there is no listing to
    /// snapshot from.
    pub pc_specs_snapshot: Option<serde_json::Value>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_new_receipt_deserialization() {
        let body = serde_json::json!({
            "listing_id": "550e8400-e29b-41d4-a716-446655440000",
            "buyer_name": "Abebe K.",
            "buyer_phone": "+251911000000",
            "purchase_price": 42000,
            "notes": "paid cash"
        });
        let parsed: NewReceipt = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.buyer_name, "Abebe K.");
        assert_eq!(parsed.purchase_price, BigDecimal::from_str("42000").unwrap());
        assert!(parsed.receipt_number.is_none());
        assert!(parsed.pc_specs_snapshot.is_none());
    }

    #[test]
    fn test_receipt_serialization_keeps_snapshot_verbatim() {
        let snapshot = serde_json::json!({
            "brand": "HP",
            "model": "EliteBook 840 G5",
            "storage": [{"Model": null, "Size_GB": 256.0, "Type": "SSD", "BusType": "SATA"}],
            "original_price": "799"
        });
        let now = Utc::now();
        let receipt = Receipt {
            id: Uuid::new_v4(),
            listing_id: None,
            receipt_number: "RCPT-2026-0806-042".to_string(),
            buyer_name: "Abebe K.".to_string(),
            buyer_phone: "+251911000000".to_string(),
            buyer_address: None,
            sale_date: now,
            purchase_price: BigDecimal::from_str("42000").unwrap(),
            seller_signature: None,
            pc_specs_snapshot: snapshot.clone(),
            notes: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["receipt_number"], "RCPT-2026-0806-042");
        assert_eq!(json["pc_specs_snapshot"], snapshot);
    }
}
