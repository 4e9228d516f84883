//! Scan model: a hardware-spec snapshot captured by the external scanner
//! tool, consumed exactly once by publishing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// One storage device in a scan or listing.
///
/// The wire keys are pinned to the scanner tool's output and must
/// round-trip exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageDevice {
    #[serde(rename = "Model")]
    pub model: Option<String>,
    #[serde(rename = "Size_GB")]
    pub size_gb: f64,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "BusType")]
    pub bus_type: Option<String>,
}

/// A stored scan row, serialized with the scanner tool's field names.
///
/// Spec values arrive as strings (the tool reports "8" cores, not 8) and
/// are kept that way.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Scan {
    pub id: String,
    #[serde(rename = "Brand")]
    pub brand: Option<String>,
    #[serde(rename = "Model")]
    pub model: Option<String>,
    #[serde(rename = "CPU")]
    pub cpu: Option<String>,
    #[serde(rename = "Cores")]
    pub cores: Option<String>,
    #[serde(rename = "Threads")]
    pub threads: Option<String>,
    #[serde(rename = "BaseSpeed_MHz")]
    pub base_speed_mhz: Option<String>,
    #[serde(rename = "RAM_GB")]
    pub ram_gb: Option<String>,
    #[serde(rename = "RAM_Type")]
    pub ram_type: Option<String>,
    #[serde(rename = "RAM_Speed_MHz")]
    pub ram_speed_mhz: Option<String>,
    #[serde(rename = "Storage")]
    pub storage: Json<Vec<StorageDevice>>,
    #[serde(rename = "GPU")]
    pub gpu: Option<String>,
    #[serde(rename = "Display_Resolution")]
    pub display_resolution: Option<String>,
    #[serde(rename = "Screen_Size_inch")]
    pub screen_size_inch: Option<f64>,
    #[serde(rename = "OS")]
    pub os: Option<String>,
    #[serde(rename = "Scan_Time")]
    pub scan_time: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Ingest payload pushed by the scanner tool. Brand, Model and CPU are
/// required; the route validates, everything else is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanIngest {
    #[serde(rename = "Brand")]
    pub brand: Option<String>,
    #[serde(rename = "Model")]
    pub model: Option<String>,
    #[serde(rename = "CPU")]
    pub cpu: Option<String>,
    #[serde(rename = "Cores")]
    pub cores: Option<String>,
    #[serde(rename = "Threads")]
    pub threads: Option<String>,
    #[serde(rename = "BaseSpeed_MHz")]
    pub base_speed_mhz: Option<String>,
    #[serde(rename = "RAM_GB")]
    pub ram_gb: Option<String>,
    #[serde(rename = "RAM_Type")]
    pub ram_type: Option<String>,
    #[serde(rename = "RAM_Speed_MHz")]
    pub ram_speed_mhz: Option<String>,
    #[serde(rename = "Storage", default)]
    pub storage: Vec<StorageDevice>,
    #[serde(rename = "GPU")]
    pub gpu: Option<String>,
    #[serde(rename = "Display_Resolution")]
    pub display_resolution: Option<String>,
    #[serde(rename = "Screen_Size_inch")]
    pub screen_size_inch: Option<f64>,
    #[serde(rename = "OS")]
    pub os: Option<String>,
    #[serde(rename = "Scan_Time")]
    pub scan_time: Option<String>,
}

/// Per-field overrides sent by the attach form alongside a scan id.
///
/// Every field is optional so partial overrides never clobber untouched
/// scan values; the merge is field-by-field, not object-level.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpecOverrides {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub cpu: Option<String>,
    pub cores: Option<String>,
    pub threads: Option<String>,
    pub base_speed_mhz: Option<String>,
    pub ram_gb: Option<String>,
    pub ram_type: Option<String>,
    pub ram_speed_mhz: Option<String>,
    pub gpu: Option<String>,
    pub display_resolution: Option<String>,
    pub screen_size_inch: Option<f64>,
    pub os: Option<String>,
    pub storage: Option<Vec<StorageDevice>>,
}

/// A fully resolved spec: override where present, scan value otherwise.
#[derive(Debug, Clone)]
pub struct ResolvedSpec {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub cpu: Option<String>,
    pub cores: Option<String>,
    pub threads: Option<String>,
    pub base_speed_mhz: Option<String>,
    pub ram_gb: Option<String>,
    pub ram_type: Option<String>,
    pub ram_speed_mhz: Option<String>,
    pub gpu: Option<String>,
    pub display_resolution: Option<String>,
    pub screen_size_inch: Option<f64>,
    pub os: Option<String>,
    pub storage: Vec<StorageDevice>,
}

fn prefer<T>(over: Option<T>, base: Option<T>) -> Option<T> {
    over.or(base)
}

impl SpecOverrides {
    /// Merges these overrides onto a scan, field by field.
    pub fn resolve(self, scan: &Scan) -> ResolvedSpec {
        ResolvedSpec {
            brand: prefer(self.brand, scan.brand.clone()),
            model: prefer(self.model, scan.model.clone()),
            cpu: prefer(self.cpu, scan.cpu.clone()),
            cores: prefer(self.cores, scan.cores.clone()),
            threads: prefer(self.threads, scan.threads.clone()),
            base_speed_mhz: prefer(self.base_speed_mhz, scan.base_speed_mhz.clone()),
            ram_gb: prefer(self.ram_gb, scan.ram_gb.clone()),
            ram_type: prefer(self.ram_type, scan.ram_type.clone()),
            ram_speed_mhz: prefer(self.ram_speed_mhz, scan.ram_speed_mhz.clone()),
            gpu: prefer(self.gpu, scan.gpu.clone()),
            display_resolution: prefer(self.display_resolution, scan.display_resolution.clone()),
            screen_size_inch: prefer(self.screen_size_inch, scan.screen_size_inch),
            os: prefer(self.os, scan.os.clone()),
            storage: self.storage.unwrap_or_else(|| scan.storage.0.clone()),
        }
    }
}
