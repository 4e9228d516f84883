//! Database models for the relist marketplace.

pub mod listing;
pub mod receipt;
pub mod scan;
pub mod user;

pub use listing::{Listing, ListingStatus, ListingSummary};
pub use receipt::{NewReceipt, Receipt};
pub use scan::{Scan, ScanIngest, SpecOverrides, StorageDevice};
pub use user::User;
