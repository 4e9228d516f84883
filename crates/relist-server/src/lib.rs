//! Relist Server - API for the used-PC marketplace
//!
//! This crate provides the REST API server for intaking hardware scans,
//! publishing them as buyer-visible listings, and recording sales.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod parse;
pub mod routes;
pub mod storage;

pub use config::AppConfig;
pub use error::AppError;
pub use routes::{create_router, AppState};
