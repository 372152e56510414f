// src/models/mod.rs

//! Domain models for the report store.

mod config;
mod report;

// Re-export all public types
pub use config::{AuditConfig, Config, QueryOptions, RetentionConfig, StorageConfig};
pub use report::{CategoryScore, StoredReport, UrlMeta};
