//! Storage abstractions for audit run persistence.
//!
//! Two collaborators back the report store:
//! - **Document store**: run records partitioned by URL-derived identifier,
//!   with ordered-limited queries by timestamp, batch delete and partition
//!   enumeration, plus the per-URL metadata records.
//! - **Blob store**: one full raw report per URL, latest overwrites.
//!
//! ## Local layout
//!
//! ```text
//! {root}/
//! ├── sites/
//! │   └── {site_id}/
//! │       └── runs/
//! │           └── {micros}.json   # one slim run record per file
//! ├── meta/
//! │   └── {site_id}.json          # lastViewed metadata
//! └── blobs/
//!     └── {site_id}.json          # full raw report, latest only
//! ```

pub mod local;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::models::{StoredReport, UrlMeta};

// Re-export for convenience
pub use local::{LocalBlobStore, LocalDocumentStore};

/// Trait for run-record and URL-metadata persistence.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Append a new run record to a URL partition.
    async fn append_run(&self, site_id: &str, run: &StoredReport) -> Result<()>;

    /// Overwrite the newest run record in place.
    ///
    /// Fails with a storage error if the partition has no runs; callers
    /// check [`DocumentStore::run_count`] first.
    async fn replace_latest_run(&self, site_id: &str, run: &StoredReport) -> Result<()>;

    /// Fetch up to `limit` most recent runs, newest-first.
    async fn list_runs(&self, site_id: &str, limit: usize) -> Result<Vec<StoredReport>>;

    /// Number of stored runs for a partition.
    async fn run_count(&self, site_id: &str) -> Result<usize>;

    /// Delete up to `max` run records, returning how many were deleted.
    async fn delete_runs_batch(&self, site_id: &str, max: usize) -> Result<usize>;

    /// Enumerate all URL partitions that hold at least one run.
    async fn list_site_ids(&self) -> Result<Vec<String>>;

    /// Read a URL's metadata record.
    async fn get_meta(&self, site_id: &str) -> Result<Option<UrlMeta>>;

    /// Create or update a URL's metadata record.
    async fn set_meta(&self, site_id: &str, meta: &UrlMeta) -> Result<()>;

    /// Delete a URL's metadata record. Absent records are not an error.
    async fn delete_meta(&self, site_id: &str) -> Result<()>;

    /// Scan all metadata records as (site_id, meta) pairs.
    async fn scan_meta(&self) -> Result<Vec<(String, UrlMeta)>>;
}

/// Trait for full-report blob persistence.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a blob under a key, overwriting any previous value.
    async fn put(&self, key: &str, value: &Value) -> Result<()>;

    /// Fetch a blob, `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Delete a blob. Absent keys are not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}
