// src/cleanup.rs

//! Retention: purging URLs nobody has viewed for too long.

use chrono::{DateTime, Duration, Utc};

use crate::error::Result;
use crate::ident;
use crate::store::ReportStore;

/// Cutoff timestamp for a maximum age in days.
pub fn cutoff_from_days(max_age_days: u32) -> DateTime<Utc> {
    Utc::now() - Duration::days(i64::from(max_age_days))
}

/// Purge every URL whose last-viewed timestamp is before the cutoff.
///
/// Reports are deleted before metadata so a half-purged URL never looks
/// fresh while still carrying run data. Returns the number of URLs purged.
pub async fn run_cleanup(store: &ReportStore, cutoff: DateTime<Utc>) -> Result<usize> {
    let stale = store.get_urls_last_viewed_before(cutoff).await?;
    log::info!("Cleanup found {} stale URLs", stale.len());

    for site_id in &stale {
        let url = ident::decode(site_id);
        store.delete_reports(&url).await?;
        store.delete_metadata(&url).await?;
        log::info!("Purged {}", url);
    }

    Ok(stale.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;
    use tempfile::TempDir;

    use crate::cache::InMemoryCache;
    use crate::models::UrlMeta;
    use crate::storage::{DocumentStore, LocalBlobStore, LocalDocumentStore};

    fn raw_payload() -> serde_json::Value {
        json!({
            "categories": {
                "performance": {"id": "performance", "title": "Performance", "score": 0.9}
            }
        })
    }

    #[tokio::test]
    async fn test_cleanup_purges_only_stale_urls() {
        let tmp = TempDir::new().unwrap();
        let docs = LocalDocumentStore::new(tmp.path());
        let store = ReportStore::new(
            Arc::new(docs.clone()),
            Arc::new(LocalBlobStore::new(tmp.path())),
            Arc::new(InMemoryCache::new()),
        );

        let stale_url = "https://stale.example/";
        let fresh_url = "https://fresh.example/";
        store.save_report(stale_url, raw_payload(), false).await.unwrap();
        store.save_report(fresh_url, raw_payload(), false).await.unwrap();

        // Backdate the stale URL past the cutoff.
        let stale_id = crate::ident::encode(stale_url);
        docs.set_meta(
            &stale_id,
            &UrlMeta { last_viewed: Utc::now() - Duration::days(90) },
        )
        .await
        .unwrap();

        let purged = run_cleanup(&store, cutoff_from_days(60)).await.unwrap();
        assert_eq!(purged, 1);

        assert_eq!(docs.run_count(&stale_id).await.unwrap(), 0);
        assert!(docs.get_meta(&stale_id).await.unwrap().is_none());
        assert!(store.get_full_report(stale_url).await.is_err());

        // The fresh URL is untouched.
        let fresh_id = crate::ident::encode(fresh_url);
        assert_eq!(docs.run_count(&fresh_id).await.unwrap(), 1);
        assert!(docs.get_meta(&fresh_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cleanup_with_nothing_stale_is_noop() {
        let tmp = TempDir::new().unwrap();
        let store = ReportStore::new(
            Arc::new(LocalDocumentStore::new(tmp.path())),
            Arc::new(LocalBlobStore::new(tmp.path())),
            Arc::new(InMemoryCache::new()),
        );
        assert_eq!(run_cleanup(&store, cutoff_from_days(60)).await.unwrap(), 0);
    }
}
