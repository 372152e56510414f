// src/store.rs

//! Durable persistence of audit runs with cache invalidation and
//! last-viewed bookkeeping.
//!
//! The report store is the only writer of run records, full-report blobs
//! and URL metadata. Read paths are cache-first and repopulate on miss.
//! Concurrent callers racing on the same URL's replace-last path get
//! last-write-wins semantics; no cross-process isolation is attempted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::cache::{keys, CacheStore, InMemoryCache};
use crate::error::{AppError, Result};
use crate::ident;
use crate::models::{Config, QueryOptions, StoredReport, UrlMeta};
use crate::storage::{BlobStore, DocumentStore, LocalBlobStore, LocalDocumentStore};

/// Run records are deleted in batches of this size to bound the work done
/// per storage call when erasing a long history.
pub const DELETE_BATCH_SIZE: usize = 20;

/// Report store over injected document, blob and cache backends.
#[derive(Clone)]
pub struct ReportStore {
    docs: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    cache: Arc<dyn CacheStore>,
}

impl ReportStore {
    /// Create a store over the given backends.
    pub fn new(
        docs: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self { docs, blobs, cache }
    }

    /// Convenience constructor: local filesystem backends rooted at the
    /// configured storage directory, with an in-memory cache.
    pub fn open_local(config: &Config) -> Self {
        Self::new(
            Arc::new(LocalDocumentStore::new(&config.storage.root)),
            Arc::new(LocalBlobStore::new(&config.storage.root)),
            Arc::new(InMemoryCache::new()),
        )
    }

    pub(crate) fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// Persist one completed audit run.
    ///
    /// Strips the `i18n` block from the raw payload, flattens the category
    /// map into the slim record shape, stamps both with the current time,
    /// and stores the full payload as the URL's one blob (overwriting).
    /// With `replace_last` set and a prior run present, the newest run is
    /// overwritten in place; otherwise a new run is appended. Touches
    /// last-viewed and invalidates the caches the write made stale.
    pub async fn save_report(
        &self,
        url: &str,
        mut raw: Value,
        replace_last: bool,
    ) -> Result<StoredReport> {
        url::Url::parse(url)?;
        let site_id = ident::encode(url);
        let now = Utc::now();

        let obj = raw
            .as_object_mut()
            .ok_or_else(|| AppError::validation("audit payload is not a JSON object"))?;
        obj.remove("i18n");
        obj.insert("auditedOn".to_string(), Value::String(now.to_rfc3339()));

        let slim = StoredReport::slim_from_raw(&raw, now)?;

        let had_runs = self.docs.run_count(&site_id).await? > 0;

        self.blobs.put(&site_id, &raw).await?;

        if replace_last && had_runs {
            self.docs.replace_latest_run(&site_id, &slim).await?;
            log::info!("Replaced latest run for {}", url);
        } else {
            self.docs.append_run(&site_id, &slim).await?;
            log::info!("Appended run for {}", url);
        }

        // A brand-new URL changes the global listing.
        if !had_runs {
            self.cache.delete(keys::ALL_URLS).await?;
        }

        self.touch_last_viewed(&site_id).await?;
        self.cache.delete(&keys::report_list(&site_id)).await?;
        self.cache.delete(keys::MEDIANS).await?;

        Ok(slim)
    }

    /// Fetch up to `max_results` runs for a URL, oldest-first, with the
    /// full raw payload attached to exactly the run that owns it.
    ///
    /// A cache hit still counts as a view and touches last-viewed. A URL
    /// with zero runs returns empty without touching metadata or cache.
    pub async fn get_reports(&self, url: &str, opts: QueryOptions) -> Result<Vec<StoredReport>> {
        let site_id = ident::encode(url);
        let list_key = keys::report_list(&site_id);

        if opts.use_cache {
            if let Some(cached) = self.cache.get(&list_key).await? {
                log::debug!("Report list cache hit for {}", url);
                self.touch_last_viewed(&site_id).await?;
                return Ok(serde_json::from_value(cached)?);
            }
        }

        let mut runs = self.docs.list_runs(&site_id, opts.max_results).await?;
        if runs.is_empty() {
            return Ok(runs);
        }
        // Storage returns newest-first; results are oldest-first.
        runs.reverse();

        self.touch_last_viewed(&site_id).await?;

        if let Some(blob) = self.blobs.get(&site_id).await? {
            let owner = blob.get("auditedOn").and_then(Value::as_str).map(str::to_string);
            if let Some(owner) = owner {
                // Exact ISO-string equality is the join key back to the run.
                if let Some(run) = runs
                    .iter_mut()
                    .find(|r| r.audited_on.to_rfc3339() == owner)
                {
                    run.full_report = Some(blob);
                }
            }
        }

        if opts.use_cache {
            self.cache.set(&list_key, serde_json::to_value(&runs)?).await?;
        }

        Ok(runs)
    }

    /// Fetch the one stored full raw report for a URL.
    pub async fn get_full_report(&self, url: &str) -> Result<Value> {
        let site_id = ident::encode(url);
        self.blobs
            .get(&site_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("no full report for {url}")))
    }

    /// List every saved URL, sorted lexicographically.
    pub async fn get_all_saved_urls(&self, use_cache: bool) -> Result<Vec<String>> {
        if use_cache {
            if let Some(cached) = self.cache.get(keys::ALL_URLS).await? {
                return Ok(serde_json::from_value(cached)?);
            }
        }

        let mut urls: Vec<String> = self
            .docs
            .list_site_ids()
            .await?
            .iter()
            .map(|id| ident::decode(id))
            .collect();
        urls.sort_unstable();

        if use_cache {
            self.cache
                .set(keys::ALL_URLS, serde_json::to_value(&urls)?)
                .await?;
        }

        Ok(urls)
    }

    /// URLs whose last-viewed timestamp is strictly before the cutoff.
    ///
    /// Returns raw storage identifiers, not decoded URLs; callers decode
    /// with [`ident::decode`] when they need the original URL.
    pub async fn get_urls_last_viewed_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let stale = self
            .docs
            .scan_meta()
            .await?
            .into_iter()
            .filter(|(_, meta)| meta.last_viewed < cutoff)
            .map(|(site_id, _)| site_id)
            .collect();
        Ok(stale)
    }

    /// Delete all run records for a URL in bounded batches, then drop the
    /// URL's full-report blob and the cache entries the deletion staled.
    ///
    /// Safe to call on a URL with zero records. A failing batch aborts the
    /// remaining ones.
    pub async fn delete_reports(&self, url: &str) -> Result<()> {
        let site_id = ident::encode(url);

        loop {
            let deleted = self
                .docs
                .delete_runs_batch(&site_id, DELETE_BATCH_SIZE)
                .await?;
            if deleted == 0 {
                break;
            }
            log::debug!("Deleted batch of {} runs for {}", deleted, url);
            // Let unrelated operations make progress between batches.
            tokio::task::yield_now().await;
        }

        self.blobs.delete(&site_id).await?;
        self.cache.delete(&keys::report_list(&site_id)).await?;
        self.cache.delete(keys::ALL_URLS).await?;
        self.cache.delete(keys::MEDIANS).await?;

        Ok(())
    }

    /// Delete the URL's metadata record.
    pub async fn delete_metadata(&self, url: &str) -> Result<()> {
        let site_id = ident::encode(url);
        self.docs.delete_meta(&site_id).await
    }

    /// Reads and writes both count as views for retention purposes.
    async fn touch_last_viewed(&self, site_id: &str) -> Result<()> {
        self.docs
            .set_meta(site_id, &UrlMeta { last_viewed: Utc::now() })
            .await
    }
}
