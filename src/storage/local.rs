//! Local filesystem storage backends.
//!
//! Implements the document and blob store traits over tokio::fs for
//! development and testing. Writes are atomic (write to temp, then rename).
//! Run records are one JSON file per run, named by the run's audit
//! timestamp in microseconds so a plain filename sort yields time order.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{StoredReport, UrlMeta};
use crate::storage::{BlobStore, DocumentStore};

/// Local filesystem document store.
#[derive(Clone)]
pub struct LocalDocumentStore {
    root_dir: PathBuf,
}

impl LocalDocumentStore {
    /// Create a new store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    fn runs_dir(&self, site_id: &str) -> PathBuf {
        self.root_dir.join("sites").join(site_id).join("runs")
    }

    fn meta_path(&self, site_id: &str) -> PathBuf {
        self.root_dir.join("meta").join(format!("{site_id}.json"))
    }

    /// Run filenames sorted newest-first.
    async fn run_files_desc(&self, site_id: &str) -> Result<Vec<String>> {
        let dir = self.runs_dir(site_id);
        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(AppError::Io(e)),
        };
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(".json") {
                    names.push(name.to_string());
                }
            }
        }
        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }

    /// Filename for a run, bumped past collisions within the same microsecond.
    async fn fresh_run_path(&self, site_id: &str, run: &StoredReport) -> PathBuf {
        let dir = self.runs_dir(site_id);
        let mut micros = run.audited_on.timestamp_micros();
        loop {
            let path = dir.join(format!("{micros:016}.json"));
            if !path.exists() {
                return path;
            }
            micros += 1;
        }
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn append_run(&self, site_id: &str, run: &StoredReport) -> Result<()> {
        let path = self.fresh_run_path(site_id, run).await;
        write_json(&path, run).await
    }

    async fn replace_latest_run(&self, site_id: &str, run: &StoredReport) -> Result<()> {
        let names = self.run_files_desc(site_id).await?;
        let latest = names
            .first()
            .ok_or_else(|| AppError::storage(format!("no runs to replace for {site_id}")))?;
        let dir = self.runs_dir(site_id);
        tokio::fs::remove_file(dir.join(latest)).await?;
        let path = self.fresh_run_path(site_id, run).await;
        write_json(&path, run).await
    }

    async fn list_runs(&self, site_id: &str, limit: usize) -> Result<Vec<StoredReport>> {
        let dir = self.runs_dir(site_id);
        let mut runs = Vec::new();
        for name in self.run_files_desc(site_id).await?.into_iter().take(limit) {
            let run: StoredReport = read_json(&dir.join(&name))
                .await?
                .ok_or_else(|| AppError::storage(format!("run record vanished: {name}")))?;
            runs.push(run);
        }
        Ok(runs)
    }

    async fn run_count(&self, site_id: &str) -> Result<usize> {
        Ok(self.run_files_desc(site_id).await?.len())
    }

    async fn delete_runs_batch(&self, site_id: &str, max: usize) -> Result<usize> {
        let dir = self.runs_dir(site_id);
        let mut deleted = 0;
        for name in self.run_files_desc(site_id).await?.into_iter().take(max) {
            tokio::fs::remove_file(dir.join(&name)).await?;
            deleted += 1;
        }
        Ok(deleted)
    }

    async fn list_site_ids(&self) -> Result<Vec<String>> {
        let sites = self.root_dir.join("sites");
        let mut ids = Vec::new();
        let mut entries = match tokio::fs::read_dir(&sites).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(AppError::Io(e)),
        };
        while let Some(entry) = entries.next_entry().await? {
            let Some(id) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            // Partitions emptied by deletion no longer count as saved URLs.
            if !self.run_files_desc(&id).await?.is_empty() {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    async fn get_meta(&self, site_id: &str) -> Result<Option<UrlMeta>> {
        read_json(&self.meta_path(site_id)).await
    }

    async fn set_meta(&self, site_id: &str, meta: &UrlMeta) -> Result<()> {
        write_json(&self.meta_path(site_id), meta).await
    }

    async fn delete_meta(&self, site_id: &str) -> Result<()> {
        match tokio::fs::remove_file(self.meta_path(site_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn scan_meta(&self) -> Result<Vec<(String, UrlMeta)>> {
        let dir = self.root_dir.join("meta");
        let mut records = Vec::new();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(AppError::Io(e)),
        };
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Some(site_id) = name.strip_suffix(".json") else {
                continue;
            };
            if let Some(meta) = read_json::<UrlMeta>(&entry.path()).await? {
                records.push((site_id.to_string(), meta));
            }
        }
        Ok(records)
    }
}

/// Local filesystem blob store for full raw reports.
#[derive(Clone)]
pub struct LocalBlobStore {
    root_dir: PathBuf,
}

impl LocalBlobStore {
    /// Create a new store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root_dir.join("blobs").join(format!("{key}.json"))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, value: &Value) -> Result<()> {
        write_json(&self.blob_path(key), value).await
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        read_json(&self.blob_path(key)).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.blob_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

/// Write bytes atomically (write to temp, then rename).
async fn write_bytes(path: &PathBuf, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

async fn write_json<T: Serialize + ?Sized>(path: &PathBuf, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_bytes(path, &bytes).await
}

/// Read JSON, returning `None` if the file doesn't exist.
async fn read_json<T: DeserializeOwned>(path: &PathBuf) -> Result<Option<T>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn run_at(offset_secs: i64) -> StoredReport {
        StoredReport {
            category_scores: vec![],
            audited_on: Utc::now() + Duration::seconds(offset_secs),
            origin_field_data: None,
            full_report: None,
        }
    }

    #[tokio::test]
    async fn test_append_and_list_newest_first() {
        let tmp = TempDir::new().unwrap();
        let docs = LocalDocumentStore::new(tmp.path());

        for offset in [0, 1, 2] {
            docs.append_run("site", &run_at(offset)).await.unwrap();
        }

        let runs = docs.list_runs("site", 10).await.unwrap();
        assert_eq!(runs.len(), 3);
        assert!(runs[0].audited_on > runs[1].audited_on);
        assert!(runs[1].audited_on > runs[2].audited_on);

        let limited = docs.list_runs("site", 2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].audited_on, runs[0].audited_on);
    }

    #[tokio::test]
    async fn test_replace_latest_keeps_count() {
        let tmp = TempDir::new().unwrap();
        let docs = LocalDocumentStore::new(tmp.path());

        docs.append_run("site", &run_at(0)).await.unwrap();
        docs.append_run("site", &run_at(1)).await.unwrap();

        let replacement = run_at(5);
        docs.replace_latest_run("site", &replacement).await.unwrap();

        assert_eq!(docs.run_count("site").await.unwrap(), 2);
        let runs = docs.list_runs("site", 10).await.unwrap();
        assert_eq!(runs[0].audited_on, replacement.audited_on);
    }

    #[tokio::test]
    async fn test_replace_latest_without_runs_fails() {
        let tmp = TempDir::new().unwrap();
        let docs = LocalDocumentStore::new(tmp.path());
        assert!(docs.replace_latest_run("site", &run_at(0)).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_batch_and_site_listing() {
        let tmp = TempDir::new().unwrap();
        let docs = LocalDocumentStore::new(tmp.path());

        for offset in 0..5 {
            docs.append_run("site", &run_at(offset)).await.unwrap();
        }
        assert_eq!(docs.list_site_ids().await.unwrap(), vec!["site"]);

        assert_eq!(docs.delete_runs_batch("site", 3).await.unwrap(), 3);
        assert_eq!(docs.delete_runs_batch("site", 3).await.unwrap(), 2);
        assert_eq!(docs.delete_runs_batch("site", 3).await.unwrap(), 0);

        // Emptied partitions disappear from the listing.
        assert!(docs.list_site_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_meta_roundtrip_and_scan() {
        let tmp = TempDir::new().unwrap();
        let docs = LocalDocumentStore::new(tmp.path());

        assert!(docs.get_meta("a").await.unwrap().is_none());

        let now = Utc::now();
        docs.set_meta("a", &UrlMeta { last_viewed: now }).await.unwrap();
        docs.set_meta("b", &UrlMeta { last_viewed: now }).await.unwrap();

        assert_eq!(docs.get_meta("a").await.unwrap().unwrap().last_viewed, now);

        let mut scanned = docs.scan_meta().await.unwrap();
        scanned.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(scanned.len(), 2);
        assert_eq!(scanned[0].0, "a");

        docs.delete_meta("a").await.unwrap();
        docs.delete_meta("a").await.unwrap(); // idempotent
        assert!(docs.get_meta("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blob_overwrite_and_delete() {
        let tmp = TempDir::new().unwrap();
        let blobs = LocalBlobStore::new(tmp.path());

        assert!(blobs.get("k").await.unwrap().is_none());

        blobs.put("k", &serde_json::json!({"v": 1})).await.unwrap();
        blobs.put("k", &serde_json::json!({"v": 2})).await.unwrap();
        assert_eq!(
            blobs.get("k").await.unwrap().unwrap()["v"],
            serde_json::json!(2)
        );

        blobs.delete("k").await.unwrap();
        blobs.delete("k").await.unwrap(); // idempotent
        assert!(blobs.get("k").await.unwrap().is_none());
    }
}
