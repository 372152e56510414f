// src/audit.rs

//! Audit API client and top-level audit orchestration.
//!
//! The client fetches a page-quality measurement from the remote API and
//! hands the raw Lighthouse payload to the report store. A non-success
//! run outcome from the API is surfaced as [`AppError::RemoteAudit`] and
//! never stored; the orchestration layer folds that one error into a
//! structured summary so queued callers see a failure record instead of
//! a crash.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{AuditConfig, StoredReport};
use crate::store::ReportStore;

/// Source of raw audit payloads.
#[async_trait]
pub trait AuditApi: Send + Sync {
    /// Audit a URL, returning the raw Lighthouse payload.
    async fn audit(&self, url: &str) -> Result<Value>;
}

/// HTTP client for the PageSpeed Insights measurement API.
pub struct AuditClient {
    http: reqwest::Client,
    config: AuditConfig,
}

impl AuditClient {
    /// Create a configured client.
    pub fn new(config: &AuditConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl AuditApi for AuditClient {
    async fn audit(&self, url: &str) -> Result<Value> {
        let mut request = self
            .http
            .get(&self.config.endpoint)
            .query(&[("url", url), ("strategy", &self.config.strategy)]);
        for category in &self.config.categories {
            request = request.query(&[("category", category)]);
        }
        if let Some(key) = &self.config.api_key {
            request = request.query(&[("key", key)]);
        }

        log::info!("Auditing {}", url);
        let body: Value = request.send().await?.error_for_status()?.json().await?;
        extract_lighthouse_result(body)
    }
}

/// Pull the Lighthouse result out of an API response body.
///
/// Rejects responses whose run outcome is not a success, and carries the
/// aggregate origin field data over into the payload so the store can
/// persist it alongside the category scores.
fn extract_lighthouse_result(body: Value) -> Result<Value> {
    let mut lhr = body
        .get("lighthouseResult")
        .cloned()
        .ok_or_else(|| AppError::validation("API response has no lighthouseResult"))?;

    if let Some(code) = lhr
        .get("runtimeError")
        .and_then(|e| e.get("code"))
        .and_then(Value::as_str)
    {
        if code != "NO_ERROR" {
            return Err(AppError::remote_audit(code));
        }
    }

    if let Some(origin) = body
        .get("originLoadingExperience")
        .filter(|v| v.as_object().is_some_and(|o| !o.is_empty()))
    {
        if let Some(obj) = lhr.as_object_mut() {
            obj.insert("originFieldData".to_string(), origin.clone());
        }
    }

    Ok(lhr)
}

/// Outcome of one orchestrated audit.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub url: String,

    /// Stored slim record, absent when the audit failed upstream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<StoredReport>,

    /// Upstream failure messages; empty on success
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Audit a URL and persist the result.
///
/// A remote-audit failure becomes an `errors` entry in the summary; every
/// other error propagates to the caller unmodified.
pub async fn run_audit<A: AuditApi>(
    api: &A,
    store: &ReportStore,
    url: &str,
    replace_last: bool,
) -> Result<AuditSummary> {
    match api.audit(url).await {
        Ok(raw) => {
            let record = store.save_report(url, raw, replace_last).await?;
            Ok(AuditSummary {
                url: url.to_string(),
                record: Some(record),
                errors: Vec::new(),
            })
        }
        Err(AppError::RemoteAudit { code }) => {
            log::error!("Audit of {} failed upstream: {}", url, code);
            Ok(AuditSummary {
                url: url.to_string(),
                record: None,
                errors: vec![format!("remote audit failed: {code}")],
            })
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;
    use tempfile::TempDir;

    use crate::cache::InMemoryCache;
    use crate::storage::{LocalBlobStore, LocalDocumentStore};

    fn api_body(runtime_error: Option<&str>) -> Value {
        let mut lhr = json!({
            "categories": {
                "performance": {"id": "performance", "title": "Performance", "score": 0.9}
            },
            "i18n": {}
        });
        if let Some(code) = runtime_error {
            lhr["runtimeError"] = json!({"code": code, "message": "boom"});
        }
        json!({
            "lighthouseResult": lhr,
            "originLoadingExperience": {"overall_category": "FAST"}
        })
    }

    #[test]
    fn test_extract_accepts_no_error_outcome() {
        let mut body = api_body(None);
        body["lighthouseResult"]["runtimeError"] = json!({"code": "NO_ERROR"});
        let lhr = extract_lighthouse_result(body).unwrap();
        assert!(lhr.get("categories").is_some());
    }

    #[test]
    fn test_extract_surfaces_runtime_error() {
        let err = extract_lighthouse_result(api_body(Some("ERRORED_DOCUMENT_REQUEST")))
            .unwrap_err();
        match err {
            AppError::RemoteAudit { code } => assert_eq!(code, "ERRORED_DOCUMENT_REQUEST"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_extract_injects_origin_field_data() {
        let lhr = extract_lighthouse_result(api_body(None)).unwrap();
        assert_eq!(lhr["originFieldData"]["overall_category"], json!("FAST"));
    }

    #[test]
    fn test_extract_rejects_missing_result() {
        assert!(extract_lighthouse_result(json!({"error": {}})).is_err());
    }

    struct FakeApi {
        outcome: std::result::Result<Value, String>,
    }

    #[async_trait]
    impl AuditApi for FakeApi {
        async fn audit(&self, _url: &str) -> Result<Value> {
            match &self.outcome {
                Ok(v) => Ok(v.clone()),
                Err(code) => Err(AppError::remote_audit(code.clone())),
            }
        }
    }

    fn test_store(tmp: &TempDir) -> ReportStore {
        ReportStore::new(
            Arc::new(LocalDocumentStore::new(tmp.path())),
            Arc::new(LocalBlobStore::new(tmp.path())),
            Arc::new(InMemoryCache::new()),
        )
    }

    #[tokio::test]
    async fn test_run_audit_stores_successful_run() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);
        let api = FakeApi {
            outcome: Ok(extract_lighthouse_result(api_body(None)).unwrap()),
        };

        let summary = run_audit(&api, &store, "https://example.com/", false)
            .await
            .unwrap();
        assert!(summary.errors.is_empty());
        assert!(summary.record.is_some());
        assert!(store.get_full_report("https://example.com/").await.is_ok());
    }

    #[tokio::test]
    async fn test_run_audit_folds_remote_failure_into_summary() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);
        let api = FakeApi {
            outcome: Err("FAILED_DOCUMENT_REQUEST".to_string()),
        };

        let summary = run_audit(&api, &store, "https://example.com/", false)
            .await
            .unwrap();
        assert!(summary.record.is_none());
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].contains("FAILED_DOCUMENT_REQUEST"));

        // Nothing was stored for the failed run.
        assert!(store.get_full_report("https://example.com/").await.is_err());
    }
}
