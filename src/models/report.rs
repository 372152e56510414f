//! Audit run records and URL metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};

/// Category-level rollup of one audit run: id, title and numeric score.
///
/// Per-audit detail (`auditRefs` and friends) is never persisted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    /// Category identifier (e.g. "performance")
    pub id: String,

    /// Human-readable category title
    pub title: String,

    /// Score in the range 0.0..=1.0
    pub score: f64,
}

/// One completed audit run of a URL, in slim (queryable) form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReport {
    /// Category rollups, stripped of per-audit references
    pub category_scores: Vec<CategoryScore>,

    /// When the audit completed
    pub audited_on: DateTime<Utc>,

    /// Aggregate field-data snapshot, present only when non-empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_field_data: Option<Value>,

    /// Full raw audit payload, attached on read to exactly one run
    /// per result set. Never persisted inside the run document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_report: Option<Value>,
}

impl StoredReport {
    /// Build a slim run record from a raw audit payload.
    ///
    /// Reads the `categories` map and keeps only id/title/score per entry.
    /// Categories without a numeric score (errored or not-applicable runs
    /// report `null`) are skipped. `originFieldData` is carried over only
    /// when it is a non-empty object.
    pub fn slim_from_raw(raw: &Value, audited_on: DateTime<Utc>) -> Result<Self> {
        let categories = raw
            .get("categories")
            .and_then(Value::as_object)
            .ok_or_else(|| AppError::validation("audit payload has no categories map"))?;

        let mut category_scores = Vec::with_capacity(categories.len());
        for (key, cat) in categories {
            let Some(score) = cat.get("score").and_then(Value::as_f64) else {
                log::warn!("Category {} has no numeric score, skipping", key);
                continue;
            };
            let id = cat
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or(key.as_str())
                .to_string();
            let title = cat
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            category_scores.push(CategoryScore { id, title, score });
        }

        let origin_field_data = raw
            .get("originFieldData")
            .filter(|v| v.as_object().is_some_and(|o| !o.is_empty()))
            .cloned();

        Ok(Self {
            category_scores,
            audited_on,
            origin_field_data,
            full_report: None,
        })
    }
}

/// Per-URL metadata record driving retention decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlMeta {
    /// Last time the URL's reports were read or written
    pub last_viewed: DateTime<Utc>,
}
