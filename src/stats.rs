// src/stats.rs

//! Median computation over audit score sequences.
//!
//! Per-URL medians come from that URL's recent runs. The cross-URL
//! aggregate pools every URL's raw samples into one sequence per category
//! before taking a single median, which is not the same thing as averaging
//! per-URL medians.

use std::collections::BTreeMap;

use crate::cache::keys;
use crate::error::{AppError, Result};
use crate::models::{QueryOptions, StoredReport};
use crate::store::ReportStore;

/// Median of a score sequence.
///
/// Sorts ascending; even-length input averages the two central values.
/// Empty input fails with [`AppError::EmptyInput`]; normal flow never
/// computes a median over nothing, so callers guard before calling.
pub fn median(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(AppError::EmptyInput);
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Ok(sorted[mid])
    }
}

/// Collect per-category score sequences from a set of runs.
///
/// Runs arrive oldest-first (the store read path already limits to the
/// most recent runs and reverses them); each category score is scaled to
/// the 0..=100 range. Append order follows run order, though the median
/// itself is order-insensitive.
pub fn scores_by_category(runs: &[StoredReport]) -> BTreeMap<String, Vec<f64>> {
    let mut scores: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for run in runs {
        for category in &run.category_scores {
            scores
                .entry(category.id.clone())
                .or_default()
                .push(category.score * 100.0);
        }
    }
    scores
}

/// Per-URL and cross-URL score aggregation over a report store.
#[derive(Clone)]
pub struct StatsEngine {
    store: ReportStore,
}

impl StatsEngine {
    pub fn new(store: ReportStore) -> Self {
        Self { store }
    }

    /// Median score per category over a URL's recent runs.
    pub async fn median_scores(
        &self,
        url: &str,
        opts: QueryOptions,
    ) -> Result<BTreeMap<String, f64>> {
        let runs = self.store.get_reports(url, opts).await?;
        let mut medians = BTreeMap::new();
        for (category, scores) in scores_by_category(&runs) {
            medians.insert(category, median(&scores)?);
        }
        Ok(medians)
    }

    /// Pooled median score per category across every saved URL.
    ///
    /// Concatenates each URL's per-category sequences into one sample per
    /// category, then takes one median over the pool. Cache-first on the
    /// global median key when `opts.use_cache`.
    pub async fn median_scores_all_urls(
        &self,
        opts: QueryOptions,
    ) -> Result<BTreeMap<String, f64>> {
        if opts.use_cache {
            if let Some(cached) = self.store.cache().get(keys::MEDIANS).await? {
                log::debug!("Global median cache hit");
                return Ok(serde_json::from_value(cached)?);
            }
        }

        let mut pooled: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for url in self.store.get_all_saved_urls(opts.use_cache).await? {
            let runs = self.store.get_reports(&url, opts).await?;
            for (category, mut scores) in scores_by_category(&runs) {
                pooled.entry(category).or_default().append(&mut scores);
            }
        }

        let mut medians = BTreeMap::new();
        for (category, scores) in pooled {
            medians.insert(category, median(&scores)?);
        }

        if opts.use_cache {
            self.store
                .cache()
                .set(keys::MEDIANS, serde_json::to_value(&medians)?)
                .await?;
        }

        Ok(medians)
    }
}
