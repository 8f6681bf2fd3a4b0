use crate::pipeline::assemble::SummaryResult;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Process-wide request counters. Nothing about individual documents is kept.
pub struct SummaryStats {
    started_at: OffsetDateTime,
    requests: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    backend_fallbacks: AtomicU64,
    input_words: AtomicU64,
    summary_words: AtomicU64,
    by_source: DashMap<String, u64>,
    by_backend: DashMap<String, u64>,
    last_error: Mutex<Option<String>>,
}

#[derive(Debug, Serialize)]
pub struct StatsSnapshot {
    pub started_at: String,
    pub uptime_seconds: i64,
    pub requests: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub backend_fallbacks: u64,
    pub input_words: u64,
    pub summary_words: u64,
    pub mean_compression_pct: f64,
    pub by_source: BTreeMap<String, u64>,
    pub by_backend: BTreeMap<String, u64>,
    pub last_error: Option<String>,
}

/// `url:https://...` -> `url`; bare tags pass through.
fn source_kind(source: &str) -> &str {
    source.split_once(':').map_or(source, |(kind, _)| kind)
}

impl Default for SummaryStats {
    fn default() -> Self {
        Self {
            started_at: OffsetDateTime::now_utc(),
            requests: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            backend_fallbacks: AtomicU64::new(0),
            input_words: AtomicU64::new(0),
            summary_words: AtomicU64::new(0),
            by_source: DashMap::new(),
            by_backend: DashMap::new(),
            last_error: Mutex::new(None),
        }
    }
}

impl SummaryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, result: &SummaryResult) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        *self
            .by_source
            .entry(source_kind(&result.source).to_string())
            .or_insert(0) += 1;

        if !result.is_ok() {
            self.failed.fetch_add(1, Ordering::Relaxed);
            *self.last_error.lock() = result.error_detail.clone();
            return;
        }
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        if result.backend_fallback {
            self.backend_fallbacks.fetch_add(1, Ordering::Relaxed);
        }
        *self.by_backend.entry(result.backend.clone()).or_insert(0) += 1;
        self.input_words
            .fetch_add(result.original_word_count as u64, Ordering::Relaxed);
        self.summary_words
            .fetch_add(result.word_count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let input_words = self.input_words.load(Ordering::Relaxed);
        let summary_words = self.summary_words.load(Ordering::Relaxed);
        let mean_compression_pct = crate::pipeline::assemble::compression_pct(
            summary_words as usize,
            input_words as usize,
        );
        StatsSnapshot {
            started_at: self
                .started_at
                .format(&Rfc3339)
                .unwrap_or_else(|_| self.started_at.to_string()),
            uptime_seconds: (OffsetDateTime::now_utc() - self.started_at).whole_seconds(),
            requests: self.requests.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            backend_fallbacks: self.backend_fallbacks.load(Ordering::Relaxed),
            input_words,
            summary_words,
            mean_compression_pct,
            by_source: self
                .by_source
                .iter()
                .map(|e| (e.key().clone(), *e.value()))
                .collect(),
            by_backend: self
                .by_backend
                .iter()
                .map(|e| (e.key().clone(), *e.value()))
                .collect(),
            last_error: self.last_error.lock().clone(),
        }
    }
}
