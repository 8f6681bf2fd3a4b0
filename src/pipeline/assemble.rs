use crate::pipeline::target::TargetSpec;
use serde::{Deserialize, Serialize};

pub const EXACT_MATCH: &str = "exact match";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub text: String,
    pub sentence_count: usize,
    pub word_count: usize,
    pub original_word_count: usize,
    pub compression_pct: f64,
    pub elapsed_seconds: f64,
    pub sentence_target: String,
    pub word_target: String,
    pub status: Status,
    pub error_detail: Option<String>,
    pub backend: String,
    pub backend_fallback: bool,
    pub source: String,
}

impl SummaryResult {
    pub fn failure(detail: impl Into<String>, source: impl Into<String>, elapsed_seconds: f64) -> Self {
        Self {
            text: String::new(),
            sentence_count: 0,
            word_count: 0,
            original_word_count: 0,
            compression_pct: 0.0,
            elapsed_seconds,
            sentence_target: String::new(),
            word_target: String::new(),
            status: Status::Error,
            error_detail: Some(detail.into()),
            backend: String::new(),
            backend_fallback: false,
            source: source.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

/// Percentage reduction in words, one decimal place. Zero when there is nothing to
/// compress.
pub fn compression_pct(summary_words: usize, original_words: usize) -> f64 {
    if original_words == 0 {
        return 0.0;
    }
    let pct = (1.0 - summary_words as f64 / original_words as f64) * 100.0;
    // decimal rounding of the exact binary value, halves to even
    format!("{pct:.1}").parse().unwrap_or(pct)
}

pub fn target_match(achieved: usize, target: usize) -> String {
    if achieved == target {
        EXACT_MATCH.to_string()
    } else {
        format!("{achieved}/{target}")
    }
}

/// Joins final sentences and computes the observable metrics. Timing, backend and
/// source are filled in by the caller.
pub fn assemble(sentences: &[String], original_word_count: usize, target: &TargetSpec) -> SummaryResult {
    let text = sentences.join(" ");
    let word_count = text.split_whitespace().count();
    let sentence_count = sentences.len();
    if original_word_count == 0 {
        tracing::debug!("original word count is zero; compression forced to 0");
    }
    SummaryResult {
        compression_pct: compression_pct(word_count, original_word_count),
        sentence_target: target_match(sentence_count, target.target_sentences),
        word_target: target_match(word_count, target.target_words),
        text,
        sentence_count,
        word_count,
        original_word_count,
        elapsed_seconds: 0.0,
        status: Status::Ok,
        error_detail: None,
        backend: String::new(),
        backend_fallback: false,
        source: String::new(),
    }
}
