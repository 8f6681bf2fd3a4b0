//! Extractive summarization pipeline.
//!
//! segment -> score -> select -> smooth -> assemble. A configured [`Summarizer`]
//! may supply a draft in place of scoring and the first selection pass; the draft
//! is re-segmented and goes through the same selection, smoothing and assembly.
//! Any backend failure drops back to the local path.

pub mod assemble;
pub mod score;
pub mod segment;
pub mod select;
pub mod smooth;
pub mod target;

use crate::errors::SummarizeError;
use crate::summarize::Summarizer;
use assemble::{assemble, SummaryResult};
use score::{rank, score};
use segment::{segment, Sentence};
use select::{by_word_budget, merge_dedup, positional, top_ranked};
use serde::Serialize;
use smooth::smooth;
use std::sync::Arc;
use std::time::Instant;
use target::{Priority, SelectionMode, TargetSpec};

pub const EXTRACTIVE_BACKEND: &str = "extractive";
pub const DEFAULT_MIN_INPUT_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub text: String,
    pub source: String,
}

impl Document {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
        }
    }

    pub fn pasted(text: impl Into<String>) -> Self {
        Self::new(text, "pasted")
    }
}

struct Selection {
    sentences: Vec<Sentence>,
    backend: String,
    fallback: bool,
}

#[derive(Clone)]
pub struct Pipeline {
    backend: Option<Arc<dyn Summarizer>>,
    min_input_chars: usize,
}

impl Pipeline {
    pub fn new(backend: Option<Arc<dyn Summarizer>>, min_input_chars: usize) -> Self {
        Self {
            backend,
            min_input_chars,
        }
    }

    #[cfg(test)]
    pub fn extractive() -> Self {
        Self::new(None, DEFAULT_MIN_INPUT_CHARS)
    }

    pub fn backend_name(&self) -> &str {
        self.backend.as_deref().map_or(EXTRACTIVE_BACKEND, |b| b.name())
    }

    /// Runs one request. Failures come back as an error-status result, never a panic.
    pub fn run(&self, doc: &Document, target: &TargetSpec) -> SummaryResult {
        let started = Instant::now();
        match self.summarize(doc, target) {
            Ok(mut result) => {
                result.elapsed_seconds = started.elapsed().as_secs_f64();
                result.source = doc.source.clone();
                result
            }
            Err(e) => {
                tracing::warn!(source=%doc.source, error=%e, "summarization failed");
                SummaryResult::failure(e.to_string(), doc.source.clone(), started.elapsed().as_secs_f64())
            }
        }
    }

    fn summarize(&self, doc: &Document, target: &TargetSpec) -> Result<SummaryResult, SummarizeError> {
        let chars = doc.text.trim().chars().count();
        if chars < self.min_input_chars {
            return Err(SummarizeError::InputTooShort {
                chars,
                min: self.min_input_chars,
            });
        }
        if target.target_sentences == 0 || target.target_words == 0 {
            return Err(SummarizeError::InvalidTarget(
                "targets must be at least 1".into(),
            ));
        }

        let original_word_count = doc.text.split_whitespace().count();
        let selection = match self.backend.as_deref() {
            Some(backend) => match select_from_draft(backend, doc, target) {
                Some(sentences) => Selection {
                    sentences,
                    backend: backend.name().to_string(),
                    fallback: false,
                },
                None => Selection {
                    sentences: select_local(doc, target)?,
                    backend: EXTRACTIVE_BACKEND.to_string(),
                    fallback: true,
                },
            },
            None => Selection {
                sentences: select_local(doc, target)?,
                backend: EXTRACTIVE_BACKEND.to_string(),
                fallback: false,
            },
        };

        let smoothed: Vec<String> = selection.sentences.iter().map(|s| smooth(&s.text)).collect();
        let mut result = assemble(&smoothed, original_word_count, target);
        result.backend = selection.backend;
        result.backend_fallback = selection.fallback;
        tracing::debug!(
            backend=%result.backend,
            sentences=result.sentence_count,
            words=result.word_count,
            compression_pct=result.compression_pct,
            "summary assembled"
        );
        Ok(result)
    }
}

fn select_local(doc: &Document, target: &TargetSpec) -> Result<Vec<Sentence>, SummarizeError> {
    let sentences = segment(&doc.text);
    if sentences.is_empty() {
        return Err(SummarizeError::NoSentencesFound);
    }
    let selected = match (target.priority, target.selection) {
        (Priority::SentencesFirst, SelectionMode::Ranked) => {
            top_ranked(&score(&sentences, &doc.text), target.target_sentences)
        }
        (Priority::SentencesFirst, SelectionMode::Positional) => {
            positional(&sentences, target.target_sentences)
        }
        (Priority::WordsFirst, SelectionMode::Ranked) => {
            let ranked: Vec<Sentence> = rank(&score(&sentences, &doc.text))
                .into_iter()
                .map(|s| s.sentence)
                .collect();
            by_word_budget(&ranked, target.target_words)
        }
        (Priority::WordsFirst, SelectionMode::Positional) => {
            by_word_budget(&sentences, target.target_words)
        }
    };
    Ok(selected)
}

/// `None` when the backend failed or produced nothing usable.
fn select_from_draft(backend: &dyn Summarizer, doc: &Document, target: &TargetSpec) -> Option<Vec<Sentence>> {
    let (max_len, min_len) = target.length_hints();
    let draft = match backend.draft(&doc.text, max_len, min_len) {
        Ok(text) => segment(&text),
        Err(e) => {
            tracing::warn!(backend = backend.name(), error=%e, "draft failed; using extractive path");
            return None;
        }
    };
    if draft.is_empty() {
        tracing::warn!(backend = backend.name(), "draft had no usable sentences; using extractive path");
        return None;
    }

    let selected = match target.priority {
        Priority::WordsFirst => by_word_budget(&draft, target.target_words),
        Priority::SentencesFirst if draft.len() >= target.target_sentences => {
            draft.into_iter().take(target.target_sentences).collect()
        }
        Priority::SentencesFirst => {
            tracing::debug!(
                have = draft.len(),
                want = target.target_sentences,
                "draft short of target; requesting expansion"
            );
            let expansion = match backend.draft(&doc.text, max_len * 2, min_len * 2) {
                Ok(text) => segment(&text),
                Err(e) => {
                    tracing::warn!(backend = backend.name(), error=%e, "expansion draft failed");
                    Vec::new()
                }
            };
            merge_dedup(draft, expansion, target.target_sentences)
        }
    };
    Some(selected)
}
