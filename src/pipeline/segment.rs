use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Fragments shorter than this (in characters) are treated as noise.
pub const MIN_SENTENCE_CHARS: usize = 10;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
// Terminal punctuation, a space, then an uppercase letter. Only the punctuation is kept
// with the left fragment; the letter opens the next one.
static BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?] \p{Lu}").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sentence {
    pub text: String,
    pub ordinal: usize,
    pub word_count: usize,
}

impl Sentence {
    pub fn new(text: String, ordinal: usize) -> Self {
        let word_count = text.split_whitespace().count();
        Self {
            text,
            ordinal,
            word_count,
        }
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Splits raw text into sentences, dropping short fragments and artifacts.
pub fn segment(text: &str) -> Vec<Sentence> {
    let normalized = collapse_whitespace(text);
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut fragments = Vec::new();
    for m in BOUNDARY.find_iter(&normalized) {
        // punctuation is a single ASCII byte
        let cut = m.start() + 1;
        fragments.push(&normalized[start..cut]);
        start = cut;
    }
    fragments.push(&normalized[start..]);

    for raw in fragments {
        let fragment = raw.trim();
        if fragment.chars().count() < MIN_SENTENCE_CHARS || fragment.ends_with("..") {
            continue;
        }
        let mut text = fragment.to_string();
        if !ends_with_terminal(&text) {
            text.push('.');
        }
        out.push(Sentence::new(text, out.len()));
    }
    out
}

pub fn ends_with_terminal(s: &str) -> bool {
    s.ends_with(['.', '!', '?'])
}
