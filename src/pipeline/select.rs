use crate::pipeline::score::{rank, ScoredSentence};
use crate::pipeline::segment::Sentence;
use std::collections::HashSet;

/// Slack allowed over the word target while accumulating.
const WORD_BUDGET_SLACK: usize = 10;
/// Candidates already this close to the word target are kept whole.
const WORD_KEEP_ALL_SLACK: usize = 15;
const DUPLICATE_OVERLAP: f64 = 0.7;

/// Highest-scoring `target` sentences in rank order. When there are not more
/// candidates than the target, all of them come back in document order.
pub fn top_ranked(scored: &[ScoredSentence], target: usize) -> Vec<Sentence> {
    if scored.len() <= target {
        return scored.iter().map(|s| s.sentence.clone()).collect();
    }
    rank(scored)
        .into_iter()
        .take(target)
        .map(|s| s.sentence)
        .collect()
}

/// Three-zone pick: first sentence, last sentence, and evenly spaced samples from
/// the middle third. Output is in document order.
pub fn positional(sentences: &[Sentence], target: usize) -> Vec<Sentence> {
    let n = sentences.len();
    if n <= target {
        return sentences.to_vec();
    }
    if target < 3 {
        return sentences.iter().take(target).cloned().collect();
    }

    let middle_count = target - 2;
    let lo = n / 3;
    let hi = (2 * n / 3).max(lo + 1);
    let stride = ((hi - lo) / middle_count).max(1);

    let mut picked: Vec<usize> = vec![0, n - 1];
    for i in 0..middle_count {
        let idx = (lo + i * stride).clamp(1, n - 2);
        if !picked.contains(&idx) {
            picked.push(idx);
        }
    }
    // collisions in a narrow middle band: fill from the remaining interior
    let mut interior = 1..n - 1;
    while picked.len() < target {
        match interior.next() {
            Some(idx) if !picked.contains(&idx) => picked.push(idx),
            Some(_) => {}
            None => break,
        }
    }

    picked.sort_unstable();
    picked.into_iter().map(|i| sentences[i].clone()).collect()
}

/// Greedy fill up to `target_words + 10`, in candidate order. At least one
/// sentence survives even if it alone overshoots.
pub fn by_word_budget(candidates: &[Sentence], target_words: usize) -> Vec<Sentence> {
    let total: usize = candidates.iter().map(|s| s.word_count).sum();
    if total <= target_words + WORD_KEEP_ALL_SLACK {
        return candidates.to_vec();
    }

    let budget = target_words + WORD_BUDGET_SLACK;
    let mut used = 0usize;
    let mut out = Vec::new();
    for s in candidates {
        if used + s.word_count > budget && !out.is_empty() {
            break;
        }
        used += s.word_count;
        out.push(s.clone());
        if used > budget {
            break;
        }
    }
    out
}

fn token_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(|w| w.to_lowercase()).collect()
}

/// True when the shared tokens exceed 70% of the shorter sentence's tokens.
pub fn is_near_duplicate(a: &str, b: &str) -> bool {
    let ta = token_set(a);
    let tb = token_set(b);
    let shorter = ta.len().min(tb.len());
    if shorter == 0 {
        return false;
    }
    let shared = ta.intersection(&tb).count();
    shared as f64 > DUPLICATE_OVERLAP * shorter as f64
}

/// Appends `extra` to `primary`, drops near-duplicates (first seen wins) and
/// truncates to `limit`.
pub fn merge_dedup(primary: Vec<Sentence>, extra: Vec<Sentence>, limit: usize) -> Vec<Sentence> {
    let mut kept: Vec<Sentence> = Vec::with_capacity(limit);
    for s in primary.into_iter().chain(extra) {
        if kept.len() == limit {
            break;
        }
        if kept.iter().any(|k| is_near_duplicate(&k.text, &s.text)) {
            continue;
        }
        kept.push(s);
    }
    kept
}
