use crate::pipeline::segment::Sentence;
use std::collections::HashMap;

/// Tokens of this length or shorter never enter the frequency table.
const MIN_TERM_CHARS: usize = 3;
const LEADING_BONUS: f64 = 10.0;
const TRAILING_BONUS: f64 = 5.0;
const LENGTH_BONUS: f64 = 5.0;
const LENGTH_BONUS_WORDS: std::ops::RangeInclusive<usize> = 8..=25;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSentence {
    pub sentence: Sentence,
    pub score: f64,
}

pub fn term_frequencies(full_text: &str) -> HashMap<String, u32> {
    let mut freq = HashMap::new();
    for token in full_text.split_whitespace() {
        let token = token.to_lowercase();
        if token.chars().count() > MIN_TERM_CHARS {
            *freq.entry(token).or_insert(0) += 1;
        }
    }
    freq
}

/// Scores sentences against the whole document. Output keeps input order.
pub fn score(sentences: &[Sentence], full_text: &str) -> Vec<ScoredSentence> {
    let freq = term_frequencies(full_text);
    let n = sentences.len();
    sentences
        .iter()
        .enumerate()
        .map(|(i, sentence)| {
            let word_score: u32 = sentence
                .text
                .split_whitespace()
                .map(|w| freq.get(&w.to_lowercase()).copied().unwrap_or(0))
                .sum();

            let mut position_bonus = 0.0;
            if i < 2 {
                position_bonus += LEADING_BONUS;
            }
            if i + 2 >= n {
                position_bonus += TRAILING_BONUS;
            }

            let length_bonus = if LENGTH_BONUS_WORDS.contains(&sentence.word_count) {
                LENGTH_BONUS
            } else {
                0.0
            };

            ScoredSentence {
                sentence: sentence.clone(),
                score: f64::from(word_score) + position_bonus + length_bonus,
            }
        })
        .collect()
}

/// Descending score; equal scores keep document order.
pub fn rank(scored: &[ScoredSentence]) -> Vec<ScoredSentence> {
    let mut ranked = scored.to_vec();
    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.sentence.ordinal.cmp(&b.sentence.ordinal))
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::segment::segment;

    #[test]
    fn frequency_table_skips_short_tokens() {
        let freq = term_frequencies("The cat and the Data data DATA set");
        assert_eq!(freq.get("data"), Some(&3));
        assert!(freq.get("the").is_none());
        assert!(freq.get("cat").is_none());
        assert!(freq.get("set").is_none());
    }

    #[test]
    fn position_and_length_bonuses() {
        let text = "Alpha beta gamma delta one two three four. \
                    Short words only here ok. \
                    Middle sentence number three here. \
                    Middle sentence number four here. \
                    Penultimate sentence sits here now. \
                    Final sentence closes things out now.";
        let sentences = segment(text);
        assert_eq!(sentences.len(), 6);
        let scored = score(&sentences, text);
        // first sentence: 8 words, leading bonus and length bonus
        let freq = term_frequencies(text);
        let first_words: u32 = sentences[0]
            .text
            .split_whitespace()
            .map(|w| freq.get(&w.to_lowercase()).copied().unwrap_or(0))
            .sum();
        assert_eq!(scored[0].score, f64::from(first_words) + 10.0 + 5.0);
        // second sentence: 5 words, leading bonus only
        let second_words: u32 = sentences[1]
            .text
            .split_whitespace()
            .map(|w| freq.get(&w.to_lowercase()).copied().unwrap_or(0))
            .sum();
        assert_eq!(scored[1].score, f64::from(second_words) + 10.0);
        // last two pick up the trailing bonus, middle ones nothing positional
        let middle = &scored[2];
        let middle_words: u32 = middle
            .sentence
            .text
            .split_whitespace()
            .map(|w| freq.get(&w.to_lowercase()).copied().unwrap_or(0))
            .sum();
        assert_eq!(middle.score, f64::from(middle_words));
        let last_words: u32 = sentences[5]
            .text
            .split_whitespace()
            .map(|w| freq.get(&w.to_lowercase()).copied().unwrap_or(0))
            .sum();
        assert_eq!(scored[5].score, f64::from(last_words) + 5.0);
    }

    #[test]
    fn short_documents_stack_both_bonuses() {
        let text = "Only one sentence exists in this document.";
        let sentences = segment(text);
        let scored = score(&sentences, text);
        let freq_sum: u32 = term_frequencies(text).values().sum();
        assert_eq!(scored[0].score, f64::from(freq_sum) + 10.0 + 5.0);
    }

    #[test]
    fn rank_is_deterministic_on_ties() {
        let s = |ordinal: usize, score: f64| ScoredSentence {
            sentence: Sentence::new(format!("Sentence number {ordinal}."), ordinal),
            score,
        };
        let ranked = rank(&[s(0, 1.0), s(1, 3.0), s(2, 1.0), s(3, 3.0)]);
        let order: Vec<_> = ranked.iter().map(|r| r.sentence.ordinal).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }
}
