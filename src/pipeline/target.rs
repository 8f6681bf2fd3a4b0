use crate::errors::SummarizeError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const CUSTOM_SENTENCE_RANGE: (usize, usize) = (2, 15);
pub const CUSTOM_WORD_RANGE: (usize, usize) = (25, 300);

/// Which target wins when sentence and word counts disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    #[default]
    SentencesFirst,
    WordsFirst,
}

impl FromStr for Priority {
    type Err = SummarizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sentences-first" => Ok(Priority::SentencesFirst),
            "words-first" => Ok(Priority::WordsFirst),
            other => Err(SummarizeError::InvalidTarget(format!(
                "unknown priority '{other}' (expected sentences-first or words-first)"
            ))),
        }
    }
}

/// Local selection policy used when no backend draft is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    #[default]
    Ranked,
    Positional,
}

impl FromStr for SelectionMode {
    type Err = SummarizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ranked" => Ok(SelectionMode::Ranked),
            "positional" => Ok(SelectionMode::Positional),
            other => Err(SummarizeError::InvalidTarget(format!(
                "unknown selection '{other}' (expected ranked or positional)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Tweet,
    Quick,
    Executive,
    Detailed,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Tweet,
        Preset::Quick,
        Preset::Executive,
        Preset::Detailed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Tweet => "tweet",
            Preset::Quick => "quick",
            Preset::Executive => "executive",
            Preset::Detailed => "detailed",
        }
    }

    /// (sentences, words)
    pub fn counts(self) -> (usize, usize) {
        match self {
            Preset::Tweet => (2, 45),
            Preset::Quick => (5, 75),
            Preset::Executive => (7, 110),
            Preset::Detailed => (10, 170),
        }
    }
}

impl FromStr for Preset {
    type Err = SummarizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| SummarizeError::InvalidTarget(format!("unknown preset '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub target_sentences: usize,
    pub target_words: usize,
    pub priority: Priority,
    pub selection: SelectionMode,
}

impl TargetSpec {
    pub fn from_preset(preset: Preset) -> Self {
        let (target_sentences, target_words) = preset.counts();
        Self {
            target_sentences,
            target_words,
            priority: Priority::default(),
            selection: SelectionMode::default(),
        }
    }

    /// Caller-supplied counts, bounded to the ranges the presets live in.
    pub fn custom(target_sentences: usize, target_words: usize) -> Result<Self, SummarizeError> {
        let (smin, smax) = CUSTOM_SENTENCE_RANGE;
        let (wmin, wmax) = CUSTOM_WORD_RANGE;
        if !(smin..=smax).contains(&target_sentences) {
            return Err(SummarizeError::InvalidTarget(format!(
                "target_sentences must be in [{smin}, {smax}], got {target_sentences}"
            )));
        }
        if !(wmin..=wmax).contains(&target_words) {
            return Err(SummarizeError::InvalidTarget(format!(
                "target_words must be in [{wmin}, {wmax}], got {target_words}"
            )));
        }
        Ok(Self {
            target_sentences,
            target_words,
            priority: Priority::default(),
            selection: SelectionMode::default(),
        })
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_selection(mut self, selection: SelectionMode) -> Self {
        self.selection = selection;
        self
    }

    /// (max, min) length hints handed to a draft backend.
    pub fn length_hints(&self) -> (usize, usize) {
        let max = self.target_words * 3 / 2;
        let min = (self.target_words / 2).max(10);
        (max.max(min), min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_match_documented_counts() {
        let t = TargetSpec::from_preset("executive".parse().unwrap());
        assert_eq!((t.target_sentences, t.target_words), (7, 110));
        assert_eq!(t.priority, Priority::SentencesFirst);
        assert!("novel".parse::<Preset>().is_err());
    }

    #[test]
    fn custom_targets_are_range_checked() {
        assert!(TargetSpec::custom(2, 25).is_ok());
        assert!(TargetSpec::custom(15, 300).is_ok());
        assert!(matches!(
            TargetSpec::custom(1, 100),
            Err(SummarizeError::InvalidTarget(_))
        ));
        assert!(matches!(
            TargetSpec::custom(5, 301),
            Err(SummarizeError::InvalidTarget(_))
        ));
    }

    #[test]
    fn priority_parses_wire_names() {
        assert_eq!("words-first".parse::<Priority>().unwrap(), Priority::WordsFirst);
        let json = serde_json::to_string(&Priority::SentencesFirst).unwrap();
        assert_eq!(json, "\"sentences-first\"");
        assert!("both".parse::<Priority>().is_err());
    }

    #[test]
    fn length_hints_scale_with_word_target() {
        let t = TargetSpec::from_preset(Preset::Quick);
        assert_eq!(t.length_hints(), (112, 37));
        let tiny = TargetSpec::custom(2, 25).unwrap();
        assert_eq!(tiny.length_hints(), (37, 12));
    }
}
