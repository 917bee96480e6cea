//! Word-timestamped transcripts.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::VideoId;

/// A single recognized word with timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Word {
    /// The token as recognized, punctuation preserved
    pub word: String,
    /// Start time in seconds from the beginning of the source
    pub start_s: f64,
    /// End time in seconds, `>= start_s`
    pub end_s: f64,
    /// Model confidence in [0, 1]
    pub confidence: f64,
}

impl Word {
    pub fn new(word: impl Into<String>, start_s: f64, end_s: f64, confidence: f64) -> Self {
        Self {
            word: word.into(),
            start_s,
            end_s,
            confidence,
        }
    }
}

/// Transcript for one video in one language.
///
/// `words` is ordered by non-decreasing `start_s`. An inaudible track
/// yields an empty list, never a missing transcript.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Transcript {
    pub video_id: VideoId,
    /// BCP-47-ish language code detected by the recognizer
    pub lang: String,
    pub words: Vec<Word>,
}

impl Transcript {
    pub fn new(video_id: VideoId, lang: impl Into<String>, words: Vec<Word>) -> Self {
        Self {
            video_id,
            lang: lang.into(),
            words,
        }
    }

    /// Check the ordering invariants: per-word `start_s <= end_s` and
    /// non-decreasing starts across the list.
    pub fn is_well_formed(&self) -> bool {
        let mut prev_start = f64::NEG_INFINITY;
        for w in &self.words {
            if w.start_s > w.end_s || w.start_s < prev_start {
                return false;
            }
            prev_start = w.start_s;
        }
        true
    }

    /// Words whose start falls inside `[start_s, end_s]`.
    pub fn words_in(&self, start_s: f64, end_s: f64) -> impl Iterator<Item = &Word> {
        self.words
            .iter()
            .filter(move |w| w.start_s >= start_s && w.start_s <= end_s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, start: f64, end: f64) -> Word {
        Word::new(text, start, end, 1.0)
    }

    #[test]
    fn well_formed_accepts_ordered_words() {
        let t = Transcript::new(
            VideoId::new(),
            "en",
            vec![word("a", 0.0, 0.5), word("b", 0.5, 1.0), word("c", 0.5, 2.0)],
        );
        assert!(t.is_well_formed());
    }

    #[test]
    fn well_formed_rejects_backwards_words() {
        let t = Transcript::new(VideoId::new(), "en", vec![word("a", 1.0, 0.5)]);
        assert!(!t.is_well_formed());

        let t = Transcript::new(
            VideoId::new(),
            "en",
            vec![word("a", 2.0, 3.0), word("b", 1.0, 4.0)],
        );
        assert!(!t.is_well_formed());
    }

    #[test]
    fn words_in_filters_by_start() {
        let t = Transcript::new(
            VideoId::new(),
            "en",
            vec![word("a", 0.2, 0.5), word("b", 5.0, 5.5), word("c", 11.0, 11.5)],
        );
        let hits: Vec<_> = t.words_in(0.0, 10.0).map(|w| w.word.as_str()).collect();
        assert_eq!(hits, vec!["a", "b"]);
    }
}
