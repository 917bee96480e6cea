//! Candidate enumeration, scoring and selection.
//!
//! Pure CPU work: given scene boundaries, signals and a transcript,
//! propose intervals and score them along five axes. Everything here is
//! deterministic — the freshness axis depends on the enumeration order,
//! which is itself fixed by the boundary list and trial durations.

use std::cmp::Ordering;

use clipforge_models::{AnalysisTargets, FeatureScores, ScoreWeights, Word};

/// Hook vocabulary awarded +0.5 early in an interval.
const HOOK_WORDS: &[&str] = &["wait", "hey", "no", "stop", "what", "now", "look", "watch"];

/// Question vocabulary awarded +0.3. "what" belongs to both sets and
/// scores as a question, not a hook.
const QUESTION_WORDS: &[&str] = &["who", "what", "where", "when", "why", "how"];

/// Hook scoring only considers words starting this soon after the
/// interval opens.
const EARLY_WINDOW_S: f64 = 2.5;

/// A scored interval before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredInterval {
    pub start_s: f64,
    pub end_s: f64,
    pub score: f64,
    pub features: FeatureScores,
}

/// Read-only inputs shared by every proposal in one run.
pub struct ScoringInputs<'a> {
    pub words: &'a [Word],
    pub motion: &'a [f64],
    pub audio: &'a [f64],
    pub keywords: &'a [String],
    pub weights: &'a ScoreWeights,
}

/// Enumerate interval proposals from scene structure and score each.
///
/// For each adjacent boundary pair and each trial duration
/// (target, min, max, in that order), the interval
/// `[s_i, min(s_i + trial, s_{i+1}, duration)]` is proposed and accepted
/// when its length reaches `clip_min_s`. Accepted proposals feed the
/// freshness accumulator in enumeration order.
pub fn enumerate_and_score(
    boundaries: &[f64],
    duration_s: f64,
    targets: &AnalysisTargets,
    inputs: &ScoringInputs<'_>,
) -> Vec<ScoredInterval> {
    let trials = [targets.target_s, targets.clip_min_s, targets.clip_max_s];

    let mut accepted: Vec<(f64, f64)> = Vec::new();
    let mut scored = Vec::new();

    for pair in boundaries.windows(2) {
        let (scene_start, scene_end) = (pair[0], pair[1]);

        for trial in trials {
            if scene_end - scene_start < trial {
                continue;
            }

            let start_s = scene_start;
            let end_s = (start_s + trial).min(scene_end).min(duration_s);

            if end_s - start_s >= targets.clip_min_s {
                let (score, features) = score_interval(start_s, end_s, inputs, &accepted);
                scored.push(ScoredInterval {
                    start_s,
                    end_s,
                    score,
                    features,
                });
                accepted.push((start_s, end_s));
            }
        }
    }

    scored
}

/// Sort by score descending (ties broken by earlier start) and keep the
/// top `max_candidates`.
pub fn select_top(mut scored: Vec<ScoredInterval>, max_candidates: usize) -> Vec<ScoredInterval> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.start_s.partial_cmp(&b.start_s).unwrap_or(Ordering::Equal))
    });
    scored.truncate(max_candidates);
    scored
}

/// Score one interval along the five axes.
pub fn score_interval(
    start_s: f64,
    end_s: f64,
    inputs: &ScoringInputs<'_>,
    accepted: &[(f64, f64)],
) -> (f64, FeatureScores) {
    let features = FeatureScores {
        speech_hook: speech_hook_score(inputs.words, start_s, end_s),
        motion: signal_mean(inputs.motion, start_s, end_s),
        audio_peak: signal_mean(inputs.audio, start_s, end_s),
        keyword_match: keyword_score(inputs.words, inputs.keywords, start_s, end_s),
        scene_freshness: freshness_score(start_s, end_s, accepted),
    };

    let w = inputs.weights;
    let score = w.speech_hook * features.speech_hook
        + w.motion * features.motion
        + w.audio_peak * features.audio_peak
        + w.keyword_match * features.keyword_match
        + w.scene_freshness * features.scene_freshness;

    (score.clamp(0.0, 1.0), features)
}

/// Hook phrases and questions within the interval's first 2.5 seconds.
pub fn speech_hook_score(words: &[Word], start_s: f64, end_s: f64) -> f64 {
    let early_window = start_s + EARLY_WINDOW_S;
    let mut score: f64 = 0.0;

    for word in words {
        if word.start_s < start_s || word.start_s > end_s {
            continue;
        }
        if word.start_s > early_window {
            continue;
        }

        let token = word.word.to_lowercase();
        let token = token.trim_matches(|c| ".,!?".contains(c));

        if QUESTION_WORDS.contains(&token) {
            score += 0.3;
        } else if HOOK_WORDS.contains(&token) {
            score += 0.5;
        }
        if word.word.ends_with('!') {
            score += 0.2;
        }
    }

    score.min(1.0)
}

/// Mean of a per-second signal over `[⌊start⌋, ⌊end⌋)`; 0 out of range.
pub fn signal_mean(signal: &[f64], start_s: f64, end_s: f64) -> f64 {
    let start_idx = start_s as usize;
    let end_idx = end_s as usize;

    if start_idx >= signal.len() {
        return 0.0;
    }
    let slice = &signal[start_idx..end_idx.min(signal.len())];
    if slice.is_empty() {
        return 0.0;
    }
    slice.iter().sum::<f64>() / slice.len() as f64
}

/// Fraction of requested keywords spoken inside the interval.
pub fn keyword_score(words: &[Word], keywords: &[String], start_s: f64, end_s: f64) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }

    let spoken = words
        .iter()
        .filter(|w| w.start_s >= start_s && w.start_s <= end_s)
        .map(|w| w.word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let matched = keywords
        .iter()
        .filter(|kw| spoken.contains(&kw.to_lowercase()))
        .count();

    (matched as f64 / keywords.len().max(1) as f64).min(1.0)
}

/// 1 minus the summed overlap ratio against previously accepted
/// intervals, floored at 0.
pub fn freshness_score(start_s: f64, end_s: f64, accepted: &[(f64, f64)]) -> f64 {
    let length = end_s - start_s;
    if length <= 0.0 {
        return 0.0;
    }

    let mut penalty = 0.0;
    for (prev_start, prev_end) in accepted {
        let overlap = end_s.min(*prev_end) - start_s.max(*prev_start);
        if overlap > 0.0 {
            penalty += overlap / length;
        }
    }

    (1.0 - penalty).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, start: f64) -> Word {
        Word::new(text, start, start + 0.3, 1.0)
    }

    fn inputs<'a>(
        words: &'a [Word],
        motion: &'a [f64],
        audio: &'a [f64],
        keywords: &'a [String],
        weights: &'a ScoreWeights,
    ) -> ScoringInputs<'a> {
        ScoringInputs {
            words,
            motion,
            audio,
            keywords,
            weights,
        }
    }

    #[test]
    fn hook_detection_scenario() {
        // "wait" is a hook (+0.5), "what" a question (+0.3), "is" nothing.
        let words = vec![word("wait", 0.2), word("what", 0.6), word("is", 1.1)];
        let score = speech_hook_score(&words, 0.0, 10.0);
        assert!((score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn hook_score_clamps_at_one() {
        let words = vec![
            word("wait", 0.1),
            word("stop", 0.4),
            word("look", 0.8),
            word("watch", 1.2),
        ];
        assert_eq!(speech_hook_score(&words, 0.0, 10.0), 1.0);
    }

    #[test]
    fn hooks_outside_early_window_do_not_score() {
        let words = vec![word("wait", 5.0)];
        assert_eq!(speech_hook_score(&words, 0.0, 10.0), 0.0);
        // The same word inside a later interval's early window scores.
        assert!((speech_hook_score(&words, 4.0, 14.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn exclamation_bonus_applies_to_raw_token() {
        let words = vec![Word::new("go!", 0.5, 0.8, 1.0)];
        assert!((speech_hook_score(&words, 0.0, 10.0) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn punctuation_is_stripped_before_matching() {
        let words = vec![Word::new("Wait,", 0.5, 0.8, 1.0)];
        assert!((speech_hook_score(&words, 0.0, 10.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn signal_mean_over_floor_indices() {
        let signal = vec![0.0, 1.0, 1.0, 0.5];
        // [1, 3) -> mean of 1.0, 1.0
        assert_eq!(signal_mean(&signal, 1.2, 3.0), 1.0);
        // out of range
        assert_eq!(signal_mean(&signal, 10.0, 12.0), 0.0);
        // clipped at the end
        assert!((signal_mean(&signal, 2.0, 10.0) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn keyword_fraction_with_substring_match() {
        let words = vec![word("giant", 1.0), word("swordfight", 2.0)];
        let keywords = vec!["sword".to_string(), "magic".to_string()];
        let score = keyword_score(&words, &keywords, 0.0, 10.0);
        assert!((score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn keyword_score_zero_without_keywords() {
        let words = vec![word("anything", 1.0)];
        assert_eq!(keyword_score(&words, &[], 0.0, 10.0), 0.0);
    }

    #[test]
    fn freshness_penalty_scenario() {
        // A=[0,10] accepted first, B=[5,15] overlaps 5 of its 10 seconds.
        let accepted = vec![(0.0, 10.0)];
        let freshness = freshness_score(5.0, 15.0, &accepted);
        assert!((freshness - 0.5).abs() < 1e-9);
    }

    #[test]
    fn freshness_floors_at_zero() {
        let accepted = vec![(0.0, 10.0), (0.0, 10.0)];
        assert_eq!(freshness_score(0.0, 10.0, &accepted), 0.0);
    }

    #[test]
    fn freshness_is_one_without_overlap() {
        let accepted = vec![(0.0, 10.0)];
        assert_eq!(freshness_score(20.0, 30.0, &accepted), 1.0);
    }

    #[test]
    fn earlier_acceptance_never_raises_later_freshness() {
        // Freshness monotonicity: adding an earlier-accepted interval
        // can only lower (or keep) a later candidate's freshness.
        let without = freshness_score(5.0, 15.0, &[(0.0, 10.0)]);
        let with = freshness_score(5.0, 15.0, &[(0.0, 10.0), (12.0, 20.0)]);
        assert!(with <= without);
    }

    #[test]
    fn enumeration_respects_scene_and_duration_bounds() {
        let targets = AnalysisTargets::default(); // 7 / 15 / 10
        let boundaries = vec![0.0, 30.0, 38.0, 60.0];
        let weights = ScoreWeights::default();
        let keywords: Vec<String> = Vec::new();
        let motion = vec![0.5; 60];
        let audio = vec![0.5; 60];
        let scoring = inputs(&[], &motion, &audio, &keywords, &weights);

        let scored = enumerate_and_score(&boundaries, 60.0, &targets, &scoring);

        for interval in &scored {
            assert!(interval.start_s >= 0.0);
            assert!(interval.start_s < interval.end_s);
            assert!(interval.end_s <= 60.0);
            let len = interval.end_s - interval.start_s;
            assert!(len >= targets.clip_min_s && len <= targets.clip_max_s);
        }

        // Scene [30, 38] is 8s long: only trials <= 8 fit, so exactly
        // the 7s proposal is accepted there.
        let in_short_scene: Vec<_> = scored
            .iter()
            .filter(|c| c.start_s == 30.0)
            .collect();
        assert_eq!(in_short_scene.len(), 1);
        assert!((in_short_scene[0].end_s - 37.0).abs() < 1e-9);
    }

    #[test]
    fn enumeration_is_deterministic() {
        let targets = AnalysisTargets::default();
        let boundaries = vec![0.0, 12.0, 29.5, 45.0];
        let weights = ScoreWeights::default();
        let keywords = vec!["fight".to_string()];
        let words = vec![word("wait", 0.5), word("fight", 13.0)];
        let motion = vec![0.3; 45];
        let audio = vec![0.9; 45];
        let scoring = inputs(&words, &motion, &audio, &keywords, &weights);

        let a = enumerate_and_score(&boundaries, 45.0, &targets, &scoring);
        let b = enumerate_and_score(&boundaries, 45.0, &targets, &scoring);
        assert_eq!(a, b);
    }

    #[test]
    fn duplicate_intervals_from_equal_trials_are_retained() {
        // With target == min, a scene proposes the same interval twice.
        // Both are kept; the second one pays the freshness penalty for
        // the first, in enumeration order.
        let targets = AnalysisTargets {
            target_s: 7.0,
            clip_min_s: 7.0,
            clip_max_s: 15.0,
            ..Default::default()
        };
        let boundaries = vec![0.0, 12.0];
        let weights = ScoreWeights::default();
        let keywords: Vec<String> = Vec::new();
        let motion = vec![1.0; 12];
        let audio = vec![1.0; 12];
        let scoring = inputs(&[], &motion, &audio, &keywords, &weights);

        let scored = enumerate_and_score(&boundaries, 12.0, &targets, &scoring);
        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0].start_s, scored[1].start_s);
        assert_eq!(scored[0].end_s, scored[1].end_s);
        assert_eq!(scored[0].features.scene_freshness, 1.0);
        assert_eq!(scored[1].features.scene_freshness, 0.0);
    }

    #[test]
    fn selection_sorts_by_score_then_start() {
        let interval = |start: f64, score: f64| ScoredInterval {
            start_s: start,
            end_s: start + 10.0,
            score,
            features: FeatureScores::default(),
        };
        let scored = vec![interval(20.0, 0.5), interval(0.0, 0.9), interval(10.0, 0.5)];
        let top = select_top(scored, 2);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].start_s, 0.0);
        // Tie at 0.5 broken by the earlier start.
        assert_eq!(top[1].start_s, 10.0);
    }

    #[test]
    fn empty_transcript_still_produces_candidates() {
        let targets = AnalysisTargets::default();
        let boundaries = vec![0.0, 20.0, 40.0];
        let weights = ScoreWeights::default();
        let keywords = vec!["fight".to_string()];
        let motion = vec![0.8; 40];
        let audio = vec![0.6; 40];
        let scoring = inputs(&[], &motion, &audio, &keywords, &weights);

        let scored = enumerate_and_score(&boundaries, 40.0, &targets, &scoring);
        assert!(!scored.is_empty());
        for interval in &scored {
            assert_eq!(interval.features.speech_hook, 0.0);
            assert_eq!(interval.features.keyword_match, 0.0);
            assert!(interval.score > 0.0);
        }
    }

    #[test]
    fn composite_score_stays_in_unit_range() {
        let weights = ScoreWeights {
            speech_hook: 2.0,
            motion: 2.0,
            audio_peak: 2.0,
            keyword_match: 2.0,
            scene_freshness: 2.0,
        };
        let keywords = vec!["wait".to_string()];
        let words = vec![word("wait", 0.1)];
        let motion = vec![1.0; 10];
        let audio = vec![1.0; 10];
        let scoring = inputs(&words, &motion, &audio, &keywords, &weights);

        let (score, _) = score_interval(0.0, 10.0, &scoring, &[]);
        assert!(score <= 1.0);
    }
}
