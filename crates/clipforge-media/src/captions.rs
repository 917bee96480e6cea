//! Caption timing and style engine.
//!
//! Turns a clip's word timings and a `(template, aspect)` pair into a
//! list of drawtext overlays with times relative to the clip start. The
//! renderer appends these to its video filter chain unchanged.

use std::path::Path;

use clipforge_models::{AspectRatio, CaptionTemplate, CaptionsMode, Word};

use crate::filter::{DrawText, TextShadow, TextX};

/// Default bold font shipped in the worker container.
pub const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf";

/// Development fallback font locations.
const DEV_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
];

/// Resolve the caption font, honoring `CLIPFORGE_FONT` and falling back
/// to known system locations.
pub fn resolve_font_path() -> String {
    if let Ok(path) = std::env::var("CLIPFORGE_FONT") {
        return path;
    }
    if Path::new(DEFAULT_FONT_PATH).exists() {
        return DEFAULT_FONT_PATH.to_string();
    }
    for path in DEV_FONT_PATHS {
        if Path::new(path).exists() {
            return path.to_string();
        }
    }
    DEFAULT_FONT_PATH.to_string()
}

/// Build the overlay list for one clip.
///
/// `words` is the full transcript; only words whose start falls inside
/// `[start_s, end_s]` produce captions, timed relative to `start_s`.
/// Returns an empty list when captions are disabled.
pub fn build_overlays(
    words: &[Word],
    template: CaptionTemplate,
    aspect: AspectRatio,
    start_s: f64,
    end_s: f64,
    captions: CaptionsMode,
) -> Vec<DrawText> {
    if !captions.is_on() {
        return Vec::new();
    }

    let clipped: Vec<&Word> = words
        .iter()
        .filter(|w| w.start_s >= start_s && w.start_s <= end_s)
        .collect();

    if clipped.is_empty() {
        return Vec::new();
    }

    let font = resolve_font_path();
    let baseline = aspect.caption_baseline_y() as i64;

    match template {
        CaptionTemplate::Clean => clean_overlays(&clipped, &font, baseline, start_s),
        CaptionTemplate::Manga => manga_overlays(&clipped, &font, baseline, start_s),
        CaptionTemplate::Impact => impact_overlays(&clipped, &font, baseline, start_s),
        CaptionTemplate::Karaoke => karaoke_overlays(&clipped, &font, baseline, start_s),
    }
}

fn word_window(word: &Word, clip_start: f64) -> (f64, f64) {
    (word.start_s - clip_start, word.end_s - clip_start)
}

/// Clean: white 48px, 3px border, light shadow, one word at a time.
fn clean_overlays(words: &[&Word], font: &str, baseline: i64, clip_start: f64) -> Vec<DrawText> {
    words
        .iter()
        .map(|word| DrawText {
            text: word.word.clone(),
            font_file: Some(font.to_string()),
            font_size: 48,
            font_color: "white".to_string(),
            border_width: 3,
            border_color: "black".to_string(),
            x: TextX::Centered,
            y: baseline,
            shadow: Some(TextShadow {
                color: "black@0.5".to_string(),
                x: 2,
                y: 2,
            }),
            enable: Some(word_window(word, clip_start)),
        })
        .collect()
}

/// Manga: yellow 56px, 4px border, heavier shadow.
fn manga_overlays(words: &[&Word], font: &str, baseline: i64, clip_start: f64) -> Vec<DrawText> {
    words
        .iter()
        .map(|word| DrawText {
            text: word.word.clone(),
            font_file: Some(font.to_string()),
            font_size: 56,
            font_color: "yellow".to_string(),
            border_width: 4,
            border_color: "black".to_string(),
            x: TextX::Centered,
            y: baseline,
            shadow: Some(TextShadow {
                color: "black@0.8".to_string(),
                x: 3,
                y: 3,
            }),
            enable: Some(word_window(word, clip_start)),
        })
        .collect()
}

/// Impact: tokens starting with an uppercase letter pop in red at 60px;
/// each successive caption nudges 10px up from the previous.
fn impact_overlays(words: &[&Word], font: &str, baseline: i64, clip_start: f64) -> Vec<DrawText> {
    words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let emphasized = word
                .word
                .chars()
                .next()
                .map(|c| c.is_uppercase())
                .unwrap_or(false);
            DrawText {
                text: word.word.clone(),
                font_file: Some(font.to_string()),
                font_size: if emphasized { 60 } else { 50 },
                font_color: if emphasized { "red" } else { "white" }.to_string(),
                border_width: 4,
                border_color: "black".to_string(),
                x: TextX::Centered,
                y: baseline - (i as i64) * 10,
                shadow: Some(TextShadow {
                    color: "black@0.7".to_string(),
                    x: 3,
                    y: 3,
                }),
                enable: Some(word_window(word, clip_start)),
            }
        })
        .collect()
}

/// Karaoke: one persistent gray line of the whole phrase plus a yellow
/// overlay per word, gated to that word's window.
fn karaoke_overlays(words: &[&Word], font: &str, baseline: i64, clip_start: f64) -> Vec<DrawText> {
    let full_line = words
        .iter()
        .map(|w| w.word.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let mut overlays = vec![DrawText {
        text: full_line,
        font_file: Some(font.to_string()),
        font_size: 48,
        font_color: "gray".to_string(),
        border_width: 3,
        border_color: "black".to_string(),
        x: TextX::Centered,
        y: baseline,
        shadow: Some(TextShadow {
            color: "black@0.5".to_string(),
            x: 2,
            y: 2,
        }),
        enable: None,
    }];

    overlays.extend(words.iter().map(|word| DrawText {
        text: word.word.clone(),
        font_file: Some(font.to_string()),
        font_size: 48,
        font_color: "yellow".to_string(),
        border_width: 3,
        border_color: "black".to_string(),
        x: TextX::Centered,
        y: baseline,
        shadow: Some(TextShadow {
            color: "black@0.5".to_string(),
            x: 2,
            y: 2,
        }),
        enable: Some(word_window(word, clip_start)),
    }));

    overlays
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words() -> Vec<Word> {
        vec![
            Word::new("Wait", 10.2, 10.5, 0.99),
            Word::new("what", 10.6, 11.0, 0.98),
            Word::new("is", 11.1, 11.3, 0.97),
            Word::new("outside", 99.0, 99.5, 0.9),
        ]
    }

    #[test]
    fn captions_off_yields_empty_list() {
        let overlays = build_overlays(
            &words(),
            CaptionTemplate::Clean,
            AspectRatio::Vertical,
            10.0,
            20.0,
            CaptionsMode::Off,
        );
        assert!(overlays.is_empty());
    }

    #[test]
    fn timing_is_relative_to_clip_start() {
        let overlays = build_overlays(
            &words(),
            CaptionTemplate::Clean,
            AspectRatio::Vertical,
            10.0,
            20.0,
            CaptionsMode::On,
        );
        assert_eq!(overlays.len(), 3);
        let (on, off) = overlays[0].enable.unwrap();
        assert!((on - 0.2).abs() < 1e-9);
        assert!((off - 0.5).abs() < 1e-9);
    }

    #[test]
    fn words_outside_interval_are_dropped() {
        let overlays = build_overlays(
            &words(),
            CaptionTemplate::Clean,
            AspectRatio::Vertical,
            10.0,
            20.0,
            CaptionsMode::On,
        );
        assert!(overlays.iter().all(|o| o.text != "outside"));
    }

    #[test]
    fn baseline_follows_aspect() {
        for (aspect, y) in [
            (AspectRatio::Vertical, 1620),
            (AspectRatio::Square, 880),
            (AspectRatio::Portrait, 1100),
        ] {
            let overlays = build_overlays(
                &words(),
                CaptionTemplate::Clean,
                aspect,
                10.0,
                20.0,
                CaptionsMode::On,
            );
            assert_eq!(overlays[0].y, y);
        }
    }

    #[test]
    fn impact_emphasizes_capitalized_tokens_and_stacks() {
        let overlays = build_overlays(
            &words(),
            CaptionTemplate::Impact,
            AspectRatio::Vertical,
            10.0,
            20.0,
            CaptionsMode::On,
        );
        // "Wait" is capitalized
        assert_eq!(overlays[0].font_size, 60);
        assert_eq!(overlays[0].font_color, "red");
        assert_eq!(overlays[0].y, 1620);
        // "what" is not
        assert_eq!(overlays[1].font_size, 50);
        assert_eq!(overlays[1].font_color, "white");
        assert_eq!(overlays[1].y, 1610);
        assert_eq!(overlays[2].y, 1600);
    }

    #[test]
    fn karaoke_has_persistent_line_plus_highlights() {
        let overlays = build_overlays(
            &words(),
            CaptionTemplate::Karaoke,
            AspectRatio::Square,
            10.0,
            20.0,
            CaptionsMode::On,
        );
        assert_eq!(overlays.len(), 4);
        assert_eq!(overlays[0].text, "Wait what is");
        assert_eq!(overlays[0].font_color, "gray");
        assert!(overlays[0].enable.is_none());
        assert!(overlays[1..].iter().all(|o| o.font_color == "yellow"));
        assert!(overlays[1..].iter().all(|o| o.enable.is_some()));
    }

    #[test]
    fn empty_interval_yields_empty_list() {
        let overlays = build_overlays(
            &words(),
            CaptionTemplate::Manga,
            AspectRatio::Vertical,
            40.0,
            50.0,
            CaptionsMode::On,
        );
        assert!(overlays.is_empty());
    }
}
