//! Word-timestamped transcription over 16 kHz mono WAV input.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use clipforge_models::Word;

use crate::error::{AsrError, AsrResult};

/// Default directory holding ggml model files.
const DEFAULT_MODEL_DIR: &str = "/opt/whisper-models";

/// Token timestamps arrive in 10 ms units.
const TOKEN_TIME_UNIT_S: f64 = 0.01;

/// Transcriber configuration.
#[derive(Debug, Clone)]
pub struct TranscriberConfig {
    /// Model size: tiny/base/small/medium/large
    pub model: String,
    /// Language hint; "auto" enables detection
    pub language: String,
    /// Directory containing `ggml-<model>.bin` files
    pub model_dir: PathBuf,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            model: "base".to_string(),
            language: "auto".to_string(),
            model_dir: std::env::var("WHISPER_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_DIR)),
        }
    }
}

impl TranscriberConfig {
    /// Path of the ggml model file for the configured size.
    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(format!("ggml-{}.bin", self.model))
    }
}

/// Result of one transcription run.
#[derive(Debug, Clone)]
pub struct TranscriptOutput {
    /// Detected (or synthesized) language code
    pub language: String,
    /// Ordered word list; empty for an inaudible track
    pub words: Vec<Word>,
}

/// Speech recognizer holding a loaded whisper model.
pub struct Transcriber {
    ctx: WhisperContext,
    config: TranscriberConfig,
}

impl Transcriber {
    /// Load the model named by the configuration.
    pub fn new(config: TranscriberConfig) -> AsrResult<Self> {
        let model_path = config.model_path();
        if !model_path.exists() {
            return Err(AsrError::ModelNotFound(model_path));
        }

        info!(model = %model_path.display(), "Loading whisper model");
        let ctx = WhisperContext::new_with_params(
            &model_path.to_string_lossy(),
            WhisperContextParameters::default(),
        )
        .map_err(|e| AsrError::ModelLoad(e.to_string()))?;

        Ok(Self { ctx, config })
    }

    /// Transcribe 16 kHz mono samples.
    ///
    /// An empty or inaudible track succeeds with an empty word list and
    /// a synthesized language code derived from the hint.
    pub fn transcribe(&self, samples: &[f32]) -> AsrResult<TranscriptOutput> {
        if samples.is_empty() {
            return Ok(TranscriptOutput {
                language: self.fallback_language(),
                words: Vec::new(),
            });
        }

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| AsrError::Transcription(e.to_string()))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        let language = self.config.language.clone();
        params.set_language(Some(&language));
        params.set_token_timestamps(true);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, samples)
            .map_err(|e| AsrError::Transcription(e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| AsrError::Transcription(e.to_string()))?;

        let mut words = Vec::new();
        for segment in 0..n_segments {
            let n_tokens = state
                .full_n_tokens(segment)
                .map_err(|e| AsrError::Transcription(e.to_string()))?;

            let mut tokens = Vec::with_capacity(n_tokens as usize);
            for t in 0..n_tokens {
                let text = state
                    .full_get_token_text(segment, t)
                    .map_err(|e| AsrError::Transcription(e.to_string()))?;
                let data = state
                    .full_get_token_data(segment, t)
                    .map_err(|e| AsrError::Transcription(e.to_string()))?;
                tokens.push(TokenTiming {
                    text,
                    start_s: data.t0 as f64 * TOKEN_TIME_UNIT_S,
                    end_s: data.t1 as f64 * TOKEN_TIME_UNIT_S,
                    probability: data.p as f64,
                });
            }
            words.extend(fold_tokens_into_words(&tokens));
        }

        let language = match state.full_lang_id_from_state() {
            Ok(id) => whisper_rs::get_lang_str(id)
                .map(str::to_string)
                .unwrap_or_else(|| self.fallback_language()),
            Err(e) => {
                warn!(error = %e, "Language detection failed, using hint");
                self.fallback_language()
            }
        };

        debug!(words = words.len(), language = %language, "Transcription complete");
        Ok(TranscriptOutput { language, words })
    }

    fn fallback_language(&self) -> String {
        if self.config.language == "auto" {
            "en".to_string()
        } else {
            self.config.language.clone()
        }
    }
}

/// One decoded token with timing.
#[derive(Debug, Clone)]
struct TokenTiming {
    text: String,
    start_s: f64,
    end_s: f64,
    probability: f64,
}

/// Merge sub-word tokens into whole words.
///
/// Whisper marks word starts with a leading space; special tokens like
/// `[_BEG_]` are skipped. A word's confidence is the mean token
/// probability.
fn fold_tokens_into_words(tokens: &[TokenTiming]) -> Vec<Word> {
    let mut words: Vec<Word> = Vec::new();
    let mut current: Option<(String, f64, f64, Vec<f64>)> = None;

    for token in tokens {
        if token.text.starts_with("[_") || token.text.starts_with("<|") {
            continue;
        }

        let starts_word = token.text.starts_with(' ') || current.is_none();
        if starts_word {
            if let Some(word) = flush_word(current.take()) {
                words.push(word);
            }
            current = Some((
                token.text.trim_start().to_string(),
                token.start_s,
                token.end_s,
                vec![token.probability],
            ));
        } else if let Some((text, _, end, probs)) = current.as_mut() {
            text.push_str(&token.text);
            *end = token.end_s;
            probs.push(token.probability);
        }
    }

    if let Some(word) = flush_word(current) {
        words.push(word);
    }
    words
}

fn flush_word(current: Option<(String, f64, f64, Vec<f64>)>) -> Option<Word> {
    let (text, start, end, probs) = current?;
    let text = text.trim().to_string();
    if text.is_empty() {
        return None;
    }
    let confidence = probs.iter().sum::<f64>() / probs.len() as f64;
    Some(Word::new(text, start, end, confidence))
}

/// Read a 16 kHz mono WAV into f32 samples.
fn read_wav_samples(path: &Path) -> AsrResult<Vec<f32>> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    if spec.channels != 1 || spec.sample_rate != 16_000 {
        return Err(AsrError::UnsupportedAudio(format!(
            "expected 16 kHz mono, got {} Hz x{}",
            spec.sample_rate, spec.channels
        )));
    }

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => reader
            .samples::<i16>()
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|s| s as f32 / i16::MAX as f32)
            .collect(),
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
    };

    Ok(samples)
}

/// Transcribe a WAV file, loading the model and running inference on a
/// blocking thread.
pub async fn transcribe_file(
    audio_path: impl AsRef<Path>,
    config: TranscriberConfig,
) -> AsrResult<TranscriptOutput> {
    let audio_path = audio_path.as_ref().to_path_buf();

    tokio::task::spawn_blocking(move || {
        let samples = read_wav_samples(&audio_path)?;
        let transcriber = Transcriber::new(config)?;
        transcriber.transcribe(&samples)
    })
    .await
    .map_err(|e| AsrError::Transcription(format!("transcription task panicked: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(text: &str, start: f64, end: f64, p: f64) -> TokenTiming {
        TokenTiming {
            text: text.to_string(),
            start_s: start,
            end_s: end,
            probability: p,
        }
    }

    #[test]
    fn tokens_fold_on_leading_space() {
        let tokens = vec![
            token(" Wa", 0.0, 0.2, 0.9),
            token("it", 0.2, 0.4, 0.8),
            token(" what", 0.5, 0.9, 0.95),
        ];
        let words = fold_tokens_into_words(&tokens);
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].word, "Wait");
        assert_eq!(words[0].start_s, 0.0);
        assert_eq!(words[0].end_s, 0.4);
        assert!((words[0].confidence - 0.85).abs() < 1e-9);
        assert_eq!(words[1].word, "what");
    }

    #[test]
    fn special_tokens_are_skipped() {
        let tokens = vec![
            token("[_BEG_]", 0.0, 0.0, 1.0),
            token(" hello", 0.1, 0.5, 0.9),
            token("<|endoftext|>", 0.5, 0.5, 1.0),
        ];
        let words = fold_tokens_into_words(&tokens);
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].word, "hello");
    }

    #[test]
    fn empty_tokens_yield_no_words() {
        assert!(fold_tokens_into_words(&[]).is_empty());
    }

    #[test]
    fn config_resolves_model_file() {
        let config = TranscriberConfig {
            model: "base".to_string(),
            language: "auto".to_string(),
            model_dir: PathBuf::from("/models"),
        };
        assert_eq!(config.model_path(), PathBuf::from("/models/ggml-base.bin"));
    }

    #[test]
    fn missing_model_is_reported() {
        let config = TranscriberConfig {
            model: "nope".to_string(),
            language: "auto".to_string(),
            model_dir: PathBuf::from("/definitely/not/here"),
        };
        let err = Transcriber::new(config).err().expect("model load should fail");
        match err {
            AsrError::ModelNotFound(path) => assert!(path.ends_with("ggml-nope.bin")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
