//! Final clip transcoding.

use std::path::PathBuf;
use std::time::Duration;

use clipforge_models::EncodingConfig;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filter::FilterGraph;

/// A fully composed transcode invocation.
///
/// The filter graph must terminate in `[v]` and `[a]` pads; the encoder
/// maps exactly those.
#[derive(Debug, Clone)]
pub struct TranscodeSpec {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Clip start within the source, seconds
    pub start_s: f64,
    /// Clip length, seconds
    pub duration_s: f64,
    pub filter_graph: FilterGraph,
    pub encoding: EncodingConfig,
}

/// Run the transcode and return the output path.
pub async fn transcode(spec: &TranscodeSpec, timeout: Option<Duration>) -> MediaResult<PathBuf> {
    if !spec.input.exists() {
        return Err(MediaError::FileNotFound(spec.input.clone()));
    }

    let enc = &spec.encoding;
    let cmd = FfmpegCommand::new(&spec.input, &spec.output)
        .seek(spec.start_s)
        .duration(spec.duration_s)
        .filter_complex(spec.filter_graph.serialize())
        .output_args(["-map", "[v]", "-map", "[a]"])
        .output_args([
            "-c:v",
            &enc.codec,
            "-preset",
            &enc.preset,
            "-crf",
            &enc.crf.to_string(),
            "-profile:v",
            &enc.profile,
            "-pix_fmt",
            &enc.pix_fmt,
            "-movflags",
            &enc.movflags,
            "-c:a",
            &enc.audio_codec,
            "-b:a",
            &enc.audio_bitrate,
        ]);

    let runner = match timeout {
        Some(t) => FfmpegRunner::new().with_timeout(t),
        None => FfmpegRunner::new(),
    };
    runner.run(&cmd).await?;

    Ok(spec.output.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterChain, FilterNode};

    #[test]
    fn spec_builds_expected_args() {
        let spec = TranscodeSpec {
            input: PathBuf::from("in.mp4"),
            output: PathBuf::from("out.mp4"),
            start_s: 5.0,
            duration_s: 10.0,
            filter_graph: FilterGraph::new().chain(
                FilterChain::from_input("0:v")
                    .node(FilterNode::Crop {
                        width: 1080,
                        height: 1920,
                    })
                    .into_output("v"),
            ),
            encoding: EncodingConfig::default(),
        };

        let enc = &spec.encoding;
        let cmd = FfmpegCommand::new(&spec.input, &spec.output)
            .seek(spec.start_s)
            .duration(spec.duration_s)
            .filter_complex(spec.filter_graph.serialize())
            .output_args(["-map", "[v]", "-map", "[a]"])
            .output_args(["-c:v", &enc.codec]);
        let args = cmd.build_args();

        assert!(args.contains(&"-filter_complex".to_string()));
        assert!(args.contains(&"[0:v]crop=1080:1920[v]".to_string()));
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"5.000".to_string()));
        assert!(args.contains(&"10.000".to_string()));
    }
}
