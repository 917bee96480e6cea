//! Typed FFmpeg filter-graph AST.
//!
//! Filter graphs are composed as values and serialized in one place, so
//! drawtext escaping and label bookkeeping cannot drift between call
//! sites. The serializer is golden-tested against the exact strings the
//! renderer hands to ffmpeg.

use std::fmt::Write as _;

/// Horizontal placement of drawn text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextX {
    /// Centered: `(w-text_w)/2`
    Centered,
    /// Fixed pixel offset from the left edge
    Px(u32),
}

/// Drop shadow behind drawn text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextShadow {
    /// Shadow color, may carry alpha as `black@0.5`
    pub color: String,
    pub x: i32,
    pub y: i32,
}

/// One `drawtext` overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawText {
    /// Text to draw; escaped centrally at serialization time
    pub text: String,
    /// Bold TrueType font file
    pub font_file: Option<String>,
    pub font_size: u32,
    /// Font color, may carry alpha as `white@0.6`
    pub font_color: String,
    /// Border width in pixels; 0 draws no border
    pub border_width: u32,
    pub border_color: String,
    pub x: TextX,
    /// Baseline y in pixels
    pub y: i64,
    pub shadow: Option<TextShadow>,
    /// Visibility window relative to the clip start, seconds
    pub enable: Option<(f64, f64)>,
}

impl DrawText {
    /// Minimal overlay with the given text; callers fill in style.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_file: None,
            font_size: 48,
            font_color: "white".to_string(),
            border_width: 0,
            border_color: "black".to_string(),
            x: TextX::Centered,
            y: 0,
            shadow: None,
            enable: None,
        }
    }
}

/// One node in a filter chain.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    /// `scale=W:H[:force_original_aspect_ratio=increase]`
    Scale {
        width: u32,
        height: u32,
        fill_then_crop: bool,
    },
    /// `crop=W:H` (centered)
    Crop { width: u32, height: u32 },
    /// Subtle centered zoom ramp, `min(zoom+STEP,MAX)`
    ZoomPan {
        step: f64,
        max_zoom: f64,
        out_width: u32,
        out_height: u32,
    },
    /// Text overlay
    DrawText(DrawText),
    /// EBU R128 loudness normalization
    LoudNorm {
        integrated_lufs: f64,
        true_peak_db: f64,
        lra: f64,
    },
    /// `aformat=sample_rates=RATE`
    AFormat { sample_rate: u32 },
}

impl FilterNode {
    fn serialize_into(&self, out: &mut String) {
        match self {
            FilterNode::Scale {
                width,
                height,
                fill_then_crop,
            } => {
                write!(out, "scale={width}:{height}").unwrap();
                if *fill_then_crop {
                    out.push_str(":force_original_aspect_ratio=increase");
                }
            }
            FilterNode::Crop { width, height } => {
                write!(out, "crop={width}:{height}").unwrap();
            }
            FilterNode::ZoomPan {
                step,
                max_zoom,
                out_width,
                out_height,
            } => {
                write!(
                    out,
                    "zoompan=z='min(zoom+{step},{max_zoom})':d=1:\
                     x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':s={out_width}x{out_height}"
                )
                .unwrap();
            }
            FilterNode::DrawText(dt) => serialize_drawtext(dt, out),
            FilterNode::LoudNorm {
                integrated_lufs,
                true_peak_db,
                lra,
            } => {
                write!(
                    out,
                    "loudnorm=I={integrated_lufs}:TP={true_peak_db}:LRA={lra}"
                )
                .unwrap();
            }
            FilterNode::AFormat { sample_rate } => {
                write!(out, "aformat=sample_rates={sample_rate}").unwrap();
            }
        }
    }
}

fn serialize_drawtext(dt: &DrawText, out: &mut String) {
    write!(out, "drawtext=text='{}'", escape_text(&dt.text)).unwrap();
    if let Some(font) = &dt.font_file {
        write!(out, ":fontfile={font}").unwrap();
    }
    write!(out, ":fontsize={}:fontcolor={}", dt.font_size, dt.font_color).unwrap();
    if dt.border_width > 0 {
        write!(out, ":borderw={}:bordercolor={}", dt.border_width, dt.border_color).unwrap();
    }
    match dt.x {
        TextX::Centered => out.push_str(":x=(w-text_w)/2"),
        TextX::Px(px) => write!(out, ":x={px}").unwrap(),
    }
    write!(out, ":y={}", dt.y).unwrap();
    if let Some(shadow) = &dt.shadow {
        write!(
            out,
            ":shadowcolor={}:shadowx={}:shadowy={}",
            shadow.color, shadow.x, shadow.y
        )
        .unwrap();
    }
    if let Some((t_on, t_off)) = dt.enable {
        write!(out, ":enable='between(t,{t_on},{t_off})'").unwrap();
    }
}

/// Escape text for ffmpeg's filter expression grammar.
///
/// `'` terminates the quoted literal and `:` separates options, so both
/// must be escaped inside drawtext values.
pub fn escape_text(text: &str) -> String {
    text.replace('\'', "\\'").replace(':', "\\:")
}

/// A linear chain of filter nodes with optional pad labels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterChain {
    pub input_label: Option<String>,
    pub nodes: Vec<FilterNode>,
    pub output_label: Option<String>,
}

impl FilterChain {
    /// Start a chain reading from the given input pad.
    pub fn from_input(label: impl Into<String>) -> Self {
        Self {
            input_label: Some(label.into()),
            nodes: Vec::new(),
            output_label: None,
        }
    }

    /// Append a node.
    pub fn node(mut self, node: FilterNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Append several nodes.
    pub fn nodes(mut self, nodes: impl IntoIterator<Item = FilterNode>) -> Self {
        self.nodes.extend(nodes);
        self
    }

    /// Terminate the chain into the given output pad.
    pub fn into_output(mut self, label: impl Into<String>) -> Self {
        self.output_label = Some(label.into());
        self
    }

    fn serialize_into(&self, out: &mut String) {
        if let Some(label) = &self.input_label {
            write!(out, "[{label}]").unwrap();
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            node.serialize_into(out);
        }
        if let Some(label) = &self.output_label {
            write!(out, "[{label}]").unwrap();
        }
    }
}

/// A full filter graph: chains joined by `;`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterGraph {
    pub chains: Vec<FilterChain>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chain(mut self, chain: FilterChain) -> Self {
        self.chains.push(chain);
        self
    }

    /// Serialize the graph for `-filter_complex`.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (i, chain) in self.chains.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            chain.serialize_into(&mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_handles_quote_and_colon() {
        assert_eq!(escape_text("don't stop"), "don\\'t stop");
        assert_eq!(escape_text("ratio 16:9"), "ratio 16\\:9");
        assert_eq!(escape_text("plain"), "plain");
    }

    #[test]
    fn golden_scale_crop_chain() {
        let graph = FilterGraph::new().chain(
            FilterChain::from_input("0:v")
                .node(FilterNode::Scale {
                    width: 1080,
                    height: 1920,
                    fill_then_crop: true,
                })
                .node(FilterNode::Crop {
                    width: 1080,
                    height: 1920,
                })
                .into_output("v"),
        );
        assert_eq!(
            graph.serialize(),
            "[0:v]scale=1080:1920:force_original_aspect_ratio=increase,crop=1080:1920[v]"
        );
    }

    #[test]
    fn golden_zoompan() {
        let mut out = String::new();
        FilterNode::ZoomPan {
            step: 0.0005,
            max_zoom: 1.05,
            out_width: 1080,
            out_height: 1920,
        }
        .serialize_into(&mut out);
        assert_eq!(
            out,
            "zoompan=z='min(zoom+0.0005,1.05)':d=1:x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':s=1080x1920"
        );
    }

    #[test]
    fn golden_watermark_drawtext() {
        let dt = DrawText {
            text: "@clipforge".to_string(),
            font_file: None,
            font_size: 24,
            font_color: "white@0.6".to_string(),
            border_width: 0,
            border_color: "black".to_string(),
            x: TextX::Px(20),
            y: 20,
            shadow: Some(TextShadow {
                color: "black@0.5".to_string(),
                x: 2,
                y: 2,
            }),
            enable: None,
        };
        let mut out = String::new();
        serialize_drawtext(&dt, &mut out);
        assert_eq!(
            out,
            "drawtext=text='@clipforge':fontsize=24:fontcolor=white@0.6:x=20:y=20:shadowcolor=black@0.5:shadowx=2:shadowy=2"
        );
    }

    #[test]
    fn golden_caption_drawtext_with_enable() {
        let dt = DrawText {
            text: "wait".to_string(),
            font_file: Some("/fonts/Bold.ttf".to_string()),
            font_size: 48,
            font_color: "white".to_string(),
            border_width: 3,
            border_color: "black".to_string(),
            x: TextX::Centered,
            y: 1620,
            shadow: Some(TextShadow {
                color: "black@0.5".to_string(),
                x: 2,
                y: 2,
            }),
            enable: Some((0.2, 0.5)),
        };
        let mut out = String::new();
        serialize_drawtext(&dt, &mut out);
        assert_eq!(
            out,
            "drawtext=text='wait':fontfile=/fonts/Bold.ttf:fontsize=48:fontcolor=white:borderw=3:bordercolor=black:x=(w-text_w)/2:y=1620:shadowcolor=black@0.5:shadowx=2:shadowy=2:enable='between(t,0.2,0.5)'"
        );
    }

    #[test]
    fn golden_audio_chain() {
        let graph = FilterGraph::new().chain(
            FilterChain::from_input("0:a")
                .node(FilterNode::LoudNorm {
                    integrated_lufs: -14.0,
                    true_peak_db: -1.0,
                    lra: 11.0,
                })
                .node(FilterNode::AFormat { sample_rate: 48000 })
                .into_output("a"),
        );
        assert_eq!(
            graph.serialize(),
            "[0:a]loudnorm=I=-14:TP=-1:LRA=11,aformat=sample_rates=48000[a]"
        );
    }

    #[test]
    fn graph_joins_chains_with_semicolon() {
        let graph = FilterGraph::new()
            .chain(
                FilterChain::from_input("0:v")
                    .node(FilterNode::Crop {
                        width: 100,
                        height: 100,
                    })
                    .into_output("v"),
            )
            .chain(
                FilterChain::from_input("0:a")
                    .node(FilterNode::AFormat { sample_rate: 48000 })
                    .into_output("a"),
            );
        assert_eq!(
            graph.serialize(),
            "[0:v]crop=100:100[v];[0:a]aformat=sample_rates=48000[a]"
        );
    }

    #[test]
    fn escaped_text_survives_serialization() {
        let mut out = String::new();
        serialize_drawtext(&DrawText::new("it's 3:00"), &mut out);
        assert!(out.contains("text='it\\'s 3\\:00'"));
    }
}
