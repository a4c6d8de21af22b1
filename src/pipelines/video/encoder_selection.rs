// SPDX-License-Identifier: MPL-2.0

//! Encoder selection for the session recorder
//!
//! Maps a recording MIME type (`video/webm;codecs=vp9`, `video/mp4`, ...)
//! onto the GStreamer elements that produce it. Hardware encoders are tried
//! before software ones.

use gstreamer as gst;
use tracing::{debug, info};

/// Video codecs the recorder can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    VP9,
    VP8,
    H264,
}

/// Container formats the recorder can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    WebM,
    MP4,
}

impl ContainerFormat {
    /// Muxer element name
    pub fn muxer(&self) -> &'static str {
        match self {
            ContainerFormat::MP4 => "mp4mux",
            ContainerFormat::WebM => "webmmux",
        }
    }

    /// Audio encoders accepted by the container, in priority order
    pub fn audio_encoders(&self) -> &'static [&'static str] {
        match self {
            ContainerFormat::WebM => &["opusenc", "vorbisenc"],
            ContainerFormat::MP4 => &["avenc_aac", "faac", "voaacenc"],
        }
    }
}

/// Encoder candidates for a codec: (element, parser), hardware first
fn video_encoders(codec: VideoCodec) -> &'static [(&'static str, Option<&'static str>)] {
    match codec {
        VideoCodec::VP9 => &[("vavp9enc", None), ("vp9enc", None)],
        VideoCodec::VP8 => &[("vavp8enc", None), ("vp8enc", None)],
        VideoCodec::H264 => &[
            ("vah264enc", Some("h264parse")),
            ("x264enc", Some("h264parse")),
            ("openh264enc", Some("h264parse")),
        ],
    }
}

/// Split a MIME type into container and requested codecs
///
/// Returns `None` for anything that is not a WebM or MP4 video type.
pub fn parse_mime(mime: &str) -> Option<(ContainerFormat, Vec<VideoCodec>)> {
    let mut parts = mime.split(';').map(str::trim);
    let container = match parts.next()?.to_ascii_lowercase().as_str() {
        "video/webm" => ContainerFormat::WebM,
        "video/mp4" => ContainerFormat::MP4,
        _ => return None,
    };

    let requested: Option<Vec<VideoCodec>> = parts
        .find_map(|param| param.strip_prefix("codecs="))
        .map(|codecs| {
            codecs
                .trim_matches('"')
                .split(',')
                .filter_map(|c| match c.trim().to_ascii_lowercase().as_str() {
                    "vp9" | "vp09" => Some(VideoCodec::VP9),
                    "vp8" => Some(VideoCodec::VP8),
                    c if c.starts_with("avc1") || c == "h264" => Some(VideoCodec::H264),
                    _ => None,
                })
                .collect()
        });

    let codecs = match requested {
        Some(codecs) if codecs.is_empty() => return None,
        Some(codecs) => codecs,
        None => match container {
            ContainerFormat::WebM => vec![VideoCodec::VP8, VideoCodec::VP9],
            ContainerFormat::MP4 => vec![VideoCodec::H264],
        },
    };

    let fits_container = codecs.iter().all(|codec| match container {
        ContainerFormat::WebM => matches!(codec, VideoCodec::VP8 | VideoCodec::VP9),
        ContainerFormat::MP4 => matches!(codec, VideoCodec::H264),
    });
    fits_container.then_some((container, codecs))
}

/// Elements chosen to record one MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderChoice {
    pub codec: VideoCodec,
    pub container: ContainerFormat,
    pub video_encoder: &'static str,
    pub parser: Option<&'static str>,
    /// First available audio encoder for the container
    pub audio_encoder: Option<&'static str>,
}

impl EncoderChoice {
    pub fn muxer(&self) -> &'static str {
        self.container.muxer()
    }
}

/// Check if a GStreamer element is available
pub fn is_element_available(element_name: &str) -> bool {
    gst::init().ok();
    gst::ElementFactory::make(element_name).build().is_ok()
}

/// Pick encoder elements for `mime` using `available` to probe element names
pub fn select_with(mime: &str, available: impl Fn(&str) -> bool) -> Option<EncoderChoice> {
    let (container, codecs) = parse_mime(mime)?;
    if !available(container.muxer()) {
        debug!(mime, muxer = container.muxer(), "Muxer not available");
        return None;
    }

    for codec in codecs {
        for &(encoder, parser) in video_encoders(codec) {
            if !available(encoder) || parser.is_some_and(|p| !available(p)) {
                continue;
            }
            let audio_encoder = container
                .audio_encoders()
                .iter()
                .copied()
                .find(|&name| available(name));
            return Some(EncoderChoice {
                codec,
                container,
                video_encoder: encoder,
                parser,
                audio_encoder,
            });
        }
    }

    debug!(mime, "No encoder available");
    None
}

/// Pick encoder elements for `mime` from the installed GStreamer plugins
pub fn select_encoders(mime: &str) -> Option<EncoderChoice> {
    let choice = select_with(mime, is_element_available);
    if let Some(choice) = &choice {
        info!(
            mime,
            encoder = choice.video_encoder,
            muxer = choice.muxer(),
            audio = ?choice.audio_encoder,
            "Selected encoders"
        );
    }
    choice
}
