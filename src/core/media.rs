//! Media metadata for video and audio items.
//!
//! Decoding is not done here. A [`MediaInfoLoader`] is handed to the model when
//! a clip is attached to a file; [`FfprobeLoader`] is the stock implementation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;

/// Fallback frame rate when a stream does not report one.
const FALLBACK_VIDEO_FPS: f64 = 25.0;

/// Metadata of a video file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Path as given by the user
    pub path: String,
    /// Frame size as `[width, height]`
    pub size: [u32; 2],
    /// Native frame rate of the stream
    pub fps: f64,
    /// Duration in milliseconds
    pub duration: f64,
    /// Frame count at the native frame rate
    pub frame_count: i64,
}

impl VideoInfo {
    /// Multi-line description used for tooltips.
    pub fn info_string(&self) -> String {
        format!(
            "Path: {}\nSize: {}x{}\nFPS: {}\nDuration: {:.2}ms\nFrame Count: {}",
            display_path(&self.path),
            self.size[0],
            self.size[1],
            self.fps,
            self.duration,
            self.frame_count
        )
    }
}

/// Metadata of an audio file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioInfo {
    /// Path as given by the user
    pub path: String,
    /// Duration in milliseconds
    pub duration: f64,
    /// Frame count at the timeline frame rate used when probing
    pub frame_count: i64,
}

impl AudioInfo {
    /// Multi-line description used for tooltips.
    pub fn info_string(&self) -> String {
        format!(
            "Path: {}\nDuration: {:.2}ms\nFrame Count: {}",
            display_path(&self.path),
            self.duration,
            self.frame_count
        )
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "N/A"
    } else {
        path
    }
}

/// Number of timeline frames covered by `duration_ms` at `fps`.
pub fn frames_for_millis(duration_ms: f64, fps: f64) -> i64 {
    (duration_ms * fps.max(0.0) / 1000.0).round() as i64
}

/// Source of media metadata for video/audio items.
pub trait MediaInfoLoader {
    /// Probe a video file. `None` when the file has no usable video stream.
    fn load_video(&self, path: &Path) -> Option<VideoInfo>;

    /// Probe an audio file, counting frames at the timeline's `fps`.
    fn load_audio(&self, path: &Path, fps: f64) -> Option<AudioInfo>;
}

/// Probes media by running `ffprobe` and reading its JSON report.
#[derive(Debug, Clone)]
pub struct FfprobeLoader {
    program: String,
}

impl Default for FfprobeLoader {
    fn default() -> Self {
        Self {
            program: "ffprobe".to_string(),
        }
    }
}

impl FfprobeLoader {
    /// Use a specific `ffprobe` executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn probe(&self, path: &Path) -> Option<String> {
        let output = Command::new(&self.program)
            .arg("-v")
            .arg("error")
            .arg("-print_format")
            .arg("json")
            .arg("-show_format")
            .arg("-show_streams")
            .arg(path)
            .output()
            .map_err(|err| {
                tracing::error!(path = %path.display(), %err, "failed to run ffprobe");
            })
            .ok()?;

        if !output.status.success() {
            tracing::error!(path = %path.display(), "failed to open media file");
            return None;
        }

        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl MediaInfoLoader for FfprobeLoader {
    fn load_video(&self, path: &Path) -> Option<VideoInfo> {
        let report = self.probe(path)?;
        parse_video_report(&report, &path.to_string_lossy())
    }

    fn load_audio(&self, path: &Path, fps: f64) -> Option<AudioInfo> {
        let report = self.probe(path)?;
        parse_audio_report(&report, &path.to_string_lossy(), fps)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProbeReport {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    codec_type: String,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    r_frame_rate: Option<String>,
    #[serde(default)]
    duration: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    duration: Option<String>,
}

impl ProbeReport {
    fn stream(&self, codec_type: &str) -> Option<&ProbeStream> {
        self.streams
            .iter()
            .find(|stream| stream.codec_type == codec_type)
    }

    /// Duration in milliseconds, container first, then the stream.
    fn duration_ms(&self, stream: &ProbeStream) -> Option<f64> {
        let container = self
            .format
            .as_ref()
            .and_then(|format| format.duration.as_deref())
            .and_then(parse_seconds);
        container
            .or_else(|| stream.duration.as_deref().and_then(parse_seconds))
            .map(|seconds| seconds * 1000.0)
    }
}

fn parse_seconds(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|seconds| *seconds >= 0.0)
}

fn parse_frame_rate(value: &str) -> Option<f64> {
    let (num, den) = value.split_once('/')?;
    let num = num.trim().parse::<f64>().ok()?;
    let den = den.trim().parse::<f64>().ok()?;
    if den == 0.0 {
        return None;
    }
    Some(num / den)
}

fn parse_video_report(report: &str, path: &str) -> Option<VideoInfo> {
    let report: ProbeReport = serde_json::from_str(report)
        .map_err(|err| tracing::error!(path, %err, "unreadable ffprobe report"))
        .ok()?;
    let Some(stream) = report.stream("video") else {
        tracing::error!(path, "no video stream found in media file");
        return None;
    };

    let fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .filter(|fps| *fps > 0.0)
        .unwrap_or(FALLBACK_VIDEO_FPS);
    let duration = report.duration_ms(stream)?;

    Some(VideoInfo {
        path: path.to_string(),
        size: [stream.width.unwrap_or(0), stream.height.unwrap_or(0)],
        fps,
        duration,
        frame_count: (duration * fps / 1000.0) as i64,
    })
}

fn parse_audio_report(report: &str, path: &str, fps: f64) -> Option<AudioInfo> {
    let report: ProbeReport = serde_json::from_str(report)
        .map_err(|err| tracing::error!(path, %err, "unreadable ffprobe report"))
        .ok()?;
    let Some(stream) = report.stream("audio") else {
        tracing::error!(path, "no audio stream found in media file");
        return None;
    };
    let duration = report.duration_ms(stream)?;

    Some(AudioInfo {
        path: path.to_string(),
        duration,
        frame_count: (duration * fps / 1000.0) as i64,
    })
}
