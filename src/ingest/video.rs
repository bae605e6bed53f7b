//! Video frame source.
//!
//! `VideoSource` reads decoded frames from a local video file in display
//! order. It is responsible for:
//! - Opening the container and selecting its best video stream
//! - Reporting stream properties (dimensions, frame rate, frame count)
//! - Decoding every frame to RGB24, flushing the decoder at end of stream
//!
//! The source MUST NOT fetch remote URLs; only local paths and the synthetic
//! `stub://` scheme are accepted.

use anyhow::{anyhow, Context, Result};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegVideoSource;
use crate::frame::Frame;

const STUB_SCHEME: &str = "stub://";

/// Stream properties reported by the container.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoProperties {
    pub width: u32,
    pub height: u32,
    /// Average frame rate, if the container reports a usable one.
    pub fps: Option<f64>,
    /// Declared frame count, if known. Not relied on for iteration.
    pub frame_count: Option<u64>,
}

/// Local video frame source.
pub struct VideoSource {
    path: String,
    backend: VideoBackend,
    frames_read: u64,
}

enum VideoBackend {
    Synthetic(SyntheticVideo),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegVideoSource),
}

impl VideoSource {
    pub fn open(path: &str) -> Result<Self> {
        if !is_local_file_path(path) {
            return Err(anyhow!(
                "video input only supports local paths (no URL schemes): {}",
                path
            ));
        }
        let backend = if let Some(spec) = path.strip_prefix(STUB_SCHEME) {
            VideoBackend::Synthetic(SyntheticVideo::new(SyntheticConfig::parse(spec)?))
        } else {
            #[cfg(feature = "ingest-file-ffmpeg")]
            {
                VideoBackend::Ffmpeg(
                    FfmpegVideoSource::open(path)
                        .with_context(|| format!("Could not open video: {}", path))?,
                )
            }
            #[cfg(not(feature = "ingest-file-ffmpeg"))]
            {
                return Err(anyhow!(
                    "video decoding library unavailable: rebuild with the ingest-file-ffmpeg feature to open {}",
                    path
                ));
            }
        };
        log::debug!("opened video source {}", path);
        Ok(Self {
            path: path.to_string(),
            backend,
            frames_read: 0,
        })
    }

    /// Source that generates frames in memory.
    pub fn synthetic(config: SyntheticConfig) -> Self {
        Self {
            path: format!("{}{}", STUB_SCHEME, config),
            backend: VideoBackend::Synthetic(SyntheticVideo::new(config)),
            frames_read: 0,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn properties(&self) -> VideoProperties {
        match &self.backend {
            VideoBackend::Synthetic(source) => source.properties(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            VideoBackend::Ffmpeg(source) => source.properties(),
        }
    }

    /// Decode the next frame. `None` marks the end of the stream.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        let frame = match &mut self.backend {
            VideoBackend::Synthetic(source) => source.next_frame()?,
            #[cfg(feature = "ingest-file-ffmpeg")]
            VideoBackend::Ffmpeg(source) => source.next_frame()?,
        };
        if frame.is_some() {
            self.frames_read += 1;
        }
        Ok(frame)
    }

    /// Frames decoded so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        log::debug!(
            "released video source {} after {} frames",
            self.path,
            self.frames_read
        );
    }
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

/// Parameters of a generated video.
///
/// Written as `stub://WIDTHxHEIGHT?fps=F&frames=N`; `fps=none` simulates a
/// container without a usable frame rate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyntheticConfig {
    pub width: u32,
    pub height: u32,
    pub fps: Option<f64>,
    pub frames: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: Some(30.0),
            frames: 90,
        }
    }
}

impl SyntheticConfig {
    pub fn parse(spec: &str) -> Result<Self> {
        let mut config = Self::default();
        let (dims, query) = match spec.split_once('?') {
            Some((dims, query)) => (dims, Some(query)),
            None => (spec, None),
        };

        if !dims.is_empty() {
            let (w, h) = dims
                .split_once('x')
                .ok_or_else(|| anyhow!("synthetic video size must look like WIDTHxHEIGHT"))?;
            config.width = w
                .parse()
                .with_context(|| format!("invalid synthetic width '{}'", w))?;
            config.height = h
                .parse()
                .with_context(|| format!("invalid synthetic height '{}'", h))?;
        }

        for pair in query.into_iter().flat_map(|q| q.split('&')) {
            match pair.split_once('=') {
                Some(("fps", "none")) => config.fps = None,
                Some(("fps", value)) => {
                    config.fps = Some(
                        value
                            .parse()
                            .with_context(|| format!("invalid synthetic fps '{}'", value))?,
                    )
                }
                Some(("frames", value)) => {
                    config.frames = value
                        .parse()
                        .with_context(|| format!("invalid synthetic frame count '{}'", value))?
                }
                _ => return Err(anyhow!("unknown synthetic video option '{}'", pair)),
            }
        }
        Ok(config)
    }
}

impl std::fmt::Display for SyntheticConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}?", self.width, self.height)?;
        match self.fps {
            Some(fps) => write!(f, "fps={}", fps)?,
            None => write!(f, "fps=none")?,
        }
        write!(f, "&frames={}", self.frames)
    }
}

struct SyntheticVideo {
    config: SyntheticConfig,
    frame_index: u64,
}

impl SyntheticVideo {
    fn new(config: SyntheticConfig) -> Self {
        Self {
            config,
            frame_index: 0,
        }
    }

    fn properties(&self) -> VideoProperties {
        VideoProperties {
            width: self.config.width,
            height: self.config.height,
            fps: self.config.fps,
            frame_count: Some(self.config.frames),
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.frame_index >= self.config.frames {
            return Ok(None);
        }
        let pixels = self.generate_pixels()?;
        self.frame_index += 1;
        Frame::new(pixels, self.config.width, self.config.height).map(Some)
    }

    fn generate_pixels(&self) -> Result<Vec<u8>> {
        let len = (self.config.width as usize)
            .checked_mul(self.config.height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("synthetic frame dimensions overflow"))?;
        Ok((0..len)
            .map(|i| ((i as u64 + self.frame_index) % 256) as u8)
            .collect())
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with(STUB_SCHEME) {
        return true;
    }
    !path.contains("://")
}
