//! Detection processor: one media file in, one result envelope out.

use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;

use crate::config::{DetectorSettings, ProcessorConfig};
use crate::detect::DetectorBackend;
use crate::frame::Frame;
use crate::ingest::{load_image, VideoSource};
use crate::media::{classify, FileType};
use crate::report::{DetectionRecord, ResultEnvelope};
use crate::sampling::{frame_timestamp, is_sampled, sampling_stride, DEFAULT_FALLBACK_STRIDE};

/// Runs a loaded backend over images and sampled video frames.
pub struct DetectionProcessor<B> {
    backend: B,
    fallback_stride: u64,
}

impl<B: DetectorBackend> DetectionProcessor<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            fallback_stride: DEFAULT_FALLBACK_STRIDE,
        }
    }

    /// Stride for videos without a usable frame rate.
    pub fn with_fallback_stride(mut self, stride: u64) -> Self {
        self.fallback_stride = stride.max(1);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Dispatch on an already classified file.
    pub fn process(&mut self, path: &Path, file_type: FileType) -> Result<Vec<DetectionRecord>> {
        match file_type {
            FileType::Image => self.process_image(path),
            FileType::Video => self.process_video_path(path),
            FileType::Unknown => Err(anyhow!(
                "Unsupported file type: {}",
                path.display()
            )),
        }
    }

    pub fn process_image(&mut self, path: &Path) -> Result<Vec<DetectionRecord>> {
        load_image(path)
            .and_then(|frame| self.detect_frame(&frame))
            .context("Error processing image")
    }

    pub fn process_video_path(&mut self, path: &Path) -> Result<Vec<DetectionRecord>> {
        path.to_str()
            .ok_or_else(|| anyhow!("video path is not valid UTF-8: {}", path.display()))
            .and_then(VideoSource::open)
            .and_then(|source| self.process_video(source))
            .context("Error processing video")
    }

    /// Sample `source` at about one frame per second and run the model on
    /// each sampled frame. The source is consumed and released on return,
    /// including when a read or the model fails part way.
    pub fn process_video(&mut self, mut source: VideoSource) -> Result<Vec<DetectionRecord>> {
        let props = source.properties();
        let stride = sampling_stride(props.fps, self.fallback_stride);
        if props.fps.is_none() {
            log::warn!(
                "{} reports no usable frame rate; sampling every {} frames without timestamps",
                source.path(),
                stride
            );
        }
        log::info!(
            "processing video {} ({}x{}, fps={:?}) with stride {}",
            source.path(),
            props.width,
            props.height,
            props.fps,
            stride
        );

        let mut records = Vec::new();
        let mut frame_index = 0u64;
        let mut sampled = 0u64;
        while let Some(frame) = source.next_frame()? {
            if is_sampled(frame_index, stride) {
                let timestamp = frame_timestamp(frame_index, props.fps);
                let detections = self
                    .backend
                    .detect(&frame)
                    .with_context(|| format!("detection failed on frame {}", frame_index))?;
                records.extend(detections.into_iter().map(|detection| {
                    DetectionRecord::from_detection(detection).at_frame(frame_index, timestamp)
                }));
                sampled += 1;
            }
            frame_index += 1;
        }

        log::info!(
            "sampled {} of {} frames, {} detections",
            sampled,
            frame_index,
            records.len()
        );
        Ok(records)
    }

    fn detect_frame(&mut self, frame: &Frame) -> Result<Vec<DetectionRecord>> {
        Ok(self
            .backend
            .detect(frame)?
            .into_iter()
            .map(DetectionRecord::from_detection)
            .collect())
    }
}

/// Process one path end to end. Never fails: every error, including a
/// backend that cannot be loaded, becomes a failure envelope.
pub fn run<B, F>(path: &Path, config: &ProcessorConfig, load_backend: F) -> ResultEnvelope
where
    B: DetectorBackend,
    F: FnOnce(&DetectorSettings) -> Result<B>,
{
    let file_name = file_name(path);
    match try_run(path, config, load_backend) {
        Ok((file_type, records)) => {
            log::info!(
                "{}: {} detections",
                path.display(),
                records.len()
            );
            ResultEnvelope::completed(file_name, file_type, records)
        }
        Err(err) => {
            log::error!("processing {} failed: {:#}", path.display(), err);
            ResultEnvelope::failed(file_name, &err)
        }
    }
}

fn try_run<B, F>(
    path: &Path,
    config: &ProcessorConfig,
    load_backend: F,
) -> Result<(FileType, Vec<DetectionRecord>)>
where
    B: DetectorBackend,
    F: FnOnce(&DetectorSettings) -> Result<B>,
{
    if !path.exists() {
        bail!("File not found: {}", path.display());
    }
    let file_type = classify(path)?;
    let backend = load_backend(&config.detector)?;
    let mut processor =
        DetectionProcessor::new(backend).with_fallback_stride(config.fallback_stride);
    let records = processor.process(path, file_type)?;
    Ok((file_type, records))
}

/// Final path component, as reported in the envelope.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
