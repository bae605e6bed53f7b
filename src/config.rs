use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::detect::postprocess::{
    DecodeParams, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IOU_THRESHOLD, DEFAULT_MAX_DETECTIONS,
};
use crate::sampling::DEFAULT_FALLBACK_STRIDE;

const DEFAULT_MODEL_PATH: &str = "yolov8n.onnx";
const DEFAULT_INPUT_SIZE: u32 = 640;
const MAX_INPUT_SIZE: u32 = 4096;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ProcessorConfigFile {
    model: Option<ModelConfigFile>,
    video: Option<VideoConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ModelConfigFile {
    path: Option<PathBuf>,
    classes_path: Option<PathBuf>,
    input_size: Option<u32>,
    confidence_threshold: Option<f32>,
    iou_threshold: Option<f32>,
    max_detections: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct VideoConfigFile {
    fallback_stride: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub detector: DetectorSettings,
    /// Frame stride used when a video reports no usable frame rate.
    pub fallback_stride: u64,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub model_path: PathBuf,
    pub classes_path: Option<PathBuf>,
    pub input_size: u32,
    pub decode: DecodeParams,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            classes_path: None,
            input_size: DEFAULT_INPUT_SIZE,
            decode: DecodeParams::default(),
        }
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            detector: DetectorSettings::default(),
            fallback_stride: DEFAULT_FALLBACK_STRIDE,
        }
    }
}

impl ProcessorConfig {
    /// Defaults, then the file named by `VISION_CONFIG`, then `VISION_*`
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("VISION_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ProcessorConfigFile) -> Self {
        let model = file.model.unwrap_or_default();
        let detector = DetectorSettings {
            model_path: model
                .path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            classes_path: model.classes_path,
            input_size: model.input_size.unwrap_or(DEFAULT_INPUT_SIZE),
            decode: DecodeParams {
                confidence_threshold: model
                    .confidence_threshold
                    .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
                iou_threshold: model.iou_threshold.unwrap_or(DEFAULT_IOU_THRESHOLD),
                max_detections: model.max_detections.unwrap_or(DEFAULT_MAX_DETECTIONS),
            },
        };
        let fallback_stride = file
            .video
            .and_then(|video| video.fallback_stride)
            .unwrap_or(DEFAULT_FALLBACK_STRIDE);
        Self {
            detector,
            fallback_stride,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(path) = non_empty_env("VISION_MODEL_PATH") {
            self.detector.model_path = PathBuf::from(path);
        }
        if let Some(path) = non_empty_env("VISION_CLASSES_PATH") {
            self.detector.classes_path = Some(PathBuf::from(path));
        }
        if let Some(size) = parse_env::<u32>("VISION_INPUT_SIZE", "an integer pixel size")? {
            self.detector.input_size = size;
        }
        if let Some(conf) = parse_env::<f32>("VISION_CONF_THRESHOLD", "a number in 0..=1")? {
            self.detector.decode.confidence_threshold = conf;
        }
        if let Some(iou) = parse_env::<f32>("VISION_IOU_THRESHOLD", "a number in 0..=1")? {
            self.detector.decode.iou_threshold = iou;
        }
        if let Some(max) = parse_env::<usize>("VISION_MAX_DETECTIONS", "a positive integer")? {
            self.detector.decode.max_detections = max;
        }
        if let Some(stride) = parse_env::<u64>("VISION_FALLBACK_STRIDE", "a positive integer")? {
            self.fallback_stride = stride;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let detector = &self.detector;
        if detector.input_size == 0 || detector.input_size % 32 != 0 {
            return Err(anyhow!(
                "model input size must be a positive multiple of 32 (got {})",
                detector.input_size
            ));
        }
        if detector.input_size > MAX_INPUT_SIZE {
            return Err(anyhow!(
                "model input size must be at most {} (got {})",
                MAX_INPUT_SIZE,
                detector.input_size
            ));
        }
        validate_unit("confidence threshold", detector.decode.confidence_threshold)?;
        validate_unit("IoU threshold", detector.decode.iou_threshold)?;
        if detector.decode.max_detections == 0 {
            return Err(anyhow!("max detections must be greater than zero"));
        }
        if self.fallback_stride == 0 {
            return Err(anyhow!("fallback frame stride must be greater than zero"));
        }
        Ok(())
    }
}

fn validate_unit(name: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(anyhow!("{} must be within 0..=1 (got {})", name, value))
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, expected: &str) -> Result<Option<T>> {
    match non_empty_env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} must be {}", key, expected)),
        None => Ok(None),
    }
}

fn read_config_file(path: &Path) -> Result<ProcessorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
