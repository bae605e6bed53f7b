#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use tract_onnx::prelude::*;

use crate::config::DetectorSettings;
use crate::detect::backend::DetectorBackend;
use crate::detect::classes::ClassNames;
use crate::detect::postprocess::{decode, DecodeParams, InputScale};
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Tract-based backend for ONNX YOLO inference.
///
/// Loads a local model file once and runs it on RGB frames stretched to a
/// fixed square input. No network I/O; nothing is written to disk.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    input_size: u32,
    classes: ClassNames,
    params: DecodeParams,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.is_file() {
            return Err(anyhow!("model file not found: {}", model_path.display()));
        }
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        log::debug!(
            "loaded ONNX model {} ({}x{} input)",
            model_path.display(),
            input_size,
            input_size
        );

        Ok(Self {
            model,
            input_size,
            classes: ClassNames::coco(),
            params: DecodeParams::default(),
        })
    }

    pub fn from_settings(settings: &DetectorSettings) -> Result<Self> {
        let classes = match &settings.classes_path {
            Some(path) => ClassNames::from_file(path)?,
            None => ClassNames::coco(),
        };
        Ok(Self::new(&settings.model_path, settings.input_size)?
            .with_classes(classes)
            .with_params(settings.decode))
    }

    pub fn with_classes(mut self, classes: ClassNames) -> Self {
        self.classes = classes;
        self
    }

    /// Override the default thresholds.
    pub fn with_params(mut self, params: DecodeParams) -> Self {
        self.params = params;
        self
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        let size = self.input_size;
        let rgb = frame.to_rgb_image()?;
        let resized = if rgb.dimensions() == (size, size) {
            rgb
        } else {
            imageops::resize(&rgb, size, size, FilterType::Triangle)
        };

        let side = size as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, channel, y, x)| {
            resized.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0
        });

        Ok(input.into_tensor())
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let values = output
            .as_slice::<f32>()
            .context("model output tensor was not f32")?;
        let scale = InputScale::new(self.input_size, frame.width, frame.height);
        decode(values, output.shape(), &scale, &self.params, &self.classes)
    }

    fn warm_up(&mut self) -> Result<()> {
        let side = self.input_size;
        let len = (side as usize)
            .checked_mul(side as usize)
            .and_then(|pixels| pixels.checked_mul(3))
            .ok_or_else(|| anyhow!("model input size {} is too large", side))?;
        let blank = Frame::new(vec![0u8; len], side, side)?;
        self.detect(&blank).map(|_| ())
    }
}
