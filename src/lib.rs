//! Video dimension probing and pretrained object detection.
//!
//! The crate backs two standalone command-line tools:
//!
//! - `dimension-probe <video>` prints a video's frame size as `width,height`.
//! - `detection-processor <file>` runs a YOLO-family ONNX model over an image
//!   or over sampled video frames and prints a JSON result envelope.
//!
//! # Module Structure
//!
//! - `frame`: decoded RGB24 frames
//! - `ingest`: image decoding and video frame sources (FFmpeg, synthetic)
//! - `detect`: detector backends and YOLO output decoding
//! - `sampling`: video frame stride and timestamps
//! - `processor`: image/video pipeline producing a `ResultEnvelope`
//! - `probe`: video dimension lookup
//! - `report`, `media`: output schema and file classification
//! - `config`: model and sampling settings from file and environment

pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod media;
pub mod probe;
pub mod processor;
pub mod report;
pub mod sampling;

pub use config::{DetectorSettings, ProcessorConfig};
pub use detect::{
    load_backend, BoundingBox, ClassNames, DecodeParams, Detection, DetectorBackend, StubBackend,
};
#[cfg(feature = "backend-tract")]
pub use detect::TractBackend;
pub use frame::Frame;
pub use ingest::{load_image, SyntheticConfig, VideoProperties, VideoSource};
pub use media::{classify, FileType};
pub use probe::{probe_dimensions, Dimensions};
pub use processor::DetectionProcessor;
pub use report::{DetectionRecord, ResultEnvelope, Status, UsageError};
