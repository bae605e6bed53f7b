//! JSON result envelope emitted by `detection-processor`.

use serde::{Deserialize, Serialize};

use crate::detect::{BoundingBox, Detection};
use crate::media::FileType;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Completed,
    Failed,
}

/// One detection, flattened for output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRecord {
    pub class_name: String,
    pub confidence: f32,
    pub bounding_box: BoundingBox,
    /// Decoded frame index (video only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<u64>,
    /// Seconds from stream start (video only, requires a known frame rate).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl DetectionRecord {
    pub fn from_detection(detection: Detection) -> Self {
        Self {
            class_name: detection.class_name,
            confidence: detection.confidence.clamp(0.0, 1.0),
            bounding_box: detection.bbox,
            frame: None,
            timestamp: None,
        }
    }

    pub fn at_frame(mut self, frame: u64, timestamp: Option<f64>) -> Self {
        self.frame = Some(frame);
        self.timestamp = timestamp;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    pub file_name: String,
    pub file_type: FileType,
    pub detections: Vec<DetectionRecord>,
    pub status: Status,
    pub total_detections: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ResultEnvelope {
    pub fn completed(
        file_name: impl Into<String>,
        file_type: FileType,
        detections: Vec<DetectionRecord>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            file_type,
            total_detections: detections.len(),
            detections,
            status: Status::Completed,
            error_message: None,
        }
    }

    /// Failure envelope. The message carries the whole context chain.
    pub fn failed(file_name: impl Into<String>, err: &anyhow::Error) -> Self {
        Self {
            file_name: file_name.into(),
            file_type: FileType::Unknown,
            detections: Vec::new(),
            status: Status::Failed,
            total_detections: 0,
            error_message: Some(format!("{:#}", err)),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_completed() {
            0
        } else {
            1
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Output for invocations that never reached a file (bad usage).
#[derive(Clone, Debug, Serialize)]
pub struct UsageError {
    pub error: String,
    pub status: Status,
}

impl UsageError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            status: Status::Failed,
        }
    }
}
