use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Stub backend for testing. Replays a fixed script of detections.
///
/// Each call returns the next entry of the script (cycling), so tests can
/// control exactly which frames produce which objects.
pub struct StubBackend {
    script: Vec<Vec<Detection>>,
    calls: usize,
}

impl StubBackend {
    /// Backend that never detects anything.
    pub fn new() -> Self {
        Self {
            script: Vec::new(),
            calls: 0,
        }
    }

    /// Return `detections` on every call.
    pub fn always(detections: Vec<Detection>) -> Self {
        Self::scripted(vec![detections])
    }

    /// Return `script[n % script.len()]` on the n-th call.
    pub fn scripted(script: Vec<Vec<Detection>>) -> Self {
        Self { script, calls: 0 }
    }

    /// Number of frames this backend has been asked to process.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
        let detections = if self.script.is_empty() {
            Vec::new()
        } else {
            self.script[self.calls % self.script.len()].clone()
        };
        self.calls += 1;
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::BoundingBox;

    fn person(confidence: f32) -> Detection {
        Detection {
            class_id: 0,
            class_name: "person".to_string(),
            confidence,
            bbox: BoundingBox::default(),
        }
    }

    #[test]
    fn stub_backend_cycles_script() {
        let frame = Frame::new(vec![0; 12], 2, 2).unwrap();
        let mut backend = StubBackend::scripted(vec![vec![person(0.9)], vec![]]);

        assert_eq!(backend.detect(&frame).unwrap().len(), 1);
        assert!(backend.detect(&frame).unwrap().is_empty());
        assert_eq!(backend.detect(&frame).unwrap()[0].confidence, 0.9);
        assert_eq!(backend.calls(), 3);

        let mut empty = StubBackend::new();
        assert!(empty.detect(&frame).unwrap().is_empty());
    }
}
