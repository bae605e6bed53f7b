//! Frame sampling for video detection.
//!
//! Videos are sampled at roughly one frame per second: the stride is the
//! integer part of the frame rate. When the container reports no usable rate
//! a fixed fallback stride is used instead.

/// Stride used when the frame rate is unknown.
pub const DEFAULT_FALLBACK_STRIDE: u64 = 30;

/// Accept only finite, positive frame rates.
pub fn normalize_fps(raw: f64) -> Option<f64> {
    (raw.is_finite() && raw > 0.0).then_some(raw)
}

/// Frame interval between model runs.
pub fn sampling_stride(fps: Option<f64>, fallback: u64) -> u64 {
    match fps.and_then(normalize_fps) {
        Some(fps) => (fps.floor() as u64).max(1),
        None => fallback.max(1),
    }
}

pub fn is_sampled(frame_index: u64, stride: u64) -> bool {
    frame_index % stride.max(1) == 0
}

/// Seconds from stream start, if the frame rate is known.
pub fn frame_timestamp(frame_index: u64, fps: Option<f64>) -> Option<f64> {
    fps.and_then(normalize_fps)
        .map(|fps| frame_index as f64 / fps)
}
