//! Decoding of raw YOLO output tensors into detections.
//!
//! Backends hand over the first output tensor as a flat `f32` slice plus its
//! shape. Three layouts are understood:
//!
//! - `[1, 4 + C, N]`: raw YOLOv8/YOLO11 head, one column per anchor
//!   (`cx, cy, w, h, score_0 .. score_C`).
//! - `[1, N, 4 + C]`: the same head exported transposed.
//! - `[1, N, 6]`: end-to-end export with NMS already in the graph
//!   (`x1, y1, x2, y2, score, class`), as produced by YOLOv10.
//!
//! `C` is the length of the configured class list.
//!
//! Coordinates in all layouts are in model input pixels and are mapped back
//! to the source frame through [`InputScale`].

use anyhow::{bail, Result};

use crate::detect::classes::ClassNames;
use crate::detect::result::{BoundingBox, Detection};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.7;
pub const DEFAULT_MAX_DETECTIONS: usize = 300;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodeParams {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_detections: DEFAULT_MAX_DETECTIONS,
        }
    }
}

/// Mapping from the square model input back to the source frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputScale {
    scale_x: f32,
    scale_y: f32,
    frame_width: f32,
    frame_height: f32,
}

impl InputScale {
    /// The frame was stretched (not letterboxed) to `input_size` square.
    pub fn new(input_size: u32, frame_width: u32, frame_height: u32) -> Self {
        let input = input_size.max(1) as f32;
        Self {
            scale_x: frame_width as f32 / input,
            scale_y: frame_height as f32 / input,
            frame_width: frame_width as f32,
            frame_height: frame_height as f32,
        }
    }

    /// `None` when the model emitted a non-finite coordinate.
    fn map(&self, x1: f32, y1: f32, x2: f32, y2: f32) -> Option<Corners> {
        if ![x1, y1, x2, y2].iter().all(|v| v.is_finite()) {
            return None;
        }
        Some(Corners {
            x1: (x1 * self.scale_x).clamp(0.0, self.frame_width),
            y1: (y1 * self.scale_y).clamp(0.0, self.frame_height),
            x2: (x2 * self.scale_x).clamp(0.0, self.frame_width),
            y2: (y2 * self.scale_y).clamp(0.0, self.frame_height),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputLayout {
    ChannelsFirst { num_classes: usize, num_anchors: usize },
    AnchorsFirst { num_classes: usize, num_anchors: usize },
    EndToEnd { rows: usize },
}

impl OutputLayout {
    /// Resolve the layout of an output tensor for a model with
    /// `num_classes` labels. The channel axis is the one of length `4 + C`.
    pub fn resolve(shape: &[usize], num_classes: usize) -> Result<Self> {
        let (a, b) = match shape {
            [1, a, b] | [a, b] => (*a, *b),
            _ => bail!("unsupported model output shape {:?}", shape),
        };
        let channels = 4 + num_classes;
        if b == 6 && channels != 6 {
            return Ok(OutputLayout::EndToEnd { rows: a });
        }
        if a == channels {
            return Ok(OutputLayout::ChannelsFirst {
                num_classes,
                num_anchors: b,
            });
        }
        if b == channels {
            return Ok(OutputLayout::AnchorsFirst {
                num_classes,
                num_anchors: a,
            });
        }
        bail!(
            "model output shape {:?} does not match {} class names",
            shape,
            num_classes
        )
    }

    fn value_count(&self) -> usize {
        match *self {
            OutputLayout::ChannelsFirst {
                num_classes,
                num_anchors,
            }
            | OutputLayout::AnchorsFirst {
                num_classes,
                num_anchors,
            } => (4 + num_classes) * num_anchors,
            OutputLayout::EndToEnd { rows } => rows * 6,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Corners {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl Corners {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Candidate {
    class_id: usize,
    score: f32,
    corners: Corners,
}

/// Decode one output tensor into detections in frame coordinates.
pub fn decode(
    output: &[f32],
    shape: &[usize],
    scale: &InputScale,
    params: &DecodeParams,
    classes: &ClassNames,
) -> Result<Vec<Detection>> {
    let layout = OutputLayout::resolve(shape, classes.len())?;
    let needed = layout.value_count();
    if output.len() < needed {
        bail!(
            "model output has {} values, layout {:?} needs {}",
            output.len(),
            layout,
            needed
        );
    }

    let kept = match layout {
        OutputLayout::ChannelsFirst {
            num_classes,
            num_anchors,
        } => {
            let candidates = anchor_candidates(num_anchors, num_classes, scale, params, |a, c| {
                output[c * num_anchors + a]
            });
            non_max_suppression(candidates, params.iou_threshold, params.max_detections)
        }
        OutputLayout::AnchorsFirst {
            num_classes,
            num_anchors,
        } => {
            let stride = 4 + num_classes;
            let candidates = anchor_candidates(num_anchors, num_classes, scale, params, |a, c| {
                output[a * stride + c]
            });
            non_max_suppression(candidates, params.iou_threshold, params.max_detections)
        }
        OutputLayout::EndToEnd { rows } => {
            let mut candidates = end_to_end_candidates(output, rows, scale, params);
            sort_by_score(&mut candidates);
            candidates.truncate(params.max_detections);
            candidates
        }
    };

    Ok(kept
        .into_iter()
        .map(|candidate| Detection {
            class_id: candidate.class_id,
            class_name: classes.name(candidate.class_id),
            confidence: candidate.score.clamp(0.0, 1.0),
            bbox: BoundingBox::from_corners(
                candidate.corners.x1,
                candidate.corners.y1,
                candidate.corners.x2,
                candidate.corners.y2,
            ),
        })
        .collect())
}

fn anchor_candidates<F>(
    num_anchors: usize,
    num_classes: usize,
    scale: &InputScale,
    params: &DecodeParams,
    value: F,
) -> Vec<Candidate>
where
    F: Fn(usize, usize) -> f32,
{
    let mut candidates = Vec::new();
    for anchor in 0..num_anchors {
        let Some((class_id, score)) = best_class((0..num_classes).map(|c| value(anchor, 4 + c)))
        else {
            continue;
        };
        if score < params.confidence_threshold {
            continue;
        }
        let cx = value(anchor, 0);
        let cy = value(anchor, 1);
        let half_w = value(anchor, 2) / 2.0;
        let half_h = value(anchor, 3) / 2.0;
        let Some(corners) = scale.map(cx - half_w, cy - half_h, cx + half_w, cy + half_h) else {
            continue;
        };
        candidates.push(Candidate {
            class_id,
            score,
            corners,
        });
    }
    candidates
}

fn end_to_end_candidates(
    output: &[f32],
    rows: usize,
    scale: &InputScale,
    params: &DecodeParams,
) -> Vec<Candidate> {
    output
        .chunks_exact(6)
        .take(rows)
        .filter(|row| row[4] >= params.confidence_threshold && row[5] >= 0.0)
        .filter_map(|row| {
            Some(Candidate {
                class_id: row[5].round() as usize,
                score: row[4],
                corners: scale.map(row[0], row[1], row[2], row[3])?,
            })
        })
        .collect()
}

fn best_class<I>(scores: I) -> Option<(usize, f32)>
where
    I: Iterator<Item = f32>,
{
    let mut best: Option<(usize, f32)> = None;
    for (id, score) in scores.enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, max_score)) if score <= max_score => {}
            _ => best = Some((id, score)),
        }
    }
    best
}

fn sort_by_score(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Greedy per-class NMS, highest score first.
fn non_max_suppression(
    mut candidates: Vec<Candidate>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Candidate> {
    sort_by_score(&mut candidates);
    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept.iter().any(|other| {
            other.class_id == candidate.class_id
                && iou(&other.corners, &candidate.corners) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

fn iou(a: &Corners, b: &Corners) -> f32 {
    let overlap = Corners {
        x1: a.x1.max(b.x1),
        y1: a.y1.max(b.y1),
        x2: a.x2.min(b.x2),
        y2: a.y2.min(b.y2),
    };
    let intersection = overlap.area();
    let union = a.area() + b.area() - intersection;
    if union <= 0.0 {
        0.0
    } else {
        intersection / union
    }
}
