pub mod classes;
pub mod model_catalog;
pub mod sam_engine;
pub mod yolo_seg_engine;

use anyhow::Result;
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use std::fs;
use std::path::Path;

pub(crate) const INTRA_THREADS: usize = 4;

pub(crate) fn build_session(path: &Path) -> Result<Session> {
    let mut builder = Session::builder()?.with_intra_threads(INTRA_THREADS)?;

    // CUDA is optional: registered when available, otherwise we stay on CPU.
    let cuda = CUDAExecutionProvider::default().build();
    if let Ok(builder_with_cuda) = builder.clone().with_execution_providers([cuda]) {
        builder = builder_with_cuda;
    }

    let model_bytes = fs::read(path)?;
    Ok(builder.commit_from_memory(&model_bytes)?)
}

/// Axis-aligned box `[x1, y1, x2, y2]` in pixels.
pub(crate) type BBox = [f32; 4];

pub(crate) fn iou(a: &BBox, b: &BBox) -> f32 {
    let ix = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let iy = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let inter = ix * iy;
    let area = |r: &BBox| (r[2] - r[0]).max(0.0) * (r[3] - r[1]).max(0.0);
    let union = area(a) + area(b) - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// Greedy non-maximum suppression. Returns kept indices by descending score.
/// Boxes only suppress each other when `group` gives them the same key.
pub(crate) fn nms<G: PartialEq>(
    boxes: &[BBox],
    scores: &[f32],
    group: impl Fn(usize) -> G,
    iou_threshold: f32,
    max_keep: usize,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut keep: Vec<usize> = Vec::new();
    for i in order {
        if keep.len() >= max_keep {
            break;
        }
        let suppressed = keep
            .iter()
            .any(|&k| group(k) == group(i) && iou(&boxes[k], &boxes[i]) > iou_threshold);
        if !suppressed {
            keep.push(i);
        }
    }
    keep
}

pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iou_of_identical_and_disjoint_boxes() {
        let a = [0.0, 0.0, 10.0, 10.0];
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
        assert_eq!(iou(&a, &[20.0, 20.0, 30.0, 30.0]), 0.0);
        assert!((iou(&a, &[5.0, 0.0, 15.0, 10.0]) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn nms_suppresses_only_within_a_group() {
        let boxes = [[0.0, 0.0, 10.0, 10.0], [1.0, 1.0, 10.0, 10.0], [0.0, 0.0, 10.0, 10.0]];
        let scores = [0.9, 0.8, 0.7];
        let classes = [0, 0, 1];
        let keep = nms(&boxes, &scores, |i| classes[i], 0.5, 10);
        assert_eq!(keep, vec![0, 2]);

        let keep = nms(&boxes, &scores, |_| (), 0.5, 10);
        assert_eq!(keep, vec![0]);
        assert_eq!(nms(&boxes, &scores, |i| i, 0.5, 2), vec![0, 1]);
    }
}
