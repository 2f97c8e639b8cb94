use anyhow::{anyhow, bail, Result};
use image::{imageops::FilterType, RgbImage};
use ndarray::{s, Array1, Array2, ArrayView2, ArrayView3, ArrayViewD, Axis, Ix2, Ix3, IxDyn};
use ort::session::Session;
use ort::value::Tensor;
use std::borrow::Cow;
use std::path::Path;
use std::sync::Mutex;

use super::{build_session, nms, sigmoid, BBox};
use crate::application::ports::SegmentationModel;
use crate::domain::detection::{RawDetection, SegmentationOutput};
use crate::domain::model::SegParams;

/// YOLOv8-seg style model: one pass yields boxes, class scores and mask
/// coefficients (`output0`) plus a bank of mask prototypes (`output1`).
/// FastSAM shares this layout with a single class.
pub struct OnnxYoloSegEngine {
    session: Mutex<Session>,
    input_size: u32,
    params: SegParams,
    class_names: Vec<String>,
}

impl OnnxYoloSegEngine {
    pub fn load(path: &Path, input_size: u32, params: SegParams, class_names: Vec<String>) -> Result<Self> {
        let session = build_session(path)?;
        Ok(Self { session: Mutex::new(session), input_size, params, class_names })
    }
}

impl SegmentationModel for OnnxYoloSegEngine {
    fn input_size(&self) -> (u32, u32) {
        (self.input_size, self.input_size)
    }

    fn infer(&self, rgb: &RgbImage) -> Result<SegmentationOutput> {
        let imgsz = self.input_size;
        let rgb: Cow<RgbImage> = if rgb.dimensions() == (imgsz, imgsz) {
            Cow::Borrowed(rgb)
        } else {
            Cow::Owned(image::imageops::resize(rgb, imgsz, imgsz, FilterType::Triangle))
        };

        let side = imgsz as usize;
        let input_shape = vec![1, 3, imgsz as i64, imgsz as i64];
        let mut input = vec![0f32; 3 * side * side];
        for (x, y, pixel) in rgb.enumerate_pixels() {
            let at = y as usize * side + x as usize;
            for c in 0..3 {
                input[c * side * side + at] = pixel[c] as f32 / 255.0;
            }
        }
        let input_tensor = Tensor::from_array((input_shape, input))?;

        let mut session = self.session.lock().map_err(|_| anyhow!("session lock poisoned"))?;
        let outputs = session.run(ort::inputs![input_tensor])?;
        if outputs.len() < 2 {
            bail!("expected detection and prototype outputs, got {}", outputs.len());
        }

        let (pred_shape, pred_data) = outputs[0].try_extract_tensor::<f32>()?;
        let (proto_shape, proto_data) = outputs[1].try_extract_tensor::<f32>()?;
        let pred_dims: Vec<usize> = pred_shape.iter().map(|&d| d as usize).collect();
        let proto_dims: Vec<usize> = proto_shape.iter().map(|&d| d as usize).collect();

        let preds = ArrayViewD::from_shape(IxDyn(&pred_dims), pred_data)?;
        let protos = ArrayViewD::from_shape(IxDyn(&proto_dims), proto_data)?;
        let preds = preds.index_axis(Axis(0), 0).into_dimensionality::<Ix2>()?;
        let protos = protos.index_axis(Axis(0), 0).into_dimensionality::<Ix3>()?;

        decode(preds, protos, imgsz, &self.params, &self.class_names)
    }
}

struct Candidate {
    bbox: BBox,
    score: f32,
    class_id: usize,
    coeffs: Array1<f32>,
}

/// Turns raw head outputs into thresholded instance masks at `input_size`.
///
/// `preds` is `[4 + nc + nm, N]` (cx, cy, w, h, class scores, mask
/// coefficients); `protos` is `[nm, mh, mw]`.
pub(crate) fn decode(
    preds: ArrayView2<f32>,
    protos: ArrayView3<f32>,
    input_size: u32,
    params: &SegParams,
    class_names: &[String],
) -> Result<SegmentationOutput> {
    let nm = protos.shape()[0];
    let rows = preds.shape()[0];
    if rows <= 4 + nm {
        bail!("prediction head has {rows} rows, too few for {nm} mask coefficients");
    }
    let nc = rows - 4 - nm;

    let candidates: Vec<Candidate> = (0..preds.shape()[1])
        .filter_map(|i| {
            let (class_id, score) = preds
                .slice(s![4..4 + nc, i])
                .iter()
                .copied()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(&b.1))?;
            if score <= params.conf_threshold {
                return None;
            }
            let (cx, cy, w, h) = (preds[[0, i]], preds[[1, i]], preds[[2, i]], preds[[3, i]]);
            Some(Candidate {
                bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
                score,
                class_id,
                coeffs: preds.slice(s![4 + nc.., i]).to_owned(),
            })
        })
        .collect();

    let boxes: Vec<BBox> = candidates.iter().map(|c| c.bbox).collect();
    let scores: Vec<f32> = candidates.iter().map(|c| c.score).collect();
    let keep = nms(
        &boxes,
        &scores,
        |i| candidates[i].class_id,
        params.iou_threshold,
        params.max_detections,
    );

    let (mh, mw) = (protos.shape()[1], protos.shape()[2]);
    let bank = protos.to_shape((nm, mh * mw))?;
    let side = input_size as usize;

    let detections = keep
        .into_iter()
        .map(|i| -> Result<RawDetection> {
            let cand = &candidates[i];
            let logits = cand.coeffs.dot(&bank);
            let probs = Array2::from_shape_vec((mh, mw), logits.mapv(sigmoid).to_vec())?;
            let mut mask = upsample_bilinear(&probs, side, side);
            crop_and_threshold(&mut mask, &cand.bbox, params.mask_threshold);
            Ok(RawDetection { class_index: cand.class_id, mask })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SegmentationOutput {
        class_names: class_names.iter().cloned().enumerate().collect(),
        detections,
    })
}

/// Half-pixel-centred bilinear resize.
pub(crate) fn upsample_bilinear(src: &Array2<f32>, out_h: usize, out_w: usize) -> Array2<f32> {
    let (h, w) = src.dim();
    if h == 0 || w == 0 {
        return Array2::zeros((out_h, out_w));
    }
    let sy = h as f32 / out_h as f32;
    let sx = w as f32 / out_w as f32;
    let axis = |o: usize, scale: f32, len: usize| {
        let p = ((o as f32 + 0.5) * scale - 0.5).max(0.0);
        let lo = (p.floor() as usize).min(len - 1);
        let hi = (lo + 1).min(len - 1);
        (lo, hi, p - lo as f32)
    };
    Array2::from_shape_fn((out_h, out_w), |(y, x)| {
        let (y0, y1, fy) = axis(y, sy, h);
        let (x0, x1, fx) = axis(x, sx, w);
        let top = src[[y0, x0]] * (1.0 - fx) + src[[y0, x1]] * fx;
        let bottom = src[[y1, x0]] * (1.0 - fx) + src[[y1, x1]] * fx;
        top * (1.0 - fy) + bottom * fy
    })
}

/// Zeroes everything outside `bbox` and binarizes the rest.
pub(crate) fn crop_and_threshold(mask: &mut Array2<f32>, bbox: &BBox, threshold: f32) {
    for ((y, x), v) in mask.indexed_iter_mut() {
        let (fx, fy) = (x as f32, y as f32);
        let inside = fx >= bbox[0] && fx < bbox[2] && fy >= bbox[1] && fy < bbox[3];
        *v = if inside && *v > threshold { 1.0 } else { 0.0 };
    }
}
