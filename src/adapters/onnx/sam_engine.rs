use anyhow::{anyhow, bail, Result};
use image::{imageops::FilterType, RgbImage};
use ndarray::{s, Array2, ArrayViewD, Ix2, IxDyn};
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;

use super::{build_session, nms, BBox};
use crate::application::ports::SegmentationModel;
use crate::domain::detection::{RawDetection, SegmentationOutput};

/// Side of the square the SAM encoder consumes.
pub const ENCODER_SIDE: usize = 1024;
const PIXEL_MEAN: [f32; 3] = [123.675, 116.28, 103.53];
const PIXEL_STD: [f32; 3] = [58.395, 57.12, 57.375];

#[derive(Debug, Clone, Copy)]
pub struct SamParams {
    pub points_per_side: usize,
    pub pred_iou_threshold: f32,
    pub box_nms_threshold: f32,
    pub max_masks: usize,
}

impl Default for SamParams {
    fn default() -> Self {
        Self { points_per_side: 16, pred_iou_threshold: 0.88, box_nms_threshold: 0.7, max_masks: 300 }
    }
}

/// Segment-everything SAM: one encoder pass, then one decoder pass per grid point.
pub struct OnnxSamEngine {
    encoder: Mutex<Session>,
    decoder: Mutex<Session>,
    input_size: u32,
    params: SamParams,
}

impl OnnxSamEngine {
    pub fn load(encoder: &Path, decoder: &Path, input_size: u32, params: SamParams) -> Result<Self> {
        Ok(Self {
            encoder: Mutex::new(build_session(encoder)?),
            decoder: Mutex::new(build_session(decoder)?),
            input_size,
            params,
        })
    }

    fn embed(&self, rgb: &RgbImage) -> Result<(Vec<i64>, Vec<f32>)> {
        let (pixels, _) = encoder_input(rgb);
        let side = ENCODER_SIDE as i64;
        let input = Tensor::from_array((vec![1, 3, side, side], pixels))?;

        let mut encoder = self.encoder.lock().map_err(|_| anyhow!("encoder lock poisoned"))?;
        let outputs = encoder.run(ort::inputs![input])?;
        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: Vec<i64> = shape.iter().copied().collect();
        Ok((dims, data.to_vec()))
    }
}

impl SegmentationModel for OnnxSamEngine {
    fn input_size(&self) -> (u32, u32) {
        (self.input_size, self.input_size)
    }

    fn infer(&self, rgb: &RgbImage) -> Result<SegmentationOutput> {
        let (w, h) = rgb.dimensions();
        let scale = ENCODER_SIDE as f32 / w.max(h) as f32;
        let (emb_shape, embeddings) = self.embed(rgb)?;

        let mask_input = vec![0f32; 256 * 256];
        let mut decoder = self.decoder.lock().map_err(|_| anyhow!("decoder lock poisoned"))?;
        let mut proposals = Vec::new();

        for (px, py) in grid_points(w, h, self.params.points_per_side) {
            // The padding point (label -1) is what the exported decoder expects without a box.
            let coords = vec![px * scale, py * scale, 0.0, 0.0];
            let outputs = decoder.run(ort::inputs![
                "image_embeddings" => Tensor::from_array((emb_shape.clone(), embeddings.clone()))?,
                "point_coords" => Tensor::from_array((vec![1i64, 2, 2], coords))?,
                "point_labels" => Tensor::from_array((vec![1i64, 2], vec![1f32, -1.0]))?,
                "mask_input" => Tensor::from_array((vec![1i64, 1, 256, 256], mask_input.clone()))?,
                "has_mask_input" => Tensor::from_array((vec![1i64], vec![0f32]))?,
                "orig_im_size" => Tensor::from_array((vec![2i64], vec![h as f32, w as f32]))?,
            ])?;

            let (mask_shape, mask_data) = outputs[0].try_extract_tensor::<f32>()?;
            let (_, iou_data) = outputs[1].try_extract_tensor::<f32>()?;
            let dims: Vec<usize> = mask_shape.iter().map(|&d| d as usize).collect();
            if dims.len() != 4 {
                bail!("unexpected decoder mask shape {dims:?}");
            }
            let masks = ArrayViewD::from_shape(IxDyn(&dims), mask_data)?;

            let Some((best, &score)) =
                iou_data.iter().enumerate().max_by(|a, b| a.1.total_cmp(b.1))
            else {
                continue;
            };
            if score < self.params.pred_iou_threshold {
                continue;
            }
            let logits = masks.slice(s![0, best, .., ..]).into_dimensionality::<Ix2>()?;
            let mask = logits.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
            if let Some(bbox) = mask_bbox(&mask) {
                proposals.push(Proposal { mask, bbox, score });
            }
        }

        Ok(select(proposals, &self.params))
    }
}

pub(crate) struct Proposal {
    pub mask: Array2<f32>,
    pub bbox: BBox,
    pub score: f32,
}

/// Box-NMS over proposals; kept masks are numbered in descending predicted IoU.
pub(crate) fn select(proposals: Vec<Proposal>, params: &SamParams) -> SegmentationOutput {
    let boxes: Vec<BBox> = proposals.iter().map(|p| p.bbox).collect();
    let scores: Vec<f32> = proposals.iter().map(|p| p.score).collect();
    let keep = nms(&boxes, &scores, |_| (), params.box_nms_threshold, params.max_masks);

    let mut slots: Vec<Option<Proposal>> = proposals.into_iter().map(Some).collect();
    let detections: Vec<RawDetection> = keep
        .into_iter()
        .filter_map(|i| slots[i].take())
        .enumerate()
        .map(|(class_index, p)| RawDetection { class_index, mask: p.mask })
        .collect();

    SegmentationOutput {
        class_names: (0..detections.len()).map(|i| (i, i.to_string())).collect(),
        detections,
    }
}

/// Cell-centred prompt points over a `w`×`h` image.
pub(crate) fn grid_points(w: u32, h: u32, per_side: usize) -> Vec<(f32, f32)> {
    let step_x = w as f32 / per_side as f32;
    let step_y = h as f32 / per_side as f32;
    (0..per_side)
        .flat_map(|j| (0..per_side).map(move |i| ((i as f32 + 0.5) * step_x, (j as f32 + 0.5) * step_y)))
        .collect()
}

/// Longest side scaled to 1024, normalised, zero-padded bottom/right, CHW.
pub(crate) fn encoder_input(rgb: &RgbImage) -> (Vec<f32>, (u32, u32)) {
    let (w, h) = rgb.dimensions();
    let scale = ENCODER_SIDE as f32 / w.max(h).max(1) as f32;
    let nw = ((w as f32 * scale).round() as u32).clamp(1, ENCODER_SIDE as u32);
    let nh = ((h as f32 * scale).round() as u32).clamp(1, ENCODER_SIDE as u32);
    let resized = image::imageops::resize(rgb, nw, nh, FilterType::Triangle);

    let plane = ENCODER_SIDE * ENCODER_SIDE;
    let mut data = vec![0f32; 3 * plane];
    for (x, y, pixel) in resized.enumerate_pixels() {
        let at = y as usize * ENCODER_SIDE + x as usize;
        for c in 0..3 {
            data[c * plane + at] = (pixel[c] as f32 - PIXEL_MEAN[c]) / PIXEL_STD[c];
        }
    }
    (data, (nw, nh))
}

/// Tight box around the set pixels, `None` for an empty mask.
pub(crate) fn mask_bbox(mask: &Array2<f32>) -> Option<BBox> {
    let mut bbox: Option<BBox> = None;
    for ((y, x), &v) in mask.indexed_iter() {
        if v <= 0.0 {
            continue;
        }
        let (x, y) = (x as f32, y as f32);
        bbox = Some(match bbox {
            None => [x, y, x + 1.0, y + 1.0],
            Some(b) => [b[0].min(x), b[1].min(y), b[2].max(x + 1.0), b[3].max(y + 1.0)],
        });
    }
    bbox
}
