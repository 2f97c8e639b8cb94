#![allow(dead_code)]

use anyhow::anyhow;
use image::{ImageFormat, Rgb, RgbImage};
use ndarray::Array2;
use std::io::Cursor;
use std::sync::Arc;

use maskboard::application::ports::SegmentationModel;
use maskboard::application::roster::{Roster, RosterEntry};
use maskboard::domain::detection::{RawDetection, SegmentationOutput};
use maskboard::domain::model::ModelKey;

pub const BOUNDARY: &str = "maskboard-test-boundary";

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([90, 90, 90]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// A `multipart/form-data` body with one file part.
pub fn multipart_body(field: &str, file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// Answers every call with one square detection of `class_name`, or nothing.
pub struct FakeModel {
    class_name: Option<&'static str>,
}

impl FakeModel {
    pub fn detecting(class_name: &'static str) -> Self {
        Self { class_name: Some(class_name) }
    }

    pub fn blind() -> Self {
        Self { class_name: None }
    }
}

impl SegmentationModel for FakeModel {
    fn input_size(&self) -> (u32, u32) {
        (64, 64)
    }

    fn infer(&self, _image: &RgbImage) -> anyhow::Result<SegmentationOutput> {
        let Some(name) = self.class_name else {
            return Ok(SegmentationOutput::default());
        };
        let mask = Array2::from_shape_fn((64, 64), |(y, x)| {
            if (16..48).contains(&x) && (16..48).contains(&y) { 1.0 } else { 0.0 }
        });
        Ok(SegmentationOutput {
            class_names: [(0, name.to_string())].into_iter().collect(),
            detections: vec![RawDetection { class_index: 0, mask }],
        })
    }
}

pub struct BrokenModel;

impl SegmentationModel for BrokenModel {
    fn input_size(&self) -> (u32, u32) {
        (64, 64)
    }

    fn infer(&self, _image: &RgbImage) -> anyhow::Result<SegmentationOutput> {
        Err(anyhow!("weights corrupted"))
    }
}

/// Roster order: sam_b, mobile_sam, fast_sam_s (broken), yolov8x_seg (blind), yolov8n_seg.
pub fn roster() -> Roster {
    let models: [Arc<dyn SegmentationModel>; 5] = [
        Arc::new(FakeModel::detecting("0")),
        Arc::new(FakeModel::detecting("1")),
        Arc::new(BrokenModel),
        Arc::new(FakeModel::blind()),
        Arc::new(FakeModel::detecting("cat")),
    ];
    Roster::new(ModelKey::ALL.into_iter().zip(models).map(|(k, m)| RosterEntry::new(k, m)).collect())
}
