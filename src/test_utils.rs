//! Fakes shared by unit tests.

use anyhow::anyhow;
use image::{ImageFormat, Rgb, RgbImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use crate::application::ports::SegmentationModel;
use crate::application::roster::{Roster, RosterEntry};
use crate::domain::detection::{MaskField, RawDetection, SegmentationOutput};
use crate::domain::model::ModelKey;

pub fn png_bytes(width: u32, height: u32, fill: Rgb<u8>) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, fill);
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).expect("encode png");
    buf.into_inner()
}

/// Mask of `size x size` with the half-open box `[x0, x1) x [y0, y1)` set.
pub fn box_mask(size: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> MaskField {
    MaskField::from_shape_fn((size, size), |(y, x)| {
        if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
            1.0
        } else {
            0.0
        }
    })
}

pub fn output_of(classes: &[(usize, &str)], detections: Vec<(usize, MaskField)>) -> SegmentationOutput {
    SegmentationOutput {
        class_names: classes.iter().map(|(i, n)| (*i, n.to_string())).collect::<HashMap<_, _>>(),
        detections: detections
            .into_iter()
            .map(|(class_index, mask)| RawDetection { class_index, mask })
            .collect(),
    }
}

/// Always answers with the same output.
pub struct StaticModel {
    pub input: (u32, u32),
    pub output: SegmentationOutput,
}

impl StaticModel {
    pub fn empty() -> Self {
        Self { input: (64, 64), output: SegmentationOutput::default() }
    }

    pub fn one(class_name: &str) -> Self {
        Self {
            input: (64, 64),
            output: output_of(&[(0, class_name)], vec![(0, box_mask(64, 8, 8, 40, 40))]),
        }
    }
}

impl SegmentationModel for StaticModel {
    fn input_size(&self) -> (u32, u32) {
        self.input
    }

    fn infer(&self, _image: &RgbImage) -> anyhow::Result<SegmentationOutput> {
        Ok(self.output.clone())
    }
}

pub struct FailingModel;

impl SegmentationModel for FailingModel {
    fn input_size(&self) -> (u32, u32) {
        (32, 32)
    }

    fn infer(&self, _image: &RgbImage) -> anyhow::Result<SegmentationOutput> {
        Err(anyhow!("CUDA out of memory"))
    }
}

/// Five-model roster: #3 fails, #4 finds nothing, the rest detect one object.
pub fn mixed_roster() -> Roster {
    let models: [Arc<dyn SegmentationModel>; 5] = [
        Arc::new(StaticModel::one("0")),
        Arc::new(StaticModel::one("1")),
        Arc::new(FailingModel),
        Arc::new(StaticModel::empty()),
        Arc::new(StaticModel::one("person")),
    ];
    Roster::new(
        ModelKey::ALL
            .into_iter()
            .zip(models)
            .map(|(key, model)| RosterEntry::new(key, model))
            .collect(),
    )
}
