use image::{imageops, imageops::FilterType, GrayImage, Luma, Rgb, RgbImage};

use crate::domain::{
    detection::{Detection, MaskField},
    errors::SegmentError,
    legend::Legend,
    palette,
};

/// Weight of each colored layer when it is added onto the accumulated image.
pub const LAYER_WEIGHT: f32 = 0.5;

/// One detection's full-size colored layer, handed out while compositing.
pub struct MaskLayer<'a> {
    pub index: usize,
    pub detection: &'a Detection,
    pub color: Rgb<u8>,
    pub image: &'a RgbImage,
}

pub struct Composite {
    pub image: RgbImage,
    pub legend: Legend,
}

#[derive(Debug, Clone)]
pub struct MaskCompositor {
    layer_weight: f32,
    filter: FilterType,
}

impl Default for MaskCompositor {
    fn default() -> Self {
        Self { layer_weight: LAYER_WEIGHT, filter: FilterType::Nearest }
    }
}

impl MaskCompositor {
    /// Folds every detection, in the model's order, onto a copy of `original`.
    ///
    /// Blending is cumulative: a later mask partially attenuates an earlier
    /// overlapping one. `on_layer` sees each colored layer before it is blended.
    /// Returns `None` when there is nothing to draw.
    pub fn composite<F>(
        &self,
        original: &RgbImage,
        detections: &[Detection],
        mut on_layer: F,
    ) -> Result<Option<Composite>, SegmentError>
    where
        F: FnMut(MaskLayer<'_>) -> Result<(), SegmentError>,
    {
        if detections.is_empty() {
            return Ok(None);
        }

        let (width, height) = original.dimensions();
        let mut legend = Legend::new();

        let image = detections.iter().enumerate().try_fold(
            original.clone(),
            |acc, (index, detection)| {
                let color = palette::color(detection.class_id);
                let mask = self.binarize_and_resize(&detection.mask, width, height);
                let layer = color_layer(&mask, color);

                on_layer(MaskLayer { index, detection, color, image: &layer })?;
                legend.insert_if_absent(&detection.class_name, color);

                Ok::<_, SegmentError>(blend(acc, &layer, self.layer_weight))
            },
        )?;

        Ok(Some(Composite { image, legend }))
    }

    /// Thresholds at `> 0` and brings the mask to `width x height`.
    pub fn binarize_and_resize(&self, mask: &MaskField, width: u32, height: u32) -> GrayImage {
        let (rows, cols) = mask.dim();
        if rows == 0 || cols == 0 {
            return GrayImage::new(width, height);
        }

        let binary = GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
            if mask[[y as usize, x as usize]] > 0.0 {
                Luma([255])
            } else {
                Luma([0])
            }
        });

        if binary.dimensions() == (width, height) {
            binary
        } else {
            imageops::resize(&binary, width, height, self.filter)
        }
    }
}

/// `color` under the set mask, black elsewhere.
pub fn color_layer(mask: &GrayImage, color: Rgb<u8>) -> RgbImage {
    RgbImage::from_fn(mask.width(), mask.height(), |x, y| {
        if mask.get_pixel(x, y)[0] > 0 {
            color
        } else {
            Rgb([0, 0, 0])
        }
    })
}

/// `acc + weight * layer`, saturated per channel.
pub fn blend(mut acc: RgbImage, layer: &RgbImage, weight: f32) -> RgbImage {
    for (dst, src) in acc.pixels_mut().zip(layer.pixels()) {
        for c in 0..3 {
            let v = dst[c] as f32 + weight * src[c] as f32;
            dst[c] = v.round_ties_even().clamp(0.0, 255.0) as u8;
        }
    }
    acc
}
