use image::imageops::{self, FilterType};
use std::time::Instant;
use tracing::{debug, info};

use crate::application::render::{Composite, LegendRenderer, MaskCompositor, ResultComposer};
use crate::application::roster::RosterEntry;
use crate::domain::{
    artifact::{Artifact, SegmentationOutcome},
    detection::summarize_detections,
    errors::{ModelFailure, SegmentError},
};

/// Runs one model on one image and renders the result: overlay, legend, files.
#[derive(Debug)]
pub struct SegmentationPipeline {
    compositor: MaskCompositor,
    legend: LegendRenderer,
    composer: ResultComposer,
    save_masks: bool,
}

impl SegmentationPipeline {
    pub fn new(composer: ResultComposer) -> Self {
        Self {
            compositor: MaskCompositor::default(),
            legend: LegendRenderer::default(),
            composer,
            save_masks: true,
        }
    }

    /// Turns off the per-detection mask files.
    pub fn without_mask_files(mut self) -> Self {
        self.save_masks = false;
        self
    }

    /// Errors are returned tagged with the model label, never swallowed here.
    pub fn run(&self, image_bytes: &[u8], entry: &RosterEntry) -> Result<SegmentationOutcome, ModelFailure> {
        self.render(image_bytes, entry).map_err(|e| ModelFailure::new(entry.label.clone(), e))
    }

    fn render(&self, image_bytes: &[u8], entry: &RosterEntry) -> Result<SegmentationOutcome, SegmentError> {
        let original = image::load_from_memory(image_bytes)?.to_rgb8();
        let (width, height) = original.dimensions();
        let (in_w, in_h) = entry.model.input_size();
        let input = imageops::resize(&original, in_w, in_h, FilterType::Triangle);

        let started = Instant::now();
        let detections = entry.model.infer(&input)?.into_detections();
        debug!(
            model = entry.key.as_str(),
            infer_ms = started.elapsed().as_millis() as u64,
            count = detections.len(),
            "inference done"
        );

        let seq = self.composer.next_invocation();
        let key = entry.key.as_str();
        let composite = self.compositor.composite(&original, &detections, |layer| {
            if self.save_masks {
                self.composer.persist_mask(layer.image, key, &layer.detection.class_name, seq, layer.index)?;
            }
            Ok(())
        })?;

        let Some(Composite { image, legend }) = composite else {
            info!(model = key, "no objects detected");
            return Ok(SegmentationOutcome::NoDetections);
        };

        let panel = self.legend.render(&legend, height);
        let result = self.composer.compose(&image, &panel);
        let path = self.composer.persist(&result, key, seq)?;

        info!(
            model = key,
            path = %path.display(),
            size = %format!("{width}x{height}"),
            found = %summarize_detections(&detections),
            "segmentation rendered"
        );

        Ok(SegmentationOutcome::Rendered(Artifact { path, model_label: entry.label.clone() }))
    }
}
