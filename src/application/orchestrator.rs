use tracing::{error, info, warn};

use crate::application::pipeline::SegmentationPipeline;
use crate::application::roster::RosterEntry;
use crate::domain::artifact::{ModelDiagnostic, OrchestrationResult, SegmentationOutcome};

/// Fans one image out over the roster, one model at a time, in roster order.
///
/// A model that fails or finds nothing is reported in the diagnostics and
/// the batch moves on.
pub struct ModelOrchestrator<'a> {
    pipeline: &'a SegmentationPipeline,
}

impl<'a> ModelOrchestrator<'a> {
    pub fn new(pipeline: &'a SegmentationPipeline) -> Self {
        Self { pipeline }
    }

    pub fn run_all(&self, image_bytes: &[u8], roster: &[RosterEntry]) -> OrchestrationResult {
        let result = roster.iter().fold(OrchestrationResult::default(), |mut acc, entry| {
            match self.pipeline.run(image_bytes, entry) {
                Ok(SegmentationOutcome::Rendered(artifact)) => acc.artifacts.push(artifact),
                Ok(SegmentationOutcome::NoDetections) => {
                    warn!(model = %entry.label, "no objects detected, skipping");
                    acc.diagnostics.push(ModelDiagnostic::NoDetections { label: entry.label.clone() });
                }
                Err(failure) => {
                    error!(model = %failure.label, "segmentation failed: {}", failure.source);
                    acc.diagnostics.push(ModelDiagnostic::Failed {
                        label: failure.label,
                        reason: failure.source.to_string(),
                    });
                }
            }
            acc
        });

        info!(
            rendered = result.artifacts.len(),
            skipped = result.diagnostics.len(),
            "all models done"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::render::ResultComposer;
    use crate::domain::model::ModelKey;
    use crate::test_utils::*;
    use image::Rgb;

    #[test]
    fn failing_and_empty_models_are_skipped_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = SegmentationPipeline::new(ResultComposer::new(dir.path()).unwrap());
        let roster = mixed_roster();

        let result = ModelOrchestrator::new(&pipeline)
            .run_all(&png_bytes(64, 48, Rgb([0, 0, 0])), roster.entries());

        let labels: Vec<_> = result.artifacts.iter().map(|a| a.model_label.as_str()).collect();
        assert_eq!(
            labels,
            [ModelKey::SamB.label(), ModelKey::MobileSam.label(), ModelKey::Yolov8nSeg.label()]
        );
        assert!(result.artifacts.iter().all(|a| a.path.exists()));

        assert_eq!(result.diagnostics.len(), 2);
        assert!(matches!(
            &result.diagnostics[0],
            ModelDiagnostic::Failed { label, reason }
                if label == ModelKey::FastSamS.label() && reason.contains("CUDA out of memory")
        ));
        assert_eq!(
            result.diagnostics[1],
            ModelDiagnostic::NoDetections { label: ModelKey::Yolov8xSeg.label().to_string() }
        );
    }

    #[test]
    fn empty_batch_is_a_valid_result() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = SegmentationPipeline::new(ResultComposer::new(dir.path()).unwrap());
        let result = ModelOrchestrator::new(&pipeline).run_all(b"garbage", mixed_roster().entries());
        assert!(result.artifacts.is_empty());
        assert_eq!(result.diagnostics.len(), 5);
    }
}
