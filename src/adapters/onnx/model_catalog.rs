use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::classes;
use super::sam_engine::{OnnxSamEngine, SamParams};
use super::yolo_seg_engine::OnnxYoloSegEngine;
use crate::application::ports::{ModelCatalogPort, SegmentationModel};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::{ModelFamily, ModelKey, SegParams};

/// Resolves model keys to ONNX files under one directory:
/// `<key>.onnx` for single-pass models, `<key>_encoder.onnx` plus
/// `<key>_decoder.onnx` for SAM.
pub struct OnnxModelCatalog {
    models_dir: PathBuf,
    input_size: u32,
}

impl OnnxModelCatalog {
    pub fn new(models_dir: impl Into<PathBuf>, input_size: u32) -> Self {
        Self { models_dir: models_dir.into(), input_size }
    }

    pub fn files_for(&self, key: ModelKey) -> Vec<PathBuf> {
        match key.family() {
            ModelFamily::YoloSeg => vec![self.models_dir.join(format!("{key}.onnx"))],
            ModelFamily::Sam => vec![
                self.models_dir.join(format!("{key}_encoder.onnx")),
                self.models_dir.join(format!("{key}_decoder.onnx")),
            ],
        }
    }
}

fn validate_model(path: &Path) -> DomainResult<()> {
    if path.as_os_str().is_empty() {
        return Err(DomainError::InvalidInput("onnx path empty".into()));
    }
    if !path.exists() {
        return Err(DomainError::NotFound(format!("model file not found: {}", path.display())));
    }
    Ok(())
}

impl ModelCatalogPort for OnnxModelCatalog {
    fn load(&self, key: ModelKey) -> DomainResult<Arc<dyn SegmentationModel>> {
        let files = self.files_for(key);
        files.iter().try_for_each(|f| validate_model(f))?;

        let failed = |e: anyhow::Error| DomainError::OperationFailed(format!("{key}: {e:#}"));
        let model: Arc<dyn SegmentationModel> = match (key.family(), files.as_slice()) {
            (ModelFamily::YoloSeg, [onnx]) => {
                let names = match key {
                    ModelKey::FastSamS => classes::names(&classes::FAST_SAM),
                    _ => classes::names(&classes::COCO),
                };
                Arc::new(
                    OnnxYoloSegEngine::load(onnx, self.input_size, SegParams::default(), names)
                        .map_err(failed)?,
                )
            }
            (ModelFamily::Sam, [encoder, decoder]) => Arc::new(
                OnnxSamEngine::load(encoder, decoder, self.input_size, SamParams::default())
                    .map_err(failed)?,
            ),
            _ => return Err(DomainError::OperationFailed(format!("{key}: unexpected model layout"))),
        };

        debug!(model = %key, dir = %self.models_dir.display(), "onnx sessions committed");
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_layout_follows_the_family() {
        let catalog = OnnxModelCatalog::new("/models", 640);
        assert_eq!(catalog.files_for(ModelKey::Yolov8nSeg), vec![PathBuf::from("/models/yolov8n_seg.onnx")]);
        assert_eq!(
            catalog.files_for(ModelKey::MobileSam),
            vec![
                PathBuf::from("/models/mobile_sam_encoder.onnx"),
                PathBuf::from("/models/mobile_sam_decoder.onnx"),
            ]
        );
    }

    #[test]
    fn missing_files_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = OnnxModelCatalog::new(dir.path(), 640);
        match catalog.load(ModelKey::SamB) {
            Err(DomainError::NotFound(msg)) => assert!(msg.contains("sam_b_encoder.onnx")),
            other => panic!("expected NotFound, got {:?}", other.err()),
        }
    }
}
