use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A composed image persisted on disk plus the label of the model that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub model_label: String,
}

/// Terminal outcome of one successful pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentationOutcome {
    Rendered(Artifact),
    /// The model ran and found nothing. Not an error.
    NoDetections,
}

/// Why a roster model contributed nothing to a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelDiagnostic {
    NoDetections { label: String },
    Failed { label: String, reason: String },
}

/// Artifacts in roster order, with skipped models reported on the side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrchestrationResult {
    pub artifacts: Vec<Artifact>,
    pub diagnostics: Vec<ModelDiagnostic>,
}
