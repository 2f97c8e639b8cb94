use serde::{Deserialize, Serialize};

use crate::domain::{
    artifact::Artifact,
    model::{ModelKey, ALL_MODELS_KEY},
};

pub const NO_OBJECTS_DETECTED: &str = "No objects detected";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentedImage {
    pub model_name: String,
    pub image_path: String,
}

impl From<Artifact> for SegmentedImage {
    fn from(a: Artifact) -> Self {
        Self { model_name: a.model_label, image_path: a.path.to_string_lossy().into_owned() }
    }
}

impl From<SegmentedImage> for Artifact {
    fn from(s: SegmentedImage) -> Self {
        Self { path: s.image_path.into(), model_label: s.model_name }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

/// Body of a single-model reply: an artifact or an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SingleModelResponse {
    Segmented(SegmentedImage),
    Error(ErrorResponse),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllModelsResponse {
    pub segmented_images: Vec<SegmentedImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
    pub all_models: String,
}

impl ModelsResponse {
    pub fn from_keys(keys: impl IntoIterator<Item = (ModelKey, String)>) -> Self {
        Self {
            models: keys
                .into_iter()
                .map(|(key, label)| ModelInfo { key: key.as_str().to_string(), label })
                .collect(),
            all_models: ALL_MODELS_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}
