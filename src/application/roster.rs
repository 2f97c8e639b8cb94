use anyhow::anyhow;
use image::RgbImage;
use std::sync::Arc;
use tracing::{error, info};

use crate::application::ports::{ModelCatalogPort, SegmentationModel};
use crate::domain::{detection::SegmentationOutput, model::ModelKey};

#[derive(Clone)]
pub struct RosterEntry {
    pub key: ModelKey,
    pub label: String,
    pub model: Arc<dyn SegmentationModel>,
}

impl RosterEntry {
    pub fn new(key: ModelKey, model: Arc<dyn SegmentationModel>) -> Self {
        Self { key, label: key.label().to_string(), model }
    }
}

impl std::fmt::Debug for RosterEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosterEntry").field("key", &self.key).field("label", &self.label).finish()
    }
}

/// The fixed, ordered set of models, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        Self { entries }
    }

    /// Loads every model of the roster. A model that fails to load keeps its
    /// slot and fails on every invocation instead.
    pub fn from_catalog(catalog: &dyn ModelCatalogPort) -> Self {
        let entries = ModelKey::ALL
            .into_iter()
            .map(|key| {
                let model: Arc<dyn SegmentationModel> = match catalog.load(key) {
                    Ok(model) => {
                        info!(model = key.as_str(), "model loaded");
                        model
                    }
                    Err(e) => {
                        error!(model = key.as_str(), "model unavailable: {e}");
                        Arc::new(UnavailableModel { reason: e.to_string() })
                    }
                };
                RosterEntry::new(key, model)
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn get(&self, key: ModelKey) -> Option<&RosterEntry> {
        self.entries.iter().find(|e| e.key == key)
    }
}

/// Stand-in for a model whose weights could not be loaded.
pub struct UnavailableModel {
    pub reason: String,
}

impl SegmentationModel for UnavailableModel {
    fn input_size(&self) -> (u32, u32) {
        (640, 640)
    }

    fn infer(&self, _image: &RgbImage) -> anyhow::Result<SegmentationOutput> {
        Err(anyhow!("model not loaded: {}", self.reason))
    }
}
