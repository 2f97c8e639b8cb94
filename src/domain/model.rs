use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::{DomainError, DomainResult};

/// Key of the pseudo-choice that runs every model in the roster.
pub const ALL_MODELS_KEY: &str = "all_models";

/// The five segmentation models the service ships with, in roster order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKey {
    SamB,
    MobileSam,
    FastSamS,
    Yolov8xSeg,
    Yolov8nSeg,
}

/// How a model's raw output has to be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// Prompted encoder/decoder pair, run in segment-everything mode.
    Sam,
    /// Single-pass detector with a prototype-mask head.
    YoloSeg,
}

impl ModelKey {
    pub const ALL: [ModelKey; 5] = [
        ModelKey::SamB,
        ModelKey::MobileSam,
        ModelKey::FastSamS,
        ModelKey::Yolov8xSeg,
        ModelKey::Yolov8nSeg,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelKey::SamB => "sam_b",
            ModelKey::MobileSam => "mobile_sam",
            ModelKey::FastSamS => "fast_sam_s",
            ModelKey::Yolov8xSeg => "yolov8x_seg",
            ModelKey::Yolov8nSeg => "yolov8n_seg",
        }
    }

    /// Human-readable name reported next to every artifact.
    pub fn label(self) -> &'static str {
        match self {
            ModelKey::SamB => "SAM (Base) - sam_b",
            ModelKey::MobileSam => "Mobile SAM - mobile_sam",
            ModelKey::FastSamS => "FastSAM (Small) - fast_sam_s",
            ModelKey::Yolov8xSeg => "YOLOv8 (Extra Large) - yolov8x_seg",
            ModelKey::Yolov8nSeg => "YOLOv8 (Nano) - yolov8n_seg",
        }
    }

    pub fn button_text(self) -> &'static str {
        match self {
            ModelKey::SamB => "SAM (Base)",
            ModelKey::MobileSam => "Mobile SAM",
            ModelKey::FastSamS => "FastSAM (Small)",
            ModelKey::Yolov8xSeg => "YOLOv8 (Extra Large)",
            ModelKey::Yolov8nSeg => "YOLOv8 (Nano)",
        }
    }

    pub fn family(self) -> ModelFamily {
        match self {
            ModelKey::SamB | ModelKey::MobileSam => ModelFamily::Sam,
            ModelKey::FastSamS | ModelKey::Yolov8xSeg | ModelKey::Yolov8nSeg => ModelFamily::YoloSeg,
        }
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKey {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        ModelKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| DomainError::InvalidInput(format!("Unknown model: {s}")))
    }
}

/// What the user asked to run: one model or the whole roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelChoice {
    Single(ModelKey),
    AllModels,
}

impl ModelChoice {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelChoice::Single(key) => key.as_str(),
            ModelChoice::AllModels => ALL_MODELS_KEY,
        }
    }

    pub fn button_text(self) -> &'static str {
        match self {
            ModelChoice::Single(key) => key.button_text(),
            ModelChoice::AllModels => "All Models",
        }
    }

    /// The fixed six-option menu: every model in roster order, then "all models".
    pub fn menu() -> Vec<ModelChoice> {
        ModelKey::ALL
            .into_iter()
            .map(ModelChoice::Single)
            .chain(std::iter::once(ModelChoice::AllModels))
            .collect()
    }
}

impl FromStr for ModelChoice {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        if s == ALL_MODELS_KEY {
            Ok(ModelChoice::AllModels)
        } else {
            s.parse().map(ModelChoice::Single)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegParams {
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub mask_threshold: f32,
}

impl Default for SegParams {
    fn default() -> Self {
        Self {
            conf_threshold: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
            mask_threshold: 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_through_their_wire_names() {
        for key in ModelKey::ALL {
            assert_eq!(key.as_str().parse::<ModelKey>().unwrap(), key);
        }
        assert!("sam_c".parse::<ModelKey>().is_err());
    }

    #[test]
    fn menu_lists_models_then_all_models() {
        let menu = ModelChoice::menu();
        assert_eq!(menu.len(), 6);
        assert_eq!(menu[0], ModelChoice::Single(ModelKey::SamB));
        assert_eq!(menu[4], ModelChoice::Single(ModelKey::Yolov8nSeg));
        assert_eq!(menu[5], ModelChoice::AllModels);
        assert_eq!("all_models".parse::<ModelChoice>().unwrap(), ModelChoice::AllModels);
    }

    #[test]
    fn families_split_sam_from_yolo_heads() {
        assert_eq!(ModelKey::MobileSam.family(), ModelFamily::Sam);
        assert_eq!(ModelKey::FastSamS.family(), ModelFamily::YoloSeg);
    }
}
