use ndarray::Array2;
use std::collections::HashMap;

/// Probability field of one instance, `(rows, cols)` at model input resolution.
pub type MaskField = Array2<f32>;

/// One instance as a model reports it, before class names are resolved.
#[derive(Debug, Clone)]
pub struct RawDetection {
    pub class_index: usize,
    pub mask: MaskField,
}

/// Everything a model invocation returns.
#[derive(Debug, Clone, Default)]
pub struct SegmentationOutput {
    pub class_names: HashMap<usize, String>,
    pub detections: Vec<RawDetection>,
}

impl SegmentationOutput {
    /// Resolves class names, keeping the model's own detection order.
    pub fn into_detections(self) -> Vec<Detection> {
        let names = self.class_names;
        self.detections
            .into_iter()
            .map(|raw| Detection {
                class_name: names
                    .get(&raw.class_index)
                    .cloned()
                    .unwrap_or_else(|| raw.class_index.to_string()),
                class_id: raw.class_index,
                mask: raw.mask,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Detection {
    pub class_id: usize,
    pub class_name: String,
    pub mask: MaskField,
}

pub fn summarize_detections(detections: &[Detection]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for det in detections {
        match counts.iter_mut().find(|(name, _)| *name == det.class_name) {
            Some((_, n)) => *n += 1,
            None => counts.push((&det.class_name, 1)),
        }
    }
    counts
        .iter()
        .map(|(name, n)| format!("{n} {name}"))
        .collect::<Vec<_>>()
        .join(", ")
}
