use image::{imageops, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::domain::errors::SegmentError;

/// Joins overlay + legend and writes artifacts under a shared output directory.
///
/// File names carry a process-wide invocation id, so concurrent or repeated
/// runs of the same model never overwrite each other.
#[derive(Debug)]
pub struct ResultComposer {
    results_dir: PathBuf,
    sequence: AtomicU64,
}

impl ResultComposer {
    /// Creates the directory if needed and starts numbering above any
    /// sequence already present in it.
    pub fn new(results_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let results_dir = results_dir.into();
        fs::create_dir_all(&results_dir)?;
        let next = match highest_sequence(&results_dir)? {
            None => 0,
            Some(n) => n.checked_add(1).ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("{}: artifact numbering is exhausted", results_dir.display()),
                )
            })?,
        };
        debug!(dir = %results_dir.display(), next, "result composer ready");
        Ok(Self { results_dir, sequence: AtomicU64::new(next) })
    }

    pub fn next_invocation(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Places the legend panel to the right of the blended image.
    pub fn compose(&self, blended: &RgbImage, legend: &RgbImage) -> RgbImage {
        debug_assert_eq!(blended.height(), legend.height());
        let mut out = RgbImage::new(blended.width() + legend.width(), blended.height());
        imageops::replace(&mut out, blended, 0, 0);
        imageops::replace(&mut out, legend, blended.width() as i64, 0);
        out
    }

    pub fn persist(&self, image: &RgbImage, model_key: &str, seq: u64) -> Result<PathBuf, SegmentError> {
        self.save(image, format!("{model_key}_{seq}.png"))
    }

    pub fn persist_mask(
        &self,
        layer: &RgbImage,
        model_key: &str,
        class_name: &str,
        seq: u64,
        index: usize,
    ) -> Result<PathBuf, SegmentError> {
        let class = sanitize(class_name);
        self.save(layer, format!("{model_key}_{class}_{seq}_{index}.png"))
    }

    fn save(&self, image: &RgbImage, file_name: String) -> Result<PathBuf, SegmentError> {
        fs::create_dir_all(&self.results_dir)?;
        let path = self.results_dir.join(file_name);
        image.save(&path)?;
        Ok(path)
    }
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    if cleaned.is_empty() {
        "class".to_string()
    } else {
        cleaned
    }
}

/// Invocation id of an artifact file stem, for the two names this composer
/// writes: `<key>_<seq>` and `<key>_<class>_<seq>_<index>`.
fn sequence_of(stem: &str) -> Option<u64> {
    let mut tokens = stem.rsplit('_');
    let last = tokens.next()?.parse::<u64>().ok()?;
    match tokens.next()?.parse::<u64>() {
        Ok(seq) => (tokens.count() >= 2).then_some(seq),
        Err(_) => Some(last),
    }
}

fn highest_sequence(dir: &Path) -> std::io::Result<Option<u64>> {
    let mut highest = None;
    for entry in fs::read_dir(dir)?.flatten() {
        let name = entry.file_name();
        let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".png")) else {
            continue;
        };
        highest = highest.max(sequence_of(stem));
    }
    Ok(highest)
}
