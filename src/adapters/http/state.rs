use std::path::PathBuf;
use std::sync::Arc;

use crate::application::services::SegmentationService;

/// Shared state of the axum handlers: the segmentation use case plus the
/// directory uploads are written to before they are segmented.
#[derive(Clone)]
pub struct HttpState {
    pub segmentation: Arc<SegmentationService>,
    pub upload_dir: PathBuf,
}
