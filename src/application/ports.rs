use async_trait::async_trait;
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::domain::{
    artifact::Artifact,
    detection::SegmentationOutput,
    errors::{DomainResult, TransportFailure},
    model::{ModelChoice, ModelKey},
    session::ChatId,
};

/// A segmentation model seen from the pipeline: a slow but pure function.
pub trait SegmentationModel: Send + Sync {
    /// Resolution the pipeline resizes images to before calling [`infer`](Self::infer).
    fn input_size(&self) -> (u32, u32);

    /// Masks in the output are at [`input_size`](Self::input_size) resolution.
    fn infer(&self, image: &RgbImage) -> anyhow::Result<SegmentationOutput>;
}

pub trait ModelCatalogPort: Send + Sync {
    fn load(&self, key: ModelKey) -> DomainResult<Arc<dyn SegmentationModel>>;
}

/// Outbound side of the chat transport.
#[async_trait]
pub trait ChatPort: Send + Sync {
    async fn send_text(&self, chat: ChatId, text: &str) -> DomainResult<()>;
    async fn send_menu(&self, chat: ChatId, text: &str, options: &[ModelChoice]) -> DomainResult<()>;
    async fn send_photo(&self, chat: ChatId, path: &Path) -> DomainResult<()>;
    /// Fetches a remote file into local storage and returns where it landed.
    async fn download(&self, file_id: &str, file_name: &str) -> DomainResult<PathBuf>;
    /// Stops the client's spinner on a pressed button.
    async fn acknowledge(&self, callback_id: &str) -> DomainResult<()>;
}

/// The segmentation service as reached over the network.
#[async_trait]
pub trait SegmentationGateway: Send + Sync {
    /// An empty list means the service ran and found nothing.
    async fn segment(
        &self,
        file_path: &Path,
        choice: ModelChoice,
    ) -> Result<Vec<Artifact>, TransportFailure>;
}
