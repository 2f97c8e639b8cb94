use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

/// Anything that can go wrong while one model's pipeline runs.
#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("inference error: {0}")]
    Inference(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("worker error: {0}")]
    Worker(String),
}

impl From<anyhow::Error> for SegmentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Inference(format!("{err:#}"))
    }
}

/// A pipeline run that raised, tagged with the label of the model that produced it.
#[derive(Debug, Error)]
#[error("model '{label}' failed: {source}")]
pub struct ModelFailure {
    pub label: String,
    #[source]
    pub source: SegmentError,
}

impl ModelFailure {
    pub fn new(label: impl Into<String>, source: impl Into<SegmentError>) -> Self {
        Self { label: label.into(), source: source.into() }
    }
}

/// The call from a chat session to the segmentation service did not produce a usable reply.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportFailure {
    #[error("segmentation service answered with status {0}")]
    Status(u16),
    #[error("segmentation service unreachable: {0}")]
    Unreachable(String),
    #[error("malformed reply from segmentation service: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Sorry, an error occurred while segmenting the image. Please upload an image first.")]
    MissingUpload,
}
