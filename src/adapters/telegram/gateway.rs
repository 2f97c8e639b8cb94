use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;

use crate::application::dto::{AllModelsResponse, SingleModelResponse};
use crate::application::ports::SegmentationGateway;
use crate::domain::artifact::Artifact;
use crate::domain::errors::TransportFailure;
use crate::domain::model::ModelChoice;

/// Reaches the segmentation HTTP service with one multipart upload per request.
pub struct HttpSegmentationGateway {
    http: reqwest::Client,
    api_url: String,
}

impl HttpSegmentationGateway {
    pub fn new(api_url: impl Into<String>) -> Self {
        // All-models requests run five models back to back.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http, api_url: api_url.into().trim_end_matches('/').to_string() }
    }

    pub fn endpoint(&self, choice: ModelChoice) -> String {
        format!("{}/segment_image/{}/", self.api_url, choice.as_str())
    }
}

/// Interprets a 2xx body for `choice`. A single-model "error" body means the
/// model ran and found nothing.
pub fn parse_reply(choice: ModelChoice, body: &[u8]) -> Result<Vec<Artifact>, TransportFailure> {
    let malformed = |e: serde_json::Error| TransportFailure::Malformed(e.to_string());
    match choice {
        ModelChoice::AllModels => {
            let reply: AllModelsResponse = serde_json::from_slice(body).map_err(malformed)?;
            Ok(reply.segmented_images.into_iter().map(Artifact::from).collect())
        }
        ModelChoice::Single(_) => match serde_json::from_slice::<SingleModelResponse>(body).map_err(malformed)? {
            SingleModelResponse::Segmented(image) => Ok(vec![image.into()]),
            SingleModelResponse::Error(_) => Ok(Vec::new()),
        },
    }
}

#[async_trait]
impl SegmentationGateway for HttpSegmentationGateway {
    async fn segment(&self, file_path: &Path, choice: ModelChoice) -> Result<Vec<Artifact>, TransportFailure> {
        let bytes = tokio::fs::read(file_path)
            .await
            .map_err(|e| TransportFailure::Unreachable(format!("{}: {e}", file_path.display())))?;
        let name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.png".into());
        let form = Form::new().part("file", Part::bytes(bytes).file_name(name));

        let res = self
            .http
            .post(self.endpoint(choice))
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportFailure::Unreachable(e.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            return Err(TransportFailure::Status(status.as_u16()));
        }
        let body = res.bytes().await.map_err(|e| TransportFailure::Unreachable(e.to_string()))?;
        parse_reply(choice, &body)
    }
}
