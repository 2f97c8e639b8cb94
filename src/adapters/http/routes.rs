use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::path::{Path as FsPath, PathBuf};
use tracing::{error, info, warn};

use crate::adapters::http::state::HttpState;
use crate::application::dto::{
    AllModelsResponse, ErrorResponse, ModelsResponse, OkResponse, SegmentedImage,
    SingleModelResponse, NO_OBJECTS_DETECTED,
};
use crate::domain::{artifact::SegmentationOutcome, model::ModelKey};

const UPLOAD_FIELD: &str = "file";
const FALLBACK_FILE_NAME: &str = "upload.png";

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

/// Reads the `file` field and stores it under `upload_dir`, keeping only the
/// final path component of the client-supplied name.
async fn receive_upload(upload_dir: &FsPath, mut multipart: Multipart) -> Result<(PathBuf, Vec<u8>), Response> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("malformed upload: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .and_then(|n| FsPath::new(n).file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("malformed upload: {e}")))?;
        if bytes.is_empty() {
            return Err(error_response(StatusCode::BAD_REQUEST, "uploaded file is empty"));
        }

        let path = upload_dir.join(&file_name);
        tokio::fs::write(&path, &bytes).await.map_err(|e| {
            error!("failed to store upload {}: {e}", path.display());
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to store upload")
        })?;
        info!(file = %path.display(), bytes = bytes.len(), "upload stored");
        return Ok((path, bytes.to_vec()));
    }
    Err(error_response(StatusCode::BAD_REQUEST, "missing 'file' field"))
}

pub async fn segment_single(
    State(st): State<HttpState>,
    Path(model_key): Path<String>,
    multipart: Multipart,
) -> Response {
    let Ok(key) = model_key.parse::<ModelKey>() else {
        return error_response(StatusCode::NOT_FOUND, format!("Unknown model: {model_key}"));
    };
    let (_, bytes) = match receive_upload(&st.upload_dir, multipart).await {
        Ok(upload) => upload,
        Err(resp) => return resp,
    };

    match st.segmentation.segment_with(key, bytes).await {
        Ok(SegmentationOutcome::Rendered(artifact)) => {
            Json(SingleModelResponse::Segmented(SegmentedImage::from(artifact))).into_response()
        }
        Ok(SegmentationOutcome::NoDetections) => {
            Json(SingleModelResponse::Error(ErrorResponse::new(NO_OBJECTS_DETECTED))).into_response()
        }
        Err(failure) => {
            warn!("{failure}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, failure.to_string())
        }
    }
}

pub async fn segment_all_models(State(st): State<HttpState>, multipart: Multipart) -> Response {
    let (_, bytes) = match receive_upload(&st.upload_dir, multipart).await {
        Ok(upload) => upload,
        Err(resp) => return resp,
    };

    let result = st.segmentation.segment_all(bytes).await;
    Json(AllModelsResponse {
        segmented_images: result.artifacts.into_iter().map(SegmentedImage::from).collect(),
    })
    .into_response()
}

pub async fn list_models(State(st): State<HttpState>) -> impl IntoResponse {
    Json(ModelsResponse::from_keys(
        st.segmentation.roster().entries().iter().map(|e| (e.key, e.label.clone())),
    ))
}

pub async fn health() -> impl IntoResponse {
    Json(OkResponse { ok: true })
}
