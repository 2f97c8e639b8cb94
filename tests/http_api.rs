mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use maskboard::adapters::http::{router, state::HttpState};
use maskboard::application::{
    pipeline::SegmentationPipeline, render::ResultComposer, services::SegmentationService,
};
use maskboard::domain::model::ModelKey;

struct TestApp {
    router: Router,
    dir: TempDir,
}

fn app() -> TestApp {
    app_with_limit(20 * 1024 * 1024)
}

fn app_with_limit(max_upload_bytes: usize) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("results");
    let uploads = dir.path().join("uploads");
    std::fs::create_dir_all(&uploads).unwrap();

    let pipeline = SegmentationPipeline::new(ResultComposer::new(&results).unwrap());
    let segmentation = Arc::new(SegmentationService::new(Arc::new(common::roster()), Arc::new(pipeline)));
    let state = HttpState { segmentation, upload_dir: uploads };
    TestApp { router: router(state, &results, max_upload_bytes), dir }
}

fn upload(uri: &str, field: &str, bytes: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, common::content_type())
        .body(Body::from(common::multipart_body(field, "cat.png", bytes)))
        .unwrap()
}

async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn single_model_returns_composite_with_legend_panel() {
    let app = app();
    let (status, body) =
        send(&app, upload("/segment_image/yolov8n_seg/", "file", &common::png_bytes(400, 300))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_name"], ModelKey::Yolov8nSeg.label());
    let path = body["image_path"].as_str().unwrap();
    let composite = image::open(path).unwrap();
    assert_eq!((composite.width(), composite.height()), (600, 300));

    // The upload itself is kept under the upload directory.
    assert!(app.dir.path().join("uploads").join("cat.png").exists());
}

#[tokio::test]
async fn model_without_detections_reports_an_error_body() {
    let app = app();
    let (status, body) =
        send(&app, upload("/segment_image/yolov8x_seg/", "file", &common::png_bytes(64, 64))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({"error": "No objects detected"}));
}

#[tokio::test]
async fn failing_model_is_a_server_error() {
    let app = app();
    let (status, body) =
        send(&app, upload("/segment_image/fast_sam_s/", "file", &common::png_bytes(64, 64))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("weights corrupted"));
}

#[tokio::test]
async fn all_models_skips_failures_and_empty_results() {
    let app = app();
    let (status, body) =
        send(&app, upload("/segment_image/all_models/", "file", &common::png_bytes(120, 80))).await;
    assert_eq!(status, StatusCode::OK);

    let images = body["segmented_images"].as_array().unwrap();
    let names: Vec<&str> = images.iter().map(|i| i["model_name"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        vec![ModelKey::SamB.label(), ModelKey::MobileSam.label(), ModelKey::Yolov8nSeg.label()]
    );
    for image in images {
        let meta = std::fs::metadata(image["image_path"].as_str().unwrap()).unwrap();
        assert!(meta.len() > 0);
    }
}

#[tokio::test]
async fn unknown_model_is_not_found() {
    let app = app();
    let (status, body) =
        send(&app, upload("/segment_image/resnet/", "file", &common::png_bytes(8, 8))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Unknown model: resnet");
}

#[tokio::test]
async fn missing_file_field_is_a_bad_request() {
    let app = app();
    let (status, _) = send(&app, upload("/segment_image/sam_b/", "image", &common::png_bytes(8, 8))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, upload("/segment_image/all_models/", "file", b"")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn models_and_health_endpoints() {
    let app = app();
    let get = |uri: &str| Request::builder().uri(uri).body(Body::empty()).unwrap();

    let (status, body) = send(&app, get("/models")).await;
    assert_eq!(status, StatusCode::OK);
    let keys: Vec<&str> = body["models"].as_array().unwrap().iter().map(|m| m["key"].as_str().unwrap()).collect();
    assert_eq!(keys, vec!["sam_b", "mobile_sam", "fast_sam_s", "yolov8x_seg", "yolov8n_seg"]);
    assert_eq!(body["all_models"], "all_models");

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn oversized_upload_is_refused() {
    let app = app_with_limit(16);
    let resp = app
        .router
        .clone()
        .oneshot(upload("/segment_image/yolov8n_seg/", "file", &common::png_bytes(64, 64)))
        .await
        .unwrap();
    assert_ne!(resp.status(), StatusCode::OK);
    assert!(resp.status().is_client_error());
    assert!(!app.dir.path().join("uploads").join("cat.png").exists());
}
