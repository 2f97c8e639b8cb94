use std::sync::Arc;

use maskboard::adapters::{
    http::{router, state::HttpState},
    onnx::model_catalog::OnnxModelCatalog,
};
use maskboard::application::{
    pipeline::SegmentationPipeline, render::ResultComposer, roster::Roster,
    services::SegmentationService,
};
use maskboard::{config::ApiConfig, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cfg = ApiConfig::from_env()?;

    tracing::info!(models = %cfg.models_dir.display(), "loading model roster");
    let catalog = OnnxModelCatalog::new(&cfg.models_dir, cfg.input_size);
    let roster = Arc::new(Roster::from_catalog(&catalog));

    tokio::fs::create_dir_all(&cfg.upload_dir).await?;
    let composer = ResultComposer::new(&cfg.results_dir)?;
    let pipeline = SegmentationPipeline::new(composer);
    let pipeline = Arc::new(if cfg.save_masks { pipeline } else { pipeline.without_mask_files() });
    let segmentation = Arc::new(SegmentationService::new(roster, pipeline));

    let state = HttpState { segmentation, upload_dir: cfg.upload_dir.clone() };
    let app = router(state, &cfg.results_dir, cfg.max_upload_bytes);

    tracing::info!("segmentation API listening on http://{}", cfg.bind_addr);
    tracing::info!("results served from {}", cfg.results_dir.display());

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
