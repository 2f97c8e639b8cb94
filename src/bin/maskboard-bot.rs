use std::sync::Arc;

use maskboard::adapters::telegram::{client::TelegramClient, gateway::HttpSegmentationGateway, TelegramBot};
use maskboard::application::services::ConversationService;
use maskboard::{config::BotConfig, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cfg = BotConfig::from_env()?;
    tokio::fs::create_dir_all(&cfg.download_dir).await?;

    let client = Arc::new(TelegramClient::new(&cfg.token, &cfg.download_dir, cfg.poll_timeout_secs));
    let gateway = Arc::new(HttpSegmentationGateway::new(&cfg.api_url));
    let conversations = Arc::new(ConversationService::new(client.clone(), gateway));

    tracing::info!(api = %cfg.api_url, "segmentation bot starting");
    TelegramBot::new(client, conversations, cfg.poll_timeout_secs).run().await;

    Ok(())
}
