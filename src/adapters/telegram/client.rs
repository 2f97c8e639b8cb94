use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::types::{ApiResponse, File, Update};
use crate::application::ports::ChatPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::ModelChoice;
use crate::domain::session::ChatId;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Thin Bot API client over `reqwest`.
pub struct TelegramClient {
    http: reqwest::Client,
    base: String,
    token: String,
    download_dir: PathBuf,
}

impl TelegramClient {
    /// `poll_timeout_secs` bounds `getUpdates`; the HTTP timeout leaves headroom above it.
    pub fn new(token: impl Into<String>, download_dir: impl Into<PathBuf>, poll_timeout_secs: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + 30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http, base: DEFAULT_API_BASE.into(), token: token.into(), download_dir: download_dir.into() }
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base = base.into().trim_end_matches('/').to_string();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.base, self.token, file_path)
    }

    async fn unwrap_reply<T: DeserializeOwned>(method: &str, res: reqwest::Response) -> DomainResult<T> {
        let body: ApiResponse<T> = res
            .json()
            .await
            .map_err(|e| DomainError::OperationFailed(format!("{method}: unreadable reply: {e}")))?;
        match (body.ok, body.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(DomainError::OperationFailed(format!(
                "{method}: {}",
                body.description.unwrap_or_else(|| "request rejected".into())
            ))),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, payload: &Value) -> DomainResult<T> {
        let res = self
            .http
            .post(self.method_url(method))
            .json(payload)
            .send()
            .await
            .map_err(|e| DomainError::OperationFailed(format!("{method}: {e}")))?;
        Self::unwrap_reply(method, res).await
    }

    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> DomainResult<Vec<Update>> {
        self.call(
            "getUpdates",
            &json!({ "offset": offset, "timeout": timeout_secs, "allowed_updates": ["message", "callback_query"] }),
        )
        .await
    }
}

/// One button per row, the callback data being the choice's wire name.
pub fn inline_keyboard(options: &[ModelChoice]) -> Value {
    let rows: Vec<Value> = options
        .iter()
        .map(|o| json!([{ "text": o.button_text(), "callback_data": o.as_str() }]))
        .collect();
    json!({ "inline_keyboard": rows })
}

#[async_trait]
impl ChatPort for TelegramClient {
    async fn send_text(&self, chat: ChatId, text: &str) -> DomainResult<()> {
        let _: Value = self.call("sendMessage", &json!({ "chat_id": chat.0, "text": text })).await?;
        Ok(())
    }

    async fn send_menu(&self, chat: ChatId, text: &str, options: &[ModelChoice]) -> DomainResult<()> {
        let payload = json!({ "chat_id": chat.0, "text": text, "reply_markup": inline_keyboard(options) });
        let _: Value = self.call("sendMessage", &payload).await?;
        Ok(())
    }

    async fn send_photo(&self, chat: ChatId, path: &Path) -> DomainResult<()> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| DomainError::NotFound(format!("{}: {e}", path.display())))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "result.png".into());
        let form = Form::new()
            .text("chat_id", chat.0.to_string())
            .part("photo", Part::bytes(bytes).file_name(name));

        let res = self
            .http
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| DomainError::OperationFailed(format!("sendPhoto: {e}")))?;
        let _: Value = Self::unwrap_reply("sendPhoto", res).await?;
        Ok(())
    }

    async fn acknowledge(&self, callback_id: &str) -> DomainResult<()> {
        let _: bool = self.call("answerCallbackQuery", &json!({ "callback_query_id": callback_id })).await?;
        Ok(())
    }

    async fn download(&self, file_id: &str, file_name: &str) -> DomainResult<PathBuf> {
        let file: File = self.call("getFile", &json!({ "file_id": file_id })).await?;
        let remote = file
            .file_path
            .ok_or_else(|| DomainError::NotFound(format!("no file path for {file_id}")))?;

        let bytes = self
            .http
            .get(self.file_url(&remote))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| DomainError::OperationFailed(format!("download {remote}: {e}")))?
            .bytes()
            .await
            .map_err(|e| DomainError::OperationFailed(format!("download {remote}: {e}")))?;

        let local_name = Path::new(file_name)
            .file_name()
            .ok_or_else(|| DomainError::InvalidInput(format!("bad file name: {file_name}")))?;
        let dest = self.download_dir.join(local_name);
        tokio::fs::write(&dest, &bytes)
            .await
            .map_err(|e| DomainError::OperationFailed(format!("{}: {e}", dest.display())))?;
        debug!(file = %dest.display(), bytes = bytes.len(), "file downloaded");
        Ok(dest)
    }
}
