pub mod client;
pub mod gateway;
pub mod types;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::adapters::telegram::client::TelegramClient;
use crate::adapters::telegram::types::{Message, Update};
use crate::application::ports::ChatPort;
use crate::application::services::ConversationService;
use crate::domain::model::ModelChoice;
use crate::domain::session::{ChatId, SessionEvent, UserId, DOWNLOAD_FAILED};

const RETRY_DELAY: Duration = Duration::from_secs(3);

/// What an update asks of the bot, stripped of transport detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Start { user: UserId, chat: ChatId },
    Media { user: UserId, chat: ChatId, file_id: String, file_name: String },
    Choice { user: UserId, chat: ChatId, callback_id: String, data: String },
}

fn media_of(message: &Message) -> Option<(String, String)> {
    if let Some(largest) = message
        .photo
        .as_ref()
        .and_then(|sizes| sizes.iter().max_by_key(|p| u64::from(p.width) * u64::from(p.height)))
    {
        return Some((largest.file_id.clone(), format!("{}.png", largest.file_id)));
    }
    message.document.as_ref().map(|doc| {
        let name = doc.file_name.clone().unwrap_or_else(|| format!("{}.png", doc.file_id));
        (doc.file_id.clone(), name)
    })
}

/// `/start`, optionally addressed to a bot as `/start@name`.
fn is_start_command(cmd: &str) -> bool {
    cmd == "/start" || cmd.starts_with("/start@")
}

pub fn classify(update: &Update) -> Option<Inbound> {
    if let Some(cb) = &update.callback_query {
        let chat = cb.message.as_ref().map_or(cb.from.id, |m| m.chat.id);
        return Some(Inbound::Choice {
            user: UserId(cb.from.id),
            chat: ChatId(chat),
            callback_id: cb.id.clone(),
            data: cb.data.clone().unwrap_or_default(),
        });
    }

    let message = update.message.as_ref()?;
    let chat = ChatId(message.chat.id);
    let user = UserId(message.from.as_ref().map_or(message.chat.id, |u| u.id));

    if let Some((file_id, file_name)) = media_of(message) {
        return Some(Inbound::Media { user, chat, file_id, file_name });
    }
    match message.text.as_deref() {
        Some(text) if text.split_whitespace().next().is_some_and(is_start_command) => {
            Some(Inbound::Start { user, chat })
        }
        _ => None,
    }
}

/// Long-polls the Bot API and hands every update to its own task.
pub struct TelegramBot {
    client: Arc<TelegramClient>,
    conversations: Arc<ConversationService>,
    poll_timeout_secs: u64,
}

impl TelegramBot {
    pub fn new(client: Arc<TelegramClient>, conversations: Arc<ConversationService>, poll_timeout_secs: u64) -> Self {
        Self { client, conversations, poll_timeout_secs }
    }

    pub async fn run(self) {
        let mut offset = 0i64;
        info!("telegram polling started");
        loop {
            let updates = match self.client.get_updates(offset, self.poll_timeout_secs).await {
                Ok(updates) => updates,
                Err(e) => {
                    warn!("getUpdates failed: {e}");
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                let Some(inbound) = classify(&update) else {
                    debug!(update_id = update.update_id, "ignoring update");
                    continue;
                };
                let chat: Arc<dyn ChatPort> = self.client.clone();
                let conversations = Arc::clone(&self.conversations);
                tokio::spawn(async move { handle(chat, conversations, inbound).await });
            }
        }
    }
}

/// Turns one inbound action into session events. A failed download is
/// answered directly and never reaches the session.
pub async fn handle(client: Arc<dyn ChatPort>, conversations: Arc<ConversationService>, inbound: Inbound) {
    match inbound {
        Inbound::Start { user, chat } => conversations.dispatch(user, chat, SessionEvent::Greeting).await,
        Inbound::Media { user, chat, file_id, file_name } => match client.download(&file_id, &file_name).await {
            Ok(file_path) => {
                info!(user = user.0, file = %file_path.display(), "image received");
                conversations.dispatch(user, chat, SessionEvent::MediaReceived { file_path }).await;
            }
            Err(e) => {
                error!(user = user.0, "download failed: {e}");
                if let Err(e) = client.send_text(chat, DOWNLOAD_FAILED).await {
                    error!(chat = chat.0, "failed to send reply: {e}");
                }
            }
        },
        Inbound::Choice { user, chat, callback_id, data } => {
            if let Err(e) = client.acknowledge(&callback_id).await {
                warn!("answerCallbackQuery failed: {e}");
            }
            match data.parse::<ModelChoice>() {
                Ok(choice) => conversations.dispatch(user, chat, SessionEvent::ChoiceSelected(choice)).await,
                Err(_) => debug!(user = user.0, data = %data, "unrecognised callback data"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update(v: serde_json::Value) -> Update {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn start_command_is_a_greeting() {
        let u = update(json!({"update_id": 1, "message": {"chat": {"id": 7}, "from": {"id": 42}, "text": "/start"}}));
        assert_eq!(classify(&u), Some(Inbound::Start { user: UserId(42), chat: ChatId(7) }));

        let other = update(json!({"update_id": 2, "message": {"chat": {"id": 7}, "text": "hello"}}));
        assert_eq!(classify(&other), None);

        let addressed = update(json!({"update_id": 6, "message": {"chat": {"id": 7}, "text": "/start@maskboard_bot now"}}));
        assert_eq!(classify(&addressed), Some(Inbound::Start { user: UserId(7), chat: ChatId(7) }));

        let lookalike = update(json!({"update_id": 7, "message": {"chat": {"id": 7}, "text": "/startle"}}));
        assert_eq!(classify(&lookalike), None);
    }

    #[test]
    fn photos_pick_the_largest_size() {
        let u = update(json!({"update_id": 3, "message": {
            "chat": {"id": 7}, "from": {"id": 42},
            "photo": [
                {"file_id": "small", "width": 90, "height": 60},
                {"file_id": "big", "width": 1280, "height": 853},
                {"file_id": "mid", "width": 320, "height": 213}
            ]
        }}));
        assert_eq!(
            classify(&u),
            Some(Inbound::Media { user: UserId(42), chat: ChatId(7), file_id: "big".into(), file_name: "big.png".into() })
        );
    }

    #[test]
    fn documents_keep_their_name_and_callbacks_carry_data() {
        let doc = update(json!({"update_id": 4, "message": {
            "chat": {"id": 7}, "from": {"id": 42},
            "document": {"file_id": "d1", "file_name": "street.jpg"}
        }}));
        assert!(matches!(classify(&doc), Some(Inbound::Media { ref file_name, .. }) if file_name == "street.jpg"));

        let cb = update(json!({"update_id": 5, "callback_query": {
            "id": "cb1", "from": {"id": 42}, "message": {"chat": {"id": 7}}, "data": "sam_b"
        }}));
        assert_eq!(
            classify(&cb),
            Some(Inbound::Choice { user: UserId(42), chat: ChatId(7), callback_id: "cb1".into(), data: "sam_b".into() })
        );
    }
}
