use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::{
    application::{
        orchestrator::ModelOrchestrator,
        pipeline::SegmentationPipeline,
        ports::{ChatPort, SegmentationGateway},
        roster::Roster,
    },
    domain::{
        artifact::{OrchestrationResult, SegmentationOutcome},
        errors::{ModelFailure, SegmentError},
        model::ModelKey,
        session::{ChatId, Reply, Session, SessionEvent, UserId, SEGMENTATION_FAILED},
    },
};

/// Runs the segmentation pipeline on Tokio's blocking pool.
#[derive(Clone)]
pub struct SegmentationService {
    roster: Arc<Roster>,
    pipeline: Arc<SegmentationPipeline>,
}

impl SegmentationService {
    pub fn new(roster: Arc<Roster>, pipeline: Arc<SegmentationPipeline>) -> Self {
        Self { roster, pipeline }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub async fn segment_with(
        &self,
        key: ModelKey,
        image: Vec<u8>,
    ) -> Result<SegmentationOutcome, ModelFailure> {
        let entry = self.roster.get(key).cloned().ok_or_else(|| {
            ModelFailure::new(key.label(), SegmentError::Worker("model not in roster".into()))
        })?;
        let label = entry.label.clone();
        let pipeline = Arc::clone(&self.pipeline);

        tokio::task::spawn_blocking(move || pipeline.run(&image, &entry))
            .await
            .map_err(|e| ModelFailure::new(label, SegmentError::Worker(e.to_string())))?
    }

    pub async fn segment_all(&self, image: Vec<u8>) -> OrchestrationResult {
        let roster = Arc::clone(&self.roster);
        let pipeline = Arc::clone(&self.pipeline);

        match tokio::task::spawn_blocking(move || {
            ModelOrchestrator::new(&pipeline).run_all(&image, roster.entries())
        })
        .await
        {
            Ok(result) => result,
            Err(e) => {
                error!("all-models worker crashed: {e}");
                OrchestrationResult::default()
            }
        }
    }
}

/// Drives one [`Session`] per user and carries out its replies.
///
/// Events of the same user are handled one after another; different users
/// never wait on each other.
pub struct ConversationService {
    chat: Arc<dyn ChatPort>,
    gateway: Arc<dyn SegmentationGateway>,
    sessions: DashMap<UserId, Arc<Mutex<Session>>>,
}

impl ConversationService {
    pub fn new(chat: Arc<dyn ChatPort>, gateway: Arc<dyn SegmentationGateway>) -> Self {
        Self { chat, gateway, sessions: DashMap::new() }
    }

    pub async fn dispatch(&self, user: UserId, chat: ChatId, event: SessionEvent) {
        let session = self.session(user);
        let mut session = session.lock().await;

        let mut pending: VecDeque<Reply> = session.handle(event).into();
        while let Some(reply) = pending.pop_front() {
            match reply {
                Reply::Segment { file_path, choice } => {
                    info!(user = user.0, choice = choice.as_str(), "requesting segmentation");
                    let outcome = self.gateway.segment(&file_path, choice).await;
                    if let Err(e) = &outcome {
                        error!(user = user.0, choice = choice.as_str(), "segmentation call failed: {e}");
                    }
                    pending.extend(session.handle(SessionEvent::SegmentationFinished(outcome)));
                }
                other => self.deliver(chat, other).await,
            }
        }
    }

    /// Snapshot of a user's session, if one exists.
    pub async fn session_snapshot(&self, user: UserId) -> Option<Session> {
        let session = self.sessions.get(&user).map(|s| Arc::clone(&s))?;
        let guard = session.lock().await;
        Some(guard.clone())
    }

    fn session(&self, user: UserId) -> Arc<Mutex<Session>> {
        Arc::clone(
            &self
                .sessions
                .entry(user)
                .or_insert_with(|| Arc::new(Mutex::new(Session::new(user)))),
        )
    }

    async fn deliver(&self, chat: ChatId, reply: Reply) {
        let sent = match &reply {
            Reply::Text(text) => self.chat.send_text(chat, text).await,
            Reply::Menu { text, options } => self.chat.send_menu(chat, text, options).await,
            Reply::Photo { path } => match self.chat.send_photo(chat, path).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    warn!(path = %path.display(), "could not deliver artifact: {e}");
                    self.chat.send_text(chat, SEGMENTATION_FAILED).await
                }
            },
            Reply::Segment { .. } => Ok(()),
        };
        if let Err(e) = sent {
            error!(chat = chat.0, "failed to send reply: {e}");
        }
    }
}
