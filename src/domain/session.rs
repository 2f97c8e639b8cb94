use std::path::PathBuf;

use super::artifact::Artifact;
use super::errors::{SessionError, TransportFailure};
use super::model::ModelChoice;

pub const WELCOME: &str = "Hi! I am an image segmentation bot.";
pub const UPLOAD_PROMPT: &str = "Upload your image.";
pub const CHOOSE_MODEL: &str = "Please choose a model for segmentation:";
pub const PLEASE_WAIT: &str = "Please wait, your image is being processed...";
pub const STILL_PROCESSING: &str = "Your previous image is still being processed, please wait.";
pub const NO_OBJECTS: &str = "No objects were detected in the image.";
pub const SEGMENTATION_FAILED: &str = "Sorry, an error occurred while segmenting the image.";
pub const TRY_OTHER_MODELS: &str = "Try other models for segmentation:";
pub const UPLOAD_NEW: &str = "Or upload a new image.";
pub const DOWNLOAD_FAILED: &str = "Could not fetch your image, please send it again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingModelChoice,
    Processing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Greeting,
    MediaReceived { file_path: PathBuf },
    ChoiceSelected(ModelChoice),
    /// Outcome of the external segmentation call requested by [`Reply::Segment`].
    SegmentationFinished(Result<Vec<Artifact>, TransportFailure>),
}

/// What the session wants the front-end to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Menu { text: String, options: Vec<ModelChoice> },
    Photo { path: PathBuf },
    /// Call the segmentation service and feed the outcome back as
    /// [`SessionEvent::SegmentationFinished`].
    Segment { file_path: PathBuf, choice: ModelChoice },
}

impl Reply {
    fn text(s: impl Into<String>) -> Self {
        Reply::Text(s.into())
    }

    fn menu(text: &str) -> Self {
        Reply::Menu { text: text.to_string(), options: ModelChoice::menu() }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub uploaded_file: Option<PathBuf>,
    pub state: SessionState,
}

impl Session {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id, uploaded_file: None, state: SessionState::Idle }
    }

    pub fn handle(&mut self, event: SessionEvent) -> Vec<Reply> {
        match event {
            SessionEvent::Greeting => vec![Reply::text(WELCOME), Reply::text(UPLOAD_PROMPT)],
            SessionEvent::MediaReceived { file_path } => {
                self.uploaded_file = Some(file_path);
                self.state = SessionState::AwaitingModelChoice;
                vec![Reply::menu(CHOOSE_MODEL)]
            }
            SessionEvent::ChoiceSelected(choice) => self.on_choice(choice),
            SessionEvent::SegmentationFinished(outcome) => self.on_finished(outcome),
        }
    }

    fn on_choice(&mut self, choice: ModelChoice) -> Vec<Reply> {
        if self.state == SessionState::Processing {
            return vec![Reply::text(STILL_PROCESSING)];
        }
        let Some(file_path) = self.uploaded_file.clone() else {
            self.state = SessionState::Idle;
            return vec![Reply::text(SessionError::MissingUpload.to_string())];
        };
        self.state = SessionState::Processing;
        vec![Reply::text(PLEASE_WAIT), Reply::Segment { file_path, choice }]
    }

    fn on_finished(&mut self, outcome: Result<Vec<Artifact>, TransportFailure>) -> Vec<Reply> {
        let mut replies = Vec::new();
        match outcome {
            Ok(artifacts) if artifacts.is_empty() => replies.push(Reply::text(NO_OBJECTS)),
            Ok(artifacts) => {
                for artifact in artifacts {
                    replies.push(Reply::Photo { path: artifact.path });
                    replies.push(Reply::Text(format!("Model: {}", artifact.model_label)));
                }
            }
            Err(_) => replies.push(Reply::text(SEGMENTATION_FAILED)),
        }
        self.state = SessionState::AwaitingModelChoice;
        replies.push(Reply::menu(TRY_OTHER_MODELS));
        replies.push(Reply::text(UPLOAD_NEW));
        replies
    }
}
