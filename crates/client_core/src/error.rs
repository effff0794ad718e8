use shared::error::EnvelopeError;
use thiserror::Error;

use crate::coordinator::IntentKind;

/// Any failure of the record repository. The variants only exist so logs say
/// what went wrong; callers collapse all of them into one user-facing message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("{method} {url} returned HTTP {status}")]
    Status {
        method: String,
        url: String,
        status: u16,
        message: Option<String>,
    },
    #[error("failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },
    #[error(transparent)]
    Rejected(#[from] EnvelopeError),
    #[error("server returned an employee without an id")]
    MissingId,
    #[error("repository request aborted: {0}")]
    Aborted(String),
}

impl RepositoryError {
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            Self::Rejected(err) => err.message(),
            Self::Transport { .. }
            | Self::Decode { .. }
            | Self::MissingId
            | Self::Aborted(_) => None,
        }
    }

    pub fn user_message(&self, intent: IntentKind) -> String {
        self.server_message()
            .map(str::to_string)
            .unwrap_or_else(|| intent.fallback_message().to_string())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("{message}")]
    Failed { intent: IntentKind, message: String },
    #[error("synchronization coordinator has shut down")]
    CoordinatorClosed,
}

impl SyncError {
    pub fn from_repository(intent: IntentKind, err: &RepositoryError) -> Self {
        Self::Failed {
            intent,
            message: err.user_message(intent),
        }
    }

    pub fn intent(&self) -> Option<IntentKind> {
        match self {
            Self::Failed { intent, .. } => Some(*intent),
            Self::CoordinatorClosed => None,
        }
    }
}
