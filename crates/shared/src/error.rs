use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Best-effort shape of a JSON error body returned by the payroll API.
///
/// Nothing depends on this being present; when a body does not parse, the
/// caller falls back to its own message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message
            .or(self.error)
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("response reported success=false")]
    Unsuccessful { message: Option<String> },
}

impl EnvelopeError {
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Unsuccessful { message } => message.as_deref(),
        }
    }
}
