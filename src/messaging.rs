//! Inbound control messages from the settings surface.

use crate::settings::MonitoringSettings;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::warn;

/// Message delivered asynchronously to the running watcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum InboundMessage {
    UpdateSettings { settings: MonitoringSettings },
}

/// Reply sent back for each handled message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// One command on the controller's inbound queue, carrying its reply slot
#[derive(Debug)]
pub struct WatcherCommand {
    pub message: InboundMessage,
    pub reply: oneshot::Sender<MessageResponse>,
}

/// Parse a raw message envelope. Unrecognized actions are ignored with a
/// warning, per the channel contract.
pub fn parse_message(raw: &str) -> Option<InboundMessage> {
    match serde_json::from_str(raw) {
        Ok(message) => Some(message),
        Err(e) => {
            warn!(error = %e, "ignoring unrecognized message");
            None
        }
    }
}
