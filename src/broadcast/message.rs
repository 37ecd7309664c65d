//! Messages pushed to live observers.

use std::sync::Arc;

use serde::Serialize;

use crate::broadcast::error::ChannelError;
use crate::capture::Exchange;

/// Envelope sent over the real-time channel as `{"type": ..., "data": ...}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum BroadcastMessage {
    /// A freshly recorded exchange.
    #[serde(rename = "new_log")]
    NewExchange(Arc<Exchange>),
    /// A bulk snapshot, oldest first.
    #[serde(rename = "log_list")]
    ExchangeList(Vec<Arc<Exchange>>),
}

impl BroadcastMessage {
    /// Serialize to the JSON text frame payload.
    pub fn encode(&self) -> Result<String, ChannelError> {
        serde_json::to_string(self).map_err(ChannelError::Encoding)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BroadcastMessage::NewExchange(_) => "new_log",
            BroadcastMessage::ExchangeList(_) => "log_list",
        }
    }
}
