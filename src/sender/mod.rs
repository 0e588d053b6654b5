//! Remote send operation.
//!
//! The resync driver and the coordinator both deliver through `ChatSender`,
//! so a message takes the same wire path whether it is sent directly or
//! replayed from the queue.

mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::HttpChatSender;

/// Reply from the assistant API, forwarded without interpretation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatReply(pub serde_json::Value);

/// Why a delivery attempt failed.
///
/// `Display` is the human-readable text reported back to the UI.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DeliveryError {
    /// No HTTP response: connect failure, DNS, timeout
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-success status
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// Success status but the connection dropped while reading the body
    #[error("Connection lost while reading response: {0}")]
    Interrupted(String),

    /// Success status but the body is not JSON
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
}

impl DeliveryError {
    /// Whether the failure means "could not reach the server", which makes
    /// the message worth queueing instead of failing it
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Sends one chat message to the remote assistant.
#[async_trait]
pub trait ChatSender: Send + Sync {
    async fn send(&self, message: &str) -> Result<ChatReply, DeliveryError>;
}
