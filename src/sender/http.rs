//! HTTP implementation of the remote send operation.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::config::ChatApiConfig;

use super::{ChatReply, ChatSender, DeliveryError};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

/// POSTs `{"message": ...}` to the assistant chat endpoint.
pub struct HttpChatSender {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpChatSender {
    pub fn new(config: &ChatApiConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DeliveryError::Network(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.chat_url(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl ChatSender for HttpChatSender {
    async fn send(&self, message: &str) -> Result<ChatReply, DeliveryError> {
        let mut req = self.client.post(&self.url).json(&ChatRequest { message });
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = error_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
            });
            tracing::debug!(status = status.as_u16(), %message, "Chat API rejected message");
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        // Status already received, so the server has the message
        let body = resp
            .bytes()
            .await
            .map_err(|e| DeliveryError::Interrupted(e.to_string()))?;

        serde_json::from_slice::<Value>(&body)
            .map(ChatReply)
            .map_err(|e| DeliveryError::InvalidResponse(e.to_string()))
    }
}

/// Pull a readable message out of an API error body.
///
/// Looks at `message`, then `detail`, then `error` (string or object with a
/// `message` field).
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    for field in ["message", "detail", "error"] {
        match value.get(field) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Object(obj)) => {
                if let Some(Value::String(s)) = obj.get("message") {
                    return Some(s.clone());
                }
            }
            _ => {}
        }
    }

    None
}
