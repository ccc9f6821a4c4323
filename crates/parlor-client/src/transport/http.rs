//! Message submission over the HTTP trigger.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use parlor_core::types::ConversationId;
use parlor_entity::{Message, MessageFormat};

use super::TransportError;

/// Submits a message and returns the server's canonical record.
#[async_trait]
pub trait MessageSubmitter: Send + Sync + 'static {
    /// Posts `content` to `conversation_id` on behalf of the token holder.
    async fn submit(
        &self,
        token: &str,
        conversation_id: ConversationId,
        content: &str,
        format: MessageFormat,
    ) -> Result<Message, TransportError>;
}

impl std::fmt::Debug for dyn MessageSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{MessageSubmitter}}")
    }
}

#[derive(Serialize)]
struct SendBody<'a> {
    content: &'a str,
    format: MessageFormat,
}

#[derive(Deserialize)]
struct CreatedBody {
    message: Message,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// `POST /api/conversations/{id}/messages` via `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpSubmitter {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSubmitter {
    /// `base_url` is the server root, e.g. `http://localhost:4433`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MessageSubmitter for HttpSubmitter {
    async fn submit(
        &self,
        token: &str,
        conversation_id: ConversationId,
        content: &str,
        format: MessageFormat,
    ) -> Result<Message, TransportError> {
        let url = format!(
            "{}/api/conversations/{conversation_id}/messages",
            self.base_url
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&SendBody { content, format })
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body: CreatedBody = response
                .json()
                .await
                .map_err(|e| TransportError::Request(e.to_string()))?;
            return Ok(body.message);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string(),
        };
        debug!(status = status.as_u16(), %message, "Message submission rejected");
        Err(TransportError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}
