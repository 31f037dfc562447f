//! Host application chat endpoints.
//!
//! The engine only talks to the host through [`ChatApi`], so tests and
//! embedders can substitute their own transport. [`HttpChatApi`] is the
//! production implementation over `reqwest`.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use chatdock_shared::{Conversation, ConversationId, Message, MessageId};

use crate::config::DockConfig;
use crate::error::{ClientError, Result};

#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Conversation summaries for the current user, in server order.
    async fn list_conversations(&self) -> Result<Vec<Conversation>>;

    async fn list_messages(&self, conversation: &ConversationId) -> Result<Vec<Message>>;

    /// Post a new message and return the created message.
    async fn send_message(&self, conversation: &ConversationId, content: &str) -> Result<Message>;

    /// Add the current user's `emoji` reaction; returns the updated message.
    async fn add_reaction(&self, message: &MessageId, emoji: &str) -> Result<Message>;

    /// Remove the current user's `emoji` reaction; returns the updated message.
    async fn remove_reaction(&self, message: &MessageId, emoji: &str) -> Result<Message>;
}

#[derive(Debug, Serialize)]
struct NewMessageBody<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ReactionBody<'a> {
    emoji: &'a str,
}

/// [`ChatApi`] over the host's JSON REST API.
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpChatApi {
    pub fn new(config: &DockConfig) -> Result<Self> {
        let base_url = config.api_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidUrl(config.api_url.clone()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            token: config.api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/chat/{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let resp = builder.send().await?;
        let resp = check_status(resp)?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    Err(ClientError::Status {
        status: status.as_u16(),
        url: resp.url().to_string(),
    })
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        self.send(self.request(Method::GET, "conversations")).await
    }

    async fn list_messages(&self, conversation: &ConversationId) -> Result<Vec<Message>> {
        let path = format!("conversations/{conversation}/messages");
        self.send(self.request(Method::GET, &path)).await
    }

    async fn send_message(&self, conversation: &ConversationId, content: &str) -> Result<Message> {
        debug!(conversation = %conversation, len = content.len(), "posting message");
        let path = format!("conversations/{conversation}/messages");
        let builder = self
            .request(Method::POST, &path)
            .json(&NewMessageBody { content });
        self.send(builder).await
    }

    async fn add_reaction(&self, message: &MessageId, emoji: &str) -> Result<Message> {
        let path = format!("messages/{message}/reactions");
        let builder = self.request(Method::POST, &path).json(&ReactionBody { emoji });
        self.send(builder).await
    }

    async fn remove_reaction(&self, message: &MessageId, emoji: &str) -> Result<Message> {
        let path = format!("messages/{message}/reactions");
        let builder = self
            .request(Method::DELETE, &path)
            .json(&ReactionBody { emoji });
        self.send(builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_endpoint_urls() {
        let config = DockConfig {
            api_url: "https://crm.example.com/".into(),
            ..DockConfig::default()
        };
        let api = HttpChatApi::new(&config).unwrap();
        assert_eq!(
            api.url("conversations/9/messages"),
            "https://crm.example.com/api/chat/conversations/9/messages"
        );
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let config = DockConfig {
            api_url: "ftp://crm.example.com".into(),
            ..DockConfig::default()
        };
        assert!(matches!(
            HttpChatApi::new(&config),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_request_bodies_match_host_payloads() {
        let body = serde_json::to_value(NewMessageBody { content: "hi" }).unwrap();
        assert_eq!(body, serde_json::json!({ "content": "hi" }));
        let body = serde_json::to_value(ReactionBody { emoji: "👍" }).unwrap();
        assert_eq!(body, serde_json::json!({ "emoji": "👍" }));
    }
}
