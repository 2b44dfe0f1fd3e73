// HTTP клиент REST API на reqwest

use crate::api::{ApiEnvelope, ChatApi, CreateContractRequest, OpenConversationRequest};
use crate::config::Config;
use crate::storage::models::{Conversation, ServerMessage};
use crate::utils::error::Result;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Реализация `ChatApi` поверх HTTP с bearer токеном
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpChatApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.api_base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<ApiEnvelope<T>> {
        use tracing::warn;

        let response = self.authorized(request).send().await?;
        let status = response.status();
        let envelope = response.json::<ApiEnvelope<T>>().await.map_err(|e| {
            warn!("Unreadable API response (HTTP {}): {}", status, e);
            e
        })?;

        if !envelope.is_success() {
            warn!(
                "API call failed: code={} message={}",
                envelope.code,
                envelope.message.as_deref().unwrap_or("")
            );
        }
        Ok(envelope)
    }
}

impl ChatApi for HttpChatApi {
    async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let request = self.client.get(self.url("/api/chat/conversations"));
        let conversations: Option<Vec<Conversation>> = self.execute(request).await?.into_result()?;
        Ok(conversations.unwrap_or_default())
    }

    async fn conversation_messages(&self, conversation_id: i64, limit: usize) -> Result<Vec<ServerMessage>> {
        let request = self
            .client
            .get(self.url(&format!("/api/chat/conversations/{}/messages", conversation_id)))
            .query(&[("limit", limit)]);
        let messages: Option<Vec<ServerMessage>> = self.execute(request).await?.into_result()?;
        Ok(messages.unwrap_or_default())
    }

    async fn open_conversation(&self, request: &OpenConversationRequest) -> Result<i64> {
        let http = self.client.post(self.url("/api/chat/conversations/open")).json(request);
        self.execute(http).await?.into_data()
    }

    async fn mark_conversation_read(&self, conversation_id: i64) -> Result<()> {
        let request = self
            .client
            .post(self.url(&format!("/api/chat/conversations/{}/read", conversation_id)));
        self.execute::<serde_json::Value>(request).await?.into_result()?;
        Ok(())
    }

    async fn confirm_offer(&self, message_id: i64) -> Result<()> {
        let request = self
            .client
            .post(self.url(&format!("/api/chat/offers/{}/confirm", message_id)));
        self.execute::<serde_json::Value>(request).await?.into_result()?;
        Ok(())
    }

    async fn reject_offer(&self, message_id: i64) -> Result<()> {
        let request = self
            .client
            .post(self.url(&format!("/api/chat/offers/{}/reject", message_id)));
        self.execute::<serde_json::Value>(request).await?.into_result()?;
        Ok(())
    }

    async fn create_contract_from_quote(&self, request: &CreateContractRequest) -> Result<i64> {
        let http = self.client.post(self.url("/api/contracts/from-quote")).json(request);
        self.execute(http).await?.into_data()
    }
}
