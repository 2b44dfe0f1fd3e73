// REST контракты сервера переговоров
// Ядро обращается к ним только через трейт ChatApi

#[cfg(feature = "native")]
pub mod http;

use crate::storage::models::{Conversation, ServerMessage, SubjectType};
use crate::utils::error::{NegotiationError, Result};
use serde::{Deserialize, Serialize};

/// Конверт ответа `{code, message, data}`; `code == 0` означает успех
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i32,
    #[serde(default)]
    pub message: Option<String>,
    // отсутствующее поле и так даёт None; `default` потребовал бы T: Default
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 0,
            message: None,
            data: Some(data),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Данные успешного ответа или `ApiError` с кодом сервера
    pub fn into_result(self) -> Result<Option<T>> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(NegotiationError::ApiError {
                code: self.code,
                message: self.message.unwrap_or_else(|| "request failed".to_string()),
            })
        }
    }

    /// То же, но отсутствие `data` тоже ошибка
    pub fn into_data(self) -> Result<T> {
        self.into_result()?
            .ok_or_else(|| NegotiationError::NotFound("response data is empty".to_string()))
    }
}

/// Открыть (или найти) беседу по паре собеседник + предмет
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenConversationRequest {
    pub peer_user_id: i64,
    pub subject_type: SubjectType,
    pub subject_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_snapshot_json: Option<String>,
}

/// Создать контракт из принятой котировки
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContractRequest {
    pub quote_message_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<String>,
}

/// REST операции, нужные ядру.
///
/// Реализации возвращают `ApiError` для ответов с ненулевым `code`;
/// `conversation_messages` отдаёт сообщения от новых к старым.
#[allow(async_fn_in_trait)]
pub trait ChatApi {
    async fn list_conversations(&self) -> Result<Vec<Conversation>>;

    async fn conversation_messages(&self, conversation_id: i64, limit: usize) -> Result<Vec<ServerMessage>>;

    async fn open_conversation(&self, request: &OpenConversationRequest) -> Result<i64>;

    async fn mark_conversation_read(&self, conversation_id: i64) -> Result<()>;

    async fn confirm_offer(&self, message_id: i64) -> Result<()>;

    async fn reject_offer(&self, message_id: i64) -> Result<()>;

    async fn create_contract_from_quote(&self, request: &CreateContractRequest) -> Result<i64>;
}
