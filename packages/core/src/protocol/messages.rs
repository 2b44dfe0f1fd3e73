// Типы кадров протокола реального времени
// JSON-объекты с полем "type"

use crate::storage::models::{MessageKind, ServerMessage};
use serde::{Deserialize, Serialize};

// ============================================================================
// Client Frame Data Structures
// ============================================================================

/// Отправка сообщения в беседу
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendData {
    pub conversation_id: i64,
    pub msg_type: MessageKind,
    pub content: String,
    /// payload передаётся строкой с JSON внутри
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    /// Корреляция с подтверждением SENT / ERROR
    pub temp_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRef {
    pub conversation_id: i64,
}

/// Типы кадров (клиент -> сервер)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientFrame {
    Send(SendData),
    Typing(ConversationRef),
    Read(ConversationRef),
    Ping,
}

impl ClientFrame {
    pub fn typing(conversation_id: i64) -> Self {
        ClientFrame::Typing(ConversationRef { conversation_id })
    }

    pub fn read(conversation_id: i64) -> Self {
        ClientFrame::Read(ConversationRef { conversation_id })
    }
}

// ============================================================================
// Server Frame Data Structures
// ============================================================================

/// Новое или обновлённое сообщение
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePush {
    #[serde(default)]
    pub conversation_id: Option<i64>,
    pub message: ServerMessage,
}

impl MessagePush {
    /// id беседы из кадра или из самого сообщения
    pub fn conversation_id(&self) -> Option<i64> {
        self.conversation_id.or(self.message.conversation_id)
    }
}

/// Подтверждение отправки: tempId -> id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentAck {
    #[serde(default)]
    pub conversation_id: Option<i64>,
    #[serde(default, alias = "messageId")]
    pub id: Option<i64>,
    #[serde(default)]
    pub temp_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorData {
    #[serde(default, alias = "error")]
    pub message: Option<String>,
    #[serde(default)]
    pub temp_id: Option<String>,
}

/// Индикаторы собеседника (набирает текст, прочитал)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerSignal {
    #[serde(default)]
    pub conversation_id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTime {
    #[serde(default)]
    pub server_time: Option<String>,
}

/// Типы кадров (сервер -> клиент)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerFrame {
    Message(MessagePush),
    OfferUpdated(MessagePush),
    MessageUpdate(MessagePush),
    Sent(SentAck),
    Error(ErrorData),
    Typing(PeerSignal),
    Read(PeerSignal),
    Connected(ServerTime),
    Pong(ServerTime),
}
