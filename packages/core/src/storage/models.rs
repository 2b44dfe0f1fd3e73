// Модели данных: DTO сервера и представление сообщений на клиенте

use crate::payload::contract::ContractPayload;
use crate::payload::params::{filter_empty_params, params_from_snapshot, ProductParams};
use crate::payload::quote::{parse_quote_payload, QuotePayload};
use crate::payload::system::SystemPayload;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Предмет переговоров
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubjectType {
    /// Предложение поставщика: локальный пользователь покупает
    Supply,
    /// Заявка покупателя: локальный пользователь продаёт
    Need,
}

/// Беседа (как её отдаёт сервер)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: i64,
    pub peer_user_id: i64,
    #[serde(default)]
    pub peer_user_name: Option<String>,
    #[serde(default)]
    pub peer_nick_name: Option<String>,
    #[serde(default)]
    pub peer_company_name: Option<String>,
    #[serde(default)]
    pub subject_type: Option<SubjectType>,
    #[serde(default)]
    pub subject_id: Option<i64>,
    /// Снимок предмета на момент открытия, не меняется
    #[serde(default)]
    pub subject_snapshot_json: Option<String>,
    #[serde(default)]
    pub last_content: Option<String>,
    #[serde(default)]
    pub last_time: Option<String>,
    #[serde(default)]
    pub unread_count: u32,
}

impl Conversation {
    /// Минимальная запись для только что открытой беседы
    pub fn opened(
        id: i64,
        peer_user_id: i64,
        subject_type: SubjectType,
        subject_id: i64,
        subject_snapshot_json: Option<String>,
    ) -> Self {
        Self {
            id,
            peer_user_id,
            peer_user_name: None,
            peer_nick_name: None,
            peer_company_name: None,
            subject_type: Some(subject_type),
            subject_id: Some(subject_id),
            subject_snapshot_json,
            last_content: None,
            last_time: None,
            unread_count: 0,
        }
    }

    /// Имя собеседника: компания, ник, логин, затем id
    pub fn peer_display_name(&self) -> String {
        [&self.peer_company_name, &self.peer_nick_name, &self.peer_user_name]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("User {}", self.peer_user_id))
    }

    pub fn subject_snapshot(&self) -> Option<serde_json::Value> {
        self.subject_snapshot_json
            .as_deref()
            .and_then(crate::payload::parse_payload_value)
    }

    /// Непустые параметры товара из снимка предмета
    pub fn subject_params(&self) -> ProductParams {
        self.subject_snapshot()
            .map(|snapshot| filter_empty_params(&params_from_snapshot(&snapshot)))
            .unwrap_or_default()
    }

    /// Снимок помечен как базисная сделка
    pub fn is_basis_trade(&self) -> bool {
        self.subject_snapshot().is_some_and(|snapshot| {
            snapshot
                .get("tradeType")
                .and_then(|v| v.as_str())
                .is_some_and(|t| t.eq_ignore_ascii_case("BASIS"))
                || snapshot.get("basisPrice").is_some_and(|v| !v.is_null())
        })
    }
}

/// Сообщение в формате сервера
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub id: i64,
    #[serde(default)]
    pub conversation_id: Option<i64>,
    pub from_user_id: i64,
    #[serde(default)]
    pub to_user_id: Option<i64>,
    #[serde(default)]
    pub msg_type: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub payload_json: Option<String>,
    #[serde(default)]
    pub quote_status: Option<String>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub create_time: Option<String>,
}

/// Идентификатор сообщения: серверный или временный
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Server(i64),
    Temp(String),
}

impl MessageId {
    pub fn server(&self) -> Option<i64> {
        match self {
            MessageId::Server(id) => Some(*id),
            MessageId::Temp(_) => None,
        }
    }

    pub fn is_temp(&self) -> bool {
        matches!(self, MessageId::Temp(_))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Server(id) => write!(f, "{}", id),
            MessageId::Temp(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

/// Тип сообщения
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    Text,
    Quote,
    Image,
    Attachment,
    Contract,
    System,
}

impl MessageKind {
    /// Неизвестный тип считается текстом
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_uppercase()).as_deref() {
            Some("QUOTE") => MessageKind::Quote,
            Some("IMAGE") => MessageKind::Image,
            Some("ATTACHMENT") => MessageKind::Attachment,
            Some("CONTRACT") => MessageKind::Contract,
            Some("SYSTEM") => MessageKind::System,
            _ => MessageKind::Text,
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            MessageKind::Text => "TEXT",
            MessageKind::Quote => "QUOTE",
            MessageKind::Image => "IMAGE",
            MessageKind::Attachment => "ATTACHMENT",
            MessageKind::Contract => "CONTRACT",
            MessageKind::System => "SYSTEM",
        }
    }

    /// Текст-заглушка для структурированных сообщений
    pub fn placeholder(&self) -> &'static str {
        match self {
            MessageKind::Quote => "[Quote]",
            MessageKind::Image => "[Image]",
            MessageKind::Attachment => "[Attachment]",
            MessageKind::Contract => "[Contract]",
            MessageKind::Text | MessageKind::System => "",
        }
    }
}

/// Статус котировки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuoteStatus {
    Offered,
    Accepted,
    Rejected,
    Expired,
}

impl QuoteStatus {
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "OFFERED" => Some(QuoteStatus::Offered),
            "ACCEPTED" => Some(QuoteStatus::Accepted),
            "REJECTED" => Some(QuoteStatus::Rejected),
            "EXPIRED" => Some(QuoteStatus::Expired),
            _ => None,
        }
    }
}

/// Статус доставки локального сообщения
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending, // Создано, ждёт подтверждения
    Sent,    // Подтверждено сервером
    Failed,  // Ошибка отправки
}

/// Сообщение в ленте клиента
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiMessage {
    pub id: MessageId,
    pub conversation_id: i64,
    pub direction: Direction,
    pub kind: MessageKind,
    /// Всегда заполнен: для структурированных типов это подпись
    pub content: String,
    /// Сырой JSON, разбирается лениво
    pub payload_json: Option<String>,
    pub quote_status: Option<QuoteStatus>,
    pub delivery_status: Option<DeliveryStatus>,
    pub created_at: Option<String>,
    pub from_user_id: Option<i64>,
    pub to_user_id: Option<i64>,
}

impl UiMessage {
    /// Преобразовать серверное сообщение; направление по отправителю
    pub fn from_server(msg: &ServerMessage, local_user_id: i64, fallback_conversation_id: i64) -> Self {
        let kind = MessageKind::from_wire(msg.msg_type.as_deref());
        let raw_content = msg.content.clone().unwrap_or_default();

        let content = match kind {
            MessageKind::Image | MessageKind::Attachment | MessageKind::Contract => {
                kind.placeholder().to_string()
            }
            MessageKind::Quote if raw_content.trim().is_empty() => kind.placeholder().to_string(),
            _ => raw_content,
        };

        Self {
            id: MessageId::Server(msg.id),
            conversation_id: msg.conversation_id.unwrap_or(fallback_conversation_id),
            direction: if msg.from_user_id == local_user_id {
                Direction::Sent
            } else {
                Direction::Received
            },
            kind,
            content,
            payload_json: msg.payload_json.clone().filter(|p| !p.trim().is_empty()),
            quote_status: msg.quote_status.as_deref().and_then(QuoteStatus::from_wire),
            delivery_status: None,
            created_at: msg.create_time.clone(),
            from_user_id: Some(msg.from_user_id),
            to_user_id: msg.to_user_id,
        }
    }

    pub fn server_id(&self) -> Option<i64> {
        self.id.server()
    }

    pub fn is_quote(&self) -> bool {
        self.kind == MessageKind::Quote
    }

    pub fn quote_payload(&self) -> Option<QuotePayload> {
        if !self.is_quote() {
            return None;
        }
        self.payload_json.as_deref().and_then(parse_quote_payload)
    }

    pub fn contract_payload(&self) -> Option<ContractPayload> {
        if self.kind != MessageKind::Contract {
            return None;
        }
        self.payload_json.as_deref().and_then(ContractPayload::parse)
    }

    pub fn system_payload(&self) -> Option<SystemPayload> {
        if self.kind != MessageKind::System {
            return None;
        }
        self.payload_json.as_deref().and_then(SystemPayload::parse)
    }
}
