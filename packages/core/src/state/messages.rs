// Лента сообщений активной беседы
// Оптимистичные сообщения с временными id и их сверка с ответами сервера

use crate::api::ChatApi;
use crate::payload::contract::ContractPayload;
use crate::payload::quote::QuotePayload;
use crate::storage::models::{
    DeliveryStatus, Direction, MessageId, MessageKind, QuoteStatus, ServerMessage, UiMessage,
};
use crate::utils::error::Result;
use crate::utils::time::now_iso;
use crate::utils::uuid::generate_temp_id;
use std::collections::HashMap;

/// Сообщения одной беседы в порядке поступления.
///
/// Позиция в массиве единственный признак порядка: производные
/// представления берут последнее по позиции, а не по времени.
#[derive(Debug, Clone)]
pub struct MessageStore {
    local_user_id: i64,
    conversation_id: Option<i64>,
    messages: Vec<UiMessage>,
    /// temp id -> индекс в `messages`
    pending: HashMap<String, usize>,
    has_more: bool,
}

impl MessageStore {
    pub fn new(local_user_id: i64) -> Self {
        Self {
            local_user_id,
            conversation_id: None,
            messages: Vec::new(),
            pending: HashMap::new(),
            has_more: true,
        }
    }

    pub fn local_user_id(&self) -> i64 {
        self.local_user_id
    }

    pub fn conversation_id(&self) -> Option<i64> {
        self.conversation_id
    }

    pub fn messages(&self) -> &[UiMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Сколько сообщений ещё ждут подтверждения
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    // ========================================================================
    // История
    // ========================================================================

    /// Загрузить последние `limit` сообщений беседы с сервера.
    ///
    /// При ошибке лента не меняется, ошибка возвращается вызывающему.
    pub async fn load_history<A: ChatApi>(
        &mut self,
        api: &A,
        conversation_id: i64,
        limit: usize,
    ) -> Result<usize> {
        use tracing::{debug, warn};

        let server_messages = api
            .conversation_messages(conversation_id, limit)
            .await
            .map_err(|e| {
                warn!("Failed to load history for conversation {}: {}", conversation_id, e);
                e
            })?;

        let count = server_messages.len();
        self.replace_history(conversation_id, server_messages, limit);
        debug!("Loaded {} messages for conversation {}", count, conversation_id);
        Ok(count)
    }

    /// Заменить ленту ответом сервера (от новых к старым)
    pub fn replace_history(&mut self, conversation_id: i64, server_messages: Vec<ServerMessage>, limit: usize) {
        self.has_more = limit > 0 && server_messages.len() >= limit;
        self.messages = server_messages
            .iter()
            .rev()
            .map(|msg| UiMessage::from_server(msg, self.local_user_id, conversation_id))
            .collect();
        self.pending.clear();
        self.conversation_id = Some(conversation_id);
    }

    /// Переключиться на беседу без загрузки истории
    pub fn reset_for(&mut self, conversation_id: Option<i64>) {
        self.clear();
        self.conversation_id = conversation_id;
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.pending.clear();
        self.has_more = true;
    }

    // ========================================================================
    // Оптимистичная отправка
    // ========================================================================

    /// Добавить локальное сообщение в статусе pending.
    ///
    /// Возвращает копию с новым временным id для отправки по каналу.
    pub fn add_pending_message(
        &mut self,
        conversation_id: i64,
        kind: MessageKind,
        content: impl Into<String>,
        payload_json: Option<String>,
    ) -> UiMessage {
        let message = UiMessage {
            id: MessageId::Temp(generate_temp_id()),
            conversation_id,
            direction: Direction::Sent,
            kind,
            content: content.into(),
            payload_json,
            quote_status: (kind == MessageKind::Quote).then_some(QuoteStatus::Offered),
            delivery_status: Some(DeliveryStatus::Pending),
            created_at: Some(now_iso()),
            from_user_id: Some(self.local_user_id),
            to_user_id: None,
        };

        if let MessageId::Temp(temp_id) = &message.id {
            self.pending.insert(temp_id.clone(), self.messages.len());
        }
        self.messages.push(message.clone());
        message
    }

    fn position_of_temp(&self, temp_id: &str) -> Option<usize> {
        let is_match = |index: usize| {
            self.messages
                .get(index)
                .is_some_and(|m| matches!(&m.id, MessageId::Temp(id) if id == temp_id))
        };

        match self.pending.get(temp_id) {
            Some(&index) if is_match(index) => Some(index),
            // таблица могла устареть после удаления; ищем перебором
            _ => (0..self.messages.len()).find(|&index| is_match(index)),
        }
    }

    fn position_of_server(&self, id: i64) -> Option<usize> {
        self.messages.iter().position(|m| m.server_id() == Some(id))
    }

    /// Подтверждение сервера: временный id заменяется серверным на месте.
    ///
    /// `false`, если временный id неизвестен.
    pub fn confirm_message(&mut self, temp_id: &str, real_id: i64) -> bool {
        use tracing::debug;

        let Some(index) = self.position_of_temp(temp_id) else {
            debug!("SENT for unknown temp id {}", temp_id);
            return false;
        };
        self.pending.remove(temp_id);

        let message = &mut self.messages[index];
        message.id = MessageId::Server(real_id);
        message.delivery_status = Some(DeliveryStatus::Sent);

        // то же сообщение могло прийти раньше подтверждения
        if let Some(duplicate) = self
            .messages
            .iter()
            .enumerate()
            .position(|(i, m)| i != index && m.server_id() == Some(real_id))
        {
            self.messages.remove(duplicate);
            self.reindex_pending();
        }
        true
    }

    /// Ошибка отправки: сообщение остаётся в ленте со статусом failed
    pub fn fail_message(&mut self, temp_id: &str) -> bool {
        let Some(index) = self.position_of_temp(temp_id) else {
            return false;
        };
        self.pending.remove(temp_id);
        self.messages[index].delivery_status = Some(DeliveryStatus::Failed);
        true
    }

    /// Подготовить повторную отправку failed сообщения под новым временным id.
    ///
    /// Позиция в ленте сохраняется.
    pub fn retry_message(&mut self, temp_id: &str) -> Option<UiMessage> {
        let index = self.position_of_temp(temp_id)?;
        if self.messages[index].delivery_status != Some(DeliveryStatus::Failed) {
            return None;
        }

        let fresh = generate_temp_id();
        let message = &mut self.messages[index];
        message.id = MessageId::Temp(fresh.clone());
        message.delivery_status = Some(DeliveryStatus::Pending);
        let retried = message.clone();

        self.pending.remove(temp_id);
        self.pending.insert(fresh, index);
        Some(retried)
    }

    fn reindex_pending(&mut self) {
        self.pending = self
            .messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.delivery_status == Some(DeliveryStatus::Pending))
            .filter_map(|(i, m)| match &m.id {
                MessageId::Temp(id) => Some((id.clone(), i)),
                MessageId::Server(_) => None,
            })
            .collect();
    }

    // ========================================================================
    // Входящие
    // ========================================================================

    /// Принять сообщение из канала.
    ///
    /// Сообщения чужих бесед игнорируются; уже известный серверный id
    /// обновляется на месте. Возвращает `true`, если лента изменилась.
    pub fn handle_incoming(&mut self, message: &ServerMessage, active_conversation_id: Option<i64>) -> bool {
        let Some(active) = active_conversation_id else {
            return false;
        };
        if message.conversation_id.is_some_and(|id| id != active) {
            return false;
        }

        let incoming = UiMessage::from_server(message, self.local_user_id, active);
        match self.position_of_server(message.id) {
            Some(index) => {
                let existing = &mut self.messages[index];
                let delivery_status = existing.delivery_status;
                *existing = incoming;
                existing.delivery_status = delivery_status;
            }
            None => self.messages.push(incoming),
        }
        true
    }

    /// Обновить известное сообщение (например, статус котировки).
    ///
    /// Неизвестные сообщения не добавляются.
    pub fn merge_update(&mut self, message: &ServerMessage) -> bool {
        let Some(index) = self.position_of_server(message.id) else {
            return false;
        };
        let fallback = self.messages[index].conversation_id;
        let incoming = UiMessage::from_server(message, self.local_user_id, fallback);

        let existing = &mut self.messages[index];
        if message.quote_status.is_some() {
            existing.quote_status = incoming.quote_status;
        }
        if incoming.payload_json.is_some() {
            existing.payload_json = incoming.payload_json;
        }
        if message.content.as_deref().is_some_and(|c| !c.trim().is_empty()) {
            existing.content = incoming.content;
        }
        true
    }

    pub fn update_quote_status(&mut self, message_id: i64, status: QuoteStatus) -> bool {
        match self.position_of_server(message_id) {
            Some(index) => {
                self.messages[index].quote_status = Some(status);
                true
            }
            None => false,
        }
    }

    pub fn update_message_payload(&mut self, message_id: i64, payload_json: String) -> bool {
        match self.position_of_server(message_id) {
            Some(index) => {
                self.messages[index].payload_json = Some(payload_json);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, message_id: i64) -> Option<&UiMessage> {
        self.position_of_server(message_id).map(|index| &self.messages[index])
    }

    pub fn find_by_temp_id(&self, temp_id: &str) -> Option<&UiMessage> {
        self.position_of_temp(temp_id).map(|index| &self.messages[index])
    }

    // ========================================================================
    // Производные представления
    // ========================================================================

    pub fn quote_messages(&self) -> Vec<&UiMessage> {
        self.messages.iter().filter(|m| m.is_quote()).collect()
    }

    /// Последняя разбираемая котировка собеседника
    pub fn latest_received_quote(&self) -> Option<(&UiMessage, QuotePayload)> {
        self.messages
            .iter()
            .rev()
            .filter(|m| m.is_quote() && m.direction == Direction::Received)
            .find_map(|m| m.quote_payload().map(|quote| (m, quote)))
    }

    /// Последняя котировка с любой стороны (основа для встречной)
    pub fn latest_quote(&self) -> Option<(&UiMessage, QuotePayload)> {
        self.messages
            .iter()
            .rev()
            .filter(|m| m.is_quote())
            .find_map(|m| m.quote_payload().map(|quote| (m, quote)))
    }

    pub fn has_accepted_quote(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.is_quote() && m.quote_status == Some(QuoteStatus::Accepted))
    }

    pub fn latest_accepted_quote_message(&self) -> Option<&UiMessage> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.is_quote() && m.quote_status == Some(QuoteStatus::Accepted))
    }

    /// Последнее сообщение-контракт; `None`, если его payload не разбирается
    pub fn latest_contract_message(&self) -> Option<(&UiMessage, ContractPayload)> {
        let message = self
            .messages
            .iter()
            .rev()
            .find(|m| m.kind == MessageKind::Contract)?;
        message.contract_payload().map(|contract| (message, contract))
    }

    /// Котировки собеседника, ждущие ответа
    pub fn pending_quote_messages(&self) -> Vec<&UiMessage> {
        self.messages
            .iter()
            .filter(|m| {
                m.is_quote()
                    && m.direction == Direction::Received
                    && m.quote_status == Some(QuoteStatus::Offered)
            })
            .collect()
    }

    pub fn latest_pending_quote(&self) -> Option<&UiMessage> {
        self.pending_quote_messages().into_iter().last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ME: i64 = 1;
    const PEER: i64 = 2;

    fn server_msg(id: i64, from: i64, kind: &str, payload: Option<&str>) -> ServerMessage {
        ServerMessage {
            id,
            conversation_id: Some(10),
            from_user_id: from,
            to_user_id: Some(if from == ME { PEER } else { ME }),
            msg_type: Some(kind.to_string()),
            content: Some(format!("message {}", id)),
            payload_json: payload.map(str::to_string),
            quote_status: None,
            read: false,
            create_time: None,
        }
    }

    fn quote_msg(id: i64, from: i64, price: &str, status: &str) -> ServerMessage {
        let mut msg = server_msg(
            id,
            from,
            "QUOTE",
            Some(&format!(r#"{{"price":"{}","quantity":"50"}}"#, price)),
        );
        msg.quote_status = Some(status.to_string());
        msg
    }

    fn store_with(history: Vec<ServerMessage>) -> MessageStore {
        let mut store = MessageStore::new(ME);
        let mut newest_first = history;
        newest_first.reverse();
        store.replace_history(10, newest_first, 50);
        store
    }

    #[test]
    fn test_history_reversed_and_has_more() {
        let mut store = MessageStore::new(ME);
        let newest_first = vec![
            server_msg(3, PEER, "TEXT", None),
            server_msg(2, ME, "TEXT", None),
            server_msg(1, PEER, "TEXT", None),
        ];

        store.replace_history(10, newest_first.clone(), 3);
        let ids: Vec<_> = store.messages().iter().map(|m| m.server_id()).collect();
        assert_eq!(ids, vec![Some(1), Some(2), Some(3)]);
        assert!(store.has_more());
        assert_eq!(store.messages()[1].direction, Direction::Sent);

        store.replace_history(10, newest_first, 50);
        assert!(!store.has_more());
    }

    #[test]
    fn test_pending_then_confirm_in_place() {
        let mut store = store_with(vec![server_msg(1, PEER, "TEXT", None)]);
        let pending = store.add_pending_message(10, MessageKind::Text, "hello", None);
        let temp_id = pending.id.to_string();

        assert!(pending.id.is_temp());
        assert_eq!(pending.delivery_status, Some(DeliveryStatus::Pending));
        assert_eq!(store.pending_count(), 1);

        assert!(store.confirm_message(&temp_id, 501));
        assert_eq!(store.len(), 2);
        assert_eq!(store.messages()[1].id, MessageId::Server(501));
        assert_eq!(store.messages()[1].delivery_status, Some(DeliveryStatus::Sent));
        assert_eq!(store.pending_count(), 0);

        assert!(!store.confirm_message(&temp_id, 502));
    }

    #[test]
    fn test_fail_keeps_message_and_retry_reissues_id() {
        let mut store = MessageStore::new(ME);
        store.reset_for(Some(10));
        let first = store.add_pending_message(10, MessageKind::Text, "a", None).id.to_string();
        let second = store.add_pending_message(10, MessageKind::Text, "b", None).id.to_string();

        assert!(store.fail_message(&first));
        assert_eq!(store.messages()[0].delivery_status, Some(DeliveryStatus::Failed));
        assert_eq!(store.len(), 2);

        let retried = store.retry_message(&first).unwrap();
        assert_ne!(retried.id.to_string(), first);
        assert_eq!(store.messages()[0].id, retried.id);
        assert_eq!(store.messages()[0].delivery_status, Some(DeliveryStatus::Pending));

        // повтор только для failed
        assert!(store.retry_message(&second).is_none());
    }

    #[test]
    fn test_incoming_filtered_by_active_conversation() {
        let mut store = store_with(vec![]);
        let mut other = server_msg(5, PEER, "TEXT", None);
        other.conversation_id = Some(99);

        assert!(!store.handle_incoming(&other, Some(10)));
        assert!(!store.handle_incoming(&server_msg(6, PEER, "TEXT", None), None));
        assert!(store.handle_incoming(&server_msg(6, PEER, "TEXT", None), Some(10)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_incoming_duplicate_merged_in_place() {
        let mut store = store_with(vec![quote_msg(1, PEER, "420", "OFFERED"), server_msg(2, ME, "TEXT", None)]);

        assert!(store.handle_incoming(&quote_msg(1, PEER, "420", "ACCEPTED"), Some(10)));
        assert_eq!(store.len(), 2);
        assert_eq!(store.messages()[0].quote_status, Some(QuoteStatus::Accepted));
    }

    #[test]
    fn test_confirm_after_echo_removes_duplicate() {
        let mut store = store_with(vec![]);
        let temp_id = store
            .add_pending_message(10, MessageKind::Text, "hi", None)
            .id
            .to_string();
        let later = store
            .add_pending_message(10, MessageKind::Text, "again", None)
            .id
            .to_string();

        store.handle_incoming(&server_msg(700, ME, "TEXT", None), Some(10));
        assert_eq!(store.len(), 3);

        assert!(store.confirm_message(&temp_id, 700));
        assert_eq!(store.len(), 2);
        assert_eq!(store.messages()[0].server_id(), Some(700));
        assert!(store.confirm_message(&later, 701));
        assert_eq!(store.messages()[1].server_id(), Some(701));
    }

    #[test]
    fn test_quote_views_latest_by_position() {
        let mut store = store_with(vec![
            quote_msg(1, PEER, "430", "REJECTED"),
            quote_msg(2, ME, "415", "OFFERED"),
            quote_msg(3, PEER, "420", "OFFERED"),
            server_msg(4, PEER, "QUOTE", Some("not json")),
        ]);

        let (message, quote) = store.latest_received_quote().unwrap();
        assert_eq!(message.server_id(), Some(3));
        assert_eq!(quote.quantity(), Some("50"));

        assert_eq!(store.quote_messages().len(), 4);
        assert_eq!(store.pending_quote_messages().len(), 1);
        assert_eq!(store.latest_pending_quote().and_then(|m| m.server_id()), Some(3));
        assert!(!store.has_accepted_quote());

        assert!(store.update_quote_status(3, QuoteStatus::Accepted));
        assert!(store.has_accepted_quote());
        assert_eq!(store.latest_accepted_quote_message().and_then(|m| m.server_id()), Some(3));
        assert!(store.latest_pending_quote().is_none());
        assert!(!store.update_quote_status(404, QuoteStatus::Rejected));
    }

    #[test]
    fn test_latest_contract_unparseable_is_none() {
        let mut store = store_with(vec![
            server_msg(1, PEER, "CONTRACT", Some(r#"{"contractId":5,"status":1}"#)),
            server_msg(2, PEER, "CONTRACT", Some("{broken")),
        ]);
        assert!(store.latest_contract_message().is_none(), "Older contract must not be used");

        assert!(store.update_message_payload(2, r#"{"contractId":5,"status":2}"#.to_string()));
        let (message, _) = store.latest_contract_message().unwrap();
        assert_eq!(message.server_id(), Some(2));
    }

    #[test]
    fn test_merge_update_ignores_unknown() {
        let mut store = store_with(vec![quote_msg(1, PEER, "420", "OFFERED")]);
        let mut update = quote_msg(1, PEER, "420", "EXPIRED");
        update.content = None;

        assert!(store.merge_update(&update));
        assert_eq!(store.messages()[0].quote_status, Some(QuoteStatus::Expired));
        assert_eq!(store.messages()[0].content, "message 1");
        assert!(!store.merge_update(&quote_msg(2, PEER, "400", "OFFERED")));
    }
}
