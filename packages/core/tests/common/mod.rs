//! Общие заглушки для интеграционных тестов: REST API в памяти и сокет,
//! записывающий отправленные кадры

#![allow(dead_code)]

use negotiation_core::api::{ChatApi, CreateContractRequest, OpenConversationRequest};
use negotiation_core::protocol::transport::ConnectionId;
use negotiation_core::protocol::wire::decode_server_frame;
use negotiation_core::protocol::{Connector, Socket, SocketEvent, Transport};
use negotiation_core::state::NegotiationSession;
use negotiation_core::storage::models::{Conversation, ServerMessage, SubjectType};
use negotiation_core::storage::MemoryStorage;
use negotiation_core::utils::error::{NegotiationError, Result};
use negotiation_core::Config;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const ME: i64 = 1;
pub const PEER: i64 = 2;

/// REST сервер в памяти
#[derive(Default)]
pub struct FakeApi {
    pub conversations: RefCell<Vec<Conversation>>,
    pub histories: RefCell<HashMap<i64, Vec<ServerMessage>>>,
    pub contract_requests: RefCell<Vec<CreateContractRequest>>,
    pub confirmed: RefCell<Vec<i64>>,
    pub open_calls: Cell<u32>,
    pub fail_offers: Cell<bool>,
    pub next_id: Cell<i64>,
}

impl FakeApi {
    pub fn with_conversations(conversations: Vec<Conversation>) -> Self {
        let api = Self::default();
        *api.conversations.borrow_mut() = conversations;
        api.next_id.set(100);
        api
    }

    /// История задаётся в хронологическом порядке
    pub fn set_history(&self, conversation_id: i64, chronological: Vec<ServerMessage>) {
        let mut newest_first = chronological;
        newest_first.reverse();
        self.histories.borrow_mut().insert(conversation_id, newest_first);
    }
}

impl ChatApi for FakeApi {
    async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        Ok(self.conversations.borrow().clone())
    }

    async fn conversation_messages(&self, conversation_id: i64, limit: usize) -> Result<Vec<ServerMessage>> {
        let histories = self.histories.borrow();
        let messages = histories.get(&conversation_id).cloned().unwrap_or_default();
        Ok(messages.into_iter().take(limit).collect())
    }

    async fn open_conversation(&self, request: &OpenConversationRequest) -> Result<i64> {
        self.open_calls.set(self.open_calls.get() + 1);
        let mut conversations = self.conversations.borrow_mut();
        if let Some(existing) = conversations.iter().find(|c| {
            c.peer_user_id == request.peer_user_id
                && c.subject_type == Some(request.subject_type)
                && c.subject_id == Some(request.subject_id)
        }) {
            return Ok(existing.id);
        }

        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        conversations.push(Conversation::opened(
            id,
            request.peer_user_id,
            request.subject_type,
            request.subject_id,
            request.subject_snapshot_json.clone(),
        ));
        Ok(id)
    }

    async fn mark_conversation_read(&self, _conversation_id: i64) -> Result<()> {
        Ok(())
    }

    async fn confirm_offer(&self, message_id: i64) -> Result<()> {
        if self.fail_offers.get() {
            return Err(NegotiationError::ApiError {
                code: 4001,
                message: "offer expired".to_string(),
            });
        }
        self.confirmed.borrow_mut().push(message_id);
        Ok(())
    }

    async fn reject_offer(&self, _message_id: i64) -> Result<()> {
        if self.fail_offers.get() {
            return Err(NegotiationError::NetworkError("offline".to_string()));
        }
        Ok(())
    }

    async fn create_contract_from_quote(&self, request: &CreateContractRequest) -> Result<i64> {
        self.contract_requests.borrow_mut().push(request.clone());
        Ok(9001)
    }
}

/// Кадры, ушедшие в сокет
#[derive(Clone, Default)]
pub struct Wire {
    pub sent: Arc<Mutex<Vec<String>>>,
}

impl Wire {
    pub fn frames(&self) -> Vec<serde_json::Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect()
    }

    pub fn last_send(&self) -> serde_json::Value {
        self.frames()
            .into_iter()
            .rev()
            .find(|f| f["type"] == "SEND")
            .expect("no SEND frame")
    }
}

pub struct FakeSocket(Wire);

impl Socket for FakeSocket {
    fn send_text(&mut self, text: String) -> Result<()> {
        self.0.sent.lock().unwrap().push(text);
        Ok(())
    }

    fn close(&mut self) {}
}

pub struct FakeConnector(Wire);

impl Connector for FakeConnector {
    type Socket = FakeSocket;

    fn open(&mut self, _url: &str, _id: ConnectionId) -> Result<FakeSocket> {
        Ok(FakeSocket(self.0.clone()))
    }
}

pub type TestSession = NegotiationSession<FakeApi, FakeConnector, MemoryStorage>;

pub fn conversation(id: i64, peer: i64, subject: SubjectType) -> Conversation {
    Conversation::opened(id, peer, subject, id * 10, None)
}

/// Сессия с беседами `conversations`, ещё без соединения
pub fn session(api: FakeApi) -> (TestSession, Wire) {
    let wire = Wire::default();
    let config = Config::default();
    let transport = Transport::new(FakeConnector(wire.clone()), &config);
    let session = NegotiationSession::new(api, transport, MemoryStorage::new(), ME, &config);
    (session, wire)
}

/// Открыть соединение и применить событие Connected
pub fn open_channel(session: &mut TestSession) {
    session.connect();
    let id = session.transport().connection_id();
    session.transport_mut().handle_socket_event(SocketEvent::Opened(id));
    session.drain_transport();
}

/// Подать кадр сервера в сессию так, как его доставил бы сокет
pub fn deliver(session: &mut TestSession, json: &str) {
    assert!(decode_server_frame(json).is_ok(), "bad test frame {}", json);
    let id = session.transport().connection_id();
    session
        .transport_mut()
        .handle_socket_event(SocketEvent::Text(id, json.to_string()));
    session.drain_transport();
}

pub fn message(id: i64, conversation_id: i64, from: i64, kind: &str, content: &str, payload: Option<&str>) -> ServerMessage {
    ServerMessage {
        id,
        conversation_id: Some(conversation_id),
        from_user_id: from,
        to_user_id: Some(if from == ME { PEER } else { ME }),
        msg_type: Some(kind.to_string()),
        content: Some(content.to_string()),
        payload_json: payload.map(str::to_string),
        quote_status: None,
        read: false,
        create_time: Some(format!("2025-03-01T10:{:02}:00", id % 60)),
    }
}

pub fn quote(id: i64, conversation_id: i64, from: i64, payload: &str, status: &str) -> ServerMessage {
    let mut msg = message(id, conversation_id, from, "QUOTE", "", Some(payload));
    msg.quote_status = Some(status.to_string());
    msg
}

/// Кадр MESSAGE / OFFER_UPDATED с сообщением внутри
pub fn push_frame(frame_type: &str, message: &ServerMessage) -> String {
    serde_json::json!({
        "type": frame_type,
        "conversationId": message.conversation_id,
        "message": message,
    })
    .to_string()
}

pub const SPOT_QUOTE: &str =
    r#"{"kind":"QUOTE_V2","tradeType":"SPOT","fields":{"price":"4500","quantity":"100","unit":"ton"}}"#;

/// Активная беседа 10 о предложении поставщика (мы покупатель) с историей
pub async fn negotiating(history: Vec<ServerMessage>) -> (TestSession, Wire) {
    let api = FakeApi::with_conversations(vec![conversation(10, PEER, SubjectType::Supply)]);
    api.set_history(10, history);
    let (mut session, wire) = session(api);
    session.load_conversations().await.unwrap();
    open_channel(&mut session);
    session.select_conversation(10).await.unwrap();
    (session, wire)
}
