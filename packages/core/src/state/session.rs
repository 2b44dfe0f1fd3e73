// Сессия переговоров: связывает транспорт, ленту, список бесед и фазу сделки
//
// Все изменения синхронны и идут через &mut self; асинхронны только
// вызовы ChatApi. Пока такой вызов ждёт ответа, входящие кадры копятся
// в транспорте и применяются после.

use crate::api::{ChatApi, CreateContractRequest, OpenConversationRequest};
use crate::config::Config;
use crate::payload::attachment::{AttachmentPayload, ImagePayload};
use crate::payload::contract::{Amount, ContractPayload, ContractStatus};
use crate::payload::quote::{BasisQuote, QuoteBody, QuotePayload, SpotQuote};
use crate::payload::summary::{price_change_summary, summarize, summarize_opt};
use crate::payload::system::SystemPayload;
use crate::payload::{Party, TradeType};
use crate::protocol::messages::{ClientFrame, ErrorData, MessagePush, PeerSignal, SendData, SentAck};
use crate::protocol::transport::{ConnectionState, Connector, Transport, TransportEvent};
use crate::protocol::ServerFrame;
use crate::state::conversations::ConversationDirectory;
use crate::state::flow::{self, FlowState, NegotiationStatus, Perspective};
use crate::state::messages::MessageStore;
use crate::storage::models::{
    Conversation, DeliveryStatus, MessageKind, QuoteStatus, SubjectType, UiMessage,
};
use crate::storage::ArchiveStorage;
use crate::utils::error::{NegotiationError, Result};
use crate::utils::time::now_iso;
use crate::utils::validation::{validate_quote, validate_text_message};
use std::collections::VecDeque;

/// Текст, которым сопровождается принятие котировки
pub const QUOTE_ACCEPTED_NOTE: &str = "Quote accepted, contract can be drafted";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Уведомление для пользователя
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Параметры контракта поверх принятой котировки
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractDraft {
    pub title: Option<String>,
    pub delivery_date: Option<String>,
    pub delivery_address: Option<String>,
    pub payment_method: Option<String>,
    pub terms: Option<String>,
}

impl ContractDraft {
    fn into_request(self, quote_message_id: i64) -> CreateContractRequest {
        CreateContractRequest {
            quote_message_id,
            title: self.title,
            delivery_date: self.delivery_date,
            delivery_address: self.delivery_address,
            payment_method: self.payment_method,
            terms: self.terms,
        }
    }
}

/// Сессия одного пользователя
pub struct NegotiationSession<A: ChatApi, C: Connector, S: ArchiveStorage> {
    api: A,
    transport: Transport<C>,
    messages: MessageStore,
    directory: ConversationDirectory<S>,
    local_company_id: Option<i64>,
    history_limit: usize,
    notices: VecDeque<Notice>,
    /// Беседа, в которой собеседник сейчас печатает
    peer_typing: Option<i64>,
    /// Последняя беседа, прочитанная собеседником
    peer_read: Option<i64>,
}

impl<A: ChatApi, C: Connector, S: ArchiveStorage> NegotiationSession<A, C, S> {
    pub fn new(api: A, transport: Transport<C>, storage: S, local_user_id: i64, config: &Config) -> Self {
        Self {
            api,
            transport,
            messages: MessageStore::new(local_user_id),
            directory: ConversationDirectory::from_config(storage, config),
            local_company_id: None,
            history_limit: config.history_page_size,
            notices: VecDeque::new(),
            peer_typing: None,
            peer_read: None,
        }
    }

    /// Компания пользователя: по ней определяется сторона в контракте
    pub fn with_company(mut self, company_id: i64) -> Self {
        self.local_company_id = Some(company_id);
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn transport(&self) -> &Transport<C> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport<C> {
        &mut self.transport
    }

    pub fn messages(&self) -> &MessageStore {
        &self.messages
    }

    pub fn directory(&self) -> &ConversationDirectory<S> {
        &self.directory
    }

    pub fn directory_mut(&mut self) -> &mut ConversationDirectory<S> {
        &mut self.directory
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.transport.state()
    }

    pub fn active_conversation_id(&self) -> Option<i64> {
        self.directory.active_conversation_id()
    }

    pub fn current_conversation(&self) -> Option<&Conversation> {
        self.directory.current()
    }

    /// Собеседник печатает в активной беседе
    pub fn is_peer_typing(&self) -> bool {
        self.peer_typing.is_some() && self.peer_typing == self.active_conversation_id()
    }

    pub fn peer_read_conversation(&self) -> Option<i64> {
        self.peer_read
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push_back(Notice {
            level,
            message: message.into(),
        });
    }

    // ========================================================================
    // Соединение
    // ========================================================================

    pub fn connect(&mut self) {
        self.transport.connect();
    }

    pub fn disconnect(&mut self) {
        self.transport.disconnect();
        self.drain_transport();
    }

    /// Применить накопившиеся события транспорта
    pub fn drain_transport(&mut self) {
        for event in self.transport.drain_events() {
            self.handle_transport_event(event);
        }
    }

    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        use tracing::{debug, info};

        match event {
            TransportEvent::Connected => info!("Negotiation channel connected"),
            TransportEvent::Disconnected(reason) => {
                info!("Negotiation channel down: {}", reason);
                self.peer_typing = None;
            }
            TransportEvent::Error(message) => debug!("Transport error: {}", message),
            TransportEvent::Frame(frame) => self.handle_frame(frame),
        }
    }

    /// Разобрать входящий кадр сервера
    pub fn handle_frame(&mut self, frame: ServerFrame) {
        use tracing::debug;

        match frame {
            ServerFrame::Message(push) => self.on_message(push),
            ServerFrame::OfferUpdated(push) | ServerFrame::MessageUpdate(push) => self.on_update(push),
            ServerFrame::Sent(ack) => self.on_sent(ack),
            ServerFrame::Error(error) => self.on_error(error),
            ServerFrame::Typing(signal) => self.on_typing(signal),
            ServerFrame::Read(signal) => {
                if self.is_peer_signal(&signal) {
                    self.peer_read = signal.conversation_id.or(self.active_conversation_id());
                }
            }
            ServerFrame::Connected(time) | ServerFrame::Pong(time) => {
                debug!("Server time {:?}", time.server_time);
            }
        }
    }

    fn is_peer_signal(&self, signal: &PeerSignal) -> bool {
        signal.user_id != Some(self.messages.local_user_id())
    }

    fn on_message(&mut self, push: MessagePush) {
        use tracing::debug;

        let Some(conversation_id) = push.conversation_id() else {
            debug!("MESSAGE without conversation id dropped");
            return;
        };
        let mut message = push.message;
        if message.conversation_id.is_none() {
            message.conversation_id = Some(conversation_id);
        }

        let active = self.active_conversation_id();
        self.messages.handle_incoming(&message, active);

        let preview = UiMessage::from_server(&message, self.messages.local_user_id(), conversation_id);
        let time = message.create_time.clone().unwrap_or_else(now_iso);
        if !self.directory.record_message(conversation_id, &preview.content, time) {
            debug!("MESSAGE for conversation {} not in directory", conversation_id);
        }

        if message.from_user_id != self.messages.local_user_id() && self.peer_typing == Some(conversation_id) {
            self.peer_typing = None;
        }
    }

    fn on_update(&mut self, push: MessagePush) {
        let mut message = push.message;
        if message.conversation_id.is_none() {
            message.conversation_id = push.conversation_id;
        }
        if !self.messages.merge_update(&message) {
            self.messages.handle_incoming(&message, self.active_conversation_id());
        }
    }

    fn on_sent(&mut self, ack: SentAck) {
        use tracing::debug;

        match (ack.temp_id, ack.id) {
            (Some(temp_id), Some(id)) => {
                self.messages.confirm_message(&temp_id, id);
            }
            (temp_id, id) => debug!("Incomplete SENT ack: temp_id={:?} id={:?}", temp_id, id),
        }
    }

    fn on_error(&mut self, error: ErrorData) {
        use tracing::warn;

        let text = error.message.unwrap_or_else(|| "Server error".to_string());
        warn!("Server reported error: {}", text);
        match error.temp_id {
            Some(temp_id) => {
                self.messages.fail_message(&temp_id);
                self.notify(NoticeLevel::Error, format!("Message not sent: {}", text));
            }
            None => self.notify(NoticeLevel::Warning, text),
        }
    }

    fn on_typing(&mut self, signal: PeerSignal) {
        if self.is_peer_signal(&signal) {
            self.peer_typing = signal.conversation_id.or(self.active_conversation_id());
        }
    }

    // ========================================================================
    // Отправка
    // ========================================================================

    fn require_active(&self) -> Result<i64> {
        self.active_conversation_id()
            .ok_or_else(|| NegotiationError::InvalidState("No active conversation".to_string()))
    }

    /// Оптимистично добавить сообщение и отправить его по каналу.
    ///
    /// Если канал закрыт, сообщение сразу помечается failed, а транспорт
    /// начинает подключение.
    fn send_message(&mut self, kind: MessageKind, content: String, payload_json: Option<String>) -> Result<UiMessage> {
        let conversation_id = self.require_active()?;
        let message = self
            .messages
            .add_pending_message(conversation_id, kind, content, payload_json);
        Ok(self.transmit(message))
    }

    fn transmit(&mut self, mut message: UiMessage) -> UiMessage {
        use tracing::warn;

        let temp_id = message.id.to_string();
        let frame = ClientFrame::Send(SendData {
            conversation_id: message.conversation_id,
            msg_type: message.kind,
            content: message.content.clone(),
            payload: message.payload_json.clone(),
            temp_id: temp_id.clone(),
        });

        if !self.transport.send(&frame) {
            warn!("Channel not open, message {} failed", temp_id);
            self.messages.fail_message(&temp_id);
            message.delivery_status = Some(DeliveryStatus::Failed);
            self.transport.ensure_connected();
        } else {
            let preview = message.content.clone();
            self.directory
                .record_message(message.conversation_id, &preview, now_iso());
        }
        message
    }

    pub fn send_text(&mut self, content: &str) -> Result<UiMessage> {
        validate_text_message(content)?;
        self.send_message(MessageKind::Text, content.trim().to_string(), None)
    }

    /// Отправить готовую котировку любого формата
    pub fn send_quote(&mut self, quote: QuotePayload) -> Result<UiMessage> {
        validate_quote(&quote)?;
        let content = summarize(&quote);
        self.send_message(MessageKind::Quote, content, Some(quote.to_wire_json()))
    }

    pub fn send_spot_quote(&mut self, fields: SpotQuote) -> Result<UiMessage> {
        self.send_quote(QuotePayload::spot(fields))
    }

    pub fn send_basis_quote(&mut self, fields: BasisQuote) -> Result<UiMessage> {
        self.send_quote(QuotePayload::basis(fields))
    }

    /// Встречная котировка на последнюю котировку беседы
    pub fn send_counter_quote(&mut self, body: QuoteBody, expires_at: Option<String>) -> Result<UiMessage> {
        let previous = self
            .messages
            .latest_quote()
            .and_then(|(message, quote)| message.server_id().map(|id| (id, quote)));

        let quote = QuotePayload::counter(body, previous.as_ref().map(|(id, q)| (*id, q)), expires_at);
        validate_quote(&quote)?;

        let change = previous
            .as_ref()
            .and_then(|(_, prev)| price_change_summary(&quote, prev))
            .unwrap_or_else(|| summarize(&quote));
        let content = format!("Counter offer: {}", change);
        self.send_message(MessageKind::Quote, content, Some(quote.to_wire_json()))
    }

    pub fn send_image(&mut self, image: &ImagePayload) -> Result<UiMessage> {
        let payload = serde_json::to_string(image)?;
        self.send_message(MessageKind::Image, MessageKind::Image.placeholder().to_string(), Some(payload))
    }

    pub fn send_attachment(&mut self, attachment: &AttachmentPayload) -> Result<UiMessage> {
        let payload = serde_json::to_string(attachment)?;
        self.send_message(
            MessageKind::Attachment,
            MessageKind::Attachment.placeholder().to_string(),
            Some(payload),
        )
    }

    /// Сторона пользователя в активной беседе.
    ///
    /// В беседе о предложении поставщика пользователь покупатель.
    pub fn local_party(&self) -> Option<Party> {
        match self.current_conversation()?.subject_type? {
            SubjectType::Supply => Some(Party::Buyer),
            SubjectType::Need => Some(Party::Seller),
        }
    }

    /// Подтвердить условия от своей стороны
    pub fn confirm_terms(&mut self) -> Result<UiMessage> {
        let role = self
            .local_party()
            .ok_or_else(|| NegotiationError::InvalidState("Party is unknown for this conversation".to_string()))?;
        let payload = SystemPayload::confirm_terms(role);
        self.send_message(MessageKind::System, payload.summary(), Some(payload.to_wire_json()))
    }

    pub fn send_typing(&mut self) -> bool {
        match self.active_conversation_id() {
            Some(id) => self.transport.send(&ClientFrame::typing(id)),
            None => false,
        }
    }

    /// Повторить отправку failed сообщения под новым временным id
    pub fn resend(&mut self, temp_id: &str) -> Result<UiMessage> {
        let message = self
            .messages
            .retry_message(temp_id)
            .ok_or_else(|| NegotiationError::NotFound(format!("No failed message {}", temp_id)))?;
        Ok(self.transmit(message))
    }

    // ========================================================================
    // REST действия
    // ========================================================================

    pub async fn load_conversations(&mut self) -> Result<usize> {
        self.directory.load(&self.api).await
    }

    /// Открыть беседу по паре (собеседник, предмет) и сделать её активной
    pub async fn open_conversation(&mut self, request: &OpenConversationRequest) -> Result<i64> {
        let id = self.directory.open_conversation(&self.api, request).await?;
        self.select_conversation(id).await?;
        Ok(id)
    }

    /// Сделать беседу активной и загрузить её историю.
    ///
    /// Повторный выбор активной беседы ничего не делает.
    pub async fn select_conversation(&mut self, conversation_id: i64) -> Result<()> {
        use tracing::debug;

        if self.active_conversation_id() == Some(conversation_id) && self.messages.conversation_id() == Some(conversation_id) {
            return Ok(());
        }

        self.directory.set_active(Some(conversation_id));
        self.messages.reset_for(Some(conversation_id));
        self.peer_typing = None;

        self.messages
            .load_history(&self.api, conversation_id, self.history_limit)
            .await?;

        if let Err(e) = self.mark_read().await {
            debug!("Mark read after select failed: {}", e);
        }
        Ok(())
    }

    /// Отметить активную беседу прочитанной на сервере и в канале
    pub async fn mark_read(&mut self) -> Result<()> {
        let conversation_id = self.require_active()?;
        self.transport.send(&ClientFrame::read(conversation_id));
        self.directory.mark_read(&self.api, conversation_id).await
    }

    pub fn close_conversation(&mut self) {
        self.directory.set_active(None);
        self.messages.reset_for(None);
        self.peer_typing = None;
    }

    /// Принять котировку собеседника.
    ///
    /// Статус меняется локально только после успеха REST вызова.
    pub async fn confirm_quote(&mut self, message_id: i64) -> Result<()> {
        use tracing::info;

        let conversation_id = self.require_active()?;
        self.api.confirm_offer(message_id).await?;

        self.messages.update_quote_status(message_id, QuoteStatus::Accepted);
        info!("Quote {} accepted", message_id);

        // пользователь мог уйти в другую беседу, пока ждали ответа
        if self.active_conversation_id() == Some(conversation_id) {
            self.send_message(MessageKind::Text, QUOTE_ACCEPTED_NOTE.to_string(), None)?;
        }
        self.notify(NoticeLevel::Info, "Quote accepted");
        Ok(())
    }

    pub async fn reject_quote(&mut self, message_id: i64) -> Result<()> {
        self.require_active()?;
        self.api.reject_offer(message_id).await?;
        self.messages.update_quote_status(message_id, QuoteStatus::Rejected);
        self.notify(NoticeLevel::Info, "Quote rejected");
        Ok(())
    }

    /// Создать контракт из последней принятой котировки и сообщить о нём в канале
    pub async fn create_contract(&mut self, draft: ContractDraft) -> Result<i64> {
        use tracing::info;

        let conversation_id = self.require_active()?;
        if !self.can_draft_contract() {
            return Err(NegotiationError::InvalidState(
                "Contract requires an accepted quote and no existing contract".to_string(),
            ));
        }

        let (quote_message_id, quote) = self
            .messages
            .latest_accepted_quote_message()
            .and_then(|m| m.server_id().map(|id| (id, m.quote_payload())))
            .ok_or_else(|| NegotiationError::NotFound("Accepted quote is not confirmed yet".to_string()))?;

        let request = draft.into_request(quote_message_id);
        let contract_id = self.api.create_contract_from_quote(&request).await?;
        info!("Contract {} created from quote {}", contract_id, quote_message_id);

        let contract = contract_announcement(contract_id, quote.as_ref());
        if self.active_conversation_id() == Some(conversation_id) {
            self.send_message(
                MessageKind::Contract,
                MessageKind::Contract.placeholder().to_string(),
                Some(contract.to_wire_json()),
            )?;
        }
        Ok(contract_id)
    }

    // ========================================================================
    // Фаза сделки
    // ========================================================================

    /// С чьей стороны смотреть на контракт
    pub fn perspective(&self) -> Option<Perspective> {
        match (self.local_company_id, self.local_party()) {
            (Some(company_id), _) => Some(Perspective::Company(company_id)),
            (None, Some(party)) => Some(Perspective::Party(party)),
            (None, None) => None,
        }
    }

    pub fn flow_state(&self) -> Option<FlowState> {
        let perspective = self.perspective()?;
        flow::derive_flow_state(self.messages.messages(), &perspective)
    }

    pub fn negotiation_status(&self) -> Option<NegotiationStatus> {
        let perspective = self.perspective()?;
        Some(flow::negotiation_status(self.messages.messages(), &perspective))
    }

    pub fn transaction_step(&self) -> u8 {
        self.perspective()
            .map(|p| flow::transaction_step(self.messages.messages(), &p))
            .unwrap_or(0)
    }

    /// Подпись последней котировки для шапки беседы
    pub fn latest_quote_summary(&self) -> String {
        let latest = self.messages.latest_quote();
        summarize_opt(latest.as_ref().map(|(_, quote)| quote))
    }

    /// Формат сделки по снимку предмета активной беседы
    pub fn subject_trade_type(&self) -> Option<TradeType> {
        self.current_conversation().map(|c| {
            if c.is_basis_trade() {
                TradeType::Basis
            } else {
                TradeType::Spot
            }
        })
    }

    pub fn can_draft_contract(&self) -> bool {
        flow::can_draft_contract(self.messages.messages())
    }

    pub fn can_sign_contract(&self) -> bool {
        self.perspective()
            .is_some_and(|p| flow::can_sign_contract(self.messages.messages(), &p))
    }

    pub fn can_generate_contract(&self) -> bool {
        flow::can_generate_contract(self.messages.messages())
    }
}

/// Payload сообщения о новом контракте: ждёт подписей
fn contract_announcement(contract_id: i64, quote: Option<&QuotePayload>) -> ContractPayload {
    let (product_name, unit_price, quantity) = match quote.map(|q| &q.body) {
        Some(QuoteBody::Spot(spot)) => (
            None,
            spot.price.clone().map(Amount::Text),
            spot.quantity.clone().map(Amount::Text),
        ),
        Some(QuoteBody::Basis(basis)) => (
            basis.contract_name.clone().or_else(|| Some(basis.contract_code.clone())),
            None,
            basis.quantity.clone().map(Amount::Text),
        ),
        None => (None, None, None),
    };

    ContractPayload {
        contract_id,
        contract_no: None,
        product_name,
        quantity,
        unit_price,
        total_amount: None,
        delivery_date: None,
        delivery_address: None,
        buyer_company_id: None,
        seller_company_id: None,
        buyer_company_name: None,
        seller_company_name: None,
        status: ContractStatus::Pending,
        buyer_signed: false,
        seller_signed: false,
    }
}
