// Транспорт реального времени
// Машина состояний соединения без собственного IO: сокет открывается через
// Connector, события сокета подаются в handle_socket_event, таймер
// переподключения обслуживает драйвер (см. protocol::socket)

use crate::config::Config;
use crate::protocol::messages::{ClientFrame, ServerFrame};
use crate::protocol::wire::{decode_server_frame, encode_client_frame};
use crate::utils::error::Result;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// Номер попытки соединения; события от прежних сокетов отбрасываются
pub type ConnectionId = u64;

/// Состояние соединения
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Причина разрыва, сообщаемая наружу
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Вызван disconnect()
    Manual,
    /// Предикат подключения вернул false (нет токена / вышли из аккаунта)
    LoggedOut,
    /// Сокет закрылся сам
    Closed { code: Option<u16>, reason: String },
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Manual => write!(f, "manual"),
            DisconnectReason::LoggedOut => write!(f, "logged_out"),
            DisconnectReason::Closed { code: Some(code), reason } if !reason.is_empty() => {
                write!(f, "closed ({}): {}", code, reason)
            }
            DisconnectReason::Closed { code: Some(code), .. } => write!(f, "closed ({})", code),
            DisconnectReason::Closed { reason, .. } => write!(f, "closed: {}", reason),
        }
    }
}

/// Событие для потребителя транспорта
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Disconnected(DisconnectReason),
    Error(String),
    Frame(ServerFrame),
}

/// Событие от нижнего уровня (реального или тестового сокета)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Opened(ConnectionId),
    Text(ConnectionId, String),
    Error(ConnectionId, String),
    Closed {
        id: ConnectionId,
        code: Option<u16>,
        reason: String,
    },
}

impl SocketEvent {
    pub fn connection_id(&self) -> ConnectionId {
        match self {
            SocketEvent::Opened(id) | SocketEvent::Text(id, _) | SocketEvent::Error(id, _) => *id,
            SocketEvent::Closed { id, .. } => *id,
        }
    }
}

/// Открытый сокет
pub trait Socket {
    fn send_text(&mut self, text: String) -> Result<()>;
    fn close(&mut self);
}

/// Фабрика сокетов. `open` только начинает соединение: об успехе сообщит
/// `SocketEvent::Opened` с тем же `id`
pub trait Connector {
    type Socket: Socket;

    fn open(&mut self, url: &str, id: ConnectionId) -> Result<Self::Socket>;
}

/// Линейный backoff: `min(max_delay, base_delay * attempt)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl ReconnectPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_delay: Duration::from_millis(config.reconnect_base_delay_ms),
            max_delay: Duration::from_millis(config.reconnect_max_delay_ms),
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(attempt.max(1))
            .min(self.max_delay)
    }
}

/// Состояние переподключения
#[derive(Debug, Clone)]
pub struct ReconnectState {
    policy: ReconnectPolicy,
    attempts: u32,
}

impl ReconnectState {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { policy, attempts: 0 }
    }

    /// Вычислить следующую задержку и увеличить счётчик попыток
    pub fn next_delay(&mut self) -> Duration {
        self.attempts = self.attempts.saturating_add(1);
        self.policy.delay_for(self.attempts)
    }

    /// Сбросить счётчик (после успешного подключения)
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Запланированное переподключение
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingReconnect {
    /// Токен таймера; устаревший токен в fire_reconnect игнорируется
    pub token: u64,
    pub delay: Duration,
}

type UrlBuilder = Box<dyn Fn(&str, Option<&str>) -> String + Send>;
type TokenProvider = Box<dyn Fn() -> Option<String> + Send>;
type ConnectPredicate = Box<dyn Fn() -> bool + Send>;

/// Добавить токен в query string, экранируя его
pub fn build_ws_url(base: &str, token: Option<&str>) -> String {
    match token.filter(|t| !t.is_empty()) {
        Some(token) => {
            let separator = if base.contains('?') { '&' } else { '?' };
            format!("{}{}token={}", base, separator, urlencoding::encode(token))
        }
        None => base.to_string(),
    }
}

pub struct Transport<C: Connector> {
    connector: C,
    base_url: String,
    url_builder: UrlBuilder,
    token_provider: TokenProvider,
    can_connect: ConnectPredicate,
    state: ConnectionState,
    socket: Option<C::Socket>,
    connection_id: ConnectionId,
    reconnect: ReconnectState,
    pending: Option<PendingReconnect>,
    timer_seq: u64,
    /// Разрыв уже сообщён; повторные закрытия в том же простое молчат
    close_hinted: bool,
    manually_closed: bool,
    last_error: Option<String>,
    events: VecDeque<TransportEvent>,
}

impl<C: Connector> Transport<C> {
    pub fn new(connector: C, config: &Config) -> Self {
        Self {
            connector,
            base_url: config.ws_url.clone(),
            url_builder: Box::new(build_ws_url),
            token_provider: Box::new(|| None),
            can_connect: Box::new(|| true),
            state: ConnectionState::Disconnected,
            socket: None,
            connection_id: 0,
            reconnect: ReconnectState::new(ReconnectPolicy::from_config(config)),
            pending: None,
            timer_seq: 0,
            close_hinted: false,
            manually_closed: false,
            last_error: None,
            events: VecDeque::new(),
        }
    }

    pub fn with_token_provider<F>(mut self, provider: F) -> Self
    where
        F: Fn() -> Option<String> + Send + 'static,
    {
        self.token_provider = Box::new(provider);
        self
    }

    pub fn with_can_connect<F>(mut self, predicate: F) -> Self
    where
        F: Fn() -> bool + Send + 'static,
    {
        self.can_connect = Box::new(predicate);
        self
    }

    pub fn with_url_builder<F>(mut self, builder: F) -> Self
    where
        F: Fn(&str, Option<&str>) -> String + Send + 'static,
    {
        self.url_builder = Box::new(builder);
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn attempts(&self) -> u32 {
        self.reconnect.attempts()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn pending_reconnect(&self) -> Option<PendingReconnect> {
        self.pending
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn connector_mut(&mut self) -> &mut C {
        &mut self.connector
    }

    /// Начать подключение. Ничего не делает, если соединение уже есть или
    /// открывается, либо если подключаться сейчас нельзя
    pub fn connect(&mut self) {
        use tracing::{debug, warn};

        if !(self.can_connect)() {
            debug!("Connect skipped: not allowed to connect");
            return;
        }
        if matches!(self.state, ConnectionState::Connected | ConnectionState::Connecting) {
            return;
        }

        self.manually_closed = false;
        self.pending = None;
        self.connection_id += 1;

        let token = (self.token_provider)();
        let url = (self.url_builder)(&self.base_url, token.as_deref());
        self.state = ConnectionState::Connecting;
        debug!("Opening connection #{}", self.connection_id);

        match self.connector.open(&url, self.connection_id) {
            Ok(socket) => self.socket = Some(socket),
            Err(e) => {
                warn!("Failed to open connection: {}", e);
                let message = e.to_string();
                self.last_error = Some(message.clone());
                self.events.push_back(TransportEvent::Error(message.clone()));
                self.on_down(None, message);
            }
        }
    }

    /// Подключиться, если соединения нет. Возвращает true, только если
    /// соединение уже открыто
    pub fn ensure_connected(&mut self) -> bool {
        if self.is_connected() {
            return true;
        }
        if matches!(self.state, ConnectionState::Disconnected | ConnectionState::Reconnecting) {
            self.connect();
        }
        false
    }

    /// Закрыть соединение и отменить переподключение.
    /// Автоматически транспорт больше не подключится
    pub fn disconnect(&mut self) {
        self.manually_closed = true;
        self.pending = None;
        self.reconnect.reset();
        // поздние события закрываемого сокета станут устаревшими
        self.connection_id += 1;

        if let Some(mut socket) = self.socket.take() {
            socket.close();
        }

        self.state = ConnectionState::Disconnected;
        self.close_hinted = true;
        self.events
            .push_back(TransportEvent::Disconnected(DisconnectReason::Manual));
    }

    /// Отправить кадр. Без открытого соединения сразу возвращает false,
    /// очереди нет
    pub fn send(&mut self, frame: &ClientFrame) -> bool {
        use tracing::warn;

        if self.state != ConnectionState::Connected {
            return false;
        }
        let Some(socket) = self.socket.as_mut() else {
            return false;
        };

        let text = match encode_client_frame(frame) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to encode frame: {}", e);
                return false;
            }
        };

        match socket.send_text(text) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send frame: {}", e);
                false
            }
        }
    }

    /// Обработать событие сокета
    pub fn handle_socket_event(&mut self, event: SocketEvent) {
        use tracing::{debug, info, warn};

        if event.connection_id() != self.connection_id {
            debug!("Dropping event from stale connection #{}", event.connection_id());
            return;
        }

        match event {
            SocketEvent::Opened(_) => {
                info!("Connected (connection #{})", self.connection_id);
                self.state = ConnectionState::Connected;
                self.reconnect.reset();
                self.pending = None;
                self.close_hinted = false;
                self.last_error = None;
                self.events.push_back(TransportEvent::Connected);
            }
            SocketEvent::Text(_, text) => match decode_server_frame(&text) {
                Ok(frame) => self.events.push_back(TransportEvent::Frame(frame)),
                Err(e) => warn!("Dropping malformed frame: {}", e),
            },
            SocketEvent::Error(_, message) => {
                warn!("Socket error: {}", message);
                self.last_error = Some(message.clone());
                self.events.push_back(TransportEvent::Error(message));
                if (self.can_connect)() && !self.manually_closed {
                    self.schedule_reconnect();
                }
                self.mark_down();
            }
            SocketEvent::Closed { code, reason, .. } => {
                self.on_down(code, reason);
            }
        }
    }

    fn on_down(&mut self, code: Option<u16>, reason: String) {
        use tracing::info;

        self.socket = None;
        if self.manually_closed {
            return;
        }

        if !(self.can_connect)() {
            info!("Connection closed while logged out, not reconnecting");
            self.pending = None;
            self.state = ConnectionState::Disconnected;
            self.events
                .push_back(TransportEvent::Disconnected(DisconnectReason::LoggedOut));
            return;
        }

        if !self.close_hinted {
            self.close_hinted = true;
            self.events
                .push_back(TransportEvent::Disconnected(DisconnectReason::Closed { code, reason }));
        }

        self.schedule_reconnect();
        self.mark_down();
    }

    fn mark_down(&mut self) {
        self.state = if self.pending.is_some() {
            ConnectionState::Reconnecting
        } else {
            ConnectionState::Disconnected
        };
    }

    /// Запланировать одну попытку; при уже запланированной ничего не делает
    fn schedule_reconnect(&mut self) {
        use tracing::info;

        if self.pending.is_some() || self.manually_closed || !(self.can_connect)() {
            return;
        }

        let delay = self.reconnect.next_delay();
        self.timer_seq += 1;
        self.pending = Some(PendingReconnect {
            token: self.timer_seq,
            delay,
        });
        info!(
            "Reconnect #{} scheduled in {} ms",
            self.reconnect.attempts(),
            delay.as_millis()
        );
    }

    /// Таймер переподключения сработал
    pub fn fire_reconnect(&mut self, token: u64) {
        match self.pending {
            Some(pending) if pending.token == token => {
                self.pending = None;
                self.state = ConnectionState::Disconnected;
                self.connect();
            }
            _ => tracing::debug!("Ignoring stale reconnect timer {}", token),
        }
    }

    pub fn poll_event(&mut self) -> Option<TransportEvent> {
        self.events.pop_front()
    }

    pub fn drain_events(&mut self) -> Vec<TransportEvent> {
        self.events.drain(..).collect()
    }
}
