// WebSocket сокет на tokio-tungstenite и драйвер транспорта
//
// Каждый сокет живёт в своей задаче и пересылает события в общий канал.
// Драйвер читает этот канал и отсчитывает таймер переподключения.

use crate::protocol::transport::{
    ConnectionId, Connector, Socket, SocketEvent, Transport, TransportEvent,
};
use crate::utils::error::{NegotiationError, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

enum Outbound {
    Text(String),
    Close,
}

/// Сокет: передаёт исходящие кадры задаче соединения
pub struct WsSocket {
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl Socket for WsSocket {
    fn send_text(&mut self, text: String) -> Result<()> {
        self.outbound
            .send(Outbound::Text(text))
            .map_err(|_| NegotiationError::NetworkError("Socket task has stopped".to_string()))
    }

    fn close(&mut self) {
        let _ = self.outbound.send(Outbound::Close);
    }
}

/// Открывает WebSocket соединения в фоновых задачах tokio
pub struct WsConnector {
    events: mpsc::UnboundedSender<SocketEvent>,
}

impl WsConnector {
    /// Коннектор и приёмник событий всех его сокетов
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SocketEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (Self { events }, receiver)
    }
}

impl Connector for WsConnector {
    type Socket = WsSocket;

    fn open(&mut self, url: &str, id: ConnectionId) -> Result<WsSocket> {
        let (outbound, commands) = mpsc::unbounded_channel();
        tokio::spawn(run_socket(url.to_string(), id, commands, self.events.clone()));
        Ok(WsSocket { outbound })
    }
}

async fn run_socket(
    url: String,
    id: ConnectionId,
    mut commands: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<SocketEvent>,
) {
    let closed = |code: Option<u16>, reason: String| SocketEvent::Closed { id, code, reason };

    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            let _ = events.send(SocketEvent::Error(id, e.to_string()));
            let _ = events.send(closed(None, "connect failed".to_string()));
            return;
        }
    };

    let _ = events.send(SocketEvent::Opened(id));
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(SocketEvent::Text(id, text));
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (Some(u16::from(f.code)), f.reason.into_owned()))
                        .unwrap_or((None, String::new()));
                    let _ = events.send(closed(code, reason));
                    return;
                }
                // ping/pong отвечает tungstenite, бинарные кадры протокол не использует
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let _ = events.send(SocketEvent::Error(id, e.to_string()));
                    let _ = events.send(closed(None, "read failed".to_string()));
                    return;
                }
                None => {
                    let _ = events.send(closed(None, "stream ended".to_string()));
                    return;
                }
            },
            command = commands.recv() => match command {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        let _ = events.send(SocketEvent::Error(id, e.to_string()));
                        let _ = events.send(closed(None, "write failed".to_string()));
                        return;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = write.send(Message::Close(None)).await;
                    let _ = events.send(closed(Some(1000), "client closed".to_string()));
                    return;
                }
            },
        }
    }
}

/// Связывает транспорт с событиями сокетов и таймером переподключения
pub struct TransportDriver {
    socket_events: mpsc::UnboundedReceiver<SocketEvent>,
    timer: Option<(u64, Instant)>,
}

impl TransportDriver {
    pub fn new(socket_events: mpsc::UnboundedReceiver<SocketEvent>) -> Self {
        Self {
            socket_events,
            timer: None,
        }
    }

    /// Дождаться следующего события транспорта.
    ///
    /// `None`, когда канал событий закрыт и ждать больше нечего.
    pub async fn next_event<C: Connector>(
        &mut self,
        transport: &mut Transport<C>,
    ) -> Option<TransportEvent> {
        loop {
            if let Some(event) = transport.poll_event() {
                return Some(event);
            }

            // срок таймера фиксируется при первом появлении токена
            self.timer = match (transport.pending_reconnect(), self.timer) {
                (Some(pending), Some((token, deadline))) if pending.token == token => {
                    Some((token, deadline))
                }
                (Some(pending), _) => Some((pending.token, Instant::now() + pending.delay)),
                (None, _) => None,
            };

            let timer = self.timer;
            tokio::select! {
                received = self.socket_events.recv() => match received {
                    Some(event) => transport.handle_socket_event(event),
                    None => return None,
                },
                token = wait_timer(timer) => {
                    self.timer = None;
                    transport.fire_reconnect(token);
                }
            }
        }
    }
}

async fn wait_timer(timer: Option<(u64, Instant)>) -> u64 {
    match timer {
        Some((token, deadline)) => {
            sleep_until(deadline).await;
            token
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::protocol::transport::ConnectionState;
    use std::time::Duration;

    /// Коннектор, который ничего не открывает
    struct NullConnector;

    struct NullSocket;

    impl Socket for NullSocket {
        fn send_text(&mut self, _text: String) -> Result<()> {
            Ok(())
        }

        fn close(&mut self) {}
    }

    impl Connector for NullConnector {
        type Socket = NullSocket;

        fn open(&mut self, _url: &str, _id: ConnectionId) -> Result<NullSocket> {
            Ok(NullSocket)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_fires_reconnect_after_delay() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut driver = TransportDriver::new(rx);
        let mut transport = Transport::new(NullConnector, &Config::default());

        transport.connect();
        let first = transport.connection_id();
        tx.send(SocketEvent::Opened(first)).unwrap();
        assert_eq!(driver.next_event(&mut transport).await, Some(TransportEvent::Connected));

        tx.send(SocketEvent::Closed {
            id: first,
            code: Some(1006),
            reason: String::new(),
        })
        .unwrap();
        let event = driver.next_event(&mut transport).await;
        assert!(matches!(event, Some(TransportEvent::Disconnected(_))));
        assert_eq!(transport.state(), ConnectionState::Reconnecting);

        let started = Instant::now();
        let next = first + 1;
        let feeder = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(600)).await;
            tx.send(SocketEvent::Opened(next)).unwrap();
            tx
        });

        assert_eq!(driver.next_event(&mut transport).await, Some(TransportEvent::Connected));
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert_eq!(transport.connection_id(), next);
        drop(feeder.await.unwrap());
    }

    #[tokio::test]
    async fn test_connect_failure_reports_error_and_close() {
        let (mut connector, mut rx) = WsConnector::new();
        // порт 9 (discard) на localhost обычно закрыт
        let _socket = connector.open("ws://127.0.0.1:9/ws", 1).unwrap();

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, SocketEvent::Error(1, _)));
        let second = rx.recv().await.unwrap();
        assert!(matches!(second, SocketEvent::Closed { id: 1, .. }));
    }
}
