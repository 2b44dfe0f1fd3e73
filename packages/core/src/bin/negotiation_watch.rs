// negotiation-watch: подключиться к каналу переговоров и следить за беседой

use anyhow::Context;
use clap::Parser;
use negotiation_core::api::http::HttpChatApi;
use negotiation_core::protocol::socket::{TransportDriver, WsConnector};
use negotiation_core::protocol::{Transport, TransportEvent};
use negotiation_core::state::NegotiationSession;
use negotiation_core::storage::FileStorage;
use negotiation_core::utils::logging::{init_logging, DEFAULT_FILTER};
use negotiation_core::Config;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "negotiation-watch", about = "Watch a negotiation conversation in real time")]
struct Cli {
    /// Id локального пользователя
    #[arg(long, env = "NEGOTIATION_USER_ID")]
    user_id: i64,

    /// Токен доступа для канала и REST API
    #[arg(long, env = "NEGOTIATION_TOKEN")]
    token: Option<String>,

    /// Адрес WebSocket канала
    #[arg(long)]
    ws_url: Option<String>,

    /// Базовый адрес REST API
    #[arg(long)]
    api_base: Option<String>,

    /// Беседа, которую открыть после подключения
    #[arg(long)]
    conversation: Option<i64>,

    /// Отправить текст в беседу после подключения
    #[arg(long)]
    say: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging(DEFAULT_FILTER);
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(ws_url) = cli.ws_url {
        config.ws_url = ws_url;
    }
    if let Some(api_base) = cli.api_base {
        config.api_base_url = api_base;
    }
    Config::init_with(config.clone()).map_err(anyhow::Error::msg)?;

    let mut api = HttpChatApi::from_config(&config).context("building HTTP client")?;
    if let Some(token) = &cli.token {
        api = api.with_token(token.clone());
    }

    let (connector, socket_events) = WsConnector::new();
    let token = cli.token.clone();
    let transport = Transport::new(connector, &config).with_token_provider(move || token.clone());
    let storage = FileStorage::from_config();
    let mut session = NegotiationSession::new(api, transport, storage, cli.user_id, &config);

    match session.load_conversations().await {
        Ok(count) => info!("{} conversations, {} unread", count, session.directory().total_unread()),
        Err(e) => warn!("Conversation list unavailable: {}", e),
    }
    if let Some(conversation_id) = cli.conversation {
        session
            .select_conversation(conversation_id)
            .await
            .with_context(|| format!("opening conversation {}", conversation_id))?;
        info!(
            "Conversation {} loaded: {} messages, status {:?}",
            conversation_id,
            session.messages().len(),
            session.negotiation_status()
        );
    }

    session.connect();
    let mut pending_text = cli.say;
    let mut driver = TransportDriver::new(socket_events);

    while let Some(event) = driver.next_event(session.transport_mut()).await {
        let connected = event == TransportEvent::Connected;
        session.handle_transport_event(event);

        if connected {
            if let Some(text) = pending_text.take() {
                match session.send_text(&text) {
                    Ok(message) => info!("Sent {} ({:?})", message.id, message.delivery_status),
                    Err(e) => warn!("Cannot send: {}", e),
                }
            }
        }

        for notice in session.take_notices() {
            info!("[{:?}] {}", notice.level, notice.message);
        }
        if let Some(flow) = session.flow_state() {
            info!(
                "phase {:?}, step {}, can sign: {}",
                flow.phase,
                session.transaction_step(),
                flow.can_sign_now
            );
        }
    }

    info!("Channel closed, state {:?}", session.connection_state());
    Ok(())
}
