// Negotiation Core
// Переговоры B2B в реальном времени: транспорт, котировки, лента, фаза сделки

#![warn(clippy::all)]

// Модули
pub mod api;
pub mod config;
pub mod payload;
pub mod protocol;
pub mod state;
pub mod storage;
pub mod utils;

// Re-exports для удобства
pub use api::ChatApi;
pub use config::Config;
pub use payload::{normalize, parse_quote_payload, QuotePayload};
pub use state::{MessageStore, NegotiationSession};
pub use utils::error::{NegotiationError, Result};
