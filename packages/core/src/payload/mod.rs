//! Кодек структурированных payload сообщений
//!
//! История переписки охватывает несколько поколений протокола, поэтому всё,
//! что приходит в `payloadJson`, сначала приводится к канонической форме:
//!
//! - [`quote`]: котировки (spot / basis), нормализация V2 → V1 → `fields` → legacy
//! - [`params`]: динамические параметры продукта
//! - [`summary`]: форматирование полей и однострочные подписи
//! - [`diff`]: пополевое сравнение двух котировок
//! - [`contract`]: payload сообщений-контрактов
//! - [`system`]: системные действия (подтверждение условий)
//! - [`attachment`]: изображения и вложения

pub mod attachment;
pub mod contract;
pub mod diff;
pub mod params;
pub mod quote;
pub mod summary;
pub mod system;

pub use contract::{ContractPayload, ContractStatus};
pub use diff::{diff, ChangeKind, FieldChange};
pub use quote::{normalize, parse_quote_payload, QuotePayload, TradeType};
pub use summary::summarize;
pub use system::SystemPayload;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Сторона сделки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    Buyer,
    Seller,
}

impl Party {
    pub fn label(&self) -> &'static str {
        match self {
            Party::Buyer => "Buyer",
            Party::Seller => "Seller",
        }
    }
}

/// Разобрать `payloadJson` в JSON-значение.
///
/// Сервер хранит payload так, как его прислал клиент, поэтому иногда это
/// строка с JSON внутри; один уровень такой обёртки снимается.
pub fn parse_payload_value(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::String(inner)) => match serde_json::from_str::<Value>(&inner) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Dropping double-encoded payload: {}", e);
                None
            }
        },
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Dropping malformed payload JSON: {}", e);
            None
        }
    }
}

/// Скаляр JSON в строку; пустые строки и null считаются отсутствующими
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => i.to_string(),
            None => format_number(n.as_f64().unwrap_or_default()),
        }),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Число из JSON-числа или числовой строки
pub(crate) fn scalar_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Кратчайшая запись числа: `10.0` → `"10"`, `10.5` → `"10.5"`
pub(crate) fn format_number(n: f64) -> String {
    if n == 0.0 {
        // без "-0"
        return "0".to_string();
    }
    n.to_string()
}
