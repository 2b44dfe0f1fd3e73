// Системные сообщения

use super::{parse_payload_value, Party};
use serde::{Deserialize, Serialize};

/// Действие, переданное системным сообщением
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemPayload {
    /// Сторона подтвердила условия принятой котировки
    ConfirmTerms {
        role: Party,
        #[serde(rename = "confirmedAt", default, skip_serializing_if = "Option::is_none")]
        confirmed_at: Option<String>,
    },
}

impl SystemPayload {
    pub fn parse(raw: &str) -> Option<Self> {
        let value = parse_payload_value(raw)?;
        serde_json::from_value(value).ok()
    }

    pub fn confirm_terms(role: Party) -> Self {
        SystemPayload::ConfirmTerms {
            role,
            confirmed_at: Some(crate::utils::time::now_iso()),
        }
    }

    pub fn to_wire_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Текст сообщения для ленты
    pub fn summary(&self) -> String {
        match self {
            SystemPayload::ConfirmTerms { role, .. } => {
                format!("{} confirmed the terms", role.label())
            }
        }
    }
}
