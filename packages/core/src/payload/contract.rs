// Payload сообщений-контрактов

use super::{format_number, parse_payload_value, Party};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Статус контракта, фиксированный домен 0..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ContractStatus {
    Draft = 0,
    Pending = 1,
    Signed = 2,
    Executing = 3,
    Completed = 4,
    Cancelled = 5,
}

impl TryFrom<u8> for ContractStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ContractStatus::Draft),
            1 => Ok(ContractStatus::Pending),
            2 => Ok(ContractStatus::Signed),
            3 => Ok(ContractStatus::Executing),
            4 => Ok(ContractStatus::Completed),
            5 => Ok(ContractStatus::Cancelled),
            other => Err(format!("unknown contract status {}", other)),
        }
    }
}

impl From<ContractStatus> for u8 {
    fn from(status: ContractStatus) -> Self {
        status as u8
    }
}

impl ContractStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ContractStatus::Draft => "Draft",
            ContractStatus::Pending => "Pending signature",
            ContractStatus::Signed => "Signed",
            ContractStatus::Executing => "Executing",
            ContractStatus::Completed => "Completed",
            ContractStatus::Cancelled => "Cancelled",
        }
    }
}

/// Сумма или количество: сервер отдаёт то число, то строку
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Number(n) => write!(f, "{}", format_number(*n)),
            Amount::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractPayload {
    pub contract_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_company_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_company_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_company_name: Option<String>,
    pub status: ContractStatus,
    #[serde(default)]
    pub buyer_signed: bool,
    #[serde(default)]
    pub seller_signed: bool,
}

impl ContractPayload {
    /// Разобрать `payloadJson`; нераспознанный payload даёт `None`
    pub fn parse(raw: &str) -> Option<Self> {
        let value = parse_payload_value(raw)?;
        match serde_json::from_value(value) {
            Ok(contract) => Some(contract),
            Err(e) => {
                tracing::warn!("Ignoring unparseable contract payload: {}", e);
                None
            }
        }
    }

    pub fn to_wire_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Сторона сделки, которую представляет компания
    pub fn party_of(&self, company_id: i64) -> Option<Party> {
        if self.buyer_company_id == Some(company_id) {
            Some(Party::Buyer)
        } else if self.seller_company_id == Some(company_id) {
            Some(Party::Seller)
        } else {
            None
        }
    }

    pub fn signed_by(&self, party: Party) -> bool {
        match party {
            Party::Buyer => self.buyer_signed,
            Party::Seller => self.seller_signed,
        }
    }

    /// Краткая подпись для текста сообщения
    pub fn summary(&self) -> String {
        let title = self
            .contract_no
            .as_deref()
            .or(self.product_name.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", self.contract_id));
        match &self.total_amount {
            Some(total) => format!("Contract {} · ¥{}", title, total),
            None => format!("Contract {}", title),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_contract_payload() {
        let contract = ContractPayload::parse(
            r#"{"contractId":9,"contractNo":"HT-2025-009","totalAmount":"21000","status":1,"buyerCompanyId":3,"sellerCompanyId":4,"buyerSigned":true}"#,
        )
        .unwrap();

        assert_eq!(contract.contract_id, 9);
        assert_eq!(contract.status, ContractStatus::Pending);
        assert!(contract.buyer_signed);
        assert!(!contract.seller_signed);
        assert_eq!(contract.party_of(3), Some(Party::Buyer));
        assert_eq!(contract.party_of(4), Some(Party::Seller));
        assert_eq!(contract.party_of(5), None);
        assert_eq!(contract.summary(), "Contract HT-2025-009 · ¥21000");
    }

    #[test]
    fn test_status_domain_is_closed() {
        assert!(ContractPayload::parse(r#"{"contractId":1,"status":6}"#).is_none());
        assert!(ContractPayload::parse(r#"{"contractId":1}"#).is_none());
        assert!(ContractStatus::Signed > ContractStatus::Pending);
        assert_eq!(u8::from(ContractStatus::Cancelled), 5);
    }

    #[test]
    fn test_wire_json_uses_numeric_status() {
        let contract = ContractPayload {
            contract_id: 1,
            contract_no: None,
            product_name: Some("Soybean meal".into()),
            quantity: None,
            unit_price: None,
            total_amount: Some(Amount::Number(4200.0)),
            delivery_date: None,
            delivery_address: None,
            buyer_company_id: None,
            seller_company_id: None,
            buyer_company_name: None,
            seller_company_name: None,
            status: ContractStatus::Pending,
            buyer_signed: false,
            seller_signed: false,
        };

        let json = contract.to_wire_json();
        assert!(json.contains(r#""status":1"#));
        assert_eq!(ContractPayload::parse(&json).unwrap(), contract);
    }
}
