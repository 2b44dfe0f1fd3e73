// Фаза переговоров, выведенная из ленты сообщений
//
// Сервер не присылает статус сделки: всё вычисляется сверткой по ленте.
// При расхождении порядка поступления и меток времени побеждает позиция.

use crate::payload::contract::{ContractPayload, ContractStatus};
use crate::payload::system::SystemPayload;
use crate::payload::Party;
use crate::storage::models::{MessageKind, QuoteStatus, UiMessage};
use serde::{Deserialize, Serialize};

/// Фаза переговоров
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationPhase {
    /// Есть котировки, ни одна не принята
    Inquiring,
    /// Котировка принята, контракт можно создавать
    DraftEligible,
    /// Обе стороны подтвердили условия
    TermsConfirmed,
    Draft,
    Pending,
    /// Контракт ждёт подписи, одна сторона уже подписала
    Signing,
    Signed,
    Executing,
    Completed,
    Cancelled,
}

impl NegotiationPhase {
    pub fn has_contract(&self) -> bool {
        !matches!(
            self,
            NegotiationPhase::Inquiring | NegotiationPhase::DraftEligible | NegotiationPhase::TermsConfirmed
        )
    }
}

/// Кто смотрит на ленту
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perspective {
    /// Роль известна заранее
    Party(Party),
    /// Роль определяется по компании в контракте
    Company(i64),
}

impl Perspective {
    fn party_in(&self, contract: &ContractPayload) -> Option<Party> {
        match self {
            Perspective::Party(party) => Some(*party),
            Perspective::Company(company_id) => contract.party_of(*company_id),
        }
    }
}

/// Подтверждения условий сторонами (OR по всем CONFIRM_TERMS)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermsConfirmation {
    pub buyer_confirmed: bool,
    pub seller_confirmed: bool,
}

impl TermsConfirmation {
    pub fn both(&self) -> bool {
        self.buyer_confirmed && self.seller_confirmed
    }

    pub fn any(&self) -> bool {
        self.buyer_confirmed || self.seller_confirmed
    }

    pub fn confirmed_by(&self, party: Party) -> bool {
        match party {
            Party::Buyer => self.buyer_confirmed,
            Party::Seller => self.seller_confirmed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowState {
    pub phase: NegotiationPhase,
    pub contract_id: Option<i64>,
    pub contract_no: Option<String>,
    pub buyer_signed: bool,
    pub seller_signed: bool,
    pub can_sign_now: bool,
    pub terms: TermsConfirmation,
}

/// Итоговый статус переговоров для списка бесед
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationStatus {
    Inquiring,
    Negotiating,
    PendingConfirm,
    Confirmed,
    Signing,
    Completed,
}

pub fn terms_confirmation(messages: &[UiMessage]) -> TermsConfirmation {
    messages
        .iter()
        .filter_map(UiMessage::system_payload)
        .fold(TermsConfirmation::default(), |mut terms, payload| {
            match payload {
                SystemPayload::ConfirmTerms { role: Party::Buyer, .. } => terms.buyer_confirmed = true,
                SystemPayload::ConfirmTerms { role: Party::Seller, .. } => terms.seller_confirmed = true,
            }
            terms
        })
}

fn has_quote(messages: &[UiMessage]) -> bool {
    messages.iter().any(UiMessage::is_quote)
}

fn has_accepted_quote(messages: &[UiMessage]) -> bool {
    messages
        .iter()
        .any(|m| m.is_quote() && m.quote_status == Some(QuoteStatus::Accepted))
}

fn has_contract_message(messages: &[UiMessage]) -> bool {
    messages.iter().any(|m| m.kind == MessageKind::Contract)
}

/// Контракт из последнего сообщения-контракта; битый payload даёт `None`,
/// более старые контракты не рассматриваются
fn latest_contract(messages: &[UiMessage]) -> Option<ContractPayload> {
    messages
        .iter()
        .rev()
        .find(|m| m.kind == MessageKind::Contract)?
        .contract_payload()
}

fn contract_phase(contract: &ContractPayload) -> NegotiationPhase {
    match contract.status {
        ContractStatus::Draft => NegotiationPhase::Draft,
        ContractStatus::Pending if contract.buyer_signed || contract.seller_signed => NegotiationPhase::Signing,
        ContractStatus::Pending => NegotiationPhase::Pending,
        ContractStatus::Signed => NegotiationPhase::Signed,
        ContractStatus::Executing => NegotiationPhase::Executing,
        ContractStatus::Completed => NegotiationPhase::Completed,
        ContractStatus::Cancelled => NegotiationPhase::Cancelled,
    }
}

/// Вывести состояние сделки из ленты.
///
/// `None`, если в беседе ещё нет ни котировок, ни контракта, ни
/// взаимного подтверждения условий.
pub fn derive_flow_state(messages: &[UiMessage], perspective: &Perspective) -> Option<FlowState> {
    let terms = terms_confirmation(messages);

    if let Some(contract) = latest_contract(messages) {
        let can_sign_now = contract.status == ContractStatus::Pending
            && perspective
                .party_in(&contract)
                .is_some_and(|party| !contract.signed_by(party));

        return Some(FlowState {
            phase: contract_phase(&contract),
            contract_id: Some(contract.contract_id),
            contract_no: contract.contract_no.clone(),
            buyer_signed: contract.buyer_signed,
            seller_signed: contract.seller_signed,
            can_sign_now,
            terms,
        });
    }

    let phase = if terms.both() {
        NegotiationPhase::TermsConfirmed
    } else if has_accepted_quote(messages) {
        NegotiationPhase::DraftEligible
    } else if has_quote(messages) {
        NegotiationPhase::Inquiring
    } else {
        return None;
    };

    Some(FlowState {
        phase,
        contract_id: None,
        contract_no: None,
        buyer_signed: false,
        seller_signed: false,
        can_sign_now: false,
        terms,
    })
}

/// Статус переговоров: INQUIRING → NEGOTIATING → PENDING_CONFIRM → CONFIRMED → SIGNING → COMPLETED
pub fn negotiation_status(messages: &[UiMessage], perspective: &Perspective) -> NegotiationStatus {
    let state = derive_flow_state(messages, perspective);

    match state.as_ref().map(|s| s.phase) {
        Some(NegotiationPhase::Completed) => return NegotiationStatus::Completed,
        Some(phase) if phase.has_contract() && phase != NegotiationPhase::Cancelled => {
            return NegotiationStatus::Signing
        }
        _ => {}
    }

    let terms = state.map(|s| s.terms).unwrap_or_else(|| terms_confirmation(messages));
    if terms.both() {
        NegotiationStatus::Confirmed
    } else if terms.any() || has_accepted_quote(messages) {
        NegotiationStatus::PendingConfirm
    } else if has_quote(messages) {
        NegotiationStatus::Negotiating
    } else {
        NegotiationStatus::Inquiring
    }
}

/// Шаг прогресса сделки 0..=5
///
/// 0 нет котировок, 1 торг, 2 котировка принята, 3 черновик контракта,
/// 4 ждёт подписи, 5 подписан.
pub fn transaction_step(messages: &[UiMessage], perspective: &Perspective) -> u8 {
    match derive_flow_state(messages, perspective).map(|s| s.phase) {
        Some(NegotiationPhase::Signed | NegotiationPhase::Executing | NegotiationPhase::Completed) => 5,
        Some(NegotiationPhase::Pending | NegotiationPhase::Signing) => 4,
        Some(NegotiationPhase::Draft) => 3,
        _ if has_accepted_quote(messages) => 2,
        _ if has_quote(messages) => 1,
        _ => 0,
    }
}

/// Контракт можно создать: есть принятая котировка и ещё нет контракта
pub fn can_draft_contract(messages: &[UiMessage]) -> bool {
    has_accepted_quote(messages) && !has_contract_message(messages)
}

pub fn can_sign_contract(messages: &[UiMessage], perspective: &Perspective) -> bool {
    derive_flow_state(messages, perspective).is_some_and(|s| s.can_sign_now)
}

/// Формальный контракт: обе стороны подтвердили условия принятой котировки
pub fn can_generate_contract(messages: &[UiMessage]) -> bool {
    terms_confirmation(messages).both() && can_draft_contract(messages)
}
