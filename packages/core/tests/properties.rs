//! Свойства ядра переговоров
//!
//! Проверяются законы, которые должны выполняться для любых входных данных
//! из перечисленных семейств: порядок подтверждений, сравнение котировок,
//! нормализация, задержки переподключения и вывод фазы сделки.

use negotiation_core::config::Config;
use negotiation_core::payload::quote::{BasisQuote, QuoteTerms, SpotQuote};
use negotiation_core::payload::{diff, normalize, ChangeKind, Party, QuotePayload, TradeType};
use negotiation_core::protocol::transport::{ReconnectPolicy, ReconnectState};
use negotiation_core::state::flow::{can_sign_contract, derive_flow_state, Perspective};
use negotiation_core::storage::models::{DeliveryStatus, MessageId, MessageKind, ServerMessage, UiMessage};
use negotiation_core::MessageStore;
use serde_json::json;
use std::time::Duration;

/// Все перестановки индексов 0..n (алгоритм Хипа)
fn permutations(n: usize) -> Vec<Vec<usize>> {
    fn heap(k: usize, items: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if k <= 1 {
            out.push(items.clone());
            return;
        }
        for i in 0..k - 1 {
            heap(k - 1, items, out);
            if k % 2 == 0 {
                items.swap(i, k - 1);
            } else {
                items.swap(0, k - 1);
            }
        }
        heap(k - 1, items, out);
    }

    let mut items: Vec<usize> = (0..n).collect();
    let mut out = Vec::new();
    heap(n, &mut items, &mut out);
    out
}

fn sample_quotes() -> Vec<QuotePayload> {
    let spot = QuotePayload::spot(SpotQuote {
        price: Some("4500".to_string()),
        quantity: Some("100".to_string()),
        unit: Some("ton".to_string()),
        terms: QuoteTerms {
            delivery_place: Some("Port A".to_string()),
            remark: Some("FOB".to_string()),
            ..Default::default()
        },
    });
    let basis = QuotePayload::basis(BasisQuote {
        contract_code: "M2405".to_string(),
        contract_name: Some("Soybean meal".to_string()),
        basis_price: -30.0,
        futures_price: Some(3200.0),
        reference_price: None,
        quantity: Some("500".to_string()),
        unit: Some("ton".to_string()),
        terms: QuoteTerms::default(),
    });
    vec![spot, basis]
}

// ============================================================================
// Порядок подтверждений
// ============================================================================

/// Подтверждения в любом порядке сохраняют порядок вставки
#[test]
fn test_confirmation_order_is_insertion_order() {
    let orders = permutations(4);
    assert_eq!(orders.len(), 24);

    for order in orders {
        let mut store = MessageStore::new(1);
        store.reset_for(Some(10));
        let temp_ids: Vec<String> = (0..4)
            .map(|i| {
                store
                    .add_pending_message(10, MessageKind::Text, format!("m{}", i), None)
                    .id
                    .to_string()
            })
            .collect();

        for &i in &order {
            assert!(store.confirm_message(&temp_ids[i], 1000 + i as i64));
        }

        let ids: Vec<MessageId> = store.messages().iter().map(|m| m.id.clone()).collect();
        let expected: Vec<MessageId> = (0..4).map(|i| MessageId::Server(1000 + i)).collect();
        assert_eq!(ids, expected, "Order broken for confirmation sequence {:?}", order);
        assert!(store
            .messages()
            .iter()
            .all(|m| m.delivery_status == Some(DeliveryStatus::Sent)));
        assert_eq!(store.pending_count(), 0);
    }
}

// ============================================================================
// Сравнение и нормализация котировок
// ============================================================================

/// Котировка не отличается от самой себя; без предыдущей всё добавлено
#[test]
fn test_diff_laws() {
    for quote in sample_quotes() {
        assert!(diff(&quote, Some(&quote)).is_empty(), "Self diff must be empty for {:?}", quote);

        let added = diff(&quote, None);
        assert!(!added.is_empty());
        assert!(added.iter().all(|c| c.kind == ChangeKind::Added && c.old_value.is_none()));
    }
}

/// Повторная нормализация сериализованной котировки ничего не меняет
#[test]
fn test_normalization_is_idempotent() {
    let inputs = vec![
        json!({"kind": "QUOTE_V2", "tradeType": "SPOT", "version": 2,
               "fields": {"price": 4500, "quantity": "100", "unit": "ton", "deliveryPlace": "Port A"}}),
        json!({"kind": "QUOTE_V2", "tradeType": "BASIS", "parentQuoteId": 12, "changedFields": ["basisPrice"],
               "fields": {"contractCode": "M2405", "basisPrice": "-30", "quantity": "500"}}),
        json!({"kind": "QUOTE_V1", "fields": {"price": "100", "quantity": "5 tons"}}),
        json!({"kind": "BASIS_QUOTE_V1", "fields": {"contractCode": "C2409", "basisPrice": 15, "quantity": "50"}}),
        json!({"fields": {"price": "88", "paymentMethod": "T/T"}}),
        json!({"price": "100", "quantity": "5 tons"}),
        json!({"basisPrice": 20, "contractCode": "Y2501", "quantity": "10"}),
    ];

    for input in inputs {
        let first = normalize(&input).unwrap_or_else(|| panic!("Not a quote: {}", input));
        let second = normalize(&first.to_wire_value())
            .unwrap_or_else(|| panic!("Re-serialized quote unreadable: {}", input));

        assert!(diff(&second, Some(&first)).is_empty(), "Normalization drifted for {}", input);
        assert_eq!(second.trade_type(), first.trade_type());
        assert_eq!(second.meta.version, first.meta.version);
        assert_eq!(second.meta.parent_quote_id, first.meta.parent_quote_id);
    }
}

/// Плоский legacy-объект приводится к спотовой котировке
#[test]
fn test_flat_legacy_payload_is_spot() {
    let quote = normalize(&json!({"price": "100", "quantity": "5 tons"})).unwrap();

    assert_eq!(quote.trade_type(), TradeType::Spot);
    assert_eq!(quote.quantity(), Some("5 tons"));
    assert_eq!(quote.to_wire_value()["fields"]["price"], "100");
}

// ============================================================================
// Переподключение
// ============================================================================

/// Задержка min(8000, 500 * k), не убывает, счётчик сбрасывается
#[test]
fn test_backoff_is_monotonic_and_resets() {
    let policy = ReconnectPolicy::from_config(&Config::default());
    let mut state = ReconnectState::new(policy);

    let mut previous = Duration::ZERO;
    for k in 1..=24u64 {
        let delay = state.next_delay();
        assert_eq!(delay, Duration::from_millis((500 * k).min(8000)), "attempt {}", k);
        assert!(delay >= previous);
        assert_eq!(state.attempts() as u64, k);
        previous = delay;
    }

    state.reset();
    assert_eq!(state.attempts(), 0);
    assert_eq!(state.next_delay(), Duration::from_millis(500));
}

// ============================================================================
// Фаза сделки
// ============================================================================

fn contract_message(id: i64, buyer_signed: bool, seller_signed: bool) -> UiMessage {
    let payload = json!({
        "contractId": 31,
        "status": 1,
        "buyerSigned": buyer_signed,
        "sellerSigned": seller_signed,
    });
    let server = ServerMessage {
        id,
        conversation_id: Some(10),
        from_user_id: 2,
        to_user_id: Some(1),
        msg_type: Some("CONTRACT".to_string()),
        content: None,
        payload_json: Some(payload.to_string()),
        quote_status: None,
        read: false,
        create_time: None,
    };
    UiMessage::from_server(&server, 1, 10)
}

/// Подписать может сторона, чьей подписи ещё нет
#[test]
fn test_can_sign_follows_signatures() {
    let buyer = Perspective::Party(Party::Buyer);
    let seller = Perspective::Party(Party::Seller);

    let unsigned = vec![contract_message(1, false, false)];
    assert!(can_sign_contract(&unsigned, &buyer));
    assert!(can_sign_contract(&unsigned, &seller));

    let buyer_signed = vec![contract_message(1, false, false), contract_message(2, true, false)];
    assert!(!can_sign_contract(&buyer_signed, &buyer));
    assert!(can_sign_contract(&buyer_signed, &seller));
}

/// Вывод фазы зависит только от ленты
#[test]
fn test_flow_derivation_is_deterministic() {
    let messages = vec![contract_message(1, true, false)];
    let perspective = Perspective::Party(Party::Seller);

    let first = derive_flow_state(&messages, &perspective);
    for _ in 0..5 {
        assert_eq!(derive_flow_state(&messages, &perspective), first);
    }
    assert!(derive_flow_state(&[], &perspective).is_none());
}
