// Котировки: каноническая модель и нормализация всех поколений формата

use super::params::{normalize_params, ProductParams};
use super::{parse_payload_value, scalar_to_f64, scalar_to_string};
use crate::utils::time::{now_iso, parse_timestamp};
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

pub const KIND_QUOTE_V1: &str = "QUOTE_V1";
pub const KIND_QUOTE_V2: &str = "QUOTE_V2";
pub const KIND_BASIS_QUOTE_V1: &str = "BASIS_QUOTE_V1";

/// Тип сделки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeType {
    Spot,
    Basis,
}

/// Метаданные котировки, общие для обеих форм
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuoteMeta {
    /// 1 или 2
    pub version: u8,
    pub created_at: Option<String>,
    pub expires_at: Option<String>,
    /// id сообщения с котировкой, на которую отвечает эта
    pub parent_quote_id: Option<i64>,
    /// Ключи полей, изменённых относительно родителя
    pub changed_fields: Vec<String>,
}

impl QuoteMeta {
    pub fn new(version: u8) -> Self {
        Self {
            version,
            created_at: Some(now_iso()),
            ..Default::default()
        }
    }
}

/// Условия поставки и коммерческие условия
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuoteTerms {
    pub delivery_method: Option<String>,
    pub delivery_place: Option<String>,
    pub arrival_date: Option<String>,
    pub payment_method: Option<String>,
    pub invoice_type: Option<String>,
    pub packaging: Option<String>,
    pub remark: Option<String>,
    pub params: ProductParams,
}

/// Спотовая котировка: цена за единицу и объём
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpotQuote {
    pub price: Option<String>,
    pub quantity: Option<String>,
    pub unit: Option<String>,
    pub terms: QuoteTerms,
}

/// Базисная котировка: надбавка к фьючерсному контракту
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BasisQuote {
    pub contract_code: String,
    pub contract_name: Option<String>,
    pub basis_price: f64,
    pub futures_price: Option<f64>,
    pub reference_price: Option<f64>,
    pub quantity: Option<String>,
    pub unit: Option<String>,
    pub terms: QuoteTerms,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuoteBody {
    Spot(SpotQuote),
    Basis(BasisQuote),
}

/// Каноническая котировка
#[derive(Debug, Clone, PartialEq)]
pub struct QuotePayload {
    pub meta: QuoteMeta,
    pub body: QuoteBody,
}

/// Поля котировки в порядке отображения
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteField {
    Price,
    ContractCode,
    ContractName,
    BasisPrice,
    FuturesPrice,
    ReferencePrice,
    Quantity,
    Unit,
    DeliveryMethod,
    DeliveryPlace,
    ArrivalDate,
    PaymentMethod,
    InvoiceType,
    Packaging,
    Remark,
}

static FIELD_BY_KEY: Lazy<HashMap<&'static str, QuoteField>> =
    Lazy::new(|| QuoteField::ALL.iter().map(|f| (f.key(), *f)).collect());

impl QuoteField {
    pub const ALL: [QuoteField; 15] = [
        QuoteField::Price,
        QuoteField::ContractCode,
        QuoteField::ContractName,
        QuoteField::BasisPrice,
        QuoteField::FuturesPrice,
        QuoteField::ReferencePrice,
        QuoteField::Quantity,
        QuoteField::Unit,
        QuoteField::DeliveryMethod,
        QuoteField::DeliveryPlace,
        QuoteField::ArrivalDate,
        QuoteField::PaymentMethod,
        QuoteField::InvoiceType,
        QuoteField::Packaging,
        QuoteField::Remark,
    ];

    /// Ключ поля в wire-формате
    pub fn key(&self) -> &'static str {
        match self {
            QuoteField::Price => "price",
            QuoteField::ContractCode => "contractCode",
            QuoteField::ContractName => "contractName",
            QuoteField::BasisPrice => "basisPrice",
            QuoteField::FuturesPrice => "futuresPrice",
            QuoteField::ReferencePrice => "referencePrice",
            QuoteField::Quantity => "quantity",
            QuoteField::Unit => "unit",
            QuoteField::DeliveryMethod => "deliveryMethod",
            QuoteField::DeliveryPlace => "deliveryPlace",
            QuoteField::ArrivalDate => "arrivalDate",
            QuoteField::PaymentMethod => "paymentMethod",
            QuoteField::InvoiceType => "invoiceType",
            QuoteField::Packaging => "packaging",
            QuoteField::Remark => "remark",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuoteField::Price => "Unit price",
            QuoteField::ContractCode => "Contract code",
            QuoteField::ContractName => "Futures contract",
            QuoteField::BasisPrice => "Basis",
            QuoteField::FuturesPrice => "Futures price",
            QuoteField::ReferencePrice => "Reference price",
            QuoteField::Quantity => "Quantity",
            QuoteField::Unit => "Unit",
            QuoteField::DeliveryMethod => "Delivery method",
            QuoteField::DeliveryPlace => "Delivery place",
            QuoteField::ArrivalDate => "Arrival date",
            QuoteField::PaymentMethod => "Payment method",
            QuoteField::InvoiceType => "Invoice type",
            QuoteField::Packaging => "Packaging",
            QuoteField::Remark => "Remark",
        }
    }

    pub fn from_key(key: &str) -> Option<QuoteField> {
        FIELD_BY_KEY.get(key).copied()
    }
}

/// Подпись для произвольного ключа; неизвестные ключи возвращаются как есть
pub fn field_label(key: &str) -> String {
    match QuoteField::from_key(key) {
        Some(field) => field.label().to_string(),
        None => key.strip_prefix("param_").unwrap_or(key).to_string(),
    }
}

// ============================================
// НОРМАЛИЗАЦИЯ
// ============================================

/// Разобрать `payloadJson` сообщения в каноническую котировку
pub fn parse_quote_payload(raw: &str) -> Option<QuotePayload> {
    parse_payload_value(raw).and_then(|value| normalize(&value))
}

/// Привести JSON любого поддерживаемого поколения к [`QuotePayload`].
///
/// Порядок распознавания: тег `kind`, обёртка `fields` без тега,
/// плоский legacy-объект. Всё остальное даёт `None`.
pub fn normalize(value: &Value) -> Option<QuotePayload> {
    match value {
        Value::Object(obj) => normalize_object(obj),
        Value::String(inner) => serde_json::from_str::<Value>(inner)
            .ok()
            .and_then(|v| v.as_object().and_then(normalize_object)),
        _ => None,
    }
}

fn normalize_object(obj: &Map<String, Value>) -> Option<QuotePayload> {
    let kind = obj.get("kind").and_then(Value::as_str);

    match kind {
        Some(KIND_QUOTE_V2) => {
            let fields = FieldReader::new(fields_of(obj));
            let trade_type = obj
                .get("tradeType")
                .and_then(|v| serde_json::from_value::<TradeType>(v.clone()).ok())
                .unwrap_or_else(|| fields.inferred_trade_type());
            return Some(build(read_meta(obj, 2), trade_type, &fields));
        }
        Some(KIND_BASIS_QUOTE_V1) => {
            let fields = FieldReader::new(fields_of(obj));
            return Some(build(read_meta(obj, 1), TradeType::Basis, &fields));
        }
        Some(KIND_QUOTE_V1) => {
            let fields = FieldReader::new(fields_of(obj));
            return Some(build(read_meta(obj, 1), TradeType::Spot, &fields));
        }
        Some(other) => {
            tracing::debug!("Unknown quote kind {}, trying structural detection", other);
        }
        None => {}
    }

    if let Some(fields) = obj.get("fields").and_then(Value::as_object) {
        let fields = FieldReader::new(fields);
        return Some(build(read_meta(obj, 1), fields.inferred_trade_type(), &fields));
    }

    let legacy = ["price", "quantity", "basisPrice"]
        .iter()
        .any(|key| obj.get(*key).is_some_and(|v| !v.is_null()));
    if legacy {
        let fields = FieldReader::new(obj);
        return Some(build(read_meta(obj, 1), fields.inferred_trade_type(), &fields));
    }

    None
}

fn fields_of(obj: &Map<String, Value>) -> &Map<String, Value> {
    obj.get("fields").and_then(Value::as_object).unwrap_or(obj)
}

fn read_meta(obj: &Map<String, Value>, version: u8) -> QuoteMeta {
    let text = |key: &str| obj.get(key).and_then(scalar_to_string);

    QuoteMeta {
        version,
        created_at: text("createdAt"),
        expires_at: text("expiresAt"),
        parent_quote_id: obj.get("parentQuoteId").and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }),
        changed_fields: obj
            .get("changedFields")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(scalar_to_string).collect())
            .unwrap_or_default(),
    }
}

fn build(meta: QuoteMeta, trade_type: TradeType, fields: &FieldReader<'_>) -> QuotePayload {
    let terms = QuoteTerms {
        delivery_method: fields.text("deliveryMethod"),
        delivery_place: fields.text("deliveryPlace"),
        arrival_date: fields.text("arrivalDate"),
        payment_method: fields.text("paymentMethod"),
        invoice_type: fields.text("invoiceType"),
        packaging: fields.text("packaging"),
        remark: fields.text("remark"),
        params: fields.params(),
    };

    let body = match trade_type {
        TradeType::Spot => QuoteBody::Spot(SpotQuote {
            price: fields.text("price"),
            quantity: fields.text("quantity"),
            unit: fields.text("unit"),
            terms,
        }),
        TradeType::Basis => QuoteBody::Basis(BasisQuote {
            contract_code: fields.text("contractCode").unwrap_or_default(),
            contract_name: fields.text("contractName"),
            basis_price: fields.number("basisPrice").unwrap_or_default(),
            futures_price: fields.number("futuresPrice"),
            reference_price: fields.number("referencePrice"),
            quantity: fields.text("quantity"),
            unit: fields.text("unit"),
            terms,
        }),
    };

    QuotePayload { meta, body }
}

struct FieldReader<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> FieldReader<'a> {
    fn new(map: &'a Map<String, Value>) -> Self {
        Self { map }
    }

    fn text(&self, key: &str) -> Option<String> {
        self.map.get(key).and_then(scalar_to_string)
    }

    fn number(&self, key: &str) -> Option<f64> {
        self.map.get(key).and_then(scalar_to_f64)
    }

    fn params(&self) -> ProductParams {
        ["productParams", "dynamicParams"]
            .iter()
            .find_map(|key| self.map.get(*key).filter(|v| v.is_object()))
            .map(normalize_params)
            .unwrap_or_default()
    }

    /// Базис, если есть `basisPrice` или непустой `contractCode`
    fn inferred_trade_type(&self) -> TradeType {
        let has_basis = self.map.get("basisPrice").is_some_and(|v| !v.is_null());
        let has_contract = self.text("contractCode").is_some();
        if has_basis || has_contract {
            TradeType::Basis
        } else {
            TradeType::Spot
        }
    }
}

// ============================================
// СЕРИАЛИЗАЦИЯ
// ============================================

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct WireFields<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quantity: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    contract_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    contract_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    basis_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    futures_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    delivery_method: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    delivery_place: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    arrival_date: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_method: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    invoice_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    packaging: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dynamic_params: Option<&'a ProductParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_params: Option<&'a ProductParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remark: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireQuote<'a> {
    version: u8,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_quote_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trade_type: Option<TradeType>,
    fields: WireFields<'a>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    changed_fields: &'a Vec<String>,
}

impl QuotePayload {
    /// Новая спотовая котировка первой версии
    pub fn spot(fields: SpotQuote) -> Self {
        Self {
            meta: QuoteMeta::new(1),
            body: QuoteBody::Spot(fields),
        }
    }

    /// Новая базисная котировка первой версии
    pub fn basis(fields: BasisQuote) -> Self {
        Self {
            meta: QuoteMeta::new(1),
            body: QuoteBody::Basis(fields),
        }
    }

    /// Встречная котировка (V2) со ссылкой на родителя и списком изменённых полей
    pub fn counter(
        body: QuoteBody,
        parent: Option<(i64, &QuotePayload)>,
        expires_at: Option<String>,
    ) -> Self {
        let mut quote = Self {
            meta: QuoteMeta::new(2),
            body,
        };
        quote.meta.expires_at = expires_at;

        if let Some((parent_id, previous)) = parent {
            quote.meta.parent_quote_id = Some(parent_id);
            quote.meta.changed_fields = super::diff::diff(&quote, Some(previous))
                .into_iter()
                .map(|change| change.key)
                .collect();
        }

        quote
    }

    pub fn kind(&self) -> &'static str {
        match (self.meta.version, &self.body) {
            (2, _) => KIND_QUOTE_V2,
            (_, QuoteBody::Basis(_)) => KIND_BASIS_QUOTE_V1,
            (_, QuoteBody::Spot(_)) => KIND_QUOTE_V1,
        }
    }

    pub fn trade_type(&self) -> TradeType {
        match self.body {
            QuoteBody::Spot(_) => TradeType::Spot,
            QuoteBody::Basis(_) => TradeType::Basis,
        }
    }

    pub fn is_basis(&self) -> bool {
        self.trade_type() == TradeType::Basis
    }

    pub fn quantity(&self) -> Option<&str> {
        match &self.body {
            QuoteBody::Spot(spot) => spot.quantity.as_deref(),
            QuoteBody::Basis(basis) => basis.quantity.as_deref(),
        }
    }

    pub fn unit(&self) -> Option<&str> {
        match &self.body {
            QuoteBody::Spot(spot) => spot.unit.as_deref(),
            QuoteBody::Basis(basis) => basis.unit.as_deref(),
        }
    }

    pub fn terms(&self) -> &QuoteTerms {
        match &self.body {
            QuoteBody::Spot(spot) => &spot.terms,
            QuoteBody::Basis(basis) => &basis.terms,
        }
    }

    /// Котировка просрочена, если `expiresAt` раньше `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expires| expires < now)
    }

    /// Оставшееся время жизни; `None`, если срока нет
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expires_at()
            .map(|expires| (expires - now).max(Duration::zero()))
    }

    fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.meta
            .expires_at
            .as_deref()
            .and_then(|raw| parse_timestamp(raw, &Utc))
    }

    /// Сериализовать в JSON той версии, которая записана в `meta.version`
    pub fn to_wire_value(&self) -> Value {
        let v2 = self.meta.version == 2;
        let terms = self.terms();

        let mut fields = WireFields {
            quantity: self.quantity(),
            unit: self.unit(),
            delivery_method: terms.delivery_method.as_deref(),
            delivery_place: terms.delivery_place.as_deref(),
            arrival_date: terms.arrival_date.as_deref(),
            payment_method: terms.payment_method.as_deref(),
            invoice_type: terms.invoice_type.as_deref(),
            packaging: terms.packaging.as_deref(),
            remark: terms.remark.as_deref(),
            ..Default::default()
        };

        if !terms.params.is_empty() {
            if v2 {
                fields.product_params = Some(&terms.params);
            } else {
                fields.dynamic_params = Some(&terms.params);
            }
        }

        match &self.body {
            QuoteBody::Spot(spot) => {
                fields.price = spot.price.as_deref();
            }
            QuoteBody::Basis(basis) => {
                fields.contract_code = Some(basis.contract_code.as_str());
                fields.contract_name = basis.contract_name.as_deref();
                fields.basis_price = Some(basis.basis_price);
                fields.futures_price = basis.futures_price;
                fields.reference_price = basis.reference_price;
            }
        }

        let wire = WireQuote {
            version: if v2 { 2 } else { 1 },
            kind: self.kind(),
            created_at: self.meta.created_at.as_deref(),
            expires_at: self.meta.expires_at.as_deref(),
            parent_quote_id: self.meta.parent_quote_id,
            trade_type: v2.then(|| self.trade_type()),
            fields,
            changed_fields: &self.meta.changed_fields,
        };

        serde_json::to_value(wire).unwrap_or(Value::Null)
    }

    pub fn to_wire_json(&self) -> String {
        self.to_wire_value().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn spot_body(obj: &QuotePayload) -> &SpotQuote {
        match &obj.body {
            QuoteBody::Spot(spot) => spot,
            QuoteBody::Basis(_) => panic!("expected spot quote"),
        }
    }

    fn basis_body(obj: &QuotePayload) -> &BasisQuote {
        match &obj.body {
            QuoteBody::Basis(basis) => basis,
            QuoteBody::Spot(_) => panic!("expected basis quote"),
        }
    }

    #[test]
    fn test_normalize_v2_basis() {
        let quote = normalize(&json!({
            "version": 2,
            "kind": "QUOTE_V2",
            "tradeType": "BASIS",
            "parentQuoteId": 41,
            "changedFields": ["basisPrice"],
            "fields": {
                "contractCode": "M2505",
                "basisPrice": 15,
                "referencePrice": 2435,
                "quantity": "100",
                "productParams": {"protein": "43%"}
            }
        }))
        .unwrap();

        assert_eq!(quote.meta.version, 2);
        assert_eq!(quote.meta.parent_quote_id, Some(41));
        assert_eq!(quote.meta.changed_fields, vec!["basisPrice".to_string()]);
        let basis = basis_body(&quote);
        assert_eq!(basis.contract_code, "M2505");
        assert_eq!(basis.basis_price, 15.0);
        assert_eq!(basis.terms.params.get("protein").unwrap(), "43%");
    }

    #[test]
    fn test_normalize_v1_kinds() {
        let spot = normalize(&json!({
            "version": 1,
            "kind": "QUOTE_V1",
            "fields": {"price": "420", "quantity": "50 tons", "dynamicParams": {"ash": "5%"}}
        }))
        .unwrap();
        assert_eq!(spot.kind(), KIND_QUOTE_V1);
        assert_eq!(spot_body(&spot).price.as_deref(), Some("420"));
        assert_eq!(spot.terms().params.get("ash").unwrap(), "5%");

        let basis = normalize(&json!({
            "kind": "BASIS_QUOTE_V1",
            "fields": {"contractCode": "M2505", "basisPrice": "-20", "quantity": "10"}
        }))
        .unwrap();
        assert_eq!(basis_body(&basis).basis_price, -20.0);
    }

    #[test]
    fn test_normalize_untagged_fields_wrapper() {
        let basis = normalize(&json!({"fields": {"contractCode": "M2505"}})).unwrap();
        assert!(basis.is_basis());

        let spot = normalize(&json!({"fields": {"price": "100"}})).unwrap();
        assert!(!spot.is_basis());
        assert_eq!(spot.meta.version, 1);
    }

    #[test]
    fn test_normalize_flat_legacy() {
        let spot = normalize(&json!({"price": "100", "quantity": "10"})).unwrap();
        assert_eq!(spot_body(&spot).quantity.as_deref(), Some("10"));

        let basis = normalize(&json!({"basisPrice": 12, "contractCode": "RM505"})).unwrap();
        assert_eq!(basis_body(&basis).contract_code, "RM505");

        assert!(normalize(&json!({"text": "hello"})).is_none());
        assert!(normalize(&json!([1, 2, 3])).is_none());
    }

    #[test]
    fn test_parse_quote_payload_invalid_json() {
        assert!(parse_quote_payload("{broken").is_none());
        assert!(parse_quote_payload("").is_none());
        assert!(parse_quote_payload(r#"{"price":"100"}"#).is_some());
    }

    #[test]
    fn test_wire_roundtrip_preserves_version() {
        let quote = normalize(&json!({
            "version": 2,
            "kind": "QUOTE_V2",
            "tradeType": "SPOT",
            "createdAt": "2025-03-01T00:00:00Z",
            "expiresAt": "2025-03-02T00:00:00Z",
            "fields": {"price": "410", "quantity": "50", "productParams": {"protein": "43%"}}
        }))
        .unwrap();

        let wire = quote.to_wire_value();
        assert_eq!(wire["kind"], "QUOTE_V2");
        assert_eq!(wire["tradeType"], "SPOT");
        assert_eq!(wire["fields"]["productParams"]["protein"], "43%");
        assert_eq!(normalize(&wire).unwrap(), quote);
    }

    #[test]
    fn test_expiry() {
        let mut quote = QuotePayload::spot(SpotQuote {
            price: Some("100".into()),
            ..Default::default()
        });
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        assert!(!quote.is_expired(now));
        assert!(quote.remaining(now).is_none());

        quote.meta.expires_at = Some("2025-03-01T13:00:00Z".into());
        assert!(!quote.is_expired(now));
        assert_eq!(quote.remaining(now), Some(Duration::hours(1)));

        let later = Utc.with_ymd_and_hms(2025, 3, 1, 14, 0, 0).unwrap();
        assert!(quote.is_expired(later));
        assert_eq!(quote.remaining(later), Some(Duration::zero()));
    }

    #[test]
    fn test_counter_records_changed_fields() {
        let previous = QuotePayload::spot(SpotQuote {
            price: Some("420".into()),
            quantity: Some("50".into()),
            ..Default::default()
        });
        let counter = QuotePayload::counter(
            QuoteBody::Spot(SpotQuote {
                price: Some("410".into()),
                quantity: Some("50".into()),
                ..Default::default()
            }),
            Some((7, &previous)),
            None,
        );

        assert_eq!(counter.kind(), KIND_QUOTE_V2);
        assert_eq!(counter.meta.parent_quote_id, Some(7));
        assert_eq!(counter.meta.changed_fields, vec!["price".to_string()]);
    }

    #[test]
    fn test_field_labels() {
        assert_eq!(field_label("basisPrice"), "Basis");
        assert_eq!(field_label("param_protein"), "protein");
        assert_eq!(QuoteField::from_key("remark"), Some(QuoteField::Remark));
    }
}
