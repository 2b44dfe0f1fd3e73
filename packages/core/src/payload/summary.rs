// Форматирование котировок для отображения

use super::format_number;
use super::quote::{QuoteBody, QuoteField, QuotePayload};

/// Подпись котировки, для которой payload не разобрался
pub const QUOTE_FALLBACK: &str = "[Quote]";
/// Подпись спотовой котировки без цены и объёма
pub const EMPTY_QUOTE_LABEL: &str = "Quote card";

/// Строка карточки котировки
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayField {
    pub key: String,
    pub label: String,
    pub value: String,
}

/// Разбить целую часть числовой строки по тысячам: `2435.5` → `2,435.5`
pub fn group_thousands(raw: &str) -> String {
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };

    if !int_part.chars().all(|c| c.is_ascii_digit()) {
        return raw.to_string();
    }

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

/// Число со знаком: `+15`, `-20`, `0`
pub fn signed(value: f64) -> String {
    if value > 0.0 {
        format!("+{}", format_number(value))
    } else {
        format_number(value)
    }
}

fn currency(value: f64) -> String {
    format!("¥{}", group_thousands(&format_number(value)))
}

fn currency_2dp(value: f64) -> String {
    format!("¥{}", group_thousands(&format!("{:.2}", value)))
}

/// Каноническая строка поля; `None`, если поле отсутствует у этой формы
pub fn format_field(quote: &QuotePayload, field: QuoteField) -> Option<String> {
    let terms = quote.terms();

    match (&quote.body, field) {
        (QuoteBody::Spot(spot), QuoteField::Price) => {
            spot.price.as_ref().map(|price| format!("¥{}/t", price))
        }
        (QuoteBody::Basis(basis), QuoteField::ContractCode) => {
            (!basis.contract_code.is_empty()).then(|| basis.contract_code.clone())
        }
        (QuoteBody::Basis(basis), QuoteField::ContractName) => basis.contract_name.clone(),
        (QuoteBody::Basis(basis), QuoteField::BasisPrice) => {
            Some(format!("{} CNY/t", signed(basis.basis_price)))
        }
        (QuoteBody::Basis(basis), QuoteField::FuturesPrice) => basis.futures_price.map(currency),
        (QuoteBody::Basis(basis), QuoteField::ReferencePrice) => {
            basis.reference_price.map(currency_2dp)
        }
        (_, QuoteField::Quantity) => quote.quantity().map(str::to_string),
        (_, QuoteField::Unit) => quote.unit().map(str::to_string),
        (_, QuoteField::DeliveryMethod) => terms.delivery_method.clone(),
        (_, QuoteField::DeliveryPlace) => terms.delivery_place.clone(),
        (_, QuoteField::ArrivalDate) => terms.arrival_date.clone(),
        (_, QuoteField::PaymentMethod) => terms.payment_method.clone(),
        (_, QuoteField::InvoiceType) => terms.invoice_type.clone(),
        (_, QuoteField::Packaging) => terms.packaging.clone(),
        (_, QuoteField::Remark) => terms.remark.clone(),
        _ => None,
    }
}

/// Строки карточки: основные поля, параметры продукта, затем примечание
pub fn display_fields(quote: &QuotePayload) -> Vec<DisplayField> {
    let mut rows = Vec::new();

    for field in QuoteField::ALL {
        if field == QuoteField::Remark {
            continue;
        }
        // код контракта показываем, только если нет названия
        if field == QuoteField::ContractCode
            && format_field(quote, QuoteField::ContractName).is_some()
        {
            continue;
        }
        if let Some(value) = format_field(quote, field) {
            rows.push(DisplayField {
                key: field.key().to_string(),
                label: field.label().to_string(),
                value,
            });
        }
    }

    for (name, value) in &quote.terms().params {
        rows.push(DisplayField {
            key: format!("param_{}", name),
            label: name.clone(),
            value: value.clone(),
        });
    }

    if let Some(remark) = format_field(quote, QuoteField::Remark) {
        rows.push(DisplayField {
            key: QuoteField::Remark.key().to_string(),
            label: QuoteField::Remark.label().to_string(),
            value: remark,
        });
    }

    rows
}

/// Однострочная подпись котировки
pub fn summarize(quote: &QuotePayload) -> String {
    match &quote.body {
        QuoteBody::Basis(basis) => {
            let contract = basis
                .contract_name
                .as_deref()
                .unwrap_or(basis.contract_code.as_str());
            format!(
                "{} | basis {} | ref {}",
                contract,
                signed(basis.basis_price),
                currency_2dp(basis.reference_price.unwrap_or_default())
            )
        }
        QuoteBody::Spot(spot) => {
            let parts: Vec<String> = spot
                .price
                .iter()
                .map(|price| format!("¥{}", price))
                .chain(spot.quantity.iter().cloned())
                .collect();
            if parts.is_empty() {
                EMPTY_QUOTE_LABEL.to_string()
            } else {
                parts.join(" · ")
            }
        }
    }
}

/// Подпись для необязательной котировки
pub fn summarize_opt(quote: Option<&QuotePayload>) -> String {
    quote
        .map(summarize)
        .unwrap_or_else(|| QUOTE_FALLBACK.to_string())
}

/// Краткое описание изменения цены относительно предыдущей котировки
pub fn price_change_summary(current: &QuotePayload, previous: &QuotePayload) -> Option<String> {
    match (&current.body, &previous.body) {
        (QuoteBody::Basis(cur), QuoteBody::Basis(prev)) => {
            let delta = cur.basis_price - prev.basis_price;
            if delta == 0.0 {
                return None;
            }
            Some(format!(
                "basis {}→{} ({})",
                format_number(prev.basis_price),
                format_number(cur.basis_price),
                signed(delta)
            ))
        }
        (QuoteBody::Spot(cur), QuoteBody::Spot(prev)) => {
            let cur_price = cur.price.as_deref()?;
            let prev_price = prev.price.as_deref()?;
            let old: f64 = prev_price.trim().parse().ok()?;
            let new: f64 = cur_price.trim().parse().ok()?;
            let delta = new - old;
            if old == 0.0 || delta == 0.0 {
                return None;
            }
            Some(format!(
                "price ¥{}→¥{} ({})",
                prev_price,
                cur_price,
                signed(delta.round())
            ))
        }
        _ => None,
    }
}
