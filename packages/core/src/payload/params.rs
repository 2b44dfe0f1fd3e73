// Динамические параметры продукта
//
// Поддерживаемые формы:
//   {"protein": "43%", "moisture": "12%"}
//   {"params": {"1": {"name": "protein", "value": "43%"}}}
//   {"params": {"protein": "43%"}}

use super::{parse_payload_value, scalar_to_string};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Параметры продукта: имя → значение, упорядочены по имени
pub type ProductParams = BTreeMap<String, String>;

/// Разобрать `paramsJson`; при ошибке возвращает пустой набор
pub fn parse_product_params(raw: &str) -> ProductParams {
    parse_payload_value(raw)
        .map(|value| normalize_params(&value))
        .unwrap_or_default()
}

/// Привести параметры любой поддерживаемой формы к плоскому словарю
pub fn normalize_params(value: &Value) -> ProductParams {
    let Some(obj) = value.as_object() else {
        return ProductParams::new();
    };

    let wrapped = obj.get("params").and_then(Value::as_object);
    let source = wrapped.unwrap_or(obj);
    let mut result = ProductParams::new();

    for (key, entry) in source {
        if entry.is_object() {
            if let Some((name, val)) = named_entry(entry) {
                result.insert(name, val);
            }
            continue;
        }

        // в старом формате числовой ключ допустим только с {name, value}
        if wrapped.is_some() && key.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }

        if matches!(entry, Value::String(_) | Value::Number(_)) {
            if let Some(val) = scalar_to_string(entry) {
                result.insert(key.clone(), val);
            }
        }
    }

    result
}

fn named_entry(entry: &Value) -> Option<(String, String)> {
    let obj: &Map<String, Value> = entry.as_object()?;
    let name = obj.get("name").and_then(scalar_to_string)?;
    let value = obj.get("value").and_then(scalar_to_string)?;
    Some((name, value))
}

/// Убрать пустые значения и лишние пробелы
pub fn filter_empty_params(params: &ProductParams) -> ProductParams {
    params
        .iter()
        .filter_map(|(k, v)| {
            let v = v.trim();
            (!v.is_empty()).then(|| (k.clone(), v.to_string()))
        })
        .collect()
}

/// Извлечь параметры из снимка предмета переговоров (`paramsJson` внутри)
pub fn params_from_snapshot(snapshot: &Value) -> ProductParams {
    match snapshot.get("paramsJson") {
        Some(Value::String(raw)) => parse_product_params(raw),
        Some(value @ Value::Object(_)) => normalize_params(value),
        _ => ProductParams::new(),
    }
}
