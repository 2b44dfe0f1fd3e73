// Пополевое сравнение котировок

use super::quote::{QuoteField, QuotePayload};
use super::summary::format_field;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Changed,
}

/// Изменение одного поля
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    /// Ключ поля; параметры продукта имеют вид `param_<имя>`
    pub key: String,
    pub label: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub kind: ChangeKind,
}

fn classify(
    key: String,
    label: String,
    old_value: Option<String>,
    new_value: Option<String>,
) -> Option<FieldChange> {
    let kind = match (&old_value, &new_value) {
        (None, None) => return None,
        (Some(old), Some(new)) if old == new => return None,
        (None, Some(_)) => ChangeKind::Added,
        (Some(_), None) => ChangeKind::Removed,
        (Some(_), Some(_)) => ChangeKind::Changed,
    };

    Some(FieldChange {
        key,
        label,
        old_value,
        new_value,
        kind,
    })
}

/// Сравнить котировку с предыдущей.
///
/// Сравниваются отформатированные строки, а не сырые значения, поэтому
/// `"10"` и `10` считаются равными. Без `previous` каждое присутствующее
/// поле считается добавленным.
pub fn diff(current: &QuotePayload, previous: Option<&QuotePayload>) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    for field in QuoteField::ALL {
        let new_value = format_field(current, field);
        let old_value = previous.and_then(|prev| format_field(prev, field));
        changes.extend(classify(
            field.key().to_string(),
            field.label().to_string(),
            old_value,
            new_value,
        ));
    }

    let current_params = &current.terms().params;
    let previous_params = previous.map(|prev| &prev.terms().params);

    let names: BTreeSet<&String> = current_params
        .keys()
        .chain(previous_params.into_iter().flat_map(|p| p.keys()))
        .collect();

    for name in names {
        let new_value = current_params.get(name).cloned();
        let old_value = previous_params.and_then(|p| p.get(name)).cloned();
        changes.extend(classify(
            format!("param_{}", name),
            name.clone(),
            old_value,
            new_value,
        ));
    }

    changes
}
