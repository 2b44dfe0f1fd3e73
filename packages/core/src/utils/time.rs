// Работа со временем

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// Форматы, в которых сервер отдаёт `createTime` / `lastTime` без смещения
const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Текущее время в ISO-8601 (UTC, миллисекунды)
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Разобрать серверную метку времени в часовом поясе `tz`.
///
/// RFC 3339 со смещением переводится в `tz`; метки без смещения считаются
/// локальными для `tz`.
pub fn parse_timestamp<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<DateTime<Tz>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(tz));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
}

/// Полночь того же дня, что и `now`, в его часовом поясе
pub fn local_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| now.timezone().from_local_datetime(&naive).earliest())
        .unwrap_or_else(|| now.clone())
}
