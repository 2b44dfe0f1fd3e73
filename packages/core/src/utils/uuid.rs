// Временные идентификаторы сообщений

use std::sync::atomic::{AtomicU64, Ordering};

/// Префикс временных id, по нему сервер и клиент отличают их от числовых id
pub const TEMP_ID_PREFIX: &str = "temp_";

static TEMP_ID_SEQ: AtomicU64 = AtomicU64::new(0);

pub fn generate_v4() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Сгенерировать временный id для оптимистичного сообщения.
///
/// Уникален в пределах процесса: монотонный счётчик плюс случайный хвост,
/// чтобы id не совпадали и между перезапусками клиента.
pub fn generate_temp_id() -> String {
    let seq = TEMP_ID_SEQ.fetch_add(1, Ordering::Relaxed);
    let tail = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}_{}", TEMP_ID_PREFIX, seq, &tail[..12])
}

pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}
