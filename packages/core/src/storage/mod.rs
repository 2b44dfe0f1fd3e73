// Модуль хранилища: локальные флаги клиента (архив бесед)

pub mod file;
pub mod memory;
pub mod models;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::utils::error::Result;
use std::collections::BTreeSet;

/// Ключ, под которым хранится множество архивных бесед
pub const ARCHIVE_KEY: &str = "chat_archived_conversations";

/// Простое строковое key-value хранилище
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&mut self, key: &str) -> Result<()>;
}

/// Хранилище множества архивных бесед
pub trait ArchiveStorage {
    fn load_archived(&self) -> Result<BTreeSet<i64>>;
    fn save_archived(&mut self, ids: &BTreeSet<i64>) -> Result<()>;
}

impl<T: KeyValueStore> ArchiveStorage for T {
    /// Повреждённое значение трактуется как пустой архив
    fn load_archived(&self) -> Result<BTreeSet<i64>> {
        let Some(raw) = self.get_item(ARCHIVE_KEY)? else {
            return Ok(BTreeSet::new());
        };

        match serde_json::from_str::<Vec<i64>>(&raw) {
            Ok(ids) => Ok(ids.into_iter().collect()),
            Err(e) => {
                tracing::warn!("Archived conversation list is corrupt, starting empty: {}", e);
                Ok(BTreeSet::new())
            }
        }
    }

    fn save_archived(&mut self, ids: &BTreeSet<i64>) -> Result<()> {
        let ids: Vec<i64> = ids.iter().copied().collect();
        self.set_item(ARCHIVE_KEY, &serde_json::to_string(&ids)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_roundtrip_and_corruption() {
        let mut storage = MemoryStorage::new();
        assert!(storage.load_archived().unwrap().is_empty());

        let ids: BTreeSet<i64> = [3, 1, 2].into_iter().collect();
        storage.save_archived(&ids).unwrap();
        assert_eq!(storage.load_archived().unwrap(), ids);
        assert_eq!(storage.get_item(ARCHIVE_KEY).unwrap().unwrap(), "[1,2,3]");

        storage.set_item(ARCHIVE_KEY, "{oops").unwrap();
        assert!(storage.load_archived().unwrap().is_empty());
    }
}
