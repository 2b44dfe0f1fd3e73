// In-memory storage для тестов и клиентов без диска

use crate::storage::KeyValueStore;
use crate::utils::error::Result;
use std::collections::HashMap;

/// In-memory хранилище
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    values: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let mut storage = MemoryStorage::new();
        storage.set_item("a", "1").unwrap();
        assert_eq!(storage.get_item("a").unwrap().as_deref(), Some("1"));
        assert_eq!(storage.len(), 1);

        storage.remove_item("a").unwrap();
        assert!(storage.get_item("a").unwrap().is_none());
        assert!(storage.is_empty());
    }
}
