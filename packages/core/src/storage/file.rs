// Хранилище в JSON-файле: все ключи одним объектом

use crate::storage::KeyValueStore;
use crate::utils::error::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Файл из глобальной конфигурации
    pub fn from_config() -> Self {
        Self::new(&crate::config::Config::global().archive_file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        match serde_json::from_str(&raw) {
            Ok(values) => Ok(values),
            Err(e) => {
                tracing::warn!("Storage file {} is corrupt, ignoring: {}", self.path.display(), e);
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        // через временный файл, чтобы не оставить половину JSON
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string_pretty(values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        let mut values = self.read_all()?;
        if values.remove(key).is_some() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ArchiveStorage;
    use std::collections::BTreeSet;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("negotiation-core-{}", crate::utils::uuid::generate_v4()))
            .join(name)
    }

    #[test]
    fn test_archive_survives_reload() {
        let path = temp_path("archive.json");
        let ids: BTreeSet<i64> = [5, 8].into_iter().collect();

        let mut storage = FileStorage::new(&path);
        storage.save_archived(&ids).unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.load_archived().unwrap(), ids);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_and_corrupt_file() {
        let path = temp_path("broken.json");
        let storage = FileStorage::new(&path);
        assert!(storage.get_item("x").unwrap().is_none());

        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();
        assert!(storage.load_archived().unwrap().is_empty());

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
