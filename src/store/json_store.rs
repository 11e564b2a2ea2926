use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Result, bail};
use chrono::Utc;

use crate::store::schema::{EXPORT_VERSION, ExportData};
use crate::store::{KeyValueStore, StoreError};

const STORE_FILE: &str = "store.json";

/// File-backed key/value store. The whole key space lives in one JSON object
/// that is rewritten atomically on every `set`.
pub struct JsonStore {
    base_dir: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonStore {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vocabdrill");
        Self::with_base_dir(base_dir)
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        let mut store = Self {
            base_dir,
            entries: BTreeMap::new(),
        };
        store.entries = store.load();
        Ok(store)
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    /// Unreadable or corrupt files start the key space over rather than
    /// refusing to open.
    fn load(&self) -> BTreeMap<String, String> {
        let path = self.file_path(STORE_FILE);
        if !path.exists() {
            return BTreeMap::new();
        }
        match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!("Discarding corrupt store file {}: {e}", path.display());
                BTreeMap::new()
            }),
            Err(e) => {
                log::warn!("Could not read store file {}: {e}", path.display());
                BTreeMap::new()
            }
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let path = self.file_path(STORE_FILE);
        let tmp_path = path.with_extension("tmp");

        let json = serde_json::to_string_pretty(entries)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn export_all(&self) -> ExportData {
        ExportData {
            vocabdrill_export_version: EXPORT_VERSION,
            exported_at: Utc::now(),
            entries: self.entries.clone(),
        }
    }

    /// Replace the key space with an export. The file is written before the
    /// in-memory copy changes, so a failed import leaves both untouched.
    pub fn import_all(&mut self, data: &ExportData) -> Result<()> {
        if data.vocabdrill_export_version != EXPORT_VERSION {
            bail!(
                "Unsupported export version: {} (expected {})",
                data.vocabdrill_export_version,
                EXPORT_VERSION
            );
        }
        if let Err(e) = self.save(&data.entries) {
            bail!("Import failed: {e}");
        }
        self.entries = data.entries.clone();
        Ok(())
    }
}

impl KeyValueStore for JsonStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut next = self.entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.save(&next)?;
        self.entries = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_test_store() -> (TempDir, JsonStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_values_survive_reopen() {
        let (dir, mut store) = make_test_store();
        store.set("stats:word:Food:apple", "{\"times_seen\":1}").unwrap();

        let reopened = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        assert_eq!(
            reopened.get("stats:word:Food:apple").unwrap().as_deref(),
            Some("{\"times_seen\":1}")
        );
    }

    #[test]
    fn test_no_tmp_file_left_after_set() {
        let (dir, mut store) = make_test_store();
        store.set("a", "1").unwrap();
        let tmp_files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .collect();
        assert!(tmp_files.is_empty(), "no residual .tmp files");
    }

    #[test]
    fn test_corrupt_file_opens_empty() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(STORE_FILE), "not json").unwrap();
        let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_failed_write_keeps_previous_value() {
        let (dir, mut store) = make_test_store();
        store.set("a", "1").unwrap();
        // A directory squatting on the tmp path makes File::create fail.
        fs::create_dir(dir.path().join("store.tmp")).unwrap();
        assert!(store.set("a", "2").is_err());
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_round_trip_export_import() {
        let (_dir, mut store) = make_test_store();
        store.set("stats:topic:All", "{\"plays\":3}").unwrap();

        let export = store.export_all();
        assert_eq!(export.vocabdrill_export_version, EXPORT_VERSION);

        let (_dir2, mut store2) = make_test_store();
        store2.import_all(&export).unwrap();
        assert_eq!(
            store2.get("stats:topic:All").unwrap().as_deref(),
            Some("{\"plays\":3}")
        );
    }

    #[test]
    fn test_version_rejection() {
        let (_dir, mut store) = make_test_store();
        let mut export = store.export_all();
        export.vocabdrill_export_version = 99;

        let result = store.import_all(&export);
        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("Unsupported export version"));
        assert!(err_msg.contains("99"));
    }
}
