use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::catalog::ALL_TOPICS;
use crate::store::{KeyValueStore, StoreError};

pub const EXPORT_VERSION: u32 = 1;

const WORD_PREFIX: &str = "stats:word";
const TOPIC_PREFIX: &str = "stats:topic";

/// Key for a term's performance record. Source text is lowercased so that
/// "Hund" and "hund" share history.
pub fn word_key(topic: &str, source_text: &str) -> String {
    let topic = if topic.is_empty() { ALL_TOPICS } else { topic };
    format!(
        "{WORD_PREFIX}:{topic}:{}",
        source_text.trim().to_lowercase()
    )
}

/// Key for a topic's cumulative record; `None` is the all-topics sentinel.
pub fn topic_key(topic: Option<&str>) -> String {
    format!("{TOPIC_PREFIX}:{}", topic.unwrap_or(ALL_TOPICS))
}

/// Read and decode a record. Missing keys yield `Ok(None)`.
pub fn load_record<T, S>(store: &S, key: &str) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn save_record<T, S>(store: &mut S, key: &str, record: &T) -> Result<(), StoreError>
where
    T: Serialize,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(record)?;
    store.set(key, &raw)
}

/// Everything the file store persists, bundled for backup and transfer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportData {
    pub vocabdrill_export_version: u32,
    pub exported_at: DateTime<Utc>,
    pub entries: BTreeMap<String, String>,
}
