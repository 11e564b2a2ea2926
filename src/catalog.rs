use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rust_embed::Embed;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Topic key standing in for "every topic".
pub const ALL_TOPICS: &str = "All";

const DEFAULT_TOPIC: &str = "Misc";

#[derive(Embed)]
#[folder = "assets/catalogs/"]
struct CatalogAssets;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("catalog not found: {0}")]
    NotFound(String),

    #[error("catalog has no usable entries")]
    Empty,
}

/// One catalog entry. Shared behind `Arc` once loaded and never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub topic: String,
    #[serde(rename = "en")]
    pub source_text: String,
    #[serde(rename = "de")]
    pub target_text: String,
    #[serde(default)]
    pub hint: String,
}

impl Term {
    pub fn new(topic: &str, source_text: &str, target_text: &str) -> Self {
        Self {
            topic: topic.to_string(),
            source_text: source_text.to_string(),
            target_text: target_text.to_string(),
            hint: String::new(),
        }
    }

    pub fn with_hint(mut self, hint: &str) -> Self {
        self.hint = hint.to_string();
        self
    }

    pub fn matches_source(&self, text: &str) -> bool {
        self.source_text.to_lowercase() == text.trim().to_lowercase()
    }
}

#[derive(Deserialize)]
struct RawEntry {
    #[serde(default)]
    en: Option<String>,
    #[serde(default)]
    de: Option<String>,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

#[derive(Deserialize)]
struct RawCatalog {
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    entries: Vec<RawEntry>,
}

impl RawEntry {
    fn into_term(self) -> Option<Term> {
        let source_text = self.en.unwrap_or_default().trim().to_string();
        if source_text.is_empty() {
            return None;
        }
        let topic = self
            .topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TOPIC.to_string());
        Some(Term {
            topic,
            source_text,
            target_text: self.de.unwrap_or_default().trim().to_string(),
            hint: self.hint.unwrap_or_default(),
        })
    }
}

/// In-memory term catalog, in file order.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    topics: Vec<String>,
    entries: Vec<Arc<Term>>,
}

impl Catalog {
    pub fn from_terms(terms: Vec<Term>) -> Self {
        Self {
            topics: Vec::new(),
            entries: terms.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = serde_json::from_str(json)?;
        let entries: Vec<Arc<Term>> = raw
            .entries
            .into_iter()
            .filter_map(RawEntry::into_term)
            .map(Arc::new)
            .collect();
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        let topics = raw
            .topics
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        Ok(Self { topics, entries })
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path)
            .map_err(|e| CatalogError::NotFound(format!("{}: {e}", path.display())))?;
        Self::from_json(&content)
    }

    /// Look for `{config_dir}/vocabdrill/catalogs/{name}.json`, then the
    /// bundled catalogs.
    pub fn load(name: &str) -> Result<Self, CatalogError> {
        if let Some(path) = Self::user_catalog_path(name)
            && path.exists()
        {
            return Self::from_path(&path);
        }

        let filename = format!("{name}.json");
        let file = CatalogAssets::get(&filename)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;
        let content = std::str::from_utf8(file.data.as_ref())
            .map_err(|_| CatalogError::NotFound(format!("{name} is not valid UTF-8")))?;
        Self::from_json(content)
    }

    pub fn bundled_names() -> Vec<String> {
        let mut names: Vec<String> = CatalogAssets::iter()
            .filter_map(|f| f.strip_suffix(".json").map(|s| s.to_string()))
            .collect();
        names.sort();
        names
    }

    #[cfg(feature = "network")]
    pub fn fetch(url: &str) -> Result<Self, CatalogError> {
        let unreachable = |e: reqwest::Error| CatalogError::NotFound(format!("{url}: {e}"));
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(unreachable)?;
        let response = client.get(url).send().map_err(unreachable)?;
        if !response.status().is_success() {
            return Err(CatalogError::NotFound(format!(
                "{url}: HTTP {}",
                response.status()
            )));
        }
        let body = response.text().map_err(unreachable)?;
        Self::from_json(&body)
    }

    #[cfg(not(feature = "network"))]
    pub fn fetch(url: &str) -> Result<Self, CatalogError> {
        Err(CatalogError::NotFound(format!(
            "{url}: built without network support"
        )))
    }

    fn user_catalog_path(name: &str) -> Option<PathBuf> {
        dirs::config_dir().map(|d| {
            d.join("vocabdrill")
                .join("catalogs")
                .join(format!("{name}.json"))
        })
    }

    /// Declared topics, or the distinct entry topics in first-seen order.
    pub fn topics(&self) -> Vec<String> {
        if !self.topics.is_empty() {
            return self.topics.clone();
        }
        let mut seen: Vec<String> = Vec::new();
        for term in &self.entries {
            if !seen.contains(&term.topic) {
                seen.push(term.topic.clone());
            }
        }
        seen
    }

    pub fn entries(&self) -> &[Arc<Term>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries for a topic; `None` or the sentinel means every entry.
    pub fn pool(&self, topic: Option<&str>) -> Vec<&Arc<Term>> {
        match topic {
            None | Some(ALL_TOPICS) => self.entries.iter().collect(),
            Some(t) => self.entries.iter().filter(|e| e.topic == t).collect(),
        }
    }

    pub fn has_topic(&self, topic: &str) -> bool {
        topic == ALL_TOPICS || self.entries.iter().any(|e| e.topic == topic)
    }
}
