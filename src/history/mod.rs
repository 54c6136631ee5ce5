//! Persisted generation history.
//!
//! Every successful generation becomes one [`LogEntry`] stored under
//! `<date>/<sanitized-vibe-name>.json`. The store is append-only from the
//! service's point of view: entries are written once and only read afterwards.

pub mod file;

use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

pub use file::FileRecipeLog;

pub const PLACEHOLDER_NAME: &str = "unknown_recipe";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Failed to read file: {0}")]
    Read(String),
    #[error("Failed to list {}: {source}", path.display())]
    List { path: PathBuf, source: io::Error },
    #[error("Failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("Failed to encode log entry: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Local>,
    pub user_input: String,
    pub image_count: usize,
    pub model: String,
    /// The model's mapping as parsed, including keys outside the recipe schema.
    pub output: Map<String, Value>,
}

impl LogEntry {
    pub fn new(
        user_input: &str,
        image_count: usize,
        model: &str,
        output: Map<String, Value>,
    ) -> Self {
        LogEntry {
            id: Uuid::new_v4().to_string(),
            timestamp: Local::now(),
            user_input: user_input.to_string(),
            image_count,
            model: model.to_string(),
            output,
        }
    }

    pub fn date_key(&self) -> String {
        self.timestamp.format("%Y-%m-%d").to_string()
    }

    pub fn file_stem(&self) -> String {
        sanitize_name(self.output.get("vibe_match").and_then(|v| v.as_str()))
    }
}

/// Where a stored entry ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryLocation {
    pub date: String,
    pub file_name: String,
    pub path: PathBuf,
}

/// Storage backend for generation history.
pub trait RecipeLog: Send + Sync {
    /// Stores the entry. An existing entry with the same date and name is replaced.
    fn put(&self, entry: &LogEntry) -> Result<EntryLocation, HistoryError>;
    /// Date keys, newest first.
    fn list_dates(&self) -> Result<Vec<String>, HistoryError>;
    /// Entry file names for one date, ascending.
    fn list_entries(&self, date: &str) -> Result<Vec<String>, HistoryError>;
    fn get(&self, date: &str, name: &str) -> Result<Value, HistoryError>;
}

/// Keeps alphanumerics, spaces, hyphens, underscores and dots, trims, then
/// turns each remaining space into an underscore.
pub fn sanitize_name(vibe_match: Option<&str>) -> String {
    let Some(vibe_match) = vibe_match else {
        return PLACEHOLDER_NAME.to_string();
    };

    let kept: String = vibe_match
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.'))
        .collect();
    let name = kept.trim().replace(' ', "_");

    // "." and ".." would escape or alias the date directory.
    if name.is_empty() || name.chars().all(|c| c == '.') {
        PLACEHOLDER_NAME.to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuation_variants_collide() {
        assert_eq!(sanitize_name(Some("Tokyo Night!")), "Tokyo_Night");
        assert_eq!(sanitize_name(Some("Tokyo Night?")), "Tokyo_Night");
    }

    #[test]
    fn keeps_unicode_letters_and_safe_punctuation() {
        assert_eq!(
            sanitize_name(Some("東京 夜景 (Neon-Noir) v1.2")),
            "東京_夜景_Neon-Noir_v1.2"
        );
        assert_eq!(sanitize_name(Some("  a/b\\c  ")), "abc");
    }

    #[test]
    fn falls_back_to_placeholder() {
        assert_eq!(sanitize_name(None), PLACEHOLDER_NAME);
        assert_eq!(sanitize_name(Some("!!!")), PLACEHOLDER_NAME);
        assert_eq!(sanitize_name(Some("..")), PLACEHOLDER_NAME);
    }

    #[test]
    fn entry_derives_stem_from_output() {
        let mut output = Map::new();
        output.insert("vibe_match".to_string(), Value::from("Golden Hour"));
        let entry = LogEntry::new("sunset", 0, "gpt-4o", output);
        assert_eq!(entry.file_stem(), "Golden_Hour");
        assert_eq!(entry.date_key().len(), 10);

        let entry = LogEntry::new("sunset", 0, "gpt-4o", Map::new());
        assert_eq!(entry.file_stem(), PLACEHOLDER_NAME);
    }
}
