//! System prompt templates keyed by prompt type.

use std::collections::BTreeMap;
use std::path::Path;

use chatrelay_core::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

const BUILTIN_PROMPTS: &str = include_str!("../prompts/prompts.json");

/// A single system-instruction template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Any other fields present in the resource, kept as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PromptTemplate {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            description: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// Static mapping of prompt type to template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptTable {
    entries: BTreeMap<String, PromptTemplate>,
}

impl PromptTable {
    /// The prompt table bundled with the crate.
    pub fn builtin() -> Self {
        // The bundled resource is checked by `test_builtin_parses`.
        Self::from_json(BUILTIN_PROMPTS).unwrap_or_default()
    }

    /// Load a prompt table from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let table = Self::from_json(&json)?;
        debug!("Loaded {} prompt types from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn insert(&mut self, prompt_type: impl Into<String>, template: PromptTemplate) {
        self.entries.insert(prompt_type.into(), template);
    }

    pub fn get(&self, prompt_type: &str) -> Option<&PromptTemplate> {
        self.entries.get(prompt_type)
    }

    pub fn contains(&self, prompt_type: &str) -> bool {
        self.entries.contains_key(prompt_type)
    }

    /// Content for `prompt_type`, or for `default_type` when the first is absent.
    pub fn resolve(&self, prompt_type: &str, default_type: &str) -> Option<&str> {
        self.get(prompt_type)
            .or_else(|| self.get(default_type))
            .map(|t| t.content.as_str())
    }

    /// All prompt types, sorted.
    pub fn prompt_types(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, PromptTemplate)> for PromptTable {
    fn from_iter<I: IntoIterator<Item = (String, PromptTemplate)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PromptTable {
        PromptTable::from_json(
            r#"{
                "general": {"content": "Be helpful."},
                "coding": {"content": "Write code.", "description": "dev", "tags": ["x"]}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_builtin_parses() {
        let table = PromptTable::from_json(BUILTIN_PROMPTS).unwrap();
        assert!(table.contains(chatrelay_core::config::DEFAULT_PROMPT_TYPE));
        assert!(!table.get("general").unwrap().content.is_empty());
    }

    #[test]
    fn test_resolve_present_key() {
        let table = sample();
        assert_eq!(table.resolve("coding", "general"), Some("Write code."));
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let table = sample();
        assert_eq!(table.resolve("poetry", "general"), Some("Be helpful."));
    }

    #[test]
    fn test_resolve_both_missing() {
        let table = sample();
        assert_eq!(table.resolve("poetry", "haiku"), None);
    }

    #[test]
    fn test_extra_fields_preserved() {
        let table = sample();
        let coding = table.get("coding").unwrap();
        assert_eq!(coding.description.as_deref(), Some("dev"));
        assert_eq!(coding.extra["tags"], serde_json::json!(["x"]));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        std::fs::write(&path, r#"{"review": {"content": "Review this."}}"#).unwrap();

        let table = PromptTable::load(&path).unwrap();
        assert_eq!(table.prompt_types().collect::<Vec<_>>(), vec!["review"]);
    }

    #[test]
    fn test_load_rejects_missing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        std::fs::write(&path, r#"{"review": {"description": "no content"}}"#).unwrap();
        assert!(PromptTable::load(&path).is_err());
    }
}
