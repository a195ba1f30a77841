//! Intent catalog loading
//!
//! Reads the intent definitions file once at startup and validates it.
//! The catalog is immutable after load.

use crate::error::ChatbotError;
use crate::models::{Intent, TrainingExample};
use crate::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Accepted layouts of the definitions file
#[derive(Deserialize)]
#[serde(untagged)]
enum DefinitionsFile {
    List(Vec<Intent>),
    Wrapped { intents: Vec<Intent> },
}

/// Fixed catalog of intents, in file order
#[derive(Debug, Clone)]
pub struct IntentCatalog {
    intents: Vec<Intent>,
    index_by_tag: HashMap<String, usize>,
}

impl IntentCatalog {
    /// Load and validate the definitions file at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let raw = std::fs::read_to_string(path).map_err(|e| {
            ChatbotError::LoadError(format!(
                "Failed to read intent definitions {}: {}",
                path.display(),
                e
            ))
        })?;

        let catalog = Self::from_json_str(&raw)?;

        info!(
            path = %path.display(),
            intents = catalog.len(),
            "Loaded intent catalog"
        );

        Ok(catalog)
    }

    /// Parse and validate an in-memory definitions document
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let intents = match serde_json::from_str::<DefinitionsFile>(raw) {
            Ok(DefinitionsFile::List(intents)) => intents,
            Ok(DefinitionsFile::Wrapped { intents }) => intents,
            Err(e) => {
                return Err(ChatbotError::LoadError(format!(
                    "Malformed intent definitions (expected a list of {{tag, patterns, responses}}): {}",
                    e
                )))
            }
        };

        Self::from_intents(intents)
    }

    /// Build a catalog from already-parsed intents
    pub fn from_intents(intents: Vec<Intent>) -> Result<Self> {
        if intents.is_empty() {
            return Err(ChatbotError::LoadError(
                "Intent definitions contain no intents".to_string(),
            ));
        }

        let mut index_by_tag = HashMap::with_capacity(intents.len());

        for (idx, intent) in intents.iter().enumerate() {
            if intent.patterns.is_empty() {
                return Err(ChatbotError::LoadError(format!(
                    "Intent '{}' has no patterns",
                    intent.tag
                )));
            }
            if intent.responses.is_empty() {
                return Err(ChatbotError::LoadError(format!(
                    "Intent '{}' has no responses",
                    intent.tag
                )));
            }
            if index_by_tag.insert(intent.tag.clone(), idx).is_some() {
                return Err(ChatbotError::LoadError(format!(
                    "Duplicate intent tag '{}'",
                    intent.tag
                )));
            }

            debug!(intent = %intent, "Registered intent");
        }

        Ok(Self {
            intents,
            index_by_tag,
        })
    }

    /// Look up an intent by tag
    pub fn get(&self, tag: &str) -> Option<&Intent> {
        self.index_by_tag.get(tag).map(|&idx| &self.intents[idx])
    }

    /// Iterate over intents in file order
    pub fn iter(&self) -> impl Iterator<Item = &Intent> {
        self.intents.iter()
    }

    /// Tags in file order
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.intents.iter().map(|i| i.tag.as_str())
    }

    /// Flattened (pattern, tag) pairs: intent order, then pattern order
    pub fn training_set(&self) -> Vec<TrainingExample<'_>> {
        self.intents
            .iter()
            .flat_map(|intent| {
                intent.patterns.iter().map(move |pattern| TrainingExample {
                    pattern: pattern.as_str(),
                    tag: intent.tag.as_str(),
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }
}
