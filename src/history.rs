//! Bounded, insertion-ordered prompt → image-URL history.
//!
//! Entries are kept in an explicit insertion-order list serialized as a JSON
//! array, never a map whose enumeration order could drift. Capacity is fixed;
//! inserting past it evicts the oldest entry. Overwriting an existing prompt
//! keeps its insertion position.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::{StorageBackend, StorageError};

/// Maximum number of prompts retained.
pub const MAX_ENTRIES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub prompt: String,
    pub image_url: String,
}

/// Prompt history persisted through a [`StorageBackend`].
///
/// Every operation is read-modify-write against the backend, so concurrent
/// stores sharing one file are not supported (matching the single-client
/// model).
#[derive(Debug)]
pub struct HistoryStore<B: StorageBackend> {
    backend: B,
}

impl<B: StorageBackend> HistoryStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// All entries, oldest first. A missing or unparseable blob reads as
    /// empty rather than an error.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        let blob = match self.backend.read() {
            Ok(Some(blob)) => blob,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read history: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&blob) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Discarding unparseable history: {}", e);
                Vec::new()
            }
        }
    }

    /// Exact-match lookup; prompts are compared verbatim.
    pub fn lookup(&self, prompt: &str) -> Option<String> {
        self.entries()
            .into_iter()
            .find(|e| e.prompt == prompt)
            .map(|e| e.image_url)
    }

    /// Insert or overwrite the entry for `prompt`, evicting the oldest entry
    /// when the capacity would be exceeded.
    pub fn put(&mut self, prompt: &str, image_url: &str) -> Result<(), StorageError> {
        let mut entries = self.entries();

        if let Some(entry) = entries.iter_mut().find(|e| e.prompt == prompt) {
            entry.image_url = image_url.to_string();
        } else {
            entries.push(HistoryEntry {
                prompt: prompt.to_string(),
                image_url: image_url.to_string(),
            });
        }

        while entries.len() > MAX_ENTRIES {
            let evicted = entries.remove(0);
            debug!("History full, evicting oldest prompt: {}", evicted.prompt);
        }

        let blob = serde_json::to_string(&entries)?;
        self.backend.write(&blob)
    }

    /// Remove the entire persisted history.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.backend.clear()
    }

    /// Prompts newest-first, for display.
    pub fn recent_prompts(&self) -> Vec<String> {
        let mut prompts: Vec<String> = self.entries().into_iter().map(|e| e.prompt).collect();
        prompts.reverse();
        prompts
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
