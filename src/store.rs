//! Original-content store: pre-injection file contents, captured once per key.
//!
//! Payloads are base64-encoded so binary-unsafe bytes survive the trip to the
//! upload collaborator. The store is append-only: a second capture for a key
//! that is already present is ignored, so content from a file that has since
//! been rewritten can never replace the original.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

use crate::models::basename;

/// How entries are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKey {
    /// File basename. What the reporting backend expects; files sharing a
    /// basename in different directories collide (first capture wins).
    #[default]
    Basename,
    /// Path relative to the source root, `/`-separated.
    Relative,
}

/// One captured payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OriginalContent {
    /// Base64 of the bytes as they were before any mutation.
    pub payload: String,
    /// Hex SHA-256 of the raw bytes.
    pub sha256: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct OriginalContentStore {
    entries: BTreeMap<String, OriginalContent>,
}

impl OriginalContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key under which `path` is stored.
    pub fn key_for(policy: ContentKey, root: &Path, path: &Path) -> String {
        match policy {
            ContentKey::Basename => basename(path),
            ContentKey::Relative => path
                .strip_prefix(root)
                .unwrap_or(path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join("/"),
        }
    }

    /// Store `bytes` under `key` unless the key is already present.
    ///
    /// Returns `true` when this call created the entry.
    pub fn capture(&mut self, key: impl Into<String>, bytes: &[u8]) -> bool {
        let key = key.into();
        if self.entries.contains_key(&key) {
            tracing::debug!(key = %key, "original content already captured");
            return false;
        }
        let sha256 = format!("{:x}", Sha256::digest(bytes));
        self.entries.insert(
            key,
            OriginalContent {
                payload: STANDARD.encode(bytes),
                sha256,
            },
        );
        true
    }

    pub fn get(&self, key: &str) -> Option<&OriginalContent> {
        self.entries.get(key)
    }

    /// Decoded original bytes for `key`.
    pub fn original_bytes(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        match self.entries.get(key) {
            Some(entry) => Ok(Some(STANDARD.decode(&entry.payload)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
