//! Guard file marking a source tree as already instrumented.
//!
//! Instrumentation rewrites files in place and cannot be resumed or undone,
//! so a second run over the same checkout is refused.

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const GUARD_FILE: &str = "lava.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentToken {
    pub name: String,
    pub value: String,
}

pub fn guard_path(root: &Path) -> PathBuf {
    root.join(GUARD_FILE)
}

/// Fail when the tree under `root` has been instrumented before.
pub fn ensure_pristine(root: &Path) -> Result<()> {
    let path = guard_path(root);
    if path.exists() {
        bail!(
            "{} was instrumented previously ({} exists). Run against a fresh checkout.",
            root.display(),
            path.display()
        );
    }
    Ok(())
}

/// Write the guard file with a fresh token and return the token.
pub fn write_token(root: &Path) -> Result<InstrumentToken> {
    let token = InstrumentToken {
        name: "INSTRUMENT_TOKEN".to_string(),
        value: STANDARD.encode(Utc::now().to_rfc3339()),
    };
    let path = guard_path(root);
    let json = serde_json::to_string_pretty(&token)?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write guard file: {}", path.display()))?;
    Ok(token)
}
