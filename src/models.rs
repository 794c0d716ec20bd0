//! Core data models used throughout the instrumenter.
//!
//! These types describe what a run is targeting ([`Mode`]), what a probe is
//! attached to ([`ConstructKind`]), and what each instrumented file reports
//! back ([`ExecutableLineRecord`]).

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Target-language profile for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Plain browser JavaScript (`.js`).
    Web,
    /// Angular TypeScript (`.ts`).
    Angular,
    /// Unity C# (`.cs`).
    Unity,
}

impl Mode {
    /// File extension (without the dot) of the sources this mode instruments.
    pub fn extension(&self) -> &'static str {
        match self {
            Mode::Web => "js",
            Mode::Angular => "ts",
            Mode::Unity => "cs",
        }
    }

    /// Whether HTML templates (and `index.html`) are part of the run.
    pub fn has_templates(&self) -> bool {
        !matches!(self, Mode::Unity)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Web => "web",
            Mode::Angular => "angular",
            Mode::Unity => "unity",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural element a probe is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructKind {
    Function,
    BranchIf,
    BranchElse,
    BranchSwitch,
    Statement,
    Loop,
}

impl ConstructKind {
    /// Tag passed to the runtime inside the probe call.
    pub fn tag(&self) -> &'static str {
        match self {
            ConstructKind::Function => "function",
            ConstructKind::BranchIf => "branch_if",
            ConstructKind::BranchElse => "branch_else",
            ConstructKind::BranchSwitch => "branch_switch",
            ConstructKind::Statement => "statement",
            ConstructKind::Loop => "loop",
        }
    }
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One injected probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeCall {
    pub probe_id: Uuid,
    pub filename: String,
    /// 1-based line number in the rewritten file.
    pub line_number: usize,
    pub kind: ConstructKind,
}

/// Lines of a file that received a probe.
///
/// Serialized the way the reporting backend expects it: a comma-joined list
/// of line numbers, or `"-1"` for non-code files carrying one synthetic probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutableLines {
    Lines(Vec<usize>),
    Synthetic,
}

impl fmt::Display for ExecutableLines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutableLines::Synthetic => f.write_str("-1"),
            ExecutableLines::Lines(lines) => {
                let joined = lines
                    .iter()
                    .map(|l| l.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                f.write_str(&joined)
            }
        }
    }
}

impl Serialize for ExecutableLines {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Per-file summary of how many and which lines received probes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutableLineRecord {
    /// Basename of the instrumented file.
    pub file: String,
    pub count: usize,
    #[serde(rename = "executable")]
    pub executable_lines: ExecutableLines,
}

impl ExecutableLineRecord {
    pub fn from_lines(file: impl Into<String>, lines: Vec<usize>) -> Self {
        Self {
            file: file.into(),
            count: lines.len(),
            executable_lines: ExecutableLines::Lines(lines),
        }
    }

    /// Record for an index/template page: one synthetic probe.
    pub fn synthetic(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            count: 1,
            executable_lines: ExecutableLines::Synthetic,
        }
    }
}

/// Ordered, append-only list of source files taking part in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFileSet {
    paths: Vec<PathBuf>,
}

impl SourceFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }
}

/// Basename of a path as an owned string (empty when there is none).
pub fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_count_matches_lines() {
        let record = ExecutableLineRecord::from_lines("app.js", vec![3, 7, 12]);
        assert_eq!(record.count, 3);
        assert_eq!(record.executable_lines.to_string(), "3,7,12");
    }

    #[test]
    fn synthetic_record_uses_sentinel() {
        let record = ExecutableLineRecord::synthetic("index.html");
        assert_eq!(record.count, 1);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["executable"], "-1");
        assert_eq!(json["file"], "index.html");
    }

    #[test]
    fn empty_record_serializes_empty_string() {
        let record = ExecutableLineRecord::from_lines("empty.js", vec![]);
        assert_eq!(record.count, 0);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["executable"], "");
    }

    #[test]
    fn probe_call_serializes_id_as_string() {
        let probe = ProbeCall {
            probe_id: Uuid::from_u128(1),
            filename: "app.js".to_string(),
            line_number: 4,
            kind: ConstructKind::BranchElse,
        };
        let json = serde_json::to_value(&probe).unwrap();
        assert_eq!(json["probe_id"], "00000000-0000-0000-0000-000000000001");
        assert_eq!(json["kind"], "branch_else");
    }

    #[test]
    fn mode_extensions() {
        assert_eq!(Mode::Web.extension(), "js");
        assert_eq!(Mode::Angular.extension(), "ts");
        assert_eq!(Mode::Unity.extension(), "cs");
        assert!(!Mode::Unity.has_templates());
    }
}
