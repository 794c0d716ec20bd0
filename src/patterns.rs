//! Pattern tables: the ordered structural patterns recognised per [`Mode`].
//!
//! Order within a table is a priority list. The [`matcher`](crate::matcher)
//! consults entries front to back and the first hit wins for a line.

use regex::Regex;
use std::ops::Range;

use crate::models::{ConstructKind, Mode};

/// Extra condition checked against the text around a regex hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Guard {
    None,
    /// The closing `)` of the hit must not be followed (after whitespace) by
    /// `;`. Separates `function f() {` from a forward call `function f();`.
    NotFollowedBySemicolon,
}

/// One (structural pattern, construct kind) pair.
#[derive(Debug, Clone)]
pub struct PatternEntry {
    regex: Regex,
    kind: ConstructKind,
    guard: Guard,
}

impl PatternEntry {
    fn new(pattern: &str, kind: ConstructKind) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            kind,
            guard: Guard::None,
        })
    }

    fn guarded(mut self, guard: Guard) -> Self {
        self.guard = guard;
        self
    }

    pub fn kind(&self) -> ConstructKind {
        self.kind
    }

    /// Byte span of the first acceptable hit in `line`.
    pub fn find(&self, line: &str) -> Option<Range<usize>> {
        match self.guard {
            Guard::None => self.regex.find(line).map(|m| m.range()),
            Guard::NotFollowedBySemicolon => self
                .regex
                .find_iter(line)
                .find(|m| {
                    let close = match m.as_str().rfind(')') {
                        Some(i) => m.start() + i + 1,
                        None => return true,
                    };
                    !line[close..].trim_start().starts_with(';')
                })
                .map(|m| m.range()),
        }
    }
}

/// Ordered list of patterns for one mode.
#[derive(Debug, Clone)]
pub struct PatternTable {
    mode: Mode,
    entries: Vec<PatternEntry>,
}

impl PatternTable {
    pub fn for_mode(mode: Mode) -> Result<Self, regex::Error> {
        let entries = match mode {
            Mode::Web => web_entries()?,
            Mode::Angular => angular_entries()?,
            Mode::Unity => unity_entries()?,
        };
        Ok(Self { mode, entries })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn entries(&self) -> &[PatternEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn web_entries() -> Result<Vec<PatternEntry>, regex::Error> {
    Ok(vec![
        PatternEntry::new(r"\bfunction\b[\s\w]+\([\w,\s]*\)\s*\{*", ConstructKind::Function)?
            .guarded(Guard::NotFollowedBySemicolon),
        PatternEntry::new(r#"\bif\b\s*\([\w\s"=&|]+\)\s*\{"#, ConstructKind::BranchIf)?,
        PatternEntry::new(r"\belse\b\s*\{", ConstructKind::BranchElse)?,
        PatternEntry::new(r";", ConstructKind::Statement)?,
        PatternEntry::new(r"\bcase\b\s*\w+:", ConstructKind::BranchSwitch)?,
        PatternEntry::new(r"\bdefault\b:", ConstructKind::BranchSwitch)?,
    ])
}

fn angular_entries() -> Result<Vec<PatternEntry>, regex::Error> {
    Ok(vec![PatternEntry::new(
        r"\w+\([\w\s:,=\{\}\[\]]*\)[:<>]*\s*[\w\[\]\(\)<>]*\s*\{",
        ConstructKind::Function,
    )?])
}

fn unity_entries() -> Result<Vec<PatternEntry>, regex::Error> {
    Ok(vec![
        PatternEntry::new(r"\w+\s+\w+\s*\(.*\)\s*\{", ConstructKind::Function)?,
        PatternEntry::new(r"(else)?\s*if\s*\(.*\)\s*\{", ConstructKind::BranchIf)?,
        PatternEntry::new(r"\belse\b\s*\{", ConstructKind::BranchElse)?,
        PatternEntry::new(r"(default|case).*:.*", ConstructKind::BranchSwitch)?,
        PatternEntry::new(r".*(while|for|foreach)\s*\(.*\)\s*\{", ConstructKind::Loop)?,
    ])
}
