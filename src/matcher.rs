//! Line matcher: run a [`PatternTable`] against one line of text.
//!
//! Each line is matched on its own. Entries earlier in the table pre-empt
//! later ones, so a line like `if (x) { y(); }` in web mode reports
//! `branch_if` even though it also contains a statement terminator.

use std::ops::Range;

use crate::models::ConstructKind;
use crate::patterns::PatternTable;

/// A successful match of one table entry against a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMatch {
    /// Index of the winning entry within its table.
    pub entry: usize,
    pub kind: ConstructKind,
    /// Byte span of the matched text within the line.
    pub span: Range<usize>,
}

impl LineMatch {
    pub fn text<'a>(&self, line: &'a str) -> &'a str {
        &line[self.span.clone()]
    }
}

/// First-wins matcher over a pattern table.
#[derive(Debug, Clone)]
pub struct LineMatcher {
    table: PatternTable,
}

impl LineMatcher {
    pub fn new(table: PatternTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PatternTable {
        &self.table
    }

    /// First matching entry for `line`, or `None`.
    pub fn match_line(&self, line: &str) -> Option<LineMatch> {
        self.match_from(line, 0)
    }

    /// First matching entry at or after table index `start`.
    ///
    /// Used when a rule suppresses a hit and the remaining entries still get
    /// their chance at the same line.
    pub fn match_from(&self, line: &str, start: usize) -> Option<LineMatch> {
        self.table
            .entries()
            .iter()
            .enumerate()
            .skip(start)
            .find_map(|(entry, pattern)| {
                pattern.find(line).map(|span| LineMatch {
                    entry,
                    kind: pattern.kind(),
                    span,
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Mode;

    fn matcher(mode: Mode) -> LineMatcher {
        LineMatcher::new(PatternTable::for_mode(mode).unwrap())
    }

    #[test]
    fn branch_pre_empts_statement() {
        let m = matcher(Mode::Web).match_line("if (x) { y(); }").unwrap();
        assert_eq!(m.kind, ConstructKind::BranchIf);
        assert_eq!(m.text("if (x) { y(); }"), "if (x) {");
    }

    #[test]
    fn function_pre_empts_statement() {
        let line = "function init(a) { start(); }";
        let m = matcher(Mode::Web).match_line(line).unwrap();
        assert_eq!(m.kind, ConstructKind::Function);
        assert_eq!(m.entry, 0);
    }

    #[test]
    fn statement_before_switch_case() {
        // `;` sits higher in the web table than `case`.
        let m = matcher(Mode::Web).match_line("case 1: run();").unwrap();
        assert_eq!(m.kind, ConstructKind::Statement);
        let m = matcher(Mode::Web).match_line("case LEFT:").unwrap();
        assert_eq!(m.kind, ConstructKind::BranchSwitch);
        let m = matcher(Mode::Web).match_line("default:").unwrap();
        assert_eq!(m.kind, ConstructKind::BranchSwitch);
    }

    #[test]
    fn else_and_plain_lines() {
        let web = matcher(Mode::Web);
        assert_eq!(
            web.match_line("} else {").map(|m| m.kind),
            Some(ConstructKind::BranchElse)
        );
        assert!(web.match_line("  // nothing here").is_none());
        assert!(web.match_line("").is_none());
    }

    #[test]
    fn angular_method_declaration() {
        let angular = matcher(Mode::Angular);
        let line = "  ngOnInit(): void {";
        let m = angular.match_line(line).unwrap();
        assert_eq!(m.kind, ConstructKind::Function);
        assert_eq!(m.span.end, line.len());
        assert!(angular.match_line("import { Component } from '@angular/core';").is_none());
    }

    #[test]
    fn unity_loops_and_branches() {
        let unity = matcher(Mode::Unity);
        assert_eq!(
            unity.match_line("foreach (var x in items) {").map(|m| m.kind),
            Some(ConstructKind::Loop)
        );
        assert_eq!(
            unity.match_line("if (ready) {").map(|m| m.kind),
            Some(ConstructKind::BranchIf)
        );
        assert_eq!(
            unity.match_line("void Update() {").map(|m| m.kind),
            Some(ConstructKind::Function)
        );
    }

    #[test]
    fn match_from_skips_earlier_entries() {
        let unity = matcher(Mode::Unity);
        let line = "void Foo() {";
        assert_eq!(unity.match_line(line).map(|m| m.entry), Some(0));
        assert!(unity.match_from(line, 1).is_none());
    }
}
