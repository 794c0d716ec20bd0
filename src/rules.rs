//! Injection rule sets: per-mode policy for turning a line match into a probe.
//!
//! A rule set is created fresh for every file (the Unity rules carry the
//! enclosing class name as per-file state). For each matched line it decides
//! whether to suppress the hit, prefix the probe before the line, or place it
//! in-line right after the matched opener.

use regex::Regex;

use crate::matcher::LineMatch;
use crate::models::{ConstructKind, Mode, ProbeCall};

/// Marker of an Angular module file (compared case-insensitively).
pub const NG_MODULE_MARKER: &str = "@ngmodule";

/// What to do with a matched line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Injection {
    /// Do not inject; remaining table entries may still match the line.
    Suppress,
    /// Place the probe before the whole line.
    Prefix,
    /// Place the probe immediately after the matched span.
    Inline,
}

/// Options that tune rule behavior beyond the mode itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleOptions {
    /// Unity: suppress function matches whose text contains the class name.
    pub skip_constructors: bool,
}

impl Default for RuleOptions {
    fn default() -> Self {
        Self {
            skip_constructors: true,
        }
    }
}

/// Per-mode injection policy.
pub trait InjectionRules {
    fn mode(&self) -> Mode;

    /// Whether the whole file must be left untouched.
    fn skip_file(&self, _text: &str) -> bool {
        false
    }

    /// Whether a line is ignored before any matching.
    fn skip_line(&self, _line: &str) -> bool {
        false
    }

    /// Called for every scanned line before matching.
    fn observe_line(&mut self, _line: &str) {}

    fn decide(&self, line: &str, hit: &LineMatch) -> Injection;

    /// Source text of the probe call, valid as a standalone statement.
    fn render(&self, probe: &ProbeCall) -> String;

    /// Rewrite `line` with `probe` according to `injection`.
    fn apply(&self, line: &str, hit: &LineMatch, injection: Injection, probe: &ProbeCall) -> String {
        let call = self.render(probe);
        match injection {
            Injection::Suppress => line.to_string(),
            Injection::Prefix => format!("{}{}", call, line),
            Injection::Inline => {
                let (head, tail) = line.split_at(hit.span.end);
                format!("{} {}{}", head, call, tail)
            }
        }
    }
}

/// Build the rule set for `mode`.
pub fn rules_for(
    mode: Mode,
    options: RuleOptions,
) -> Result<Box<dyn InjectionRules>, regex::Error> {
    Ok(match mode {
        Mode::Web => Box::new(WebRules),
        Mode::Angular => Box::new(AngularRules),
        Mode::Unity => Box::new(UnityRules::new(options)?),
    })
}

fn instrumenter_call(probe: &ProbeCall) -> String {
    format!(
        r#"INSTRUMENTER.InstrumentCode("{}","{}","{}","{}");"#,
        probe.probe_id,
        probe.filename,
        probe.line_number,
        probe.kind.tag()
    )
}

/// Plain JavaScript: statements are prefixed, openers get the probe in-line.
pub struct WebRules;

impl InjectionRules for WebRules {
    fn mode(&self) -> Mode {
        Mode::Web
    }

    fn decide(&self, _line: &str, hit: &LineMatch) -> Injection {
        if hit.kind == ConstructKind::Statement {
            Injection::Prefix
        } else {
            Injection::Inline
        }
    }

    fn render(&self, probe: &ProbeCall) -> String {
        instrumenter_call(probe)
    }
}

/// Angular TypeScript: module files are skipped, functions get in-line probes.
pub struct AngularRules;

impl InjectionRules for AngularRules {
    fn mode(&self) -> Mode {
        Mode::Angular
    }

    fn skip_file(&self, text: &str) -> bool {
        text.to_lowercase().contains(NG_MODULE_MARKER)
    }

    fn decide(&self, _line: &str, _hit: &LineMatch) -> Injection {
        Injection::Inline
    }

    fn render(&self, probe: &ProbeCall) -> String {
        instrumenter_call(probe)
    }
}

/// Unity C#: tracks the enclosing class and skips constructor-looking methods.
pub struct UnityRules {
    options: RuleOptions,
    class_pattern: Regex,
    class_name: Option<String>,
}

impl UnityRules {
    pub fn new(options: RuleOptions) -> Result<Self, regex::Error> {
        Ok(Self {
            options,
            class_pattern: Regex::new(r"(?:^|\s)class\s+(\w+)")?,
            class_name: None,
        })
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }
}

impl InjectionRules for UnityRules {
    fn mode(&self) -> Mode {
        Mode::Unity
    }

    fn skip_line(&self, line: &str) -> bool {
        line.contains("using ")
    }

    fn observe_line(&mut self, line: &str) {
        if let Some(caps) = self.class_pattern.captures(line) {
            self.class_name = Some(caps[1].to_string());
        }
    }

    fn decide(&self, line: &str, hit: &LineMatch) -> Injection {
        if hit.kind == ConstructKind::Function && self.options.skip_constructors {
            if let Some(class_name) = &self.class_name {
                if line.contains(class_name.as_str()) {
                    return Injection::Suppress;
                }
            }
        }
        Injection::Inline
    }

    fn render(&self, probe: &ProbeCall) -> String {
        format!(
            r#"LavaHelper.SendStats("{}","{}","{}","{}");"#,
            probe.filename,
            probe.probe_id,
            probe.line_number,
            probe.kind.tag()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn probe(kind: ConstructKind) -> ProbeCall {
        ProbeCall {
            probe_id: Uuid::nil(),
            filename: "app.js".to_string(),
            line_number: 4,
            kind,
        }
    }

    fn hit(kind: ConstructKind, span: std::ops::Range<usize>) -> LineMatch {
        LineMatch {
            entry: 0,
            kind,
            span,
        }
    }

    #[test]
    fn web_statement_is_prefixed() {
        let rules = WebRules;
        let line = "  total += 1;";
        let m = hit(ConstructKind::Statement, 12..13);
        assert_eq!(rules.decide(line, &m), Injection::Prefix);
        let out = rules.apply(line, &m, Injection::Prefix, &probe(ConstructKind::Statement));
        assert!(out.starts_with("INSTRUMENTER.InstrumentCode("));
        assert!(out.ends_with("  total += 1;"));
    }

    #[test]
    fn web_opener_is_inline() {
        let rules = WebRules;
        let line = "if (x) { y(); }";
        let m = hit(ConstructKind::BranchIf, 0..8);
        assert_eq!(rules.decide(line, &m), Injection::Inline);
        let out = rules.apply(line, &m, Injection::Inline, &probe(ConstructKind::BranchIf));
        assert_eq!(
            out,
            r#"if (x) { INSTRUMENTER.InstrumentCode("00000000-0000-0000-0000-000000000000","app.js","4","branch_if"); y(); }"#
        );
    }

    #[test]
    fn angular_module_marker_is_case_insensitive() {
        let rules = AngularRules;
        assert!(rules.skip_file("@NgModule({\n declarations: []\n})"));
        assert!(rules.skip_file("// @ngMODULE"));
        assert!(!rules.skip_file("@Component({ selector: 'x' })"));
    }

    #[test]
    fn unity_class_tracked_at_column_zero() {
        let mut rules = UnityRules::new(RuleOptions::default()).unwrap();
        rules.observe_line("class Enemy {");
        assert_eq!(rules.class_name(), Some("Enemy"));
        rules.observe_line("var subclass = 1;");
        assert_eq!(rules.class_name(), Some("Enemy"));
    }

    #[test]
    fn unity_constructor_suppressed_by_class_name() {
        let mut rules = UnityRules::new(RuleOptions::default()).unwrap();
        rules.observe_line("public class Foo : MonoBehaviour {");
        assert_eq!(rules.class_name(), Some("Foo"));
        let m = hit(ConstructKind::Function, 0..12);
        assert_eq!(rules.decide("void Foo() {", &m), Injection::Suppress);
        assert_eq!(rules.decide("void Update() {", &m), Injection::Inline);
    }

    #[test]
    fn unity_heuristic_can_be_disabled() {
        let mut rules = UnityRules::new(RuleOptions {
            skip_constructors: false,
        })
        .unwrap();
        rules.observe_line("public class Foo {");
        let m = hit(ConstructKind::Function, 0..12);
        assert_eq!(rules.decide("void Foo() {", &m), Injection::Inline);
    }

    #[test]
    fn unity_without_class_never_suppresses() {
        let rules = UnityRules::new(RuleOptions::default()).unwrap();
        let m = hit(ConstructKind::Function, 0..12);
        assert_eq!(rules.decide("void Foo() {", &m), Injection::Inline);
    }

    #[test]
    fn unity_render_shape() {
        let rules = UnityRules::new(RuleOptions::default()).unwrap();
        let mut p = probe(ConstructKind::Loop);
        p.filename = "Player.cs".to_string();
        assert_eq!(
            rules.render(&p),
            r#"LavaHelper.SendStats("Player.cs","00000000-0000-0000-0000-000000000000","4","loop");"#
        );
        assert!(rules.skip_line("using UnityEngine;"));
    }
}
