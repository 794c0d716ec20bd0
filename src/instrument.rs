//! File instrumentor: the per-file scan → rewrite → reformat pipeline.
//!
//! [`instrument_source`] is the pure text pass. [`FileInstrumentor`] wraps it
//! with the on-disk steps for one file:
//!
//! ```text
//! Discovered → ContentCaptured → Canonicalized → Scanned → Rewritten → Reformatted
//!                                                                     ├─▶ Recorded
//!                                                                     └─▶ Rejected
//! ```
//!
//! Every line is matched against its original content exactly once, so a
//! line never receives more than one probe.

use anyhow::{Context, Result};
use std::path::Path;
use uuid::Uuid;

use crate::config::Config;
use crate::formatter::{FormatStatus, Formatter};
use crate::matcher::LineMatcher;
use crate::models::{basename, ExecutableLineRecord, Mode, ProbeCall};
use crate::patterns::PatternTable;
use crate::resolver::{PathResolver, Target};
use crate::rules::{rules_for, Injection, InjectionRules};
use crate::store::OriginalContentStore;

/// Result of the text pass over one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentedSource {
    pub text: String,
    /// 1-based line numbers that received a probe, ascending.
    pub lines: Vec<usize>,
    pub probes: Vec<ProbeCall>,
}

/// Instrument `text` line by line.
///
/// `header` is inserted as the first line before scanning, so probe line
/// numbers refer to the text after insertion. Returns `None` when the rules
/// reject the whole file.
pub fn instrument_source(
    text: &str,
    filename: &str,
    matcher: &LineMatcher,
    rules: &mut dyn InjectionRules,
    header: Option<&str>,
    next_id: &mut dyn FnMut() -> Uuid,
) -> Option<InstrumentedSource> {
    if rules.skip_file(text) {
        return None;
    }

    let mut output = String::with_capacity(text.len() + text.len() / 4);
    let mut lines = Vec::new();
    let mut probes = Vec::new();

    let header_line = header.map(|h| format!("{}\n", h));
    let all = header_line.iter().map(String::as_str).chain(text.split_inclusive('\n'));

    for (index, raw) in all.enumerate() {
        let line_number = index + 1;
        let (content, ending) = split_ending(raw);

        if rules.skip_line(content) {
            output.push_str(raw);
            continue;
        }
        rules.observe_line(content);

        let mut start = 0;
        let mut rewritten = None;
        while let Some(hit) = matcher.match_from(content, start) {
            let injection = rules.decide(content, &hit);
            if injection == Injection::Suppress {
                start = hit.entry + 1;
                continue;
            }
            let probe = ProbeCall {
                probe_id: next_id(),
                filename: filename.to_string(),
                line_number,
                kind: hit.kind,
            };
            rewritten = Some(rules.apply(content, &hit, injection, &probe));
            probes.push(probe);
            lines.push(line_number);
            break;
        }

        match rewritten {
            Some(line) => {
                output.push_str(&line);
                output.push_str(ending);
            }
            None => output.push_str(raw),
        }
    }

    Some(InstrumentedSource {
        text: output,
        lines,
        probes,
    })
}

fn split_ending(raw: &str) -> (&str, &str) {
    let content = raw.trim_end_matches(|c: char| c == '\n' || c == '\r');
    (content, &raw[content.len()..])
}

/// `lava match`: show the construct and rewritten text for a single line.
pub fn run_match(mode: Mode, line: &str) -> Result<()> {
    let matcher = LineMatcher::new(PatternTable::for_mode(mode)?);
    let mut rules = rules_for(mode, Default::default())?;
    let mut next_id = Uuid::new_v4;
    let result = instrument_source(line, "<line>", &matcher, rules.as_mut(), None, &mut next_id);

    match result {
        Some(source) if !source.probes.is_empty() => {
            println!("{}", source.probes[0].kind);
            println!("{}", source.text);
        }
        _ => println!("no match"),
    }
    Ok(())
}

/// Import line added to every instrumented Angular file.
pub fn angular_import_line(specifier: &str) -> String {
    format!(r#"import {{INSTRUMENTER}} from "{}" //lava"#, specifier)
}

/// Terminal state of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Recorded {
        record: ExecutableLineRecord,
        probes: Vec<ProbeCall>,
    },
    /// The post-injection reformat reported a broken structure.
    Rejected,
    /// The rules excluded the file (Angular module files).
    Skipped,
}

/// Drives [`instrument_source`] over files on disk.
pub struct FileInstrumentor<'a> {
    config: &'a Config,
    matcher: LineMatcher,
    resolver: PathResolver,
    formatter: &'a dyn Formatter,
    dry_run: bool,
    next_id: Box<dyn FnMut() -> Uuid + 'a>,
}

impl<'a> FileInstrumentor<'a> {
    pub fn new(config: &'a Config, formatter: &'a dyn Formatter) -> Result<Self> {
        let table = PatternTable::for_mode(config.mode())?;
        Ok(Self {
            config,
            matcher: LineMatcher::new(table),
            resolver: PathResolver::new(config.source_root()),
            formatter,
            dry_run: false,
            next_id: Box::new(Uuid::new_v4),
        })
    }

    /// Scan and report without reformatting or writing anything.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Replace the probe id source (deterministic ids in tests).
    pub fn with_id_source(mut self, next_id: impl FnMut() -> Uuid + 'a) -> Self {
        self.next_id = Box::new(next_id);
        self
    }

    /// Header line for `path`, if the mode needs one.
    pub fn header_for(&self, path: &Path) -> Result<Option<String>> {
        match self.config.mode() {
            Mode::Angular => {
                let target = Target::Bootstrap(self.config.project.bootstrap.clone());
                let specifier = self.resolver.import_specifier(path, &target)?;
                Ok(Some(angular_import_line(&specifier)))
            }
            Mode::Web | Mode::Unity => Ok(None),
        }
    }

    pub fn instrument_file(
        &mut self,
        path: &Path,
        store: &mut OriginalContentStore,
    ) -> Result<FileOutcome> {
        let filename = basename(path);
        let original = std::fs::read(path)
            .with_context(|| format!("Failed to read source file: {}", path.display()))?;
        let key = OriginalContentStore::key_for(
            self.config.rules.content_key,
            self.config.source_root(),
            path,
        );
        store.capture(key, &original);

        if !self.dry_run {
            self.reformat(path)?;
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read source file: {}", path.display()))?;

        let header = self.header_for(path)?;
        let mut rules = rules_for(self.config.mode(), self.config.rules.options())?;
        let Some(result) = instrument_source(
            &text,
            &filename,
            &self.matcher,
            rules.as_mut(),
            header.as_deref(),
            &mut *self.next_id,
        ) else {
            tracing::info!(file = %path.display(), "module file left untouched");
            return Ok(FileOutcome::Skipped);
        };

        if !self.dry_run {
            std::fs::write(path, &result.text)
                .with_context(|| format!("Failed to write source file: {}", path.display()))?;

            if self.reformat(path)? == FormatStatus::StructuralFailure {
                tracing::warn!(
                    file = %filename,
                    "file structure broken after injection; this file will not be covered. \
                     Add it to project.exclude if this persists"
                );
                if self.config.rules.restore_rejected {
                    std::fs::write(path, &original).with_context(|| {
                        format!("Failed to restore source file: {}", path.display())
                    })?;
                }
                return Ok(FileOutcome::Rejected);
            }
        }

        tracing::debug!(file = %filename, probes = result.lines.len(), "instrumented");
        Ok(FileOutcome::Recorded {
            record: ExecutableLineRecord::from_lines(filename, result.lines),
            probes: result.probes,
        })
    }

    fn reformat(&self, path: &Path) -> Result<FormatStatus> {
        let status = self.formatter.reformat(path)?;
        if let FormatStatus::OtherFailure(code) = status {
            tracing::debug!(file = %path.display(), code, "formatter reported a non-structural failure");
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConstructKind, Mode};
    use crate::rules::{RuleOptions, WebRules};

    fn run(mode: Mode, text: &str, header: Option<&str>) -> Option<InstrumentedSource> {
        let matcher = LineMatcher::new(PatternTable::for_mode(mode).unwrap());
        let mut rules = rules_for(mode, RuleOptions::default()).unwrap();
        let mut n = 0u128;
        let mut ids = move || {
            n += 1;
            Uuid::from_u128(n)
        };
        instrument_source(text, "sample", &matcher, rules.as_mut(), header, &mut ids)
    }

    #[test]
    fn web_lines_are_numbered_from_one() {
        let text = "function start() {\n  var a = 1;\n\n  if (a) {\n    go();\n  } else {\n  }\n}\n";
        let out = run(Mode::Web, text, None).unwrap();
        assert_eq!(out.lines, vec![1, 2, 4, 5, 6]);
        let kinds: Vec<ConstructKind> = out.probes.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ConstructKind::Function,
                ConstructKind::Statement,
                ConstructKind::BranchIf,
                ConstructKind::Statement,
                ConstructKind::BranchElse,
            ]
        );
        let rewritten: Vec<&str> = out.text.lines().collect();
        assert!(rewritten[0].starts_with("function start() { INSTRUMENTER.InstrumentCode("));
        assert!(rewritten[1].starts_with("INSTRUMENTER.InstrumentCode("));
        assert!(rewritten[1].ends_with("  var a = 1;"));
        assert_eq!(rewritten[2], "");
        assert!(out.text.ends_with("}\n"));
    }

    #[test]
    fn one_probe_per_line() {
        // Matches `if`, and `;` twice; still a single probe.
        let out = run(Mode::Web, "if (x) { y(); z(); }\n", None).unwrap();
        assert_eq!(out.lines, vec![1]);
        assert_eq!(out.text.matches("InstrumentCode(").count(), 1);
    }

    #[test]
    fn probe_ids_are_unique() {
        let out = run(Mode::Web, "a();\nb();\nc();\n", None).unwrap();
        let mut ids: Vec<Uuid> = out.probes.iter().map(|p| p.probe_id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn no_match_file_yields_empty_result() {
        let out = run(Mode::Web, "// just a comment\n", None).unwrap();
        assert!(out.lines.is_empty());
        assert_eq!(out.text, "// just a comment\n");
    }

    #[test]
    fn crlf_endings_are_preserved() {
        let out = run(Mode::Web, "a();\r\nb();\r\n", None).unwrap();
        assert_eq!(out.lines, vec![1, 2]);
        assert_eq!(out.text.matches("\r\n").count(), 2);
        assert!(out.text.ends_with("b();\r\n"));
    }

    #[test]
    fn angular_header_shifts_line_numbers() {
        let text = "export class HeaderComponent {\n  ngOnInit(): void {\n  }\n}\n";
        let header = angular_import_line("../../main");
        let out = run(Mode::Angular, text, Some(&header)).unwrap();
        assert!(out.text.starts_with(r#"import {INSTRUMENTER} from "../../main" //lava"#));
        assert_eq!(out.lines, vec![3]);
        assert_eq!(out.probes[0].line_number, 3);
        assert!(out.text.contains(r#""sample","3","function");"#));
    }

    #[test]
    fn angular_module_file_is_skipped() {
        let text = "@NgModule({\n  declarations: [AppComponent],\n})\nexport class AppModule {}\n";
        assert!(run(Mode::Angular, text, Some("import x")).is_none());
    }

    #[test]
    fn unity_constructor_is_suppressed() {
        let text = "using UnityEngine;\n\npublic class Foo : MonoBehaviour {\n    void Foo() {\n    }\n    void Update() {\n        if (x) {\n        }\n    }\n}\n";
        let out = run(Mode::Unity, text, None).unwrap();
        assert_eq!(out.lines, vec![6, 7]);
        assert_eq!(out.probes[0].kind, ConstructKind::Function);
        assert_eq!(out.probes[1].kind, ConstructKind::BranchIf);
        assert!(out.text.contains("void Update() { LavaHelper.SendStats(\"sample\","));
        assert!(out.text.contains("    void Foo() {\n"));
    }

    #[test]
    fn suppressed_function_falls_through_to_later_patterns() {
        // `for` in the constructor line is still a loop opener.
        let text = "public class Grid {\n    public Grid(int n) { for (int i = 0; i < n; i++) {\n}\n}\n";
        let out = run(Mode::Unity, text, None).unwrap();
        assert_eq!(out.lines, vec![2]);
        assert_eq!(out.probes[0].kind, ConstructKind::Loop);
    }

    #[test]
    fn web_rules_instance_can_be_used_directly() {
        let matcher = LineMatcher::new(PatternTable::for_mode(Mode::Web).unwrap());
        let mut ids = Uuid::new_v4;
        let out = instrument_source("x();", "a.js", &matcher, &mut WebRules, None, &mut ids).unwrap();
        assert_eq!(out.lines, vec![1]);
        assert!(!out.text.ends_with('\n'));
    }
}
