//! Canonicalizing formatter capability.
//!
//! The engine treats the formatter as a black box: it is handed a path, runs
//! synchronously, and reports a status. Only the exit code is consulted.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};

use crate::config::Config;

/// Outcome of one reformat call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatStatus {
    Success,
    /// The file no longer parses; the only status that rejects a file.
    StructuralFailure,
    OtherFailure(i32),
}

pub trait Formatter {
    fn reformat(&self, path: &Path) -> Result<FormatStatus>;

    /// Fail when the formatter cannot run at all. Called before any file is
    /// touched.
    fn check(&self) -> Result<()> {
        Ok(())
    }
}

/// Formatter that leaves files alone and always succeeds.
pub struct NoopFormatter;

impl Formatter for NoopFormatter {
    fn reformat(&self, _path: &Path) -> Result<FormatStatus> {
        Ok(FormatStatus::Success)
    }
}

/// Runs an external program (`prettier`, `AStyle`, ...) with the path appended.
pub struct CommandFormatter {
    program: String,
    args: Vec<String>,
    structural_failure_codes: Vec<i32>,
}

impl CommandFormatter {
    pub fn new(command: Vec<String>, structural_failure_codes: Vec<i32>) -> Result<Self> {
        let mut parts = command.into_iter();
        let program = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("formatter command is empty"))?;
        Ok(Self {
            program,
            args: parts.collect(),
            structural_failure_codes,
        })
    }

    fn classify(&self, code: Option<i32>) -> FormatStatus {
        match code {
            Some(0) => FormatStatus::Success,
            Some(c) if self.structural_failure_codes.contains(&c) => FormatStatus::StructuralFailure,
            Some(c) => FormatStatus::OtherFailure(c),
            // Killed by a signal.
            None => FormatStatus::OtherFailure(-1),
        }
    }
}

impl Formatter for CommandFormatter {
    fn check(&self) -> Result<()> {
        which::which(&self.program).with_context(|| {
            format!(
                "Formatter '{}' not found. Install it or set formatter.enabled = false",
                self.program
            )
        })?;
        Ok(())
    }

    fn reformat(&self, path: &Path) -> Result<FormatStatus> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("Failed to run formatter '{}'", self.program))?;
        let result = self.classify(status.code());
        tracing::debug!(path = %path.display(), status = ?result, "reformat");
        Ok(result)
    }
}

/// Formatter selected by the configuration.
pub fn from_config(config: &Config) -> Result<Box<dyn Formatter>> {
    if !config.formatter.enabled {
        return Ok(Box::new(NoopFormatter));
    }
    let mode = config.mode();
    Ok(Box::new(CommandFormatter::new(
        config.formatter.command_for(mode),
        config.formatter.failure_codes_for(mode),
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_classified() {
        let f = CommandFormatter::new(vec!["prettier".into(), "--write".into()], vec![2]).unwrap();
        assert_eq!(f.classify(Some(0)), FormatStatus::Success);
        assert_eq!(f.classify(Some(2)), FormatStatus::StructuralFailure);
        assert_eq!(f.classify(Some(1)), FormatStatus::OtherFailure(1));
        assert_eq!(f.classify(None), FormatStatus::OtherFailure(-1));
    }

    #[test]
    fn empty_command_is_an_error() {
        assert!(CommandFormatter::new(vec![], vec![2]).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn runs_program_and_reads_status() {
        let ok = CommandFormatter::new(vec!["true".into()], vec![1]).unwrap();
        assert_eq!(ok.reformat(Path::new("x.js")).unwrap(), FormatStatus::Success);
        let broken = CommandFormatter::new(vec!["false".into()], vec![1]).unwrap();
        assert_eq!(
            broken.reformat(Path::new("x.js")).unwrap(),
            FormatStatus::StructuralFailure
        );
    }

    #[test]
    fn missing_program_is_reported() {
        let f = CommandFormatter::new(vec!["lava-no-such-formatter".into()], vec![2]).unwrap();
        assert!(f.reformat(Path::new("x.js")).is_err());
        assert!(f.check().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn check_finds_program_on_path() {
        let f = CommandFormatter::new(vec!["true".into()], vec![1]).unwrap();
        assert!(f.check().is_ok());
        assert!(NoopFormatter.check().is_ok());
    }
}
