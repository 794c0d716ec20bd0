//! Progress of `lava instrument`, one event per discovery, page and file.
//!
//! Events go to **stderr** so stdout stays free for the summary or for a
//! manifest written to `-`.

use serde::Serialize;
use std::io::Write;

use crate::models::Mode;

/// How one source file left the per-file pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Recorded { probes: usize },
    /// Structure broken after injection; the file is not covered.
    Rejected,
    /// Angular module file, left untouched.
    Skipped,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ProgressEvent {
    Discovered {
        mode: Mode,
        sources: usize,
        templates: usize,
    },
    /// Script block added to an HTML page.
    Template { file: String },
    /// Source file `n` of `total` finished.
    File {
        file: String,
        n: usize,
        total: usize,
        outcome: FileStatus,
    },
}

impl ProgressEvent {
    /// Single human-readable line, without the trailing newline.
    pub fn human_line(&self) -> String {
        match self {
            ProgressEvent::Discovered {
                mode,
                sources,
                templates,
            } => format!("lava {}: {} sources, {} templates", mode, sources, templates),
            ProgressEvent::Template { file } => format!("lava  page  {}", file),
            ProgressEvent::File {
                file,
                n,
                total,
                outcome,
            } => {
                let width = total.to_string().len();
                let status = match outcome {
                    FileStatus::Recorded { probes: 1 } => "1 probe".to_string(),
                    FileStatus::Recorded { probes } => format!("{} probes", probes),
                    FileStatus::Rejected => "rejected, not covered".to_string(),
                    FileStatus::Skipped => "module file, skipped".to_string(),
                };
                format!("lava  [{:>width$}/{}] {}  {}", n, total, file, status, width = width)
            }
        }
    }
}

pub trait ProgressReporter {
    fn report(&self, event: &ProgressEvent);
}

/// Human lines on stderr.
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: &ProgressEvent) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{}", event.human_line());
        let _ = err.flush();
    }
}

/// One JSON object per event on stderr, tagged by `phase`.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: &ProgressEvent) {
        if let Ok(line) = serde_json::to_string(event) {
            let mut err = std::io::stderr().lock();
            let _ = writeln!(err, "{}", line);
            let _ = err.flush();
        }
    }
}

pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: &ProgressEvent) {}
}

/// `--progress` values.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human when stderr is a terminal, off when piped.
    pub fn auto() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
