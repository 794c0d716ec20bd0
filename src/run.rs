//! Whole-run orchestration.
//!
//! Coordinates the full flow: guard check → discovery → path planning →
//! runtime assets → templates → bootstrap → per-file pass → guard token.
//! Everything that can fail as a configuration problem (missing files,
//! files outside the source root) is checked before the first mutation.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::bootstrap;
use crate::config::Config;
use crate::discover::{self, Discovery};
use crate::export;
use crate::formatter::{self, Formatter};
use crate::guard::{self, InstrumentToken};
use crate::instrument::{FileInstrumentor, FileOutcome};
use crate::models::{basename, ExecutableLineRecord, Mode, ProbeCall, SourceFileSet};
use crate::progress::{FileStatus, ProgressEvent, ProgressMode, ProgressReporter};
use crate::resolver::{PathResolver, Target};
use crate::store::OriginalContentStore;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub dry_run: bool,
}

/// One emitted executable-line record and the file it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResult {
    pub path: PathBuf,
    pub record: ExecutableLineRecord,
}

/// Everything a run produced, handed to the upload collaborator.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub mode: Mode,
    pub source_root: PathBuf,
    pub dry_run: bool,
    /// Records in the order files were processed (templates first).
    pub results: Vec<FileResult>,
    pub probes: Vec<ProbeCall>,
    pub rejected: Vec<PathBuf>,
    /// Files left untouched by the rules (Angular module files).
    pub skipped: Vec<PathBuf>,
    /// Line-scanned source files, in processing order.
    pub sources: SourceFileSet,
    /// File set for the uploader. In Angular mode the bootstrap file is
    /// listed by discovery and appended again after the per-file pass.
    pub files: SourceFileSet,
    pub templates: SourceFileSet,
    pub bootstrap: Option<PathBuf>,
    pub contents: OriginalContentStore,
    pub token: Option<InstrumentToken>,
}

impl RunReport {
    pub fn records(&self) -> impl Iterator<Item = &ExecutableLineRecord> {
        self.results.iter().map(|r| &r.record)
    }

    pub fn record_for(&self, path: &Path) -> Option<&ExecutableLineRecord> {
        self.results
            .iter()
            .find(|r| r.path == path)
            .map(|r| &r.record)
    }

    /// Files to upload: every file with at least one probe, plus the bootstrap.
    ///
    /// Each path appears once, even when `files` lists it twice. Rejected
    /// files have no record and are therefore never included.
    pub fn upload_files(&self) -> Vec<&Path> {
        let mut upload: Vec<&Path> = Vec::new();
        for path in self.files.iter().chain(self.templates.iter()) {
            let wanted = self.bootstrap.as_deref() == Some(path)
                || self.record_for(path).is_some_and(|r| r.count > 0);
            if wanted && !upload.contains(&path) {
                upload.push(path);
            }
        }
        upload
    }

    /// Probes written into source files (synthetic template probes excluded).
    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }
}

/// Run instrumentation over the configured source root.
pub fn run_instrumentation(
    config: &Config,
    formatter: &dyn Formatter,
    progress: &dyn ProgressReporter,
    options: RunOptions,
) -> Result<RunReport> {
    let root = config.source_root().to_path_buf();
    let mode = config.mode();
    let dry_run = options.dry_run;

    if !dry_run {
        guard::ensure_pristine(&root)?;
    }

    let discovery = discover::discover(config)?;
    progress.report(&ProgressEvent::Discovered {
        mode,
        sources: discovery.sources.len(),
        templates: discovery.templates.len(),
    });
    let resolver = PathResolver::new(&root);
    plan_paths(config, &resolver, &discovery)?;
    if !dry_run {
        formatter.check()?;
    }

    let mut report = RunReport {
        mode,
        source_root: root.clone(),
        dry_run,
        results: Vec::new(),
        probes: Vec::new(),
        rejected: Vec::new(),
        skipped: Vec::new(),
        sources: discovery.sources.clone(),
        files: discovery.files.clone(),
        templates: discovery.templates.clone(),
        bootstrap: None,
        contents: OriginalContentStore::new(),
        token: None,
    };

    if !dry_run {
        bootstrap::copy_runtime_assets(config)?;
    }

    // index.html is wired before any other page.
    let index = config.index_path();
    let mut templates: Vec<&Path> = discovery.templates.iter().collect();
    templates.sort_by_key(|p| *p != index.as_path());
    for path in templates {
        let record =
            bootstrap::inject_template(config, &resolver, &mut report.contents, path, dry_run)?;
        progress.report(&ProgressEvent::Template {
            file: basename(path),
        });
        report.results.push(FileResult {
            path: path.to_path_buf(),
            record,
        });
    }

    if mode == Mode::Angular {
        bootstrap::instrument_bootstrap(config, &resolver, formatter, &mut report.contents, dry_run)?;
    }

    let mut instrumentor = FileInstrumentor::new(config, formatter)?.dry_run(dry_run);
    let total = discovery.sources.len();
    for (i, path) in discovery.sources.iter().enumerate() {
        let outcome = match instrumentor.instrument_file(path, &mut report.contents)? {
            FileOutcome::Recorded { record, probes } => {
                let status = FileStatus::Recorded {
                    probes: probes.len(),
                };
                report.probes.extend(probes);
                report.results.push(FileResult {
                    path: path.to_path_buf(),
                    record,
                });
                status
            }
            FileOutcome::Rejected => {
                report.rejected.push(path.to_path_buf());
                FileStatus::Rejected
            }
            FileOutcome::Skipped => {
                report.skipped.push(path.to_path_buf());
                FileStatus::Skipped
            }
        };
        progress.report(&ProgressEvent::File {
            file: basename(path),
            n: i + 1,
            total,
            outcome,
        });
    }

    if mode == Mode::Angular {
        // Listed once by discovery; appended again now that it is wired.
        let bootstrap_path = config.bootstrap_path();
        report.files.push(&bootstrap_path);
        report.bootstrap = Some(bootstrap_path);
    }

    if !dry_run {
        report.token = Some(guard::write_token(&root)?);
    }

    tracing::info!(
        records = report.results.len(),
        rejected = report.rejected.len(),
        probes = report.probe_count(),
        "instrumentation finished"
    );
    Ok(report)
}

/// Resolve every import path the run will write, before anything is touched.
fn plan_paths(config: &Config, resolver: &PathResolver, discovery: &Discovery) -> Result<()> {
    for template in discovery.templates.iter() {
        resolver.resolve(template, &Target::InstrumenterScript)?;
    }
    if config.mode() == Mode::Angular {
        let bootstrap = Target::Bootstrap(config.project.bootstrap.clone());
        for source in discovery.sources.iter() {
            resolver.import_specifier(source, &bootstrap)?;
        }
        resolver.import_specifier(&config.bootstrap_path(), &Target::InstrumenterModule)?;
    }
    Ok(())
}

/// `lava instrument`: run and print a summary, optionally writing the manifest.
pub fn run_instrument(
    config: &Config,
    dry_run: bool,
    manifest: Option<&Path>,
    progress: Option<ProgressMode>,
) -> Result<()> {
    let formatter = formatter::from_config(config)?;
    let reporter = progress.unwrap_or_else(ProgressMode::auto).reporter();
    let report = run_instrumentation(
        config,
        formatter.as_ref(),
        reporter.as_ref(),
        RunOptions { dry_run },
    )
    .with_context(|| format!("Instrumentation of {} failed", config.source_root().display()))?;

    let mut summary = Vec::new();
    if dry_run {
        summary.push(format!("instrument {} (dry-run)", report.mode));
    } else {
        summary.push(format!("instrument {}", report.mode));
    }
    summary.push(format!("  sources: {}", report.sources.len()));
    summary.push(format!("  templates: {}", report.templates.len()));
    summary.push(format!("  records: {}", report.results.len()));
    summary.push(format!("  rejected: {}", report.rejected.len()));
    summary.push(format!("  skipped modules: {}", report.skipped.len()));
    summary.push(format!("  probes injected: {}", report.probe_count()));
    summary.push(format!("  upload files: {}", report.upload_files().len()));
    for path in &report.rejected {
        summary.push(format!("  not covered: {}", path.display()));
    }
    if let Some(token) = &report.token {
        summary.push(format!("  token: {}", token.value));
    }
    summary.push("ok".to_string());

    // Keep stdout clean when the manifest goes there.
    if manifest == Some(Path::new("-")) {
        eprintln!("{}", summary.join("\n"));
    } else {
        println!("{}", summary.join("\n"));
    }

    if let Some(path) = manifest {
        export::write_manifest(config, &report, path)?;
    }
    Ok(())
}
