//! Discovery of the source files and HTML templates taking part in a run.
//!
//! Sources are looked up under the configured sub-roots (by default
//! `app/components` and `app/services`), filtered by the mode's extension and
//! the exclusion lists. Walk order is sorted by file name so every run over
//! the same tree sees the same file order.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::models::{basename, Mode, SourceFileSet};
use crate::resolver::INSTRUMENTER_TS;

/// Why a discovered file was or was not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Line-scanned source file.
    Included,
    /// Listed in `exclude` or matched by `exclude_globs`.
    Excluded,
    /// Handled outside the line scan (bootstrap, runtime module).
    Special,
    /// HTML page receiving the script block.
    Template,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredEntry {
    pub path: PathBuf,
    pub status: EntryStatus,
}

#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Files for the per-file pass, in discovery order.
    pub sources: SourceFileSet,
    /// Files handed to the uploader: the sources plus, in Angular mode, the
    /// bootstrap file, which is never line-scanned.
    pub files: SourceFileSet,
    pub templates: SourceFileSet,
    /// Every file looked at, for reporting.
    pub entries: Vec<DiscoveredEntry>,
}

impl Discovery {
    fn seen(&self, path: &Path) -> bool {
        self.entries.iter().any(|e| e.path == path)
    }
}

pub fn discover(config: &Config) -> Result<Discovery> {
    let root = config.source_root();
    let mode = config.mode();
    let exclude_set = build_globset(&config.project.exclude_globs)?;
    let mut discovery = Discovery::default();

    for sub_root in &config.project.sub_roots {
        let dir = root.join(sub_root);
        if !dir.is_dir() {
            tracing::debug!(dir = %dir.display(), "sub-root missing, skipped");
            continue;
        }
        for path in walk_files(&dir, mode.extension())? {
            // Overlapping sub-roots yield the same file twice.
            if discovery.seen(&path) {
                continue;
            }
            let status = classify_source(config, &exclude_set, &path);
            if status == EntryStatus::Included {
                discovery.sources.push(&path);
                discovery.files.push(&path);
            }
            discovery.entries.push(DiscoveredEntry { path, status });
        }
    }

    if mode == Mode::Angular {
        let bootstrap = config.bootstrap_path();
        if !bootstrap.is_file() {
            bail!("Angular bootstrap file does not exist: {}", bootstrap.display());
        }
        discovery.files.push(&bootstrap);
        discovery.entries.push(DiscoveredEntry {
            path: bootstrap,
            status: EntryStatus::Special,
        });

        let app_index = root.join("app").join("index.ts");
        if app_index.is_file() && !discovery.seen(&app_index) {
            discovery.sources.push(&app_index);
            discovery.files.push(&app_index);
            discovery.entries.push(DiscoveredEntry {
                path: app_index,
                status: EntryStatus::Included,
            });
        }
    }

    if mode.has_templates() {
        for sub_root in &config.project.sub_roots {
            let dir = root.join(sub_root);
            if !dir.is_dir() {
                continue;
            }
            for path in walk_files(&dir, "html")? {
                if discovery.seen(&path) {
                    continue;
                }
                discovery.templates.push(&path);
                discovery.entries.push(DiscoveredEntry {
                    path,
                    status: EntryStatus::Template,
                });
            }
        }

        let index = config.index_path();
        if !index.is_file() {
            bail!("index.html not found in source root: {}", index.display());
        }
        if !discovery.seen(&index) {
            discovery.templates.push(&index);
            discovery.entries.push(DiscoveredEntry {
                path: index,
                status: EntryStatus::Template,
            });
        }
    }

    tracing::info!(
        sources = discovery.sources.len(),
        templates = discovery.templates.len(),
        "discovery complete"
    );
    Ok(discovery)
}

/// `lava detect`: list what a run would touch.
pub fn list_detected(config: &Config) -> Result<()> {
    let discovery = discover(config)?;
    println!("{:<10} PATH", "STATUS");
    for entry in &discovery.entries {
        let status = match entry.status {
            EntryStatus::Included => "source",
            EntryStatus::Excluded => "excluded",
            EntryStatus::Special => "special",
            EntryStatus::Template => "template",
        };
        println!("{:<10} {}", status, entry.path.display());
    }
    println!(
        "{} sources, {} templates",
        discovery.sources.len(),
        discovery.templates.len()
    );
    Ok(())
}

fn classify_source(config: &Config, exclude_set: &GlobSet, path: &Path) -> EntryStatus {
    let name = basename(path);
    let relative = path.strip_prefix(config.source_root()).unwrap_or(path);
    let rel_str = relative.to_string_lossy().replace('\\', "/");

    if config.project.exclude.iter().any(|e| e == &name) || exclude_set.is_match(&rel_str) {
        return EntryStatus::Excluded;
    }
    if config.mode() == Mode::Angular {
        let bootstrap_name = basename(Path::new(&config.project.bootstrap));
        if name == bootstrap_name || name == INSTRUMENTER_TS {
            return EntryStatus::Special;
        }
    }
    EntryStatus::Included
}

fn walk_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some(extension) {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
