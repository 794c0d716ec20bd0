//! Export a run as a JSON manifest for the upload collaborator.
//!
//! The manifest carries everything the reporting backend is sent: the
//! executable-line records, the probe map, the files to upload, the
//! configured routes, and the pre-injection contents.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::config::Config;
use crate::models::{ExecutableLineRecord, Mode, ProbeCall};
use crate::run::RunReport;
use crate::store::OriginalContentStore;

#[derive(Serialize)]
pub struct Manifest<'a> {
    pub mode: Mode,
    pub source_root: String,
    pub routes: &'a [String],
    pub records: Vec<&'a ExecutableLineRecord>,
    pub probes: &'a [ProbeCall],
    pub upload_files: Vec<String>,
    pub rejected: Vec<String>,
    pub original_content: &'a OriginalContentStore,
}

fn unix_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

pub fn manifest<'a>(config: &'a Config, report: &'a RunReport) -> Manifest<'a> {
    Manifest {
        mode: report.mode,
        source_root: unix_path(&report.source_root),
        routes: &config.project.routes,
        records: report.records().collect(),
        probes: &report.probes,
        upload_files: report.upload_files().into_iter().map(unix_path).collect(),
        rejected: report.rejected.iter().map(|p| unix_path(p)).collect(),
        original_content: &report.contents,
    }
}

/// Write the manifest of `report` to `output` (`-` for stdout).
pub fn write_manifest(config: &Config, report: &RunReport, output: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&manifest(config, report))?;
    if output == Path::new("-") {
        println!("{}", json);
        return Ok(());
    }
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(output, &json)
        .with_context(|| format!("Failed to write manifest: {}", output.display()))?;
    eprintln!(
        "Exported {} records, {} probes to {}",
        report.results.len(),
        report.probes.len(),
        output.display()
    );
    Ok(())
}
