//! Runtime wiring: asset copies, HTML script blocks, and the Angular bootstrap.
//!
//! Everything here prepares the target tree so the probes written by the
//! [`instrument`](crate::instrument) pass have a live `INSTRUMENTER` to call.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::config::Config;
use crate::formatter::Formatter;
use crate::models::{basename, ExecutableLineRecord, Mode};
use crate::resolver::{PathResolver, Target, INSTRUMENTER_JS, MODULE_DIR};
use crate::store::OriginalContentStore;

/// Script block prepended to `index.html` and every other template.
pub fn template_block(script_src: &str, server_url: &str, filename: &str, probe_id: Uuid) -> String {
    format!(
        "\n<script type=\"text/javascript\" src=\"{src}\"></script>\n\
         <script>var INSTRUMENTER=new jsInstrument(\"{url}\");\n\
         INSTRUMENTER.InstrumentCode(\"{id}\",\"{file}\",\"-1\",\"statement\");</script>\n",
        src = script_src,
        url = server_url,
        id = probe_id,
        file = filename,
    )
}

/// First line of the bootstrap file: the runtime module import.
pub fn bootstrap_import_line(specifier: &str) -> String {
    format!(r#"import {{Instrumenter}} from "{}" //lava"#, specifier)
}

/// Last line of the bootstrap file: the shared singleton.
pub fn bootstrap_export_line(server_url: &str) -> String {
    format!(r#"export const INSTRUMENTER=new Instrumenter("{}");"#, server_url)
}

/// Copy the runtime assets the mode needs into the source root.
pub fn copy_runtime_assets(config: &Config) -> Result<()> {
    let root = config.source_root();
    if config.mode().has_templates() {
        let src = &config.assets.instrumenter_js;
        let dest = root.join(INSTRUMENTER_JS);
        fs::copy(src, &dest).with_context(|| {
            format!(
                "Failed to copy runtime script {} to {}",
                src.display(),
                dest.display()
            )
        })?;
        tracing::debug!(dest = %dest.display(), "runtime script copied");
    }
    if config.mode() == Mode::Angular {
        let dest = root.join(MODULE_DIR);
        if dest.exists() {
            fs::remove_dir_all(&dest)
                .with_context(|| format!("Failed to remove {}", dest.display()))?;
        }
        copy_dir(&config.assets.instrumenter_module_dir, &dest)?;
        tracing::debug!(dest = %dest.display(), "runtime module copied");
    }
    Ok(())
}

fn copy_dir(src: &Path, dest: &Path) -> Result<()> {
    if !src.is_dir() {
        anyhow::bail!("Runtime module directory does not exist: {}", src.display());
    }
    for entry in WalkDir::new(src) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(src)?;
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}

/// Prepend the script block to one HTML page.
///
/// Always yields the synthetic single-probe record.
pub fn inject_template(
    config: &Config,
    resolver: &PathResolver,
    store: &mut OriginalContentStore,
    path: &Path,
    dry_run: bool,
) -> Result<ExecutableLineRecord> {
    let filename = basename(path);
    let original = fs::read_to_string(path)
        .with_context(|| format!("Failed to read template: {}", path.display()))?;
    let key = OriginalContentStore::key_for(config.rules.content_key, config.source_root(), path);
    store.capture(key, original.as_bytes());

    let script_src = resolver.resolve(path, &Target::InstrumenterScript)?;
    let block = template_block(&script_src, &config.server.url, &filename, Uuid::new_v4());

    if !dry_run {
        fs::write(path, format!("{}{}", block, original))
            .with_context(|| format!("Failed to write template: {}", path.display()))?;
    }
    tracing::debug!(file = %filename, "template instrumented");
    Ok(ExecutableLineRecord::synthetic(filename))
}

/// Wire the shared instrumenter into the Angular bootstrap file.
///
/// The bootstrap file is reformatted before and after, but its formatter
/// status is not consulted: the file is never line-scanned or rejected.
pub fn instrument_bootstrap(
    config: &Config,
    resolver: &PathResolver,
    formatter: &dyn Formatter,
    store: &mut OriginalContentStore,
    dry_run: bool,
) -> Result<()> {
    let path = config.bootstrap_path();
    let original = fs::read(&path)
        .with_context(|| format!("Failed to read bootstrap file: {}", path.display()))?;
    let key = OriginalContentStore::key_for(config.rules.content_key, config.source_root(), &path);
    store.capture(key, &original);

    if dry_run {
        return Ok(());
    }

    formatter.reformat(&path)?;
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read bootstrap file: {}", path.display()))?;

    let specifier = resolver.import_specifier(&path, &Target::InstrumenterModule)?;
    let mut rewritten = bootstrap_import_line(&specifier);
    rewritten.push('\n');
    rewritten.push_str(&content);
    if !content.is_empty() && !content.ends_with('\n') {
        rewritten.push('\n');
    }
    rewritten.push_str(&bootstrap_export_line(&config.server.url));
    rewritten.push('\n');

    fs::write(&path, rewritten)
        .with_context(|| format!("Failed to write bootstrap file: {}", path.display()))?;
    formatter.reformat(&path)?;
    tracing::info!(file = %path.display(), "bootstrap file wired");
    Ok(())
}
