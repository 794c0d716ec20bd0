//! Configuration loading from `lava.toml`.
//!
//! Only `[project]` and `[server]` are required. `validate` canonicalizes the
//! source root, so every path derived from it compares equal to discovered paths.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::Mode;
use crate::rules::RuleOptions;
use crate::store::ContentKey;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub formatter: FormatterConfig,
    #[serde(default)]
    pub rules: RulesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProjectConfig {
    pub mode: Mode,
    pub source_root: PathBuf,
    #[serde(default = "default_bootstrap")]
    pub bootstrap: String,
    #[serde(default = "default_sub_roots")]
    pub sub_roots: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub routes: Vec<String>,
}

fn default_bootstrap() -> String {
    "main.ts".to_string()
}

fn default_sub_roots() -> Vec<String> {
    vec!["app/components".to_string(), "app/services".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssetsConfig {
    #[serde(default = "default_instrumenter_js")]
    pub instrumenter_js: PathBuf,
    #[serde(default = "default_instrumenter_module_dir")]
    pub instrumenter_module_dir: PathBuf,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            instrumenter_js: default_instrumenter_js(),
            instrumenter_module_dir: default_instrumenter_module_dir(),
        }
    }
}

fn default_instrumenter_js() -> PathBuf {
    PathBuf::from("inject_js/instrument.js")
}

fn default_instrumenter_module_dir() -> PathBuf {
    PathBuf::from("typescript_module/lava_test_coverage")
}

#[derive(Debug, Deserialize, Clone)]
pub struct FormatterConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Program and leading arguments; the file path is appended.
    #[serde(default)]
    pub command: Option<Vec<String>>,
    #[serde(default)]
    pub structural_failure_codes: Option<Vec<i32>>,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: None,
            structural_failure_codes: None,
        }
    }
}

impl FormatterConfig {
    /// Configured command, or the canonicalizer the mode expects.
    pub fn command_for(&self, mode: Mode) -> Vec<String> {
        if let Some(command) = &self.command {
            return command.clone();
        }
        let defaults: &[&str] = match mode {
            Mode::Web | Mode::Angular => &["prettier", "--write"],
            Mode::Unity => &[
                "AStyle",
                "--style=java",
                "--break-one-line-headers",
                "--add-braces",
                "--delete-empty-lines",
                "--mode=cs",
            ],
        };
        defaults.iter().map(|s| s.to_string()).collect()
    }

    /// Exit codes meaning "structure broken after injection".
    pub fn failure_codes_for(&self, mode: Mode) -> Vec<i32> {
        if let Some(codes) = &self.structural_failure_codes {
            return codes.clone();
        }
        match mode {
            Mode::Web | Mode::Angular => vec![2],
            Mode::Unity => vec![1, 2],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RulesConfig {
    #[serde(default = "default_true")]
    pub skip_constructors: bool,
    #[serde(default)]
    pub content_key: ContentKey,
    #[serde(default = "default_true")]
    pub restore_rejected: bool,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            skip_constructors: true,
            content_key: ContentKey::Basename,
            restore_rejected: true,
        }
    }
}

impl RulesConfig {
    pub fn options(&self) -> RuleOptions {
        RuleOptions {
            skip_constructors: self.skip_constructors,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn mode(&self) -> Mode {
        self.project.mode
    }

    pub fn source_root(&self) -> &Path {
        &self.project.source_root
    }

    /// Absolute path of the Angular bootstrap file.
    pub fn bootstrap_path(&self) -> PathBuf {
        self.project.source_root.join(&self.project.bootstrap)
    }

    /// Absolute path of the application's `index.html`.
    pub fn index_path(&self) -> PathBuf {
        self.project.source_root.join("index.html")
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(config)
}

/// Check a parsed configuration and canonicalize its source root.
pub fn validate(mut config: Config) -> Result<Config> {
    let root = &config.project.source_root;
    if !root.is_dir() {
        bail!(
            "project.source_root does not exist or is not a directory: {}",
            root.display()
        );
    }
    config.project.source_root = std::fs::canonicalize(root)
        .with_context(|| format!("Failed to resolve source root: {}", root.display()))?;

    if config.server.url.trim().is_empty() {
        bail!("server.url must not be empty");
    }

    if config.project.mode == Mode::Angular && !config.project.bootstrap.ends_with(".ts") {
        bail!(
            "project.bootstrap must be a .ts file in angular mode, got '{}'",
            config.project.bootstrap
        );
    }

    if config.formatter.enabled && config.formatter.command_for(config.mode()).is_empty() {
        bail!("formatter.command must not be empty when the formatter is enabled");
    }

    for pattern in &config.project.exclude_globs {
        globset::Glob::new(pattern)
            .with_context(|| format!("Invalid exclude glob: '{}'", pattern))?;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("lava.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let tmp = TempDir::new().unwrap();
        let body = format!(
            "[project]\nmode = \"web\"\nsource_root = \"{}\"\n\n[server]\nurl = \"http://localhost:5000\"\n",
            tmp.path().display()
        );
        let cfg = load_config(&write_config(tmp.path(), &body)).unwrap();
        assert_eq!(cfg.mode(), Mode::Web);
        assert_eq!(cfg.project.sub_roots, vec!["app/components", "app/services"]);
        assert!(cfg.formatter.enabled);
        assert_eq!(cfg.formatter.command_for(Mode::Web)[0], "prettier");
        assert_eq!(cfg.formatter.failure_codes_for(Mode::Unity), vec![1, 2]);
        assert!(cfg.rules.skip_constructors);
        assert_eq!(cfg.rules.content_key, ContentKey::Basename);
    }

    #[test]
    fn missing_root_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let body = "[project]\nmode = \"unity\"\nsource_root = \"/definitely/not/here\"\n\n[server]\nurl = \"http://x\"\n";
        let err = load_config(&write_config(tmp.path(), body)).unwrap_err();
        assert!(err.to_string().contains("source_root"));
    }

    #[test]
    fn unknown_mode_fails_to_parse() {
        let tmp = TempDir::new().unwrap();
        let body = format!(
            "[project]\nmode = \"flash\"\nsource_root = \"{}\"\n\n[server]\nurl = \"http://x\"\n",
            tmp.path().display()
        );
        assert!(load_config(&write_config(tmp.path(), &body)).is_err());
    }

    #[test]
    fn angular_bootstrap_must_be_typescript() {
        let tmp = TempDir::new().unwrap();
        let body = format!(
            "[project]\nmode = \"angular\"\nsource_root = \"{}\"\nbootstrap = \"main.js\"\n\n[server]\nurl = \"http://x\"\n",
            tmp.path().display()
        );
        let err = load_config(&write_config(tmp.path(), &body)).unwrap_err();
        assert!(err.to_string().contains("bootstrap"));
    }

    #[test]
    fn explicit_formatter_overrides_defaults() {
        let tmp = TempDir::new().unwrap();
        let body = format!(
            "[project]\nmode = \"unity\"\nsource_root = \"{}\"\n\n[server]\nurl = \"http://x\"\n\n[formatter]\ncommand = [\"astyle\", \"-q\"]\nstructural_failure_codes = [3]\n\n[rules]\nskip_constructors = false\ncontent_key = \"relative\"\n",
            tmp.path().display()
        );
        let cfg = load_config(&write_config(tmp.path(), &body)).unwrap();
        assert_eq!(cfg.formatter.command_for(Mode::Unity), vec!["astyle", "-q"]);
        assert_eq!(cfg.formatter.failure_codes_for(Mode::Unity), vec![3]);
        assert!(!cfg.rules.options().skip_constructors);
        assert_eq!(cfg.rules.content_key, ContentKey::Relative);
    }
}
