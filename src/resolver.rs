//! Root-relative import paths between arbitrary directory depths.
//!
//! From a file inside the source root, walk upward one directory at a time
//! (one `../` per step) until the source root is reached, then append the
//! target's root-relative path.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory (under the source root) the TypeScript runtime module is copied to.
pub const MODULE_DIR: &str = "lava_test_coverage";
/// Name of the browser runtime script copied into the source root.
pub const INSTRUMENTER_JS: &str = "instrument.js";
/// File name of the TypeScript runtime module.
pub const INSTRUMENTER_TS: &str = "instrumenter.ts";

/// Artifact an import path is resolved towards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// `instrument.js` in the source root.
    InstrumenterScript,
    /// The TypeScript module, imported without its extension.
    InstrumenterModule,
    /// The Angular bootstrap module, given as its configured filename.
    Bootstrap(String),
}

impl Target {
    /// Path of the target relative to the source root, as written in imports.
    pub fn root_relative(&self) -> String {
        match self {
            Target::InstrumenterScript => INSTRUMENTER_JS.to_string(),
            Target::InstrumenterModule => {
                format!("{}/{}", MODULE_DIR, INSTRUMENTER_TS.trim_end_matches(".ts"))
            }
            Target::Bootstrap(filename) => filename.trim().trim_end_matches(".ts").to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("{} is not inside the source root {}", file.display(), root.display())]
    OutsideRoot { file: PathBuf, root: PathBuf },
}

/// Resolves import paths against one source root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path from `file`'s directory to `target`.
    ///
    /// Fails when `file` does not live below the source root.
    pub fn resolve(&self, file: &Path, target: &Target) -> Result<String, ResolveError> {
        let mut prefix = String::new();
        let mut current = file.parent();
        loop {
            match current {
                Some(dir) if dir == self.root => {
                    return Ok(format!("{}{}", prefix, target.root_relative()));
                }
                Some(dir) => {
                    prefix.push_str("../");
                    current = dir.parent();
                }
                None => {
                    return Err(ResolveError::OutsideRoot {
                        file: file.to_path_buf(),
                        root: self.root.clone(),
                    })
                }
            }
        }
    }

    /// Import specifier for `target`, always starting with `./` or `../` so
    /// TypeScript treats it as a relative import.
    pub fn import_specifier(&self, file: &Path, target: &Target) -> Result<String, ResolveError> {
        let path = self.resolve(file, target)?;
        if path.contains("../") {
            Ok(path)
        } else {
            Ok(format!("./{}", path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> PathResolver {
        PathResolver::new("/srv/app/src")
    }

    #[test]
    fn file_in_root_has_no_prefix() {
        let path = resolver()
            .resolve(Path::new("/srv/app/src/index.html"), &Target::InstrumenterScript)
            .unwrap();
        assert_eq!(path, "instrument.js");
    }

    #[test]
    fn one_segment_per_level() {
        let file = Path::new("/srv/app/src/app/components/header/header.component.ts");
        let path = resolver()
            .resolve(file, &Target::Bootstrap("main.ts".to_string()))
            .unwrap();
        assert_eq!(path, "../../../main");
        assert_eq!(path.matches("../").count(), 3);
    }

    #[test]
    fn module_target_drops_extension() {
        let path = resolver()
            .resolve(Path::new("/srv/app/src/main.ts"), &Target::InstrumenterModule)
            .unwrap();
        assert_eq!(path, "lava_test_coverage/instrumenter");
    }

    #[test]
    fn import_specifier_gets_dot_slash_at_root_level() {
        let r = resolver();
        let main = Target::Bootstrap("main.ts".to_string());
        assert_eq!(
            r.import_specifier(Path::new("/srv/app/src/app/index.ts"), &main)
                .unwrap(),
            "../main"
        );
        assert_eq!(
            r.import_specifier(Path::new("/srv/app/src/polyfills.ts"), &main)
                .unwrap(),
            "./main"
        );
        assert_eq!(
            r.import_specifier(Path::new("/srv/app/src/main.ts"), &Target::InstrumenterModule)
                .unwrap(),
            "./lava_test_coverage/instrumenter"
        );
    }

    #[test]
    fn outside_root_is_an_error() {
        let err = resolver()
            .resolve(Path::new("/etc/passwd"), &Target::InstrumenterScript)
            .unwrap_err();
        assert!(matches!(err, ResolveError::OutsideRoot { .. }));
    }
}
