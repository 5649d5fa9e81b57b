//! Resolves a logical module name to a source file path, searching the
//! fixed, priority-ordered list of search paths.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("module not found: {name} (searched {tried:?})")]
    ModuleNotFound { name: String, tried: Vec<PathBuf> },

    #[error("current file has no parent directory")]
    NoParentDirectory,

    #[error("I/O error resolving {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("circular import: {module}")]
    CircularImport { module: String },
}

/// The stdlib's own named subdirectories, each additionally searched under
/// the stdlib root.
const STDLIB_SUBDIRS: &[&str] = &["core", "data", "net", "sys", "crypto", "db", "pattern"];

/// Resolves module names against the fixed search-path order: project
/// stdlib, project modules, user modules, system modules.
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    project_root: PathBuf,
    user_modules_root: Option<PathBuf>,
    system_modules_root: PathBuf,
}

impl ModuleResolver {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            user_modules_root: dirs::home_dir().map(|h| h.join(".aisl").join("modules")),
            system_modules_root: PathBuf::from("/usr/lib/aisl/modules"),
        }
    }

    fn search_roots(&self) -> Vec<PathBuf> {
        let mut roots = vec![self.project_root.join("stdlib")];
        for sub in STDLIB_SUBDIRS {
            roots.push(self.project_root.join("stdlib").join(sub));
        }
        roots.push(self.project_root.join("modules"));
        if let Some(user) = &self.user_modules_root {
            roots.push(user.clone());
        }
        roots.push(self.system_modules_root.clone());
        roots
    }

    /// Resolve a logical module name (e.g. `"math"`) to its `.aisl` source
    /// file under the first search root where it exists.
    pub fn resolve(&self, module_name: &str) -> Result<PathBuf, ResolveError> {
        let mut tried = Vec::new();
        for root in self.search_roots() {
            let candidate = root.join(format!("{module_name}.aisl"));
            tried.push(candidate.clone());
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        Err(ResolveError::ModuleNotFound { name: module_name.to_string(), tried })
    }
}

/// Resolve a relative import path against the importing file's directory.
/// Used for intra-project relative imports, distinct from the logical
/// search-path resolution `ModuleResolver::resolve` performs for named
/// modules.
pub fn resolve_relative(from_file: &Path, specifier: &str) -> Result<PathBuf, ResolveError> {
    let dir = from_file.parent().ok_or(ResolveError::NoParentDirectory)?;
    Ok(dir.join(specifier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn resolves_a_module_from_the_project_modules_directory() {
        let tmp = tempfile_dir();
        fs::create_dir_all(tmp.join("modules")).unwrap();
        fs::write(tmp.join("modules").join("util.aisl"), "").unwrap();

        let resolver = ModuleResolver::new(&tmp);
        let resolved = resolver.resolve("util").unwrap();
        assert_eq!(resolved, tmp.join("modules").join("util.aisl"));
    }

    #[test]
    fn prefers_stdlib_over_project_modules_when_both_exist() {
        let tmp = tempfile_dir();
        fs::create_dir_all(tmp.join("stdlib")).unwrap();
        fs::create_dir_all(tmp.join("modules")).unwrap();
        fs::write(tmp.join("stdlib").join("core_mod.aisl"), "").unwrap();
        fs::write(tmp.join("modules").join("core_mod.aisl"), "").unwrap();

        let resolver = ModuleResolver::new(&tmp);
        let resolved = resolver.resolve("core_mod").unwrap();
        assert_eq!(resolved, tmp.join("stdlib").join("core_mod.aisl"));
    }

    #[test]
    fn missing_module_reports_every_path_tried() {
        let tmp = tempfile_dir();
        let resolver = ModuleResolver::new(&tmp);
        let err = resolver.resolve("nonexistent").unwrap_err();
        match err {
            ResolveError::ModuleNotFound { name, tried } => {
                assert_eq!(name, "nonexistent");
                assert!(!tried.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    fn tempfile_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "aisl-resolver-test-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, std::sync::atomic::Ordering::SeqCst)
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    static COUNTER: std::sync::atomic::AtomicU32 = std::sync::atomic::AtomicU32::new(0);
}
