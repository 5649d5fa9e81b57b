//! Walks a `.aisl` entry file's import graph, parsing each file reached
//! from it into the `{name -> Module}` map `aisl_compiler::compile_program`
//! expects. Resolution itself (fixed search-path order, circular-import
//! detection) is `aisl_compiler::module_loader`'s job; this just drives it
//! from disk, one file read + parse at a time.

use crate::sexpr::{self, ParseError};
use aisl_compiler::module_loader::ModuleResolver;
use aisl_ast::Module as AstModule;
use rustc_hash::FxHashMap;
use std::path::Path;

#[derive(Debug)]
pub enum LoadError {
    Io { path: String, message: String },
    Parse { path: String, error: ParseError },
    Resolve(aisl_compiler::ResolveError),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io { path, message } => write!(f, "{path}: {message}"),
            LoadError::Parse { path, error } => write!(f, "{path}: {error}"),
            LoadError::Resolve(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for LoadError {}

/// Parse `entry_path` and every module it (transitively) imports, keyed by
/// module name. Returns the entry module's own name alongside the map.
pub fn load_program(entry_path: &Path) -> Result<(String, FxHashMap<String, AstModule>), LoadError> {
    let entry_name = entry_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".to_string());
    let project_root = entry_path.parent().unwrap_or_else(|| Path::new("."));
    let resolver = ModuleResolver::new(project_root);

    let mut modules = FxHashMap::default();
    let mut in_progress = std::collections::HashSet::new();
    load_one(&entry_name, entry_path, &resolver, &mut modules, &mut in_progress)?;
    Ok((entry_name, modules))
}

fn load_one(
    name: &str,
    path: &Path,
    resolver: &ModuleResolver,
    modules: &mut FxHashMap<String, AstModule>,
    in_progress: &mut std::collections::HashSet<String>,
) -> Result<(), LoadError> {
    if modules.contains_key(name) || in_progress.contains(name) {
        return Ok(());
    }
    in_progress.insert(name.to_string());

    let source = std::fs::read_to_string(path)
        .map_err(|e| LoadError::Io { path: path.display().to_string(), message: e.to_string() })?;
    let module = sexpr::parse_module(name, &source)
        .map_err(|error| LoadError::Parse { path: path.display().to_string(), error })?;

    for import in module.imports.clone() {
        if modules.contains_key(&import.module_name) || in_progress.contains(&import.module_name) {
            continue;
        }
        let import_path = resolver.resolve(&import.module_name).map_err(LoadError::Resolve)?;
        load_one(&import.module_name, &import_path, resolver, modules, in_progress)?;
    }

    in_progress.remove(name);
    modules.insert(name.to_string(), module);
    Ok(())
}
