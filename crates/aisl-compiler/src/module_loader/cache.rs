//! Cache of loaded modules, keyed by logical module name. Tracks an
//! `is_compiling` flag per entry so re-entrant loads of a module already in
//! progress are detected as circular imports rather than recursing forever.

use super::resolver::ResolveError;
use aisl_ast::Module as AstModule;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub parsed_module: Option<AstModule>,
    pub source_buffer: String,
    pub is_compiling: bool,
}

/// In-memory cache of loaded modules for the duration of one compilation.
#[derive(Debug, Default)]
pub struct ModuleCache {
    entries: HashMap<String, CacheEntry>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&CacheEntry> {
        self.entries.get(name)
    }

    /// Begin loading `name`: installs a cache entry with `is_compiling =
    /// true`. Fails with `CircularImport` if `name` is already mid-compile.
    pub fn begin_load(
        &mut self,
        name: &str,
        path: PathBuf,
        source_buffer: String,
    ) -> Result<(), ResolveError> {
        if let Some(existing) = self.entries.get(name) {
            if existing.is_compiling {
                return Err(ResolveError::CircularImport { module: name.to_string() });
            }
            return Ok(());
        }
        self.entries.insert(
            name.to_string(),
            CacheEntry { path, parsed_module: None, source_buffer, is_compiling: true },
        );
        Ok(())
    }

    /// Mark `name`'s compilation complete, storing its parsed AST and
    /// clearing `is_compiling`.
    pub fn finish_load(&mut self, name: &str, parsed_module: AstModule) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.parsed_module = Some(parsed_module);
            entry.is_compiling = false;
        }
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.entries.contains_key(name) && self.entries[name].parsed_module.is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
