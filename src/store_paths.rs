//! Purpose: Shared store-directory and namespace-file path resolution helpers.
//! Exports: `default_store_dir`, `resolve_namespace_path`, `namespace_lock_path`.
//! Role: Keep CLI, ABI, and `FileStore` path semantics aligned from one source.
//! Invariants: Default store directory is `$RECOPS_DIR`, else `~/.recops/store`.
//! Invariants: Namespace names must be non-empty and must not contain path separators.

use std::path::{Path, PathBuf};

pub const STORE_DIR_ENV: &str = "RECOPS_DIR";
const NAMESPACE_EXTENSION: &str = "json";
const LOCK_EXTENSION: &str = "lock";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NamespaceResolveError {
    Empty,
    ContainsPathSeparator,
}

pub fn default_store_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(STORE_DIR_ENV).filter(|dir| !dir.is_empty()) {
        return PathBuf::from(dir);
    }
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".recops").join("store")
}

pub fn resolve_namespace_path(
    namespace: &str,
    store_dir: &Path,
) -> Result<PathBuf, NamespaceResolveError> {
    validate_namespace(namespace)?;
    Ok(store_dir.join(format!("{namespace}.{NAMESPACE_EXTENSION}")))
}

pub fn namespace_lock_path(
    namespace: &str,
    store_dir: &Path,
) -> Result<PathBuf, NamespaceResolveError> {
    validate_namespace(namespace)?;
    Ok(store_dir.join(format!("{namespace}.{LOCK_EXTENSION}")))
}

fn validate_namespace(namespace: &str) -> Result<(), NamespaceResolveError> {
    if namespace.is_empty() {
        return Err(NamespaceResolveError::Empty);
    }
    if namespace.contains('/') || namespace.contains('\\') {
        return Err(NamespaceResolveError::ContainsPathSeparator);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{NamespaceResolveError, namespace_lock_path, resolve_namespace_path};
    use std::path::PathBuf;

    #[test]
    fn namespace_resolves_to_json_file() {
        let dir = PathBuf::from(".scratch/store");
        let path = resolve_namespace_path("test", &dir).expect("path");
        assert_eq!(path, PathBuf::from(".scratch/store/test.json"));
        let lock = namespace_lock_path("test", &dir).expect("lock");
        assert_eq!(lock, PathBuf::from(".scratch/store/test.lock"));
    }

    #[test]
    fn namespace_rejects_separators_and_empty_names() {
        let dir = PathBuf::from(".scratch/store");
        assert_eq!(
            resolve_namespace_path("a/b", &dir),
            Err(NamespaceResolveError::ContainsPathSeparator)
        );
        assert_eq!(
            resolve_namespace_path("", &dir),
            Err(NamespaceResolveError::Empty)
        );
    }
}
