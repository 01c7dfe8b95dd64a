//! SQLite DSN helpers.

use std::path::{Path, PathBuf};

use crate::{DbError, Result};

pub const MEMORY_DSN: &str = "sqlite::memory:";

pub fn is_memory(dsn: &str) -> bool {
    dsn.contains(":memory:") || dsn.contains("mode=memory")
}

/// Create the parent directory of a file DSN when asked to.
pub(crate) fn prepare_sqlite_path(dsn: &str, create_dirs: bool) -> Result<String> {
    if !create_dirs || is_memory(dsn) {
        return Ok(dsn.to_string());
    }
    let raw = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))
        .unwrap_or(dsn);
    let path = raw.split_once('?').map(|(p, _)| p).unwrap_or(raw);
    if !path.starts_with("file:") {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(dsn.to_string())
}

/// Rewrite `sqlite://relative/path.db` into an absolute DSN under `base_dir`.
///
/// In-memory DSNs are normalized to [`MEMORY_DSN`]; query strings are preserved.
pub fn absolutize_dsn(dsn: &str, base_dir: &Path) -> Result<String> {
    if is_memory(dsn) {
        return Ok(MEMORY_DSN.to_string());
    }
    let rest = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| DbError::UnknownDsn(dsn.to_string()))?;
    let (path_str, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if path_str.is_empty() {
        return Err(DbError::UnknownDsn(dsn.to_string()));
    }

    let mut path = PathBuf::from(path_str);
    if path.is_relative() {
        path = base_dir.join(path);
    }

    let mut out = format!("sqlite://{}", path.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_forms_collapse_to_one_dsn() {
        let base = Path::new("/srv");
        assert_eq!(absolutize_dsn("sqlite::memory:", base).unwrap(), MEMORY_DSN);
        assert_eq!(absolutize_dsn("sqlite://:memory:", base).unwrap(), MEMORY_DSN);
    }

    #[test]
    fn relative_paths_are_joined_and_query_kept() {
        let base = Path::new("/srv/rollcall");
        let out = absolutize_dsn("sqlite://database/app.db?mode=rwc", base).unwrap();
        assert_eq!(out, "sqlite:///srv/rollcall/database/app.db?mode=rwc");
    }

    #[test]
    fn non_sqlite_dsn_is_rejected() {
        assert!(absolutize_dsn("postgres://x/y", Path::new("/")).is_err());
        assert!(absolutize_dsn("sqlite://", Path::new("/")).is_err());
    }
}
