use std::io;
use std::path::PathBuf;

/// Database part of a SQLite DSN: scheme and query string removed.
fn database_of(dsn: &str) -> &str {
    let rest = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))
        .unwrap_or(dsn);
    rest.split('?').next().unwrap_or_default()
}

/// `sqlite::memory:`, `sqlite://memory:` or any DSN carrying `mode=memory`.
pub(crate) fn is_memory_dsn(dsn: &str) -> bool {
    matches!(database_of(dsn), ":memory:" | "memory:") || dsn.contains("mode=memory")
}

/// Create the parent directory of a file-backed SQLite DSN when asked to.
///
/// `sqlite://memory:` is rewritten to the `sqlite::memory:` form sqlx
/// understands; other DSNs are returned unchanged.
pub(crate) fn prepare_sqlite_path(dsn: &str, create_dirs: bool) -> io::Result<String> {
    if database_of(dsn) == "memory:" {
        return Ok(match dsn.split_once('?') {
            Some((_, query)) => format!("sqlite::memory:?{query}"),
            None => "sqlite::memory:".to_string(),
        });
    }
    if !create_dirs || is_memory_dsn(dsn) {
        return Ok(dsn.to_string());
    }

    if let Some(parent) = file_path_of(dsn).as_ref().and_then(|p| p.parent()) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    Ok(dsn.to_string())
}

/// File path part of a SQLite DSN, without the query string.
///
/// `sqlite:///abs/db.sqlite` → `/abs/db.sqlite`, `sqlite://rel/db.sqlite` and
/// `sqlite:rel/db.sqlite` → `rel/db.sqlite`.
fn file_path_of(dsn: &str) -> Option<PathBuf> {
    if !dsn.starts_with("sqlite:") {
        return None;
    }
    let rest = database_of(dsn);
    if rest.is_empty() || rest.starts_with("file:") {
        return None;
    }
    Some(PathBuf::from(rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn memory_dsns_are_detected() {
        assert!(is_memory_dsn("sqlite::memory:"));
        assert!(is_memory_dsn("sqlite://memory:"));
        assert!(is_memory_dsn("sqlite:file:qure?mode=memory&cache=shared"));
        assert!(!is_memory_dsn("sqlite://database/qure.db"));
        assert!(!is_memory_dsn("sqlite://data/memory:backup.db"));
    }

    #[test]
    fn url_style_memory_dsn_is_rewritten_for_sqlx() {
        assert_eq!(
            prepare_sqlite_path("sqlite://memory:", true).unwrap(),
            "sqlite::memory:"
        );
        assert_eq!(
            prepare_sqlite_path("sqlite://memory:?busy_timeout=100", false).unwrap(),
            "sqlite::memory:?busy_timeout=100"
        );
        assert_eq!(
            prepare_sqlite_path("sqlite::memory:", true).unwrap(),
            "sqlite::memory:"
        );
    }

    #[test]
    fn file_paths_are_extracted_from_dsn_forms() {
        assert_eq!(
            file_path_of("sqlite:///var/lib/qure/qure.db?busy_timeout=100"),
            Some(PathBuf::from("/var/lib/qure/qure.db"))
        );
        assert_eq!(
            file_path_of("sqlite://database/qure.db"),
            Some(PathBuf::from("database/qure.db"))
        );
        assert_eq!(
            file_path_of("sqlite:data.db"),
            Some(PathBuf::from("data.db"))
        );
        assert_eq!(file_path_of("postgres://x"), None);
    }

    #[test]
    fn parent_directories_are_created_on_request() {
        let tmp = tempdir().unwrap();
        let db = tmp.path().join("nested/dir/qure.db");
        let dsn = format!("sqlite://{}", db.display());

        prepare_sqlite_path(&dsn, false).unwrap();
        assert!(!tmp.path().join("nested").exists());

        let out = prepare_sqlite_path(&dsn, true).unwrap();
        assert_eq!(out, dsn);
        assert!(tmp.path().join("nested/dir").is_dir());
    }
}
