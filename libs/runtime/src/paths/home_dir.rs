//! Resolution of the server home directory (`server.home_dir`).
//!
//! Rules:
//! - `None` → `<platform home>/<default_subdir>`
//! - `~` / `~/x` → expanded against the platform home
//! - relative paths → joined to the current working directory
//! - absolute paths → kept as-is

use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum HomeDirError {
    #[error("platform home directory is unknown ({0} is not set)")]
    NoPlatformHome(&'static str),
    #[error("cannot determine current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
    #[error("failed to create home directory '{path}': {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(target_os = "windows")]
const HOME_VAR: &str = "APPDATA";
#[cfg(not(target_os = "windows"))]
const HOME_VAR: &str = "HOME";

fn platform_home() -> Result<PathBuf, HomeDirError> {
    env::var_os(HOME_VAR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or(HomeDirError::NoPlatformHome(HOME_VAR))
}

fn expand(raw: &str) -> Result<PathBuf, HomeDirError> {
    if raw == "~" {
        return platform_home();
    }
    if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        return Ok(platform_home()?.join(rest));
    }

    let p = Path::new(raw);
    if p.is_absolute() {
        Ok(p.to_path_buf())
    } else {
        Ok(env::current_dir()
            .map_err(HomeDirError::CurrentDir)?
            .join(p))
    }
}

/// Resolve the home directory to an absolute path, optionally creating it.
pub fn resolve_home_dir(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf, HomeDirError> {
    let path = match configured.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => expand(raw)?,
        _ => platform_home()?.join(default_subdir),
    };

    if create {
        std::fs::create_dir_all(&path).map_err(|source| HomeDirError::Create {
            path: path.clone(),
            source,
        })?;
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn absolute_path_is_kept() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("qure-home");
        let resolved =
            resolve_home_dir(Some(target.to_string_lossy().to_string()), ".qure", true).unwrap();
        assert_eq!(resolved, target);
        assert!(target.is_dir());
    }

    #[test]
    fn relative_path_is_made_absolute_without_creating() {
        let resolved = resolve_home_dir(Some("some/rel/dir".into()), ".qure", false).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("some/rel/dir"));
    }

    #[test]
    fn blank_value_falls_back_to_default_subdir() {
        if platform_home().is_err() {
            return;
        }
        let resolved = resolve_home_dir(Some("   ".into()), ".qure", false).unwrap();
        assert!(resolved.ends_with(".qure"));
    }
}
