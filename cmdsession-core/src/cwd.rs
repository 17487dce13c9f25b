//! Working directory resolution for the `cd` built-in.
//!
//! The session never calls `std::env::set_current_dir`. Targets are resolved
//! against the session's own directory and the result is handed to every
//! spawned shell via `current_dir`.
//!
//! Resolution is logical, like a shell's `cd` without `-P`: `.` and `..` are
//! collapsed lexically and symlinks are left alone.

use std::path::{Component, Path, PathBuf};

/// Resolve a `cd` argument against `cwd`.
///
/// - `""` or `~` goes home
/// - `-` goes to `previous`
/// - `~/x` expands against home
/// - anything else is taken as absolute or relative to `cwd`
///
/// Returns `None` when the target is not an existing directory.
pub fn resolve_cd(arg: &str, cwd: &Path, previous: Option<&Path>) -> Option<PathBuf> {
    let target = match arg {
        "" | "~" => home_dir()?,
        "-" => previous?.to_path_buf(),
        _ => expand_tilde(arg),
    };

    let joined = if target.is_absolute() {
        target
    } else {
        cwd.join(target)
    };

    let resolved = normalize(&joined);
    if resolved.is_dir() {
        Some(resolved)
    } else {
        None
    }
}

/// Collapse `.` and `..` components without touching the filesystem.
/// `..` at the root stays at the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Replace a leading `~` with the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = home_dir() {
            return home;
        }
    }
    let rest = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\"));
    if let Some(rest) = rest {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}
