use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::ReviewsError;

/// Removes `path` recursively, continuing past entries that cannot be removed.
///
/// Returns the number of removal errors that were suppressed.
pub fn remove_dir_all_best_effort(path: &Path) -> usize {
    let mut suppressed = 0usize;
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(_) => {
            return usize::from(fs::remove_dir(path).is_err());
        }
    };
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => {
                suppressed += 1;
                continue;
            }
        };
        let child = entry.path();
        let is_dir = entry
            .file_type()
            .map(|kind| kind.is_dir())
            .unwrap_or(false);
        if is_dir {
            suppressed += remove_dir_all_best_effort(&child);
        } else if fs::remove_file(&child).is_err() {
            suppressed += 1;
        }
    }
    if fs::remove_dir(path).is_err() {
        suppressed += 1;
    }
    suppressed
}

/// Makes `path` absolute without requiring it to exist.
///
/// The longest existing prefix is canonicalized (resolving symlinks) and the
/// remaining components are appended lexically.
pub fn absolutize(path: &Path) -> Result<PathBuf, ReviewsError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|err| ReviewsError::Filesystem(err.to_string()))?
            .join(path)
    };
    let normalized = normalize_lexically(&absolute);

    let mut existing = normalized.as_path();
    let mut rest = Vec::new();
    loop {
        if existing.exists() {
            break;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = match existing.canonicalize() {
        Ok(path) => path,
        Err(_) => existing.to_path_buf(),
    };
    for name in rest.into_iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}

/// True when the two absolute paths are equal or one contains the other.
pub fn paths_overlap(a: &Path, b: &Path) -> bool {
    a == b || a.starts_with(b) || b.starts_with(a)
}

pub fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return path.to_path_buf();
    };
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

pub fn dir_size(path: &Path) -> io::Result<u64> {
    let mut total = 0u64;
    let mut stack = vec![path.to_path_buf()];
    while let Some(path) = stack.pop() {
        for entry in fs::read_dir(&path)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            if meta.is_dir() {
                stack.push(entry.path());
            } else {
                total = total.saturating_add(meta.len());
            }
        }
    }
    Ok(total)
}

fn normalize_lexically(path: &Path) -> PathBuf {
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
