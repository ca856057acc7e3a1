use std::ffi::OsString;
use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};
use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink};
use crate::error::ReviewsError;
use crate::fs_util;

pub const DATASETS_CACHE_ENV: &str = "HF_DATASETS_CACHE";
pub const HF_HOME_ENV: &str = "HF_HOME";
pub const XDG_CACHE_HOME_ENV: &str = "XDG_CACHE_HOME";
const APP_NAME: &str = "amazon-reviews";
const DOWNLOADS_DIR: &str = "downloads";

#[derive(Debug, Clone, Serialize)]
pub struct CacheCleanup {
    pub path: String,
    pub existed: bool,
    pub removed: bool,
    pub suppressed_errors: usize,
}

/// The cache directory downloads go into and that is purged after every category.
///
/// Defaults to a directory owned by this tool, never the shared Hugging Face cache.
pub fn download_cache_dir(explicit: Option<&Path>) -> Result<PathBuf, ReviewsError> {
    let home = BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
    let project = ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.cache_dir().to_path_buf());
    download_cache_dir_with(explicit, project.as_deref(), home.as_deref())
}

pub fn download_cache_dir_with(
    explicit: Option<&Path>,
    project_cache: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ReviewsError> {
    let resolved = match (explicit, project_cache) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(dir)) => dir.join(DOWNLOADS_DIR),
        (None, None) => home
            .ok_or(ReviewsError::CacheUnresolved)?
            .join(".cache")
            .join(APP_NAME)
            .join(DOWNLOADS_DIR),
    };
    Ok(fs_util::expand_home(&resolved, home))
}

/// Resolves the shared Hugging Face datasets cache, for inspection only.
///
/// Precedence: `explicit`, `HF_DATASETS_CACHE`, `$HF_HOME/datasets`,
/// `$XDG_CACHE_HOME/huggingface/datasets`, then the platform default.
pub fn resolve_cache_dir(explicit: Option<&Path>) -> Result<PathBuf, ReviewsError> {
    let home = BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
    resolve_cache_dir_with(explicit, home.as_deref(), |key| std::env::var_os(key))
}

pub fn resolve_cache_dir_with<F>(
    explicit: Option<&Path>,
    home: Option<&Path>,
    env: F,
) -> Result<PathBuf, ReviewsError>
where
    F: Fn(&str) -> Option<OsString>,
{
    let non_empty = |key: &str| env(key).filter(|value| !value.is_empty()).map(PathBuf::from);

    let resolved = if let Some(path) = explicit {
        path.to_path_buf()
    } else if let Some(path) = non_empty(DATASETS_CACHE_ENV) {
        path
    } else if let Some(hf_home) = non_empty(HF_HOME_ENV) {
        hf_home.join("datasets")
    } else if let Some(xdg) = non_empty(XDG_CACHE_HOME_ENV) {
        xdg.join("huggingface").join("datasets")
    } else {
        let home = home.ok_or(ReviewsError::CacheUnresolved)?;
        default_cache_location_in(home)
    };
    Ok(fs_util::expand_home(&resolved, home))
}

/// Returns the active cache directory, optionally explaining how to override it.
pub fn get_cache_location(cache_dir: &Path, verbose: bool, sink: &dyn ProgressSink) -> PathBuf {
    if verbose {
        sink.event(ProgressEvent::info(format!(
            "Current cache directory: {}",
            cache_dir.display()
        )));
        sink.event(ProgressEvent::info(format!(
            "To use a custom cache directory pass --cache-dir <path> or set \"cache_dir\" in the \
             config file."
        )));
        if let Ok(shared) = resolve_cache_dir(None) {
            sink.event(ProgressEvent::info(format!(
                "Shared Hugging Face datasets cache ({DATASETS_CACHE_ENV}), never purged: {}",
                shared.display()
            )));
        }
    }
    cache_dir.to_path_buf()
}

/// Deletes the cache directory, suppressing per-entry failures.
pub fn delete_cache(cache_dir: &Path, sink: &dyn ProgressSink) -> CacheCleanup {
    let path = cache_dir.display().to_string();
    if !cache_dir.exists() {
        sink.event(ProgressEvent::warning(format!(
            "Cache directory does not exist: {path}"
        )));
        return CacheCleanup {
            path,
            existed: false,
            removed: false,
            suppressed_errors: 0,
        };
    }

    sink.event(ProgressEvent::info(format!("Deleting cache at: {path}")));
    let suppressed_errors = fs_util::remove_dir_all_best_effort(cache_dir);
    let removed = !cache_dir.exists();
    if removed {
        sink.event(ProgressEvent::success("Cache directory deleted."));
    } else {
        sink.event(ProgressEvent::warning(format!(
            "Cache directory partially deleted; {suppressed_errors} entries could not be removed"
        )));
    }
    CacheCleanup {
        path,
        existed: true,
        removed,
        suppressed_errors,
    }
}

/// The platform default cache path, ignoring any configuration.
pub fn default_cache_location() -> Result<PathBuf, ReviewsError> {
    BaseDirs::new()
        .map(|dirs| default_cache_location_in(dirs.home_dir()))
        .ok_or(ReviewsError::CacheUnresolved)
}

fn default_cache_location_in(home: &Path) -> PathBuf {
    home.join(".cache").join("huggingface").join("datasets")
}
