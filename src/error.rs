use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ReviewsError {
    #[error("invalid categories: {}", .0.join(", "))]
    #[diagnostic(help("run `amazon-reviews categories` to list the valid names"))]
    InvalidCategories(Vec<String>),

    #[error("invalid dataset type: {0}")]
    InvalidDatasetType(String),

    #[error("compression level must be between 1 and 9, got {0}")]
    InvalidCompressionLevel(u32),

    #[error("unsupported compression format: {0}")]
    #[diagnostic(help("supported formats are gz, bz2 and xz"))]
    UnsupportedCompressionFormat(String),

    #[error(
        "base path {} and cache directory {} must be separate and non-overlapping",
        base.display(),
        cache.display()
    )]
    PathConflict { base: PathBuf, cache: PathBuf },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("unable to resolve cache directory")]
    CacheUnresolved,

    #[error("hub request failed: {0}")]
    HubHttp(String),

    #[error("hub returned status {status}: {message}")]
    HubStatus { status: u16, message: String },

    #[error("archive error: {0}")]
    Archive(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
