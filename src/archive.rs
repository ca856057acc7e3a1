use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;
use tempfile::Builder;
use tracing::debug;
use xz2::write::XzEncoder;

use crate::domain::{CompressionFormat, CompressionLevel};
use crate::error::ReviewsError;

/// bz2 and xz archives ignore the requested level and use these.
const BZIP2_LEVEL: u32 = 9;
const XZ_PRESET: u32 = 6;

/// Path of the archive `compress_folder` produces for `folder`.
pub fn archive_path_for(folder: &Path, format: CompressionFormat) -> Result<PathBuf, ReviewsError> {
    let name = folder
        .file_name()
        .ok_or_else(|| ReviewsError::Archive(format!("no folder name in {}", folder.display())))?;
    let mut file_name = name.to_os_string();
    file_name.push(format.extension());
    Ok(folder.with_file_name(file_name))
}

/// Packs `folder` into `<folder>.tar.<ext>` and deletes the folder.
///
/// The archive root is the folder's base name. The source is only removed
/// once the archive has been fully written, synced and moved into place.
pub fn compress_folder(
    folder: &Path,
    format: CompressionFormat,
    level: u32,
) -> Result<PathBuf, ReviewsError> {
    let level = CompressionLevel::new(level)?;
    if !folder.is_dir() {
        return Err(ReviewsError::Archive(format!(
            "not a directory: {}",
            folder.display()
        )));
    }

    let archive_path = archive_path_for(folder, format)?;
    let root = folder
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            ReviewsError::Archive(format!("non-utf8 folder name: {}", folder.display()))
        })?
        .to_string();
    let parent = archive_path
        .parent()
        .ok_or_else(|| ReviewsError::Archive("archive path has no parent".to_string()))?;

    let mut temp = Builder::new()
        .prefix(&format!(".{root}"))
        .suffix(".partial")
        .tempfile_in(parent)
        .map_err(|err| ReviewsError::Filesystem(err.to_string()))?;

    debug!(
        folder = %folder.display(),
        archive = %archive_path.display(),
        format = %format,
        level = level.get(),
        "writing archive"
    );
    {
        let file = temp.as_file_mut();
        match format {
            CompressionFormat::Gz => {
                let encoder = GzEncoder::new(file, flate2::Compression::new(level.get()));
                let encoder = write_tar(encoder, &root, folder)?;
                encoder.finish().map_err(archive_err)?;
            }
            CompressionFormat::Bz2 => {
                let encoder = BzEncoder::new(file, bzip2::Compression::new(BZIP2_LEVEL));
                let encoder = write_tar(encoder, &root, folder)?;
                encoder.finish().map_err(archive_err)?;
            }
            CompressionFormat::Xz => {
                let encoder = XzEncoder::new(file, XZ_PRESET);
                let encoder = write_tar(encoder, &root, folder)?;
                encoder.finish().map_err(archive_err)?;
            }
        }
    }
    temp.as_file()
        .sync_all()
        .map_err(|err| ReviewsError::Filesystem(err.to_string()))?;

    if archive_path.exists() {
        fs::remove_file(&archive_path).map_err(|err| ReviewsError::Filesystem(err.to_string()))?;
    }
    temp.persist(&archive_path)
        .map_err(|err| ReviewsError::Filesystem(err.to_string()))?;

    fs::remove_dir_all(folder).map_err(|err| ReviewsError::Filesystem(err.to_string()))?;
    Ok(archive_path)
}

fn write_tar<W: Write>(writer: W, root: &str, folder: &Path) -> Result<W, ReviewsError> {
    let mut builder = tar::Builder::new(writer);
    builder.append_dir_all(root, folder).map_err(archive_err)?;
    builder.into_inner().map_err(archive_err)
}

fn archive_err(err: std::io::Error) -> ReviewsError {
    ReviewsError::Archive(err.to_string())
}
