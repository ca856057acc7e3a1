use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tempfile::Builder;
use tracing::debug;

use crate::domain::{CompressionFormat, SplitRequest};
use crate::error::ReviewsError;
use crate::hub::{DATASET_ID, FetchedSplit};

pub const SPLIT_NAME: &str = "full";
pub const DATA_FILE_NAME: &str = "data-00000-of-00001.jsonl";
/// Every staging entry is the dot-prefixed config name of the split it builds.
const STAGING_PREFIX: &str = ".raw_";

/// Layout of the output directory that receives dataset folders and archives.
#[derive(Debug, Clone)]
pub struct OutputStore {
    root: Utf8PathBuf,
}

impl OutputStore {
    pub fn new(root: &Path) -> Result<Self, ReviewsError> {
        let root = Utf8PathBuf::from_path_buf(root.to_path_buf())
            .map_err(|_| ReviewsError::Filesystem("non-utf8 base path".to_string()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn ensure_root(&self) -> Result<(), ReviewsError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| ReviewsError::Filesystem(err.to_string()))
    }

    /// Removes staging folders and partial archives left by an interrupted run.
    ///
    /// Returns how many entries were removed.
    pub fn sweep_staging(&self) -> usize {
        let Ok(entries) = fs::read_dir(self.root.as_std_path()) else {
            return 0;
        };
        let mut removed = 0;
        for entry in entries.flatten() {
            if !entry.file_name().to_string_lossy().starts_with(STAGING_PREFIX) {
                continue;
            }
            let path = entry.path();
            let is_dir = entry.file_type().is_ok_and(|kind| kind.is_dir());
            let result = if is_dir {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match result {
                Ok(()) => removed += 1,
                Err(err) => debug!(path = %path.display(), error = %err, "staging entry kept"),
            }
        }
        removed
    }

    pub fn dataset_dir(&self, request: &SplitRequest) -> Utf8PathBuf {
        self.root.join(request.config_name())
    }

    pub fn archive_path(&self, request: &SplitRequest, format: CompressionFormat) -> Utf8PathBuf {
        self.root
            .join(format!("{}{}", request.config_name(), format.extension()))
    }

    /// The folder or archive that marks `request` as already processed, if any.
    pub fn existing_output(&self, request: &SplitRequest) -> Option<Utf8PathBuf> {
        let dir = self.dataset_dir(request);
        if dir.as_std_path().exists() {
            return Some(dir);
        }
        CompressionFormat::ALL
            .iter()
            .map(|format| self.archive_path(request, *format))
            .find(|path| path.as_std_path().exists())
    }

    /// Serializes a fetched split into its dataset folder.
    ///
    /// The folder is assembled next to its final location and renamed into
    /// place once every file is written, so an existing folder is always complete.
    pub fn save_split(
        &self,
        request: &SplitRequest,
        fetched: &FetchedSplit,
    ) -> Result<Utf8PathBuf, ReviewsError> {
        self.ensure_root()?;
        let dest = self.dataset_dir(request);
        let temp_dir = Builder::new()
            .prefix(&format!(".{}", request.config_name()))
            .tempdir_in(self.root.as_std_path())
            .map_err(|err| ReviewsError::Filesystem(err.to_string()))?;
        let staging = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf())
            .map_err(|_| ReviewsError::Filesystem("invalid temp dir".to_string()))?;

        let split_dir = staging.join(SPLIT_NAME);
        fs::create_dir_all(split_dir.as_std_path())
            .map_err(|err| ReviewsError::Filesystem(err.to_string()))?;
        let (num_bytes, num_rows) =
            copy_counting_rows(&fetched.data_file, split_dir.join(DATA_FILE_NAME).as_std_path())
                .map_err(|err| ReviewsError::Filesystem(err.to_string()))?;

        let info = DatasetInfo {
            dataset: DATASET_ID.to_string(),
            config_name: fetched.config_name.clone(),
            split: SPLIT_NAME.to_string(),
            category: request.category.to_string(),
            dataset_type: request.dataset_type.to_string(),
            source_url: fetched.source_url.clone(),
            num_bytes,
            num_rows,
            downloaded_at: chrono::Utc::now().to_rfc3339(),
            tool: format!("amazon-reviews/{}", env!("CARGO_PKG_VERSION")),
        };
        Self::write_json_atomic(&split_dir.join("dataset_info.json"), &info)?;
        Self::write_json_atomic(
            &staging.join("dataset_dict.json"),
            &DatasetDict {
                splits: vec![SPLIT_NAME.to_string()],
            },
        )?;

        let staged = temp_dir.keep();
        atomic_rename_dir(&staged, dest.as_std_path())
            .map_err(|err| ReviewsError::Filesystem(err.to_string()))?;
        Ok(dest)
    }

    pub fn write_json_atomic<T: Serialize>(path: &Utf8Path, value: &T) -> Result<(), ReviewsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| ReviewsError::Filesystem(err.to_string()))?;
        }
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(value)
            .map_err(|err| ReviewsError::Filesystem(err.to_string()))?;
        fs::write(tmp_path.as_std_path(), &content)
            .map_err(|err| ReviewsError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| ReviewsError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn read_info(dataset_dir: &Utf8Path) -> Result<DatasetInfo, ReviewsError> {
        let path = dataset_dir.join(SPLIT_NAME).join("dataset_info.json");
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| ReviewsError::Filesystem(format!("read {path}: {err}")))?;
        serde_json::from_str(&content).map_err(|err| ReviewsError::Filesystem(err.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub dataset: String,
    pub config_name: String,
    pub split: String,
    pub category: String,
    pub dataset_type: String,
    pub source_url: String,
    pub num_bytes: u64,
    pub num_rows: u64,
    pub downloaded_at: String,
    pub tool: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatasetDict {
    splits: Vec<String>,
}

fn copy_counting_rows(source: &Path, dest: &Path) -> io::Result<(u64, u64)> {
    let mut reader = BufReader::new(File::open(source)?);
    let mut writer = BufWriter::new(File::create(dest)?);
    let mut bytes = 0u64;
    let mut rows = 0u64;
    let mut line = Vec::new();
    loop {
        line.clear();
        let read = reader.read_until(b'\n', &mut line)?;
        if read == 0 {
            break;
        }
        if line.iter().any(|byte| !byte.is_ascii_whitespace()) {
            rows += 1;
        }
        bytes += read as u64;
        writer.write_all(&line)?;
    }
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok((bytes, rows))
}

pub fn atomic_rename_dir(from: &Path, to: &Path) -> io::Result<()> {
    if to.exists() {
        fs::remove_dir_all(to)?;
    }
    fs::rename(from, to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DatasetType;

    fn request(kind: DatasetType) -> SplitRequest {
        SplitRequest::new(kind, "Gift_Cards".parse().unwrap())
    }

    #[test]
    fn layout_paths() {
        let store = OutputStore::new(Path::new("/out")).unwrap();
        let review = request(DatasetType::Review);
        assert_eq!(store.dataset_dir(&review), "/out/raw_review_Gift_Cards");
        assert_eq!(
            store.archive_path(&review, CompressionFormat::Bz2),
            "/out/raw_review_Gift_Cards.tar.bz2"
        );
    }

    #[test]
    fn existing_output_sees_folder_and_every_archive() {
        let temp = tempfile::tempdir().unwrap();
        let store = OutputStore::new(temp.path()).unwrap();
        let meta = request(DatasetType::Meta);
        assert!(store.existing_output(&meta).is_none());

        for format in CompressionFormat::ALL {
            let archive = store.archive_path(&meta, format);
            fs::write(archive.as_std_path(), b"x").unwrap();
            assert_eq!(store.existing_output(&meta), Some(archive.clone()));
            fs::remove_file(archive.as_std_path()).unwrap();
        }

        fs::create_dir_all(store.dataset_dir(&meta).as_std_path()).unwrap();
        assert_eq!(store.existing_output(&meta), Some(store.dataset_dir(&meta)));
    }

    #[test]
    fn save_split_writes_complete_folder() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("download.jsonl");
        fs::write(&source, b"{\"rating\": 5}\n{\"rating\": 3}\n\n").unwrap();
        let store = OutputStore::new(&temp.path().join("out")).unwrap();
        let review = request(DatasetType::Review);
        let fetched = FetchedSplit {
            config_name: review.config_name(),
            data_file: source,
            source_url: "http://hub/file.jsonl".to_string(),
        };

        let dir = store.save_split(&review, &fetched).unwrap();
        let data = fs::read(dir.join(SPLIT_NAME).join(DATA_FILE_NAME).as_std_path()).unwrap();
        assert_eq!(data, b"{\"rating\": 5}\n{\"rating\": 3}\n\n");
        assert!(dir.join("dataset_dict.json").as_std_path().exists());

        let info = OutputStore::read_info(&dir).unwrap();
        assert_eq!(info.num_rows, 2);
        assert_eq!(info.config_name, "raw_review_Gift_Cards");
        assert_eq!(info.dataset, DATASET_ID);

        let leftovers = fs::read_dir(store.root().as_std_path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with('.'))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn sweep_removes_only_staging_leftovers() {
        let temp = tempfile::tempdir().unwrap();
        let store = OutputStore::new(temp.path()).unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join(".raw_review_Books1a2b").join(SPLIT_NAME)).unwrap();
        fs::write(root.join(".raw_meta_BooksXyZ.partial"), b"half").unwrap();
        fs::create_dir_all(root.join("raw_review_Software")).unwrap();
        fs::write(root.join("raw_meta_Software.tar.gz"), b"done").unwrap();
        fs::write(root.join(".keep"), b"").unwrap();

        assert_eq!(store.sweep_staging(), 2);
        assert!(!root.join(".raw_review_Books1a2b").exists());
        assert!(!root.join(".raw_meta_BooksXyZ.partial").exists());
        assert!(root.join("raw_review_Software").is_dir());
        assert!(root.join("raw_meta_Software.tar.gz").is_file());
        assert!(root.join(".keep").exists());
    }
}
