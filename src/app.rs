use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::cache::CacheCleanup;
use crate::domain::{
    Category, CompressionFormat, CompressionLevel, CompressionSettings, DatasetType, SplitRequest,
};
use crate::error::ReviewsError;
use crate::fs_util;
use crate::hub::HubClient;
use crate::processor::{DatasetProcessor, ProcessOutcome};
use crate::store::OutputStore;

#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub base_path: PathBuf,
    /// `None` means every registry category.
    pub categories: Option<Vec<String>>,
    pub compress: bool,
    pub compression_format: CompressionFormat,
    pub compression_level: u32,
}

impl BatchRequest {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            categories: None,
            compress: false,
            compression_format: CompressionFormat::default(),
            compression_level: CompressionLevel::DEFAULT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub category: Category,
    pub status: CategoryStatus,
    pub items: Vec<ProcessOutcome>,
    pub error: Option<String>,
    pub cache_cleanup: CacheCleanup,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub base_path: String,
    pub cache_dir: String,
    pub total: usize,
    pub categories: Vec<CategoryReport>,
}

impl BatchReport {
    pub fn successful(&self) -> impl Iterator<Item = &CategoryReport> {
        self.categories
            .iter()
            .filter(|report| report.status == CategoryStatus::Success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &CategoryReport> {
        self.categories
            .iter()
            .filter(|report| report.status == CategoryStatus::Failed)
    }

    pub fn summary_lines(&self) -> Vec<String> {
        let failed: Vec<&CategoryReport> = self.failed().collect();
        let mut lines = vec![format!(
            "Successfully processed: {}/{} categories",
            self.successful().count(),
            self.total
        )];
        if !failed.is_empty() {
            lines.push(format!("Failed: {}/{} categories", failed.len(), self.total));
            for report in failed {
                lines.push(format!(
                    "  - {}: {}",
                    report.category,
                    report.error.as_deref().unwrap_or("unknown error")
                ));
            }
        }
        lines
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Info,
    Warning,
    Success,
    Failure,
    CategoryStarted { index: usize, total: usize },
    CategoryFinished { ok: bool },
    Item,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub kind: EventKind,
    pub category: Option<String>,
    pub message: String,
    pub elapsed: Option<Duration>,
}

impl ProgressEvent {
    fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            category: None,
            message: message.into(),
            elapsed: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(EventKind::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(EventKind::Warning, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(EventKind::Success, message)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(EventKind::Failure, message)
    }

    fn for_category(mut self, category: Category) -> Self {
        self.category = Some(category.to_string());
        self
    }

    fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = Some(elapsed);
        self
    }
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Runs batches of category downloads against one hub and one cache directory.
#[derive(Clone)]
pub struct App<H: HubClient> {
    hub: H,
    cache_dir: PathBuf,
}

impl<H: HubClient> App<H> {
    pub fn new(hub: H, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            hub,
            cache_dir: cache_dir.into(),
        }
    }

    pub fn hub(&self) -> &H {
        &self.hub
    }

    pub fn cache_dir(&self) -> &std::path::Path {
        &self.cache_dir
    }

    pub fn run(
        &self,
        request: BatchRequest,
        sink: &dyn ProgressSink,
    ) -> Result<BatchReport, ReviewsError> {
        let categories = match &request.categories {
            None => Category::all(),
            Some(names) => Category::parse_all(names)?,
        };
        let level = CompressionLevel::new(request.compression_level)?;
        let compression = request.compress.then_some(CompressionSettings {
            format: request.compression_format,
            level,
        });

        let base_path = fs_util::absolutize(&request.base_path)?;
        let cache_dir = fs_util::absolutize(&self.cache_dir)?;
        if fs_util::paths_overlap(&base_path, &cache_dir) {
            return Err(ReviewsError::PathConflict {
                base: base_path,
                cache: cache_dir,
            });
        }

        let store = OutputStore::new(&base_path)?;
        store.ensure_root()?;
        let swept = store.sweep_staging();
        if swept > 0 {
            sink.event(ProgressEvent::warning(format!(
                "Removed {swept} leftover staging entries from an interrupted run"
            )));
        }
        let processor = DatasetProcessor::new(&self.hub, &store, &cache_dir);

        if let Some(settings) = compression {
            sink.event(ProgressEvent::info(format!(
                "Using {} compression at level {}",
                settings.format.as_str().to_uppercase(),
                settings.level
            )));
            sink.event(ProgressEvent::info(format!(
                "Compression speed: {}",
                settings.level.speed_label()
            )));
            sink.event(ProgressEvent::info(format!(
                "Compression ratio: {}",
                settings.level.ratio_label()
            )));
        }

        let total = categories.len();
        let mut reports = Vec::with_capacity(total);
        for (index, category) in categories.into_iter().enumerate() {
            sink.event(
                ProgressEvent::new(
                    EventKind::CategoryStarted { index, total },
                    format!("Processing {category}"),
                )
                .for_category(category),
            );
            let started = Instant::now();
            let mut items = Vec::with_capacity(DatasetType::ALL.len());
            let outcome = DatasetType::ALL.iter().try_for_each(|dataset_type| {
                let split = SplitRequest::new(*dataset_type, category);
                let item = processor.process(&split, compression)?;
                sink.event(
                    ProgressEvent::new(EventKind::Item, item.to_string()).for_category(category),
                );
                items.push(item);
                Ok::<(), ReviewsError>(())
            });

            let (status, error) = match outcome {
                Ok(()) => (CategoryStatus::Success, None),
                Err(err) => {
                    sink.event(
                        ProgressEvent::failure(format!(
                            "Failed to process category '{category}': {err}"
                        ))
                        .for_category(category),
                    );
                    (CategoryStatus::Failed, Some(err.to_string()))
                }
            };
            sink.event(
                ProgressEvent::new(
                    EventKind::CategoryFinished {
                        ok: status == CategoryStatus::Success,
                    },
                    format!("Finished {category}"),
                )
                .for_category(category)
                .with_elapsed(started.elapsed()),
            );

            let cache_cleanup = purge_cache(&cache_dir, sink);
            reports.push(CategoryReport {
                category,
                status,
                items,
                error,
                cache_cleanup,
            });
        }

        let report = BatchReport {
            base_path: base_path.display().to_string(),
            cache_dir: cache_dir.display().to_string(),
            total,
            categories: reports,
        };
        sink.event(ProgressEvent::info("Download summary:"));
        for line in report.summary_lines() {
            sink.event(ProgressEvent::info(line));
        }
        Ok(report)
    }
}

/// Per-category purge. Silent unless some entries could not be removed.
fn purge_cache(cache_dir: &std::path::Path, sink: &dyn ProgressSink) -> CacheCleanup {
    let path = cache_dir.display().to_string();
    if !cache_dir.exists() {
        return CacheCleanup {
            path,
            existed: false,
            removed: false,
            suppressed_errors: 0,
        };
    }
    let suppressed_errors = fs_util::remove_dir_all_best_effort(cache_dir);
    if suppressed_errors > 0 {
        sink.event(ProgressEvent::warning(format!(
            "Cache directory partially deleted; {suppressed_errors} entries could not be removed"
        )));
    }
    CacheCleanup {
        path,
        existed: true,
        removed: !cache_dir.exists(),
        suppressed_errors,
    }
}
