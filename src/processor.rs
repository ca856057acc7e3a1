use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::archive;
use crate::domain::{CompressionSettings, SplitRequest};
use crate::error::ReviewsError;
use crate::hub::HubClient;
use crate::store::OutputStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ProcessAction {
    Skipped,
    Downloaded,
    Compressed { format: String, level: u32 },
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    pub config_name: String,
    #[serde(flatten)]
    pub action: ProcessAction,
    pub path: String,
}

impl fmt::Display for ProcessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            ProcessAction::Skipped => write!(f, "[SKIP] {} already exists", self.config_name),
            ProcessAction::Downloaded => write!(f, "[DONE] {} downloaded", self.config_name),
            ProcessAction::Compressed { format, level } => write!(
                f,
                "[DONE] {} downloaded and compressed with {} level {}",
                self.config_name,
                format.to_uppercase(),
                level
            ),
        }
    }
}

/// Fetches one `(type, category)` split and materializes it under the output store.
pub struct DatasetProcessor<'a, H: HubClient> {
    hub: &'a H,
    store: &'a OutputStore,
    cache_dir: &'a Path,
}

impl<'a, H: HubClient> DatasetProcessor<'a, H> {
    pub fn new(hub: &'a H, store: &'a OutputStore, cache_dir: &'a Path) -> Self {
        Self {
            hub,
            store,
            cache_dir,
        }
    }

    /// Skips when the folder or any archive variant already exists; errors propagate unchanged.
    pub fn process(
        &self,
        request: &SplitRequest,
        compression: Option<CompressionSettings>,
    ) -> Result<ProcessOutcome, ReviewsError> {
        let config_name = request.config_name();
        if let Some(existing) = self.store.existing_output(request) {
            return Ok(ProcessOutcome {
                config_name,
                action: ProcessAction::Skipped,
                path: existing.to_string(),
            });
        }

        let fetched = self.hub.fetch_split(request, self.cache_dir)?;
        let dataset_dir = self.store.save_split(request, &fetched)?;

        let Some(settings) = compression else {
            return Ok(ProcessOutcome {
                config_name,
                action: ProcessAction::Downloaded,
                path: dataset_dir.to_string(),
            });
        };

        let archive_path = archive::compress_folder(
            dataset_dir.as_std_path(),
            settings.format,
            settings.level.get(),
        )?;
        Ok(ProcessOutcome {
            config_name,
            action: ProcessAction::Compressed {
                format: settings.format.to_string(),
                level: settings.level.get(),
            },
            path: archive_path.display().to_string(),
        })
    }
}
