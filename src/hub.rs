use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::domain::SplitRequest;
use crate::error::ReviewsError;

pub const DATASET_ID: &str = "McAuley-Lab/Amazon-Reviews-2023";
pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";
pub const DEFAULT_REVISION: &str = "main";

/// A split that has been downloaded into the cache directory.
#[derive(Debug, Clone)]
pub struct FetchedSplit {
    pub config_name: String,
    pub data_file: PathBuf,
    pub source_url: String,
}

pub trait HubClient: Send + Sync {
    fn fetch_split(
        &self,
        request: &SplitRequest,
        cache_dir: &Path,
    ) -> Result<FetchedSplit, ReviewsError>;
}

#[derive(Clone)]
pub struct HubHttpClient {
    client: Client,
    endpoint: String,
    revision: String,
}

impl HubHttpClient {
    pub fn new() -> Result<Self, ReviewsError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("amazon-reviews/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ReviewsError::HubHttp(err.to_string()))?,
        );

        if let Ok(token) = std::env::var("HF_TOKEN") {
            if !token.trim().is_empty() {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                    .map_err(|err| ReviewsError::HubHttp(err.to_string()))?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
        }

        // Large splits stream for a long time; only the transport's own limits apply.
        let client = Client::builder()
            .default_headers(headers)
            .timeout(None::<Duration>)
            .build()
            .map_err(|err| ReviewsError::HubHttp(err.to_string()))?;

        let endpoint = std::env::var("HF_ENDPOINT")
            .ok()
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        Ok(Self {
            client,
            endpoint,
            revision: DEFAULT_REVISION.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn file_url(&self, request: &SplitRequest) -> String {
        split_url(&self.endpoint, &self.revision, request)
    }

    fn write_response_to_file(
        &self,
        mut response: reqwest::blocking::Response,
        destination: &Path,
    ) -> Result<(), ReviewsError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "hub request failed".to_string());
            return Err(ReviewsError::HubStatus { status, message });
        }
        let mut file =
            File::create(destination).map_err(|err| ReviewsError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| ReviewsError::HubHttp(err.to_string()))?;
        file.sync_all()
            .map_err(|err| ReviewsError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

impl HubClient for HubHttpClient {
    fn fetch_split(
        &self,
        request: &SplitRequest,
        cache_dir: &Path,
    ) -> Result<FetchedSplit, ReviewsError> {
        let config_name = request.config_name();
        let url = self.file_url(request);
        let data_file = cached_split_path(cache_dir, request);

        if data_file.exists() {
            debug!(config = %config_name, path = %data_file.display(), "reusing cached split");
            return Ok(FetchedSplit {
                config_name,
                data_file,
                source_url: url,
            });
        }

        let downloads = data_file
            .parent()
            .ok_or_else(|| ReviewsError::Filesystem("invalid cache path".to_string()))?;
        fs::create_dir_all(downloads).map_err(|err| ReviewsError::Filesystem(err.to_string()))?;

        let incomplete = data_file.with_extension("jsonl.incomplete");
        debug!(config = %config_name, url = %url, "downloading split");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| ReviewsError::HubHttp(err.to_string()))?;
        if let Err(err) = self.write_response_to_file(response, &incomplete) {
            let _ = fs::remove_file(&incomplete);
            return Err(err);
        }
        fs::rename(&incomplete, &data_file)
            .map_err(|err| ReviewsError::Filesystem(err.to_string()))?;

        Ok(FetchedSplit {
            config_name,
            data_file,
            source_url: url,
        })
    }
}

pub fn split_url(endpoint: &str, revision: &str, request: &SplitRequest) -> String {
    format!(
        "{}/datasets/{}/resolve/{}/{}",
        endpoint,
        DATASET_ID,
        revision,
        request.remote_path()
    )
}

/// Where a split's download lives inside the cache directory.
pub fn cached_split_path(cache_dir: &Path, request: &SplitRequest) -> PathBuf {
    cache_dir
        .join("downloads")
        .join(DATASET_ID.replace('/', "___"))
        .join(format!("{}.jsonl", request.config_name()))
}
