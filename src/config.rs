use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::{CompressionFormat, CompressionLevel};
use crate::error::ReviewsError;

pub const DEFAULT_CONFIG_FILE: &str = "amazon-reviews.json";
pub const DEFAULT_BASE_PATH: &str = "Amazon_Reviews_2023";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub base_path: Option<PathBuf>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub compress: Option<bool>,
    #[serde(default)]
    pub compression_format: Option<String>,
    #[serde(default)]
    pub compression_level: Option<u32>,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

/// Config file values after format parsing; unset keys stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub base_path: Option<PathBuf>,
    pub categories: Option<Vec<String>>,
    pub compress: Option<bool>,
    pub compression_format: Option<CompressionFormat>,
    pub compression_level: Option<u32>,
    pub cache_dir: Option<PathBuf>,
}

/// Values given on the command line. They win over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_path: Option<PathBuf>,
    pub categories: Vec<String>,
    pub compress: bool,
    pub compression_format: Option<CompressionFormat>,
    pub compression_level: Option<u32>,
    pub cache_dir: Option<PathBuf>,
}

/// Fully merged download settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_path: PathBuf,
    pub categories: Option<Vec<String>>,
    pub compress: bool,
    pub compression_format: CompressionFormat,
    pub compression_level: u32,
    pub cache_dir: Option<PathBuf>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `amazon-reviews.json` in the working directory if it exists.
    pub fn resolve(path: Option<&str>) -> Result<Option<ResolvedConfig>, ReviewsError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ReviewsError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| ReviewsError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config).map(Some)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, ReviewsError> {
        let compression_format = config
            .compression_format
            .as_deref()
            .map(str::parse::<CompressionFormat>)
            .transpose()?;

        Ok(ResolvedConfig {
            base_path: config.base_path,
            categories: config.categories,
            compress: config.compress,
            compression_format,
            compression_level: config.compression_level,
            cache_dir: config.cache_dir,
        })
    }
}

/// Command line over config file over defaults.
pub fn merge(config: Option<ResolvedConfig>, overrides: Overrides) -> Settings {
    let config = config.unwrap_or_default();
    let categories = if overrides.categories.is_empty() {
        config.categories
    } else {
        Some(overrides.categories)
    };

    Settings {
        base_path: overrides
            .base_path
            .or(config.base_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_PATH)),
        categories,
        compress: overrides.compress || config.compress.unwrap_or(false),
        compression_format: overrides
            .compression_format
            .or(config.compression_format)
            .unwrap_or_default(),
        compression_level: overrides
            .compression_level
            .or(config.compression_level)
            .unwrap_or(CompressionLevel::DEFAULT),
        cache_dir: overrides.cache_dir.or(config.cache_dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_config() {
        let settings = merge(None, Overrides::default());
        assert_eq!(settings.base_path, PathBuf::from(DEFAULT_BASE_PATH));
        assert_eq!(settings.categories, None);
        assert!(!settings.compress);
        assert_eq!(settings.compression_format, CompressionFormat::Gz);
        assert_eq!(settings.compression_level, 6);
        assert_eq!(settings.cache_dir, None);
    }

    #[test]
    fn command_line_wins() {
        let config = ResolvedConfig {
            base_path: Some(PathBuf::from("from_file")),
            categories: Some(vec!["Books".to_string()]),
            compress: Some(true),
            compression_format: Some(CompressionFormat::Xz),
            compression_level: Some(3),
            cache_dir: Some(PathBuf::from("/file/cache")),
        };
        let overrides = Overrides {
            categories: vec!["Software".to_string()],
            compression_level: Some(9),
            ..Overrides::default()
        };

        let settings = merge(Some(config), overrides);
        assert_eq!(settings.base_path, PathBuf::from("from_file"));
        assert_eq!(settings.categories, Some(vec!["Software".to_string()]));
        assert!(settings.compress);
        assert_eq!(settings.compression_format, CompressionFormat::Xz);
        assert_eq!(settings.compression_level, 9);
        assert_eq!(settings.cache_dir, Some(PathBuf::from("/file/cache")));
    }
}
