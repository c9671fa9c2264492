//! TOML-backed configuration file.
//!
//! Every field is optional; values given on the command line win.
//!
//! ```toml
//! output = "/srv/mirror"
//! url = "https://example.com/Books/"
//! mode = "only"
//! names = ["Comics"]
//! ignored_types = ["pdf", ".zip"]
//! concurrency = 8
//! layout = "list"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use super::{ConfigError, CrawlConfigBuilder, DownloadMode};
use crate::listing::ListingLayout;

/// Mode selector as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeSetting {
    /// Mirror everything.
    All,
    /// Treat `names` as folders to skip.
    Exclude,
    /// Treat `names` as the only folders to mirror.
    Only,
}

/// File configuration for crawl defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Local mirror root.
    pub output: Option<PathBuf>,
    /// Remote listing root.
    pub url: Option<String>,
    /// How `names` is applied.
    pub mode: Option<ModeSetting>,
    /// Folder names for the exclude/only modes.
    #[serde(default)]
    pub names: Vec<String>,
    /// File-name substrings to skip.
    #[serde(default)]
    pub ignored_types: Vec<String>,
    /// Concurrent downloads per directory.
    pub concurrency: Option<usize>,
    /// Listing markup strategy.
    pub layout: Option<ListingLayout>,
}

impl FileConfig {
    /// Loads and parses a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), ?config, "loaded config file");
        Ok(config)
    }

    /// Returns the download mode described by `mode` + `names`, if any.
    #[must_use]
    pub fn download_mode(&self) -> Option<DownloadMode> {
        match self.mode? {
            ModeSetting::All => Some(DownloadMode::All),
            ModeSetting::Exclude => Some(DownloadMode::Exclude(self.names.clone())),
            ModeSetting::Only => Some(DownloadMode::OnlyInclude(self.names.clone())),
        }
    }

    /// Seeds a builder with every value present in the file.
    #[must_use]
    pub fn apply(&self, mut builder: CrawlConfigBuilder) -> CrawlConfigBuilder {
        if let Some(output) = &self.output {
            builder = builder.base_path(output.to_string_lossy());
        }
        if let Some(url) = &self.url {
            builder = builder.root_url(url.clone());
        }
        if let Some(mode) = self.download_mode() {
            builder = builder.mode(mode);
        }
        if !self.ignored_types.is_empty() {
            builder = builder.ignored_types(self.ignored_types.clone());
        }
        if let Some(concurrency) = self.concurrency {
            builder = builder.max_concurrency(concurrency);
        }
        if let Some(layout) = self.layout {
            builder = builder.layout(layout);
        }
        builder
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::CrawlConfig;
    use tempfile::TempDir;

    #[test]
    fn test_full_file_applies_to_builder() {
        let file: FileConfig = toml::from_str(
            r#"
            output = "/srv/mirror"
            url = "https://example.com/Books/"
            mode = "only"
            names = ["Comics", "Maps"]
            ignored_types = ["pdf"]
            concurrency = 8
            layout = "litem-table"
            "#,
        )
        .unwrap();

        let config = file.apply(CrawlConfig::builder()).build().unwrap();
        assert_eq!(config.base_path(), Path::new("/srv/mirror"));
        assert_eq!(config.root_url(), "https://example.com/Books/");
        assert_eq!(
            config.only_included_names(),
            ["Comics".to_string(), "Maps".to_string()]
        );
        assert_eq!(config.ignored_types(), ["pdf".to_string()]);
        assert_eq!(config.max_concurrency(), 8);
        assert_eq!(config.layout(), ListingLayout::LitemTable);
    }

    #[test]
    fn test_empty_file_is_default() {
        let file: FileConfig = toml::from_str("").unwrap();
        assert_eq!(file, FileConfig::default());
        assert_eq!(file.download_mode(), None);
    }

    #[test]
    fn test_exclude_mode_from_file() {
        let file: FileConfig = toml::from_str("mode = \"exclude\"\nnames = [\"Art\"]").unwrap();
        assert_eq!(
            file.download_mode(),
            Some(DownloadMode::Exclude(vec!["Art".to_string()]))
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<FileConfig, _> = toml::from_str("parallel = 3");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_reports_missing_and_invalid_files() {
        let temp = TempDir::new().unwrap();

        let missing = temp.path().join("missing.toml");
        assert!(matches!(
            FileConfig::load(&missing),
            Err(ConfigError::Read { .. })
        ));

        let invalid = temp.path().join("invalid.toml");
        std::fs::write(&invalid, "concurrency = \"many\"").unwrap();
        assert!(matches!(
            FileConfig::load(&invalid),
            Err(ConfigError::Parse { .. })
        ));

        let valid = temp.path().join("valid.toml");
        std::fs::write(&valid, "concurrency = 3").unwrap();
        assert_eq!(FileConfig::load(&valid).unwrap().concurrency, Some(3));
    }
}
