//! Content tree configuration.
//!
//! Scheme roots conventionally live under one content directory. Its native
//! location and its public URL prefix come from the environment:
//!
//! - `STREAMFS_CONTENT_DIR` - native content directory
//! - `STREAMFS_CONTENT_URL` - URL under which the content directory is served

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const CONTENT_DIR_ENV: &str = "STREAMFS_CONTENT_DIR";
pub const CONTENT_URL_ENV: &str = "STREAMFS_CONTENT_URL";

lazy_static::lazy_static! {
    static ref GLOBAL: ContentConfig = ContentConfig::from_env();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentConfig {
    pub content_dir: PathBuf,
    pub content_url: String,
}

impl ContentConfig {
    pub fn new(content_dir: impl Into<PathBuf>, content_url: impl Into<String>) -> Self {
        Self {
            content_dir: content_dir.into(),
            content_url: content_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build a config from the environment, falling back to the platform's
    /// local data directory.
    pub fn from_env() -> Self {
        let content_dir = std::env::var_os(CONTENT_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(default_content_dir);
        let content_url = std::env::var(CONTENT_URL_ENV)
            .unwrap_or_else(|_| format!("file://{}", content_dir.display()));

        log::debug!(
            "Content directory {} served at {}",
            content_dir.display(),
            content_url
        );
        Self::new(content_dir, content_url)
    }

    /// The process-wide config, read from the environment on first use.
    pub fn global() -> &'static ContentConfig {
        &GLOBAL
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// Public URL of `relative` inside the content tree.
    pub fn content_url(&self, relative: &str) -> String {
        let relative = relative.replace('\\', "/");
        let relative = relative.trim_start_matches('/');
        if relative.is_empty() {
            self.content_url.clone()
        } else {
            format!("{}/{}", self.content_url, relative)
        }
    }
}

fn default_content_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("streamfs")
        .join("content")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_url_joins_relative_paths() {
        let config = ContentConfig::new("/srv/content", "https://example.com/content/");
        assert_eq!(
            config.content_url("uploads/a.png"),
            "https://example.com/content/uploads/a.png"
        );
        assert_eq!(
            config.content_url("\\uploads\\a.png"),
            "https://example.com/content/uploads/a.png"
        );
        assert_eq!(config.content_url(""), "https://example.com/content");
    }

    #[test]
    fn default_dir_ends_in_content() {
        assert!(default_content_dir().ends_with("streamfs/content"));
    }

    #[test]
    fn config_serializes() {
        let config = ContentConfig::new("/srv/content", "https://example.com");
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["content_url"], "https://example.com");
        let back: ContentConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}
