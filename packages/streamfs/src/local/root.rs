//! Root directories for local wrappers.

use std::fs::DirBuilder;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::ContentConfig;
use crate::file_api::DEFAULT_DIR_MODE;
use crate::Error;

/// Supplies the native directory a local wrapper resolves targets under.
///
/// This is the only thing a concrete local wrapper has to provide.
pub trait WrapperRoot: Send + Sync {
    /// The root directory. May create it on first use.
    fn root(&self) -> Result<PathBuf, Error>;

    /// Public URL for a target under this root.
    fn web_url(&self, target: &str) -> Result<String, Error> {
        let _ = target;
        Err(Error::NotSupported {
            operation: "web_accessible_url",
        })
    }
}

/// A root at a fixed native path. The directory is never created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedRoot {
    path: PathBuf,
}

impl FixedRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WrapperRoot for FixedRoot {
    fn root(&self) -> Result<PathBuf, Error> {
        Ok(self.path.clone())
    }
}

/// A root inside the content directory, optionally in a named
/// subdirectory that is created the first time the root is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRoot {
    config: ContentConfig,
    subdir: Option<String>,
}

impl ContentRoot {
    pub fn new(config: ContentConfig) -> Self {
        Self {
            config,
            subdir: None,
        }
    }

    /// Scope this root to `content_dir/name`.
    pub fn subdir(mut self, name: impl Into<String>) -> Self {
        let name = streamfs_uri::clean_target(&name.into());
        self.subdir = if name.is_empty() { None } else { Some(name) };
        self
    }

    pub fn config(&self) -> &ContentConfig {
        &self.config
    }

    fn relative(&self, target: &str) -> String {
        match (&self.subdir, target.is_empty()) {
            (Some(subdir), false) => format!("{}/{}", subdir, target),
            (Some(subdir), true) => subdir.clone(),
            (None, _) => target.to_string(),
        }
    }
}

impl Default for ContentRoot {
    fn default() -> Self {
        Self::new(ContentConfig::global().clone())
    }
}

impl WrapperRoot for ContentRoot {
    fn root(&self) -> Result<PathBuf, Error> {
        let root = match &self.subdir {
            Some(subdir) => self.config.content_dir().join(subdir),
            None => self.config.content_dir().to_path_buf(),
        };

        if !root.is_dir() {
            log::debug!("Creating wrapper root {}", root.display());
            create_root(&root).map_err(|e| {
                log::warn!("Unable to create wrapper root {}: {}", root.display(), e);
                Error::io(&root, e)
            })?;
        }

        Ok(root)
    }

    fn web_url(&self, target: &str) -> Result<String, Error> {
        Ok(self.config.content_url(&self.relative(target)))
    }
}

/// Create `root` and any missing parents. The root itself gets
/// [`DEFAULT_DIR_MODE`] regardless of the umask.
fn create_root(root: &Path) -> io::Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DEFAULT_DIR_MODE);
    }
    builder.create(root)?;

    #[cfg(unix)]
    {
        use std::fs::{set_permissions, Permissions};
        use std::os::unix::fs::PermissionsExt;
        set_permissions(root, Permissions::from_mode(DEFAULT_DIR_MODE))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn fixed_root_is_not_created() {
        let root = FixedRoot::new("/definitely/not/here");
        assert_eq!(root.root().unwrap(), PathBuf::from("/definitely/not/here"));
        assert!(root.web_url("a.txt").unwrap_err().is_not_supported());
    }

    #[test]
    fn content_root_creates_subdir_lazily() {
        let temp = TempDir::new().unwrap();
        let root = ContentRoot::new(ContentConfig::new(temp.path(), "https://example.com/c"))
            .subdir("stream_tests");

        let expected = temp.path().join("stream_tests");
        assert!(!expected.exists());
        assert_eq!(root.root().unwrap(), expected);
        assert!(expected.is_dir());
        // Second resolution finds it in place.
        assert_eq!(root.root().unwrap(), expected);
    }

    #[cfg(unix)]
    #[test]
    fn content_root_is_created_with_default_dir_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let root = ContentRoot::new(ContentConfig::new(temp.path(), "https://example.com/c"))
            .subdir("uploads");

        let created = root.root().unwrap();
        let mode = std::fs::metadata(&created).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, DEFAULT_DIR_MODE);
    }

    #[test]
    fn content_root_web_urls() {
        let config = ContentConfig::new("/srv/content", "https://example.com/c");
        let plain = ContentRoot::new(config.clone());
        assert_eq!(
            plain.web_url("testfile.txt").unwrap(),
            "https://example.com/c/testfile.txt"
        );

        let scoped = ContentRoot::new(config).subdir("/stream_tests/");
        assert_eq!(
            scoped.web_url("dir\\testfile.txt").unwrap(),
            "https://example.com/c/stream_tests/dir/testfile.txt"
        );
        assert_eq!(
            scoped.web_url("").unwrap(),
            "https://example.com/c/stream_tests"
        );
    }

    #[test]
    fn content_root_reports_uncreatable_root() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let root = ContentRoot::new(ContentConfig::new(&blocker, "https://example.com"))
            .subdir("inner");
        assert!(matches!(root.root(), Err(Error::Io { .. })));
    }
}
