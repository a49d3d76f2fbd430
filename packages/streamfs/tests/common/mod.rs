#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use streamfs::local::{ContentRoot, FixedRoot, LocalStreamWrapper};
use streamfs::{get_registry, ContentConfig, WrapperDescriptor};
use tempfile::TempDir;

static NEXT_SCHEME: AtomicU64 = AtomicU64::new(0);

/// A scheme registered for one test, rooted in a scratch directory and
/// unregistered on drop.
pub struct TestScheme {
    pub scheme: String,
    pub dir: TempDir,
}

impl TestScheme {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let scheme = next_scheme();
        let root = dir.path().to_path_buf();

        get_registry()
            .register(
                &scheme,
                WrapperDescriptor::new("Test Wrapper", "Scratch files for one test.", move || {
                    LocalStreamWrapper::new(FixedRoot::new(root.clone()))
                }),
            )
            .unwrap();

        Self { scheme, dir }
    }

    /// A content-directory scheme with a public URL, scoped to `subdir`.
    pub fn content(url: &str, subdir: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let scheme = next_scheme();
        let root = ContentRoot::new(ContentConfig::new(dir.path(), url)).subdir(subdir);

        get_registry()
            .register(
                &scheme,
                WrapperDescriptor::new("Content Test Wrapper", "", move || {
                    LocalStreamWrapper::new(root.clone())
                }),
            )
            .unwrap();

        Self { scheme, dir }
    }

    pub fn uri(&self, target: &str) -> String {
        format!("{}://{}", self.scheme, target)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

impl Drop for TestScheme {
    fn drop(&mut self) {
        get_registry().unregister(&self.scheme);
    }
}

fn next_scheme() -> String {
    format!("test{}", NEXT_SCHEME.fetch_add(1, Ordering::SeqCst))
}
