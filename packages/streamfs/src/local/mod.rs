//! Local filesystem wrappers.
//!
//! [`LocalStreamWrapper`] implements the whole [`StreamWrapper`] contract for
//! any scheme whose files live under one native directory. A concrete
//! wrapper only supplies that directory through a [`WrapperRoot`]:
//!
//! ```rust,no_run
//! use streamfs::local::{FixedRoot, LocalStreamWrapper};
//! use streamfs::{get_registry, WrapperDescriptor};
//!
//! get_registry()
//!     .register(
//!         "uploads",
//!         WrapperDescriptor::new("Uploads", "User uploads.", || {
//!             LocalStreamWrapper::new(FixedRoot::new("/srv/uploads"))
//!         }),
//!     )
//!     .unwrap();
//! ```
//!
//! A target resolves to `root/target`. Nothing stops a target from naming
//! `..`; wrappers that need confinement must check targets themselves.

mod handle;
mod lock;
mod root;

use std::fs;
use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;

use crate::file_api::create_dir;
use crate::wrapper::{LockOperation, OpenMode, StreamOptions, StreamStat, StreamWrapper};
use crate::Error;

use handle::{DirHandle, FileHandle};

pub use root::{ContentRoot, FixedRoot, WrapperRoot};

/// The built-in wrapper over the content directory.
pub type ContentWrapper = LocalStreamWrapper<ContentRoot>;

/// Applies the report/suppress policy to a native result.
fn report<T>(
    options: StreamOptions,
    operation: &str,
    result: Result<T, Error>,
    quiet: T,
) -> Result<T, Error> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if options.report_errors => Err(e),
        Err(e) => {
            log::debug!("{} failed quietly: {}", operation, e);
            Ok(quiet)
        }
    }
}

/// A stream wrapper over a native directory tree.
pub struct LocalStreamWrapper<R> {
    root: R,
    uri: String,
    file: Option<FileHandle>,
    dir: Option<DirHandle>,
}

impl<R: WrapperRoot> LocalStreamWrapper<R> {
    pub fn new(root: R) -> Self {
        Self {
            root,
            uri: String::new(),
            file: None,
            dir: None,
        }
    }

    pub fn root(&self) -> &R {
        &self.root
    }

    /// The native directory this wrapper is responsible for.
    pub fn wrapper_path(&self) -> Result<PathBuf, Error> {
        self.root.root()
    }

    fn resolve(&self, uri: Option<&str>) -> Result<PathBuf, Error> {
        let uri = uri.unwrap_or(&self.uri);
        let target = streamfs_uri::target(uri).ok_or_else(|| Error::NotAUri {
            uri: uri.to_string(),
        })?;

        let root = self.root.root()?;
        let path = if target.is_empty() {
            root
        } else {
            root.join(target)
        };
        log::debug!("Resolved {} to {}", uri, path.display());
        Ok(path)
    }

    fn file(&self, operation: &'static str) -> Result<&FileHandle, Error> {
        self.file
            .as_ref()
            .ok_or(Error::InvalidState { operation })
    }

    fn file_mut(&mut self, operation: &'static str) -> Result<&mut FileHandle, Error> {
        self.file
            .as_mut()
            .ok_or(Error::InvalidState { operation })
    }

    fn dir_mut(&mut self, operation: &'static str) -> Result<&mut DirHandle, Error> {
        self.dir.as_mut().ok_or(Error::InvalidState { operation })
    }

    fn open_file(&self, mode: OpenMode, options: StreamOptions) -> Result<FileHandle, Error> {
        let path = self.resolve(None)?;

        if options.create_parents && mode.creates() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
        }

        FileHandle::open(&path, mode).map_err(|e| Error::io(&path, e))
    }

    fn make_dir(&self, mode: u32, recursive: bool) -> Result<bool, Error> {
        let path = self.resolve(None)?;
        create_dir(&path, mode, recursive).map_err(|e| Error::io(&path, e))?;
        Ok(true)
    }
}

impl<R: WrapperRoot> StreamWrapper for LocalStreamWrapper<R> {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn set_uri(&mut self, uri: &str) {
        self.uri = uri.to_string();
    }

    fn chmod(&mut self, mode: u32) -> Result<(), Error> {
        let path = self.realpath()?;

        #[cfg(unix)]
        let permissions = {
            use std::os::unix::fs::PermissionsExt;
            fs::Permissions::from_mode(mode)
        };
        #[cfg(not(unix))]
        let permissions = {
            let mut permissions = fs::metadata(&path)
                .map_err(|e| Error::io(&path, e))?
                .permissions();
            permissions.set_readonly(mode & 0o222 == 0);
            permissions
        };

        fs::set_permissions(&path, permissions).map_err(|e| Error::io(&path, e))
    }

    fn realpath(&self) -> Result<PathBuf, Error> {
        let path = self.resolve(None)?;
        fs::canonicalize(&path).map_err(|e| Error::io(&path, e))
    }

    fn web_accessible_url(&self) -> Result<String, Error> {
        let target = streamfs_uri::target(&self.uri).ok_or_else(|| Error::NotAUri {
            uri: self.uri.clone(),
        })?;
        self.root.web_url(target)
    }

    fn local_path(&self, uri: Option<&str>) -> Result<PathBuf, Error> {
        self.resolve(uri)
    }

    fn dir_open(&mut self, uri: &str, options: StreamOptions) -> Result<bool, Error> {
        self.uri = uri.to_string();
        let opened = self
            .resolve(None)
            .and_then(|path| DirHandle::open(&path).map_err(|e| Error::io(&path, e)));

        match report(options, "dir_open", opened.map(Some), None)? {
            Some(handle) => {
                self.dir = Some(handle);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn dir_read(&mut self) -> Result<Option<String>, Error> {
        Ok(self.dir_mut("dir_read")?.next_entry())
    }

    fn dir_rewind(&mut self) -> Result<(), Error> {
        let dir = self.dir_mut("dir_rewind")?;
        dir.rewind().map_err(|e| Error::io(&dir.path, e))
    }

    fn dir_close(&mut self) -> Result<(), Error> {
        self.dir
            .take()
            .map(drop)
            .ok_or(Error::InvalidState {
                operation: "dir_close",
            })
    }

    fn stream_open(
        &mut self,
        uri: &str,
        mode: OpenMode,
        options: StreamOptions,
    ) -> Result<bool, Error> {
        self.uri = uri.to_string();
        let opened = self.open_file(mode, options);

        match report(options, "stream_open", opened.map(Some), None)? {
            Some(handle) => {
                self.file = Some(handle);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn stream_read(&mut self, count: usize) -> Result<Vec<u8>, Error> {
        let handle = self.file_mut("stream_read")?;
        handle.read(count).map_err(|e| Error::io(&handle.path, e))
    }

    fn stream_write(&mut self, data: &[u8]) -> Result<usize, Error> {
        let handle = self.file_mut("stream_write")?;
        handle.write(data).map_err(|e| Error::io(&handle.path, e))
    }

    fn stream_seek(&mut self, pos: SeekFrom) -> Result<u64, Error> {
        let handle = self.file_mut("stream_seek")?;
        handle.seek(pos).map_err(|e| Error::io(&handle.path, e))
    }

    fn stream_tell(&mut self) -> Result<u64, Error> {
        let handle = self.file_mut("stream_tell")?;
        handle
            .file
            .stream_position()
            .map_err(|e| Error::io(&handle.path, e))
    }

    fn stream_eof(&self) -> Result<bool, Error> {
        Ok(self.file("stream_eof")?.eof)
    }

    fn stream_flush(&mut self) -> Result<(), Error> {
        let handle = self.file_mut("stream_flush")?;
        handle.file.flush().map_err(|e| Error::io(&handle.path, e))
    }

    fn stream_lock(&mut self, operation: LockOperation) -> Result<bool, Error> {
        let handle = self.file("stream_lock")?;
        lock::flock(&handle.file, operation).map_err(|e| Error::io(&handle.path, e))
    }

    fn stream_close(&mut self) -> Result<(), Error> {
        self.file
            .take()
            .map(drop)
            .ok_or(Error::InvalidState {
                operation: "stream_close",
            })
    }

    fn stream_stat(&self) -> Result<StreamStat, Error> {
        let handle = self.file("stream_stat")?;
        let metadata = handle
            .file
            .metadata()
            .map_err(|e| Error::io(&handle.path, e))?;
        Ok(StreamStat::from(&metadata))
    }

    fn mkdir(
        &mut self,
        uri: &str,
        mode: u32,
        recursive: bool,
        options: StreamOptions,
    ) -> Result<bool, Error> {
        self.uri = uri.to_string();
        report(options, "mkdir", self.make_dir(mode, recursive), false)
    }

    fn rmdir(&mut self, uri: &str, options: StreamOptions) -> Result<bool, Error> {
        self.uri = uri.to_string();
        let removed = self.resolve(None).and_then(|path| {
            fs::remove_dir(&path)
                .map(|()| true)
                .map_err(|e| Error::io(&path, e))
        });
        report(options, "rmdir", removed, false)
    }

    fn rename(&mut self, from_uri: &str, to_uri: &str) -> Result<(), Error> {
        let from = self.resolve(Some(from_uri))?;
        let to = self.resolve(Some(to_uri))?;
        fs::rename(&from, &to).map_err(|e| Error::io(&from, e))
    }

    fn unlink(&mut self, uri: &str) -> Result<(), Error> {
        self.uri = uri.to_string();
        let path = self.resolve(None)?;
        fs::remove_file(&path).map_err(|e| Error::io(&path, e))
    }

    fn url_stat(
        &mut self,
        uri: &str,
        options: StreamOptions,
    ) -> Result<Option<StreamStat>, Error> {
        self.uri = uri.to_string();
        let stat = self.resolve(None).and_then(|path| {
            fs::metadata(&path)
                .map(|metadata| Some(StreamStat::from(&metadata)))
                .map_err(|e| Error::io(&path, e))
        });
        report(options, "url_stat", stat, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContentConfig;
    use crate::wrapper::StreamOption;
    use tempfile::TempDir;

    fn wrapper(temp: &TempDir) -> LocalStreamWrapper<FixedRoot> {
        LocalStreamWrapper::new(FixedRoot::new(temp.path()))
    }

    #[test]
    fn local_path_joins_root_and_target() {
        let temp = TempDir::new().unwrap();
        let mut w = wrapper(&temp);
        w.set_uri("test:///a/b.txt/");
        assert_eq!(w.local_path(None).unwrap(), temp.path().join("a/b.txt"));
        assert_eq!(
            w.local_path(Some("test://other.txt")).unwrap(),
            temp.path().join("other.txt")
        );
        assert_eq!(w.local_path(Some("test://")).unwrap(), temp.path());
        assert!(matches!(
            w.local_path(Some("/not/a/uri")),
            Err(Error::NotAUri { .. })
        ));
    }

    #[test]
    fn set_uri_does_not_resolve() {
        let mut w = LocalStreamWrapper::new(FixedRoot::new("/does/not/exist"));
        w.set_uri("test://testfile.txt");
        assert_eq!(w.uri(), "test://testfile.txt");
        w.set_uri("test://testfile2.txt");
        assert_eq!(w.uri(), "test://testfile2.txt");
    }

    #[test]
    fn write_then_read_back() {
        let temp = TempDir::new().unwrap();
        let content = b"The more we share, the more we have.";

        let mut w = wrapper(&temp);
        assert!(w
            .stream_open("test://f.txt", OpenMode::Write, StreamOptions::REPORT_ERRORS)
            .unwrap());
        assert_eq!(w.stream_write(content).unwrap(), content.len());
        w.stream_flush().unwrap();
        w.stream_close().unwrap();

        let mut r = wrapper(&temp);
        assert!(r
            .stream_open("test://f.txt", OpenMode::Read, StreamOptions::REPORT_ERRORS)
            .unwrap());
        assert_eq!(r.stream_stat().unwrap().size, content.len() as u64);
        assert_eq!(r.stream_read(content.len()).unwrap(), content);
        assert!(!r.stream_eof().unwrap());
        assert!(r.stream_read(1).unwrap().is_empty());
        assert!(r.stream_eof().unwrap());
        r.stream_close().unwrap();
    }

    #[test]
    fn seek_and_tell() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("s.txt"), b"line\nsecond line\n").unwrap();

        let mut w = wrapper(&temp);
        w.stream_open("test://s.txt", OpenMode::Read, StreamOptions::REPORT_ERRORS)
            .unwrap();
        assert_eq!(w.stream_read(4).unwrap(), b"line");
        assert_eq!(w.stream_tell().unwrap(), 4);
        assert_eq!(w.stream_seek(SeekFrom::Start(0)).unwrap(), 0);
        assert_eq!(w.stream_tell().unwrap(), 0);
        assert_eq!(w.stream_seek(SeekFrom::End(-5)).unwrap(), 12);
        assert_eq!(w.stream_read(4).unwrap(), b"line");
        assert_eq!(w.stream_seek(SeekFrom::Current(-4)).unwrap(), 12);
    }

    #[test]
    fn closed_stream_is_invalid_state() {
        let temp = TempDir::new().unwrap();
        let mut w = wrapper(&temp);

        assert!(matches!(
            w.stream_read(1),
            Err(Error::InvalidState {
                operation: "stream_read"
            })
        ));
        assert!(matches!(w.stream_write(b"x"), Err(Error::InvalidState { .. })));
        assert!(matches!(w.stream_tell(), Err(Error::InvalidState { .. })));
        assert!(matches!(w.stream_close(), Err(Error::InvalidState { .. })));

        w.stream_open("test://c.txt", OpenMode::Write, StreamOptions::REPORT_ERRORS)
            .unwrap();
        w.stream_close().unwrap();
        assert!(matches!(w.stream_write(b"x"), Err(Error::InvalidState { .. })));
        assert!(matches!(w.dir_read(), Err(Error::InvalidState { .. })));
    }

    #[test]
    fn open_failure_respects_report_errors() {
        let temp = TempDir::new().unwrap();
        let mut w = wrapper(&temp);

        assert!(!w
            .stream_open("test://missing.txt", OpenMode::Read, StreamOptions::QUIET)
            .unwrap());
        let err = w
            .stream_open(
                "test://missing.txt",
                OpenMode::Read,
                StreamOptions::REPORT_ERRORS,
            )
            .unwrap_err();
        assert_eq!(err.io_kind(), Some(std::io::ErrorKind::NotFound));
    }

    #[test]
    fn open_can_create_parents() {
        let temp = TempDir::new().unwrap();
        let mut w = wrapper(&temp);

        assert!(!w
            .stream_open("test://new/dir/f.txt", OpenMode::Write, StreamOptions::QUIET)
            .unwrap());
        assert!(w
            .stream_open(
                "test://new/dir/f.txt",
                OpenMode::Write,
                StreamOptions::REPORT_ERRORS.with_create_parents()
            )
            .unwrap());
        assert!(temp.path().join("new/dir/f.txt").is_file());
    }

    #[test]
    fn create_new_refuses_existing_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("x.txt"), b"").unwrap();
        let mut w = wrapper(&temp);

        let err = w
            .stream_open("test://x.txt", OpenMode::CreateNew, StreamOptions::REPORT_ERRORS)
            .unwrap_err();
        assert_eq!(err.io_kind(), Some(std::io::ErrorKind::AlreadyExists));
    }

    #[test]
    fn mkdir_and_rmdir() {
        let temp = TempDir::new().unwrap();
        let mut w = wrapper(&temp);

        assert!(w
            .mkdir("test://dir1", 0o775, false, StreamOptions::REPORT_ERRORS)
            .unwrap());
        assert!(temp.path().join("dir1").is_dir());
        assert!(w.rmdir("test://dir1", StreamOptions::REPORT_ERRORS).unwrap());
        assert!(!temp.path().join("dir1").exists());

        assert!(!w
            .mkdir("test://a/b/c", 0o775, false, StreamOptions::QUIET)
            .unwrap());
        assert!(w
            .mkdir("test://a/b/c", 0o775, true, StreamOptions::QUIET)
            .unwrap());
        assert!(temp.path().join("a/b/c").is_dir());
        assert!(!w
            .mkdir("test://a/b/c", 0o775, true, StreamOptions::QUIET)
            .unwrap());
        let err = w
            .mkdir("test://a/b", 0o775, true, StreamOptions::REPORT_ERRORS)
            .unwrap_err();
        assert_eq!(err.io_kind(), Some(std::io::ErrorKind::AlreadyExists));

        assert!(!w.rmdir("test://a", StreamOptions::QUIET).unwrap());
        assert!(w.rmdir("test://a", StreamOptions::REPORT_ERRORS).is_err());
        assert!(temp.path().join("a").is_dir());
    }

    #[test]
    fn rename_and_unlink() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("one.txt"), b"1").unwrap();
        let mut w = wrapper(&temp);

        w.rename("test://one.txt", "test://two.txt").unwrap();
        assert!(!temp.path().join("one.txt").exists());
        assert!(temp.path().join("two.txt").exists());

        w.unlink("test://two.txt").unwrap();
        assert!(!temp.path().join("two.txt").exists());
        assert!(w.unlink("test://two.txt").is_err());
    }

    #[test]
    fn directory_listing_and_rewind() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("dir1/dir2/dir3/dir4")).unwrap();
        let mut w = wrapper(&temp);

        assert!(w
            .dir_open("test://dir1/dir2", StreamOptions::REPORT_ERRORS)
            .unwrap());
        let mut entries = Vec::new();
        while let Some(entry) = w.dir_read().unwrap() {
            entries.push(entry);
        }
        assert_eq!(entries, vec![".", "..", "dir3"]);
        assert_eq!(w.dir_read().unwrap(), None);

        w.dir_rewind().unwrap();
        assert_eq!(w.dir_read().unwrap().as_deref(), Some("."));
        w.dir_close().unwrap();
        assert!(matches!(w.dir_close(), Err(Error::InvalidState { .. })));

        assert!(!w.dir_open("test://nope", StreamOptions::QUIET).unwrap());
    }

    #[test]
    fn url_stat_quiet_and_loud() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("s.txt"), b"abc").unwrap();
        let mut w = wrapper(&temp);

        let stat = w
            .url_stat("test://s.txt", StreamOptions::QUIET)
            .unwrap()
            .unwrap();
        assert_eq!(stat.size, 3);
        assert!(stat.is_file);
        assert!(w
            .url_stat("test://missing", StreamOptions::QUIET)
            .unwrap()
            .is_none());
        assert!(w
            .url_stat("test://missing", StreamOptions::REPORT_ERRORS)
            .is_err());
    }

    #[cfg(unix)]
    #[test]
    fn exclusive_lock_blocks_second_handle() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("lock_test.txt"), b"").unwrap();
        let exclusive = LockOperation::EXCLUSIVE.non_blocking();

        let mut first = wrapper(&temp);
        first
            .stream_open("test://lock_test.txt", OpenMode::ReadWrite, StreamOptions::REPORT_ERRORS)
            .unwrap();
        let mut second = wrapper(&temp);
        second
            .stream_open("test://lock_test.txt", OpenMode::ReadWrite, StreamOptions::REPORT_ERRORS)
            .unwrap();

        assert!(first.stream_lock(exclusive).unwrap());
        assert!(!second.stream_lock(exclusive).unwrap());
        assert!(first.stream_lock(LockOperation::UNLOCK).unwrap());
        assert!(second.stream_lock(exclusive).unwrap());
        assert!(second.stream_lock(LockOperation::UNLOCK).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn chmod_sets_mode_bits() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("m.txt"), b"").unwrap();
        let mut w = wrapper(&temp);
        w.set_uri("test://m.txt");

        w.chmod(0o600).unwrap();
        let mode = std::fs::metadata(temp.path().join("m.txt"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn realpath_requires_existing_target() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("r.txt"), b"").unwrap();
        let mut w = wrapper(&temp);

        w.set_uri("test://r.txt");
        assert_eq!(
            w.realpath().unwrap(),
            std::fs::canonicalize(temp.path().join("r.txt")).unwrap()
        );
        w.set_uri("test://missing.txt");
        assert!(w.realpath().is_err());
    }

    #[test]
    fn dirname_uses_empty_parent() {
        let temp = TempDir::new().unwrap();
        let w = wrapper(&temp);
        assert_eq!(w.dirname("test://a/b/c.txt").unwrap(), "test://a/b");
        assert_eq!(w.dirname("test://c.txt").unwrap(), "test://");
        assert!(w.dirname("plain/path").is_err());
    }

    #[test]
    fn optional_capabilities() {
        let temp = TempDir::new().unwrap();
        let mut w = wrapper(&temp);
        w.set_uri("test://a.txt");

        assert!(w.web_accessible_url().unwrap_err().is_not_supported());
        assert!(w
            .stream_set_option(StreamOption::Blocking(true))
            .unwrap_err()
            .is_not_supported());

        let mut content = ContentWrapper::new(
            ContentRoot::new(ContentConfig::new(temp.path(), "https://example.com/c"))
                .subdir("stream_tests"),
        );
        content.set_uri("stream://testfile.txt");
        assert_eq!(
            content.web_accessible_url().unwrap(),
            "https://example.com/c/stream_tests/testfile.txt"
        );
        assert_eq!(
            content.wrapper_path().unwrap(),
            temp.path().join("stream_tests")
        );
    }
}
