//! Filesystem helpers that accept either stream URIs or native paths.
//!
//! Every helper looks at the input first. A URI whose scheme is registered
//! is handed to that scheme's wrapper; anything else is treated as a native
//! path and goes straight to `std::fs`. That makes the helpers usable
//! interchangeably with both.
//!
//! The first group mirrors the classic helper set and reports failure as
//! `false` or `None`, logging the cause at debug level. The namespace
//! helpers further down return [`Error`] instead.

use std::fs::{self, DirBuilder, File, FileTimes, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::file::StreamFile;
use crate::stream::{is_stream_uri, normalize, wrapper_instance};
use crate::wrapper::{OpenMode, StreamOptions, StreamStat, StreamWrapper};
use crate::Error;

/// Mode applied by [`chmod`] and [`mkdir`] to directories when none is given.
pub const DEFAULT_DIR_MODE: u32 = 0o775;

/// Mode applied by [`chmod`] to files when none is given.
pub const DEFAULT_FILE_MODE: u32 = 0o664;

/// Where an input is served from.
enum Resolved {
    Stream(Box<dyn StreamWrapper>),
    /// A URI whose scheme has no wrapper.
    Unregistered,
    Native(PathBuf),
}

fn resolve(path: &str) -> Resolved {
    match wrapper_instance(path) {
        Some(wrapper) => Resolved::Stream(wrapper),
        None if is_stream_uri(path) => Resolved::Unregistered,
        None => Resolved::Native(PathBuf::from(path)),
    }
}

/// The native path behind `path`. An unregistered URI is passed through and
/// fails at the native call.
fn native_path(path: &str) -> Result<PathBuf, Error> {
    match resolve(path) {
        Resolved::Stream(wrapper) => wrapper.local_path(None),
        Resolved::Unregistered | Resolved::Native(_) => Ok(PathBuf::from(path)),
    }
}

fn quietly<T>(operation: &str, path: &str, result: Result<T, Error>) -> Option<T> {
    result
        .map_err(|e| log::debug!("{} on {} failed: {}", operation, path, e))
        .ok()
}

fn refused(path: &str, operation: &str) -> Error {
    Error::io(
        path,
        io::Error::other(format!("{} refused by wrapper", operation)),
    )
}

/// Change permissions. Without `mode`, directories get
/// [`DEFAULT_DIR_MODE`] and files [`DEFAULT_FILE_MODE`].
pub fn chmod(path: &str, mode: Option<u32>) -> bool {
    let result = (|| -> Result<(), Error> {
        let is_dir = stat(path)?.is_dir;
        let mode = mode.unwrap_or(if is_dir {
            DEFAULT_DIR_MODE
        } else {
            DEFAULT_FILE_MODE
        });

        match resolve(path) {
            Resolved::Stream(mut wrapper) => wrapper.chmod(mode),
            Resolved::Unregistered | Resolved::Native(_) => native_chmod(Path::new(path), mode),
        }
    })();

    quietly("chmod", path, result).is_some()
}

#[cfg(unix)]
fn native_chmod(path: &Path, mode: u32) -> Result<(), Error> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| Error::io(path, e))
}

#[cfg(not(unix))]
fn native_chmod(path: &Path, mode: u32) -> Result<(), Error> {
    let mut permissions = fs::metadata(path)
        .map_err(|e| Error::io(path, e))?
        .permissions();
    permissions.set_readonly(mode & 0o222 == 0);
    fs::set_permissions(path, permissions).map_err(|e| Error::io(path, e))
}

/// Canonical native path. `None` for missing targets and for URIs with
/// no registered wrapper.
pub fn realpath(path: &str) -> Option<PathBuf> {
    let result = match resolve(path) {
        Resolved::Stream(wrapper) => wrapper.realpath(),
        Resolved::Unregistered => return None,
        Resolved::Native(native) => fs::canonicalize(&native).map_err(|e| Error::io(&native, e)),
    };
    quietly("realpath", path, result)
}

/// Create a new, uniquely named empty file in `dir` and return its name.
///
/// For a URI the file is created under the wrapper's native directory but
/// a normalized URI is returned. A native `dir` that does not exist falls
/// back to the system temp directory.
pub fn unique_temp_file(dir: &str, prefix: &str) -> Option<String> {
    match resolve(dir) {
        Resolved::Stream(wrapper) => {
            let native = quietly("unique_temp_file", dir, wrapper.local_path(None))?;
            let name = quietly("unique_temp_file", dir, create_temp_file(&native, prefix))?;
            let scheme = streamfs_uri::scheme(dir)?;
            let target = streamfs_uri::target(dir)?;
            Some(normalize(&streamfs_uri::join(
                scheme,
                &format!("{}/{}", target, name),
            )))
        }
        Resolved::Unregistered => None,
        Resolved::Native(native) => {
            let native = if native.is_dir() {
                native
            } else {
                log::debug!(
                    "{} is not a directory, using the system temp directory",
                    native.display()
                );
                std::env::temp_dir()
            };
            let name = quietly("unique_temp_file", dir, create_temp_file(&native, prefix))?;
            Some(native.join(name).to_string_lossy().into_owned())
        }
    }
}

fn create_temp_file(dir: &Path, prefix: &str) -> Result<String, Error> {
    let file = tempfile::Builder::new()
        .prefix(prefix)
        .tempfile_in(dir)
        .map_err(|e| Error::io(dir, e))?;
    let (_, path) = file.keep().map_err(|e| Error::io(dir, e.error))?;

    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| Error::io(&path, io::Error::other("temp file has no name")))
}

/// Parent of a URI or path. The parent of a top-level URI target is the
/// scheme root; the parent of a bare file name is `.`.
pub fn dirname(path: &str) -> String {
    if let Resolved::Stream(wrapper) = resolve(path) {
        if let Some(parent) = quietly("dirname", path, wrapper.dirname(path)) {
            return parent;
        }
    }

    match Path::new(path).parent() {
        Some(parent) if parent.as_os_str().is_empty() => ".".to_string(),
        Some(parent) => parent.to_string_lossy().into_owned(),
        None => path.to_string(),
    }
}

/// Create `path` if needed and set its times. `mtime` defaults to now and
/// `atime` to `mtime`.
///
/// An existing file or directory only has its times updated. For URIs the
/// parent directory must already exist: it is resolved to its real path
/// first and the file is created there.
pub fn touch(path: &str, mtime: Option<SystemTime>, atime: Option<SystemTime>) -> bool {
    let result = (|| -> Result<(), Error> {
        let native = match resolve(path) {
            Resolved::Stream(_) => {
                let parent = realpath(&dirname(path)).ok_or_else(|| {
                    Error::io(
                        path,
                        io::Error::new(io::ErrorKind::NotFound, "parent directory does not exist"),
                    )
                })?;
                let target = streamfs_uri::target(path).unwrap_or_default();
                parent.join(streamfs_uri::file_name(target))
            }
            Resolved::Unregistered => {
                return Err(Error::UnknownScheme {
                    scheme: streamfs_uri::scheme(path).unwrap_or_default().to_string(),
                })
            }
            Resolved::Native(native) => native,
        };

        let mtime = mtime.unwrap_or_else(SystemTime::now);
        let times = FileTimes::new()
            .set_modified(mtime)
            .set_accessed(atime.unwrap_or(mtime));

        // A read-only handle can set times, also on directories.
        let file = if native.exists() {
            File::open(&native)
        } else {
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(false)
                .open(&native)
        }
        .map_err(|e| Error::io(&native, e))?;
        file.set_times(times).map_err(|e| Error::io(&native, e))
    })();

    quietly("touch", path, result).is_some()
}

/// Delete a directory tree.
///
/// The path is resolved to its real path first. Symlinks inside the tree
/// are unlinked, never followed, and a symlink passed as the starting path
/// is refused. A failure partway through leaves the rest of the tree in
/// place.
pub fn recursive_remove_directory(path: &str) -> bool {
    let Some(native) = quietly("recursive_remove_directory", path, native_path(path)) else {
        return false;
    };

    match fs::symlink_metadata(&native) {
        Ok(metadata) if metadata.file_type().is_symlink() => {
            log::warn!("Refusing to recursively remove symlink {}", native.display());
            return false;
        }
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => {
            log::debug!("{} is not a directory", native.display());
            return false;
        }
        Err(e) => {
            log::debug!("Cannot remove {}: {}", native.display(), e);
            return false;
        }
    }

    let Ok(real) = fs::canonicalize(&native) else {
        return false;
    };

    for entry in WalkDir::new(&real).contents_first(true).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Stopped removing {}: {}", real.display(), e);
                return false;
            }
        };

        let removed = if entry.file_type().is_dir() {
            fs::remove_dir(entry.path())
        } else {
            fs::remove_file(entry.path())
        };
        if let Err(e) = removed {
            log::warn!(
                "Stopped removing {} at {}: {}",
                real.display(),
                entry.path().display(),
                e
            );
            return false;
        }
    }

    true
}

/// Create a directory. `mode` defaults to [`DEFAULT_DIR_MODE`].
pub fn mkdir(path: &str, mode: Option<u32>, recursive: bool) -> Result<(), Error> {
    let mode = mode.unwrap_or(DEFAULT_DIR_MODE);
    match resolve(path) {
        Resolved::Stream(mut wrapper) => wrapper
            .mkdir(path, mode, recursive, StreamOptions::REPORT_ERRORS)?
            .then_some(())
            .ok_or_else(|| refused(path, "mkdir")),
        Resolved::Unregistered | Resolved::Native(_) => {
            create_dir(Path::new(path), mode, recursive).map_err(|e| Error::io(path, e))
        }
    }
}

/// Create `path` with `mode`, and its missing parents when `recursive`.
///
/// An existing path is an error in both cases, like native `mkdir`.
pub(crate) fn create_dir(path: &Path, mode: u32, recursive: bool) -> io::Result<()> {
    if recursive && fs::symlink_metadata(path).is_ok() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "path already exists",
        ));
    }

    let mut builder = DirBuilder::new();
    builder.recursive(recursive);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    builder.create(path)
}

/// Remove an empty directory.
pub fn rmdir(path: &str) -> Result<(), Error> {
    match resolve(path) {
        Resolved::Stream(mut wrapper) => wrapper
            .rmdir(path, StreamOptions::REPORT_ERRORS)?
            .then_some(())
            .ok_or_else(|| refused(path, "rmdir")),
        Resolved::Unregistered | Resolved::Native(_) => {
            fs::remove_dir(path).map_err(|e| Error::io(path, e))
        }
    }
}

/// Rename within one scheme, or between two native paths.
pub fn rename(from: &str, to: &str) -> Result<(), Error> {
    if streamfs_uri::scheme(from) != streamfs_uri::scheme(to) {
        return Err(Error::NotSupported {
            operation: "rename across schemes",
        });
    }

    match resolve(from) {
        Resolved::Stream(mut wrapper) => wrapper.rename(from, to),
        Resolved::Unregistered | Resolved::Native(_) => {
            fs::rename(from, to).map_err(|e| Error::io(from, e))
        }
    }
}

pub fn unlink(path: &str) -> Result<(), Error> {
    match resolve(path) {
        Resolved::Stream(mut wrapper) => wrapper.unlink(path),
        Resolved::Unregistered | Resolved::Native(_) => {
            fs::remove_file(path).map_err(|e| Error::io(path, e))
        }
    }
}

/// Metadata of `path`, following symlinks.
pub fn stat(path: &str) -> Result<StreamStat, Error> {
    match resolve(path) {
        Resolved::Stream(mut wrapper) => wrapper
            .url_stat(path, StreamOptions::REPORT_ERRORS)?
            .ok_or_else(|| refused(path, "url_stat")),
        Resolved::Unregistered | Resolved::Native(_) => fs::metadata(path)
            .map(|metadata| StreamStat::from(&metadata))
            .map_err(|e| Error::io(path, e)),
    }
}

pub fn exists(path: &str) -> bool {
    stat(path).is_ok()
}

pub fn is_dir(path: &str) -> bool {
    stat(path).map(|s| s.is_dir).unwrap_or(false)
}

pub fn file_size(path: &str) -> Result<u64, Error> {
    Ok(stat(path)?.size)
}

/// A file opened through a wrapper or natively.
enum Handle {
    Stream(StreamFile),
    Native(File),
}

impl Handle {
    fn open(path: &str, mode: OpenMode) -> Result<Self, Error> {
        match resolve(path) {
            Resolved::Stream(wrapper) => {
                StreamFile::from_wrapper(wrapper, path, mode, StreamOptions::REPORT_ERRORS)?
                    .map(Handle::Stream)
                    .ok_or_else(|| refused(path, "stream_open"))
            }
            Resolved::Unregistered | Resolved::Native(_) => mode
                .open_options()
                .open(path)
                .map(Handle::Native)
                .map_err(|e| Error::io(path, e)),
        }
    }
}

impl Read for Handle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Handle::Stream(file) => file.read(buf),
            Handle::Native(file) => file.read(buf),
        }
    }
}

impl Write for Handle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Handle::Stream(file) => file.write(buf),
            Handle::Native(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Handle::Stream(file) => file.flush(),
            Handle::Native(file) => file.flush(),
        }
    }
}

/// Copy the contents of `from` to `to`, truncating `to`. Either side may
/// be a URI or a native path. Returns the number of bytes copied.
pub fn copy(from: &str, to: &str) -> Result<u64, Error> {
    let mut reader = Handle::open(from, OpenMode::Read)?;
    let mut writer = Handle::open(to, OpenMode::Write)?;
    let copied = io::copy(&mut reader, &mut writer).map_err(|e| Error::io(to, e))?;
    writer.flush().map_err(|e| Error::io(to, e))?;
    Ok(copied)
}

pub fn read_to_end(path: &str) -> Result<Vec<u8>, Error> {
    let mut handle = Handle::open(path, OpenMode::Read)?;
    let mut data = Vec::new();
    handle
        .read_to_end(&mut data)
        .map_err(|e| Error::io(path, e))?;
    Ok(data)
}

/// Replace the contents of `path` with `data`.
pub fn write_all(path: &str, data: &[u8]) -> Result<(), Error> {
    let mut handle = Handle::open(path, OpenMode::Write)?;
    handle.write_all(data).map_err(|e| Error::io(path, e))?;
    handle.flush().map_err(|e| Error::io(path, e))
}
