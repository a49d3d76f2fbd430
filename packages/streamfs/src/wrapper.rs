//! The stream wrapper contract.
//!
//! Every scheme is served by a [`StreamWrapper`]. A wrapper instance is
//! transient: it is created for one logical operation (or one open handle),
//! bound to a URI, and dropped afterwards.

use std::fs::{self, OpenOptions};
use std::io::SeekFrom;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Open mode, parsed from fopen-style mode strings.
///
/// The `b` and `t` flags are accepted and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    /// `r`
    #[default]
    Read,
    /// `r+`
    ReadWrite,
    /// `w` - truncate or create
    Write,
    /// `w+`
    WriteRead,
    /// `a` - append, create if missing
    Append,
    /// `a+`
    AppendRead,
    /// `x` - fail if the file exists
    CreateNew,
    /// `x+`
    CreateNewRead,
    /// `c` - create if missing, never truncate
    Create,
    /// `c+`
    CreateRead,
}

impl OpenMode {
    pub fn parse(mode: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidMode {
            mode: mode.to_string(),
        };

        let mut chars = mode.chars().filter(|c| !matches!(c, 'b' | 't'));
        let base = chars.next().ok_or_else(invalid)?;
        let plus = match chars.next() {
            None => false,
            Some('+') => true,
            Some(_) => return Err(invalid()),
        };
        if chars.next().is_some() {
            return Err(invalid());
        }

        Ok(match (base, plus) {
            ('r', false) => OpenMode::Read,
            ('r', true) => OpenMode::ReadWrite,
            ('w', false) => OpenMode::Write,
            ('w', true) => OpenMode::WriteRead,
            ('a', false) => OpenMode::Append,
            ('a', true) => OpenMode::AppendRead,
            ('x', false) => OpenMode::CreateNew,
            ('x', true) => OpenMode::CreateNewRead,
            ('c', false) => OpenMode::Create,
            ('c', true) => OpenMode::CreateRead,
            _ => return Err(invalid()),
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OpenMode::Read => "r",
            OpenMode::ReadWrite => "r+",
            OpenMode::Write => "w",
            OpenMode::WriteRead => "w+",
            OpenMode::Append => "a",
            OpenMode::AppendRead => "a+",
            OpenMode::CreateNew => "x",
            OpenMode::CreateNewRead => "x+",
            OpenMode::Create => "c",
            OpenMode::CreateRead => "c+",
        }
    }

    /// Whether opening in this mode may create the file.
    pub fn creates(self) -> bool {
        !matches!(self, OpenMode::Read | OpenMode::ReadWrite)
    }

    /// Native open options for this mode.
    pub fn open_options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            OpenMode::Read => options.read(true),
            OpenMode::ReadWrite => options.read(true).write(true),
            OpenMode::Write => options.write(true).create(true).truncate(true),
            OpenMode::WriteRead => options.read(true).write(true).create(true).truncate(true),
            OpenMode::Append => options.append(true).create(true),
            OpenMode::AppendRead => options.read(true).append(true).create(true),
            OpenMode::CreateNew => options.write(true).create_new(true),
            OpenMode::CreateNewRead => options.read(true).write(true).create_new(true),
            OpenMode::Create => options.write(true).create(true).truncate(false),
            OpenMode::CreateRead => options.read(true).write(true).create(true).truncate(false),
        };
        options
    }
}

impl FromStr for OpenMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OpenMode::parse(s)
    }
}

/// Caller options for `stream_open`, `dir_open`, `mkdir`, `rmdir` and
/// `url_stat`.
///
/// With `report_errors` clear, native failures are swallowed and the
/// operation just reports failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamOptions {
    pub report_errors: bool,
    /// Create missing parent directories when opening in a creating mode.
    pub create_parents: bool,
}

impl StreamOptions {
    pub const QUIET: StreamOptions = StreamOptions {
        report_errors: false,
        create_parents: false,
    };

    pub const REPORT_ERRORS: StreamOptions = StreamOptions {
        report_errors: true,
        create_parents: false,
    };

    pub fn with_create_parents(mut self) -> Self {
        self.create_parents = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    Shared,
    Exclusive,
    Unlock,
}

/// Advisory lock request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOperation {
    pub kind: LockKind,
    /// Fail immediately instead of waiting for a conflicting lock.
    pub non_blocking: bool,
}

impl LockOperation {
    pub const SHARED: LockOperation = LockOperation {
        kind: LockKind::Shared,
        non_blocking: false,
    };

    pub const EXCLUSIVE: LockOperation = LockOperation {
        kind: LockKind::Exclusive,
        non_blocking: false,
    };

    pub const UNLOCK: LockOperation = LockOperation {
        kind: LockKind::Unlock,
        non_blocking: false,
    };

    pub fn non_blocking(mut self) -> Self {
        self.non_blocking = true;
        self
    }
}

/// Options for `stream_set_option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOption {
    Blocking(bool),
    ReadTimeout(Duration),
    WriteBuffer(Option<usize>),
}

/// File metadata as reported by `stream_stat` and `url_stat`.
///
/// Times are seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStat {
    pub dev: u64,
    pub ino: u64,
    pub mode: u32,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
    pub is_file: bool,
    pub is_dir: bool,
}

impl From<&fs::Metadata> for StreamStat {
    #[cfg(unix)]
    fn from(metadata: &fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        StreamStat {
            dev: metadata.dev(),
            ino: metadata.ino(),
            mode: metadata.mode(),
            nlink: metadata.nlink(),
            uid: metadata.uid(),
            gid: metadata.gid(),
            size: metadata.size(),
            atime: metadata.atime(),
            mtime: metadata.mtime(),
            ctime: metadata.ctime(),
            is_file: metadata.is_file(),
            is_dir: metadata.is_dir(),
        }
    }

    #[cfg(not(unix))]
    fn from(metadata: &fs::Metadata) -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};

        let secs = |time: std::io::Result<SystemTime>| {
            time.ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0)
        };
        let mode = match (metadata.is_dir(), metadata.permissions().readonly()) {
            (true, false) => 0o040775,
            (true, true) => 0o040555,
            (false, false) => 0o100664,
            (false, true) => 0o100444,
        };

        StreamStat {
            dev: 0,
            ino: 0,
            mode,
            nlink: 1,
            uid: 0,
            gid: 0,
            size: metadata.len(),
            atime: secs(metadata.accessed()),
            mtime: secs(metadata.modified()),
            ctime: secs(metadata.created()),
            is_file: metadata.is_file(),
            is_dir: metadata.is_dir(),
        }
    }
}

/// The capability set every scheme backend implements.
///
/// Stream operations (`stream_*`) are only valid between a successful
/// `stream_open` and `stream_close`; directory operations (`dir_*`) between
/// `dir_open` and `dir_close`. Outside those windows they return
/// [`Error::InvalidState`].
///
/// # Object Safety
///
/// This trait is object-safe: the registry hands out `Box<dyn StreamWrapper>`.
pub trait StreamWrapper: Send {
    /// The URI this instance is bound to.
    fn uri(&self) -> &str;

    /// Rebind this instance. No path resolution happens here.
    fn set_uri(&mut self, uri: &str);

    fn chmod(&mut self, mode: u32) -> Result<(), Error>;

    /// Canonical absolute native path of the bound URI.
    fn realpath(&self) -> Result<PathBuf, Error>;

    /// `scheme://parent-target`; the parent of a top-level target is the
    /// empty target, never `.`.
    fn dirname(&self, uri: &str) -> Result<String, Error> {
        streamfs_uri::dirname(uri).ok_or_else(|| Error::NotAUri {
            uri: uri.to_string(),
        })
    }

    /// Public URL of the bound URI, for wrappers whose content is served.
    fn web_accessible_url(&self) -> Result<String, Error> {
        Err(Error::NotSupported {
            operation: "web_accessible_url",
        })
    }

    /// Native path for `uri`, or for the bound URI when `None`. Only
    /// wrappers backed by a native directory can answer this.
    fn local_path(&self, uri: Option<&str>) -> Result<PathBuf, Error> {
        let _ = uri;
        Err(Error::NotSupported {
            operation: "local_path",
        })
    }

    fn dir_open(&mut self, uri: &str, options: StreamOptions) -> Result<bool, Error>;

    /// Next entry name, `None` at the end of the listing.
    fn dir_read(&mut self) -> Result<Option<String>, Error>;

    fn dir_rewind(&mut self) -> Result<(), Error>;

    fn dir_close(&mut self) -> Result<(), Error>;

    fn stream_open(
        &mut self,
        uri: &str,
        mode: OpenMode,
        options: StreamOptions,
    ) -> Result<bool, Error>;

    /// Up to `count` bytes from the current position. Fewer bytes mean the
    /// end of the stream was reached.
    fn stream_read(&mut self, count: usize) -> Result<Vec<u8>, Error>;

    /// Bytes actually written, which may be fewer than `data.len()`.
    fn stream_write(&mut self, data: &[u8]) -> Result<usize, Error>;

    /// New position from the start of the stream.
    fn stream_seek(&mut self, pos: SeekFrom) -> Result<u64, Error>;

    fn stream_tell(&mut self) -> Result<u64, Error>;

    fn stream_eof(&self) -> Result<bool, Error>;

    fn stream_flush(&mut self) -> Result<(), Error>;

    /// `Ok(false)` when a non-blocking request hits a conflicting lock.
    fn stream_lock(&mut self, operation: LockOperation) -> Result<bool, Error>;

    fn stream_close(&mut self) -> Result<(), Error>;

    fn stream_stat(&self) -> Result<StreamStat, Error>;

    fn stream_set_option(&mut self, option: StreamOption) -> Result<bool, Error> {
        let _ = option;
        Err(Error::NotSupported {
            operation: "stream_set_option",
        })
    }

    fn mkdir(
        &mut self,
        uri: &str,
        mode: u32,
        recursive: bool,
        options: StreamOptions,
    ) -> Result<bool, Error>;

    /// Fails on a non-empty directory.
    fn rmdir(&mut self, uri: &str, options: StreamOptions) -> Result<bool, Error>;

    fn rename(&mut self, from_uri: &str, to_uri: &str) -> Result<(), Error>;

    fn unlink(&mut self, uri: &str) -> Result<(), Error>;

    /// `Ok(None)` for a missing target when errors are not reported.
    fn url_stat(&mut self, uri: &str, options: StreamOptions)
        -> Result<Option<StreamStat>, Error>;
}
