//! Open files and directory listings on stream URIs.
//!
//! [`StreamFile`] and [`DirStream`] own a wrapper instance for as long as the
//! handle is open, and close it when dropped.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::stream::require_wrapper;
use crate::wrapper::{
    LockOperation, OpenMode, StreamOption, StreamOptions, StreamStat, StreamWrapper,
};
use crate::Error;

/// An open file behind a stream wrapper.
///
/// ```rust,no_run
/// use std::io::Write;
/// use streamfs::StreamFile;
///
/// let mut file = StreamFile::open("local://notes/today.txt", "w")?;
/// file.write_all(b"hello")?;
/// file.close()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct StreamFile {
    wrapper: Box<dyn StreamWrapper>,
    open: bool,
}

impl StreamFile {
    /// Open `uri` with an fopen-style mode string, reporting native errors.
    pub fn open(uri: &str, mode: &str) -> Result<Self, Error> {
        let mode = OpenMode::parse(mode)?;
        Self::open_with(uri, mode, StreamOptions::REPORT_ERRORS)?.ok_or_else(|| {
            Error::io(
                uri,
                io::Error::other(format!(
                    "wrapper refused to open in mode '{}'",
                    mode.as_str()
                )),
            )
        })
    }

    /// Open `uri`. `Ok(None)` when the open fails and `options` suppress
    /// errors.
    pub fn open_with(
        uri: &str,
        mode: OpenMode,
        options: StreamOptions,
    ) -> Result<Option<Self>, Error> {
        Self::from_wrapper(require_wrapper(uri)?, uri, mode, options)
    }

    /// Open `uri` on a wrapper the caller already resolved for it.
    pub(crate) fn from_wrapper(
        mut wrapper: Box<dyn StreamWrapper>,
        uri: &str,
        mode: OpenMode,
        options: StreamOptions,
    ) -> Result<Option<Self>, Error> {
        if !wrapper.stream_open(uri, mode, options)? {
            return Ok(None);
        }

        Ok(Some(Self {
            wrapper,
            open: true,
        }))
    }

    pub fn uri(&self) -> &str {
        self.wrapper.uri()
    }

    pub fn lock(&mut self, operation: LockOperation) -> Result<bool, Error> {
        self.wrapper.stream_lock(operation)
    }

    pub fn stat(&self) -> Result<StreamStat, Error> {
        self.wrapper.stream_stat()
    }

    pub fn eof(&self) -> Result<bool, Error> {
        self.wrapper.stream_eof()
    }

    pub fn tell(&mut self) -> Result<u64, Error> {
        self.wrapper.stream_tell()
    }

    pub fn set_option(&mut self, option: StreamOption) -> Result<bool, Error> {
        self.wrapper.stream_set_option(option)
    }

    /// Close the handle, surfacing any error the wrapper reports.
    pub fn close(mut self) -> Result<(), Error> {
        self.open = false;
        self.wrapper.stream_close()
    }
}

impl fmt::Debug for StreamFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamFile")
            .field("uri", &self.wrapper.uri())
            .field("open", &self.open)
            .finish_non_exhaustive()
    }
}

impl Read for StreamFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.wrapper.stream_read(buf.len())?;
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Ok(n)
    }
}

impl Write for StreamFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.wrapper.stream_write(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.wrapper.stream_flush()?)
    }
}

impl Seek for StreamFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(self.wrapper.stream_seek(pos)?)
    }
}

impl Drop for StreamFile {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.wrapper.stream_close() {
                log::debug!("Closing {} on drop failed: {}", self.wrapper.uri(), e);
            }
        }
    }
}

/// An open directory listing behind a stream wrapper.
///
/// Yields `.` and `..` before the real entries.
pub struct DirStream {
    wrapper: Box<dyn StreamWrapper>,
    open: bool,
}

impl DirStream {
    pub fn open(uri: &str) -> Result<Self, Error> {
        Self::open_with(uri, StreamOptions::REPORT_ERRORS)?.ok_or_else(|| {
            Error::io(uri, io::Error::other("wrapper refused to open directory"))
        })
    }

    pub fn open_with(uri: &str, options: StreamOptions) -> Result<Option<Self>, Error> {
        let mut wrapper = require_wrapper(uri)?;
        if !wrapper.dir_open(uri, options)? {
            return Ok(None);
        }

        Ok(Some(Self {
            wrapper,
            open: true,
        }))
    }

    pub fn uri(&self) -> &str {
        self.wrapper.uri()
    }

    pub fn read_entry(&mut self) -> Result<Option<String>, Error> {
        self.wrapper.dir_read()
    }

    pub fn rewind(&mut self) -> Result<(), Error> {
        self.wrapper.dir_rewind()
    }

    pub fn close(mut self) -> Result<(), Error> {
        self.open = false;
        self.wrapper.dir_close()
    }
}

impl fmt::Debug for DirStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirStream")
            .field("uri", &self.wrapper.uri())
            .field("open", &self.open)
            .finish_non_exhaustive()
    }
}

impl Iterator for DirStream {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        match self.read_entry() {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("Reading {} stopped: {}", self.wrapper.uri(), e);
                None
            }
        }
    }
}

impl Drop for DirStream {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.wrapper.dir_close() {
                log::debug!("Closing {} on drop failed: {}", self.wrapper.uri(), e);
            }
        }
    }
}
