//! Open file and directory handles for local wrappers.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::wrapper::OpenMode;

/// An open file with EOF tracking.
pub(crate) struct FileHandle {
    pub(crate) file: File,
    pub(crate) path: PathBuf,
    /// Set by a short read, cleared by a seek.
    pub(crate) eof: bool,
}

impl FileHandle {
    pub(crate) fn open(path: &Path, mode: OpenMode) -> io::Result<Self> {
        let file = mode.open_options().open(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            eof: false,
        })
    }

    pub(crate) fn read(&mut self, count: usize) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(count.min(64 * 1024));
        (&mut self.file).take(count as u64).read_to_end(&mut buffer)?;
        if buffer.len() < count {
            self.eof = true;
        }
        Ok(buffer)
    }

    pub(crate) fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.file.write(data)
    }

    pub(crate) fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let position = self.file.seek(pos)?;
        self.eof = false;
        Ok(position)
    }
}

/// A directory listing: `.` and `..` first, then the native entries.
///
/// The listing is taken when the handle opens and again on every rewind.
pub(crate) struct DirHandle {
    pub(crate) path: PathBuf,
    entries: Vec<String>,
    position: usize,
}

impl DirHandle {
    pub(crate) fn open(path: &Path) -> io::Result<Self> {
        let entries = Self::list(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            entries,
            position: 0,
        })
    }

    fn list(path: &Path) -> io::Result<Vec<String>> {
        let mut entries = vec![".".to_string(), "..".to_string()];
        for entry in fs::read_dir(path)? {
            entries.push(entry?.file_name().to_string_lossy().into_owned());
        }
        Ok(entries)
    }

    pub(crate) fn next_entry(&mut self) -> Option<String> {
        let entry = self.entries.get(self.position).cloned();
        if entry.is_some() {
            self.position += 1;
        }
        entry
    }

    pub(crate) fn rewind(&mut self) -> io::Result<()> {
        self.entries = Self::list(&self.path)?;
        self.position = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn short_read_sets_eof_and_seek_clears_it() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("f.txt");
        std::fs::write(&path, b"hello world").unwrap();

        let mut handle = FileHandle::open(&path, OpenMode::Read).unwrap();
        assert_eq!(handle.read(5).unwrap(), b"hello");
        assert!(!handle.eof);
        assert_eq!(handle.read(100).unwrap(), b" world");
        assert!(handle.eof);

        assert_eq!(handle.seek(SeekFrom::Start(6)).unwrap(), 6);
        assert!(!handle.eof);
        assert_eq!(handle.read(5).unwrap(), b"world");
    }

    #[test]
    fn dot_entries_come_first() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("dir3")).unwrap();

        let mut handle = DirHandle::open(temp.path()).unwrap();
        let entries: Vec<String> = std::iter::from_fn(|| handle.next_entry()).collect();
        assert_eq!(entries, vec![".", "..", "dir3"]);
        assert_eq!(handle.next_entry(), None);
    }

    #[test]
    fn rewind_sees_new_entries() {
        let temp = TempDir::new().unwrap();
        let mut handle = DirHandle::open(temp.path()).unwrap();
        while handle.next_entry().is_some() {}

        std::fs::write(temp.path().join("late.txt"), b"").unwrap();
        handle.rewind().unwrap();
        let entries: Vec<String> = std::iter::from_fn(|| handle.next_entry()).collect();
        assert_eq!(entries, vec![".", "..", "late.txt"]);
    }
}
