use std::io;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("not a stream uri: {uri}")]
    NotAUri { uri: String },

    #[error("no wrapper registered for scheme '{scheme}'")]
    UnknownScheme { scheme: String },

    #[error("wrapper registration for '{scheme}' rejected: {message}")]
    RegistrationRejected { scheme: String, message: String },

    #[error("{operation} is not supported by this wrapper")]
    NotSupported { operation: &'static str },

    #[error("{operation} called on a closed stream")]
    InvalidState { operation: &'static str },

    #[error("invalid open mode '{mode}'")]
    InvalidMode { mode: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// True for optional capabilities a wrapper chose not to implement.
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Error::NotSupported { .. })
    }

    /// The native error kind, if this is a native I/O failure.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Error::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

/// Lets [`crate::StreamFile`] sit behind `std::io` traits. Native failures
/// keep their original error; everything else becomes
/// [`io::ErrorKind::Other`].
impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io { source, .. } => source,
            Error::NotSupported { .. } => io::Error::new(io::ErrorKind::Unsupported, e),
            other => io::Error::other(other),
        }
    }
}
