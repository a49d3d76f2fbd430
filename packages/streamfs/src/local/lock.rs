//! Advisory file locks.

use std::fs::File;
use std::io;

use crate::wrapper::LockOperation;

/// Apply `operation` to `file`. Returns `Ok(false)` when a non-blocking
/// request runs into a conflicting lock.
///
/// Locks belong to the open file description, so two handles opened
/// separately on the same file conflict even within one process.
#[cfg(unix)]
pub(crate) fn flock(file: &File, operation: LockOperation) -> io::Result<bool> {
    use crate::wrapper::LockKind;
    use std::os::unix::io::AsRawFd;

    let mut flags = match operation.kind {
        LockKind::Shared => libc::LOCK_SH,
        LockKind::Exclusive => libc::LOCK_EX,
        LockKind::Unlock => libc::LOCK_UN,
    };
    if operation.non_blocking {
        flags |= libc::LOCK_NB;
    }

    loop {
        // SAFETY: the descriptor belongs to `file`, which outlives the call.
        let rc = unsafe { libc::flock(file.as_raw_fd(), flags) };
        if rc == 0 {
            return Ok(true);
        }

        let err = io::Error::last_os_error();
        match err.kind() {
            io::ErrorKind::Interrupted => continue,
            io::ErrorKind::WouldBlock => return Ok(false),
            _ => return Err(err),
        }
    }
}

#[cfg(not(unix))]
pub(crate) fn flock(_file: &File, _operation: LockOperation) -> io::Result<bool> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "advisory locks are only available on unix hosts",
    ))
}
