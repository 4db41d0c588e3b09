use std::io;

use thiserror::Error;

/// Errors produced by the ring engine and by result resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The ring has been closed; no further submissions are accepted.
    #[error("ring is closed")]
    Closed,

    /// The batch is larger than the submission ring and can never fit.
    #[error("submission queue is full")]
    QueueFull,

    /// Submission polling is enabled and the file descriptor has not been
    /// registered with the ring.
    #[error("file is not registered")]
    UnregisteredFile,

    /// The kernel canceled the request (`ECANCELED`).
    #[error("request is canceled")]
    Canceled,

    /// Cancel or timeout removal targeted an unknown request (`ENOENT`).
    #[error("request is not found")]
    NotFound,

    /// Timeout removal raced with the timeout firing (`EBUSY`).
    #[error("request has already been completed")]
    AlreadyCompleted,

    /// A timeout fired before its wait condition was met (`ETIME`).
    #[error("timer expired")]
    TimerExpired,

    /// Any other kernel errno.
    #[error("{}", io::Error::from_raw_os_error(*.0))]
    Os(i32),
}

impl Error {
    /// Map a positive errno value into the library error space.
    pub(crate) fn from_errno(errno: i32) -> Error {
        match errno {
            libc::ECANCELED => Error::Canceled,
            errno => Error::Os(errno),
        }
    }

    /// The raw errno for [`Error::Os`], if that is what this is.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Error::Os(errno) => Some(*errno),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
