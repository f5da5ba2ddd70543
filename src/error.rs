use std::io;
use thiserror::Error;

use crate::protocol::{Status, StatusCode};

pub type SftpResult<T> = Result<T, Error>;

/// Failure of an incidental notification (progress display, change echo).
/// These are logged and dropped, never propagated.
pub type NotifyError = Box<dyn std::error::Error + Send + Sync>;

/// Enum for filesystem and transfer errors
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The server rejected a request
    #[error("{api} failed on '{path}': {message} ({code})")]
    Sftp {
        api: &'static str,
        path: String,
        code: StatusCode,
        message: String,
    },
    /// A rename was refused because its destination already exists
    #[error("'{path}' already exists: {message}")]
    TargetExists { path: String, message: String },
    /// Only empty directories can be removed on their own
    #[error("directory '{path}' is not empty: {message}")]
    DirectoryNotEmpty { path: String, message: String },
    /// Time limit for receiving response packet exceeded
    #[error("{api} on '{path}' timed out")]
    Timeout { api: &'static str, path: String },
    /// The SFTP channel could not be started on the session
    #[error("Unable to start SFTP channel: {0}")]
    Connection(String),
    /// The filesystem owning the channel has been dropped
    #[error("SFTP channel already closed")]
    ChannelClosed,
    /// Dereferencing or advancing past the last directory entry
    #[error("No more files")]
    EndOfDirectory,
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    /// A size in [`Options`](crate::Options) that cannot work
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
    /// Any errors related to I/O on the transferred streams
    #[error("I/O on '{path}': {message}")]
    Io { path: String, message: String },
    /// The user asked for the transfer to stop
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn sftp(api: &'static str, path: &str, status: Status) -> Self {
        Self::Sftp {
            api,
            path: path.to_owned(),
            code: status.status_code,
            message: status.error_message,
        }
    }

    pub(crate) fn io<P: ToString>(path: P, error: &io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            message: error.to_string(),
        }
    }

    /// Status code for errors that came from the server
    #[must_use]
    pub const fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Sftp { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// `true` if the server reported that the path does not exist
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status_code().is_some_and(StatusCode::is_no_such_file)
    }

    /// `true` for errors caused by the state of the target rather than by the
    /// channel, which callers usually want to report differently
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::TargetExists { .. } | Self::DirectoryNotEmpty { .. }
        )
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Self::Io {
            path: String::new(),
            message: error.to_string(),
        }
    }
}

impl From<Error> for io::Error {
    fn from(error: Error) -> Self {
        let kind = match &error {
            _ if error.is_not_found() => io::ErrorKind::NotFound,
            Error::Sftp {
                code: StatusCode::PermissionDenied,
                ..
            } => io::ErrorKind::PermissionDenied,
            Error::TargetExists { .. } => io::ErrorKind::AlreadyExists,
            Error::Timeout { .. } => io::ErrorKind::TimedOut,
            Error::ChannelClosed
            | Error::Sftp {
                code: StatusCode::ConnectionLost | StatusCode::NoConnection,
                ..
            } => io::ErrorKind::NotConnected,
            Error::Cancelled => io::ErrorKind::Interrupted,
            _ => io::ErrorKind::Other,
        };

        Self::new(kind, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sftp_error_carries_api_path_and_message() {
        let error = Error::sftp(
            "rmdir",
            "/srv/data",
            Status::new(StatusCode::PermissionDenied, "denied by policy"),
        );

        assert_eq!(
            error.to_string(),
            "rmdir failed on '/srv/data': denied by policy (Permission denied)"
        );
        assert_eq!(error.status_code(), Some(StatusCode::PermissionDenied));
        assert!(!error.is_not_found());
        assert_eq!(
            io::Error::from(error).kind(),
            io::ErrorKind::PermissionDenied
        );
    }

    #[test]
    fn classification() {
        let missing = Error::sftp("lstat", "/nope", StatusCode::NoSuchFile.into());
        assert!(missing.is_not_found());
        assert!(!missing.is_precondition());
        assert_eq!(io::Error::from(missing).kind(), io::ErrorKind::NotFound);

        let exists = Error::TargetExists {
            path: "/a".to_owned(),
            message: "Failure".to_owned(),
        };
        assert!(exists.is_precondition());
        assert_eq!(exists.status_code(), None);
    }
}
