use std::fmt;

use thiserror::Error;

/// Error Codes for SSH_FXP_STATUS
///
/// Codes above `OpUnsupported` were added in later drafts of the protocol.
/// Version 3 servers only send the first nine and fold everything else into
/// `Failure`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    #[error("Ok")]
    Ok = 0,
    #[error("Eof")]
    Eof = 1,
    #[error("No such file")]
    NoSuchFile = 2,
    #[error("Permission denied")]
    PermissionDenied = 3,
    #[error("Failure")]
    Failure = 4,
    #[error("Bad message")]
    BadMessage = 5,
    #[error("No connection")]
    NoConnection = 6,
    #[error("Connection lost")]
    ConnectionLost = 7,
    #[error("Operation unsupported")]
    OpUnsupported = 8,
    #[error("Invalid handle")]
    InvalidHandle = 9,
    #[error("No such path")]
    NoSuchPath = 10,
    #[error("File already exists")]
    FileAlreadyExists = 11,
    #[error("Write protect")]
    WriteProtect = 12,
    #[error("No media")]
    NoMedia = 13,
    #[error("No space on filesystem")]
    NoSpaceOnFilesystem = 14,
    #[error("Quota exceeded")]
    QuotaExceeded = 15,
    #[error("Unknown principal")]
    UnknownPrincipal = 16,
    #[error("Lock conflict")]
    LockConflict = 17,
    #[error("Directory not empty")]
    DirNotEmpty = 18,
    #[error("Not a directory")]
    NotADirectory = 19,
    #[error("Invalid filename")]
    InvalidFilename = 20,
    #[error("Link loop")]
    LinkLoop = 21,
}

impl StatusCode {
    /// Both spellings of "the path is not there".
    #[must_use]
    pub const fn is_no_such_file(self) -> bool {
        matches!(self, Self::NoSuchFile | Self::NoSuchPath)
    }
}

impl From<u32> for StatusCode {
    fn from(value: u32) -> Self {
        match value {
            0 => Self::Ok,
            1 => Self::Eof,
            2 => Self::NoSuchFile,
            3 => Self::PermissionDenied,
            5 => Self::BadMessage,
            6 => Self::NoConnection,
            7 => Self::ConnectionLost,
            8 => Self::OpUnsupported,
            9 => Self::InvalidHandle,
            10 => Self::NoSuchPath,
            11 => Self::FileAlreadyExists,
            12 => Self::WriteProtect,
            13 => Self::NoMedia,
            14 => Self::NoSpaceOnFilesystem,
            15 => Self::QuotaExceeded,
            16 => Self::UnknownPrincipal,
            17 => Self::LockConflict,
            18 => Self::DirNotEmpty,
            19 => Self::NotADirectory,
            20 => Self::InvalidFilename,
            21 => Self::LinkLoop,
            _ => Self::Failure,
        }
    }
}

/// Outcome of a failed request as reported by the protocol client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub status_code: StatusCode,
    pub error_message: String,
}

impl Status {
    pub fn new<M: Into<String>>(status_code: StatusCode, error_message: M) -> Self {
        Self {
            status_code,
            error_message: error_message.into(),
        }
    }
}

/// A status without a message gets the code's text
impl From<StatusCode> for Status {
    fn from(status_code: StatusCode) -> Self {
        Self::new(status_code, status_code.to_string())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status_code, self.error_message)
    }
}

impl std::error::Error for Status {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_codes_fold_into_failure() {
        assert_eq!(StatusCode::from(2), StatusCode::NoSuchFile);
        assert_eq!(StatusCode::from(18), StatusCode::DirNotEmpty);
        assert_eq!(StatusCode::from(4), StatusCode::Failure);
        assert_eq!(StatusCode::from(9000), StatusCode::Failure);
    }

    #[test]
    fn status_display_carries_code_and_message() {
        let status = Status::new(StatusCode::PermissionDenied, "/etc/shadow");
        assert_eq!(status.to_string(), "Permission denied: /etc/shadow");
        assert_eq!(
            Status::from(StatusCode::Eof).error_message,
            StatusCode::Eof.to_string()
        );
    }
}
