use super::{
    copy_file::CopyFileOperation, create_directory::CreateDirectoryOperation,
    destination::{ResolvedDestination, SftpDestination},
};
use crate::{
    client::SftpClient,
    error::{NotifyError, SftpResult},
    fs::{RemotePath, SftpFilesystem},
};

/// What an operation needs from whoever runs it.
pub trait OperationCallback: Send {
    /// Fails with [`Error::Cancelled`](crate::error::Error::Cancelled) if the
    /// user asked to stop
    fn check_if_user_cancelled(&self) -> SftpResult<()>;

    /// Asks whether `target`, which already exists, may be replaced
    fn request_overwrite_permission(&self, target: &RemotePath) -> bool;

    fn update_progress(&mut self, so_far: u64, out_of: u64) -> Result<(), NotifyError>;

    /// Announces that `path` was created or grew to `size` bytes
    #[allow(unused_variables)]
    fn notify_changed(&mut self, path: &RemotePath, size: u64) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// One step of a transfer plan
#[derive(Debug, Clone)]
pub enum Operation {
    CreateDirectory(CreateDirectoryOperation),
    CopyFile(CopyFileOperation),
}

impl Operation {
    /// First progress line while the operation runs
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            Self::CreateDirectory(op) => op.title(),
            Self::CopyFile(op) => op.title(),
        }
    }

    /// Second progress line while the operation runs
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CreateDirectory(op) => op.description(),
            Self::CopyFile(op) => op.description(),
        }
    }

    #[must_use]
    pub fn destination(&self) -> &SftpDestination {
        match self {
            Self::CreateDirectory(op) => op.destination(),
            Self::CopyFile(op) => op.destination(),
        }
    }

    pub async fn apply<C: SftpClient>(
        &self,
        fs: &SftpFilesystem<C>,
        target: &ResolvedDestination,
        callback: &mut dyn OperationCallback,
    ) -> SftpResult<()> {
        match self {
            Self::CreateDirectory(op) => op.apply(fs, target, callback).await,
            Self::CopyFile(op) => op.apply(fs, target, callback).await,
        }
    }
}

impl From<CreateDirectoryOperation> for Operation {
    fn from(op: CreateDirectoryOperation) -> Self {
        Self::CreateDirectory(op)
    }
}

impl From<CopyFileOperation> for Operation {
    fn from(op: CopyFileOperation) -> Self {
        Self::CopyFile(op)
    }
}
