use super::{
    destination::{ResolvedDestination, SftpDestination},
    operation::OperationCallback,
    source::RootedSource,
};
use crate::{client::SftpClient, error::SftpResult, fs::SftpFilesystem};

/// Creates the remote counterpart of a source container
#[derive(Debug, Clone)]
pub struct CreateDirectoryOperation {
    source: RootedSource,
    destination: SftpDestination,
}

impl CreateDirectoryOperation {
    #[must_use]
    pub fn new(source: RootedSource, destination: SftpDestination) -> Self {
        Self {
            source,
            destination,
        }
    }

    #[must_use]
    pub fn title(&self) -> String {
        format!("Copying '{}'", self.source.relative_name())
    }

    #[must_use]
    pub fn description(&self) -> String {
        format!("To '{}'", self.destination.root_name())
    }

    #[must_use]
    pub fn destination(&self) -> &SftpDestination {
        &self.destination
    }

    /// Creates the directory; one that already exists is accepted
    pub async fn apply<C: SftpClient>(
        &self,
        fs: &SftpFilesystem<C>,
        target: &ResolvedDestination,
        callback: &mut dyn OperationCallback,
    ) -> SftpResult<()> {
        if let Err(e) = callback.update_progress(0, 1) {
            warn!("progress update failed: {e}");
        }

        let path = target.as_absolute_path();
        if !fs.create_directory(&path).await? {
            debug!("{path} already exists");
        }

        if let Err(e) = callback.update_progress(1, 1) {
            warn!("progress update failed: {e}");
        }
        Ok(())
    }
}
