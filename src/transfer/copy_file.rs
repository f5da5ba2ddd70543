use std::io::SeekFrom;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use super::{
    destination::{ResolvedDestination, SftpDestination},
    operation::OperationCallback,
    source::RootedSource,
};
use crate::{
    client::SftpClient,
    error::{Error, SftpResult},
    fs::{PathStatus, SftpFilesystem},
};

/// Copies the stream of a source item to a remote file
#[derive(Debug, Clone)]
pub struct CopyFileOperation {
    source: RootedSource,
    destination: SftpDestination,
}

impl CopyFileOperation {
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

    /// Copies the source to `target` in chunks, reporting progress and
    /// checking for cancellation before each one.
    ///
    /// An existing target is only replaced with the callback's permission;
    /// without it the copy is skipped and this is no error. The check is racy:
    /// the target may be created by someone else right after it.
    pub async fn apply<C: SftpClient>(
        &self,
        fs: &SftpFilesystem<C>,
        target: &ResolvedDestination,
        callback: &mut dyn OperationCallback,
    ) -> SftpResult<()> {
        let path = target.as_absolute_path();
        let source_name = self.source.relative_name();
        let local_error = |e: std::io::Error| Error::io(&source_name, &e);
        let remote_error = |e: std::io::Error| Error::io(&path, &e);

        let mut stream = self.source.open().await.map_err(local_error)?;

        if fs.path_status(&path).await? != PathStatus::Nonexistent
            && !callback.request_overwrite_permission(&path)
        {
            info!("keeping existing {path}");
            return Ok(());
        }

        let mut remote = fs.open_stream(&path, true).await?;
        if let Err(e) = callback.notify_changed(&path, 0) {
            warn!("failed to announce {path}: {e}");
        }

        stream.reader.seek(SeekFrom::Start(0)).await.map_err(local_error)?;
        remote.seek(SeekFrom::Start(0)).await.map_err(remote_error)?;

        let mut chunk = vec![0u8; fs.options().copy_chunk_size];
        let total = stream.len;
        let mut done = 0u64;

        loop {
            callback.check_if_user_cancelled()?;

            let read = stream.reader.read(&mut chunk).await.map_err(local_error)?;
            remote.write_all(&chunk[..read]).await.map_err(remote_error)?;
            done += read as u64;
            trace!("{path}: {done} of {total} bytes");

            if let Err(e) = callback.notify_changed(&path, done) {
                warn!("failed to announce {path}: {e}");
            }

            if let Err(e) = callback.update_progress(done, total) {
                warn!("progress update failed: {e}");
            }

            if read == 0 {
                break;
            }
        }

        remote.shutdown().await.map_err(remote_error)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        path::Path,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
    };

    use super::*;
    use crate::{
        client::{MemoryClient, MemoryServer},
        config::Options,
        error::NotifyError,
        fs::RemotePath,
        transfer::{source::SourceStream, Source, SourceItem},
    };

    #[derive(Debug)]
    struct InMemory(Vec<u8>);

    #[async_trait]
    impl Source for InMemory {
        async fn open(&self, _branch: &Path) -> std::io::Result<SourceStream> {
            Ok(SourceStream {
                reader: Box::new(std::io::Cursor::new(self.0.clone())),
                len: self.0.len() as u64,
            })
        }

        async fn children(&self, _branch: &Path) -> std::io::Result<Vec<SourceItem>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct Recorder {
        allow_overwrite: bool,
        cancel_after: Option<usize>,
        failing_progress: bool,
        updates: Vec<(u64, u64)>,
        changes: usize,
        cancelled: AtomicBool,
    }

    impl OperationCallback for Recorder {
        fn check_if_user_cancelled(&self) -> SftpResult<()> {
            if self.cancel_after.is_some_and(|n| self.updates.len() >= n) {
                self.cancelled.store(true, Ordering::SeqCst);
                return Err(Error::Cancelled);
            }
            Ok(())
        }

        fn request_overwrite_permission(&self, _target: &RemotePath) -> bool {
            self.allow_overwrite
        }

        fn update_progress(&mut self, so_far: u64, out_of: u64) -> Result<(), NotifyError> {
            self.updates.push((so_far, out_of));
            if self.failing_progress {
                return Err("progress window went away".into());
            }
            Ok(())
        }

        fn notify_changed(&mut self, _path: &RemotePath, _size: u64) -> Result<(), NotifyError> {
            self.changes += 1;
            Ok(())
        }
    }

    fn setup(data: Vec<u8>) -> (MemoryServer, SftpFilesystem<MemoryClient>, CopyFileOperation) {
        let _ = env_logger::builder().is_test(true).try_init();
        let server = MemoryServer::new();
        let options = Options {
            copy_chunk_size: 4,
            ..Options::default()
        };
        let fs = SftpFilesystem::new(server.client(), options).expect("non-zero chunk size");
        let source = RootedSource::new(Arc::new(InMemory(data)), "data.bin");
        let destination = SftpDestination::new("/up", "data.bin").expect("relative destination");
        (server, fs, CopyFileOperation::new(source, destination))
    }

    #[tokio::test]
    async fn copies_in_chunks_with_cumulative_progress() -> anyhow::Result<()> {
        let (server, fs, op) = setup(b"0123456789".to_vec());
        server.create_dir_all("/up")?;
        let mut callback = Recorder::default();

        op.apply(&fs, &op.destination().resolve(), &mut callback).await?;

        assert_eq!(server.read_file("/up/data.bin")?, b"0123456789");
        assert_eq!(callback.updates, [(4, 10), (8, 10), (10, 10), (10, 10)]);
        assert_eq!(callback.changes, 5);
        assert_eq!(server.open_handles(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn declined_overwrite_leaves_target_alone() -> anyhow::Result<()> {
        let (server, fs, op) = setup(b"new".to_vec());
        server.write_file("/up/data.bin", b"old")?;
        let mut callback = Recorder::default();

        op.apply(&fs, &op.destination().resolve(), &mut callback).await?;

        assert_eq!(server.read_file("/up/data.bin")?, b"old");
        assert!(callback.updates.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn allowed_overwrite_replaces_target() -> anyhow::Result<()> {
        let (server, fs, op) = setup(b"new".to_vec());
        server.write_file("/up/data.bin", b"older contents")?;
        let mut callback = Recorder {
            allow_overwrite: true,
            ..Recorder::default()
        };

        op.apply(&fs, &op.destination().resolve(), &mut callback).await?;
        assert_eq!(server.read_file("/up/data.bin")?, b"new");
        Ok(())
    }

    #[tokio::test]
    async fn cancellation_stops_between_chunks() -> anyhow::Result<()> {
        let (server, fs, op) = setup(b"0123456789".to_vec());
        server.create_dir_all("/up")?;
        let mut callback = Recorder {
            cancel_after: Some(1),
            ..Recorder::default()
        };

        let result = op.apply(&fs, &op.destination().resolve(), &mut callback).await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(callback.cancelled.load(Ordering::SeqCst));
        assert_eq!(server.read_file("/up/data.bin")?, b"0123");
        Ok(())
    }

    #[tokio::test]
    async fn failing_progress_does_not_abort_the_copy() -> anyhow::Result<()> {
        let (server, fs, op) = setup(b"0123456789".to_vec());
        server.create_dir_all("/up")?;
        let mut callback = Recorder {
            failing_progress: true,
            ..Recorder::default()
        };

        op.apply(&fs, &op.destination().resolve(), &mut callback).await?;
        assert_eq!(server.read_file("/up/data.bin")?, b"0123456789");
        Ok(())
    }

    #[tokio::test]
    async fn missing_destination_directory_fails() -> anyhow::Result<()> {
        let (_server, fs, op) = setup(b"x".to_vec());
        let mut callback = Recorder::default();

        let result = op.apply(&fs, &op.destination().resolve(), &mut callback).await;
        assert!(result.is_err_and(|e| e.is_not_found()));
        Ok(())
    }
}
