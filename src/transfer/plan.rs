use std::{future::Future, ops::Index, path::Path, pin::Pin, slice, sync::Arc};

use super::{
    copy_file::CopyFileOperation,
    create_directory::CreateDirectoryOperation,
    destination::SftpDestination,
    operation::{Operation, OperationCallback},
    source::{RootedSource, Source},
};
use crate::{
    client::SftpClient,
    error::{Error, NotifyError, SftpResult},
    fs::{RemotePath, SftpFilesystem},
};

type BoxedFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Display of a running transfer, usually a progress window
pub trait Progress: Send {
    fn update(&mut self, so_far: u64, out_of: u64) -> Result<(), NotifyError>;

    /// Sets line `index` of the display: 1 names the item, 2 its destination
    #[allow(unused_variables)]
    fn line(&mut self, index: u32, text: &str) -> Result<(), NotifyError> {
        Ok(())
    }

    /// Echo of a remote file created or grown by the transfer
    #[allow(unused_variables)]
    fn changed(&mut self, path: &RemotePath, size: u64) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Decides whether an existing remote file may be replaced
pub trait OverwriteConfirmation: Sync {
    fn can_overwrite(&self, target: &RemotePath) -> bool;
}

impl<F> OverwriteConfirmation for F
where
    F: Fn(&RemotePath) -> bool + Sync,
{
    fn can_overwrite(&self, target: &RemotePath) -> bool {
        self(target)
    }
}

/// `done` as a percentage of `total`. An empty total counts as complete.
#[must_use]
pub fn percentage(done: u64, total: u64) -> u64 {
    if total == 0 {
        return 100;
    }

    u64::try_from(u128::from(done) * 100 / u128::from(total)).unwrap_or(u64::MAX)
}

fn swallow(what: &str, result: Result<(), NotifyError>) {
    if let Err(e) = result {
        warn!("{what} failed: {e}");
    }
}

/// Callback of the operation at `index` out of `total`, scaling its own
/// progress to a hundred steps of the whole sequence
struct SequenceCallback<'a, P: ?Sized, O: ?Sized, K> {
    progress: &'a mut P,
    confirmation: &'a O,
    cancelled: &'a K,
    index: u64,
    total: u64,
}

impl<P, O, K> OperationCallback for SequenceCallback<'_, P, O, K>
where
    P: Progress + ?Sized,
    O: OverwriteConfirmation + ?Sized,
    K: Fn() -> bool + Sync,
{
    fn check_if_user_cancelled(&self) -> SftpResult<()> {
        if (self.cancelled)() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    fn request_overwrite_permission(&self, target: &RemotePath) -> bool {
        self.confirmation.can_overwrite(target)
    }

    fn update_progress(&mut self, so_far: u64, out_of: u64) -> Result<(), NotifyError> {
        let current = self.index * 100 + percentage(so_far, out_of).min(100);
        self.progress.update(current, self.total * 100)
    }

    fn notify_changed(&mut self, path: &RemotePath, size: u64) -> Result<(), NotifyError> {
        self.progress.changed(path, size)
    }
}

/// Ordered operations copying a selection onto the remote filesystem.
///
/// Operations run in the order they were added. Every directory is created
/// by an operation placed before those filling it.
#[derive(Debug, Clone, Default)]
pub struct TransferPlan {
    operations: Vec<Operation>,
}

impl TransferPlan {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plans copying each of the `selection` branches of `source` into
    /// `root`.
    ///
    /// An item that opens as a stream becomes one copy; any other is a
    /// container, recreated as a directory holding its files and then its
    /// sub-containers, recursively.
    pub async fn from_selection<I, R>(source: Arc<dyn Source>, selection: I, root: R) -> SftpResult<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<Path>,
        R: Into<RemotePath>,
    {
        let root = root.into();
        let mut plan = Self::new();

        for branch in selection {
            let branch = branch.as_ref();
            let name = branch
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| Error::InvalidPath(format!("'{}' has no name", branch.display())))?;

            let item = RootedSource::new(source.clone(), branch);
            let destination = SftpDestination::new(root.clone(), name)?;

            match item.open().await {
                Ok(_) => plan.add_stage(CopyFileOperation::new(item, destination)),
                Err(_) => plan.add_container(item, destination).await?,
            }
        }

        debug!("planned {} operations into {root}", plan.len());
        Ok(plan)
    }

    fn add_container(&mut self, item: RootedSource, destination: SftpDestination) -> BoxedFuture<'_, SftpResult<()>> {
        Box::pin(async move {
            self.add_stage(CreateDirectoryOperation::new(item.clone(), destination.clone()));

            let children = item
                .children()
                .await
                .map_err(|e| Error::io(item.relative_name(), &e))?;
            let (containers, files): (Vec<_>, Vec<_>) = children.into_iter().partition(|child| child.is_container);

            for file in files {
                self.add_stage(CopyFileOperation::new(
                    item.child(&file.name),
                    destination.join(&file.name),
                ));
            }

            for container in containers {
                self.add_container(item.child(&container.name), destination.join(&container.name))
                    .await?;
            }

            Ok(())
        })
    }

    pub fn add_stage<O: Into<Operation>>(&mut self, operation: O) {
        self.operations.push(operation.into());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Operation> {
        self.operations.iter()
    }

    /// Runs every operation in order.
    ///
    /// `cancelled` is polled before each operation and, while copying,
    /// before each chunk. The first error stops the plan; what was done
    /// before it is left in place.
    pub async fn execute<C, P, O, K>(
        &self,
        fs: &SftpFilesystem<C>,
        progress: &mut P,
        confirmation: &O,
        cancelled: K,
    ) -> SftpResult<()>
    where
        C: SftpClient,
        P: Progress + ?Sized,
        O: OverwriteConfirmation + ?Sized,
        K: Fn() -> bool + Sync,
    {
        let total = self.len() as u64;
        info!("starting transfer of {total} operations");

        for (index, operation) in (0u64..).zip(self.iter()) {
            swallow("progress line", progress.line(1, &operation.title()));
            swallow("progress line", progress.line(2, &operation.description()));

            let mut callback = SequenceCallback {
                progress: &mut *progress,
                confirmation,
                cancelled: &cancelled,
                index,
                total,
            };

            if let Err(e) = callback.check_if_user_cancelled() {
                info!("transfer cancelled before '{}'", operation.title());
                return Err(e);
            }

            let target = operation.destination().resolve();
            operation.apply(fs, &target, &mut callback).await?;

            swallow("progress update", progress.update(index + 1, total));
        }

        info!("transfer finished");
        Ok(())
    }
}

impl Index<usize> for TransferPlan {
    type Output = Operation;

    fn index(&self, index: usize) -> &Operation {
        &self.operations[index]
    }
}

impl<'a> IntoIterator for &'a TransferPlan {
    type Item = &'a Operation;
    type IntoIter = slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use tempdir::TempDir;

    use super::*;
    use crate::{
        client::{MemoryClient, MemoryServer},
        config::Options,
        transfer::LocalSource,
    };

    #[derive(Default)]
    struct Recorded {
        updates: Vec<(u64, u64)>,
        lines: Vec<(u32, String)>,
        failing: bool,
        cancel_on_update: Option<Arc<AtomicBool>>,
    }

    impl Progress for Recorded {
        fn update(&mut self, so_far: u64, out_of: u64) -> Result<(), NotifyError> {
            self.updates.push((so_far, out_of));
            if let Some(flag) = &self.cancel_on_update {
                flag.store(true, Ordering::SeqCst);
            }
            if self.failing {
                return Err("progress window closed".into());
            }
            Ok(())
        }

        fn line(&mut self, index: u32, text: &str) -> Result<(), NotifyError> {
            self.lines.push((index, text.to_owned()));
            Ok(())
        }
    }

    /// report.txt (512 bytes) and archive/note.txt (10 bytes)
    fn local_tree() -> anyhow::Result<(TempDir, Arc<dyn Source>)> {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = TempDir::new("sftpfs-plan")?;
        std::fs::write(dir.path().join("report.txt"), [b'r'; 512])?;
        std::fs::create_dir(dir.path().join("archive"))?;
        std::fs::write(dir.path().join("archive").join("note.txt"), b"0123456789")?;

        let source: Arc<dyn Source> = Arc::new(LocalSource::new(dir.path()));
        Ok((dir, source))
    }

    fn remote(chunk: usize) -> (MemoryServer, SftpFilesystem<MemoryClient>) {
        let server = MemoryServer::new();
        let options = Options {
            copy_chunk_size: chunk,
            ..Options::default()
        };
        let fs = SftpFilesystem::new(server.client(), options).expect("non-zero chunk size");
        (server, fs)
    }

    fn never() -> bool {
        false
    }

    fn always_overwrite(_: &RemotePath) -> bool {
        true
    }

    #[test]
    fn a_growing_source_stays_in_its_own_band() {
        let mut progress = Recorded::default();
        let mut callback = SequenceCallback {
            progress: &mut progress,
            confirmation: &always_overwrite,
            cancelled: &never,
            index: 0,
            total: 2,
        };

        assert!(callback.update_progress(5, 10).is_ok());
        assert!(callback.update_progress(25, 10).is_ok());

        assert_eq!(progress.updates, [(50, 200), (100, 200)]);
    }

    #[test]
    fn percentages() {
        assert_eq!(percentage(0, 0), 100);
        assert_eq!(percentage(7, 0), 100);
        assert_eq!(percentage(0, 10), 0);
        assert_eq!(percentage(5, 10), 50);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(u64::MAX, u64::MAX), 100);
    }

    #[tokio::test]
    async fn containers_become_directories_before_their_contents() -> anyhow::Result<()> {
        let (dir, source) = local_tree()?;
        std::fs::create_dir(dir.path().join("archive").join("old"))?;
        std::fs::write(dir.path().join("archive").join("old").join("a.txt"), b"a")?;
        std::fs::write(dir.path().join("archive").join("z.txt"), b"z")?;

        let plan = TransferPlan::from_selection(source, ["report.txt", "archive"], "/home/alice/up").await?;

        let targets: Vec<String> = plan
            .iter()
            .map(|op| op.destination().resolve().as_absolute_path().to_string())
            .collect();
        assert_eq!(
            targets,
            [
                "/home/alice/up/report.txt",
                "/home/alice/up/archive",
                "/home/alice/up/archive/note.txt",
                "/home/alice/up/archive/z.txt",
                "/home/alice/up/archive/old",
                "/home/alice/up/archive/old/a.txt",
            ]
        );
        assert!(matches!(plan[0], Operation::CopyFile(_)));
        assert!(matches!(plan[1], Operation::CreateDirectory(_)));
        assert!(matches!(plan[4], Operation::CreateDirectory(_)));
        assert_eq!(plan[2].title(), "Copying 'archive/note.txt'");
        assert_eq!(plan[2].description(), "To '/home/alice/up'");
        Ok(())
    }

    #[tokio::test]
    async fn selection_is_copied_with_full_final_progress() -> anyhow::Result<()> {
        let (_dir, source) = local_tree()?;
        let (server, fs) = remote(32 * 1024);
        server.create_dir_all("/home/alice/up")?;

        let plan = TransferPlan::from_selection(source, ["report.txt", "archive"], "/home/alice/up").await?;
        assert_eq!(plan.len(), 3);

        let mut progress = Recorded::default();
        plan.execute(&fs, &mut progress, &always_overwrite, never).await?;

        assert_eq!(server.read_file("/home/alice/up/report.txt")?, [b'r'; 512]);
        assert_eq!(server.read_file("/home/alice/up/archive/note.txt")?, b"0123456789");
        assert_eq!(progress.updates.last(), Some(&(3, 3)));
        assert_eq!(
            progress.lines[..2],
            [
                (1, "Copying 'report.txt'".to_owned()),
                (2, "To '/home/alice/up'".to_owned())
            ]
        );
        assert_eq!(server.open_handles(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn progress_is_scaled_per_operation_and_fixed_at_boundaries() -> anyhow::Result<()> {
        let (_dir, source) = local_tree()?;
        let (server, fs) = remote(256);
        server.create_dir_all("/up")?;

        let plan = TransferPlan::from_selection(source, ["report.txt", "archive"], "/up").await?;
        let mut progress = Recorded::default();
        plan.execute(&fs, &mut progress, &always_overwrite, never).await?;

        assert_eq!(
            progress.updates,
            [
                (50, 300),
                (100, 300),
                (100, 300),
                (1, 3),
                (100, 300),
                (200, 300),
                (2, 3),
                (300, 300),
                (300, 300),
                (3, 3),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn existing_directory_in_the_plan_is_reused() -> anyhow::Result<()> {
        let (_dir, source) = local_tree()?;
        let (server, fs) = remote(1024);
        server.create_dir_all("/up/archive")?;

        let plan = TransferPlan::from_selection(source, ["archive"], "/up").await?;
        plan.execute(&fs, &mut Recorded::default(), &always_overwrite, never)
            .await?;

        assert_eq!(server.read_file("/up/archive/note.txt")?, b"0123456789");
        Ok(())
    }

    #[tokio::test]
    async fn declined_overwrite_skips_only_that_file() -> anyhow::Result<()> {
        let (_dir, source) = local_tree()?;
        let (server, fs) = remote(1024);
        server.write_file("/up/report.txt", b"keep me")?;

        let plan = TransferPlan::from_selection(source, ["report.txt", "archive"], "/up").await?;
        let mut progress = Recorded::default();
        let decline = |_: &RemotePath| false;
        plan.execute(&fs, &mut progress, &decline, never).await?;

        assert_eq!(server.read_file("/up/report.txt")?, b"keep me");
        assert_eq!(server.read_file("/up/archive/note.txt")?, b"0123456789");
        assert_eq!(progress.updates.last(), Some(&(3, 3)));
        Ok(())
    }

    #[tokio::test]
    async fn cancelled_before_start_does_nothing() -> anyhow::Result<()> {
        let (_dir, source) = local_tree()?;
        let (server, fs) = remote(1024);
        server.create_dir_all("/up")?;

        let plan = TransferPlan::from_selection(source, ["report.txt", "archive"], "/up").await?;
        let result = plan
            .execute(&fs, &mut Recorded::default(), &always_overwrite, || true)
            .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(!server.exists("/up/report.txt"));
        assert!(!server.exists("/up/archive"));
        Ok(())
    }

    #[tokio::test]
    async fn cancellation_between_operations_keeps_completed_work() -> anyhow::Result<()> {
        let (_dir, source) = local_tree()?;
        let (server, fs) = remote(1024);
        server.create_dir_all("/up")?;

        let flag = Arc::new(AtomicBool::new(false));
        let mut progress = Recorded {
            cancel_on_update: Some(flag.clone()),
            ..Recorded::default()
        };

        // the flag is raised by the first progress update, so the report
        // finishes its chunk and nothing after it starts
        let plan = TransferPlan::from_selection(source, ["report.txt", "archive"], "/up").await?;
        let result = plan
            .execute(&fs, &mut progress, &always_overwrite, || flag.load(Ordering::SeqCst))
            .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(server.read_file("/up/report.txt")?, [b'r'; 512]);
        assert!(!server.exists("/up/archive"));
        Ok(())
    }

    #[tokio::test]
    async fn failing_progress_display_does_not_stop_the_transfer() -> anyhow::Result<()> {
        let (_dir, source) = local_tree()?;
        let (server, fs) = remote(64);
        server.create_dir_all("/up")?;

        let plan = TransferPlan::from_selection(source, ["report.txt", "archive"], "/up").await?;
        let mut progress = Recorded {
            failing: true,
            ..Recorded::default()
        };
        plan.execute(&fs, &mut progress, &always_overwrite, never).await?;

        assert_eq!(server.read_file("/up/archive/note.txt")?, b"0123456789");
        assert_eq!(progress.updates.last(), Some(&(3, 3)));
        Ok(())
    }

    #[tokio::test]
    async fn errors_abort_the_remaining_plan() -> anyhow::Result<()> {
        let (_dir, source) = local_tree()?;
        let (server, fs) = remote(1024);

        // no /up on the server, so the first copy cannot create its file
        let plan = TransferPlan::from_selection(source, ["report.txt", "archive"], "/up").await?;
        let result = plan
            .execute(&fs, &mut Recorded::default(), &always_overwrite, never)
            .await;

        assert!(result.is_err_and(|e| e.is_not_found()));
        assert!(!server.exists("/up"));
        Ok(())
    }

    #[tokio::test]
    async fn missing_selection_fails_to_plan() -> anyhow::Result<()> {
        let (_dir, source) = local_tree()?;

        let result = TransferPlan::from_selection(source, ["ghost"], "/up").await;
        assert!(matches!(result, Err(Error::Io { ref path, .. }) if path == "ghost"));
        Ok(())
    }

    #[test]
    fn stages_run_in_insertion_order() -> anyhow::Result<()> {
        let source: Arc<dyn Source> = Arc::new(LocalSource::new("/nonexistent"));
        let mut plan = TransferPlan::new();
        assert!(plan.is_empty());

        plan.add_stage(CreateDirectoryOperation::new(
            RootedSource::new(source.clone(), "b"),
            SftpDestination::new("/r", "b")?,
        ));
        plan.add_stage(CopyFileOperation::new(
            RootedSource::new(source, "a"),
            SftpDestination::new("/r", "a")?,
        ));

        let titles: Vec<String> = (&plan).into_iter().map(Operation::title).collect();
        assert_eq!(titles, ["Copying 'b'", "Copying 'a'"]);
        assert_eq!(plan.clone().len(), 2);
        Ok(())
    }
}
