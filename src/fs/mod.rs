//! Remote filesystem over a single SFTP channel.

mod channel;
mod dir;
mod file;
mod path;

use channel::ChannelState;
pub use dir::{DirectoryCursor, DirectoryEntry, ReadDir};
pub use file::RemoteFile;
pub use path::RemotePath;

use std::{collections::VecDeque, future::Future, pin::Pin, sync::Arc};

use crate::{
    client::{SessionProvider, SftpClient},
    config::Options,
    error::{Error, SftpResult},
    protocol::{FileAttributes, OpenFlags, RenameFlags, StatusCode},
    utils,
};

/// What `rename` may do to an existing destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwriteBehavior {
    /// Fail if the destination exists
    Prevent,
    /// Replace the destination
    Allow,
    /// Replace the destination atomically if the server supports it,
    /// otherwise the same as `Allow`
    #[default]
    AtomicPreferred,
}

impl OverwriteBehavior {
    #[must_use]
    pub fn flags(self) -> RenameFlags {
        match self {
            Self::Prevent => RenameFlags::empty(),
            Self::Allow => RenameFlags::OVERWRITE,
            Self::AtomicPreferred => RenameFlags::OVERWRITE | RenameFlags::ATOMIC,
        }
    }
}

/// Coarse status of a path, without following symlinks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    Nonexistent,
    NonDirectory,
    Directory,
}

type BoxedFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// High-level access to the remote file system.
///
/// Owns the channel: dropping the filesystem shuts the channel down, after
/// which cursors and files opened from it fail with
/// [`Error::ChannelClosed`]. Every method takes the channel lock for each of
/// its round trips, never across two of them, so a filesystem can be shared
/// by reference between tasks.
///
/// Methods that check a path's status before acting on it are racy against
/// other clients modifying the same path in between; the operation then
/// fails the way the server reports it.
pub struct SftpFilesystem<C: SftpClient> {
    channel: Arc<ChannelState<C>>,
}

impl<C: SftpClient> SftpFilesystem<C> {
    /// Wraps a connected client. Fails if `options` carries a zero size.
    pub fn new(client: C, options: Options) -> SftpResult<Self> {
        options.validate()?;
        Ok(Self {
            channel: Arc::new(ChannelState::new(client, options)),
        })
    }

    /// Starts a channel on `session` and wraps it
    pub async fn open<P>(session: &P, options: Options) -> SftpResult<Self>
    where
        P: SessionProvider<Client = C>,
    {
        options.validate()?;
        Ok(Self {
            channel: Arc::new(ChannelState::open(session, options).await?),
        })
    }

    pub fn options(&self) -> &Options {
        self.channel.options()
    }

    /// Set the maximum response time in seconds.
    /// Default: 10 seconds
    pub fn set_timeout(&self, secs: u64) {
        self.channel.set_timeout(secs);
    }

    /// Cursor positioned on the first entry of `path`
    pub async fn directory_iterator<P: Into<RemotePath>>(&self, path: P) -> SftpResult<DirectoryCursor<C>> {
        DirectoryCursor::open(&self.channel, path.into()).await
    }

    /// Reads the whole listing of `path`, skipping `.` and `..`
    pub async fn read_dir<P: Into<RemotePath>>(&self, path: P) -> SftpResult<ReadDir> {
        let mut cursor = self.directory_iterator(path).await?;
        let mut entries = VecDeque::new();

        while !cursor.is_end() {
            entries.push_back(cursor.entry()?);
            cursor.advance().await?;
        }

        Ok(ReadDir { entries })
    }

    /// Attributes of `path`. With `follow_links` false, a symlink is
    /// described rather than its target.
    pub async fn attributes<P: Into<RemotePath>>(&self, path: P, follow_links: bool) -> SftpResult<FileAttributes> {
        let path = path.into();
        let api = if follow_links { "stat" } else { "lstat" };

        let mut client = self.channel.acquire().await;
        self.channel
            .complete(api, path.as_str(), client.stat(path.as_str(), follow_links))
            .await
    }

    /// `true` if anything, including a dangling symlink, exists at `path`
    pub async fn exists<P: Into<RemotePath>>(&self, path: P) -> SftpResult<bool> {
        Ok(self.path_status(path).await? != PathStatus::Nonexistent)
    }

    /// Target of the symlink at `path`, exactly as stored
    pub async fn resolve_link_target<P: Into<RemotePath>>(&self, path: P) -> SftpResult<RemotePath> {
        let path = path.into();
        let mut target = vec![0u8; self.options().link_target_buffer_len];

        let len = {
            let mut client = self.channel.acquire().await;
            self.channel
                .complete("readlink", path.as_str(), client.readlink(path.as_str(), &mut target))
                .await?
        };

        Ok(RemotePath::new(utils::decode_counted(&target, len)))
    }

    /// Absolute form of `path` as the server resolves it
    pub async fn canonical_path<P: Into<RemotePath>>(&self, path: P) -> SftpResult<RemotePath> {
        let path = path.into();
        let mut target = vec![0u8; self.options().link_target_buffer_len];

        let len = {
            let mut client = self.channel.acquire().await;
            self.channel
                .complete("realpath", path.as_str(), client.realpath(path.as_str(), &mut target))
                .await?
        };

        Ok(RemotePath::new(utils::decode_counted(&target, len)))
    }

    /// Sends `SSH_FXP_SYMLINK` with `link` first and `target` second, the
    /// order the protocol draft defines.
    ///
    /// # Warning
    /// OpenSSH, and most servers copying it, read the two arguments the other
    /// way round. The arguments are passed through unchanged, so against those
    /// servers this call creates a link at `target` pointing to `link`.
    /// Callers talking to them must swap the arguments themselves.
    pub async fn create_symlink<L, T>(&self, link: L, target: T) -> SftpResult<()>
    where
        L: Into<RemotePath>,
        T: Into<RemotePath>,
    {
        let link = link.into();
        let target = target.into();

        let mut client = self.channel.acquire().await;
        self.channel
            .complete("symlink", link.as_str(), client.symlink(link.as_str(), target.as_str()))
            .await
    }

    async fn rename_with(&self, source: &RemotePath, destination: &RemotePath, flags: RenameFlags) -> SftpResult<()> {
        let mut client = self.channel.acquire().await;
        self.channel
            .complete(
                "rename",
                source.as_str(),
                client.rename(source.as_str(), destination.as_str(), flags),
            )
            .await
    }

    /// Renames `source` to `destination`.
    ///
    /// If the server refuses because the destination exists the error is
    /// [`Error::TargetExists`]. Servers that do not know about atomic renames
    /// are retried without the atomic flag for
    /// [`OverwriteBehavior::AtomicPreferred`].
    pub async fn rename<S, D>(&self, source: S, destination: D, overwrite: OverwriteBehavior) -> SftpResult<()>
    where
        S: Into<RemotePath>,
        D: Into<RemotePath>,
    {
        let source = source.into();
        let destination = destination.into();

        let result = match self.rename_with(&source, &destination, overwrite.flags()).await {
            Err(e)
                if overwrite == OverwriteBehavior::AtomicPreferred
                    && e.status_code() == Some(StatusCode::OpUnsupported) =>
            {
                debug!("atomic rename of {source} unsupported, retrying without");
                self.rename_with(&source, &destination, RenameFlags::OVERWRITE)
                    .await
            }
            result => result,
        };

        let error = match result {
            Ok(()) => return Ok(()),
            Err(error) => error,
        };

        let exists = match error.status_code() {
            Some(StatusCode::FileAlreadyExists) => true,
            Some(StatusCode::Failure) => matches!(
                self.path_status(&destination).await,
                Ok(PathStatus::Directory | PathStatus::NonDirectory)
            ),
            _ => false,
        };

        match error {
            Error::Sftp { message, .. } if exists => Err(Error::TargetExists {
                path: destination.to_string(),
                message,
            }),
            error => Err(error),
        }
    }

    /// Status of `path` itself; a symlink is a non-directory
    pub async fn path_status<P: Into<RemotePath>>(&self, path: P) -> SftpResult<PathStatus> {
        match self.attributes(path, false).await {
            Ok(attrs) if attrs.is_dir() => Ok(PathStatus::Directory),
            Ok(_) => Ok(PathStatus::NonDirectory),
            Err(e) if e.is_not_found() => Ok(PathStatus::Nonexistent),
            Err(e) => Err(e),
        }
    }

    async fn unlink(&self, path: &RemotePath) -> SftpResult<()> {
        let mut client = self.channel.acquire().await;
        self.channel
            .complete("unlink", path.as_str(), client.unlink(path.as_str()))
            .await
    }

    async fn rmdir(&self, path: &RemotePath) -> SftpResult<()> {
        let result = {
            let mut client = self.channel.acquire().await;
            self.channel
                .complete("rmdir", path.as_str(), client.rmdir(path.as_str()))
                .await
        };

        match result {
            Err(Error::Sftp {
                code: StatusCode::DirNotEmpty,
                message,
                ..
            }) => Err(Error::DirectoryNotEmpty {
                path: path.to_string(),
                message,
            }),
            result => result,
        }
    }

    /// Removes a file, symlink or empty directory. Returns `false` if there
    /// was nothing to remove.
    pub async fn remove<P: Into<RemotePath>>(&self, target: P) -> SftpResult<bool> {
        let target = target.into();

        let result = match self.path_status(&target).await? {
            PathStatus::Nonexistent => return Ok(false),
            PathStatus::Directory => self.rmdir(&target).await,
            PathStatus::NonDirectory => self.unlink(&target).await,
        };

        match result {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Removes `target` and, for a directory, everything below it.
    ///
    /// Returns the number of files and directories actually removed. Children
    /// disappearing while the tree is walked are skipped; any other failure
    /// stops the removal, leaving what was not reached yet in place.
    pub async fn remove_all<P: Into<RemotePath>>(&self, target: P) -> SftpResult<u64> {
        let target = target.into();

        match self.path_status(&target).await? {
            PathStatus::Nonexistent => Ok(0),
            PathStatus::NonDirectory => match self.unlink(&target).await {
                Ok(()) => Ok(1),
                Err(e) if e.is_not_found() => Ok(0),
                Err(e) => Err(e),
            },
            PathStatus::Directory => self.remove_tree(&target).await,
        }
    }

    fn remove_tree<'a>(&'a self, directory: &'a RemotePath) -> BoxedFuture<'a, SftpResult<u64>> {
        Box::pin(async move {
            let mut count = 0;

            for entry in self.read_dir(directory).await? {
                let removed = if entry.attributes().is_dir() {
                    self.remove_tree(entry.path()).await
                } else {
                    self.unlink(entry.path()).await.map(|()| 1)
                };

                match removed {
                    Ok(n) => count += n,
                    Err(e) if e.is_not_found() => debug!("{} vanished during removal", entry.path()),
                    Err(e) => return Err(e),
                }
            }

            match self.rmdir(directory).await {
                Ok(()) => Ok(count + 1),
                Err(e) if e.is_not_found() => Ok(count),
                Err(e) => Err(e),
            }
        })
    }

    /// Creates the directory `path` with the configured mode.
    ///
    /// Returns `false` if a directory already exists there. Any other
    /// failure, including a non-directory in the way, is an error.
    pub async fn create_directory<P: Into<RemotePath>>(&self, path: P) -> SftpResult<bool> {
        let path = path.into();
        let mode = self.options().directory_mode;

        let result = {
            let mut client = self.channel.acquire().await;
            self.channel
                .complete("mkdir", path.as_str(), client.mkdir(path.as_str(), mode))
                .await
        };

        match result {
            Ok(()) => Ok(true),
            Err(error) => match self.path_status(&path).await {
                Ok(PathStatus::Directory) => Ok(false),
                _ => Err(error),
            },
        }
    }

    /// Opens `path` for reading, or creates and truncates it for writing
    pub async fn open_stream<P: Into<RemotePath>>(&self, path: P, writable: bool) -> SftpResult<RemoteFile<C>> {
        let path = path.into();
        let mode = self.options().file_mode;

        let handle = {
            let mut client = self.channel.acquire().await;
            self.channel
                .complete(
                    "open",
                    path.as_str(),
                    client.open(path.as_str(), OpenFlags::for_stream(writable), mode),
                )
                .await?
        };

        Ok(RemoteFile::new(&self.channel, handle, path))
    }
}
