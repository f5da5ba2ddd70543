use std::{
    collections::VecDeque,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};
use tokio::runtime;

use super::{channel::ChannelState, RemotePath};
use crate::{
    client::SftpClient,
    error::{Error, SftpResult},
    protocol::{FileAttributes, FileType, Handle},
    utils,
};

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    path: RemotePath,
    long_entry: String,
    attributes: FileAttributes,
}

impl DirectoryEntry {
    /// Full path of the entry: the listed directory joined with its name
    #[must_use]
    pub fn path(&self) -> &RemotePath {
        &self.path
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        self.path.filename().unwrap_or_default()
    }

    /// The `ls -l` style line the server sent along with the name
    #[must_use]
    pub fn long_entry(&self) -> &str {
        &self.long_entry
    }

    #[must_use]
    pub fn attributes(&self) -> &FileAttributes {
        &self.attributes
    }

    #[must_use]
    pub fn file_type(&self) -> FileType {
        self.attributes.file_type()
    }
}

#[derive(Debug, Default)]
struct Position {
    handle: Option<Handle>,
    entry: Option<DirectoryEntry>,
}

struct CursorState<C: SftpClient> {
    channel: Weak<ChannelState<C>>,
    directory: RemotePath,
    position: Mutex<Position>,
}

impl<C: SftpClient> CursorState<C> {
    fn position(&self) -> MutexGuard<'_, Position> {
        self.position.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: SftpClient> Drop for CursorState<C> {
    fn drop(&mut self) {
        let position = self.position.get_mut().unwrap_or_else(PoisonError::into_inner);
        let Some(handle) = position.handle.take() else {
            return;
        };
        let Some(channel) = self.channel.upgrade() else {
            return;
        };

        if let Ok(runtime) = runtime::Handle::try_current() {
            let directory = self.directory.clone();

            runtime.spawn(async move {
                let mut client = channel.acquire().await;
                if let Err(status) = client.close(&handle).await {
                    warn!("failed to close listing of {directory}: {status}");
                }
            });
        }
    }
}

/// Position in the listing of a remote directory.
///
/// A freshly opened cursor already holds the first entry. Clones share the
/// server handle and the position: advancing one advances them all. Once the
/// listing is exhausted the handle is released and every clone compares equal
/// to [`DirectoryCursor::end`].
///
/// The cursor reports `.` and `..` like any other entry.
pub struct DirectoryCursor<C: SftpClient> {
    inner: Option<Arc<CursorState<C>>>,
}

impl<C: SftpClient> DirectoryCursor<C> {
    /// The end of every listing
    #[must_use]
    pub const fn end() -> Self {
        Self { inner: None }
    }

    pub(crate) async fn open(channel: &Arc<ChannelState<C>>, directory: RemotePath) -> SftpResult<Self> {
        let handle = {
            let mut client = channel.acquire().await;
            channel
                .complete("opendir", directory.as_str(), client.opendir(directory.as_str()))
                .await?
        };

        let mut cursor = Self {
            inner: Some(Arc::new(CursorState {
                channel: Arc::downgrade(channel),
                directory,
                position: Mutex::new(Position {
                    handle: Some(handle),
                    entry: None,
                }),
            })),
        };

        cursor.advance().await?;
        Ok(cursor)
    }

    #[must_use]
    pub fn is_end(&self) -> bool {
        self.inner
            .as_ref()
            .map_or(true, |state| state.position().handle.is_none())
    }

    /// The entry the cursor is positioned on
    pub fn entry(&self) -> SftpResult<DirectoryEntry> {
        self.inner
            .as_ref()
            .and_then(|state| state.position().entry.clone())
            .ok_or(Error::EndOfDirectory)
    }

    /// Fetches the next entry, or moves to the end and releases the handle
    /// when there is none.
    pub async fn advance(&mut self) -> SftpResult<()> {
        let state = self.inner.clone().ok_or(Error::EndOfDirectory)?;
        let handle = state.position().handle.clone();
        let Some(handle) = handle else {
            self.inner = None;
            return Err(Error::EndOfDirectory);
        };

        let channel = state.channel.upgrade().ok_or(Error::ChannelClosed)?;
        let options = channel.options();
        let mut filename = vec![0u8; options.filename_buffer_len];
        let mut long_entry = vec![0u8; options.long_entry_buffer_len];

        let (len, attributes) = {
            let mut client = channel.acquire().await;
            channel
                .complete(
                    "readdir",
                    state.directory.as_str(),
                    client.readdir(&handle, &mut filename, &mut long_entry),
                )
                .await?
        };

        if len == 0 {
            debug!("end of listing for {}", state.directory);
            *state.position() = Position::default();
            self.inner = None;

            let mut client = channel.acquire().await;
            return channel
                .complete("close", state.directory.as_str(), client.close(&handle))
                .await;
        }

        let entry = DirectoryEntry {
            path: state.directory.join(utils::decode_counted(&filename, len)),
            long_entry: utils::decode_terminated(&mut long_entry),
            attributes,
        };
        state.position().entry = Some(entry);
        Ok(())
    }
}

impl<C: SftpClient> Clone for DirectoryCursor<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: SftpClient> Default for DirectoryCursor<C> {
    fn default() -> Self {
        Self::end()
    }
}

impl<C: SftpClient> PartialEq for DirectoryCursor<C> {
    fn eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            _ if self.is_end() && other.is_end() => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<C: SftpClient> fmt::Debug for DirectoryCursor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(state) if !self.is_end() => f
                .debug_struct("DirectoryCursor")
                .field("directory", &state.directory)
                .field("entry", &state.position().entry)
                .finish(),
            _ => f.write_str("DirectoryCursor(end)"),
        }
    }
}

/// Iterator over the entries in a remote directory, without `.` and `..`.
#[derive(Debug)]
pub struct ReadDir {
    pub(crate) entries: VecDeque<DirectoryEntry>,
}

impl Iterator for ReadDir {
    type Item = DirectoryEntry;

    fn next(&mut self) -> Option<Self::Item> {
        match self.entries.pop_front() {
            None => None,
            Some(entry) if entry.filename() == "." || entry.filename() == ".." => self.next(),
            Some(entry) => Some(entry),
        }
    }
}
