use std::{
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tokio::sync::{Mutex, MutexGuard};

use crate::{
    client::{SessionProvider, SftpClient},
    config::Options,
    error::{Error, SftpResult},
    protocol::Status,
};

/// Exclusive access to the protocol client for one round trip
pub(crate) type ChannelLock<'a, C> = MutexGuard<'a, C>;

/// The single SFTP channel a filesystem talks through.
///
/// Owned by one [`SftpFilesystem`](super::SftpFilesystem); directory cursors
/// and open files only hold a `Weak` to it. Every request takes the lock for
/// the duration of its round trip, so requests from different tasks are
/// serialized and never interleave on the wire. The lock is not reentrant:
/// it must be released before anything else acquires it.
pub(crate) struct ChannelState<C: SftpClient> {
    client: Mutex<C>,
    options: Options,
    timeout_secs: AtomicU64,
}

impl<C: SftpClient> ChannelState<C> {
    pub(crate) fn new(client: C, options: Options) -> Self {
        Self {
            client: Mutex::new(client),
            timeout_secs: AtomicU64::new(options.timeout_secs),
            options,
        }
    }

    /// Starts a channel on an authenticated session
    pub(crate) async fn open<P>(session: &P, options: Options) -> SftpResult<Self>
    where
        P: SessionProvider<Client = C>,
    {
        let client = session
            .open_channel()
            .await
            .map_err(|status| Error::Connection(status.to_string()))?;

        debug!("sftp channel started");
        Ok(Self::new(client, options))
    }

    pub(crate) fn options(&self) -> &Options {
        &self.options
    }

    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.load(Ordering::Relaxed))
    }

    pub(crate) fn set_timeout(&self, secs: u64) {
        self.timeout_secs.store(secs, Ordering::Relaxed);
    }

    /// Waits for exclusive use of the channel. Dropping the guard releases it.
    pub(crate) async fn acquire(&self) -> ChannelLock<'_, C> {
        self.client.lock().await
    }

    /// Awaits a request made through a [`ChannelLock`], bounded by the
    /// timeout, and gives failures the context of `api` and `path`.
    pub(crate) async fn complete<T, F>(&self, api: &'static str, path: &str, request: F) -> SftpResult<T>
    where
        F: Future<Output = Result<T, Status>>,
    {
        match tokio::time::timeout(self.timeout(), request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(status)) => Err(Error::sftp(api, path, status)),
            Err(_) => Err(Error::Timeout {
                api,
                path: path.to_owned(),
            }),
        }
    }
}

impl<C: SftpClient> Drop for ChannelState<C> {
    fn drop(&mut self) {
        debug!("closing sftp channel");
        self.client.get_mut().close_channel();
    }
}
