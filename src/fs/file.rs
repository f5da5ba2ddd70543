use std::{
    future::Future,
    io::{self, SeekFrom},
    pin::Pin,
    sync::{Arc, Weak},
    task::{ready, Context, Poll},
};
use tokio::{
    io::{AsyncRead, AsyncSeek, AsyncWrite, ReadBuf},
    runtime,
};

use super::{channel::ChannelState, RemotePath};
use crate::{
    client::SftpClient,
    error::{Error, SftpResult},
    protocol::{FileAttributes, Handle},
};

type StateFn<T> = Option<Pin<Box<dyn Future<Output = io::Result<T>> + Send + 'static>>>;

struct FileState {
    f_read: StateFn<Vec<u8>>,
    f_seek: StateFn<u64>,
    f_write: StateFn<usize>,
    f_shutdown: StateFn<()>,
}

fn upgrade<C: SftpClient>(channel: &Weak<ChannelState<C>>) -> SftpResult<Arc<ChannelState<C>>> {
    channel.upgrade().ok_or(Error::ChannelClosed)
}

/// Open remote file implementing [`AsyncRead`], [`AsyncWrite`] and
/// [`AsyncSeek`].
///
/// The handle is closed by [`AsyncWriteExt::shutdown`], or in the background
/// when the file is dropped without it.
///
/// # Weakness
/// Using [`SeekFrom::End`] is costly and time-consuming because we need
/// to request the actual file size from the remote server
///
/// [`AsyncWriteExt::shutdown`]: tokio::io::AsyncWriteExt::shutdown
pub struct RemoteFile<C: SftpClient> {
    channel: Weak<ChannelState<C>>,
    handle: Handle,
    path: RemotePath,
    state: FileState,
    pos: u64,
    closed: bool,
    read_len: usize,
    write_len: usize,
}

impl<C: SftpClient> RemoteFile<C> {
    pub(crate) fn new(channel: &Arc<ChannelState<C>>, handle: Handle, path: RemotePath) -> Self {
        let options = channel.options();

        Self {
            read_len: options.read_len as usize,
            write_len: options.write_len as usize,
            channel: Arc::downgrade(channel),
            handle,
            path,
            state: FileState {
                f_read: None,
                f_seek: None,
                f_write: None,
                f_shutdown: None,
            },
            pos: 0,
            closed: false,
        }
    }

    #[must_use]
    pub fn path(&self) -> &RemotePath {
        &self.path
    }

    /// Attributes of the open file, queried through its handle
    pub async fn attributes(&self) -> SftpResult<FileAttributes> {
        let channel = upgrade(&self.channel)?;
        let mut client = channel.acquire().await;
        channel
            .complete("fstat", self.path.as_str(), client.fstat(&self.handle))
            .await
    }

    /// Releases the handle. Further I/O on the file fails.
    pub async fn close(&mut self) -> SftpResult<()> {
        if self.closed {
            return Ok(());
        }

        let channel = upgrade(&self.channel)?;
        let mut client = channel.acquire().await;
        self.closed = true;
        channel
            .complete("close", self.path.as_str(), client.close(&self.handle))
            .await
    }
}

impl<C: SftpClient> Drop for RemoteFile<C> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        let Some(channel) = self.channel.upgrade() else {
            return;
        };

        if let Ok(runtime) = runtime::Handle::try_current() {
            let handle = self.handle.to_owned();
            let path = self.path.clone();

            runtime.spawn(async move {
                let mut client = channel.acquire().await;
                if let Err(status) = client.close(&handle).await {
                    warn!("failed to close {path}: {status}");
                }
            });
        }
    }
}

impl<C: SftpClient> AsyncRead for RemoteFile<C> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let channel = self.channel.clone();
        let handle = self.handle.to_owned();
        let path = self.path.clone();
        let len = buf.remaining().min(self.read_len);
        let offset = self.pos;

        let poll = Pin::new(self.state.f_read.get_or_insert_with(|| {
            Box::pin(async move {
                let channel = upgrade(&channel)?;
                let mut data = vec![0u8; len];

                let read = {
                    let mut client = channel.acquire().await;
                    channel
                        .complete("read", path.as_str(), client.read(&handle, offset, &mut data))
                        .await?
                };

                data.truncate(read.min(len));
                Ok(data)
            })
        }))
        .poll(cx);

        if poll.is_ready() {
            self.state.f_read = None;
        }

        match poll {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Ready(Ok(data)) => {
                self.pos += data.len() as u64;
                buf.put_slice(&data[..]);
                Poll::Ready(Ok(()))
            }
        }
    }
}

impl<C: SftpClient> AsyncSeek for RemoteFile<C> {
    fn start_seek(mut self: Pin<&mut Self>, position: io::SeekFrom) -> io::Result<()> {
        match self.state.f_seek {
            Some(_) => Err(io::Error::new(
                io::ErrorKind::Other,
                "other file operation is pending, call poll_complete before start_seek",
            )),
            None => {
                let channel = self.channel.clone();
                let handle = self.handle.to_owned();
                let path = self.path.clone();
                let cur_pos = self.pos as i64;

                self.state.f_seek = Some(Box::pin(async move {
                    let new_pos = match position {
                        SeekFrom::Start(pos) => pos as i64,
                        SeekFrom::Current(pos) => cur_pos + pos,
                        SeekFrom::End(pos) => {
                            let channel = upgrade(&channel)?;
                            let attrs = {
                                let mut client = channel.acquire().await;
                                channel
                                    .complete("fstat", path.as_str(), client.fstat(&handle))
                                    .await?
                            };

                            match attrs.size {
                                Some(size) => size as i64 + pos,
                                None => {
                                    return Err(io::Error::new(
                                        io::ErrorKind::Other,
                                        "file size unknown",
                                    ))
                                }
                            }
                        }
                    };

                    if new_pos < 0 {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidInput,
                            "cannot move file pointer before the beginning",
                        ));
                    }

                    Ok(new_pos as u64)
                }));

                Ok(())
            }
        }
    }

    fn poll_complete(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        match self.state.f_seek.as_mut() {
            None => Poll::Ready(Ok(self.pos)),
            Some(f) => {
                let result = ready!(Pin::new(f).poll(cx));
                self.state.f_seek = None;
                self.pos = result?;
                Poll::Ready(Ok(self.pos))
            }
        }
    }
}

impl<C: SftpClient> AsyncWrite for RemoteFile<C> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, io::Error>> {
        let channel = self.channel.clone();
        let handle = self.handle.to_owned();
        let path = self.path.clone();
        let offset = self.pos;
        let len = buf.len().min(self.write_len);
        let data = buf[..len].to_vec();

        let poll = Pin::new(self.state.f_write.get_or_insert_with(|| {
            Box::pin(async move {
                let channel = upgrade(&channel)?;
                let mut client = channel.acquire().await;
                channel
                    .complete("write", path.as_str(), client.write(&handle, offset, &data))
                    .await?;

                Ok(data.len())
            })
        }))
        .poll(cx);

        if poll.is_ready() {
            self.state.f_write = None;
        }

        if let Poll::Ready(Ok(len)) = poll {
            self.pos += len as u64;
        }

        poll
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), io::Error>> {
        if self.closed {
            return Poll::Ready(Ok(()));
        }

        let channel = self.channel.clone();
        let handle = self.handle.to_owned();
        let path = self.path.clone();

        let poll = Pin::new(self.state.f_shutdown.get_or_insert_with(|| {
            Box::pin(async move {
                let channel = upgrade(&channel)?;
                let mut client = channel.acquire().await;
                channel
                    .complete("close", path.as_str(), client.close(&handle))
                    .await?;
                Ok(())
            })
        }))
        .poll(cx);

        if poll.is_ready() {
            self.state.f_shutdown = None;
            self.closed = true;
        }

        poll
    }
}
