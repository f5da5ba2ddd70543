use crate::protocol::{FileAttributes, Handle, OpenFlags, RenameFlags, Status, StatusCode};

/// Already-connected SFTP protocol client.
///
/// The narrow set of requests the filesystem needs. Implementations own the
/// packet framing and encryption; every method is one request and its
/// response. Calls are serialized by the channel, so `&mut self` is never
/// shared between two in-flight requests.
///
/// Methods filling caller buffers follow the libssh2 convention: the return
/// value is the number of bytes the value occupies, which may exceed the buffer
/// when the server's value did not fit.
#[async_trait]
pub trait SftpClient: Send + 'static {
    /// SSH_FXP_STAT, or SSH_FXP_LSTAT when `follow_links` is `false`.
    async fn stat(&mut self, path: &str, follow_links: bool) -> Result<FileAttributes, Status>;

    /// SSH_FXP_OPENDIR.
    async fn opendir(&mut self, path: &str) -> Result<Handle, Status>;

    /// Reads the next directory entry. The filename goes to `filename`
    /// (not NUL-terminated) and the `ls -l` style line to `long_entry`.
    /// Returns `0` once the listing is exhausted.
    async fn readdir(
        &mut self,
        handle: &str,
        filename: &mut [u8],
        long_entry: &mut [u8],
    ) -> Result<(usize, FileAttributes), Status>;

    /// SSH_FXP_CLOSE for both file and directory handles.
    async fn close(&mut self, handle: &str) -> Result<(), Status>;

    /// SSH_FXP_OPEN. `mode` is applied to newly created files.
    async fn open(&mut self, path: &str, flags: OpenFlags, mode: u32) -> Result<Handle, Status>;

    /// SSH_FXP_READ into `buf`. Returns `0` at end of file.
    async fn read(&mut self, handle: &str, offset: u64, buf: &mut [u8]) -> Result<usize, Status>;

    /// SSH_FXP_WRITE of the whole of `data`.
    async fn write(&mut self, handle: &str, offset: u64, data: &[u8]) -> Result<(), Status>;

    /// SSH_FXP_FSTAT.
    async fn fstat(&mut self, handle: &str) -> Result<FileAttributes, Status>;

    /// SSH_FXP_RENAME. Servers are free to ignore `flags`.
    async fn rename(&mut self, oldpath: &str, newpath: &str, flags: RenameFlags)
        -> Result<(), Status>;

    /// SSH_FXP_REMOVE.
    async fn unlink(&mut self, path: &str) -> Result<(), Status>;

    /// SSH_FXP_RMDIR.
    async fn rmdir(&mut self, path: &str) -> Result<(), Status>;

    /// SSH_FXP_MKDIR.
    async fn mkdir(&mut self, path: &str, mode: u32) -> Result<(), Status>;

    /// SSH_FXP_READLINK into `target`.
    async fn readlink(&mut self, path: &str, target: &mut [u8]) -> Result<usize, Status>;

    /// SSH_FXP_REALPATH into `target`.
    async fn realpath(&mut self, path: &str, target: &mut [u8]) -> Result<usize, Status>;

    /// SSH_FXP_SYMLINK with `linkpath` and `targetpath` in the order the
    /// protocol draft defines. See
    /// [`SftpFilesystem::create_symlink`](crate::fs::SftpFilesystem::create_symlink)
    /// for how servers actually read them.
    #[allow(unused_variables)]
    async fn symlink(&mut self, linkpath: &str, targetpath: &str) -> Result<(), Status> {
        Err(StatusCode::OpUnsupported.into())
    }

    /// Shuts the subsystem down. Called once, when the channel is dropped.
    fn close_channel(&mut self) {}
}
