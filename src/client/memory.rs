//! An SFTP server living in process memory.
//!
//! Behaves like a version 3 OpenSSH server closely enough to exercise the
//! filesystem: the same status codes for the same mistakes, `.` and `..` in
//! every listing, the swapped `SSH_FXP_SYMLINK` arguments, and no atomic
//! rename unless asked for. Faults can be injected per request.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::SystemTime,
};

use super::{SessionProvider, SftpClient};
use crate::{
    protocol::{
        FileAttributes, FileMode, Handle, OpenFlags, RenameFlags, Status, StatusCode,
    },
    utils,
};

const MAX_LINK_DEPTH: usize = 32;
const UID: u32 = 1000;
const GID: u32 = 1000;

#[derive(Debug, Clone)]
enum Node {
    File { data: Vec<u8>, mode: u32, mtime: u32 },
    Directory { mode: u32, mtime: u32 },
    Symlink { target: String },
}

impl Node {
    fn attributes(&self) -> FileAttributes {
        let (size, permissions, mtime) = match self {
            Self::File { data, mode, mtime } => (data.len() as u64, FileMode::REG.bits() | mode, *mtime),
            Self::Directory { mode, mtime } => (4096, FileMode::DIR.bits() | mode, *mtime),
            Self::Symlink { target } => (target.len() as u64, FileMode::LNK.bits() | 0o777, 0),
        };

        FileAttributes {
            size: Some(size),
            uid: Some(UID),
            gid: Some(GID),
            permissions: Some(permissions),
            atime: Some(mtime),
            mtime: Some(mtime),
        }
    }
}

#[derive(Debug)]
enum OpenHandle {
    Directory(VecDeque<(String, FileAttributes)>),
    File { path: String, append: bool },
}

#[derive(Debug)]
struct State {
    nodes: BTreeMap<String, Node>,
    handles: HashMap<Handle, OpenHandle>,
    next_handle: u64,
    faults: HashMap<String, Status>,
    atomic_rename: bool,
    swapped_symlink_arguments: bool,
    closed_channels: usize,
}

/// Shared state of the in-memory server. Clones see the same files.
#[derive(Debug, Clone)]
pub struct MemoryServer {
    state: Arc<Mutex<State>>,
}

/// A channel to a [`MemoryServer`]
#[derive(Debug)]
pub struct MemoryClient {
    server: MemoryServer,
}

fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            segment => parts.push(segment),
        }
    }

    format!("/{}", parts.join("/"))
}

fn parent_of(path: &str) -> Option<&str> {
    match path.rfind('/') {
        _ if path == "/" => None,
        Some(0) => Some("/"),
        Some(index) => Some(&path[..index]),
        None => None,
    }
}

fn name_of(path: &str) -> &str {
    path.rfind('/').map_or(path, |index| &path[index + 1..])
}

fn is_within(path: &str, dir: &str) -> bool {
    path == dir || path.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
}

/// Copies as much of `value` as fits and returns the full length, leaving a
/// terminating NUL when there is room for one.
fn fill(buf: &mut [u8], value: &[u8]) -> usize {
    let len = value.len().min(buf.len());
    buf[..len].copy_from_slice(&value[..len]);
    if len < buf.len() {
        buf[len] = 0;
    }
    value.len()
}

fn long_entry(name: &str, attrs: &FileAttributes) -> String {
    let date = attrs
        .modified()
        .map(|time| time.format("%b %e %H:%M").to_string())
        .unwrap_or_default();

    format!(
        "{} 1 {} {} {:>8} {} {}",
        attrs.permissions_string(),
        attrs.uid.unwrap_or(0),
        attrs.gid.unwrap_or(0),
        attrs.size.unwrap_or(0),
        date,
        name
    )
}

fn status<M: Into<String>>(code: StatusCode, message: M) -> Status {
    Status::new(code, message)
}

impl State {
    fn fault(&mut self, api: &str) -> Result<(), Status> {
        match self.faults.remove(api) {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }

    fn node(&self, path: &str) -> Result<&Node, Status> {
        self.nodes
            .get(path)
            .ok_or_else(|| status(StatusCode::NoSuchFile, "No such file"))
    }

    /// Follows symlinks at the end of `path`
    fn resolve(&self, path: &str) -> Result<String, Status> {
        let mut current = normalize(path);

        for _ in 0..MAX_LINK_DEPTH {
            match self.node(&current)? {
                Node::Symlink { target } if target.starts_with('/') => current = normalize(target),
                Node::Symlink { target } => {
                    let base = parent_of(&current).unwrap_or("/");
                    current = normalize(&format!("{base}/{target}"));
                }
                _ => return Ok(current),
            }
        }

        Err(status(StatusCode::LinkLoop, "Too many levels of symbolic links"))
    }

    fn require_parent_dir(&self, path: &str) -> Result<(), Status> {
        let parent = parent_of(path).ok_or_else(|| status(StatusCode::Failure, "Failure"))?;

        match self.node(&self.resolve(parent)?)? {
            Node::Directory { .. } => Ok(()),
            _ => Err(status(StatusCode::NoSuchFile, "No such file")),
        }
    }

    fn children(&self, dir: &str) -> Vec<String> {
        self.nodes
            .keys()
            .filter(|key| key.as_str() != dir && parent_of(key) == Some(dir))
            .cloned()
            .collect()
    }

    fn insert_handle(&mut self, handle: OpenHandle) -> Handle {
        self.next_handle += 1;
        let id = self.next_handle.to_string();
        self.handles.insert(id.clone(), handle);
        id
    }

    fn file_path(&self, handle: &str) -> Result<(String, bool), Status> {
        match self.handles.get(handle) {
            Some(OpenHandle::File { path, append }) => Ok((path.clone(), *append)),
            _ => Err(status(StatusCode::InvalidHandle, "Invalid handle")),
        }
    }

    fn file_data(&mut self, path: &str) -> Result<&mut Vec<u8>, Status> {
        match self.nodes.get_mut(path) {
            Some(Node::File { data, .. }) => Ok(data),
            _ => Err(status(StatusCode::NoSuchFile, "No such file")),
        }
    }

    fn mkdir(&mut self, path: &str, mode: u32) -> Result<(), Status> {
        let path = normalize(path);

        if self.nodes.contains_key(&path) {
            return Err(status(StatusCode::Failure, "Failure"));
        }
        self.require_parent_dir(&path)?;

        self.nodes.insert(
            path,
            Node::Directory {
                mode: mode & FileMode::PERMISSION_MASK,
                mtime: utils::unix(SystemTime::now()),
            },
        );
        Ok(())
    }

    fn open(&mut self, path: &str, flags: OpenFlags, mode: u32) -> Result<Handle, Status> {
        let path = match self.resolve(path) {
            Ok(path) => {
                if flags.contains(OpenFlags::CREATE | OpenFlags::EXCLUDE) {
                    return Err(status(StatusCode::FileAlreadyExists, "File exists"));
                }
                path
            }
            Err(e) if e.status_code == StatusCode::NoSuchFile && flags.contains(OpenFlags::CREATE) => {
                let path = normalize(path);
                self.require_parent_dir(&path)?;
                self.nodes.insert(
                    path.clone(),
                    Node::File {
                        data: Vec::new(),
                        mode: mode & FileMode::PERMISSION_MASK,
                        mtime: utils::unix(SystemTime::now()),
                    },
                );
                path
            }
            Err(e) => return Err(e),
        };

        let data = self
            .file_data(&path)
            .map_err(|_| status(StatusCode::Failure, "Is a directory"))?;
        if flags.contains(OpenFlags::TRUNCATE) {
            data.clear();
        }

        Ok(self.insert_handle(OpenHandle::File {
            path,
            append: flags.contains(OpenFlags::APPEND),
        }))
    }

    fn opendir(&mut self, path: &str) -> Result<Handle, Status> {
        let dir = self.resolve(path)?;
        let Node::Directory { .. } = self.node(&dir)? else {
            return Err(status(StatusCode::Failure, "Not a directory"));
        };

        let mut entries = VecDeque::new();
        entries.push_back((".".to_owned(), self.node(&dir)?.attributes()));

        let parent = parent_of(&dir).unwrap_or("/");
        entries.push_back(("..".to_owned(), self.node(parent)?.attributes()));

        for child in self.children(&dir) {
            let attrs = self.node(&child)?.attributes();
            entries.push_back((name_of(&child).to_owned(), attrs));
        }

        Ok(self.insert_handle(OpenHandle::Directory(entries)))
    }

    fn rename(&mut self, oldpath: &str, newpath: &str, flags: RenameFlags) -> Result<(), Status> {
        let source = normalize(oldpath);
        let target = normalize(newpath);

        self.node(&source)?;
        self.require_parent_dir(&target)?;

        if flags.contains(RenameFlags::ATOMIC) && !self.atomic_rename {
            return Err(status(StatusCode::OpUnsupported, "Operation unsupported"));
        }

        if source == target {
            return Ok(());
        }

        if is_within(&target, &source) {
            return Err(status(StatusCode::Failure, "Invalid argument"));
        }

        if let Some(existing) = self.nodes.get(&target) {
            if !flags.contains(RenameFlags::OVERWRITE) {
                return Err(status(StatusCode::Failure, "Failure"));
            }
            if matches!(existing, Node::Directory { .. }) && !self.children(&target).is_empty() {
                return Err(status(StatusCode::Failure, "Directory not empty"));
            }
            self.nodes.remove(&target);
        }

        let moved: Vec<String> = self
            .nodes
            .keys()
            .filter(|key| is_within(key, &source))
            .cloned()
            .collect();

        for key in moved {
            if let Some(node) = self.nodes.remove(&key) {
                let renamed = format!("{target}{}", &key[source.len()..]);
                self.nodes.insert(renamed, node);
            }
        }

        Ok(())
    }

    fn unlink(&mut self, path: &str) -> Result<(), Status> {
        let path = normalize(path);

        match self.node(&path)? {
            Node::Directory { .. } => Err(status(StatusCode::Failure, "Is a directory")),
            _ => {
                self.nodes.remove(&path);
                Ok(())
            }
        }
    }

    fn rmdir(&mut self, path: &str) -> Result<(), Status> {
        let path = normalize(path);

        match self.node(&path)? {
            Node::Directory { .. } if path == "/" => Err(status(StatusCode::PermissionDenied, "Permission denied")),
            Node::Directory { .. } if !self.children(&path).is_empty() => {
                Err(status(StatusCode::DirNotEmpty, "Directory not empty"))
            }
            Node::Directory { .. } => {
                self.nodes.remove(&path);
                Ok(())
            }
            _ => Err(status(StatusCode::NotADirectory, "Not a directory")),
        }
    }

    fn symlink(&mut self, linkpath: &str, targetpath: &str) -> Result<(), Status> {
        let (link, target) = if self.swapped_symlink_arguments {
            (targetpath, linkpath)
        } else {
            (linkpath, targetpath)
        };

        let link = normalize(link);
        if self.nodes.contains_key(&link) {
            return Err(status(StatusCode::Failure, "Failure"));
        }
        self.require_parent_dir(&link)?;

        self.nodes.insert(
            link,
            Node::Symlink {
                target: target.to_owned(),
            },
        );
        Ok(())
    }
}

impl MemoryServer {
    /// An empty server holding only the root directory
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "/".to_owned(),
            Node::Directory {
                mode: 0o755,
                mtime: utils::unix(SystemTime::now()),
            },
        );

        Self {
            state: Arc::new(Mutex::new(State {
                nodes,
                handles: HashMap::new(),
                next_handle: 0,
                faults: HashMap::new(),
                atomic_rename: false,
                swapped_symlink_arguments: true,
                closed_channels: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `SSH_FXP_RENAME` honours the atomic flag. Off by default, as
    /// with OpenSSH, so atomic renames are answered with `OpUnsupported`.
    #[must_use]
    pub fn with_atomic_rename(self, supported: bool) -> Self {
        self.lock().atomic_rename = supported;
        self
    }

    /// Whether `SSH_FXP_SYMLINK` reads its first argument as the target, the
    /// way OpenSSH does. On by default.
    #[must_use]
    pub fn with_swapped_symlink_arguments(self, swapped: bool) -> Self {
        self.lock().swapped_symlink_arguments = swapped;
        self
    }

    /// Makes the next request of kind `api` (`"stat"`, `"readdir"`,
    /// `"open_channel"`, ...) fail with `status`
    pub fn fail_next<S: Into<Status>>(&self, api: &str, status: S) {
        self.lock().faults.insert(api.to_owned(), status.into());
    }

    /// Opens a new channel
    #[must_use]
    pub fn client(&self) -> MemoryClient {
        MemoryClient {
            server: self.clone(),
        }
    }

    /// Number of file and directory handles not closed yet
    #[must_use]
    pub fn open_handles(&self) -> usize {
        self.lock().handles.len()
    }

    /// Number of channels shut down so far
    #[must_use]
    pub fn closed_channels(&self) -> usize {
        self.lock().closed_channels
    }

    pub fn create_dir_all(&self, path: &str) -> Result<(), Status> {
        let path = normalize(path);
        let mut state = self.lock();
        let mut current = String::new();

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = format!("{current}/{segment}");
            match state.nodes.get(&current) {
                Some(Node::Directory { .. }) => {}
                Some(_) => return Err(status(StatusCode::Failure, "Not a directory")),
                None => state.mkdir(&current, 0o755)?,
            }
        }

        Ok(())
    }

    /// Creates or replaces a file, creating missing parent directories
    pub fn write_file(&self, path: &str, data: &[u8]) -> Result<(), Status> {
        let path = normalize(path);
        if let Some(parent) = parent_of(&path) {
            self.create_dir_all(parent)?;
        }

        let mut state = self.lock();
        if let Some(Node::Directory { .. }) = state.nodes.get(&path) {
            return Err(status(StatusCode::Failure, "Is a directory"));
        }

        state.nodes.insert(
            path,
            Node::File {
                data: data.to_vec(),
                mode: 0o644,
                mtime: utils::unix(SystemTime::now()),
            },
        );
        Ok(())
    }

    pub fn read_file(&self, path: &str) -> Result<Vec<u8>, Status> {
        let state = self.lock();
        let path = state.resolve(path)?;

        match state.node(&path)? {
            Node::File { data, .. } => Ok(data.clone()),
            _ => Err(status(StatusCode::Failure, "Is a directory")),
        }
    }

    /// Creates a symlink at `link` pointing to `target`, unaffected by the
    /// swapped-arguments quirk
    pub fn add_symlink(&self, link: &str, target: &str) -> Result<(), Status> {
        let mut state = self.lock();
        let swapped = state.swapped_symlink_arguments;
        state.swapped_symlink_arguments = false;
        let result = state.symlink(link, target);
        state.swapped_symlink_arguments = swapped;
        result
    }

    /// Symlink target stored at `link`, if `link` is a symlink
    #[must_use]
    pub fn link_target(&self, link: &str) -> Option<String> {
        match self.lock().nodes.get(&normalize(link)) {
            Some(Node::Symlink { target }) => Some(target.clone()),
            _ => None,
        }
    }

    /// `true` if anything exists at `path`, without following symlinks
    #[must_use]
    pub fn exists(&self, path: &str) -> bool {
        self.lock().nodes.contains_key(&normalize(path))
    }

    fn with<T>(&self, api: &str, request: impl FnOnce(&mut State) -> Result<T, Status>) -> Result<T, Status> {
        let mut state = self.lock();
        state.fault(api)?;
        request(&mut *state)
    }
}

impl Default for MemoryServer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionProvider for MemoryServer {
    type Client = MemoryClient;

    async fn open_channel(&self) -> Result<MemoryClient, Status> {
        self.with("open_channel", |_| Ok(()))?;
        Ok(self.client())
    }
}

#[async_trait]
impl SftpClient for MemoryClient {
    async fn stat(&mut self, path: &str, follow_links: bool) -> Result<FileAttributes, Status> {
        let api = if follow_links { "stat" } else { "lstat" };

        self.server.with(api, |state| {
            let path = if follow_links {
                state.resolve(path)?
            } else {
                normalize(path)
            };
            Ok(state.node(&path)?.attributes())
        })
    }

    async fn opendir(&mut self, path: &str) -> Result<Handle, Status> {
        self.server.with("opendir", |state| state.opendir(path))
    }

    async fn readdir(
        &mut self,
        handle: &str,
        filename: &mut [u8],
        long_entry_buf: &mut [u8],
    ) -> Result<(usize, FileAttributes), Status> {
        self.server.with("readdir", |state| {
            let Some(OpenHandle::Directory(entries)) = state.handles.get_mut(handle) else {
                return Err(status(StatusCode::InvalidHandle, "Invalid handle"));
            };

            match entries.pop_front() {
                None => Ok((0, FileAttributes::default())),
                Some((name, attrs)) => {
                    fill(long_entry_buf, long_entry(&name, &attrs).as_bytes());
                    Ok((fill(filename, name.as_bytes()), attrs))
                }
            }
        })
    }

    async fn close(&mut self, handle: &str) -> Result<(), Status> {
        self.server.with("close", |state| match state.handles.remove(handle) {
            Some(_) => Ok(()),
            None => Err(status(StatusCode::InvalidHandle, "Invalid handle")),
        })
    }

    async fn open(&mut self, path: &str, flags: OpenFlags, mode: u32) -> Result<Handle, Status> {
        self.server.with("open", |state| state.open(path, flags, mode))
    }

    async fn read(&mut self, handle: &str, offset: u64, buf: &mut [u8]) -> Result<usize, Status> {
        self.server.with("read", |state| {
            let (path, _) = state.file_path(handle)?;
            let data = state.file_data(&path)?;

            let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
            let len = (data.len() - start).min(buf.len());
            buf[..len].copy_from_slice(&data[start..start + len]);
            Ok(len)
        })
    }

    async fn write(&mut self, handle: &str, offset: u64, bytes: &[u8]) -> Result<(), Status> {
        self.server.with("write", |state| {
            let (path, append) = state.file_path(handle)?;
            let data = state.file_data(&path)?;

            let start = if append {
                data.len()
            } else {
                usize::try_from(offset).map_err(|_| status(StatusCode::Failure, "Offset too large"))?
            };
            let end = start + bytes.len();
            if data.len() < end {
                data.resize(end, 0);
            }
            data[start..end].copy_from_slice(bytes);
            Ok(())
        })
    }

    async fn fstat(&mut self, handle: &str) -> Result<FileAttributes, Status> {
        self.server.with("fstat", |state| {
            let (path, _) = state.file_path(handle)?;
            Ok(state.node(&path)?.attributes())
        })
    }

    async fn rename(&mut self, oldpath: &str, newpath: &str, flags: RenameFlags) -> Result<(), Status> {
        self.server.with("rename", |state| state.rename(oldpath, newpath, flags))
    }

    async fn unlink(&mut self, path: &str) -> Result<(), Status> {
        self.server.with("unlink", |state| state.unlink(path))
    }

    async fn rmdir(&mut self, path: &str) -> Result<(), Status> {
        self.server.with("rmdir", |state| state.rmdir(path))
    }

    async fn mkdir(&mut self, path: &str, mode: u32) -> Result<(), Status> {
        self.server.with("mkdir", |state| state.mkdir(path, mode))
    }

    async fn readlink(&mut self, path: &str, target: &mut [u8]) -> Result<usize, Status> {
        self.server.with("readlink", |state| match state.node(&normalize(path))? {
            Node::Symlink { target: value } => Ok(fill(target, value.as_bytes())),
            _ => Err(status(StatusCode::Failure, "Not a symbolic link")),
        })
    }

    async fn realpath(&mut self, path: &str, target: &mut [u8]) -> Result<usize, Status> {
        self.server.with("realpath", |state| {
            let path = state.resolve(path)?;
            Ok(fill(target, path.as_bytes()))
        })
    }

    async fn symlink(&mut self, linkpath: &str, targetpath: &str) -> Result<(), Status> {
        self.server.with("symlink", |state| state.symlink(linkpath, targetpath))
    }

    fn close_channel(&mut self) {
        self.server.lock().closed_channels += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn names(client: &mut MemoryClient, handle: &str) -> Result<Vec<String>, Status> {
        let mut names = Vec::new();
        let mut filename = [0u8; 64];
        let mut long = [0u8; 128];

        loop {
            match client.readdir(handle, &mut filename, &mut long).await? {
                (0, _) => return Ok(names),
                (len, _) => names.push(utils::decode_counted(&filename, len)),
            }
        }
    }

    #[tokio::test]
    async fn listing_includes_dot_entries_then_sorted_children() -> anyhow::Result<()> {
        let server = MemoryServer::new();
        server.write_file("/srv/b.txt", b"b")?;
        server.write_file("/srv/a.txt", b"a")?;
        server.create_dir_all("/srv/sub/deeper")?;

        let mut client = server.client();
        let handle = client.opendir("/srv").await?;

        assert_eq!(names(&mut client, &handle).await?, [".", "..", "a.txt", "b.txt", "sub"]);
        client.close(&handle).await?;
        assert_eq!(server.open_handles(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn errors_match_openssh() -> anyhow::Result<()> {
        let server = MemoryServer::new();
        server.write_file("/full/file", b"x")?;
        let mut client = server.client();

        let code = |r: Result<(), Status>| r.err().map(|s| s.status_code);

        assert_eq!(code(client.mkdir("/full", 0o755).await), Some(StatusCode::Failure));
        assert_eq!(code(client.rmdir("/full").await), Some(StatusCode::DirNotEmpty));
        assert_eq!(code(client.unlink("/missing").await), Some(StatusCode::NoSuchFile));
        assert_eq!(code(client.close("nonsense").await), Some(StatusCode::InvalidHandle));
        assert_eq!(
            code(client.rename("/full/file", "/full", RenameFlags::empty()).await),
            Some(StatusCode::Failure)
        );
        assert_eq!(
            code(client.rename("/full/file", "/other", RenameFlags::ATOMIC).await),
            Some(StatusCode::OpUnsupported)
        );
        Ok(())
    }

    #[tokio::test]
    async fn symlink_arguments_are_swapped_like_openssh() -> anyhow::Result<()> {
        let server = MemoryServer::new();
        server.write_file("/data/real.txt", b"x")?;
        let mut client = server.client();

        client.symlink("/data/real.txt", "/data/link").await?;
        assert_eq!(server.link_target("/data/link").as_deref(), Some("/data/real.txt"));

        let server = server.with_swapped_symlink_arguments(false);
        client.symlink("/data/link2", "real.txt").await?;
        assert_eq!(server.link_target("/data/link2").as_deref(), Some("real.txt"));

        let attrs = client.stat("/data/link2", true).await?;
        assert!(attrs.is_regular());
        Ok(())
    }

    #[tokio::test]
    async fn symlink_loops_are_detected() -> anyhow::Result<()> {
        let server = MemoryServer::new();
        server.add_symlink("/a", "/b")?;
        server.add_symlink("/b", "/a")?;

        let error = server.client().stat("/a", true).await.err();
        assert_eq!(error.map(|s| s.status_code), Some(StatusCode::LinkLoop));
        Ok(())
    }

    #[tokio::test]
    async fn injected_fault_fires_once() -> anyhow::Result<()> {
        let server = MemoryServer::new();
        server.fail_next("lstat", StatusCode::PermissionDenied);
        let mut client = server.client();

        assert!(client.stat("/", false).await.is_err());
        assert!(client.stat("/", false).await?.is_dir());
        Ok(())
    }

    #[tokio::test]
    async fn files_read_back_what_was_written() -> anyhow::Result<()> {
        let server = MemoryServer::new();
        let mut client = server.client();

        let handle = client.open("/new.bin", OpenFlags::for_stream(true), 0o600).await?;
        client.write(&handle, 0, b"hello").await?;
        client.write(&handle, 5, b" world").await?;
        assert_eq!(client.fstat(&handle).await?.size, Some(11));
        client.close(&handle).await?;

        let handle = client.open("/new.bin", OpenFlags::READ, 0).await?;
        let mut buf = [0u8; 8];
        assert_eq!(client.read(&handle, 6, &mut buf).await?, 5);
        assert_eq!(&buf[..5], b"world");
        assert_eq!(client.read(&handle, 11, &mut buf).await?, 0);
        client.close(&handle).await?;

        assert_eq!(client.stat("/new.bin", true).await?.mode(), Some(0o600));
        Ok(())
    }
}
