use std::{
    fmt, io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    fs,
    io::{AsyncRead, AsyncSeek},
};

/// Readable and seekable stream of one source item
pub trait SourceReader: AsyncRead + AsyncSeek + Unpin + Send {}

impl<T: AsyncRead + AsyncSeek + Unpin + Send> SourceReader for T {}

/// An opened source item and its size as the source reports it
pub struct SourceStream {
    pub reader: Box<dyn SourceReader>,
    pub len: u64,
}

impl fmt::Debug for SourceStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceStream").field("len", &self.len).finish()
    }
}

/// Child of a source container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem {
    pub name: String,
    pub is_container: bool,
}

/// Hierarchy of items a transfer copies from.
///
/// Items are addressed by their branch: the path of names leading to them
/// from the source root. An item either opens as a stream or holds children;
/// [`open`](Source::open) failing is what marks an item as a container.
#[async_trait]
pub trait Source: fmt::Debug + Send + Sync {
    /// Opens the item at `branch` for reading
    async fn open(&self, branch: &Path) -> io::Result<SourceStream>;

    /// Children of the container at `branch`, in the order they should be
    /// transferred
    async fn children(&self, branch: &Path) -> io::Result<Vec<SourceItem>>;
}

/// Files and directories below a local directory
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Source for LocalSource {
    async fn open(&self, branch: &Path) -> io::Result<SourceStream> {
        let path = self.root.join(branch);
        let metadata = fs::metadata(&path).await?;

        if metadata.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is a directory", path.display()),
            ));
        }

        Ok(SourceStream {
            reader: Box::new(fs::File::open(&path).await?),
            len: metadata.len(),
        })
    }

    async fn children(&self, branch: &Path) -> io::Result<Vec<SourceItem>> {
        let mut entries = fs::read_dir(self.root.join(branch)).await?;
        let mut items = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            items.push(SourceItem {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_container: entry.file_type().await?.is_dir(),
            });
        }

        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }
}

/// One item of a source, given by its branch below the source root
#[derive(Debug, Clone)]
pub struct RootedSource {
    source: Arc<dyn Source>,
    branch: PathBuf,
}

impl RootedSource {
    pub fn new<P: Into<PathBuf>>(source: Arc<dyn Source>, branch: P) -> Self {
        Self {
            source,
            branch: branch.into(),
        }
    }

    #[must_use]
    pub fn branch(&self) -> &Path {
        &self.branch
    }

    /// The branch as shown to the user
    #[must_use]
    pub fn relative_name(&self) -> String {
        self.branch.to_string_lossy().into_owned()
    }

    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        Self {
            source: self.source.clone(),
            branch: self.branch.join(name),
        }
    }

    pub async fn open(&self) -> io::Result<SourceStream> {
        self.source.open(&self.branch).await
    }

    pub async fn children(&self) -> io::Result<Vec<SourceItem>> {
        self.source.children(&self.branch).await
    }
}
