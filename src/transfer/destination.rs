use std::fmt;

use crate::{
    error::{Error, SftpResult},
    fs::RemotePath,
};

/// A remote directory and the name of an item in it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDestination {
    directory: RemotePath,
    filename: String,
}

impl ResolvedDestination {
    #[must_use]
    pub fn directory(&self) -> &RemotePath {
        &self.directory
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    #[must_use]
    pub fn as_absolute_path(&self) -> RemotePath {
        self.directory.join(&self.filename)
    }
}

impl fmt::Display for ResolvedDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_absolute_path())
    }
}

/// Where a transferred item goes: a multi-level path relative to the
/// directory the transfer targets.
///
/// The directories named by the intermediate segments need not exist yet.
/// They are created by earlier operations of the same plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SftpDestination {
    root: RemotePath,
    relative: RemotePath,
}

impl SftpDestination {
    pub fn new<R, P>(root: R, relative: P) -> SftpResult<Self>
    where
        R: Into<RemotePath>,
        P: Into<RemotePath>,
    {
        let relative = relative.into();

        if relative.is_absolute() {
            return Err(Error::InvalidPath(format!(
                "'{relative}' must be relative to the destination root"
            )));
        }

        Ok(Self {
            root: root.into(),
            relative,
        })
    }

    #[must_use]
    pub fn root(&self) -> &RemotePath {
        &self.root
    }

    /// The target directory as shown to the user
    #[must_use]
    pub fn root_name(&self) -> &str {
        self.root.as_str()
    }

    #[must_use]
    pub fn relative(&self) -> &RemotePath {
        &self.relative
    }

    /// Destination of the item `name` inside this one
    #[must_use]
    pub fn join(&self, name: &str) -> Self {
        Self {
            root: self.root.clone(),
            relative: self.relative.join(name.trim_start_matches('/')),
        }
    }

    /// Splits into the directory the item goes into and its name
    #[must_use]
    pub fn resolve(&self) -> ResolvedDestination {
        let segments: Vec<&str> = self.relative.segments().collect();

        match segments.split_last() {
            Some((filename, parents)) => ResolvedDestination {
                directory: parents.iter().fold(self.root.clone(), |dir, segment| dir / segment),
                filename: (*filename).to_owned(),
            },
            None => ResolvedDestination {
                directory: self.root.clone(),
                filename: String::new(),
            },
        }
    }
}
