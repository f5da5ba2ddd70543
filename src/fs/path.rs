use std::{fmt, ops::Div};

/// POSIX-style path on the remote host.
///
/// A plain string with `/` separators. Nothing about it implies the path
/// exists, and no normalisation beyond separator handling in [`join`] is done:
/// the server is the authority on what a path means.
///
/// [`join`]: RemotePath::join
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RemotePath(String);

impl RemotePath {
    #[must_use]
    pub fn new<S: Into<String>>(path: S) -> Self {
        Self(path.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` for paths starting at the remote root
    #[must_use]
    pub fn is_absolute(&self) -> bool {
        self.0.starts_with('/')
    }

    /// Appends `segment` with exactly one separator between the two.
    ///
    /// An empty `self` yields `segment` unchanged and an empty segment leaves
    /// `self` as it is.
    #[must_use]
    pub fn join<S: AsRef<str>>(&self, segment: S) -> Self {
        let segment = segment.as_ref();

        if self.0.is_empty() {
            return Self::new(segment);
        }

        let segment = segment.trim_start_matches('/');
        if segment.is_empty() {
            return self.clone();
        }

        if self.0.ends_with('/') {
            Self(format!("{}{}", self.0, segment))
        } else {
            Self(format!("{}/{}", self.0, segment))
        }
    }

    /// Last segment, or `None` for the root and the empty path
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.0.trim_end_matches('/').rsplit('/').next().filter(|s| !s.is_empty())
    }

    /// Path without its last segment, or `None` if there is nothing to strip
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.0.trim_end_matches('/');
        if trimmed.is_empty() {
            return None;
        }

        match trimmed.rfind('/') {
            Some(0) => Some(Self::new("/")),
            Some(index) => Some(Self::new(&trimmed[..index])),
            None => Some(Self::default()),
        }
    }

    /// Non-empty segments from the first to the last
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RemotePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RemotePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for RemotePath {
    fn from(path: String) -> Self {
        Self(path)
    }
}

impl From<&String> for RemotePath {
    fn from(path: &String) -> Self {
        Self::new(path.as_str())
    }
}

impl From<&RemotePath> for RemotePath {
    fn from(path: &RemotePath) -> Self {
        path.clone()
    }
}

impl<S: AsRef<str>> Div<S> for &RemotePath {
    type Output = RemotePath;

    fn div(self, segment: S) -> RemotePath {
        self.join(segment)
    }
}

impl<S: AsRef<str>> Div<S> for RemotePath {
    type Output = RemotePath;

    fn div(self, segment: S) -> RemotePath {
        self.join(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_inserts_a_single_separator() {
        let home = RemotePath::from("/home/alice");

        assert_eq!(home.join("up").as_str(), "/home/alice/up");
        assert_eq!(RemotePath::from("/").join("etc").as_str(), "/etc");
        assert_eq!(RemotePath::from("/tmp/").join("/x").as_str(), "/tmp/x");
        assert_eq!(RemotePath::default().join("rel").as_str(), "rel");
        assert_eq!(home.join(""), home);
        assert_eq!((&home / "up" / "archive").as_str(), "/home/alice/up/archive");
    }

    #[test]
    fn filename_and_parent() {
        let path = RemotePath::from("/home/alice/report.txt");
        assert_eq!(path.filename(), Some("report.txt"));
        assert_eq!(path.parent(), Some(RemotePath::from("/home/alice")));

        assert_eq!(RemotePath::from("/etc").parent(), Some(RemotePath::from("/")));
        assert_eq!(RemotePath::from("/").filename(), None);
        assert_eq!(RemotePath::from("/").parent(), None);
        assert_eq!(RemotePath::default().filename(), None);
        assert_eq!(RemotePath::from("notes").parent(), Some(RemotePath::default()));
        assert_eq!(RemotePath::from("/srv/data/").filename(), Some("data"));
    }

    #[test]
    fn segments_skip_empty_components() {
        let path = RemotePath::from("/a//b/c/");
        assert_eq!(path.segments().collect::<Vec<_>>(), ["a", "b", "c"]);
        assert!(path.is_absolute());
        assert!(!RemotePath::from("a/b").is_absolute());
    }
}
