use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils;

/// Attribute flags as defined by the SFTP protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileAttr(u32);

/// Type and permission bits of a unix mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileMode(u32);

bitflags! {
    impl FileAttr: u32 {
        const SIZE = 0x00000001;
        const UIDGID = 0x00000002;
        const PERMISSIONS = 0x00000004;
        const ACMODTIME = 0x00000008;
        const EXTENDED = 0x80000000;
    }

    impl FileMode: u32 {
        const FIFO = 0o010000;
        const CHR = 0o020000;
        const DIR = 0o040000;
        const BLK = 0o060000;
        const REG = 0o100000;
        const LNK = 0o120000;
        const SOCK = 0o140000;

        const OTHER_EXEC = 0o000001;
        const OTHER_WRITE = 0o000002;
        const OTHER_READ = 0o000004;
        const GROUP_EXEC = 0o000010;
        const GROUP_WRITE = 0o000020;
        const GROUP_READ = 0o000040;
        const USER_EXEC = 0o000100;
        const USER_WRITE = 0o000200;
        const USER_READ = 0o000400;
    }
}

impl FileMode {
    /// Mask selecting the file type bits
    pub const TYPE_MASK: u32 = 0o170000;
    /// Mask selecting the permission bits
    pub const PERMISSION_MASK: u32 = 0o7777;
}

/// Kind of file a set of attributes describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Regular,
    Directory,
    Symlink,
    CharDevice,
    BlockDevice,
    Fifo,
    Socket,
    Unknown,
}

impl FileType {
    /// Maps the type bits of a raw mode. Anything unrecognised is `Unknown`.
    #[must_use]
    pub const fn from_mode(mode: u32) -> Self {
        match mode & FileMode::TYPE_MASK {
            0o010000 => Self::Fifo,
            0o020000 => Self::CharDevice,
            0o040000 => Self::Directory,
            0o060000 => Self::BlockDevice,
            0o100000 => Self::Regular,
            0o120000 => Self::Symlink,
            0o140000 => Self::Socket,
            _ => Self::Unknown,
        }
    }

    const fn listing_char(self) -> char {
        match self {
            Self::Regular | Self::Unknown => '-',
            Self::Directory => 'd',
            Self::Symlink => 'l',
            Self::CharDevice => 'c',
            Self::BlockDevice => 'b',
            Self::Fifo => 'p',
            Self::Socket => 's',
        }
    }
}

/// Attributes of a remote file as sent by the server.
///
/// The server only populates the fields named in its attribute flags, so every
/// field is optional and an absent one stays absent. Unlike [`std::fs::Metadata`]
/// nothing is guessed: a listing without permissions has an `Unknown` type.
///
/// The `flags` are not stored; they follow from which fields are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileAttributes {
    pub size: Option<u64>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub permissions: Option<u32>,
    pub atime: Option<u32>,
    pub mtime: Option<u32>,
}

impl FileAttributes {
    /// Builds attributes from a raw response, keeping only the fields the
    /// server declared in `flags`.
    #[must_use]
    pub fn from_raw(
        flags: FileAttr,
        size: u64,
        (uid, gid): (u32, u32),
        permissions: u32,
        (atime, mtime): (u32, u32),
    ) -> Self {
        let has_ids = flags.contains(FileAttr::UIDGID);
        let has_times = flags.contains(FileAttr::ACMODTIME);

        Self {
            size: flags.contains(FileAttr::SIZE).then_some(size),
            uid: has_ids.then_some(uid),
            gid: has_ids.then_some(gid),
            permissions: flags.contains(FileAttr::PERMISSIONS).then_some(permissions),
            atime: has_times.then_some(atime),
            mtime: has_times.then_some(mtime),
        }
    }

    /// Flags announcing which fields are populated
    #[must_use]
    pub fn flags(&self) -> FileAttr {
        let mut attrs = FileAttr::empty();

        if self.size.is_some() {
            attrs |= FileAttr::SIZE;
        }

        if self.uid.is_some() || self.gid.is_some() {
            attrs |= FileAttr::UIDGID;
        }

        if self.permissions.is_some() {
            attrs |= FileAttr::PERMISSIONS;
        }

        if self.atime.is_some() || self.mtime.is_some() {
            attrs |= FileAttr::ACMODTIME;
        }

        attrs
    }

    #[must_use]
    pub fn file_type(&self) -> FileType {
        self.permissions.map_or(FileType::Unknown, FileType::from_mode)
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.file_type() == FileType::Directory
    }

    #[must_use]
    pub fn is_regular(&self) -> bool {
        self.file_type() == FileType::Regular
    }

    #[must_use]
    pub fn is_symlink(&self) -> bool {
        self.file_type() == FileType::Symlink
    }

    /// Permission bits without the file type
    #[must_use]
    pub fn mode(&self) -> Option<u32> {
        self.permissions.map(|p| p & FileMode::PERMISSION_MASK)
    }

    /// Returns the last access time
    #[must_use]
    pub fn accessed(&self) -> Option<DateTime<Utc>> {
        self.atime.and_then(utils::datetime)
    }

    /// Returns the last modification time
    #[must_use]
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.mtime.and_then(utils::datetime)
    }

    /// Renders the permissions the way `ls -l` does, e.g. `drwxr-xr-x`
    #[must_use]
    pub fn permissions_string(&self) -> String {
        let mode = self.permissions.unwrap_or(0);
        let mut out = String::with_capacity(10);
        out.push(self.file_type().listing_char());

        for shift in [6, 3, 0] {
            let bits = (mode >> shift) & 0o7;
            out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
            out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
            out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
        }

        out
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Regular => "regular file",
            Self::Directory => "directory",
            Self::Symlink => "symbolic link",
            Self::CharDevice => "character device",
            Self::BlockDevice => "block device",
            Self::Fifo => "named pipe",
            Self::Socket => "socket",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
