//! Tunables for a filesystem and the transfers that run on it.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, SftpResult};

/// Options of an [`SftpFilesystem`](crate::fs::SftpFilesystem).
///
/// Deserializes with defaults for every missing field, so an embedding
/// application can keep only the values it overrides in its configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Maximum response time of a single request, in seconds
    pub timeout_secs: u64,
    /// Permissions given to directories created by `create_directory`
    pub directory_mode: u32,
    /// Permissions given to files created by `open_stream`
    pub file_mode: u32,
    /// Size of the buffer receiving each listed filename
    pub filename_buffer_len: usize,
    /// Size of the buffer receiving each long-form listing line
    pub long_entry_buffer_len: usize,
    /// Size of the buffer receiving readlink/realpath results
    pub link_target_buffer_len: usize,
    /// Largest single read request
    pub read_len: u32,
    /// Largest single write request
    pub write_len: u32,
    /// Chunk size used when copying a file, also the granularity of
    /// cancellation
    pub copy_chunk_size: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            directory_mode: 0o755,
            file_mode: 0o644,
            filename_buffer_len: 1024,
            long_entry_buffer_len: 1024,
            link_target_buffer_len: 1024,
            read_len: 32 * 1024,
            write_len: 261_120,
            copy_chunk_size: 32 * 1024,
        }
    }
}

impl Options {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Rejects zero buffer and chunk sizes. A zero-length read looks like the
    /// end of a file, so a copy would stop at once and leave an empty target.
    pub fn validate(&self) -> SftpResult<()> {
        let zero = [
            ("filename_buffer_len", self.filename_buffer_len == 0),
            ("long_entry_buffer_len", self.long_entry_buffer_len == 0),
            ("link_target_buffer_len", self.link_target_buffer_len == 0),
            ("read_len", self.read_len == 0),
            ("write_len", self.write_len == 0),
            ("copy_chunk_size", self.copy_chunk_size == 0),
        ];

        match zero.iter().find(|(_, zero)| *zero) {
            Some((name, _)) => Err(Error::InvalidOptions(format!("{name} must not be zero"))),
            None => Ok(()),
        }
    }
}
