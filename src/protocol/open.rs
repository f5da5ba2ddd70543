use serde::{Deserialize, Serialize};

/// Opening flags as defined by the SFTP protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpenFlags(u32);

bitflags! {
    impl OpenFlags: u32 {
        const READ = 0x00000001;
        const WRITE = 0x00000002;
        const APPEND = 0x00000004;
        const CREATE = 0x00000008;
        const TRUNCATE = 0x00000010;
        const EXCLUDE = 0x00000020;
    }
}

impl OpenFlags {
    /// Flags for a stream opened for reading, or for writing from scratch
    #[must_use]
    pub fn for_stream(writable: bool) -> Self {
        if writable {
            Self::CREATE | Self::TRUNCATE | Self::WRITE
        } else {
            Self::READ
        }
    }
}
