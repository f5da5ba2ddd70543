use serde::{Deserialize, Serialize};

/// Flags of SSH_FXP_RENAME as introduced in version 5 of the protocol.
///
/// Older servers ignore them entirely, which is why every flag is only ever a
/// request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenameFlags(u32);

bitflags! {
    impl RenameFlags: u32 {
        const OVERWRITE = 0x00000001;
        const ATOMIC = 0x00000002;
        const NATIVE = 0x00000004;
    }
}
