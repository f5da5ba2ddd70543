mod file_attrs;
mod open;
mod rename;
mod status;

pub use self::{
    file_attrs::{FileAttr, FileAttributes, FileMode, FileType},
    open::OpenFlags,
    rename::RenameFlags,
    status::{Status, StatusCode},
};

/// Opaque handle returned by SSH_FXP_OPEN and SSH_FXP_OPENDIR
pub type Handle = String;
