//! Planning and running the copy of a selection onto a remote filesystem.

mod copy_file;
mod create_directory;
mod destination;
mod operation;
mod plan;
mod source;

pub use copy_file::CopyFileOperation;
pub use create_directory::CreateDirectoryOperation;
pub use destination::{ResolvedDestination, SftpDestination};
pub use operation::{Operation, OperationCallback};
pub use plan::{percentage, OverwriteConfirmation, Progress, TransferPlan};
pub use source::{LocalSource, RootedSource, Source, SourceItem, SourceReader, SourceStream};
