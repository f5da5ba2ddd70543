//! Remote filesystem over an SFTP channel, and a planner copying local
//! selections onto it.
//!
//! The crate does not speak the wire protocol itself: it drives an
//! already-connected client through the [`client::SftpClient`] trait.
//! [`client::MemoryServer`] provides one that lives in memory.

#[macro_use]
extern crate log;
#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate async_trait;

/// Protocol client seam and session bookkeeping
pub mod client;
pub mod config;
pub mod error;
pub mod fs;
/// Protocol types
pub mod protocol;
pub mod transfer;
mod utils;

pub use client::{SessionProvider, SftpClient};
pub use config::Options;
pub use error::{Error, SftpResult};
pub use fs::{OverwriteBehavior, PathStatus, RemotePath, SftpFilesystem};
pub use transfer::TransferPlan;
