mod handler;
pub mod memory;
mod session;

pub use handler::SftpClient;
pub use memory::{MemoryClient, MemoryServer};
pub use session::{SessionKey, SessionPool, SessionProvider};
