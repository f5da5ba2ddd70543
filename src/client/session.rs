use std::{collections::HashMap, fmt, future::Future, sync::Arc};
use tokio::sync::Mutex;

use super::SftpClient;
use crate::protocol::Status;

/// Authenticated SSH session able to start SFTP channels.
///
/// Connection and authentication happen before a provider exists; the
/// filesystem only ever asks it for a fresh channel.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    type Client: SftpClient;

    /// Starts the SFTP subsystem on a new channel of this session
    async fn open_channel(&self) -> Result<Self::Client, Status>;
}

/// Identifies a remote account. Sessions are shared per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub host: String,
    pub user: String,
    pub port: u16,
}

impl SessionKey {
    pub fn new<H: Into<String>, U: Into<String>>(host: H, user: U, port: u16) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            port,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
}

/// Registry of live sessions, one per [`SessionKey`].
///
/// Owned by whoever drives the connections and passed to the code that needs
/// sessions. Each entry is created on first use and torn down by
/// [`release`](SessionPool::release) or [`clear`](SessionPool::clear); handles
/// already given out stay valid until their last clone is dropped.
pub struct SessionPool<P> {
    sessions: Mutex<HashMap<SessionKey, Arc<P>>>,
}

impl<P: SessionProvider> SessionPool<P> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the session for `key`, creating it with `connect` if there is
    /// none. Concurrent callers for the same key wait for a single connect.
    pub async fn get_or_init<F, Fut, E>(&self, key: &SessionKey, connect: F) -> Result<Arc<P>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<P, E>>,
    {
        let mut sessions = self.sessions.lock().await;

        if let Some(session) = sessions.get(key) {
            return Ok(session.clone());
        }

        debug!("connecting session {key}");
        let session = Arc::new(connect().await?);
        sessions.insert(key.clone(), session.clone());
        Ok(session)
    }

    pub async fn lookup(&self, key: &SessionKey) -> Option<Arc<P>> {
        self.sessions.lock().await.get(key).cloned()
    }

    /// Removes the session for `key`, returning whether there was one
    pub async fn release(&self, key: &SessionKey) -> bool {
        let removed = self.sessions.lock().await.remove(key).is_some();
        if removed {
            debug!("released session {key}");
        }
        removed
    }

    pub async fn clear(&self) {
        self.sessions.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

impl<P: SessionProvider> Default for SessionPool<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::client::MemoryServer;

    #[tokio::test]
    async fn sessions_are_shared_per_key() -> anyhow::Result<()> {
        let pool = SessionPool::<MemoryServer>::new();
        let connects = AtomicUsize::new(0);
        let key = SessionKey::new("files.example.org", "alice", 22);

        for _ in 0..3 {
            pool.get_or_init(&key, || async {
                connects.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(MemoryServer::new())
            })
            .await?;
        }

        let other = SessionKey::new("files.example.org", "bob", 22);
        pool.get_or_init(&other, || async { Ok::<_, anyhow::Error>(MemoryServer::new()) })
            .await?;

        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(pool.len().await, 2);
        assert_eq!(key.to_string(), "alice@files.example.org:22");
        Ok(())
    }

    #[tokio::test]
    async fn failed_connect_leaves_no_entry() {
        let pool = SessionPool::<MemoryServer>::new();
        let key = SessionKey::new("down.example.org", "alice", 2222);

        let result = pool
            .get_or_init(&key, || async { Err::<MemoryServer, _>("refused") })
            .await;

        assert!(result.is_err());
        assert!(pool.lookup(&key).await.is_none());
        assert!(pool.is_empty().await);
    }

    #[tokio::test]
    async fn released_session_outlives_its_entry() -> anyhow::Result<()> {
        let pool = SessionPool::<MemoryServer>::new();
        let key = SessionKey::new("files.example.org", "alice", 22);

        let session = pool
            .get_or_init(&key, || async { Ok::<_, anyhow::Error>(MemoryServer::new()) })
            .await?;
        session.write_file("/kept.txt", b"still here")?;

        assert!(pool.release(&key).await);
        assert!(!pool.release(&key).await);
        assert!(pool.lookup(&key).await.is_none());
        assert_eq!(session.read_file("/kept.txt")?, b"still here");
        Ok(())
    }
}
