//! Keep-alive connection pools.
//!
//! Two pools, one plaintext and one TLS, shared by every request in the
//! process. Each pool holds at most five idle persistent connections,
//! keyed by `host:port` authority, each kept for at most five minutes.
//! The manager is explicitly constructed and explicitly destroyable;
//! nothing in the crate relies on a module-level singleton.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                PoolManager                   │
//! │  ┌───────────────────┐ ┌──────────────────┐  │
//! │  │   plaintext pool  │ │     TLS pool     │  │
//! │  │ host:80 → [conns] │ │ host:443 → [..]  │  │
//! │  └───────────────────┘ └──────────────────┘  │
//! └──────────────────────────────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::transport::connection::HttpConnection;

// ============================================================================
// Constants
// ============================================================================

/// How long an idle connection stays usable (5 minutes).
pub const KEEP_ALIVE_IDLE: Duration = Duration::from_secs(300);

/// Maximum idle persistent connections per pool.
pub const MAX_IDLE_PER_POOL: usize = 5;

// ============================================================================
// Types
// ============================================================================

/// Idle connections keyed by `host:port` authority.
type IdleMap = FxHashMap<String, Vec<IdleConnection>>;

/// An idle connection with its park time.
struct IdleConnection {
    conn: HttpConnection,
    idle_since: Instant,
}

impl IdleConnection {
    /// Returns `true` once the connection has been idle past its
    /// keep-alive window or the socket has closed underneath it.
    fn is_stale(&self) -> bool {
        self.conn.is_closed() || self.idle_since.elapsed() >= KEEP_ALIVE_IDLE
    }
}

// ============================================================================
// Pool
// ============================================================================

/// One keep-alive pool for a single scheme.
#[derive(Default)]
struct Pool {
    idle: Mutex<IdleMap>,
}

impl Pool {
    /// Pops a usable idle connection for the authority, dropping stale
    /// entries on the way.
    fn checkout(&self, key: &str) -> Option<HttpConnection> {
        let mut idle = self.idle.lock();
        let entries = idle.get_mut(key)?;

        while let Some(entry) = entries.pop() {
            if entry.is_stale() {
                trace!(key, "dropping stale idle connection");
                continue;
            }
            return Some(entry.conn);
        }

        None
    }

    /// Parks a connection, unless the pool is already full.
    fn checkin(&self, key: &str, conn: HttpConnection) {
        let mut idle = self.idle.lock();

        let total: usize = idle.values().map(Vec::len).sum();
        if total >= MAX_IDLE_PER_POOL {
            trace!(key, total, "pool full, dropping connection");
            return;
        }

        idle.entry(key.to_owned()).or_default().push(IdleConnection {
            conn,
            idle_since: Instant::now(),
        });
    }

    /// Drops every idle connection.
    fn drain(&self) -> usize {
        let mut idle = self.idle.lock();
        let count: usize = idle.values().map(Vec::len).sum();
        idle.clear();
        count
    }

    /// Number of idle connections currently parked.
    fn idle_count(&self) -> usize {
        self.idle.lock().values().map(Vec::len).sum()
    }
}

// ============================================================================
// PoolManager
// ============================================================================

/// Process-scoped keep-alive pool service.
///
/// Constructed once at service start and passed into each
/// [`Transport`](crate::Transport). Destroying the manager closes every
/// idle socket; destruction is idempotent and independent of any
/// in-flight request.
pub struct PoolManager {
    /// Pool for plaintext connections.
    plain: Pool,
    /// Pool for TLS connections.
    tls: Pool,
    /// Set once by [`PoolManager::destroy`].
    destroyed: AtomicBool,
}

impl PoolManager {
    /// Creates the pool service.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            plain: Pool::default(),
            tls: Pool::default(),
            destroyed: AtomicBool::new(false),
        })
    }

    /// Selects the pool for the scheme.
    fn pool(&self, tls: bool) -> &Pool {
        if tls { &self.tls } else { &self.plain }
    }

    /// Checks out an idle connection for `key` from the pool selected by
    /// `tls`, if one is available and the manager is not destroyed.
    pub(crate) fn checkout(&self, key: &str, tls: bool) -> Option<HttpConnection> {
        if self.is_destroyed() {
            return None;
        }

        let conn = self.pool(tls).checkout(key);
        if conn.is_some() {
            debug!(key, tls, "reusing pooled connection");
        }
        conn
    }

    /// Returns a connection to the pool selected by `tls`.
    ///
    /// The connection is dropped instead when it has closed, the pool is
    /// full, or the manager is destroyed.
    pub(crate) fn checkin(&self, key: &str, tls: bool, conn: HttpConnection) {
        if self.is_destroyed() || conn.is_closed() {
            trace!(key, tls, "not parking connection");
            return;
        }

        self.pool(tls).checkin(key, conn);
    }

    /// Closes and releases both pools' idle connections.
    ///
    /// Safe to call multiple times and from multiple tasks; later calls
    /// are no-ops. Requests already in flight are unaffected, but their
    /// connections will not be parked afterwards.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }

        let dropped = self.plain.drain() + self.tls.drain();
        debug!(dropped, "connection pools destroyed");
    }

    /// Returns `true` once [`PoolManager::destroy`] has run.
    #[inline]
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Number of idle connections in the pool selected by `tls`.
    #[inline]
    #[must_use]
    pub fn idle_count(&self, tls: bool) -> usize {
        self.pool(tls).idle_count()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;

    /// Opens a live plaintext connection against a throwaway listener.
    async fn live_connection() -> (HttpConnection, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(stream);
        });

        let conn = HttpConnection::connect("127.0.0.1", port, false)
            .await
            .expect("connect");
        (conn, server)
    }

    #[test]
    fn test_constants() {
        assert_eq!(KEEP_ALIVE_IDLE.as_secs(), 300);
        assert_eq!(MAX_IDLE_PER_POOL, 5);
    }

    #[test]
    fn test_checkout_empty() {
        let pools = PoolManager::new();
        assert!(pools.checkout("ps.example.com:443", true).is_none());
        assert!(pools.checkout("ps.example.com:80", false).is_none());
    }

    #[tokio::test]
    async fn test_checkin_checkout_roundtrip() {
        let pools = PoolManager::new();
        let (conn, server) = live_connection().await;

        pools.checkin("127.0.0.1:80", false, conn);
        assert_eq!(pools.idle_count(false), 1);
        assert_eq!(pools.idle_count(true), 0);

        let conn = pools.checkout("127.0.0.1:80", false);
        assert!(conn.is_some());
        assert_eq!(pools.idle_count(false), 0);

        server.abort();
    }

    #[tokio::test]
    async fn test_tls_pool_selected_for_tls_checkin() {
        let pools = PoolManager::new();
        let (conn, server) = live_connection().await;

        pools.checkin("ps.example.com:443", true, conn);
        assert_eq!(pools.idle_count(true), 1);
        assert_eq!(pools.idle_count(false), 0);

        // The plaintext pool never sees the connection.
        assert!(pools.checkout("ps.example.com:443", false).is_none());
        let conn = pools.checkout("ps.example.com:443", true);
        assert!(conn.is_some());
        assert_eq!(pools.idle_count(true), 0);

        server.abort();
    }

    #[tokio::test]
    async fn test_checkout_wrong_key() {
        let pools = PoolManager::new();
        let (conn, server) = live_connection().await;

        pools.checkin("a:80", false, conn);
        assert!(pools.checkout("b:80", false).is_none());
        assert_eq!(pools.idle_count(false), 1);

        server.abort();
    }

    #[tokio::test]
    async fn test_destroy_idempotent() {
        let pools = PoolManager::new();
        let (conn, server) = live_connection().await;
        pools.checkin("a:80", false, conn);

        pools.destroy();
        assert!(pools.is_destroyed());
        assert_eq!(pools.idle_count(false), 0);

        // Second destroy is a no-op.
        pools.destroy();
        assert!(pools.is_destroyed());

        server.abort();
    }

    #[tokio::test]
    async fn test_checkin_after_destroy_drops() {
        let pools = PoolManager::new();
        pools.destroy();

        let (conn, server) = live_connection().await;
        pools.checkin("a:80", false, conn);
        assert_eq!(pools.idle_count(false), 0);

        server.abort();
    }

    #[tokio::test]
    async fn test_checkout_after_destroy_none() {
        let pools = PoolManager::new();
        let (conn, server) = live_connection().await;
        pools.checkin("a:80", false, conn);

        pools.destroy();
        assert!(pools.checkout("a:80", false).is_none());

        server.abort();
    }
}
