//! HTTP(S) transport layer.
//!
//! This module owns the full request lifecycle: target resolution,
//! connection selection, the timeout/socket race, status routing, and
//! the exactly-once callback guarantee.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   send(descriptor)   ┌──────────────────────┐
//! │   Collaborator   │ ───────────────────► │      Transport       │
//! │ (endpoint module)│ ◄─────────────────── │  resolve → dispatch  │
//! └──────────────────┘  one callback, once  └──────────┬───────────┘
//!                                                      │ checkout/checkin
//!                                           ┌──────────▼───────────┐
//!                                           │     PoolManager      │
//!                                           │  plaintext │  TLS    │
//!                                           └──────────────────────┘
//! ```
//!
//! # Request Lifecycle
//!
//! 1. `Transport::send` appends the `pnsdk` identifier, resolves the
//!    target, and rejects malformed descriptors synchronously.
//! 2. The request task races the timeout timer against the exchange.
//! 3. Exactly one of `on_success` / `on_failure` fires; cancellation,
//!    duplicate events, and late events are no-ops.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `pool` | Keep-alive connection pools (plaintext + TLS) |
//! | `connection` | Socket dialing and HTTP/1 handshakes |
//! | `lifecycle` | Per-request task, timeout race, delivery guard |

// ============================================================================
// Submodules
// ============================================================================

/// Socket dialing and HTTP/1 handshakes.
pub(crate) mod connection;

/// Per-request lifecycle and cancellation.
pub mod lifecycle;

/// Keep-alive connection pools.
pub mod pool;

#[cfg(test)]
pub(crate) mod mock_origin;

// ============================================================================
// Re-exports
// ============================================================================

pub use lifecycle::CancelHandle;
pub use pool::{KEEP_ALIVE_IDLE, MAX_IDLE_PER_POOL, PoolManager};

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::debug;

use crate::config::TransportConfig;
use crate::error::{Error, Result};
use crate::request::RequestDescriptor;
use crate::resolver;
use crate::transport::lifecycle::RequestJob;

// ============================================================================
// Transport
// ============================================================================

/// The request dispatcher handed to endpoint collaborators.
///
/// Cheap to clone; clones share the configuration and the pool service.
/// The pool service is passed in at construction — there is no implicit
/// process-wide singleton.
///
/// # Example
///
/// ```no_run
/// use pubsub_transport::{PoolManager, RequestDescriptor, Transport, TransportConfig};
///
/// let pools = PoolManager::new();
/// let config = TransportConfig::builder()
///     .sdk_id("PubSub-Rust/0.1")
///     .keep_alive(true)
///     .build();
/// let transport = Transport::new(config, pools);
///
/// let descriptor = RequestDescriptor::builder()
///     .segment("https://ps.example.com")
///     .segment("v2")
///     .segment("presence")
///     .param("uuid", "user-1")
///     .on_success(|payload| println!("payload: {payload}"))
///     .on_failure(|err| eprintln!("failed: {err}"))
///     .build();
///
/// let handle = transport.send(descriptor).expect("dispatch");
/// # drop(handle);
/// ```
#[derive(Clone)]
pub struct Transport {
    config: Arc<TransportConfig>,
    pools: Arc<PoolManager>,
}

impl Transport {
    /// Creates a transport over an explicitly constructed pool service.
    #[must_use]
    pub fn new(config: TransportConfig, pools: Arc<PoolManager>) -> Self {
        Self {
            config: Arc::new(config),
            pools,
        }
    }

    /// Returns the shared pool service.
    #[inline]
    #[must_use]
    pub fn pools(&self) -> &Arc<PoolManager> {
        &self.pools
    }

    /// Dispatches one request and returns its cancel handle.
    ///
    /// The SDK identifier is appended to the query parameters, the
    /// target is resolved, and the request task is spawned. From that
    /// point exactly one of the descriptor's callbacks will fire —
    /// unless the handle is cancelled first, in which case neither does.
    ///
    /// # Errors
    ///
    /// - [`Error::Construction`] when the descriptor cannot be resolved
    ///   into a dispatchable target. The transport never re-issues such
    ///   a request.
    /// - [`Error::PoolDestroyed`] when keep-alive is enabled but the
    ///   pool service has been destroyed.
    pub fn send(&self, descriptor: RequestDescriptor) -> Result<CancelHandle> {
        let timeout = descriptor.effective_timeout();
        let RequestDescriptor {
            segments,
            mut params,
            method,
            tls,
            timeout: _,
            debug: debug_hook,
            on_success,
            on_failure,
        } = descriptor;

        if self.config.keep_alive && self.pools.is_destroyed() {
            return Err(Error::PoolDestroyed);
        }

        params.insert("pnsdk".to_owned(), self.config.sdk_id.clone());

        let resolved =
            resolver::resolve(&segments, &params, method, tls, self.config.proxy.as_ref())?;

        if let Some(hook) = debug_hook.as_ref() {
            hook(&resolved.logical_url);
        }

        debug!(
            method = %method,
            url = %resolved.logical_url,
            keep_alive = self.config.keep_alive,
            "dispatching request"
        );

        Ok(lifecycle::spawn(RequestJob {
            target: resolved.target,
            method,
            body: resolved.body,
            timeout,
            keep_alive: self.config.keep_alive,
            pools: Arc::clone(&self.pools),
            on_success,
            on_failure,
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================
