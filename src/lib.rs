//! HTTP(S) transport layer for a cloud pub/sub client SDK.
//!
//! This library performs one job: issue HTTP(S) requests against a fixed
//! API surface with a single timeout and a single-completion guarantee
//! per request, over shared keep-alive connection pools. Higher-level
//! endpoint modules (publish, presence, history, ...) build a
//! [`RequestDescriptor`] per call and consume the transport's uniform
//! success/failure contract; everything domain-specific stays outside
//! this crate.
//!
//! Key design principles:
//!
//! - Exactly one terminal callback per request, however timeout, socket
//!   error, cancellation, and stream end race
//! - Explicitly constructed, explicitly destroyable pool service — no
//!   module-level singletons
//! - Failures normalized into one tagged [`Error`] enum collaborators
//!   pattern-match on
//! - Malformed descriptors rejected synchronously, never silently
//!   re-issued
//!
//! # Quick Start
//!
//! ```no_run
//! use pubsub_transport::{PoolManager, RequestDescriptor, Transport, TransportConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let pools = PoolManager::new();
//!     let config = TransportConfig::builder()
//!         .sdk_id("PubSub-Rust/0.1")
//!         .keep_alive(true)
//!         .build();
//!     let transport = Transport::new(config, pools.clone());
//!
//!     let descriptor = RequestDescriptor::builder()
//!         .segment("https://ps.example.com")
//!         .segment("v2")
//!         .segment("presence")
//!         .param("uuid", "user-1")
//!         .on_success(|payload| println!("here now: {payload}"))
//!         .on_failure(|err| eprintln!("request failed: {err}"))
//!         .build();
//!
//!     let _handle = transport.send(descriptor).expect("dispatch");
//!
//!     // At shutdown, drain the keep-alive pools.
//!     pools.destroy();
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Transport configuration and proxy settings |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`request`] | Request descriptors and callback contracts |
//! | [`resolver`] | URL/target resolution (pure functions) |
//! | [`transport`] | Request lifecycle, pools, and dispatch |

// ============================================================================
// Modules
// ============================================================================

/// Transport configuration and proxy settings.
///
/// Use [`TransportConfig::builder()`] to create a configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Request descriptors and callback contracts.
///
/// One [`RequestDescriptor`] is built per API call.
pub mod request;

/// URL and target resolution.
///
/// Pure functions turning path segments and query parameters into wire
/// targets, including proxy rewriting.
pub mod resolver;

/// Request lifecycle, connection pools, and dispatch.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration types
pub use config::{ProxyConfig, TransportConfig, TransportConfigBuilder};

// Error types
pub use error::{Error, Result};

// Request types
pub use request::{
    DEFAULT_REQUEST_TIMEOUT, DebugHook, FailureHandler, Method, RequestDescriptor,
    RequestDescriptorBuilder, SuccessHandler,
};

// Resolver types
pub use resolver::{ResolvedRequest, ResolvedTarget, build_url};

// Transport types
pub use transport::{CancelHandle, KEEP_ALIVE_IDLE, MAX_IDLE_PER_POOL, PoolManager, Transport};
