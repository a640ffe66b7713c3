//! Transport configuration.
//!
//! Provides a fluent API for configuring a [`Transport`](crate::Transport)
//! instance: SDK identifier, optional forwarding proxy, and keep-alive mode.
//!
//! # Example
//!
//! ```no_run
//! use pubsub_transport::TransportConfig;
//!
//! let config = TransportConfig::builder()
//!     .sdk_id("PubSub-Rust/0.1")
//!     .keep_alive(true)
//!     .build();
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// ProxyConfig
// ============================================================================

/// Forwarding proxy configuration.
///
/// When set, every request is dispatched to the proxy with an
/// absolute-form request target and a `Host` header naming the
/// original origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy host name or address.
    pub host: String,
    /// Proxy port.
    pub port: u16,
}

impl ProxyConfig {
    /// Creates a proxy configuration.
    #[inline]
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

// ============================================================================
// TransportConfig
// ============================================================================

/// Configuration for a [`Transport`](crate::Transport) instance.
///
/// Use [`TransportConfig::builder()`] to construct one.
#[derive(Debug, Clone, Default)]
pub struct TransportConfig {
    /// SDK identifier appended to every request as the `pnsdk`
    /// query parameter.
    pub sdk_id: String,
    /// Optional forwarding proxy.
    pub proxy: Option<ProxyConfig>,
    /// Whether requests use the shared keep-alive pools.
    pub keep_alive: bool,
}

impl TransportConfig {
    /// Creates a new configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::default()
    }
}

// ============================================================================
// TransportConfigBuilder
// ============================================================================

/// Builder for [`TransportConfig`].
#[derive(Debug, Default, Clone)]
pub struct TransportConfigBuilder {
    sdk_id: Option<String>,
    proxy: Option<ProxyConfig>,
    keep_alive: bool,
}

impl TransportConfigBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the SDK identifier sent as the `pnsdk` query parameter.
    #[inline]
    #[must_use]
    pub fn sdk_id(mut self, sdk_id: impl Into<String>) -> Self {
        self.sdk_id = Some(sdk_id.into());
        self
    }

    /// Sets the forwarding proxy.
    #[inline]
    #[must_use]
    pub fn proxy(mut self, host: impl Into<String>, port: u16) -> Self {
        self.proxy = Some(ProxyConfig::new(host, port));
        self
    }

    /// Enables or disables keep-alive connection pooling.
    #[inline]
    #[must_use]
    pub fn keep_alive(mut self, enabled: bool) -> Self {
        self.keep_alive = enabled;
        self
    }

    /// Builds the configuration.
    #[inline]
    #[must_use]
    pub fn build(self) -> TransportConfig {
        TransportConfig {
            sdk_id: self.sdk_id.unwrap_or_default(),
            proxy: self.proxy,
            keep_alive: self.keep_alive,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
