//! Request descriptors.
//!
//! A [`RequestDescriptor`] captures everything one API call needs: ordered
//! path segments, query parameters, method, TLS override, timeout, and the
//! success/failure callbacks. Endpoint collaborators build one descriptor
//! per call and hand it to [`Transport::send`](crate::Transport::send).
//!
//! Descriptors are built once and immutable after construction. For `POST`
//! requests the final path segment is the percent-encoded request body; the
//! resolver extracts and decodes it before dispatch.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

// ============================================================================
// Constants
// ============================================================================

/// Default per-request timeout (10s, matching the SDK core default).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Types
// ============================================================================

/// Success callback type.
///
/// Receives the parsed JSON payload of a 200 response. Invoked at most
/// once, on the request task.
pub type SuccessHandler = Box<dyn FnOnce(Value) + Send>;

/// Failure callback type.
///
/// Receives the normalized terminal [`Error`]. Invoked at most once, on
/// the request task.
pub type FailureHandler = Box<dyn FnOnce(Error) + Send>;

/// Debug hook type.
///
/// Receives the final logical URL string immediately before dispatch.
pub type DebugHook = Box<dyn Fn(&str) + Send + Sync>;

// ============================================================================
// Method
// ============================================================================

/// HTTP method of a request.
///
/// The transport's API surface only uses `GET` and `POST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// `GET` (default).
    #[default]
    Get,
    /// `POST` — the final path segment carries the percent-encoded body.
    Post,
}

impl Method {
    /// Returns the wire name of the method.
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RequestDescriptor
// ============================================================================

/// Everything one API call needs, built once per call.
///
/// Use [`RequestDescriptor::builder()`] to construct one.
pub struct RequestDescriptor {
    /// Ordered path segments. The first segment carries the origin
    /// (`https://host`); for `POST` the last segment is the body.
    pub segments: Vec<String>,
    /// Query parameters, canonically ordered by key.
    pub params: BTreeMap<String, String>,
    /// HTTP method.
    pub method: Method,
    /// Explicit TLS override. `None` infers TLS from the origin scheme.
    pub tls: Option<bool>,
    /// Per-request timeout override.
    pub timeout: Option<Duration>,
    /// Optional hook receiving the final logical URL before dispatch.
    pub debug: Option<DebugHook>,
    /// Success callback.
    pub on_success: Option<SuccessHandler>,
    /// Failure callback.
    pub on_failure: Option<FailureHandler>,
}

impl RequestDescriptor {
    /// Creates a new descriptor builder.
    #[inline]
    #[must_use]
    pub fn builder() -> RequestDescriptorBuilder {
        RequestDescriptorBuilder::default()
    }

    /// Returns the effective timeout for this request.
    #[inline]
    #[must_use]
    pub fn effective_timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("segments", &self.segments)
            .field("params", &self.params)
            .field("method", &self.method)
            .field("tls", &self.tls)
            .field("timeout", &self.timeout)
            .field("debug", &self.debug.is_some())
            .field("on_success", &self.on_success.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}

// ============================================================================
// RequestDescriptorBuilder
// ============================================================================

/// Builder for [`RequestDescriptor`].
#[derive(Default)]
pub struct RequestDescriptorBuilder {
    segments: Vec<String>,
    params: BTreeMap<String, String>,
    method: Method,
    tls: Option<bool>,
    timeout: Option<Duration>,
    debug: Option<DebugHook>,
    on_success: Option<SuccessHandler>,
    on_failure: Option<FailureHandler>,
}

impl RequestDescriptorBuilder {
    /// Appends a path segment.
    #[must_use]
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Appends several path segments.
    #[must_use]
    pub fn segments<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.segments.extend(segments.into_iter().map(Into::into));
        self
    }

    /// Sets a query parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Sets the HTTP method.
    #[inline]
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Explicitly forces TLS on or off, overriding scheme inference.
    #[inline]
    #[must_use]
    pub fn tls(mut self, tls: bool) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Overrides the default request timeout.
    #[inline]
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the debug hook, called with the final logical URL.
    #[must_use]
    pub fn debug(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.debug = Some(Box::new(hook));
        self
    }

    /// Sets the success callback.
    #[must_use]
    pub fn on_success(mut self, callback: impl FnOnce(Value) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    /// Sets the failure callback.
    #[must_use]
    pub fn on_failure(mut self, callback: impl FnOnce(Error) + Send + 'static) -> Self {
        self.on_failure = Some(Box::new(callback));
        self
    }

    /// Builds the descriptor.
    ///
    /// Validation (non-empty segments, parseable origin) happens in
    /// `Transport::send`, which rejects bad descriptors with
    /// [`Error::Construction`].
    #[must_use]
    pub fn build(self) -> RequestDescriptor {
        RequestDescriptor {
            segments: self.segments,
            params: self.params,
            method: self.method,
            tls: self.tls,
            timeout: self.timeout,
            debug: self.debug,
            on_success: self.on_success,
            on_failure: self.on_failure,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_as_str() {
        assert_eq!(Method::Get.as_str(), "GET");
        assert_eq!(Method::Post.as_str(), "POST");
        assert_eq!(Method::default(), Method::Get);
    }

    #[test]
    fn test_builder_defaults() {
        let descriptor = RequestDescriptor::builder()
            .segment("https://ps.example.com")
            .build();

        assert_eq!(descriptor.segments, vec!["https://ps.example.com"]);
        assert_eq!(descriptor.method, Method::Get);
        assert!(descriptor.tls.is_none());
        assert_eq!(descriptor.effective_timeout(), DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn test_builder_params_canonical_order() {
        let descriptor = RequestDescriptor::builder()
            .param("uuid", "u-1")
            .param("auth", "key")
            .build();

        let names: Vec<_> = descriptor.params.keys().cloned().collect();
        assert_eq!(names, vec!["auth", "uuid"]);
    }

    #[test]
    fn test_timeout_override() {
        let descriptor = RequestDescriptor::builder()
            .timeout(Duration::from_millis(1500))
            .build();
        assert_eq!(descriptor.effective_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn test_debug_fmt_hides_callbacks() {
        let descriptor = RequestDescriptor::builder()
            .segment("https://ps.example.com")
            .on_success(|_| {})
            .build();

        let text = format!("{descriptor:?}");
        assert!(text.contains("on_success: true"));
        assert!(text.contains("on_failure: false"));
    }
}
