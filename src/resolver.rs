//! URL and target resolution.
//!
//! Turns a request descriptor's path segments and query parameters into the
//! final wire target: host, port, TLS flag, request path, and `Host` header.
//! Pure functions of their inputs; no I/O.
//!
//! # Resolution Steps
//!
//! 1. For `POST`, the final path segment is removed and percent-decoded into
//!    the request body. It never appears in the URL.
//! 2. The query map is serialized canonically (sorted keys, percent-encoded
//!    values) and appended to the `/`-joined segments: the *logical URL*.
//! 3. TLS is inferred from the logical URL's scheme unless the caller
//!    overrides it.
//! 4. The wire path is the path-and-query portion of the logical URL.
//! 5. With a proxy, the wire host/port become the proxy's, the path becomes
//!    absolute-form (`http://<origin><path>`), and the `Host` header names
//!    the original origin.

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;
use std::collections::BTreeMap;

use url::Url;

use crate::config::ProxyConfig;
use crate::error::{Error, Result};
use crate::request::Method;

// ============================================================================
// ResolvedTarget
// ============================================================================

/// Final host/port/path/TLS tuple used to dispatch a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Wire request path. Origin-form (`/v2/...`) normally,
    /// absolute-form (`http://origin/v2/...`) when a proxy is configured.
    pub path: String,
    /// Host to open the socket to.
    pub host: String,
    /// Port to open the socket to.
    pub port: u16,
    /// Whether the socket uses TLS.
    pub tls: bool,
    /// Value of the `Host` header. Always the origin authority, even when
    /// dialing a proxy.
    pub host_header: String,
}

impl ResolvedTarget {
    /// Returns the pool key for this target.
    #[inline]
    #[must_use]
    pub(crate) fn pool_key(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ============================================================================
// ResolvedRequest
// ============================================================================

/// A fully resolved request: target, optional body, and the logical URL
/// (for the debug hook).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    /// The wire target.
    pub target: ResolvedTarget,
    /// Percent-decoded `POST` body, if any.
    pub body: Option<String>,
    /// The logical URL the target was derived from.
    pub logical_url: String,
}

// ============================================================================
// URL Building
// ============================================================================

/// Joins path segments and appends the canonical query string.
///
/// Query values are percent-encoded; keys are emitted in sorted order
/// (the map is ordered), so the same parameters always produce the same
/// URL text.
#[must_use]
pub fn build_url(segments: &[String], params: &BTreeMap<String, String>) -> String {
    let mut url = segments.join("/");

    if !params.is_empty() {
        let query: Vec<String> = params
            .iter()
            .map(|(name, value)| format!("{name}={}", urlencoding::encode(value)))
            .collect();
        url.push('?');
        url.push_str(&query.join("&"));
    }

    url
}

// ============================================================================
// Target Resolution
// ============================================================================

/// Resolves a descriptor's segments and parameters into a wire target.
///
/// # Errors
///
/// Returns [`Error::Construction`] when the segment list is empty, the
/// origin segment has no parseable authority, or a `POST` has no body
/// segment. Resolution never retries and has no side effects.
pub fn resolve(
    segments: &[String],
    params: &BTreeMap<String, String>,
    method: Method,
    tls_override: Option<bool>,
    proxy: Option<&ProxyConfig>,
) -> Result<ResolvedRequest> {
    if segments.is_empty() {
        return Err(Error::construction("request has no path segments"));
    }

    let mut segments = segments.to_vec();

    // POST carries its body as the final segment, percent-encoded.
    let body = if method == Method::Post {
        if segments.len() < 2 {
            return Err(Error::construction("POST request has no body segment"));
        }
        let raw = segments.pop().unwrap_or_default();
        let decoded = urlencoding::decode(&raw)
            .map(Cow::into_owned)
            .map_err(|e| Error::construction(format!("POST body is not percent-decodable: {e}")))?;
        Some(decoded)
    } else {
        None
    };

    let logical_url = build_url(&segments, params);

    let parsed = Url::parse(&logical_url)
        .map_err(|e| Error::construction(format!("malformed request URL `{logical_url}`: {e}")))?;

    let origin_host = parsed
        .host_str()
        .ok_or_else(|| Error::construction(format!("request URL `{logical_url}` has no host")))?
        .to_owned();

    let tls = tls_override.unwrap_or(parsed.scheme() == "https");

    // Path-and-query portion of the logical URL.
    let mut wire_path = parsed.path().to_owned();
    if let Some(query) = parsed.query() {
        wire_path.push('?');
        wire_path.push_str(query);
    }

    let origin_authority = match parsed.port() {
        Some(port) => format!("{origin_host}:{port}"),
        None => origin_host.clone(),
    };

    let target = match proxy {
        Some(proxy) => ResolvedTarget {
            path: format!("http://{origin_authority}{wire_path}"),
            host: proxy.host.clone(),
            port: proxy.port,
            // Forwarding proxies are dialed in the clear; the absolute-form
            // target names the origin.
            tls: false,
            host_header: origin_authority,
        },
        None => ResolvedTarget {
            path: wire_path,
            host: origin_host,
            port: parsed.port().unwrap_or(if tls { 443 } else { 80 }),
            tls,
            host_header: origin_authority,
        },
    };

    Ok(ResolvedRequest {
        target,
        body,
        logical_url,
    })
}

// ============================================================================
// Tests
// ============================================================================
