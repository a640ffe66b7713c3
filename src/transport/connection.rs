//! Socket dialing and HTTP/1 handshakes.
//!
//! One [`HttpConnection`] wraps one persistent socket: TCP, optionally
//! wrapped in rustls TLS, driven by a hyper HTTP/1 connection task. The
//! connection-level hyper API is used deliberately — the transport owns
//! pooling, absolute-form proxy paths, and the `Host` header, none of
//! which a pooled high-level client exposes.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::LazyLock;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tracing::{debug, trace};

use crate::error::{Error, Result};

// ============================================================================
// TLS Connector
// ============================================================================

/// Process-wide TLS connector, built once.
static TLS_CONNECTOR: LazyLock<TlsConnector> = LazyLock::new(|| {
    let roots = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.into(),
    };
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
});

// ============================================================================
// HttpConnection
// ============================================================================

/// One persistent HTTP/1 connection.
///
/// The hyper connection future runs on its own spawned task; dropping an
/// `HttpConnection` drops the request handle, which closes the socket.
#[derive(Debug)]
pub(crate) struct HttpConnection {
    sender: http1::SendRequest<Full<Bytes>>,
}

impl HttpConnection {
    /// Dials `host:port`, performs the TLS handshake when `tls` is set,
    /// and completes the HTTP/1 handshake.
    ///
    /// # Errors
    ///
    /// Any dial, TLS, or handshake failure is returned as
    /// [`Error::Network`]; connection setup failures are
    /// indistinguishable from mid-stream failures to collaborators.
    pub(crate) async fn connect(host: &str, port: u16, tls: bool) -> Result<Self> {
        trace!(host, port, tls, "dialing");

        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| Error::network(format!("connect {host}:{port}: {e}")))?;

        let sender = if tls {
            let server_name = ServerName::try_from(host.to_owned())
                .map_err(|e| Error::network(format!("invalid TLS server name `{host}`: {e}")))?;
            let tls_stream = TLS_CONNECTOR
                .connect(server_name, stream)
                .await
                .map_err(|e| Error::network(format!("TLS handshake with {host}: {e}")))?;
            Self::handshake(TokioIo::new(tls_stream)).await?
        } else {
            Self::handshake(TokioIo::new(stream)).await?
        };

        debug!(host, port, tls, "connection established");

        Ok(Self { sender })
    }

    /// Performs the HTTP/1 handshake and spawns the connection driver task.
    async fn handshake<T>(io: T) -> Result<http1::SendRequest<Full<Bytes>>>
    where
        T: hyper::rt::Read + hyper::rt::Write + Send + Unpin + 'static,
    {
        let (sender, conn) = http1::handshake(io)
            .await
            .map_err(|e| Error::network(format!("HTTP handshake: {e}")))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "connection task ended with error");
            }
        });

        Ok(sender)
    }

    /// Returns `true` once the underlying socket can no longer carry
    /// requests.
    #[inline]
    #[must_use]
    pub(crate) fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Sends one request and returns the response head and body stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the connection cannot accept the
    /// request or fails while writing it.
    pub(crate) async fn send_request(
        &mut self,
        request: http::Request<Full<Bytes>>,
    ) -> Result<http::Response<Incoming>> {
        self.sender
            .ready()
            .await
            .map_err(|e| Error::network(format!("connection not ready: {e}")))?;

        self.sender
            .send_request(request)
            .await
            .map_err(|e| Error::network(format!("request dispatch: {e}")))
    }
}

// ============================================================================
// Tests
// ============================================================================
