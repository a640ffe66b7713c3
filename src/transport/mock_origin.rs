//! Canned-response HTTP origin for transport tests.
//!
//! A tiny raw-TCP HTTP/1.1 server: enough to hand back arbitrary status
//! lines and bodies (including deliberately unparsable ones), to stall
//! forever for timeout tests, and to count accepted sockets for pool
//! reuse assertions. Connections are kept open between requests so
//! keep-alive reuse is observable.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

// ============================================================================
// MockBehavior
// ============================================================================

/// What the origin does with each request.
#[derive(Debug, Clone, Copy)]
pub(crate) enum MockBehavior {
    /// Answer every request with this status and body.
    Respond {
        status: u16,
        body: &'static str,
    },
    /// Read the request, then never answer.
    Stall,
}

// ============================================================================
// MockOrigin
// ============================================================================

/// A throwaway HTTP origin bound to a random localhost port.
pub(crate) struct MockOrigin {
    port: u16,
    accepted: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
    accept_task: JoinHandle<()>,
}

impl MockOrigin {
    /// Binds and starts serving with the given behavior.
    pub(crate) async fn start(behavior: MockBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock origin");
        let port = listener.local_addr().expect("mock origin addr").port();

        let accepted = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let accepted_loop = Arc::clone(&accepted);
        let requests_loop = Arc::clone(&requests);
        let accept_task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                accepted_loop.fetch_add(1, Ordering::SeqCst);

                let requests = Arc::clone(&requests_loop);
                tokio::spawn(serve_connection(stream, behavior, requests));
            }
        });

        Self {
            port,
            accepted,
            requests,
            accept_task,
        }
    }

    /// Origin segment usable as the first path segment of a descriptor.
    pub(crate) fn origin_segment(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Port the origin listens on.
    pub(crate) fn port(&self) -> u16 {
        self.port
    }

    /// Number of sockets accepted so far.
    pub(crate) fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Raw text (head + body) of every request received so far.
    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

impl Drop for MockOrigin {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

// ============================================================================
// Connection Serving
// ============================================================================

/// Serves one connection, request by request, until the peer hangs up.
async fn serve_connection(
    mut stream: TcpStream,
    behavior: MockBehavior,
    requests: Arc<Mutex<Vec<String>>>,
) {
    let mut buffer: Vec<u8> = Vec::new();

    loop {
        let Some(request_text) = read_request(&mut stream, &mut buffer).await else {
            return;
        };
        requests.lock().push(request_text);

        match behavior {
            MockBehavior::Stall => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                return;
            }
            MockBehavior::Respond { status, body } => {
                let reason = match status {
                    200 => "OK",
                    400 => "Bad Request",
                    500 => "Internal Server Error",
                    _ => "Status",
                };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\ncontent-length: {}\r\ncontent-type: application/json\r\n\r\n{body}",
                    body.len(),
                );
                if stream.write_all(response.as_bytes()).await.is_err() {
                    return;
                }
            }
        }
    }
}

/// Reads one full request (head + content-length body) from the stream.
///
/// `buffer` carries leftover bytes between requests on the same
/// connection. Returns `None` when the peer closes.
async fn read_request(stream: &mut TcpStream, buffer: &mut Vec<u8>) -> Option<String> {
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find_subsequence(buffer, b"\r\n\r\n") {
            break pos + 4;
        }
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).into_owned();
    let content_length = content_length(&head);

    while buffer.len() < header_end + content_length {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
        }
    }

    let body = String::from_utf8_lossy(&buffer[header_end..header_end + content_length]).into_owned();
    buffer.drain(..header_end + content_length);

    Some(format!("{head}{body}"))
}

/// Extracts the content-length header value, defaulting to zero.
fn content_length(head: &str) -> usize {
    head.lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse().ok()
            } else {
                None
            }
        })
        .unwrap_or(0)
}

/// Finds the first occurrence of `needle` in `haystack`.
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
