//! Per-request lifecycle: timeout race, status routing, single delivery.
//!
//! Every request runs on its own spawned task. Inside the task the
//! timeout timer and the HTTP exchange race in one `select!`; outside it,
//! a [`CancelHandle`] can abort the task at any time. All three paths
//! converge on the same delivery guard: an atomic `completed` flag that
//! is checked-and-set before any callback fires, so exactly one terminal
//! outcome is ever observed.
//!
//! State machine per request:
//!
//! ```text
//! PENDING ──timeout───────────────► FAILED
//!    │  ──transport error─────────► FAILED
//!    │  ──non-200 / parse error──► FAILED
//!    │  ──200 + valid JSON───────► SUCCEEDED
//!    └──cancel──────────────────► (no callback)
//! ```
//!
//! Both terminal states are absorbing: later events are discarded.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use http_body_util::{BodyExt, Full};
use serde_json::Value;
use tokio::task::AbortHandle;
use tokio::time::sleep;
use tracing::{debug, trace, warn};

use crate::error::Error;
use crate::request::{FailureHandler, Method, SuccessHandler};
use crate::resolver::ResolvedTarget;
use crate::transport::connection::HttpConnection;
use crate::transport::pool::PoolManager;

// ============================================================================
// CancelHandle
// ============================================================================

/// Handle for cancelling an in-flight request.
///
/// Cancellation aborts the request task, which drops its connection and
/// timer, and suppresses both callbacks. Cancelling an already-completed
/// request is a no-op; the handle may be used any number of times.
#[derive(Debug)]
pub struct CancelHandle {
    completed: Arc<AtomicBool>,
    abort: AbortHandle,
}

impl CancelHandle {
    /// Cancels the request.
    ///
    /// No callback fires as a result of cancellation; if a terminal
    /// outcome was already delivered, nothing happens.
    pub fn cancel(&self) {
        if !self.completed.swap(true, Ordering::SeqCst) {
            trace!("request cancelled before completion");
        }
        self.abort.abort();
    }

    /// Returns `true` once the request reached a terminal state or was
    /// cancelled.
    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }
}

// ============================================================================
// RequestJob
// ============================================================================

/// Everything the request task needs, assembled by the transport.
pub(crate) struct RequestJob {
    /// Resolved wire target.
    pub target: ResolvedTarget,
    /// HTTP method.
    pub method: Method,
    /// Percent-decoded `POST` body, if any.
    pub body: Option<String>,
    /// Effective timeout for the whole exchange.
    pub timeout: Duration,
    /// Whether to use the keep-alive pools.
    pub keep_alive: bool,
    /// Shared pool service.
    pub pools: Arc<PoolManager>,
    /// Success callback.
    pub on_success: Option<SuccessHandler>,
    /// Failure callback.
    pub on_failure: Option<FailureHandler>,
}

/// The callback-free remainder of a job, handed to the exchange.
///
/// Split out so the future awaiting the exchange only ever borrows
/// `Sync` data; the boxed callbacks stay behind in [`run`].
struct Dispatch {
    target: ResolvedTarget,
    method: Method,
    body: Option<String>,
    keep_alive: bool,
    pools: Arc<PoolManager>,
}

/// Spawns the request task and returns its cancel handle.
pub(crate) fn spawn(job: RequestJob) -> CancelHandle {
    let completed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&completed);

    let handle = tokio::spawn(async move {
        run(job, flag).await;
    });

    CancelHandle {
        completed,
        abort: handle.abort_handle(),
    }
}

// ============================================================================
// Request Task
// ============================================================================

/// Races the timeout timer against the HTTP exchange and delivers
/// exactly one terminal outcome.
async fn run(job: RequestJob, completed: Arc<AtomicBool>) {
    let RequestJob {
        target,
        method,
        body,
        timeout,
        keep_alive,
        pools,
        on_success,
        mut on_failure,
    } = job;

    let dispatch = Dispatch {
        target,
        method,
        body,
        keep_alive,
        pools,
    };

    tokio::select! {
        () = sleep(timeout) => {
            deliver_failure(
                &completed,
                &mut on_failure,
                Error::timeout(timeout_millis(timeout)),
            );
        }
        outcome = exchange(&dispatch) => match outcome {
            Ok(payload) => deliver_success(&completed, on_success, payload),
            Err(err) => deliver_failure(&completed, &mut on_failure, err),
        },
    }
}

/// Saturating millisecond count for the timeout error payload.
fn timeout_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

/// Performs one HTTP exchange: connection selection, dispatch, body
/// accumulation, and status routing.
///
/// # Errors
///
/// Only terminal outcomes come back: [`Error::Network`],
/// [`Error::Status`], or [`Error::Parse`].
async fn exchange(job: &Dispatch) -> Result<Value, Error> {
    let target = &job.target;
    let key = target.pool_key();

    let pooled = if job.keep_alive {
        job.pools.checkout(&key, target.tls)
    } else {
        None
    };

    let mut conn = match pooled {
        Some(conn) => conn,
        None => HttpConnection::connect(&target.host, target.port, target.tls).await?,
    };

    let body = Bytes::from(job.body.clone().unwrap_or_default());
    let request = http::Request::builder()
        .method(match job.method {
            Method::Get => http::Method::GET,
            Method::Post => http::Method::POST,
        })
        .uri(target.path.as_str())
        .header(http::header::HOST, target.host_header.as_str())
        .body(Full::new(body))
        .map_err(|e| Error::network(format!("request assembly: {e}")))?;

    let response = conn.send_request(request).await?;
    let status = response.status().as_u16();

    // Accumulate the body; a mid-stream error is a hard failure.
    let mut accumulator = BytesMut::new();
    let mut incoming = response.into_body();
    while let Some(frame) = incoming.frame().await {
        let frame = frame.map_err(|e| Error::network(format!("response stream: {e}")))?;
        if let Some(chunk) = frame.data_ref() {
            accumulator.extend_from_slice(chunk);
        }
    }

    // The exchange completed cleanly, so the socket can be reused.
    if job.keep_alive {
        job.pools.checkin(&key, target.tls, conn);
    }

    let text = String::from_utf8_lossy(&accumulator).into_owned();
    route_status(status, &text)
}

/// Routes a completed response by status code.
fn route_status(status: u16, body: &str) -> Result<Value, Error> {
    if status == 200 {
        return serde_json::from_str(body).map_err(|_| Error::Parse);
    }

    match serde_json::from_str::<Value>(body) {
        Ok(payload) => Err(Error::status_parsed(status, payload, body)),
        Err(_) => Err(Error::status_raw(status, body)),
    }
}

// ============================================================================
// Delivery
// ============================================================================

/// Delivers the success outcome, unless the request already completed.
fn deliver_success(completed: &AtomicBool, callback: Option<SuccessHandler>, payload: Value) {
    if completed.swap(true, Ordering::SeqCst) {
        trace!("late success discarded");
        return;
    }

    debug!("request succeeded");
    if let Some(callback) = callback {
        callback(payload);
    }
}

/// Delivers a failure outcome, unless the request already completed.
fn deliver_failure(completed: &AtomicBool, callback: &mut Option<FailureHandler>, err: Error) {
    if completed.swap(true, Ordering::SeqCst) {
        trace!(error = %err, "late failure discarded");
        return;
    }

    warn!(error = %err, "request failed");
    if let Some(callback) = callback.take() {
        callback(err);
    }
}

// ============================================================================
// Tests
// ============================================================================
