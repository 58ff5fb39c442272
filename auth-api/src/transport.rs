/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Outbound HTTP with bounded, jittered exponential-backoff retry.
//!
//! A [`ResilientTransport`] wraps one pooled [`reqwest::Client`] and an
//! immutable [`RetryPolicy`]. It is cheap to share behind an `Arc` and safe to
//! use from any number of concurrent requests.
//!
//! Retry rules:
//! - network failures that are transient (timeouts, refused/reset connections,
//!   DNS failures) and `5xx` responses are retried;
//! - `4xx` responses and every other error are returned immediately;
//! - after `max_retries + 1` attempts the last error is returned as-is.
//!
//! The caller's [`CancellationToken`] is observed while a request is in flight
//! and while sleeping between attempts.

use std::error::Error as StdError;
use std::io;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::rngs::OsRng;
use rand::RngCore;
use reqwest::{Client, Request, RequestBuilder, Response, StatusCode};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Retry and timeout settings for one [`ResilientTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Per-attempt timeout applied by the HTTP client.
    pub timeout: Duration,
    /// Retries after the first attempt. `0` disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each subsequent one.
    pub base_backoff: Duration,
    /// Upper bound for the exponential part of the delay.
    pub max_backoff: Duration,
    /// Exclusive upper bound for the random jitter added to every delay.
    pub jitter_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            jitter_max: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Build a policy, rejecting `max_backoff < base_backoff`.
    pub fn new(
        timeout: Duration,
        max_retries: u32,
        base_backoff: Duration,
        max_backoff: Duration,
        jitter_max: Duration,
    ) -> Result<Self, String> {
        let policy = Self {
            timeout,
            max_retries,
            base_backoff,
            max_backoff,
            jitter_max,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_backoff < self.base_backoff {
            return Err(format!(
                "max backoff ({:?}) must not be smaller than base backoff ({:?})",
                self.max_backoff, self.base_backoff
            ));
        }
        Ok(())
    }

    /// Exponential part of the delay before retry `attempt` (1-indexed):
    /// `min(base_backoff * 2^(attempt-1), max_backoff)`.
    pub fn exponential_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32 << (attempt - 1).min(31);
        self.base_backoff
            .checked_mul(factor)
            .unwrap_or(Duration::MAX)
            .min(self.max_backoff)
    }

    /// Full delay before retry `attempt`: exponential part plus fresh jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.exponential_delay(attempt) + jitter(self.jitter_max)
    }
}

// ---------------------------------------------------------------------------
// Jitter
// ---------------------------------------------------------------------------

/// Uniform jitter in `[0, max)` from the OS random source, falling back to a
/// time-derived value when the OS source fails.
pub fn jitter(max: Duration) -> Duration {
    jitter_with(&mut OsRng, max)
}

pub(crate) fn jitter_with<R: RngCore>(rng: &mut R, max: Duration) -> Duration {
    match secure_jitter(rng, max) {
        Some(value) => value,
        None => {
            tracing::debug!("secure random source unavailable, using time-derived jitter");
            time_derived_jitter(max)
        }
    }
}

/// Jitter drawn from `rng`. `None` when the source reports a failure.
pub(crate) fn secure_jitter<R: RngCore>(rng: &mut R, max: Duration) -> Option<Duration> {
    let bound = nanos(max);
    if bound == 0 {
        return Some(Duration::ZERO);
    }
    let mut buf = [0u8; 8];
    rng.try_fill_bytes(&mut buf).ok()?;
    Some(Duration::from_nanos(u64::from_le_bytes(buf) % bound))
}

/// Pseudo-random jitter derived from the wall clock.
pub(crate) fn time_derived_jitter(max: Duration) -> Duration {
    let bound = nanos(max);
    if bound == 0 {
        return Duration::ZERO;
    }
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    Duration::from_nanos(now % bound)
}

fn nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of [`ResilientTransport::execute_with_retry`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The caller's cancellation token fired.
    #[error("request cancelled by caller")]
    Cancelled,

    /// The HTTP client failed before a response was received.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The last attempt returned a retriable (`5xx`) status.
    #[error("upstream returned HTTP {status}")]
    Status { status: StatusCode },
}

impl TransportError {
    /// Whether another attempt may succeed.
    pub fn is_retriable(&self) -> bool {
        match self {
            TransportError::Cancelled => false,
            TransportError::Network(err) => is_transient_network_error(err),
            TransportError::Status { status } => status.is_server_error(),
        }
    }
}

/// Classify a client error by its flags and its `io::Error` causes.
///
/// Timeouts are transient. Connect failures are transient unless an
/// `InvalidData` I/O error sits in the cause chain: rustls reports TLS
/// handshake and certificate failures that way, and those are terminal.
fn is_transient_network_error(err: &reqwest::Error) -> bool {
    if err.is_timeout() {
        return true;
    }
    if err.is_connect() {
        return !has_tls_failure(err);
    }
    any_io_cause(err, |io_err| is_transient_io_kind(io_err.kind()))
}

fn has_tls_failure(err: &(dyn StdError + 'static)) -> bool {
    any_io_cause(err, |io_err| io_err.kind() == io::ErrorKind::InvalidData)
}

fn any_io_cause(err: &(dyn StdError + 'static), pred: impl Fn(&io::Error) -> bool) -> bool {
    let mut source = Some(err);
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if pred(io_err) {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

fn is_transient_io_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::TimedOut
            | io::ErrorKind::UnexpectedEof
    )
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// HTTP client that retries transient failures according to a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct ResilientTransport {
    client: Client,
    policy: RetryPolicy,
}

impl ResilientTransport {
    /// Build a transport with its own connection pool, using `policy.timeout`
    /// as the per-attempt timeout.
    pub fn new(policy: RetryPolicy) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(policy.timeout).build()?;
        Ok(Self { client, policy })
    }

    /// Start a POST request on the underlying client.
    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    /// Send `request`, retrying transient failures.
    ///
    /// Returns the first non-`5xx` response (including `4xx`), or the error of
    /// the last attempt. Requests whose body cannot be cloned are sent once.
    pub async fn execute_with_retry(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<Response, TransportError> {
        let mut request = request;
        let mut attempt: u32 = 0;

        loop {
            let retry_copy = if attempt < self.policy.max_retries {
                request.try_clone()
            } else {
                None
            };

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                res = self.client.execute(request) => res,
            };

            let err = match outcome {
                Ok(response) if !response.status().is_server_error() => return Ok(response),
                Ok(response) => TransportError::Status {
                    status: response.status(),
                },
                Err(e) => TransportError::Network(e),
            };

            let next = match retry_copy {
                Some(next) if err.is_retriable() => next,
                _ => return Err(err),
            };

            attempt += 1;
            let backoff = self.policy.backoff(attempt);
            tracing::info!(
                attempt,
                max_retries = self.policy.max_retries,
                backoff_ms = backoff.as_millis() as u64,
                last_error = %err,
                "retrying HTTP request"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                _ = tokio::time::sleep(backoff) => {}
            }

            request = next;
        }
    }
}
