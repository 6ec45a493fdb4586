//! HTTP retry helpers for transient errors.
//!
//! Every Nominatim call goes through [`send_json`] instead of calling
//! `reqwest::blocking::RequestBuilder::send()` directly, so each request
//! is retried on timeouts, connection resets, server errors and rate
//! limiting.
//!
//! # Usage
//!
//! ```ignore
//! use crate::retry::{self, RetryPolicy};
//!
//! let policy = RetryPolicy::new(9, Duration::from_secs(10));
//! let body = retry::send_json(|| client.get(&url).query(&params), &policy)?;
//! ```

use std::time::Duration;

use reqwest::StatusCode;
use surplus_models::GeocodeError;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Fixed wait before each retry.
    pub wait: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_retries: u32, wait: Duration) -> Self {
        Self { max_retries, wait }
    }
}

/// What to do with a response of a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusAction {
    Accept,
    Retry,
    Fail,
}

/// 429 and 5xx are retried, other 4xx are permanent.
fn classify_status(status: StatusCode) -> StatusAction {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        StatusAction::Retry
    } else if status.is_client_error() {
        StatusAction::Fail
    } else {
        StatusAction::Accept
    }
}

/// Sends an HTTP request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::blocking::RequestBuilder`] (since builders are
/// consumed by `.send()`).
///
/// # Errors
///
/// * [`GeocodeError::RateLimited`] if the server still answers 429 after
///   all retries
/// * [`GeocodeError::Http`] on connection failures, 5xx after all retries,
///   or any other 4xx
/// * [`GeocodeError::Parse`] if the body is not valid JSON
pub fn send_json<F>(build_request: F, policy: &RetryPolicy) -> Result<serde_json::Value, GeocodeError>
where
    F: Fn() -> reqwest::blocking::RequestBuilder,
{
    let response = send_inner(&build_request, policy)?;

    let url = response.url().to_string();
    let status = response.status();

    let text = response.text().map_err(|e| GeocodeError::Http {
        message: format!("failed to read response body from {url}: {e}"),
    })?;

    serde_json::from_str(&text).map_err(|json_err| {
        log::error!(
            "JSON parse failed.\n  \
             url: {url}\n  \
             status: {status}\n  \
             received: {} bytes\n  \
             parse error: {json_err}\n  \
             body preview: {}",
            text.len(),
            preview(&text),
        );
        GeocodeError::Parse {
            message: format!(
                "JSON parse failed: {json_err} (status={status}, received {} bytes)",
                text.len()
            ),
        }
    })
}

/// Sends the request built by `build_request`, retrying on transient
/// errors up to `policy.max_retries` times with a fixed wait. Returns the
/// successful response (status 2xx or 3xx).
fn send_inner<F>(
    build_request: &F,
    policy: &RetryPolicy,
) -> Result<reqwest::blocking::Response, GeocodeError>
where
    F: Fn() -> reqwest::blocking::RequestBuilder,
{
    let max_retries = policy.max_retries;
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            log::warn!("  retry {attempt}/{max_retries} in {:?}...", policy.wait);
            std::thread::sleep(policy.wait);
        }

        match build_request().send() {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    attempt += 1;
                    continue;
                }
                return Err(GeocodeError::Http {
                    message: e.to_string(),
                });
            }
            Ok(response) => {
                let status = response.status();

                match classify_status(status) {
                    StatusAction::Accept => return Ok(response),
                    StatusAction::Fail => {
                        return Err(GeocodeError::Http {
                            message: format!("HTTP {status}"),
                        });
                    }
                    StatusAction::Retry if attempt < max_retries => {
                        log::warn!("  HTTP {status}");
                        attempt += 1;
                    }
                    StatusAction::Retry if status == StatusCode::TOO_MANY_REQUESTS => {
                        return Err(GeocodeError::RateLimited);
                    }
                    StatusAction::Retry => {
                        return Err(GeocodeError::Http {
                            message: format!("HTTP {status} after {max_retries} retries"),
                        });
                    }
                }
            }
        }
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode() || e.is_request()
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(BODY_PREVIEW_LEN) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
