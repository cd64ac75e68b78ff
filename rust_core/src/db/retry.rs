//! Retry with exponential backoff for transient store failures.
//!
//! Used by the row-store and dedup-store adapters; per-item callers never see
//! a transient error that a second attempt would have cleared.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Run `f` up to `max_attempts` times while the error looks transient.
///
/// # Example
/// ```ignore
/// use tipsheet_core::db::retry::execute_with_retry;
///
/// let rows = execute_with_retry(|| async { sheets.read_all("APOSTAS").await }, 3).await?;
/// ```
pub async fn execute_with_retry<F, Fut, T>(f: F, max_attempts: u32) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    execute_with_retry_custom(f, max_attempts, 500, 8_000).await
}

/// Same as [`execute_with_retry`] with explicit backoff bounds.
pub async fn execute_with_retry_custom<F, Fut, T>(
    f: F,
    max_attempts: u32,
    base_backoff_ms: u64,
    max_backoff_ms: u64,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_loop(f, max_attempts, base_backoff_ms, max_backoff_ms, is_retriable_error).await
}

/// Retry only while `retriable` accepts the error.
///
/// Writes that are not idempotent pass [`is_unsent_error`] so a request the
/// server may already have applied is never sent twice.
pub async fn execute_with_retry_when<F, Fut, T, P>(f: F, max_attempts: u32, retriable: P) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&anyhow::Error) -> bool,
{
    retry_loop(f, max_attempts, 500, 8_000, retriable).await
}

async fn retry_loop<F, Fut, T, P>(
    mut f: F,
    max_attempts: u32,
    base_backoff_ms: u64,
    max_backoff_ms: u64,
    retriable: P,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&anyhow::Error) -> bool,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt < max_attempts && retriable(&e) => {
                let backoff_ms = (base_backoff_ms * 2_u64.pow(attempt - 1)).min(max_backoff_ms);
                warn!(
                    "Store operation failed (attempt {}/{}): {:#}. Retrying in {}ms",
                    attempt, max_attempts, e, backoff_ms
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// The request never reached the server, or was refused before being applied.
///
/// Timeouts and 5xx answers are excluded: the write may have landed anyway.
pub fn is_unsent_error(e: &anyhow::Error) -> bool {
    if let Some(req) = e.chain().find_map(|c| c.downcast_ref::<reqwest::Error>()) {
        if req.is_connect() {
            return true;
        }
        return req.status().is_some_and(|status| status.as_u16() == 429);
    }

    let err_str = format!("{:#}", e).to_lowercase();
    err_str.contains("connection refused")
        || err_str.contains("dns error")
        || err_str.contains("429")
        || err_str.contains("too many requests")
}

/// Connection trouble, rate limiting and 5xx answers are worth another try.
pub fn is_retriable_error(e: &anyhow::Error) -> bool {
    if let Some(req) = e.chain().find_map(|c| c.downcast_ref::<reqwest::Error>()) {
        if req.is_timeout() || req.is_connect() {
            return true;
        }
        if let Some(status) = req.status() {
            return status.as_u16() == 429 || status.is_server_error();
        }
    }

    let err_str = format!("{:#}", e).to_lowercase();
    err_str.contains("timeout")
        || err_str.contains("timed out")
        || err_str.contains("connection reset")
        || err_str.contains("connection refused")
        || err_str.contains("connection closed")
        || err_str.contains("broken pipe")
        || err_str.contains("database is locked")
        || err_str.contains("429")
        || err_str.contains("too many requests")
        || err_str.contains("rate limit")
        || err_str.contains("status 500")
        || err_str.contains("status 502")
        || err_str.contains("status 503")
        || err_str.contains("status 504")
}
