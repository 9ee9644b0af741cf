//! Registry transport: a reqwest client wrapper that retries what can be retried.

mod client;
mod retry;

pub use client::HttpClient;
pub use retry::{MAX_ATTEMPTS, NonRetryableError, check_retryable, classify_error};
