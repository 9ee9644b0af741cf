//! JSON GET requests against the registry, retried on transient failures.

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;

use super::retry::{MAX_ATTEMPTS, NonRetryableError, RETRY_DELAY_MS, check_retryable};

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    retry_delay: Duration,
}

impl HttpClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }

    /// Overrides the pause between attempts.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Fetches and decodes a JSON document. Transient failures are retried up
    /// to [`MAX_ATTEMPTS`] times; a [`NonRetryableError`] ends the loop at once.
    #[tracing::instrument(skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.with_retry(url, || async {
            let response = self
                .client
                .get(url)
                .header(ACCEPT, "application/json")
                .send()
                .await
                .with_context(|| format!("Failed to reach {}", url))?
                .error_for_status()
                .map_err(check_retryable)?;

            response
                .json::<T>()
                .await
                .with_context(|| format!("Unexpected response from {}", url))
        })
        .await
    }

    /// Like [`HttpClient::get_json`], but a 404 yields `Ok(None)`.
    #[tracing::instrument(skip(self))]
    pub async fn get_json_optional<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        match self.get_json(url).await {
            Ok(document) => Ok(Some(document)),
            Err(e) if is_not_found(&e) => {
                debug!("{} not found", url);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn with_retry<F, Fut, T>(&self, url: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if is_permanent(&e) || attempt >= MAX_ATTEMPTS => return Err(e),
                Err(e) => {
                    warn!(
                        "GET {} failed (attempt {}/{}): {:#}; retrying in {}ms",
                        url,
                        attempt,
                        MAX_ATTEMPTS,
                        e,
                        self.retry_delay.as_millis()
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.downcast_ref::<NonRetryableError>() == Some(&NonRetryableError::NotFound)
}

fn is_permanent(e: &anyhow::Error) -> bool {
    e.downcast_ref::<NonRetryableError>().is_some()
}
