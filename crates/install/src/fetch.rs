// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! HTTPS body fetch, grounded on the teacher's `moss::request`: a single
//! process-wide client reused across calls instead of building one per
//! request.

use bytes::Bytes;
use futures_util::future::BoxFuture;
use once_cell::sync::Lazy;
use url::Url;

use model::NetworkError;

use crate::error::{Error, FetchError};

static CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::ClientBuilder::new()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(crate::environment::FETCH_TIMEOUT)
        .build()
        .expect("build reqwest client")
});

/// Fetches a resource body from a single URL. Implementations decide, per
/// failure, whether the caller should retry (spec §4.5).
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> BoxFuture<'_, Result<Bytes, FetchError>>;
}

/// The production fetcher: a GET against the shared [`reqwest::Client`].
pub struct HttpFetcher;

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> BoxFuture<'_, Result<Bytes, FetchError>> {
        let url = url.clone();
        Box::pin(async move {
            let response = CLIENT.get(url.clone()).send().await.map_err(|e| {
                FetchError::Retryable(Error::Network(NetworkError { url: url.to_string(), message: e.to_string(), retry_after: None }))
            })?;

            let status = response.status();

            if status.is_success() {
                return response.bytes().await.map_err(|e| {
                    FetchError::Retryable(Error::Network(NetworkError {
                        url: url.to_string(),
                        message: e.to_string(),
                        retry_after: None,
                    }))
                });
            }

            let message = format!("unexpected status {status}");
            let network_error = NetworkError { url: url.to_string(), message, retry_after: None };

            match status.as_u16() {
                404 => Err(FetchError::Terminal(Error::Network(NetworkError {
                    url: url.to_string(),
                    message: "not found".to_string(),
                    retry_after: None,
                }))),
                403 => Err(FetchError::Terminal(Error::Network(NetworkError {
                    url: url.to_string(),
                    message: "rate limited or forbidden".to_string(),
                    retry_after: None,
                }))),
                500..=599 | 429 => Err(FetchError::Retryable(Error::Network(network_error))),
                _ => Err(FetchError::Terminal(Error::Network(network_error))),
            }
        })
    }
}

/// Retry a fetch with exponential backoff (base 1s, factor 2, cap 3
/// attempts). Each attempt is bounded by [`crate::environment::FETCH_TIMEOUT`]
/// (spec §5 "Timeouts"); an attempt that exceeds it is treated as retryable.
/// A [`FetchError::Terminal`] is surfaced immediately.
pub async fn fetch_with_retry(fetcher: &dyn Fetcher, url: &Url) -> Result<Bytes, Error> {
    let mut delay = crate::environment::RETRY_BASE_DELAY;

    for attempt in 1..=crate::environment::MAX_FETCH_ATTEMPTS {
        let outcome = tokio::time::timeout(crate::environment::FETCH_TIMEOUT, fetcher.fetch(url))
            .await
            .unwrap_or_else(|_| {
                Err(FetchError::Retryable(Error::Network(NetworkError {
                    url: url.to_string(),
                    message: format!("timed out after {:?}", crate::environment::FETCH_TIMEOUT),
                    retry_after: None,
                })))
            });

        match outcome {
            Ok(bytes) => return Ok(bytes),
            Err(FetchError::Terminal(e)) => return Err(e),
            Err(FetchError::Retryable(e)) => {
                if attempt == crate::environment::MAX_FETCH_ATTEMPTS {
                    return Err(e);
                }
                log::warn!("retrying {url} after transient error: {e} (attempt {attempt})");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
    }

    unreachable!("loop always returns by the final attempt")
}
