//! Page fetching with retry, backoff and per-site request policy.
//!
//! # Architecture
//!
//! - [`HttpClient`]: the seam to the HTTP layer, `get(url, headers, timeout)`
//! - [`ReqwestClient`]: reqwest-backed implementation, either plain or a
//!   browser-like transport (cookie jar, compressed transfer)
//! - [`RetryGet`]: decorator that retries transient failures on any client
//! - [`PageFetcher`]: applies a [`FetchPolicy`] (transport, headers, delay)
//!   and turns every failure into "no content", so one bad site never aborts
//!   a batch
//!
//! # Retry Strategy
//!
//! Timeouts, connection failures, HTTP 429 and 5xx are retried with
//! exponential backoff plus 0-250ms of jitter:
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```

use crate::error::FetchError;
use crate::utils::truncate_for_log;
use rand::{Rng, rng};
use reqwest::StatusCode;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, HeaderMap, HeaderName, HeaderValue, USER_AGENT,
};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// User agent sent by the plain client.
pub const PLAIN_USER_AGENT: &str = concat!("tech_trends_scraper/", env!("CARGO_PKG_VERSION"));

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";

/// Status and body of a completed request, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Rate limits and server errors are worth another attempt.
    pub fn is_transient(&self) -> bool {
        self.status == StatusCode::TOO_MANY_REQUESTS || self.status.is_server_error()
    }
}

/// Trait for issuing a single GET request.
///
/// Implementations report timeouts as [`FetchError::Timeout`] and return
/// non-2xx responses as `Ok` with the status set, so callers can log the two
/// differently.
pub trait HttpClient {
    async fn get(
        &self,
        url: &str,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<HttpResponse, FetchError>;
}

/// reqwest-backed [`HttpClient`].
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// A client for sites that accept ordinary HTTP clients.
    pub fn plain() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(PLAIN_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// A transport for sites behind bot protection.
    ///
    /// Keeps cookies between requests, so challenge cookies issued on the
    /// first response are replayed on the next. Pair it with
    /// [`browser_headers`] (see [`FetchPolicy::browser`]).
    pub fn browser() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }
}

/// Request headers of a desktop Chrome.
pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert(
        HeaderName::from_static("upgrade-insecure-requests"),
        HeaderValue::from_static("1"),
    );
    headers
}

impl HttpClient for ReqwestClient {
    async fn get(
        &self,
        url: &str,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<HttpResponse, FetchError> {
        let result = self
            .client
            .get(url)
            .headers(headers.clone())
            .timeout(timeout)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                    secs: timeout.as_secs(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                    secs: timeout.as_secs(),
                }
            } else {
                FetchError::Http(e)
            }
        })?;
        Ok(HttpResponse { status, body })
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`HttpClient`].
pub struct RetryGet<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T> RetryGet<T>
where
    T: HttpClient,
{
    /// Wrap `inner`, allowing up to `max_retries` extra attempts.
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let shift = u32::try_from(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX)
            .min(16);
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + Duration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryGet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryGet")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> HttpClient for RetryGet<T>
where
    T: HttpClient,
{
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn get(
        &self,
        url: &str,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<HttpResponse, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let result = self.inner.get(url, headers, timeout).await;
            let retryable = match &result {
                Ok(response) => response.is_transient(),
                Err(e) => e.is_transient(),
            };
            if !retryable {
                return result;
            }

            attempt += 1;
            if attempt > self.max_retries {
                warn!(
                    attempt,
                    max = self.max_retries,
                    elapsed_ms_total = total_t0.elapsed().as_millis(),
                    "GET exhausted retries"
                );
                return result;
            }

            let delay = self.backoff(attempt);
            match &result {
                Ok(response) => warn!(
                    attempt,
                    max = self.max_retries,
                    status = response.status.as_u16(),
                    ?delay,
                    "GET returned a transient status; backing off"
                ),
                Err(e) => warn!(
                    attempt,
                    max = self.max_retries,
                    error = %e,
                    ?delay,
                    "GET attempt failed; backing off"
                ),
            }
            sleep(delay).await;
        }
    }
}

/// How a listing page has to be requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Fixed sleep before the request.
    pub pre_request_delay: Option<Duration>,
    /// Route through the browser-impersonating transport.
    pub impersonate_browser: bool,
    /// Headers sent with the request, on top of the transport's own.
    pub headers: HeaderMap,
}

impl FetchPolicy {
    pub fn plain() -> Self {
        Self {
            pre_request_delay: None,
            impersonate_browser: false,
            headers: HeaderMap::new(),
        }
    }

    /// Browser transport, [`browser_headers`] and a fixed delay.
    pub fn browser(pre_request_delay: Duration) -> Self {
        Self {
            pre_request_delay: Some(pre_request_delay),
            impersonate_browser: true,
            headers: browser_headers(),
        }
    }

    pub fn with_delay(mut self, delay: Option<Duration>) -> Self {
        self.pre_request_delay = delay;
        self
    }
}

/// Request timeouts per transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTimeouts {
    pub plain: Duration,
    pub browser: Duration,
}

impl Default for FetchTimeouts {
    fn default() -> Self {
        Self {
            plain: Duration::from_secs(10),
            browser: Duration::from_secs(15),
        }
    }
}

/// Retrieves listing pages; every failure becomes `None`.
#[derive(Debug)]
pub struct PageFetcher<C> {
    plain: C,
    browser: C,
    timeouts: FetchTimeouts,
}

impl<C> PageFetcher<C>
where
    C: HttpClient,
{
    pub fn new(plain: C, browser: C, timeouts: FetchTimeouts) -> Self {
        Self {
            plain,
            browser,
            timeouts,
        }
    }

    /// Fetch `url` under `policy`, returning the body of a 2xx response.
    ///
    /// # Arguments
    ///
    /// * `url` - Listing page to download
    /// * `policy` - Pre-request delay, transport and headers for this site
    ///
    /// # Returns
    ///
    /// `Some(body)` on a 2xx response. Non-2xx statuses, timeouts and
    /// transport errors are logged and yield `None`; retries, if any, happen
    /// inside the client.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use std::time::Duration;
    /// # use tech_trends_scraper::fetcher::{FetchPolicy, FetchTimeouts, PageFetcher};
    /// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
    /// let fetcher =
    ///     PageFetcher::with_retries(2, Duration::from_secs(1), FetchTimeouts::default())?;
    /// let policy = FetchPolicy::browser(Duration::from_secs(1));
    /// if let Some(html) = fetcher.fetch("https://www.datacamp.com/blog", &policy).await {
    ///     println!("{} bytes", html.len());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(level = "info", skip_all, fields(%url, browser = policy.impersonate_browser))]
    pub async fn fetch(&self, url: &str, policy: &FetchPolicy) -> Option<String> {
        if let Some(delay) = policy.pre_request_delay {
            debug!(?delay, "Pre-request delay");
            sleep(delay).await;
        }

        let (client, timeout) = if policy.impersonate_browser {
            (&self.browser, self.timeouts.browser)
        } else {
            (&self.plain, self.timeouts.plain)
        };

        let t0 = Instant::now();
        match client.get(url, &policy.headers, timeout).await {
            Ok(response) if response.is_success() => {
                info!(
                    bytes = response.body.len(),
                    elapsed_ms = t0.elapsed().as_millis(),
                    "Fetched page"
                );
                Some(response.body)
            }
            Ok(response) => {
                warn!(
                    status = response.status.as_u16(),
                    body = %truncate_for_log(&response.body, 200),
                    "Page fetch returned non-success status"
                );
                None
            }
            Err(FetchError::Timeout { secs, .. }) => {
                warn!(secs, "Page fetch timed out");
                None
            }
            Err(e) => {
                error!(error = %e, "Page fetch failed");
                None
            }
        }
    }
}

impl PageFetcher<RetryGet<ReqwestClient>> {
    /// reqwest transports wrapped in [`RetryGet`].
    pub fn with_retries(
        max_retries: usize,
        base_delay: Duration,
        timeouts: FetchTimeouts,
    ) -> Result<Self, FetchError> {
        Ok(Self::new(
            RetryGet::new(ReqwestClient::plain()?, max_retries, base_delay),
            RetryGet::new(ReqwestClient::browser()?, max_retries, base_delay),
            timeouts,
        ))
    }
}
