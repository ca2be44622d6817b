//! Author lookup on article detail pages.
//!
//! Real Python lists articles without authors. For those records the
//! orchestrator asks [`AuthorResolver`] to open the article itself and read
//! the author card. Every failure (missing markup, timeout, HTTP 429) is
//! logged and yields `None`; the record then keeps its `"Unknown"` author.

use crate::error::FetchError;
use crate::fetcher::HttpClient;
use crate::utils::element_text;
use once_cell::sync::Lazy;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use scraper::{ElementRef, Html, Selector};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

struct Selectors {
    author_card: Selector,
    header: Selector,
    name: Selector,
}

static SELECTORS: Lazy<Selectors> = Lazy::new(|| Selectors {
    author_card: Selector::parse("div.card#author").unwrap(),
    header: Selector::parse("p.card-header").unwrap(),
    name: Selector::parse("strong").unwrap(),
});

/// Read the author name from a detail page.
///
/// Primary: `div.card#author` → `p.card-header` → `strong`. Fallback: the
/// first `p.card-header` anywhere on the page → `strong`.
pub fn extract_author(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let primary = document
        .select(&SELECTORS.author_card)
        .next()
        .and_then(|card| card.select(&SELECTORS.header).next())
        .and_then(|header| name_in(&header));
    if primary.is_some() {
        return primary;
    }

    document
        .select(&SELECTORS.header)
        .next()
        .and_then(|header| name_in(&header))
}

fn name_in(header: &ElementRef<'_>) -> Option<String> {
    header
        .select(&SELECTORS.name)
        .next()
        .map(|strong| element_text(&strong))
        .filter(|name| !name.is_empty())
}

/// Delay and timeout for detail-page lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Slept before every lookup, regardless of recent traffic.
    pub delay: Duration,
    /// Ceiling for the delay after consecutive 429 responses.
    pub max_delay: Duration,
    pub timeout: Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Fetches detail pages and extracts their author.
///
/// Each HTTP 429 doubles the pre-request delay (up to `max_delay`) for the
/// following lookups; a successful response resets it.
#[derive(Debug)]
pub struct AuthorResolver {
    settings: ResolverSettings,
    consecutive_rate_limits: AtomicU32,
}

impl AuthorResolver {
    pub fn new(settings: ResolverSettings) -> Self {
        Self {
            settings,
            consecutive_rate_limits: AtomicU32::new(0),
        }
    }

    /// The delay the next lookup will sleep.
    pub fn current_delay(&self) -> Duration {
        let doublings = self.consecutive_rate_limits.load(Ordering::Relaxed).min(16);
        self.settings
            .delay
            .saturating_mul(1 << doublings)
            .min(self.settings.max_delay.max(self.settings.delay))
    }

    /// Look up the author of one article on its detail page.
    ///
    /// Sleeps [`current_delay`](Self::current_delay) first, then issues a
    /// single GET through `client`. An HTTP 429 lengthens the delay of the
    /// next lookup; any successful response resets it.
    ///
    /// # Arguments
    ///
    /// * `client` - Transport for the detail page. It should not retry on
    ///   its own, since the backoff lives here.
    /// * `article_url` - Absolute URL of the article
    ///
    /// # Returns
    ///
    /// The author name, or `None` on timeout, rate limiting, any non-2xx
    /// status or a page without author markup.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use tech_trends_scraper::authors::{AuthorResolver, ResolverSettings};
    /// # use tech_trends_scraper::fetcher::ReqwestClient;
    /// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
    /// let resolver = AuthorResolver::new(ResolverSettings::default());
    /// let client = ReqwestClient::plain()?;
    /// let author = resolver
    ///     .resolve(&client, "https://realpython.com/python-type-hints/")
    ///     .await
    ///     .unwrap_or_else(|| "Unknown".to_string());
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(level = "info", skip_all, fields(url = %article_url))]
    pub async fn resolve<C: HttpClient>(&self, client: &C, article_url: &str) -> Option<String> {
        let delay = self.current_delay();
        debug!(?delay, "Rate-limit delay before author lookup");
        sleep(delay).await;

        let response = match client
            .get(article_url, &HeaderMap::new(), self.settings.timeout)
            .await
        {
            Ok(response) => response,
            Err(FetchError::Timeout { secs, .. }) => {
                warn!(secs, "Timeout fetching author page");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Error fetching author page");
                return None;
            }
        };

        if response.status == StatusCode::TOO_MANY_REQUESTS {
            let streak = self.consecutive_rate_limits.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(
                streak,
                next_delay = ?self.current_delay(),
                "Rate limited (429); skipping author lookup"
            );
            return None;
        }
        if !response.is_success() {
            let status = response.status.as_u16();
            warn!(status, "HTTP error fetching author page");
            return None;
        }
        self.consecutive_rate_limits.store(0, Ordering::Relaxed);

        let author = extract_author(&response.body);
        match &author {
            Some(name) => info!(author = %name, "Resolved author"),
            None => debug!("No author markup on detail page"),
        }
        author
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::ReqwestClient;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DETAIL_PAGE: &str = r#"
        <html><body>
          <div class="card mt-3" id="author">
            <p class="card-header h3">About <strong>Leodanis Pozo Ramos</strong></p>
          </div>
        </body></html>
    "#;

    fn quick() -> AuthorResolver {
        AuthorResolver::new(ResolverSettings {
            delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(8),
            timeout: Duration::from_secs(5),
        })
    }

    #[test]
    fn test_primary_author_card() {
        assert_eq!(
            extract_author(DETAIL_PAGE).as_deref(),
            Some("Leodanis Pozo Ramos")
        );
    }

    #[test]
    fn test_fallback_header_anywhere() {
        let html = r#"
            <div class="card mt-3" id="author"><p>no header here</p></div>
            <aside><p class="card-header h3"><strong>Bartosz Zaczyński</strong></p></aside>
        "#;
        assert_eq!(extract_author(html).as_deref(), Some("Bartosz Zaczyński"));
    }

    #[test]
    fn test_no_markup() {
        assert_eq!(
            extract_author("<html><body><p>Hello</p></body></html>"),
            None
        );
        assert_eq!(
            extract_author(r#"<p class="card-header"><strong>  </strong></p>"#),
            None
        );
    }

    #[tokio::test]
    async fn test_resolve_reads_detail_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/python-walrus-operator/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DETAIL_PAGE))
            .mount(&server)
            .await;

        let client = ReqwestClient::plain().unwrap();
        let url = format!("{}/python-walrus-operator/", server.uri());
        let author = quick().resolve(&client, &url).await;
        assert_eq!(author.as_deref(), Some("Leodanis Pozo Ramos"));
    }

    #[tokio::test]
    async fn test_rate_limit_degrades_and_escalates_delay() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = ReqwestClient::plain().unwrap();
        let resolver = quick();
        assert_eq!(resolver.current_delay(), Duration::from_millis(1));

        assert_eq!(resolver.resolve(&client, &server.uri()).await, None);
        assert_eq!(resolver.current_delay(), Duration::from_millis(2));
        assert_eq!(resolver.resolve(&client, &server.uri()).await, None);
        assert_eq!(resolver.resolve(&client, &server.uri()).await, None);
        assert_eq!(resolver.resolve(&client, &server.uri()).await, None);
        assert_eq!(resolver.current_delay(), Duration::from_millis(8));
    }

    #[tokio::test]
    async fn test_not_found_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = ReqwestClient::plain().unwrap();
        assert_eq!(quick().resolve(&client, &server.uri()).await, None);
    }
}
