//! Per-URL scrape pipelines and the bounded worker pool that runs them.
//!
//! Each source URL moves through
//! `Pending → Fetching → Extracting → Persisting → {Succeeded, Failed}`.
//! A pipeline fails only at fetching (no content) or extracting (no
//! articles); once persistence starts it always succeeds and per-record
//! problems are counted in [`SiteOutcome::errors`].

use crate::authors::AuthorResolver;
use crate::config::Config;
use crate::error::StoreError;
use crate::extractors::{Site, SiteRegistry};
use crate::fetcher::{FetchPolicy, HttpClient, PageFetcher, ReqwestClient};
use crate::models::{AggregateStats, ArticleRecord, SiteOutcome, UNKNOWN_AUTHOR};
use crate::store::{AddOutcome, Store};
use futures::stream::{self, StreamExt};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

pub const FETCH_FAILED: &str = "Failed to fetch content";
pub const EXTRACT_FAILED: &str = "Failed to extract articles";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Pending,
    Fetching,
    Extracting,
    Persisting,
    Succeeded,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Pending => "pending",
            Stage::Fetching => "fetching",
            Stage::Extracting => "extracting",
            Stage::Persisting => "persisting",
            Stage::Succeeded => "succeeded",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks one pipeline's stage and logs every transition.
struct Progress {
    stage: Stage,
    started: Instant,
}

impl Progress {
    fn new() -> Self {
        Self {
            stage: Stage::Pending,
            started: Instant::now(),
        }
    }

    fn advance(&mut self, next: Stage) {
        debug!(
            from = %self.stage,
            to = %next,
            elapsed_ms = self.started.elapsed().as_millis(),
            "Stage transition"
        );
        self.stage = next;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Pipelines in flight at once; never less than one.
    pub workers: usize,
    /// Detail-page author lookups per source URL.
    pub author_lookup_limit: usize,
    /// Replaces the built-in pre-request delay of browser-fetched sites.
    pub browser_delay: Option<Duration>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            workers: 5,
            author_lookup_limit: 3,
            browser_delay: None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Tally {
    created: usize,
    skipped: usize,
    errors: usize,
}

/// `C` fetches listing pages; `A` fetches detail pages for author lookups
/// and should not retry on its own, since the resolver handles 429s.
pub struct Orchestrator<'a, C, A> {
    store: &'a Store,
    fetcher: PageFetcher<C>,
    lookup_client: A,
    resolver: AuthorResolver,
    registry: SiteRegistry,
    settings: OrchestratorSettings,
}

impl<'a, C, A> Orchestrator<'a, C, A>
where
    C: HttpClient,
    A: HttpClient,
{
    pub fn new(
        store: &'a Store,
        fetcher: PageFetcher<C>,
        lookup_client: A,
        resolver: AuthorResolver,
        registry: SiteRegistry,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            store,
            fetcher,
            lookup_client,
            resolver,
            registry,
            settings,
        }
    }

    fn policy_for(&self, site: Site) -> FetchPolicy {
        let policy = site.fetch_policy();
        match self.settings.browser_delay {
            Some(delay) if policy.impersonate_browser => policy.with_delay(Some(delay)),
            _ => policy,
        }
    }

    /// Run every URL through its pipeline, at most `workers` at a time.
    ///
    /// Outcomes come back in completion order, not input order.
    #[instrument(
        level = "info",
        skip_all,
        fields(urls = urls.len(), workers = self.settings.workers)
    )]
    pub async fn scrape_many(&self, urls: &[String]) -> (Vec<SiteOutcome>, AggregateStats) {
        let workers = self.settings.workers.max(1);
        info!("Starting scrape batch");

        let outcomes: Vec<SiteOutcome> = stream::iter(urls)
            .map(|url| self.scrape_one(url))
            .buffer_unordered(workers)
            .collect()
            .await;

        let stats = AggregateStats::from_outcomes(&outcomes);
        info!(
            successful = stats.successful_sources,
            failed = stats.failed_sources,
            created = stats.total_created,
            skipped = stats.total_skipped,
            errors = stats.total_errors,
            "Scrape batch finished"
        );
        (outcomes, stats)
    }

    #[instrument(level = "info", skip(self), fields(site))]
    pub async fn scrape_one(&self, url: &str) -> SiteOutcome {
        let site = self.registry.resolve(url);
        tracing::Span::current().record("site", site.name());
        let mut progress = Progress::new();

        progress.advance(Stage::Fetching);
        let Some(html) = self.fetcher.fetch(url, &self.policy_for(site)).await else {
            progress.advance(Stage::Failed);
            return SiteOutcome::failure(url, FETCH_FAILED);
        };

        progress.advance(Stage::Extracting);
        let records = site.extractor(url).extract(&html);
        if records.is_empty() {
            warn!("No articles found on page");
            progress.advance(Stage::Failed);
            return SiteOutcome::failure(url, EXTRACT_FAILED);
        }

        progress.advance(Stage::Persisting);
        let tally = self.persist(site, records).await;
        progress.advance(Stage::Succeeded);
        info!(
            created = tally.created,
            skipped = tally.skipped,
            errors = tally.errors,
            "Source processed"
        );
        SiteOutcome::success(url, tally.created, tally.skipped, tally.errors)
    }

    async fn persist(&self, site: Site, records: Vec<ArticleRecord>) -> Tally {
        let mut tally = Tally::default();
        let mut lookups = 0usize;

        for mut record in records {
            if site.resolves_authors_from_detail_pages()
                && record.author_is_unknown()
                && lookups < self.settings.author_lookup_limit
                && !self.already_stored(&record.url).await
            {
                lookups += 1;
                if let Some(name) = self
                    .resolver
                    .resolve(&self.lookup_client, &record.url)
                    .await
                {
                    record.author = name;
                }
            }

            match self.persist_record(&record).await {
                Ok(AddOutcome::Created(_)) => tally.created += 1,
                // Blank URLs count as skipped, like existing articles.
                Ok(AddOutcome::Skipped | AddOutcome::Rejected) => tally.skipped += 1,
                Err(e) => {
                    error!(url = %record.url, error = %e, "Failed to persist article");
                    tally.errors += 1;
                }
            }
        }
        tally
    }

    async fn already_stored(&self, url: &str) -> bool {
        matches!(self.store.get_article_by_url(url).await, Ok(Some(_)))
    }

    async fn persist_record(&self, record: &ArticleRecord) -> Result<AddOutcome, StoreError> {
        let name = match record.author.trim() {
            "" => UNKNOWN_AUTHOR,
            name => name,
        };
        let author = self.store.get_or_create_author(name).await?;
        self.store.add_article_if_new(record, &author).await
    }
}

/// Open the configured store, scrape `urls` with `workers` pipelines and
/// close the store.
///
/// If the store or the HTTP clients cannot be set up, every URL is reported
/// as failed and nothing is fetched.
pub async fn scrape_many(
    config: &Config,
    urls: &[String],
    workers: usize,
) -> (Vec<SiteOutcome>, AggregateStats) {
    let store = match Store::open(&config.database).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, path = %config.database.display(), "Could not open store");
            return all_failed(urls, &format!("Database unavailable: {e}"));
        }
    };

    let clients = PageFetcher::with_retries(
        config.fetch.max_retries,
        config.retry_base_delay(),
        config.fetch_timeouts(),
    )
    .and_then(|fetcher| Ok((fetcher, ReqwestClient::plain()?)));
    let (fetcher, lookup_client) = match clients {
        Ok(clients) => clients,
        Err(e) => {
            error!(error = %e, "Could not build HTTP clients");
            store.close().await;
            return all_failed(urls, &format!("HTTP client unavailable: {e}"));
        }
    };

    let orchestrator = Orchestrator::new(
        &store,
        fetcher,
        lookup_client,
        AuthorResolver::new(config.resolver_settings()),
        config.registry(),
        config.orchestrator_settings(workers),
    );
    let result = orchestrator.scrape_many(urls).await;
    store.close().await;
    result
}

fn all_failed(urls: &[String], message: &str) -> (Vec<SiteOutcome>, AggregateStats) {
    let outcomes: Vec<SiteOutcome> = urls
        .iter()
        .map(|url| SiteOutcome::failure(url, message))
        .collect();
    let stats = AggregateStats::from_outcomes(&outcomes);
    (outcomes, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authors::ResolverSettings;
    use crate::fetcher::{FetchTimeouts, RetryGet};
    use crate::models::ArticleFilter;
    use tempfile::{TempDir, tempdir};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERIC_LISTING: &str = r#"
        <html><body>
          <article class="post">
            <h2><a href="/posts/ownership">Understanding Ownership</a></h2>
            <span class="author">Ferris Crab</span>
            <time datetime="2024-10-01">Oct 1</time>
          </article>
          <article class="post">
            <h2><a href="/posts/lifetimes">Lifetimes Demystified</a></h2>
            <span class="author">Ferris Crab</span>
          </article>
          <div class="card">
            <h3><a href="/posts/async">Async Basics</a></h3>
          </div>
        </body></html>
    "#;

    async fn open_temp() -> (TempDir, Store) {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("scrape.db")).await.unwrap();
        (dir, store)
    }

    fn fetcher() -> PageFetcher<RetryGet<ReqwestClient>> {
        PageFetcher::with_retries(0, Duration::from_millis(1), FetchTimeouts::default()).unwrap()
    }

    fn resolver() -> AuthorResolver {
        AuthorResolver::new(ResolverSettings {
            delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            timeout: Duration::from_secs(5),
        })
    }

    fn orchestrator<'a>(
        store: &'a Store,
        registry: SiteRegistry,
        author_lookup_limit: usize,
    ) -> Orchestrator<'a, RetryGet<ReqwestClient>, ReqwestClient> {
        Orchestrator::new(
            store,
            fetcher(),
            ReqwestClient::plain().unwrap(),
            resolver(),
            registry,
            OrchestratorSettings {
                workers: 2,
                author_lookup_limit,
                browser_delay: Some(Duration::ZERO),
            },
        )
    }

    async fn serve(server: &MockServer, at: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_one_source_fails_other_succeeds() {
        let server = MockServer::start().await;
        serve(&server, "/blog", GENERIC_LISTING).await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (_dir, store) = open_temp().await;
        let orchestrator = orchestrator(&store, SiteRegistry::default(), 3);
        let urls = vec![
            format!("{}/down", server.uri()),
            format!("{}/blog", server.uri()),
        ];
        let (outcomes, stats) = orchestrator.scrape_many(&urls).await;

        assert_eq!(stats.total_sources, 2);
        assert_eq!(stats.successful_sources, 1);
        assert_eq!(stats.failed_sources, 1);
        assert_eq!(stats.total_created, 3);
        assert_eq!(stats.total_errors, 1);

        let failed = outcomes.iter().find(|o| !o.is_success()).unwrap();
        assert_eq!(failed.url, urls[0]);
        assert_eq!(failed.message.as_deref(), Some(FETCH_FAILED));

        let stored = store.list_articles(&ArticleFilter::default()).await.unwrap();
        assert_eq!(stored.len(), 3);
        assert!(stored.iter().any(|a| a.author == "Ferris Crab"));
        assert!(stored.iter().any(|a| a.author == UNKNOWN_AUTHOR));
    }

    #[tokio::test]
    async fn test_rerun_skips_everything() {
        let server = MockServer::start().await;
        serve(&server, "/blog", GENERIC_LISTING).await;

        let (_dir, store) = open_temp().await;
        let orchestrator = orchestrator(&store, SiteRegistry::default(), 3);
        let url = format!("{}/blog", server.uri());

        let first = orchestrator.scrape_one(&url).await;
        assert_eq!((first.created, first.skipped, first.errors), (3, 0, 0));

        let second = orchestrator.scrape_one(&url).await;
        assert!(second.is_success());
        assert_eq!((second.created, second.skipped, second.errors), (0, 3, 0));
        assert_eq!(store.stats().await.unwrap().total_articles, 3);
    }

    #[tokio::test]
    async fn test_page_without_articles_fails_extraction() {
        let server = MockServer::start().await;
        serve(&server, "/empty", "<html><body><p>Empty</p></body></html>").await;

        let (_dir, store) = open_temp().await;
        let orchestrator = orchestrator(&store, SiteRegistry::default(), 3);
        let url = format!("{}/empty", server.uri());
        let outcome = orchestrator.scrape_one(&url).await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.errors, 1);
        assert_eq!(outcome.message.as_deref(), Some(EXTRACT_FAILED));
    }

    #[tokio::test]
    async fn test_detail_page_authors_respect_lookup_limit() {
        let server = MockServer::start().await;
        let base = server.uri();
        let listing = format!(
            r#"<html><body>
                <div class="card border-0">
                  <a href="{base}/first/"><h2 class="card-title">First</h2></a>
                </div>
                <div class="card border-0">
                  <a href="{base}/second/"><h2 class="card-title">Second</h2></a>
                </div>
            </body></html>"#
        );
        let detail = r#"
            <div class="card" id="author">
              <p class="card-header"><strong>Dan Bader</strong></p>
            </div>
        "#;
        serve(&server, "/", &listing).await;
        serve(&server, "/first/", detail).await;
        serve(&server, "/second/", detail).await;

        let (_dir, store) = open_temp().await;
        let registry = SiteRegistry::default().with_rule("127.0.0.1", Site::RealPython);
        let orchestrator = orchestrator(&store, registry, 1);
        let outcome = orchestrator.scrape_one(&format!("{base}/")).await;
        assert_eq!(outcome.created, 2);

        let first = store
            .get_article_by_url(&format!("{base}/first/"))
            .await
            .unwrap()
            .unwrap();
        let second = store
            .get_article_by_url(&format!("{base}/second/"))
            .await
            .unwrap()
            .unwrap();
        let dan = store
            .get_author_by_name("Dan Bader")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.author_id, dan.author_id);
        assert_ne!(second.author_id, dan.author_id);
    }

    #[tokio::test]
    async fn test_unopenable_store_fails_every_url() {
        let dir = tempdir().unwrap();
        let config = Config {
            // A directory cannot be opened as a database file.
            database: dir.path().to_path_buf(),
            ..Config::default()
        };
        let urls = vec![
            "https://realpython.com/".to_string(),
            "https://www.datacamp.com/blog".to_string(),
        ];
        let (outcomes, stats) = scrape_many(&config, &urls, 2).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| !o.is_success()));
        assert_eq!(stats.failed_sources, 2);
        assert_eq!(stats.total_errors, 2);
    }

    #[tokio::test]
    async fn test_browser_delay_override_only_touches_browser_sites() {
        let (_dir, store) = open_temp().await;
        let orchestrator = orchestrator(&store, SiteRegistry::default(), 3);
        assert_eq!(
            orchestrator.policy_for(Site::DataCamp).pre_request_delay,
            Some(Duration::ZERO)
        );
        assert!(orchestrator.policy_for(Site::DataCamp).impersonate_browser);
        assert_eq!(
            orchestrator.policy_for(Site::RealPython).pre_request_delay,
            None
        );
        assert_eq!(orchestrator.policy_for(Site::Generic), FetchPolicy::plain());
    }
}
