//! Fallback extractor for sites without dedicated rules.
//!
//! Looks for conventionally named containers (`article`/`div` with class
//! `article`, `post` or `card`) and takes whatever they offer.

use super::{Candidate, Site, SiteExtractor, collect_candidates};
use crate::dates::normalize_date;
use crate::models::{ArticleRecord, UNKNOWN_AUTHOR};
use crate::utils::element_text;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

struct Selectors {
    container: Selector,
    heading: Selector,
    link: Selector,
    author: Selector,
    time: Selector,
}

static SELECTORS: Lazy<Selectors> = Lazy::new(|| Selectors {
    container: Selector::parse(
        "article.article, article.post, article.card, div.article, div.post, div.card",
    )
    .unwrap(),
    heading: Selector::parse("h1, h2, h3").unwrap(),
    link: Selector::parse("a[href]").unwrap(),
    author: Selector::parse("span.author, span.by, p.author, p.by").unwrap(),
    time: Selector::parse("time").unwrap(),
});

/// Relative links are resolved against the listing page itself.
#[derive(Debug, Clone)]
pub struct GenericExtractor {
    base_url: String,
}

impl GenericExtractor {
    pub fn new(page_url: &str) -> Self {
        Self {
            base_url: page_url.to_string(),
        }
    }

    /// RFC 3986 resolution against the page URL; only http(s) links count.
    fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return None;
        }
        let url = match Url::parse(&self.base_url) {
            Ok(base) => base.join(href).ok()?,
            Err(_) => Url::parse(href).ok()?,
        };
        matches!(url.scheme(), "http" | "https").then(|| url.to_string())
    }

    fn extract_container(&self, container: ElementRef<'_>) -> Candidate {
        let title = container
            .select(&SELECTORS.heading)
            .next()
            .map(|h| element_text(&h))
            .unwrap_or_default();
        if title.is_empty() {
            return Candidate::Skip("no heading");
        }

        let Some(href) = container
            .select(&SELECTORS.link)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            return Candidate::Skip("no link");
        };
        let Some(url) = self.resolve(href) else {
            return Candidate::Skip("unusable href");
        };

        let author = container
            .select(&SELECTORS.author)
            .next()
            .map(|el| element_text(&el))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

        let publication_date = container.select(&SELECTORS.time).next().and_then(|time| {
            let raw = time
                .value()
                .attr("datetime")
                .filter(|value| !value.trim().is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| element_text(&time));
            normalize_date(&raw)
        });

        Candidate::Article(ArticleRecord {
            title,
            author,
            url,
            publication_date,
        })
    }
}

impl SiteExtractor for GenericExtractor {
    fn site(&self) -> Site {
        Site::Generic
    }

    fn extract(&self, html: &str) -> Vec<ArticleRecord> {
        let document = Html::parse_document(html);
        collect_candidates(
            Site::Generic,
            document
                .select(&SELECTORS.container)
                .map(|container| self.extract_container(container)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const LISTING: &str = r#"
        <html><body>
          <article class="post">
            <h2><a href="/2024/10/ownership">Understanding Ownership</a></h2>
            <span class="author">Ferris Crab</span>
            <time datetime="2024-10-01">Oct 1</time>
          </article>
          <div class="card">
            <h3>Card With Absolute Link</h3>
            <a href="https://other.example/post">read</a>
            <p class="by">Ann Other</p>
            <time>5 March 2024</time>
          </div>
          <div class="card"><a href="/x">link but no heading</a></div>
          <article class="article"><h1>Heading without link</h1></article>
          <section class="post"><h2><a href="/ignored">Wrong container tag</a></h2></section>
        </body></html>
    "#;

    #[test]
    fn test_extracts_conventional_containers() {
        let records = GenericExtractor::new("https://blog.example.com/").extract(LISTING);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].title, "Understanding Ownership");
        assert_eq!(records[0].url, "https://blog.example.com/2024/10/ownership");
        assert_eq!(records[0].author, "Ferris Crab");
        assert_eq!(
            records[0].publication_date,
            NaiveDate::from_ymd_opt(2024, 10, 1)
        );

        assert_eq!(records[1].title, "Card With Absolute Link");
        assert_eq!(records[1].url, "https://other.example/post");
        assert_eq!(records[1].author, "Ann Other");
        assert_eq!(
            records[1].publication_date,
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
    }

    #[test]
    fn test_root_relative_links_resolve_against_origin() {
        let html = r#"<article class="card"><h2>T</h2><a href="/t">t</a></article>"#;
        let records = GenericExtractor::new("https://e.example/blog/page-2").extract(html);
        assert_eq!(records[0].url, "https://e.example/t");
    }

    #[test]
    fn test_empty_datetime_falls_back_to_text() {
        let html = r#"
            <article class="post">
              <h2><a href="/a">A</a></h2>
              <time datetime="">12 June 2024</time>
            </article>
            <article class="post">
              <h2><a href="/b">B</a></h2>
              <time datetime="  ">not a date</time>
            </article>
        "#;
        let records = GenericExtractor::new("https://e.example/").extract(html);
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].publication_date,
            NaiveDate::from_ymd_opt(2024, 6, 12)
        );
        assert_eq!(records[1].publication_date, None);
    }

    #[test]
    fn test_missing_author_is_unknown() {
        let html = r#"<div class="post"><h2><a href="https://e.example/a">A</a></h2></div>"#;
        let records = GenericExtractor::new("https://e.example").extract(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].author, UNKNOWN_AUTHOR);
        assert_eq!(records[0].publication_date, None);
    }
}
