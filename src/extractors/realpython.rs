//! Real Python listing pages (<https://realpython.com>).
//!
//! Article cards are `div`s carrying both `card` and `border-0`. The homepage
//! does not show authors; records leave with the `"Unknown"` sentinel and the
//! orchestrator resolves them from detail pages via
//! [`AuthorResolver`](crate::authors::AuthorResolver).

use super::{Candidate, Site, SiteExtractor, collect_candidates};
use crate::dates::{mentions_month_abbrev, normalize_date};
use crate::models::{ArticleRecord, UNKNOWN_AUTHOR};
use crate::utils::{absolutize_url, element_text};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

struct Rules {
    base_url: &'static str,
    card: &'static str,
    link: &'static str,
    title: &'static str,
    title_fallback: &'static str,
    date: &'static str,
}

const RULES: Rules = Rules {
    base_url: "https://realpython.com",
    card: "div.card.border-0",
    link: "a[href]",
    title: "h2.card-title",
    title_fallback: "h2",
    date: "span.mr-2",
};

struct Selectors {
    card: Selector,
    link: Selector,
    title: Selector,
    title_fallback: Selector,
    date: Selector,
}

static SELECTORS: Lazy<Selectors> = Lazy::new(|| Selectors {
    card: Selector::parse(RULES.card).unwrap(),
    link: Selector::parse(RULES.link).unwrap(),
    title: Selector::parse(RULES.title).unwrap(),
    title_fallback: Selector::parse(RULES.title_fallback).unwrap(),
    date: Selector::parse(RULES.date).unwrap(),
});

#[derive(Debug, Clone, Copy, Default)]
pub struct RealPythonExtractor;

impl SiteExtractor for RealPythonExtractor {
    fn site(&self) -> Site {
        Site::RealPython
    }

    fn extract(&self, html: &str) -> Vec<ArticleRecord> {
        let document = Html::parse_document(html);
        collect_candidates(
            Site::RealPython,
            document.select(&SELECTORS.card).map(extract_card),
        )
    }
}

fn extract_card(card: ElementRef<'_>) -> Candidate {
    let Some(href) = card
        .select(&SELECTORS.link)
        .next()
        .and_then(|a| a.value().attr("href"))
    else {
        return Candidate::Skip("no link");
    };
    let Some(url) = absolutize_url(RULES.base_url, href) else {
        return Candidate::Skip("unusable href");
    };

    let title = card
        .select(&SELECTORS.title)
        .next()
        .or_else(|| card.select(&SELECTORS.title_fallback).next())
        .map(|h| element_text(&h))
        .unwrap_or_default();
    if title.is_empty() {
        return Candidate::Skip("no title");
    }

    Candidate::Article(ArticleRecord {
        title,
        author: UNKNOWN_AUTHOR.to_string(),
        url,
        publication_date: publication_date(&card),
    })
}

/// The first date-looking span decides; it may still fail to parse.
fn publication_date(card: &ElementRef<'_>) -> Option<NaiveDate> {
    card.select(&SELECTORS.date)
        .map(|span| element_text(&span))
        .find(|text| mentions_month_abbrev(text))
        .and_then(|text| normalize_date(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
          <div class="card border-0">
            <a href="/python-type-hints/"><img src="x.png"></a>
            <div class="card-body">
              <a href="/python-type-hints/"><h2 class="card-title h4 my-0 py-0">Python Type Hints</h2></a>
              <p class="card-text">
                <span class="mr-2">Oct 15, 2025</span>
                <span class="mr-2">intermediate</span>
              </p>
            </div>
          </div>
          <div class="card">
            <a href="/sidebar-card/"><h2 class="card-title">Not an article card</h2></a>
          </div>
          <div class="card border-0">
            <div class="card-body"><h2 class="card-title">Card Without Link</h2></div>
          </div>
          <div class="card border-0">
            <a href="https://realpython.com/courses/asyncio/">
              <h2>Async IO Walkthrough</h2>
            </a>
            <span class="mr-2">best-practices</span>
          </div>
          <div class="card border-0">
            <a href="/no-title/"><img src="y.png"></a>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_extracts_bordered_cards_only() {
        let records = RealPythonExtractor.extract(LISTING);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].title, "Python Type Hints");
        assert_eq!(records[0].url, "https://realpython.com/python-type-hints/");
        assert_eq!(records[0].author, UNKNOWN_AUTHOR);
        assert_eq!(
            records[0].publication_date,
            NaiveDate::from_ymd_opt(2025, 10, 15)
        );

        assert_eq!(records[1].title, "Async IO Walkthrough");
        assert_eq!(records[1].url, "https://realpython.com/courses/asyncio/");
        assert_eq!(records[1].publication_date, None);
    }

    #[test]
    fn test_records_have_title_and_url() {
        for record in RealPythonExtractor.extract(LISTING) {
            assert!(!record.title.is_empty());
            assert!(!record.url.is_empty());
        }
    }

    #[test]
    fn test_page_without_cards() {
        let html = "<html><body><h1>Hi</h1></body></html>";
        assert!(RealPythonExtractor.extract(html).is_empty());
    }
}
