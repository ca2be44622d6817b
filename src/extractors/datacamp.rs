//! DataCamp Blog listing pages (<https://www.datacamp.com/blog>).
//!
//! Cards are marked with a `data-trackid` attribute containing
//! `media-card-`, and so is the title anchor inside each card. Authors are
//! linked through `data-trackid="media-visit-author-profile"` with the
//! display name in the paragraph that follows the link. The site sits
//! behind bot protection, hence the browser fetch policy.

use super::{Candidate, Site, SiteExtractor, collect_candidates};
use crate::dates::{mentions_full_month, mentions_month_abbrev, normalize_date};
use crate::models::{ArticleRecord, UNKNOWN_AUTHOR};
use crate::utils::{absolutize_url, element_text};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

/// Pause before each listing request so the protection layer stays quiet.
pub const PRE_REQUEST_DELAY: Duration = Duration::from_secs(1);

struct Rules {
    base_url: &'static str,
    card: &'static str,
    title_link: &'static str,
    title: &'static str,
    author_link: &'static str,
    paragraph: &'static str,
}

const RULES: Rules = Rules {
    base_url: "https://www.datacamp.com",
    card: r#"div[data-trackid*="media-card-"]"#,
    title_link: r#"a[data-trackid*="media-card-"]"#,
    title: "h2",
    author_link: r#"a[data-trackid="media-visit-author-profile"]"#,
    paragraph: "p",
};

struct Selectors {
    card: Selector,
    title_link: Selector,
    title: Selector,
    author_link: Selector,
    paragraph: Selector,
}

static SELECTORS: Lazy<Selectors> = Lazy::new(|| Selectors {
    card: Selector::parse(RULES.card).unwrap(),
    title_link: Selector::parse(RULES.title_link).unwrap(),
    title: Selector::parse(RULES.title).unwrap(),
    author_link: Selector::parse(RULES.author_link).unwrap(),
    paragraph: Selector::parse(RULES.paragraph).unwrap(),
});

#[derive(Debug, Clone, Copy, Default)]
pub struct DataCampExtractor;

impl SiteExtractor for DataCampExtractor {
    fn site(&self) -> Site {
        Site::DataCamp
    }

    fn extract(&self, html: &str) -> Vec<ArticleRecord> {
        let document = Html::parse_document(html);
        collect_candidates(
            Site::DataCamp,
            document.select(&SELECTORS.card).map(extract_card),
        )
    }
}

fn extract_card(card: ElementRef<'_>) -> Candidate {
    let Some(link) = card.select(&SELECTORS.title_link).next() else {
        return Candidate::Skip("no title link");
    };
    let Some(url) = link
        .value()
        .attr("href")
        .and_then(|href| absolutize_url(RULES.base_url, href))
    else {
        return Candidate::Skip("unusable href");
    };
    let Some(heading) = link.select(&SELECTORS.title).next() else {
        return Candidate::Skip("no title heading");
    };
    let title = element_text(&heading);
    if title.is_empty() {
        return Candidate::Skip("empty title");
    }

    let authors = authors_of(&card);
    let author = if authors.is_empty() {
        UNKNOWN_AUTHOR.to_string()
    } else {
        authors.join(", ")
    };

    Candidate::Article(ArticleRecord {
        title,
        author,
        url,
        publication_date: publication_date(&card),
    })
}

/// One name per author-profile link, in order, without repeats.
fn authors_of(card: &ElementRef<'_>) -> Vec<String> {
    let mut authors: Vec<String> = Vec::new();
    for link in card.select(&SELECTORS.author_link) {
        let anchor = link.parent().and_then(ElementRef::wrap).unwrap_or(link);
        let name = following_paragraph(card, anchor).map(|p| element_text(&p));
        if let Some(name) = name.filter(|n| !n.is_empty() && !authors.contains(n)) {
            authors.push(name);
        }
    }
    authors
}

/// First `p` after `start` opens, in document order, within `card`.
fn following_paragraph<'a>(
    card: &ElementRef<'a>,
    start: ElementRef<'a>,
) -> Option<ElementRef<'a>> {
    let start_id = start.id();
    card.descendants()
        .skip_while(|node| node.id() != start_id)
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "p")
}

fn publication_date(card: &ElementRef<'_>) -> Option<NaiveDate> {
    card.select(&SELECTORS.paragraph)
        .map(|p| element_text(&p))
        .filter(|text| mentions_full_month(text) || mentions_month_abbrev(text))
        .find_map(|text| normalize_date(&text))
}
