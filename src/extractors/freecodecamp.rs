//! freeCodeCamp News listing pages (<https://www.freecodecamp.org/news>).
//!
//! Each article is a `div.post-card-content` nested in a `div.post-card`.
//! The title link sits in `h2.post-card-title`; author and date live in the
//! `footer.post-card-meta` of the same card.

use super::{Candidate, Site, SiteExtractor, collect_candidates};
use crate::dates::normalize_date;
use crate::models::{ArticleRecord, UNKNOWN_AUTHOR};
use crate::utils::{absolutize_url, element_text, has_class};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

struct Rules {
    news_base_url: &'static str,
    content: &'static str,
    card_class: &'static str,
    title: &'static str,
    any_heading: &'static str,
    link: &'static str,
    meta: &'static str,
    author: &'static str,
    time: &'static str,
}

const RULES: Rules = Rules {
    news_base_url: "https://www.freecodecamp.org/news",
    content: "div.post-card-content",
    card_class: "post-card",
    title: "h2.post-card-title",
    any_heading: "h2",
    link: "a[href]",
    meta: "footer.post-card-meta",
    author: "a.meta-item",
    time: "time",
};

struct Selectors {
    content: Selector,
    title: Selector,
    any_heading: Selector,
    link: Selector,
    meta: Selector,
    author: Selector,
    time: Selector,
}

static SELECTORS: Lazy<Selectors> = Lazy::new(|| Selectors {
    content: Selector::parse(RULES.content).unwrap(),
    title: Selector::parse(RULES.title).unwrap(),
    any_heading: Selector::parse(RULES.any_heading).unwrap(),
    link: Selector::parse(RULES.link).unwrap(),
    meta: Selector::parse(RULES.meta).unwrap(),
    author: Selector::parse(RULES.author).unwrap(),
    time: Selector::parse(RULES.time).unwrap(),
});

#[derive(Debug, Clone, Copy, Default)]
pub struct FreeCodeCampExtractor;

impl SiteExtractor for FreeCodeCampExtractor {
    fn site(&self) -> Site {
        Site::FreeCodeCamp
    }

    fn extract(&self, html: &str) -> Vec<ArticleRecord> {
        let document = Html::parse_document(html);
        collect_candidates(
            Site::FreeCodeCamp,
            document.select(&SELECTORS.content).map(extract_card),
        )
    }
}

fn extract_card(content: ElementRef<'_>) -> Candidate {
    let post_card = enclosing_post_card(&content);

    let Some(heading) = content
        .select(&SELECTORS.title)
        .next()
        .or_else(|| post_card.and_then(|card| card.select(&SELECTORS.any_heading).next()))
    else {
        return Candidate::Skip("no title heading");
    };

    let Some(link) = title_link(&heading) else {
        return Candidate::Skip("no title link");
    };
    let title = element_text(&link);
    if title.is_empty() {
        return Candidate::Skip("empty title");
    }
    let Some(url) = link
        .value()
        .attr("href")
        .and_then(|href| absolutize_url(RULES.news_base_url, href))
    else {
        return Candidate::Skip("unusable href");
    };

    let meta = content
        .select(&SELECTORS.meta)
        .next()
        .or_else(|| post_card.and_then(|card| card.select(&SELECTORS.meta).next()));

    let (author, publication_date) = match meta {
        Some(footer) => (author_of(&footer), date_of(&footer)),
        None => (UNKNOWN_AUTHOR.to_string(), None),
    };

    Candidate::Article(ArticleRecord {
        title,
        author,
        url,
        publication_date,
    })
}

fn enclosing_post_card<'a>(content: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    content
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "div" && has_class(el, RULES.card_class))
}

/// The link inside the heading, else the first link under the nearest
/// ancestor that has one.
fn title_link<'a>(heading: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    heading.select(&SELECTORS.link).next().or_else(|| {
        heading
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find_map(|ancestor| ancestor.select(&SELECTORS.link).next())
    })
}

fn author_of(footer: &ElementRef<'_>) -> String {
    footer
        .select(&SELECTORS.author)
        .next()
        .map(|a| element_text(&a))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
}

fn date_of(footer: &ElementRef<'_>) -> Option<NaiveDate> {
    let time = footer.select(&SELECTORS.time).next()?;
    let raw = time
        .value()
        .attr("datetime")
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| element_text(&time));
    normalize_date(&raw)
}
