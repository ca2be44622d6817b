//! Site-specific listing-page extractors.
//!
//! Every supported site gets its own module holding a rules table (CSS
//! selectors, markers and the base URL for relative links) plus the code
//! that walks one article container at a time:
//!
//! | Site | Module | Author on listing page |
//! |------|--------|------------------------|
//! | Real Python | [`realpython`] | no, resolved from detail pages |
//! | freeCodeCamp News | [`freecodecamp`] | yes |
//! | DataCamp Blog | [`datacamp`] | yes, possibly several |
//! | anything else | [`generic`] | when conventionally marked up |
//!
//! Extraction never fails as a whole. Each container produces a
//! [`Candidate`]; skipped containers are logged at debug level and the rest
//! of the page is still processed.

pub mod datacamp;
pub mod freecodecamp;
pub mod generic;
pub mod realpython;

use crate::fetcher::FetchPolicy;
use crate::models::ArticleRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

pub use datacamp::DataCampExtractor;
pub use freecodecamp::FreeCodeCampExtractor;
pub use generic::GenericExtractor;
pub use realpython::RealPythonExtractor;

/// Turns a listing page into article records.
pub trait SiteExtractor {
    fn site(&self) -> Site;

    /// Records in document order. Empty or malformed HTML yields an empty vector.
    fn extract(&self, html: &str) -> Vec<ArticleRecord>;
}

/// What one article container produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    Article(ArticleRecord),
    /// The container lacked a required field; the reason is for logs only.
    Skip(&'static str),
}

/// Keep the articles, log the skips.
pub(crate) fn collect_candidates(
    site: Site,
    candidates: impl IntoIterator<Item = Candidate>,
) -> Vec<ArticleRecord> {
    let mut skipped = 0usize;
    let articles: Vec<ArticleRecord> = candidates
        .into_iter()
        .enumerate()
        .filter_map(|(index, candidate)| match candidate {
            Candidate::Article(record) => Some(record),
            Candidate::Skip(reason) => {
                skipped += 1;
                debug!(%site, index, reason, "Skipped article container");
                None
            }
        })
        .collect();
    info!(%site, count = articles.len(), skipped, "Extracted articles");
    articles
}

/// The known sites, plus the generic fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    RealPython,
    FreeCodeCamp,
    DataCamp,
    Generic,
}

impl Site {
    pub fn name(&self) -> &'static str {
        match self {
            Site::RealPython => "realpython",
            Site::FreeCodeCamp => "freecodecamp",
            Site::DataCamp => "datacamp",
            Site::Generic => "generic",
        }
    }

    /// The extractor for a listing page of this site at `page_url`.
    ///
    /// Only the generic extractor uses `page_url`, as its base for relative links.
    pub fn extractor(&self, page_url: &str) -> Box<dyn SiteExtractor + Send + Sync> {
        match self {
            Site::RealPython => Box::new(RealPythonExtractor),
            Site::FreeCodeCamp => Box::new(FreeCodeCampExtractor),
            Site::DataCamp => Box::new(DataCampExtractor),
            Site::Generic => Box::new(GenericExtractor::new(page_url)),
        }
    }

    /// How listing pages of this site have to be requested.
    pub fn fetch_policy(&self) -> FetchPolicy {
        match self {
            Site::DataCamp => FetchPolicy::browser(datacamp::PRE_REQUEST_DELAY),
            _ => FetchPolicy::plain(),
        }
    }

    /// Whether authors must be looked up on detail pages.
    pub fn resolves_authors_from_detail_pages(&self) -> bool {
        matches!(self, Site::RealPython)
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Domain-pattern dispatch table.
///
/// A URL maps to the first rule whose pattern is a substring of it; no match
/// means [`Site::Generic`].
#[derive(Debug, Clone)]
pub struct SiteRegistry {
    rules: Vec<(String, Site)>,
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self {
            rules: vec![
                ("realpython.com".to_string(), Site::RealPython),
                ("freecodecamp.org".to_string(), Site::FreeCodeCamp),
                ("datacamp.com".to_string(), Site::DataCamp),
            ],
        }
    }
}

impl SiteRegistry {
    /// Add a rule that takes precedence over the existing ones.
    pub fn with_rule(mut self, pattern: impl Into<String>, site: Site) -> Self {
        self.rules.insert(0, (pattern.into(), site));
        self
    }

    pub fn resolve(&self, url: &str) -> Site {
        self.rules
            .iter()
            .find(|(pattern, _)| !pattern.is_empty() && url.contains(pattern.as_str()))
            .map(|(_, site)| *site)
            .unwrap_or(Site::Generic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_resolves(registry: &SiteRegistry, cases: &[(&str, Site)]) {
        for (url, site) in cases {
            assert_eq!(registry.resolve(url), *site, "{url}");
        }
    }

    #[test]
    fn test_registry_known_domains() {
        assert_resolves(
            &SiteRegistry::default(),
            &[
                ("https://realpython.com/", Site::RealPython),
                ("https://www.freecodecamp.org/news", Site::FreeCodeCamp),
                ("https://www.datacamp.com/blog", Site::DataCamp),
            ],
        );
    }

    #[test]
    fn test_registry_falls_back_to_generic() {
        assert_resolves(
            &SiteRegistry::default(),
            &[
                ("https://blog.rust-lang.org/", Site::Generic),
                ("", Site::Generic),
            ],
        );
    }

    #[test]
    fn test_registry_custom_rule_wins() {
        let registry = SiteRegistry::default().with_rule("127.0.0.1:4000", Site::DataCamp);
        assert_resolves(
            &registry,
            &[
                ("http://127.0.0.1:4000/blog", Site::DataCamp),
                ("http://127.0.0.1:4001/blog", Site::Generic),
                ("https://realpython.com/", Site::RealPython),
            ],
        );
    }

    #[test]
    fn test_site_policies() {
        assert!(Site::RealPython.resolves_authors_from_detail_pages());
        assert!(!Site::DataCamp.resolves_authors_from_detail_pages());
        assert!(Site::DataCamp.fetch_policy().impersonate_browser);
        assert!(!Site::FreeCodeCamp.fetch_policy().impersonate_browser);
    }

    #[test]
    fn test_every_extractor_tolerates_garbage() {
        let sites = [
            Site::RealPython,
            Site::FreeCodeCamp,
            Site::DataCamp,
            Site::Generic,
        ];
        let inputs = [
            "",
            "<div class=\"card border-0\"><a",
            "not html at all <<<>>>",
        ];
        for site in sites {
            let extractor = site.extractor("https://example.com/");
            assert_eq!(extractor.site(), site);
            for html in inputs {
                assert!(extractor.extract(html).is_empty(), "{site}: {html}");
            }
        }
    }

    #[test]
    fn test_site_serde_names() {
        let site: Site = serde_yaml::from_str("freecodecamp").unwrap();
        assert_eq!(site, Site::FreeCodeCamp);
        assert_eq!(site.to_string(), "freecodecamp");
    }
}
