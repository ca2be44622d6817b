//! Data models for persisted entities and per-batch results.
//!
//! - [`Author`] and [`Article`]: rows of the SQLite catalogue
//! - [`ArticleRecord`]: one article as extracted from a listing page
//! - [`SiteOutcome`] and [`AggregateStats`]: what a scrape batch reports
//! - [`ArticleView`] and [`ArticleFilter`]: the browse/query surface

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Author placeholder for records whose author is not (yet) known.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Title stored when a record arrives with a blank title.
pub const UNTITLED: &str = "Untitled";

/// A persisted author. Names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Author {
    pub author_id: i64,
    pub name: String,
}

/// A persisted article. URLs are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Article {
    pub article_id: i64,
    pub title: String,
    pub author_id: i64,
    pub url: String,
    pub publication_date: Option<NaiveDate>,
}

/// One article discovered on a listing page, before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    /// Author name, or [`UNKNOWN_AUTHOR`] pending resolution.
    pub author: String,
    pub url: String,
    pub publication_date: Option<NaiveDate>,
}

impl ArticleRecord {
    pub fn author_is_unknown(&self) -> bool {
        self.author.trim().is_empty() || self.author == UNKNOWN_AUTHOR
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Error,
}

/// Result of running one source URL through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteOutcome {
    pub url: String,
    pub status: OutcomeStatus,
    pub created: usize,
    pub skipped: usize,
    pub errors: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SiteOutcome {
    pub fn success(url: &str, created: usize, skipped: usize, errors: usize) -> Self {
        Self {
            url: url.to_string(),
            status: OutcomeStatus::Success,
            created,
            skipped,
            errors,
            message: None,
        }
    }

    /// A failed source counts as a single error.
    pub fn failure(url: &str, message: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            status: OutcomeStatus::Error,
            created: 0,
            skipped: 0,
            errors: 1,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    /// Articles seen on the page, new or already stored.
    pub fn total_articles(&self) -> usize {
        self.created + self.skipped
    }
}

/// Batch-wide totals derived from a list of [`SiteOutcome`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total_sources: usize,
    pub successful_sources: usize,
    pub failed_sources: usize,
    pub total_created: usize,
    pub total_skipped: usize,
    pub total_errors: usize,
}

impl AggregateStats {
    pub fn from_outcomes(outcomes: &[SiteOutcome]) -> Self {
        outcomes.iter().fold(
            Self {
                total_sources: outcomes.len(),
                ..Self::default()
            },
            |mut acc, outcome| {
                if outcome.is_success() {
                    acc.successful_sources += 1;
                } else {
                    acc.failed_sources += 1;
                }
                acc.total_created += outcome.created;
                acc.total_skipped += outcome.skipped;
                acc.total_errors += outcome.errors;
                acc
            },
        )
    }

    pub fn total_processed(&self) -> usize {
        self.total_created + self.total_skipped
    }
}

/// An article joined with its author, as shown by the browse interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleView {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub url: String,
    /// `scheme://host` of the article URL.
    pub website: String,
    pub date: Option<NaiveDate>,
}

/// Optional constraints for [`Store::list_articles`](crate::store::Store::list_articles).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFilter {
    /// Exact author name.
    pub author: Option<String>,
    /// Substring of the article URL, e.g. `realpython.com`.
    pub website: Option<String>,
    /// Substring of the title.
    pub title_contains: Option<String>,
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    pub limit: Option<u32>,
}

/// Catalogue-wide counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_articles: usize,
    pub unique_authors: usize,
    pub authors: Vec<String>,
}
