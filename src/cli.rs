//! Command-line interface definitions.
//!
//! Global options can also come from environment variables; anything given
//! on the command line overrides the YAML configuration file.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tech_trends_scraper::models::ArticleFilter;

/// Scrape technical blogs into a local SQLite catalogue and browse it.
///
/// # Examples
///
/// ```sh
/// # Scrape the default targets with 5 workers
/// tech_trends_scraper scrape
///
/// # Scrape one site into a different database
/// tech_trends_scraper -d ./articles.db scrape https://realpython.com/
///
/// # Latest ten freeCodeCamp articles as JSON
/// tech_trends_scraper list --website freecodecamp.org --limit 10 --json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a config.yaml file
    #[arg(short, long, env = "SCRAPER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file (overrides the config file)
    #[arg(short, long, env = "SCRAPER_DATABASE", global = true)]
    pub database: Option<PathBuf>,

    /// Defaults to `scrape` with the configured targets
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch listing pages and store new articles
    Scrape(ScrapeArgs),
    /// Show stored articles
    List(ListArgs),
    /// Delete every stored article
    Clear,
    /// Article and author counts
    Stats {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Most frequent words in stored titles
    Trends(TrendsArgs),
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeArgs {
    /// Listing pages to scrape (defaults to the configured targets)
    pub urls: Vec<String>,

    /// Concurrent pipelines
    #[arg(short, long, env = "SCRAPER_WORKERS")]
    pub workers: Option<usize>,

    /// Also write the batch results to this JSON file
    #[arg(long)]
    pub json_report: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterArgs {
    /// Exact author name
    #[arg(long)]
    pub author: Option<String>,

    /// Substring of the article URL, e.g. realpython.com
    #[arg(long)]
    pub website: Option<String>,

    /// Substring of the title
    #[arg(long)]
    pub title: Option<String>,

    /// Published on or after (YYYY-MM-DD)
    #[arg(long)]
    pub since: Option<NaiveDate>,

    /// Published on or before (YYYY-MM-DD)
    #[arg(long)]
    pub until: Option<NaiveDate>,
}

impl FilterArgs {
    pub fn to_filter(&self, limit: Option<u32>) -> ArticleFilter {
        ArticleFilter {
            author: self.author.clone(),
            website: self.website.clone(),
            title_contains: self.title.clone(),
            since: self.since,
            until: self.until,
            limit,
        }
    }
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ListArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Maximum number of articles
    #[arg(short, long)]
    pub limit: Option<u32>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct TrendsArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Number of words to show
    #[arg(short, long, default_value_t = 20)]
    pub top: usize,

    /// Replace the default stop words (repeatable)
    #[arg(long = "stop-word")]
    pub stop_words: Vec<String>,
}
