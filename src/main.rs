//! # Tech Trends Scraper
//!
//! Collects article metadata (title, author, URL, publication date) from
//! technical-content sites into a deduplicated SQLite catalogue.
//!
//! ## Usage
//!
//! ```sh
//! tech_trends_scraper scrape
//! tech_trends_scraper list --website realpython.com --limit 20
//! tech_trends_scraper trends --top 10
//! ```
//!
//! ## Pipeline
//!
//! 1. **Fetching**: download each listing page with its site's fetch policy
//! 2. **Extracting**: parse article cards with site-specific rules
//! 3. **Resolving**: look up missing authors on detail pages (Real Python)
//! 4. **Persisting**: insert new articles, skip known URLs

use clap::Parser;
use itertools::Itertools;
use std::collections::HashSet;
use std::error::Error;
use tech_trends_scraper::analyzer::process_titles;
use tech_trends_scraper::config::Config;
use tech_trends_scraper::models::ArticleFilter;
use tech_trends_scraper::orchestrator;
use tech_trends_scraper::report::{render_banner, render_report, write_json_report};
use tech_trends_scraper::store::Store;
use tracing::{debug, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::{Cli, Command, ListArgs, ScrapeArgs, TrendsArgs};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(database) = args.database {
        config.database = database;
    }

    let command = args
        .command
        .unwrap_or_else(|| Command::Scrape(ScrapeArgs::default()));
    match command {
        Command::Scrape(scrape) => run_scrape(&config, scrape).await,
        Command::List(list) => run_list(&config, list).await,
        Command::Clear => run_clear(&config).await,
        Command::Stats { json } => run_stats(&config, json).await,
        Command::Trends(trends) => run_trends(&config, trends).await,
    }
}

#[instrument(level = "info", skip_all)]
async fn run_scrape(config: &Config, args: ScrapeArgs) -> Result<(), Box<dyn Error>> {
    let start_time = std::time::Instant::now();
    let urls = if args.urls.is_empty() {
        config.targets.clone()
    } else {
        args.urls
    };
    let workers = args.workers.unwrap_or(config.workers);

    println!("{}", render_banner(&urls));
    let (outcomes, stats) = orchestrator::scrape_many(config, &urls, workers).await;
    println!("{}", render_report(&outcomes, &stats));

    if let Some(path) = &args.json_report {
        write_json_report(path, &outcomes, &stats).await?;
    }

    info!(
        elapsed_secs = start_time.elapsed().as_secs_f64(),
        created = stats.total_created,
        failed_sources = stats.failed_sources,
        "Scrape finished"
    );
    Ok(())
}

async fn run_list(config: &Config, args: ListArgs) -> Result<(), Box<dyn Error>> {
    let store = Store::open(&config.database).await?;
    let filter = args.filter.to_filter(args.limit);
    let articles = store.list_articles(&filter).await;
    store.close().await;
    let articles = articles?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&articles)?);
        return Ok(());
    }

    for article in &articles {
        let date = article
            .date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        println!(
            "{:>5}  {date:<10}  {:<24}  {}",
            article.id, article.author, article.title
        );
        println!("       {}", article.url);
    }
    println!("\n{} article(s)", articles.len());
    Ok(())
}

async fn run_clear(config: &Config) -> Result<(), Box<dyn Error>> {
    let store = Store::open(&config.database).await?;
    let deleted = store.clear_articles().await;
    store.close().await;
    println!("Deleted {} article(s)", deleted?);
    Ok(())
}

async fn run_stats(config: &Config, json: bool) -> Result<(), Box<dyn Error>> {
    let store = Store::open(&config.database).await?;
    let stats = store.stats().await;
    store.close().await;
    let stats = stats?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Total articles: {}", stats.total_articles);
        println!("Unique authors: {}", stats.unique_authors);
        if !stats.authors.is_empty() {
            println!("Authors: {}", stats.authors.iter().join(", "));
        }
    }
    Ok(())
}

async fn run_trends(config: &Config, args: TrendsArgs) -> Result<(), Box<dyn Error>> {
    let store = Store::open(&config.database).await?;
    let filter: ArticleFilter = args.filter.to_filter(None);
    let articles = store.list_articles(&filter).await;
    store.close().await;

    let titles: Vec<String> = articles?.into_iter().map(|a| a.title).collect();
    let custom: HashSet<String> = args.stop_words.iter().map(|w| w.to_lowercase()).collect();
    let stop_words = (!custom.is_empty()).then_some(&custom);
    let (_, counts) = process_titles(&titles, stop_words);

    println!(
        "{} title(s), {} distinct word(s)",
        titles.len(),
        counts.len()
    );
    for (rank, (word, count)) in counts.top_words(args.top).into_iter().enumerate() {
        println!("{:>3}. {word:<24} {count}", rank + 1);
    }
    Ok(())
}
