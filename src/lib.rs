//! Multi-site article scraper with a deduplicating SQLite catalogue.
//!
//! The pipeline for one listing page: [`fetcher`] retrieves the HTML,
//! [`extractors`] turns it into records, [`authors`] fills in missing
//! authors from detail pages and [`store`] persists whatever is new.
//! [`orchestrator`] runs many pages concurrently and aggregates the results.

pub mod analyzer;
pub mod authors;
pub mod config;
pub mod dates;
pub mod error;
pub mod extractors;
pub mod fetcher;
pub mod models;
pub mod orchestrator;
pub mod report;
pub mod store;
pub mod utils;
