//! YAML configuration.
//!
//! Every field has a default, so an absent file or a partial file is fine:
//!
//! ```yaml
//! database: scraper_data.db
//! workers: 5
//! targets:
//!   - https://realpython.com/
//! fetch:
//!   timeout_secs: 10
//!   browser_timeout_secs: 15
//!   max_retries: 2
//!   retry_base_delay_ms: 1000
//!   browser_delay_ms: 1000
//! authors:
//!   lookup_limit: 3
//!   delay_ms: 2000
//!   max_delay_secs: 30
//!   timeout_secs: 10
//! sites:
//!   - pattern: mirror.example.org
//!     site: realpython
//! ```

use crate::authors::ResolverSettings;
use crate::error::ConfigError;
use crate::extractors::{Site, SiteRegistry};
use crate::fetcher::FetchTimeouts;
use crate::orchestrator::OrchestratorSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Listing pages scraped when no targets are given.
pub const DEFAULT_TARGETS: [&str; 3] = [
    "https://realpython.com/",
    "https://www.freecodecamp.org/news",
    "https://www.datacamp.com/blog",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: PathBuf,
    pub workers: usize,
    pub targets: Vec<String>,
    pub fetch: FetchConfig,
    pub authors: AuthorConfig,
    /// Extra domain rules, checked before the built-in ones.
    pub sites: Vec<SiteRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("scraper_data.db"),
            workers: 5,
            targets: DEFAULT_TARGETS.iter().map(|t| t.to_string()).collect(),
            fetch: FetchConfig::default(),
            authors: AuthorConfig::default(),
            sites: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub browser_timeout_secs: u64,
    /// Retries of transient failures (timeouts, 429, 5xx) per listing page.
    /// `0` makes every listing fetch a single GET.
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,
    /// Pause before each request through the browser transport.
    pub browser_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            browser_timeout_secs: 15,
            max_retries: 2,
            retry_base_delay_ms: 1000,
            browser_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorConfig {
    /// Detail-page lookups per source URL.
    pub lookup_limit: usize,
    pub delay_ms: u64,
    pub max_delay_secs: u64,
    pub timeout_secs: u64,
}

impl Default for AuthorConfig {
    fn default() -> Self {
        Self {
            lookup_limit: 3,
            delay_ms: 2000,
            max_delay_secs: 30,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRule {
    pub pattern: String,
    pub site: Site,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// An empty document yields the defaults.
    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Built-in rules with the configured ones taking precedence, in file order.
    pub fn registry(&self) -> SiteRegistry {
        self.sites
            .iter()
            .rev()
            .fold(SiteRegistry::default(), |registry, rule| {
                registry.with_rule(rule.pattern.clone(), rule.site)
            })
    }

    pub fn fetch_timeouts(&self) -> FetchTimeouts {
        FetchTimeouts {
            plain: Duration::from_secs(self.fetch.timeout_secs),
            browser: Duration::from_secs(self.fetch.browser_timeout_secs),
        }
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.fetch.retry_base_delay_ms)
    }

    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            delay: Duration::from_millis(self.authors.delay_ms),
            max_delay: Duration::from_secs(self.authors.max_delay_secs),
            timeout: Duration::from_secs(self.authors.timeout_secs),
        }
    }

    pub fn orchestrator_settings(&self, workers: usize) -> OrchestratorSettings {
        OrchestratorSettings {
            workers: workers.max(1),
            author_lookup_limit: self.authors.lookup_limit,
            browser_delay: Some(Duration::from_millis(self.fetch.browser_delay_ms)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.database, PathBuf::from("scraper_data.db"));
        assert_eq!(config.workers, 5);
        assert_eq!(config.targets.len(), 3);
        assert_eq!(config.authors.lookup_limit, 3);
        assert_eq!(config.fetch.max_retries, 2);
        assert_eq!(config.resolver_settings(), ResolverSettings::default());
        assert_eq!(config.fetch_timeouts(), FetchTimeouts::default());
        assert_eq!(Config::from_yaml("").unwrap(), config);
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let config = Config::from_yaml(
            r#"
workers: 2
authors:
  delay_ms: 50
sites:
  - pattern: "127.0.0.1"
    site: datacamp
  - pattern: "mirror.example"
    site: freecodecamp
"#,
        )
        .unwrap();

        assert_eq!(config.workers, 2);
        assert_eq!(config.authors.delay_ms, 50);
        assert_eq!(config.authors.lookup_limit, 3);
        assert_eq!(config.fetch.max_retries, 2);

        let registry = config.registry();
        for (url, site) in [
            ("http://127.0.0.1:8080/blog", Site::DataCamp),
            ("https://mirror.example/news", Site::FreeCodeCamp),
            ("https://realpython.com/", Site::RealPython),
        ] {
            assert_eq!(registry.resolve(url), site, "{url}");
        }
    }

    #[test]
    fn test_retries_can_be_disabled() {
        let config = Config::from_yaml("fetch:\n  max_retries: 0\n").unwrap();
        assert_eq!(config.fetch.max_retries, 0);
        assert_eq!(config.fetch.timeout_secs, 10);
    }

    #[test]
    fn test_orchestrator_settings_clamps_workers() {
        let settings = Config::default().orchestrator_settings(0);
        assert_eq!(settings.workers, 1);
        assert_eq!(settings.browser_delay, Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "database: /tmp/articles.db\nworkers: 8").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.database, PathBuf::from("/tmp/articles.db"));
        assert_eq!(config.workers, 8);
    }

    #[test]
    fn test_load_errors() {
        assert!(matches!(
            Config::load("/definitely/not/here.yaml"),
            Err(ConfigError::Read { .. })
        ));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "workers: [not, a, number]").unwrap();
        let result = Config::load(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
