//! SQLite catalogue of authors and articles with deduplication.
//!
//! A [`Store`] is opened once per batch and shared by every pipeline of
//! that batch. Both check-then-insert paths (`get_or_create_author`,
//! `add_article_if_new`) hold the store's write lock and run in a
//! transaction; the schema's `UNIQUE` constraints with `ON CONFLICT DO
//! NOTHING` make a concurrent duplicate insert a no-op.

use crate::error::StoreError;
use crate::models::{
    Article, ArticleFilter, ArticleRecord, ArticleView, Author, StoreStats, UNTITLED,
};
use crate::utils::website_of;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

const CREATE_AUTHOR_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS author (
        author_id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    )
"#;

const CREATE_ARTICLE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS article (
        article_id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        author_id INTEGER NOT NULL REFERENCES author (author_id) ON DELETE CASCADE,
        url TEXT NOT NULL UNIQUE,
        publication_date DATE
    )
"#;

const SELECT_AUTHOR_BY_NAME: &str = "SELECT author_id, name FROM author WHERE name = ?";

const CREATE_INDEXES: &str = r#"
    CREATE INDEX IF NOT EXISTS idx_article_author_id ON article (author_id);
    CREATE INDEX IF NOT EXISTS idx_article_publication_date ON article (publication_date)
"#;

/// What [`Store::add_article_if_new`] did with a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Created(Article),
    /// An article with the same URL already exists; nothing was modified.
    Skipped,
    /// The record has no usable URL.
    Rejected,
}

#[derive(sqlx::FromRow)]
struct ArticleRow {
    article_id: i64,
    title: String,
    author: String,
    url: String,
    publication_date: Option<NaiveDate>,
}

impl From<ArticleRow> for ArticleView {
    fn from(row: ArticleRow) -> Self {
        Self {
            id: row.article_id,
            title: row.title,
            author: row.author,
            website: website_of(&row.url),
            url: row.url,
            date: row.publication_date,
        }
    }
}

#[derive(Debug)]
pub struct Store {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl Store {
    /// Open (creating if needed) the database file and its schema.
    ///
    /// The connection runs in WAL mode with `NORMAL` synchronous writes,
    /// foreign keys enforced and a 30 second busy timeout.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            write_lock: Mutex::new(()),
        };
        store.migrate().await?;
        info!("Store opened");
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_AUTHOR_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_ARTICLE_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_INDEXES).execute(&self.pool).await?;
        Ok(())
    }

    /// Release every pooled connection. The store is unusable afterwards.
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("Store closed");
    }

    /// Return the author with exactly this name, creating it if absent.
    ///
    /// # Arguments
    ///
    /// * `name` - Author name. Outer whitespace is trimmed; the comparison
    ///   is otherwise exact.
    ///
    /// # Returns
    ///
    /// The stored [`Author`]. Concurrent calls with the same name return the
    /// same row.
    ///
    /// # Errors
    ///
    /// [`StoreError::EmptyAuthorName`] for a blank name, or a database error.
    pub async fn get_or_create_author(&self, name: &str) -> Result<Author, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyAuthorName);
        }

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query(
            "INSERT INTO author (name) VALUES (?) ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        let author = sqlx::query_as::<_, Author>(SELECT_AUTHOR_BY_NAME)
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        if inserted > 0 {
            info!(author = %author.name, id = author.author_id, "Created author");
        }
        Ok(author)
    }

    /// Insert the record unless an article with the same URL exists.
    ///
    /// # Arguments
    ///
    /// * `record` - Extracted article. A blank title is stored as
    ///   [`UNTITLED`]; the URL is trimmed before comparison.
    /// * `author` - Author row obtained from [`Store::get_or_create_author`].
    ///
    /// # Returns
    ///
    /// * [`AddOutcome::Created`] with the new row
    /// * [`AddOutcome::Skipped`] when the URL is already stored, leaving the
    ///   existing row untouched
    /// * [`AddOutcome::Rejected`] when the URL is blank
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use std::error::Error;
    /// # use tech_trends_scraper::models::ArticleRecord;
    /// # use tech_trends_scraper::store::{AddOutcome, Store};
    /// # async fn demo(store: &Store, record: ArticleRecord) -> Result<(), Box<dyn Error>> {
    /// let author = store.get_or_create_author(&record.author).await?;
    /// if let AddOutcome::Created(article) = store.add_article_if_new(&record, &author).await? {
    ///     println!("stored {}", article.url);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn add_article_if_new(
        &self,
        record: &ArticleRecord,
        author: &Author,
    ) -> Result<AddOutcome, StoreError> {
        let url = record.url.trim();
        if url.is_empty() {
            warn!(title = %record.title, "Rejecting article without URL");
            return Ok(AddOutcome::Rejected);
        }
        let title = match record.title.trim() {
            "" => UNTITLED,
            t => t,
        };

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "INSERT INTO article (title, author_id, url, publication_date) \
             VALUES (?, ?, ?, ?) ON CONFLICT (url) DO NOTHING",
        )
        .bind(title)
        .bind(author.author_id)
        .bind(url)
        .bind(record.publication_date)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            debug!(url, "Article already stored");
            return Ok(AddOutcome::Skipped);
        }
        tx.commit().await?;

        let article = Article {
            article_id: result.last_insert_rowid(),
            title: title.to_string(),
            author_id: author.author_id,
            url: url.to_string(),
            publication_date: record.publication_date,
        };
        info!(url, title = %article.title, "Created article");
        Ok(AddOutcome::Created(article))
    }

    /// Exact lookup after trimming outer whitespace.
    pub async fn get_author_by_name(&self, name: &str) -> Result<Option<Author>, StoreError> {
        let author = sqlx::query_as::<_, Author>(SELECT_AUTHOR_BY_NAME)
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(author)
    }

    /// Every author, articles or not, ordered by name.
    pub async fn list_authors(&self) -> Result<Vec<Author>, StoreError> {
        let authors =
            sqlx::query_as::<_, Author>("SELECT author_id, name FROM author ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(authors)
    }

    /// Fails with a database error if another author already has `new_name`.
    pub async fn rename_author(
        &self,
        author_id: i64,
        new_name: &str,
    ) -> Result<Author, StoreError> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(StoreError::EmptyAuthorName);
        }

        let _guard = self.write_lock.lock().await;
        let updated = sqlx::query("UPDATE author SET name = ? WHERE author_id = ?")
            .bind(new_name)
            .bind(author_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(StoreError::NotFound {
                entity: "author",
                id: author_id,
            });
        }
        Ok(Author {
            author_id,
            name: new_name.to_string(),
        })
    }

    /// Delete an author together with all of their articles.
    pub async fn delete_author(&self, author_id: i64) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let deleted = sqlx::query("DELETE FROM author WHERE author_id = ?")
            .bind(author_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    /// The stored article with this URL, if any.
    pub async fn get_article_by_url(&self, url: &str) -> Result<Option<Article>, StoreError> {
        let article = sqlx::query_as::<_, Article>(
            "SELECT article_id, title, author_id, url, publication_date \
             FROM article WHERE url = ?",
        )
        .bind(url.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(article)
    }

    /// Replace the title of an article; a blank title becomes [`UNTITLED`].
    pub async fn update_article_title(
        &self,
        article_id: i64,
        title: &str,
    ) -> Result<Article, StoreError> {
        let title = match title.trim() {
            "" => UNTITLED,
            t => t,
        };

        let _guard = self.write_lock.lock().await;
        sqlx::query_as::<_, Article>(
            "UPDATE article SET title = ? WHERE article_id = ? \
             RETURNING article_id, title, author_id, url, publication_date",
        )
        .bind(title)
        .bind(article_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound {
            entity: "article",
            id: article_id,
        })
    }

    /// Returns `false` when no article has this id.
    pub async fn delete_article(&self, article_id: i64) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let deleted = sqlx::query("DELETE FROM article WHERE article_id = ?")
            .bind(article_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    /// Articles joined with their author, newest first; undated last.
    ///
    /// # Arguments
    ///
    /// * `filter` - Every populated field narrows the result:
    ///   - `author`: exact author name
    ///   - `website`, `title_contains`: substring match on URL or title
    ///   - `since`, `until`: inclusive date bounds (undated articles never
    ///     match a bound)
    ///   - `limit`: maximum number of rows
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use tech_trends_scraper::models::ArticleFilter;
    /// # use tech_trends_scraper::store::Store;
    /// # async fn demo(store: &Store) -> Result<(), Box<dyn std::error::Error>> {
    /// let filter = ArticleFilter {
    ///     website: Some("realpython.com".to_string()),
    ///     limit: Some(10),
    ///     ..Default::default()
    /// };
    /// for article in store.list_articles(&filter).await? {
    ///     println!("{} by {}", article.title, article.author);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn list_articles(
        &self,
        filter: &ArticleFilter,
    ) -> Result<Vec<ArticleView>, StoreError> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT a.article_id, a.title, au.name AS author, a.url, a.publication_date \
             FROM article a JOIN author au ON au.author_id = a.author_id WHERE 1 = 1",
        );
        if let Some(author) = &filter.author {
            query.push(" AND au.name = ").push_bind(author.clone());
        }
        if let Some(website) = &filter.website {
            query.push(" AND a.url LIKE ").push_bind(format!("%{website}%"));
        }
        if let Some(fragment) = &filter.title_contains {
            query.push(" AND a.title LIKE ").push_bind(format!("%{fragment}%"));
        }
        if let Some(since) = filter.since {
            query.push(" AND a.publication_date >= ").push_bind(since);
        }
        if let Some(until) = filter.until {
            query.push(" AND a.publication_date <= ").push_bind(until);
        }
        query.push(
            " ORDER BY a.publication_date IS NULL, a.publication_date DESC, a.article_id DESC",
        );
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows: Vec<ArticleRow> = query.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(ArticleView::from).collect())
    }

    /// Delete every article, keeping authors. Returns the number removed.
    pub async fn clear_articles(&self) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock().await;
        let deleted = sqlx::query("DELETE FROM article")
            .execute(&self.pool)
            .await?
            .rows_affected();
        info!(deleted, "Cleared articles");
        Ok(deleted)
    }

    /// Article count and the authors that have at least one article.
    pub async fn stats(&self) -> Result<StoreStats, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM article")
            .fetch_one(&self.pool)
            .await?;
        let authors: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT au.name FROM author au \
             JOIN article a ON a.author_id = au.author_id ORDER BY au.name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(StoreStats {
            total_articles: usize::try_from(total).unwrap_or_default(),
            unique_authors: authors.len(),
            authors,
        })
    }
}
