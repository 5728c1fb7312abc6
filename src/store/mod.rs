//! Document-store substrate: Source, DiscoveredArticle, Prompt, Category,
//! EmailRecipient persistence.
//!
//! The original system backs these "collections" with MongoDB. No MongoDB
//! driver crate exists in this implementation's dependency corpus, so this
//! module uses `sqlx` against Postgres instead, modeling each collection as
//! a table and using `JSONB` columns for the genuinely schema-less parts
//! (`final_output`, prompt `input_variables`). See DESIGN.md and
//! SPEC_FULL.md §9 for the full rationale.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::PgPool;
use sqlx::Row;

use crate::models::{
    AgentPrompts, Category, DiscoveredArticle, DiscoveredArticleStatus, EmailRecipient, Source,
    REQUIRED_PROMPT_NAMES,
};

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .context("failed to connect to document store")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // -- Sources ---------------------------------------------------------

    pub async fn active_sources(&self) -> Result<Vec<Source>> {
        let rows = sqlx::query(
            r#"SELECT id, name, listing_url, url_pattern, fetch_interval_minutes,
                      is_active, last_run_at, delay_seconds
               FROM sources WHERE is_active = true"#,
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to load active sources")?;

        Ok(rows
            .into_iter()
            .map(|row| Source {
                id: row.get("id"),
                name: row.get("name"),
                listing_url: row.get("listing_url"),
                url_pattern: row.get("url_pattern"),
                fetch_interval_minutes: row.get::<i32, _>("fetch_interval_minutes") as i64,
                is_active: row.get("is_active"),
                last_run_at: row.get("last_run_at"),
                delay_seconds: row.get("delay_seconds"),
            })
            .collect())
    }

    pub async fn touch_source_last_run(&self, source_id: &str) -> Result<()> {
        sqlx::query("UPDATE sources SET last_run_at = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(source_id)
            .execute(&self.pool)
            .await
            .context("failed to update source last_run_at")?;
        Ok(())
    }

    /// Resolves a per-domain delay override by matching `listing_url`
    /// against `domain` (NewsAgent §4.1 delay resolution step 2).
    pub async fn delay_seconds_for_domain(&self, domain: &str) -> Result<Option<i64>> {
        let pattern = format!("%{domain}%");
        let row = sqlx::query("SELECT delay_seconds FROM sources WHERE listing_url LIKE $1 LIMIT 1")
            .bind(pattern)
            .fetch_optional(&self.pool)
            .await
            .context("failed to query delay_seconds for domain")?;
        Ok(row.and_then(|r| r.get::<Option<i64>, _>("delay_seconds")))
    }

    // -- Discovered articles ----------------------------------------------

    /// Returns which of `urls` already exist in the discovered-articles
    /// table, for the scheduler's dedup step (NewsAgent §4.6 step 5).
    pub async fn existing_urls(&self, urls: &[String]) -> Result<Vec<String>> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query("SELECT url FROM discovered_articles WHERE url = ANY($1)")
            .bind(urls)
            .fetch_all(&self.pool)
            .await
            .context("failed to query existing urls")?;
        Ok(rows.into_iter().map(|r| r.get("url")).collect())
    }

    /// Inserts a new discovered-article row with `status = queued`. The
    /// unique index on `url` absorbs concurrent scheduler races (NewsAgent
    /// §4.6 step 6a).
    pub async fn insert_discovered(&self, source_id: &str, url: &str) -> Result<DiscoveredArticle> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            r#"INSERT INTO discovered_articles (id, source_id, url, status, discovered_at)
               VALUES ($1, $2, $3, 'queued', $4)
               ON CONFLICT (url) DO NOTHING"#,
        )
        .bind(&id)
        .bind(source_id)
        .bind(url)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("failed to insert discovered article")?;

        Ok(DiscoveredArticle {
            id,
            source_id: source_id.to_string(),
            url: url.to_string(),
            status: DiscoveredArticleStatus::Queued,
            discovered_at: now,
            processed_at: None,
            final_output: None,
        })
    }

    pub async fn mark_submission_failed(&self, article_id: &str) -> Result<()> {
        sqlx::query("UPDATE discovered_articles SET status = 'submission_failed' WHERE id = $1")
            .bind(article_id)
            .execute(&self.pool)
            .await
            .context("failed to mark submission failed")?;
        Ok(())
    }

    /// Applied from the scheduler's `/webhook/store-result` handler: marks
    /// the matching article processed and attaches the final payload. If no
    /// row matches (a manually submitted URL never discovered by a source),
    /// inserts one, matching the original's upsert-on-miss behavior.
    pub async fn store_result(&self, url: &str, final_output: &serde_json::Value) -> Result<()> {
        let now = Utc::now();
        let updated = sqlx::query(
            r#"UPDATE discovered_articles
               SET status = 'processed', processed_at = $1, final_output = $2
               WHERE url = $3"#,
        )
        .bind(now)
        .bind(final_output)
        .bind(url)
        .execute(&self.pool)
        .await
        .context("failed to store result")?;

        if updated.rows_affected() == 0 {
            let id = uuid::Uuid::new_v4().to_string();
            sqlx::query(
                r#"INSERT INTO discovered_articles
                   (id, source_id, url, status, discovered_at, processed_at, final_output)
                   VALUES ($1, 'manual_submission', $2, 'processed', $3, $3, $4)"#,
            )
            .bind(&id)
            .bind(url)
            .bind(now)
            .bind(final_output)
            .execute(&self.pool)
            .await
            .context("failed to insert manual submission result")?;
        }

        Ok(())
    }

    // -- Prompts & categories ---------------------------------------------

    /// Loads every active prompt named in [`REQUIRED_PROMPT_NAMES`] and
    /// validates completeness via [`AgentPrompts`]'s fallible conversion
    /// (NewsAgent §4.3).
    pub async fn load_agent_prompts(&self) -> Result<AgentPrompts> {
        let rows = sqlx::query(
            r#"SELECT name, content FROM prompts
               WHERE status = 'active' AND name = ANY($1)"#,
        )
        .bind(REQUIRED_PROMPT_NAMES)
        .fetch_all(&self.pool)
        .await
        .context("failed to load agent prompts")?;

        let map: HashMap<String, String> = rows
            .into_iter()
            .map(|r| (r.get::<String, _>("name"), r.get::<String, _>("content")))
            .collect();

        AgentPrompts::try_from(map).context("agent prompt validation failed")
    }

    pub async fn category_mapping(&self) -> Result<HashMap<String, String>> {
        let rows = sqlx::query("SELECT name, external_id FROM categories")
            .fetch_all(&self.pool)
            .await
            .context("failed to load category mapping")?;
        Ok(rows
            .into_iter()
            .map(|r| (r.get::<String, _>("name"), r.get::<String, _>("external_id")))
            .collect())
    }

    #[allow(dead_code)]
    pub async fn all_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name, external_id FROM categories")
            .fetch_all(&self.pool)
            .await
            .context("failed to load categories")?;
        Ok(rows
            .into_iter()
            .map(|r| Category {
                id: r.get("id"),
                name: r.get("name"),
                external_id: r.get("external_id"),
            })
            .collect())
    }

    /// Admin create (scheduler's `POST /sources`).
    pub async fn create_source(
        &self,
        name: &str,
        listing_url: &str,
        url_pattern: Option<&str>,
        fetch_interval_minutes: i64,
        delay_seconds: Option<i64>,
    ) -> Result<Source> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            r#"INSERT INTO sources (id, name, listing_url, url_pattern, fetch_interval_minutes,
                                     is_active, last_run_at, delay_seconds)
               VALUES ($1, $2, $3, $4, $5, true, NULL, $6)"#,
        )
        .bind(&id)
        .bind(name)
        .bind(listing_url)
        .bind(url_pattern)
        .bind(fetch_interval_minutes as i32)
        .bind(delay_seconds)
        .execute(&self.pool)
        .await
        .context("failed to create source")?;

        Ok(Source {
            id,
            name: name.to_string(),
            listing_url: listing_url.to_string(),
            url_pattern: url_pattern.map(str::to_string),
            fetch_interval_minutes,
            is_active: true,
            last_run_at: None,
            delay_seconds,
        })
    }

    pub async fn get_source(&self, id: &str) -> Result<Option<Source>> {
        let row = sqlx::query(
            r#"SELECT id, name, listing_url, url_pattern, fetch_interval_minutes,
                      is_active, last_run_at, delay_seconds
               FROM sources WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to load source")?;

        Ok(row.map(|row| Source {
            id: row.get("id"),
            name: row.get("name"),
            listing_url: row.get("listing_url"),
            url_pattern: row.get("url_pattern"),
            fetch_interval_minutes: row.get::<i32, _>("fetch_interval_minutes") as i64,
            is_active: row.get("is_active"),
            last_run_at: row.get("last_run_at"),
            delay_seconds: row.get("delay_seconds"),
        }))
    }

    /// Flips `is_active` (scheduler's `POST /sources/{id}/toggle`).
    pub async fn toggle_source(&self, id: &str) -> Result<Option<Source>> {
        sqlx::query("UPDATE sources SET is_active = NOT is_active WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to toggle source")?;
        self.get_source(id).await
    }

    pub async fn delete_source(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sources WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to delete source")?;
        Ok(result.rows_affected() > 0)
    }

    // -- Articles (admin surface) ------------------------------------------

    /// `lifecycle` column stands in for the original's three Mongo
    /// collections (`discovered_articles`/`archived_articles`/
    /// `deleted_articles`) — see DESIGN.md.
    pub async fn list_articles(&self, status: Option<&str>, limit: i64, skip: i64) -> Result<Vec<DiscoveredArticle>> {
        let rows = match status {
            Some(s) => {
                sqlx::query(
                    r#"SELECT id, source_id, url, status, discovered_at, processed_at, final_output
                       FROM discovered_articles
                       WHERE lifecycle = 'active' AND status = $1
                       ORDER BY discovered_at DESC LIMIT $2 OFFSET $3"#,
                )
                .bind(s)
                .bind(limit)
                .bind(skip)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"SELECT id, source_id, url, status, discovered_at, processed_at, final_output
                       FROM discovered_articles
                       WHERE lifecycle = 'active'
                       ORDER BY discovered_at DESC LIMIT $1 OFFSET $2"#,
                )
                .bind(limit)
                .bind(skip)
                .fetch_all(&self.pool)
                .await
            }
        }
        .context("failed to list articles")?;

        Ok(rows.into_iter().map(row_to_article).collect())
    }

    pub async fn get_article(&self, id: &str) -> Result<Option<DiscoveredArticle>> {
        let row = sqlx::query(
            r#"SELECT id, source_id, url, status, discovered_at, processed_at, final_output
               FROM discovered_articles WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to load article")?;
        Ok(row.map(row_to_article))
    }

    /// `PATCH /articles/{id}/status`; callers restrict `status` to
    /// `{processed, approved, rejected, duplicated}` per NewsAgent §6.
    pub async fn update_article_status(&self, id: &str, status: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE discovered_articles SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to update article status")?;
        Ok(result.rows_affected() > 0)
    }

    /// `PATCH /articles/{id}/image`: patches `top_image` inside the JSONB
    /// `final_output` blob without reading/writing the whole document.
    pub async fn update_article_image(&self, id: &str, image_url: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE discovered_articles
               SET final_output = jsonb_set(COALESCE(final_output, '{}'::jsonb), '{top_image}', to_jsonb($1::text))
               WHERE id = $2"#,
        )
        .bind(image_url)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("failed to update article image")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn archive_article(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE discovered_articles SET lifecycle = 'archived' WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to archive article")?;
        Ok(result.rows_affected() > 0)
    }

    /// Soft delete: flips `lifecycle` rather than removing the row, matching
    /// the original's move to a `deleted_articles` collection.
    pub async fn soft_delete_article(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE discovered_articles SET lifecycle = 'deleted' WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to soft-delete article")?;
        Ok(result.rows_affected() > 0)
    }

    // -- Email recipients --------------------------------------------------

    pub async fn active_recipients(&self) -> Result<Vec<EmailRecipient>> {
        let rows = sqlx::query("SELECT id, email, name, is_active FROM email_recipients WHERE is_active = true")
            .fetch_all(&self.pool)
            .await
            .context("failed to load active recipients")?;
        Ok(rows
            .into_iter()
            .map(|r| EmailRecipient {
                id: r.get("id"),
                email: r.get("email"),
                name: r.get("name"),
                is_active: r.get("is_active"),
            })
            .collect())
    }
}

fn row_to_article(row: sqlx::postgres::PgRow) -> DiscoveredArticle {
    let status_raw: String = row.get("status");
    let status = serde_json::from_value(serde_json::Value::String(status_raw))
        .unwrap_or(DiscoveredArticleStatus::Queued);

    DiscoveredArticle {
        id: row.get("id"),
        source_id: row.get("source_id"),
        url: row.get("url"),
        status,
        discovered_at: row.get("discovered_at"),
        processed_at: row.get("processed_at"),
        final_output: row.get("final_output"),
    }
}
