use crate::types::{
    ArchivedItem, DuplicateLocation, ManualItem, MonitorError, ParliamentaryQuestionRecord, PendingItem, Result,
};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

/// Persistence for pending, manual, archived and parliamentary-question records.
pub struct Store {
    db: SqlitePool,
}

impl Store {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let in_memory = database_url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every connection to an in-memory database is its own database, so keep exactly one alive.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let db = pool_options.connect_with(options).await?;

        let store = Self { db };
        store.setup_schema().await?;
        Ok(store)
    }

    /// Fresh in-memory store, used by tests and local experiments.
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    pub async fn setup_schema(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS pending_articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL UNIQUE,
                submitted_by TEXT NOT NULL,
                pasted_text TEXT,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS manual_input_articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                submitted_by TEXT NOT NULL,
                article_content TEXT,
                created_at TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_manual_url ON manual_input_articles(url)",
            r#"
            CREATE TABLE IF NOT EXISTS processed_archive (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                submitted_by TEXT NOT NULL,
                original_created_at TEXT NOT NULL,
                archived_at TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_archive_url ON processed_archive(url)",
            r#"
            CREATE TABLE IF NOT EXISTS hansard_questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question_text TEXT NOT NULL,
                category TEXT NOT NULL,
                source_articles TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        ];
        for statement in statements {
            sqlx::query(statement).execute(&self.db).await?;
        }
        debug!("Database schema ready");
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    // ============ pending ============

    /// Insert a pending item. A URL already pending surfaces as `Duplicate`.
    pub async fn insert_pending(&self, url: &str, submitted_by: &str, pasted_text: Option<&str>) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO pending_articles (url, submitted_by, pasted_text, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(url)
        .bind(submitted_by)
        .bind(pasted_text)
        .bind(Utc::now())
        .execute(&self.db)
        .await;

        match result {
            Ok(done) => Ok(done.last_insert_rowid()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(MonitorError::Duplicate {
                location: DuplicateLocation::Pending,
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_pending(&self) -> Result<Vec<PendingItem>> {
        let rows = sqlx::query(
            "SELECT id, url, submitted_by, pasted_text, created_at FROM pending_articles ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.db)
        .await?;
        rows.iter().map(pending_from_row).collect()
    }

    pub async fn get_pending(&self, id: i64) -> Result<Option<PendingItem>> {
        let row = sqlx::query("SELECT id, url, submitted_by, pasted_text, created_at FROM pending_articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        row.as_ref().map(pending_from_row).transpose()
    }

    /// Move a pending item into the archive. Returns false when it is no longer pending.
    pub async fn archive_pending(&self, id: i64) -> Result<bool> {
        let mut tx = self.db.begin().await?;
        let row = sqlx::query("SELECT id, url, submitted_by, pasted_text, created_at FROM pending_articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(false);
        };
        let item = pending_from_row(&row)?;

        sqlx::query(
            "INSERT INTO processed_archive (url, submitted_by, original_created_at, archived_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&item.url)
        .bind(&item.submitted_by)
        .bind(item.created_at)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM pending_articles WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Archived article {}: {}", id, item.url);
        Ok(true)
    }

    /// Move a pending item to the manual queue with empty content. Returns false when it is no longer pending.
    pub async fn demote_pending(&self, id: i64) -> Result<bool> {
        let mut tx = self.db.begin().await?;
        let row = sqlx::query("SELECT id, url, submitted_by, pasted_text, created_at FROM pending_articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(false);
        };
        let item = pending_from_row(&row)?;

        sqlx::query(
            "INSERT INTO manual_input_articles (url, submitted_by, article_content, created_at) VALUES (?, ?, NULL, ?)",
        )
        .bind(&item.url)
        .bind(&item.submitted_by)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM pending_articles WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Moved article {} to manual processing: {}", id, item.url);
        Ok(true)
    }

    // ============ manual ============

    pub async fn insert_manual(&self, url: &str, submitted_by: &str) -> Result<i64> {
        let done = sqlx::query(
            "INSERT INTO manual_input_articles (url, submitted_by, article_content, created_at) VALUES (?, ?, NULL, ?)",
        )
        .bind(url)
        .bind(submitted_by)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;
        Ok(done.last_insert_rowid())
    }

    pub async fn list_manual(&self) -> Result<Vec<ManualItem>> {
        let rows = sqlx::query(
            "SELECT id, url, submitted_by, article_content, created_at FROM manual_input_articles ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.db)
        .await?;
        rows.iter().map(manual_from_row).collect()
    }

    pub async fn get_manual(&self, id: i64) -> Result<Option<ManualItem>> {
        let row = sqlx::query(
            "SELECT id, url, submitted_by, article_content, created_at FROM manual_input_articles WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.as_ref().map(manual_from_row).transpose()
    }

    pub async fn update_manual_content(&self, id: i64, content: &str) -> Result<bool> {
        let done = sqlx::query("UPDATE manual_input_articles SET article_content = ? WHERE id = ?")
            .bind(content)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    pub async fn delete_manual(&self, id: i64) -> Result<bool> {
        let done = sqlx::query("DELETE FROM manual_input_articles WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Delete several manual items in one transaction.
    pub async fn delete_manual_many(&self, ids: &[i64]) -> Result<u64> {
        let mut tx = self.db.begin().await?;
        let mut deleted = 0;
        for id in ids {
            let done = sqlx::query("DELETE FROM manual_input_articles WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            deleted += done.rows_affected();
        }
        tx.commit().await?;
        Ok(deleted)
    }

    // ============ archive ============

    pub async fn list_archived(&self) -> Result<Vec<ArchivedItem>> {
        let rows = sqlx::query(
            "SELECT id, url, submitted_by, original_created_at, archived_at FROM processed_archive ORDER BY archived_at DESC, id DESC",
        )
        .fetch_all(&self.db)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(ArchivedItem {
                id: row.try_get("id")?,
                url: row.try_get("url")?,
                submitted_by: row.try_get("submitted_by")?,
                original_created_at: row.try_get("original_created_at")?,
                archived_at: row.try_get("archived_at")?,
            });
        }
        Ok(items)
    }

    /// Which table, if any, already holds this URL.
    pub async fn find_duplicate(&self, url: &str) -> Result<Option<DuplicateLocation>> {
        let checks = [
            ("SELECT 1 FROM pending_articles WHERE url = ? LIMIT 1", DuplicateLocation::Pending),
            ("SELECT 1 FROM manual_input_articles WHERE url = ? LIMIT 1", DuplicateLocation::Manual),
            ("SELECT 1 FROM processed_archive WHERE url = ? LIMIT 1", DuplicateLocation::Archived),
        ];
        for (query, location) in checks {
            let hit = sqlx::query(query).bind(url).fetch_optional(&self.db).await?;
            if hit.is_some() {
                return Ok(Some(location));
            }
        }
        Ok(None)
    }

    // ============ parliamentary questions ============

    pub async fn insert_question(&self, text: &str, category: &str, source_item_ids: &[i64]) -> Result<i64> {
        let sources = serde_json::to_string(source_item_ids)?;
        let done = sqlx::query(
            "INSERT INTO hansard_questions (question_text, category, source_articles, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(text)
        .bind(category)
        .bind(sources)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;
        Ok(done.last_insert_rowid())
    }

    pub async fn recent_questions(&self, limit: u32) -> Result<Vec<ParliamentaryQuestionRecord>> {
        let rows = sqlx::query(
            "SELECT id, question_text, category, source_articles, created_at FROM hansard_questions ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.db)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let sources: String = row.try_get("source_articles")?;
            records.push(ParliamentaryQuestionRecord {
                id: row.try_get("id")?,
                text: row.try_get("question_text")?,
                category: row.try_get("category")?,
                created_at: row.try_get("created_at")?,
                source_item_ids: serde_json::from_str(&sources)?,
            });
        }
        Ok(records)
    }
}

fn pending_from_row(row: &SqliteRow) -> Result<PendingItem> {
    Ok(PendingItem {
        id: row.try_get("id")?,
        url: row.try_get("url")?,
        submitted_by: row.try_get("submitted_by")?,
        pasted_text: row.try_get("pasted_text")?,
        created_at: row.try_get("created_at")?,
    })
}

fn manual_from_row(row: &SqliteRow) -> Result<ManualItem> {
    Ok(ManualItem {
        id: row.try_get("id")?,
        url: row.try_get("url")?,
        submitted_by: row.try_get("submitted_by")?,
        content: row.try_get("article_content")?,
        created_at: row.try_get("created_at")?,
    })
}
