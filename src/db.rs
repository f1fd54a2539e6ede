use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::error::TaskError;

/// One task's stored document
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTask {
    pub quest_id: String,
    pub task_index: u32,
    pub document: Value,
    pub updated_at: DateTime<Utc>,
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, TaskError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        // Run migrations
        Self::migrate(&pool).await?;

        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS task_progress (
                quest_id TEXT NOT NULL,
                task_index INTEGER NOT NULL,
                document TEXT NOT NULL DEFAULT '{}',
                updated_at TEXT NOT NULL,
                PRIMARY KEY(quest_id, task_index)
            )
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Database migrations complete");
        Ok(())
    }

    /// Upsert every task document of a quest in one transaction
    pub async fn save_quest(&self, quest_id: &str, documents: &[(u32, Value)]) -> Result<(), TaskError> {
        let updated_at = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        for (index, document) in documents {
            sqlx::query(
                r#"INSERT INTO task_progress (quest_id, task_index, document, updated_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(quest_id, task_index) DO UPDATE SET
                    document = excluded.document,
                    updated_at = excluded.updated_at"#,
            )
            .bind(quest_id)
            .bind(i64::from(*index))
            .bind(document.to_string())
            .bind(&updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!("Saved {} task documents for '{}'", documents.len(), quest_id);
        Ok(())
    }

    /// Every stored document. Rows that no longer parse are skipped.
    pub async fn load_all(&self) -> Result<Vec<StoredTask>, TaskError> {
        let rows = sqlx::query(
            "SELECT quest_id, task_index, document, updated_at FROM task_progress ORDER BY quest_id, task_index",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut tasks = Vec::with_capacity(rows.len());
        for row in rows {
            let quest_id: String = row.get("quest_id");
            let index: i64 = row.get("task_index");
            let document: String = row.get("document");
            let updated_at: String = row.get("updated_at");

            let Ok(task_index) = u32::try_from(index) else {
                tracing::warn!("Skipping stored task '{}' with bad index {}", quest_id, index);
                continue;
            };
            let document = match serde_json::from_str(&document) {
                Ok(document) => document,
                Err(e) => {
                    tracing::warn!("Skipping stored task {} of '{}': {}", task_index, quest_id, e);
                    continue;
                }
            };
            let updated_at = DateTime::parse_from_rfc3339(&updated_at)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());

            tasks.push(StoredTask {
                quest_id,
                task_index,
                document,
                updated_at,
            });
        }

        Ok(tasks)
    }

    /// Drop stored progress for a quest that no longer exists
    pub async fn delete_quest(&self, quest_id: &str) -> Result<u64, TaskError> {
        let result = sqlx::query("DELETE FROM task_progress WHERE quest_id = ?")
            .bind(quest_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    async fn open(dir: &TempDir) -> Database {
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("test.db").display());
        Database::new(&url).await.unwrap()
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;

        db.save_quest(
            "village_defense",
            &[
                (0, json!({"type": "hunt", "completeUsers": []})),
                (2, json!({"type": "meeting"})),
            ],
        )
        .await
        .unwrap();

        let tasks = db.load_all().await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].quest_id, "village_defense");
        assert_eq!(tasks[0].task_index, 0);
        assert_eq!(tasks[0].document["type"], json!("hunt"));
        assert_eq!(tasks[1].task_index, 2);
    }

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;

        db.save_quest("q", &[(0, json!({"value": 1}))]).await.unwrap();
        db.save_quest("q", &[(0, json!({"value": 2}))]).await.unwrap();

        let tasks = db.load_all().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].document["value"], json!(2));
    }

    #[tokio::test]
    async fn test_malformed_rows_skipped() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;

        db.save_quest("q", &[(0, json!({}))]).await.unwrap();
        sqlx::query("INSERT INTO task_progress (quest_id, task_index, document, updated_at) VALUES ('q', 1, 'not json', 'never')")
            .execute(&db.pool)
            .await
            .unwrap();

        let tasks = db.load_all().await.unwrap();
        assert_eq!(tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_quest() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;

        db.save_quest("a", &[(0, json!({})), (1, json!({}))]).await.unwrap();
        db.save_quest("b", &[(0, json!({}))]).await.unwrap();

        assert_eq!(db.delete_quest("a").await.unwrap(), 2);
        let tasks = db.load_all().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].quest_id, "b");
    }
}
