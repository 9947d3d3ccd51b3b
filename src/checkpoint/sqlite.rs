//! SQLite 检查点存储（sqlx，需要 `async-sqlite` feature）
//!
//! 每次 save 追加一行，load 取该 run 的最新一行；可按需 prune 旧快照。

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::checkpoint::{CheckpointError, CheckpointStore};
use crate::core::AgentState;

pub struct SqliteCheckpointStore {
    pool: SqlitePool,
}

impl SqliteCheckpointStore {
    /// 打开（不存在则创建）数据库并初始化表
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        if let Some(parent) = db_path.as_ref().parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let db_url = format!("sqlite:{}?mode=rwc", db_path.as_ref().display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        let store = Self { pool };
        store.init_tables().await?;
        Ok(store)
    }

    async fn init_tables(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS checkpoints (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                step INTEGER NOT NULL,
                status TEXT NOT NULL,
                state TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_checkpoints_run ON checkpoints(run_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// 某个 run 已保存的快照数量
    pub async fn count(&self, run_id: &str) -> Result<i64, CheckpointError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM checkpoints WHERE run_id = ?")
            .bind(run_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// 只保留最近 keep 个快照，返回删除行数
    pub async fn prune(&self, run_id: &str, keep: i64) -> Result<u64, CheckpointError> {
        let result = sqlx::query(
            "DELETE FROM checkpoints WHERE run_id = ? AND id NOT IN (
                SELECT id FROM checkpoints WHERE run_id = ? ORDER BY id DESC LIMIT ?
            )",
        )
        .bind(run_id)
        .bind(run_id)
        .bind(keep)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn save(&self, run_id: &str, state: &AgentState) -> Result<(), CheckpointError> {
        let json = serde_json::to_string(state)?;
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO checkpoints (run_id, step, status, state, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(run_id)
        .bind(state.current_step_index as i64)
        .bind(&state.status)
        .bind(json)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load(&self, run_id: &str) -> Result<Option<AgentState>, CheckpointError> {
        let row = sqlx::query(
            "SELECT state FROM checkpoints WHERE run_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let json: String = row.get("state");
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_latest_checkpoint_wins() {
        let dir = TempDir::new().unwrap();
        let store = SqliteCheckpointStore::new(dir.path().join("runs.db")).await.unwrap();

        assert!(store.load("run").await.unwrap().is_none());

        let mut state = AgentState::new("goal");
        store.save("run", &state).await.unwrap();
        state.plan = vec!["a".into()];
        state.status = "planning_done".into();
        store.save("run", &state).await.unwrap();

        assert_eq!(store.load("run").await.unwrap(), Some(state));
        assert_eq!(store.count("run").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_prune_keeps_latest() {
        let dir = TempDir::new().unwrap();
        let store = SqliteCheckpointStore::new(dir.path().join("runs.db")).await.unwrap();

        let mut state = AgentState::new("goal");
        for i in 0..4 {
            state.current_step_index = i;
            store.save("run", &state).await.unwrap();
        }

        assert_eq!(store.prune("run", 1).await.unwrap(), 3);
        assert_eq!(store.load("run").await.unwrap().unwrap().current_step_index, 3);
    }
}
