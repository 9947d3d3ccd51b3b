//! 检查点：按 run id 保存 / 读取 AgentState 快照，用于恢复被中断的运行
//!
//! 后端：内存（测试与单进程）、JSON 文件（每个 run 一个文件）、SQLite（需 `async-sqlite` feature）。
//! 序列化统一使用 serde_json。

pub mod file;
pub mod memory;
#[cfg(feature = "async-sqlite")]
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::AgentState;

pub use file::FileCheckpointStore;
pub use memory::MemoryCheckpointStore;
#[cfg(feature = "async-sqlite")]
pub use sqlite::SqliteCheckpointStore;

/// 检查点读写错误
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checkpoint serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[cfg(feature = "async-sqlite")]
    #[error("Checkpoint database error: {0}")]
    Sql(#[from] sqlx::Error),
}

/// 检查点存储接口：后写覆盖，load 返回该 run 最近一次保存的状态
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn save(&self, run_id: &str, state: &AgentState) -> Result<(), CheckpointError>;

    async fn load(&self, run_id: &str) -> Result<Option<AgentState>, CheckpointError>;
}
