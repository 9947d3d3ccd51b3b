//! 错误类型
//!
//! 可恢复情况（解析失败 → 兜底计划、越权调用 Executor → no-op、未知作者 → Finish）在本地处理，不会出现在这里。
//! 这里只有致命错误：生成能力失败、检查点读写失败、调用方施加的超时 / 回合上限。

use std::time::Duration;

use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::core::Author;
use crate::llm::LlmError;

/// 单个 Agent 回合中的错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// 一次运行的致命错误；不重试，不回滚
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("{agent} failed: {source}")]
    Agent {
        agent: Author,
        #[source]
        source: AgentError,
    },

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Turn {turn} ({agent}) timed out after {limit:?}")]
    TurnTimeout {
        turn: usize,
        agent: Author,
        limit: Duration,
    },

    #[error("Turn limit of {0} exceeded")]
    TurnLimitExceeded(usize),

    #[error("No checkpoint found for run: {0}")]
    RunNotFound(String),
}

impl OrchestratorError {
    /// 底层生成能力错误（若是）
    pub fn llm_error(&self) -> Option<&LlmError> {
        match self {
            OrchestratorError::Agent {
                source: AgentError::Llm(e),
                ..
            } => Some(e),
            _ => None,
        }
    }
}
