//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Ollama / Mock）实现 LlmClient::complete（非流式）。
//! 编排核心只把它当作不透明的 generate(messages) -> text 能力，不做重试与退避。

use async_trait::async_trait;
use thiserror::Error;

use crate::core::Message;

/// 生成能力失败（网络、模型、响应格式），由核心原样向上传播
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("LLM API error: {0}")]
    ApiError(String),

    #[error("LLM request timed out after {0}s")]
    Timeout(u64),

    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),
}

/// LLM 客户端 trait：非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成，返回模型输出文本
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
