//! Ollama 本地模型（OpenAI 兼容端点 /v1），无需 API Key
//!
//! - Base URL: http://localhost:11434/v1
//! - 默认模型: mistral:latest

use crate::llm::OpenAiClient;

pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
pub const OLLAMA_DEFAULT_MODEL: &str = "mistral:latest";

/// Ollama 忽略 Authorization，但 OpenAI 客户端总会发送一个 key
const OLLAMA_API_KEY: &str = "ollama";

/// 创建 Ollama 客户端；base_url / model 为空时使用本地默认值
pub fn create_ollama_client(base_url: Option<&str>, model: Option<&str>) -> OpenAiClient {
    OpenAiClient::new(
        Some(base_url.unwrap_or(OLLAMA_BASE_URL)),
        model.unwrap_or(OLLAMA_DEFAULT_MODEL),
        Some(OLLAMA_API_KEY),
    )
}
