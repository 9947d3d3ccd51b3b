//! 运行时装配：按配置选择 LLM 后端与检查点存储，构建 Orchestrator
//!
//! 供 CLI 或其它前端调用；核心循环本身不读取配置。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::agents::Prompts;
use crate::checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
use crate::config::{AppConfig, CheckpointBackend};
use crate::core::Orchestrator;
use crate::llm::{
    create_deepseek_client, create_ollama_client, LlmClient, MockLlmClient, OpenAiClient,
    DEEPSEEK_CHAT, OLLAMA_BASE_URL, OLLAMA_DEFAULT_MODEL,
};

/// 选定的 LLM 后端及其参数
#[derive(Debug, Clone, PartialEq)]
pub enum LlmBackend {
    Mock,
    Ollama { base_url: String, model: String },
    DeepSeek { model: String, api_key: String },
    OpenAi {
        base_url: Option<String>,
        model: String,
        api_key: String,
    },
}

/// 从环境变量读取的 API Key
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub deepseek: Option<String>,
    pub openai: Option<String>,
}

impl ApiKeys {
    pub fn from_env() -> Self {
        Self {
            deepseek: std::env::var("DEEPSEEK_API_KEY").ok(),
            openai: std::env::var("OPENAI_API_KEY").ok(),
        }
    }
}

/// 后端子段 model > [llm].model > 内置默认
fn resolve_model(section: &Option<String>, cfg: &AppConfig, fallback: &str) -> String {
    section
        .clone()
        .or_else(|| cfg.llm.model.clone())
        .unwrap_or_else(|| fallback.to_string())
}

/// 按 provider 选择后端；需要 Key 的后端缺 Key 时退回 Mock
pub fn select_backend(cfg: &AppConfig, keys: &ApiKeys) -> LlmBackend {
    match cfg.llm.provider.to_lowercase().as_str() {
        "mock" => LlmBackend::Mock,
        "ollama" => LlmBackend::Ollama {
            base_url: cfg
                .llm
                .base_url
                .clone()
                .unwrap_or_else(|| OLLAMA_BASE_URL.to_string()),
            model: resolve_model(&cfg.llm.ollama.model, cfg, OLLAMA_DEFAULT_MODEL),
        },
        "deepseek" => match keys.deepseek.clone().or_else(|| keys.openai.clone()) {
            Some(api_key) => LlmBackend::DeepSeek {
                model: resolve_model(&cfg.llm.deepseek.model, cfg, DEEPSEEK_CHAT),
                api_key,
            },
            None => {
                tracing::warn!(
                    "provider = deepseek but no DEEPSEEK_API_KEY / OPENAI_API_KEY set, using Mock LLM"
                );
                LlmBackend::Mock
            }
        },
        "openai" => match keys.openai.clone() {
            Some(api_key) => LlmBackend::OpenAi {
                base_url: cfg.llm.base_url.clone(),
                model: resolve_model(&cfg.llm.openai.model, cfg, "gpt-4o-mini"),
                api_key,
            },
            None => {
                tracing::warn!("provider = openai but no OPENAI_API_KEY set, using Mock LLM");
                LlmBackend::Mock
            }
        },
        other => {
            tracing::warn!("Unknown LLM provider '{}', using Mock LLM", other);
            LlmBackend::Mock
        }
    }
}

/// 根据配置与环境变量创建 LLM 客户端
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let timeout = cfg.llm.timeouts.request;
    let temperature = cfg.llm.temperature;

    match select_backend(cfg, &ApiKeys::from_env()) {
        LlmBackend::Mock => {
            tracing::info!("Using Mock LLM");
            Arc::new(MockLlmClient)
        }
        LlmBackend::Ollama { base_url, model } => {
            tracing::info!("Using Ollama LLM ({} at {})", model, base_url);
            Arc::new(
                create_ollama_client(Some(&base_url), Some(&model))
                    .with_temperature(temperature)
                    .with_request_timeout(timeout),
            )
        }
        LlmBackend::DeepSeek { model, api_key } => {
            tracing::info!("Using DeepSeek LLM ({})", model);
            Arc::new(
                create_deepseek_client(Some(&model), Some(&api_key))
                    .with_temperature(temperature)
                    .with_request_timeout(timeout),
            )
        }
        LlmBackend::OpenAi {
            base_url,
            model,
            api_key,
        } => {
            tracing::info!("Using OpenAI LLM ({})", model);
            Arc::new(
                OpenAiClient::new(base_url.as_deref(), &model, Some(&api_key))
                    .with_temperature(temperature)
                    .with_request_timeout(timeout),
            )
        }
    }
}

/// 根据 [checkpoint] 段创建存储；backend = none 时返回 None
pub async fn create_checkpoint_store(
    cfg: &AppConfig,
) -> anyhow::Result<Option<Arc<dyn CheckpointStore>>> {
    let store: Arc<dyn CheckpointStore> = match cfg.checkpoint.backend {
        CheckpointBackend::None => return Ok(None),
        CheckpointBackend::Memory => Arc::new(MemoryCheckpointStore::new()),
        CheckpointBackend::File => {
            let dir = cfg
                .checkpoint
                .path
                .clone()
                .unwrap_or_else(|| PathBuf::from(".baton/checkpoints"));
            tracing::info!("Using file checkpoints at {}", dir.display());
            Arc::new(FileCheckpointStore::new(dir))
        }
        #[cfg(feature = "async-sqlite")]
        CheckpointBackend::Sqlite => {
            let path = cfg
                .checkpoint
                .path
                .clone()
                .unwrap_or_else(|| PathBuf::from(".baton/checkpoints.db"));
            tracing::info!("Using SQLite checkpoints at {}", path.display());
            Arc::new(
                crate::checkpoint::SqliteCheckpointStore::new(&path)
                    .await
                    .with_context(|| format!("open checkpoint database {}", path.display()))?,
            )
        }
        #[cfg(not(feature = "async-sqlite"))]
        CheckpointBackend::Sqlite => {
            anyhow::bail!("sqlite checkpoints require the `async-sqlite` feature")
        }
    };
    Ok(Some(store))
}

/// 由配置构建 Orchestrator（LLM、提示词、检查点、超时与回合上限）
pub async fn build_orchestrator(cfg: &AppConfig) -> anyhow::Result<Orchestrator> {
    build_orchestrator_with_llm(cfg, create_llm_from_config(cfg)).await
}

/// 同 build_orchestrator，但由调用方提供 LLM（便于运行后读取 token 统计）
pub async fn build_orchestrator_with_llm(
    cfg: &AppConfig,
    llm: Arc<dyn LlmClient>,
) -> anyhow::Result<Orchestrator> {
    let prompts = Prompts::from(&cfg.prompts);

    let mut orchestrator = Orchestrator::with_prompts(llm, &prompts);

    if let Some(store) = create_checkpoint_store(cfg)
        .await
        .context("Failed to create checkpoint store")?
    {
        orchestrator = orchestrator.with_checkpoint_store(store);
    }
    if let Some(secs) = cfg.orchestrator.turn_timeout_secs {
        orchestrator = orchestrator.with_turn_timeout(Duration::from_secs(secs));
    }
    if let Some(max) = cfg.orchestrator.max_turns {
        orchestrator = orchestrator.with_max_turns(max);
    }

    Ok(orchestrator)
}
