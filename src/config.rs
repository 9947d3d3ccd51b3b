//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `BATON__*` 覆盖（双下划线表示嵌套，如 `BATON__LLM__PROVIDER=openai`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub orchestrator: OrchestratorSection,
    pub checkpoint: CheckpointSection,
    pub prompts: PromptsSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 固定的 run id（检查点键）；未设置时每次运行生成新的 UUID
    pub run_id: Option<String>,
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：ollama（本地，无需 Key）/ deepseek / openai / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    /// 通用模型名；各后端子段的 model 优先
    pub model: Option<String>,
    /// openai / ollama 的端点地址
    pub base_url: Option<String>,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default)]
    pub deepseek: LlmModelSection,
    #[serde(default)]
    pub openai: LlmModelSection,
    #[serde(default)]
    pub ollama: LlmModelSection,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: None,
            temperature: 0.0,
            deepseek: LlmModelSection::default(),
            openai: LlmModelSection::default(),
            ollama: LlmModelSection::default(),
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_provider() -> String {
    "ollama".to_string()
}

/// [llm.deepseek] / [llm.openai] / [llm.ollama] 段
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmModelSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次 LLM 请求超时（秒），0 表示不限制
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

/// [orchestrator] 段：调用方施加的保护，默认都不启用
#[derive(Debug, Clone, Deserialize, Default)]
pub struct OrchestratorSection {
    /// 单个 Agent 回合超时（秒）
    pub turn_timeout_secs: Option<u64>,
    /// Supervisor 决策次数上限
    pub max_turns: Option<usize>,
}

/// 检查点后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointBackend {
    #[default]
    None,
    Memory,
    File,
    Sqlite,
}

/// [checkpoint] 段
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CheckpointSection {
    #[serde(default)]
    pub backend: CheckpointBackend,
    /// file 后端为目录，sqlite 后端为数据库文件；未设置时使用 .baton/checkpoints 或 .baton/checkpoints.db
    pub path: Option<PathBuf>,
}

/// [prompts] 段：覆盖默认提示词
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PromptsSection {
    pub planner_system: Option<String>,
    pub executor_system: Option<String>,
    pub default_goal: Option<String>,
}

/// 从 config 目录加载配置，环境变量 BATON__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 BATON__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("BATON")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
