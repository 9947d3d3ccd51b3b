//! Baton - Supervisor / Planner / Executor 多智能体编排循环
//!
//! 模块划分：
//! - **agents**: PlannerAgent（目标 → 步骤）、ExecutorAgent（逐步执行）、步骤解析、提示词
//! - **checkpoint**: 按 run id 保存 / 恢复状态快照（内存 / 文件 / SQLite）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 运行状态与合并、Supervisor 路由、Orchestrator 回合循环、错误、过程事件
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **observability**: tracing 初始化
//! - **runtime**: 按配置装配 Orchestrator

pub mod agents;
pub mod checkpoint;
pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod runtime;

pub use crate::core::{AgentState, NextStep, Orchestrator, OrchestratorError, OrchestratorEvent};
