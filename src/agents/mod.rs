//! Agent 层：Planner（目标 → 步骤）、Executor（逐步执行）、步骤解析与提示词
//!
//! Agent 从不直接修改共享状态，只读取 AgentState 并返回 StateUpdate，由 Orchestrator 合并。

pub mod executor;
pub mod parser;
pub mod planner;
pub mod prompts;

use async_trait::async_trait;

use crate::core::{AgentError, AgentState, Author, StateUpdate};

pub use executor::ExecutorAgent;
pub use parser::parse_steps;
pub use planner::PlannerAgent;
pub use prompts::Prompts;

/// 一个回合中被 Supervisor 选中的行动者
#[async_trait]
pub trait Agent: Send + Sync {
    /// 写入消息时使用的作者标签
    fn author(&self) -> Author;

    /// 读取当前状态，返回局部更新
    async fn act(&self, state: &AgentState) -> Result<StateUpdate, AgentError>;
}
