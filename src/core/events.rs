//! 运行过程事件：供 CLI 等前端流式展示回合进度（纯展示，不影响状态）

use serde::Serialize;

use crate::core::NextStep;

/// 单回合过程事件（可序列化为 JSON）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrchestratorEvent {
    /// Supervisor 给出路由决策（turn 从 1 开始）
    Routed { turn: usize, next_step: NextStep },
    /// Planner 产出计划
    PlanReady { steps: Vec<String> },
    /// Executor 完成一步；index 为合并后的 current_step_index
    StepExecuted { index: usize, total: usize },
    /// Executor 被越权调用，未做任何事
    NothingToExecute,
    /// 状态快照已写入检查点
    Checkpointed { run_id: String, turn: usize },
    /// 运行结束
    Finished { status: String },
}
