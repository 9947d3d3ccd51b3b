//! Agent 提示词与兜底内容
//!
//! 默认值可被配置 [prompts] 段覆盖（见 config.rs）。

use crate::config::PromptsSection;

pub const DEFAULT_PLANNER_SYSTEM: &str = "You are a planning assistant. Given a high-level goal, \
produce a short ordered list of concrete steps to achieve it. Focus on practical, \
implementation-oriented actions.";

pub const DEFAULT_EXECUTOR_SYSTEM: &str = "You are an execution assistant. For the given plan step, \
describe briefly (3-5 sentences) how you would carry it out in practice, including any relevant \
tools, commands, or configuration considerations.";

/// 目标缺失（user_goal 与首条消息都为空）时使用
pub const DEFAULT_GOAL: &str = "Set up a basic ML experiment tracking workflow.";

/// 解析不出任何步骤时的兜底计划：澄清 → 草拟 → 实施 → 验证
pub const FALLBACK_PLAN: [&str; 4] = [
    "Clarify the goal and constraints.",
    "Draft a minimal implementation plan.",
    "Implement the plan in a step-by-step fashion.",
    "Verify that the goal has been achieved.",
];

pub fn fallback_plan() -> Vec<String> {
    FALLBACK_PLAN.iter().map(|s| s.to_string()).collect()
}

/// Planner 的 user 消息
pub fn planner_request(goal: &str) -> String {
    format!("User goal: {goal}\n\nRespond with 4-8 steps as a numbered list.")
}

/// Executor 的 user 消息
pub fn executor_request(goal: &str, step: &str) -> String {
    format!("Overall user goal: {goal}\nCurrent step: {step}")
}

/// 执行日志条目（步骤号从 1 开始）
pub fn log_entry(step_number: usize, step: &str, explanation: &str) -> String {
    format!("Step {step_number}: {step}\n{explanation}")
}

/// 一次运行使用的提示词集合
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompts {
    pub planner_system: String,
    pub executor_system: String,
    pub default_goal: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            planner_system: DEFAULT_PLANNER_SYSTEM.to_string(),
            executor_system: DEFAULT_EXECUTOR_SYSTEM.to_string(),
            default_goal: DEFAULT_GOAL.to_string(),
        }
    }
}

impl From<&PromptsSection> for Prompts {
    fn from(section: &PromptsSection) -> Self {
        let defaults = Prompts::default();
        Self {
            planner_system: section.planner_system.clone().unwrap_or(defaults.planner_system),
            executor_system: section
                .executor_system
                .clone()
                .unwrap_or(defaults.executor_system),
            default_goal: section.default_goal.clone().unwrap_or(defaults.default_goal),
        }
    }
}
