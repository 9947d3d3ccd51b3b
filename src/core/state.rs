//! 运行状态：AgentState 与局部更新 StateUpdate
//!
//! 每次运行只有一个 AgentState，由 Orchestrator 独占持有；Agent 只返回 StateUpdate，
//! 由 merge 按字段合并：messages / execution_log 追加，其余字段替换，未出现的字段保持不变。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 消息作者标签：Supervisor 据此判断刚结束的是谁的回合
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Author {
    Planner,
    Executor,
    /// 无法识别的标签（例如外部写入或损坏的检查点）
    Other(String),
}

impl Author {
    pub fn as_str(&self) -> &str {
        match self {
            Author::Planner => "Planner",
            Author::Executor => "Executor",
            Author::Other(name) => name,
        }
    }
}

impl std::fmt::Display for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            author: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            author: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            author: None,
        }
    }

    pub fn with_author(mut self, author: Author) -> Self {
        self.author = Some(author);
        self
    }
}

/// Supervisor 的路由决策
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NextStep {
    Planner,
    Executor,
    #[serde(rename = "FINISH")]
    Finish,
}

impl std::fmt::Display for NextStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NextStep::Planner => f.write_str("Planner"),
            NextStep::Executor => f.write_str("Executor"),
            NextStep::Finish => f.write_str("FINISH"),
        }
    }
}

/// 常用状态标签
pub mod status {
    pub const CREATED: &str = "created";
    pub const PLANNING_DONE: &str = "planning_done";
    pub const EXECUTING: &str = "executing";
    pub const NOTHING_TO_EXECUTE: &str = "nothing_to_execute";
}

/// 贯穿每个回合的运行状态
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    /// 只追加的对话轨迹
    pub messages: Vec<Message>,
    pub user_goal: String,
    /// Planner 运行前为空，之后只读
    pub plan: Vec<String>,
    /// 下一个未执行步骤的下标，单调不减，且不超过 plan.len()
    pub current_step_index: usize,
    /// 每执行一步追加一条
    pub execution_log: Vec<String>,
    /// 最近一次路由决策，仅用于诊断；创建时为 None
    pub next_step: Option<NextStep>,
    pub status: String,
}

impl AgentState {
    /// 由目标创建初始状态：一条用户消息 + 空计划
    pub fn new(goal: impl Into<String>) -> Self {
        let goal = goal.into();
        Self {
            messages: vec![Message::user(goal.clone())],
            user_goal: goal,
            plan: Vec::new(),
            current_step_index: 0,
            execution_log: Vec::new(),
            next_step: None,
            status: status::CREATED.to_string(),
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// 计划中尚未执行的步骤数
    pub fn remaining_steps(&self) -> usize {
        self.plan.len().saturating_sub(self.current_step_index)
    }

    /// 将 Agent 返回的局部更新合并进来：messages / execution_log 追加，其余字段有值则替换
    pub fn merge(&mut self, update: StateUpdate) {
        self.messages.extend(update.messages);

        if let Some(goal) = update.user_goal {
            self.user_goal = goal;
        }
        if let Some(plan) = update.plan {
            self.plan = plan;
        }
        if let Some(index) = update.current_step_index {
            self.current_step_index = index;
        }
        self.execution_log.extend(update.execution_log);
        if let Some(status) = update.status {
            self.status = status;
        }
    }
}

/// Agent 返回的局部状态；None / 空表示该字段不变
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateUpdate {
    /// 追加到 messages
    pub messages: Vec<Message>,
    pub user_goal: Option<String>,
    pub plan: Option<Vec<String>>,
    pub current_step_index: Option<usize>,
    /// 追加到 execution_log
    pub execution_log: Vec<String>,
    pub status: Option<String>,
}

impl StateUpdate {
    /// 只修改 status 的更新
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::default()
        }
    }
}
