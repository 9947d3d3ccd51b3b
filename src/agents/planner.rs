//! PlannerAgent：把高层目标变成有序步骤
//!
//! 目标取值顺序：state.user_goal → 首条消息内容 → 默认目标。
//! 调用一次 LLM（固定 system + 目标），解析为步骤；解析为空时使用固定的 4 步兜底计划，保证循环总能推进。

use std::sync::Arc;

use async_trait::async_trait;

use crate::agents::{parse_steps, prompts, Agent, Prompts};
use crate::core::{status, AgentError, AgentState, Author, Message, StateUpdate};
use crate::llm::LlmClient;

/// Planner：持有 LLM 与提示词
pub struct PlannerAgent {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
    default_goal: String,
}

impl PlannerAgent {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self::with_prompts(llm, &Prompts::default())
    }

    pub fn with_prompts(llm: Arc<dyn LlmClient>, prompts: &Prompts) -> Self {
        Self {
            llm,
            system_prompt: prompts.planner_system.clone(),
            default_goal: prompts.default_goal.clone(),
        }
    }

    fn resolve_goal(&self, state: &AgentState) -> String {
        if !state.user_goal.is_empty() {
            return state.user_goal.clone();
        }
        state
            .messages
            .first()
            .map(|m| m.content.clone())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| self.default_goal.clone())
    }

    /// 生成计划并返回局部更新；state.plan 非空时会重新生成
    pub async fn plan(&self, state: &AgentState) -> Result<StateUpdate, AgentError> {
        let goal = self.resolve_goal(state);
        tracing::info!(goal = %goal, "planner generating plan");

        let request = [
            Message::system(self.system_prompt.clone()),
            Message::user(prompts::planner_request(&goal)),
        ];
        let raw_plan = self.llm.complete(&request).await?;

        let mut steps = parse_steps(&raw_plan);
        if steps.is_empty() {
            tracing::warn!("planner output had no parseable steps, using fallback plan");
            steps = prompts::fallback_plan();
        }

        for (i, step) in steps.iter().enumerate() {
            tracing::info!("  {}. {}", i + 1, step);
        }

        Ok(StateUpdate {
            messages: vec![Message::assistant(raw_plan).with_author(Author::Planner)],
            plan: Some(steps),
            current_step_index: Some(0),
            status: Some(status::PLANNING_DONE.to_string()),
            user_goal: Some(goal),
            ..StateUpdate::default()
        })
    }
}

#[async_trait]
impl Agent for PlannerAgent {
    fn author(&self) -> Author {
        Author::Planner
    }

    async fn act(&self, state: &AgentState) -> Result<StateUpdate, AgentError> {
        self.plan(state).await
    }
}
