//! ExecutorAgent：执行当前步骤并推进下标
//!
//! 计划为空或已执行完时只返回 status = nothing_to_execute（越权调用的保护，不是错误）。
//! 否则对 plan[current_step_index] 调用一次 LLM，追加日志条目并把下标加一。

use std::sync::Arc;

use async_trait::async_trait;

use crate::agents::{prompts, Agent, Prompts};
use crate::core::{status, AgentError, AgentState, Author, Message, StateUpdate};
use crate::llm::LlmClient;

/// Executor：持有 LLM 与 system prompt
pub struct ExecutorAgent {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl ExecutorAgent {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self::with_prompts(llm, &Prompts::default())
    }

    pub fn with_prompts(llm: Arc<dyn LlmClient>, prompts: &Prompts) -> Self {
        Self {
            llm,
            system_prompt: prompts.executor_system.clone(),
        }
    }

    pub async fn execute(&self, state: &AgentState) -> Result<StateUpdate, AgentError> {
        let index = state.current_step_index;
        let Some(step) = state.plan.get(index) else {
            tracing::warn!(
                plan_len = state.plan.len(),
                current_step_index = index,
                "executor has no remaining steps"
            );
            return Ok(StateUpdate::status(status::NOTHING_TO_EXECUTE));
        };

        tracing::info!("executing step {}/{}: {}", index + 1, state.plan.len(), step);

        let request = [
            Message::system(self.system_prompt.clone()),
            Message::user(prompts::executor_request(&state.user_goal, step)),
        ];
        let explanation = self.llm.complete(&request).await?;

        let entry = prompts::log_entry(index + 1, step, &explanation);

        Ok(StateUpdate {
            messages: vec![Message::assistant(explanation).with_author(Author::Executor)],
            execution_log: vec![entry],
            current_step_index: Some(index + 1),
            status: Some(status::EXECUTING.to_string()),
            ..StateUpdate::default()
        })
    }
}

#[async_trait]
impl Agent for ExecutorAgent {
    fn author(&self) -> Author {
        Author::Executor
    }

    async fn act(&self, state: &AgentState) -> Result<StateUpdate, AgentError> {
        self.execute(state).await
    }
}
