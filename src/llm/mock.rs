//! Mock LLM 客户端（用于测试与无 API Key 的本地运行）
//!
//! - MockLlmClient：确定性输出。规划请求返回编号步骤列表，执行请求返回固定描述。
//! - ScriptedLlmClient：按顺序返回预设响应（可含错误），并记录每次请求，便于断言。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::{Message, Role};
use crate::llm::{LlmClient, LlmError};

/// 执行类请求中携带步骤文本的前缀（与 ExecutorAgent 的 user 消息格式一致）
const STEP_MARKER: &str = "Current step:";

fn last_user(messages: &[Message]) -> &str {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or("(no input)")
}

/// Mock 客户端：无需网络即可跑通 Planner → Executor 全流程
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let input = last_user(messages);

        if let Some(idx) = input.find(STEP_MARKER) {
            let step = input[idx + STEP_MARKER.len()..].trim();
            return Ok(format!(
                "Mock execution of \"{}\": break the step into small actions, run them in order, and check the result before moving on.",
                step
            ));
        }

        let goal = input
            .lines()
            .next()
            .unwrap_or(input)
            .trim_start_matches("User goal:")
            .trim();
        Ok(format!(
            "1. Clarify the scope of: {goal}\n2. Prepare the environment\n3. Carry out the core work\n4. Verify the outcome"
        ))
    }
}

/// 脚本化客户端：依次弹出预设响应；脚本耗尽后返回 default（未设置则报错）
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    default: Option<String>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlmClient {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            default: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 脚本耗尽后的固定响应
    pub fn with_default(mut self, text: impl Into<String>) -> Self {
        self.default = Some(text.into());
        self
    }

    /// 追加一个失败响应
    pub fn then_fail(self, err: LlmError) -> Self {
        self.lock_responses().push_back(Err(err));
        self
    }

    /// 已收到的全部请求（按调用顺序）
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, LlmError>>> {
        self.responses.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(messages.to_vec());

        match self.lock_responses().pop_front() {
            Some(response) => response,
            None => self
                .default
                .clone()
                .ok_or_else(|| LlmError::ApiError("scripted responses exhausted".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_plans_then_describes_steps() {
        let llm = MockLlmClient;

        let plan = llm
            .complete(&[
                Message::system("plan"),
                Message::user("User goal: Ship it\n\nRespond with 4-8 steps as a numbered list."),
            ])
            .await
            .unwrap();
        assert!(plan.starts_with("1. Clarify the scope of: Ship it"));
        assert_eq!(plan.lines().count(), 4);

        let step = llm
            .complete(&[
                Message::system("execute"),
                Message::user("Overall user goal: Ship it\nCurrent step: Prepare the environment"),
            ])
            .await
            .unwrap();
        assert!(step.contains("\"Prepare the environment\""));
    }

    #[tokio::test]
    async fn test_scripted_pops_in_order_and_records() {
        let llm = ScriptedLlmClient::new(["first", "second"]).with_default("rest");

        assert_eq!(llm.complete(&[Message::user("a")]).await.unwrap(), "first");
        assert_eq!(llm.complete(&[Message::user("b")]).await.unwrap(), "second");
        assert_eq!(llm.complete(&[Message::user("c")]).await.unwrap(), "rest");

        let requests = llm.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1][0].content, "b");
    }

    #[tokio::test]
    async fn test_scripted_failure_and_exhaustion() {
        let llm = ScriptedLlmClient::new(Vec::<String>::new())
            .then_fail(LlmError::ApiError("boom".into()));

        let err = llm.complete(&[]).await.unwrap_err();
        assert_eq!(err, LlmError::ApiError("boom".into()));

        let err = llm.complete(&[]).await.unwrap_err();
        assert!(matches!(err, LlmError::ApiError(msg) if msg.contains("exhausted")));
        assert_eq!(llm.call_count(), 2);
    }
}
