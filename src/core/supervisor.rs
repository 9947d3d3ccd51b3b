//! Supervisor：纯路由函数
//!
//! 根据最后一条消息的作者标签与执行进度决定下一位行动者，按顺序首个命中生效：
//! 1. 无消息或最后一条无作者标签 → Planner（首回合）
//! 2. 最后作者为 Planner → Executor
//! 3. 最后作者为 Executor：仍有剩余步骤 → Executor，否则 → Finish
//! 4. 无法识别的作者标签 → Finish（安全阀，不视为错误）

use crate::core::{AgentState, Author, NextStep};

/// 观察状态并给出路由决策；不修改状态
pub fn route(state: &AgentState) -> NextStep {
    let last_author = state.last_message().and_then(|m| m.author.as_ref());

    let next = match last_author {
        None => NextStep::Planner,
        Some(Author::Planner) => NextStep::Executor,
        Some(Author::Executor) if state.current_step_index < state.plan.len() => NextStep::Executor,
        Some(Author::Executor) => NextStep::Finish,
        Some(Author::Other(_)) => NextStep::Finish,
    };

    tracing::debug!(
        last = ?last_author.map(Author::as_str),
        plan_len = state.plan.len(),
        current_step_index = state.current_step_index,
        next_step = %next,
        "supervisor routed"
    );

    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Message;

    fn state_with(last: Option<Author>, plan_len: usize, index: usize) -> AgentState {
        let mut state = AgentState::new("goal");
        state.plan = (0..plan_len).map(|i| format!("step {i}")).collect();
        state.current_step_index = index;
        if let Some(author) = last {
            state.messages.push(Message::assistant("x").with_author(author));
        }
        state
    }

    #[test]
    fn test_empty_messages_routes_to_planner() {
        let mut state = AgentState::new("goal");
        state.messages.clear();
        assert_eq!(route(&state), NextStep::Planner);
    }

    #[test]
    fn test_untagged_last_message_routes_to_planner() {
        assert_eq!(route(&state_with(None, 0, 0)), NextStep::Planner);
    }

    #[test]
    fn test_after_planner_routes_to_executor() {
        assert_eq!(route(&state_with(Some(Author::Planner), 3, 0)), NextStep::Executor);
    }

    #[test]
    fn test_executor_loops_while_steps_remain() {
        assert_eq!(route(&state_with(Some(Author::Executor), 3, 1)), NextStep::Executor);
        assert_eq!(route(&state_with(Some(Author::Executor), 3, 2)), NextStep::Executor);
    }

    #[test]
    fn test_executor_finishes_when_plan_exhausted() {
        assert_eq!(route(&state_with(Some(Author::Executor), 3, 3)), NextStep::Finish);
    }

    #[test]
    fn test_unknown_author_finishes() {
        let state = state_with(Some(Author::Other("Reviewer".into())), 3, 0);
        assert_eq!(route(&state), NextStep::Finish);
    }

    #[test]
    fn test_route_does_not_mutate() {
        let state = state_with(Some(Author::Executor), 2, 1);
        let before = state.clone();
        let _ = route(&state);
        assert_eq!(state, before);
    }
}
