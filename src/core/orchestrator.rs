//! Orchestrator：回合循环 / 状态机驱动
//!
//! 由目标初始化 AgentState，然后反复：Supervisor 路由 → 记录 next_step → Finish 则返回最终状态，
//! 否则调用对应 Agent，把其局部更新合并进状态（可选写检查点），进入下一回合。
//!
//! 单一控制流：同一时刻只有一个回合在执行，状态只在这里被修改。
//! Planner 总会产出非空计划、Executor 每次恰好推进一步，因此循环最多 len(plan) + 2 次决策后结束。
//! 生成能力失败直接向调用方传播，不重试、不回滚。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::agents::{Agent, ExecutorAgent, PlannerAgent, Prompts};
use crate::checkpoint::CheckpointStore;
use crate::core::{
    supervisor, AgentState, Author, NextStep, OrchestratorError, OrchestratorEvent, StateUpdate,
};
use crate::llm::LlmClient;

/// 回合循环驱动器；每次 run / resume 拥有独立的 AgentState
pub struct Orchestrator {
    planner: Box<dyn Agent>,
    executor: Box<dyn Agent>,
    checkpoint: Option<Arc<dyn CheckpointStore>>,
    event_tx: Option<mpsc::UnboundedSender<OrchestratorEvent>>,
    turn_timeout: Option<Duration>,
    max_turns: Option<usize>,
}

impl Orchestrator {
    /// 使用默认提示词的 Planner / Executor，共享同一个 LLM
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self::with_prompts(llm, &Prompts::default())
    }

    pub fn with_prompts(llm: Arc<dyn LlmClient>, prompts: &Prompts) -> Self {
        Self::from_agents(
            PlannerAgent::with_prompts(llm.clone(), prompts),
            ExecutorAgent::with_prompts(llm, prompts),
        )
    }

    /// 自定义两个 Agent（测试或替换实现时使用）
    pub fn from_agents(planner: impl Agent + 'static, executor: impl Agent + 'static) -> Self {
        Self {
            planner: Box::new(planner),
            executor: Box::new(executor),
            checkpoint: None,
            event_tx: None,
            turn_timeout: None,
            max_turns: None,
        }
    }

    /// 每次合并后把状态快照写入检查点存储
    pub fn with_checkpoint_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoint = Some(store);
        self
    }

    /// 推送过程事件（发送失败忽略）
    pub fn with_event_tx(mut self, tx: mpsc::UnboundedSender<OrchestratorEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// 单个 Agent 回合的超时；超时为致命错误
    pub fn with_turn_timeout(mut self, limit: Duration) -> Self {
        self.turn_timeout = Some(limit);
        self
    }

    /// Supervisor 决策次数上限；超出为致命错误
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    /// 以新生成的 run id 运行一个目标
    pub async fn run(&self, goal: &str) -> Result<AgentState, OrchestratorError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        self.run_with_id(&run_id, goal).await
    }

    /// 以指定 run id 运行（检查点以此为键）
    pub async fn run_with_id(
        &self,
        run_id: &str,
        goal: &str,
    ) -> Result<AgentState, OrchestratorError> {
        tracing::info!(run_id, goal, "run started");
        let state = AgentState::new(goal);
        self.save_checkpoint(run_id, &state, 0).await?;
        self.drive(run_id, state).await
    }

    /// 从最近一次检查点继续；已结束的运行会直接返回其最终状态
    pub async fn resume(&self, run_id: &str) -> Result<AgentState, OrchestratorError> {
        let Some(store) = &self.checkpoint else {
            return Err(OrchestratorError::RunNotFound(run_id.to_string()));
        };
        let state = store
            .load(run_id)
            .await?
            .ok_or_else(|| OrchestratorError::RunNotFound(run_id.to_string()))?;

        tracing::info!(
            run_id,
            current_step_index = state.current_step_index,
            plan_len = state.plan.len(),
            status = %state.status,
            "resuming run"
        );
        self.drive(run_id, state).await
    }

    async fn drive(
        &self,
        run_id: &str,
        mut state: AgentState,
    ) -> Result<AgentState, OrchestratorError> {
        let mut turn = 0;

        loop {
            if let Some(max) = self.max_turns {
                if turn >= max {
                    return Err(OrchestratorError::TurnLimitExceeded(max));
                }
            }
            turn += 1;

            let decision = supervisor::route(&state);
            state.next_step = Some(decision);
            self.emit(OrchestratorEvent::Routed {
                turn,
                next_step: decision,
            });

            let agent = match decision {
                NextStep::Finish => {
                    self.save_checkpoint(run_id, &state, turn).await?;
                    tracing::info!(
                        run_id,
                        turns = turn,
                        steps = state.execution_log.len(),
                        status = %state.status,
                        "run finished"
                    );
                    self.emit(OrchestratorEvent::Finished {
                        status: state.status.clone(),
                    });
                    return Ok(state);
                }
                NextStep::Planner => self.planner.as_ref(),
                NextStep::Executor => self.executor.as_ref(),
            };

            let update = self.invoke(agent, &state, turn).await?;
            let produced_message = !update.messages.is_empty();
            state.merge(update);
            debug_assert!(state.current_step_index <= state.plan.len());

            match agent.author() {
                Author::Planner => self.emit(OrchestratorEvent::PlanReady {
                    steps: state.plan.clone(),
                }),
                Author::Executor if produced_message => {
                    self.emit(OrchestratorEvent::StepExecuted {
                        index: state.current_step_index,
                        total: state.plan.len(),
                    })
                }
                Author::Executor => self.emit(OrchestratorEvent::NothingToExecute),
                Author::Other(_) => {}
            }

            self.save_checkpoint(run_id, &state, turn).await?;
        }
    }

    async fn invoke(
        &self,
        agent: &dyn Agent,
        state: &AgentState,
        turn: usize,
    ) -> Result<StateUpdate, OrchestratorError> {
        let result = match self.turn_timeout {
            Some(limit) => tokio::time::timeout(limit, agent.act(state))
                .await
                .map_err(|_| OrchestratorError::TurnTimeout {
                    turn,
                    agent: agent.author(),
                    limit,
                })?,
            None => agent.act(state).await,
        };

        result.map_err(|source| {
            tracing::error!(turn, agent = %agent.author(), error = %source, "agent turn failed");
            OrchestratorError::Agent {
                agent: agent.author(),
                source,
            }
        })
    }

    async fn save_checkpoint(
        &self,
        run_id: &str,
        state: &AgentState,
        turn: usize,
    ) -> Result<(), OrchestratorError> {
        if let Some(store) = &self.checkpoint {
            store.save(run_id, state).await?;
            self.emit(OrchestratorEvent::Checkpointed {
                run_id: run_id.to_string(),
                turn,
            });
        }
        Ok(())
    }

    fn emit(&self, event: OrchestratorEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::checkpoint::{CheckpointError, MemoryCheckpointStore};
    use crate::core::{AgentError, Message};
    use crate::llm::{LlmError, MockLlmClient, ScriptedLlmClient};

    fn monitoring_llm() -> Arc<ScriptedLlmClient> {
        Arc::new(
            ScriptedLlmClient::new(["1. Install agent\n2. Configure dashboards"]).with_default("Done."),
        )
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<OrchestratorEvent>) -> Vec<OrchestratorEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    #[tokio::test]
    async fn test_end_to_end_monitoring_goal() {
        let llm = monitoring_llm();
        let orchestrator = Orchestrator::new(llm.clone());

        let state = orchestrator.run("Set up monitoring").await.unwrap();

        assert_eq!(state.plan, vec!["Install agent", "Configure dashboards"]);
        assert_eq!(state.current_step_index, 2);
        assert_eq!(state.execution_log.len(), 2);
        assert_eq!(state.execution_log[0], "Step 1: Install agent\nDone.");
        assert_eq!(state.execution_log[1], "Step 2: Configure dashboards\nDone.");
        assert_eq!(state.status, "executing");
        assert_eq!(state.next_step, Some(NextStep::Finish));
        assert_eq!(supervisor::route(&state), NextStep::Finish);
        // goal + planner + 2 executor messages
        assert_eq!(state.messages.len(), 4);
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn test_decision_count_is_plan_len_plus_two() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let orchestrator = Orchestrator::new(monitoring_llm()).with_event_tx(tx);

        let state = orchestrator.run("Set up monitoring").await.unwrap();

        let decisions: Vec<NextStep> = drain(&mut rx)
            .into_iter()
            .filter_map(|ev| match ev {
                OrchestratorEvent::Routed { next_step, .. } => Some(next_step),
                _ => None,
            })
            .collect();
        assert_eq!(decisions.len(), state.plan.len() + 2);
        assert_eq!(
            decisions,
            vec![
                NextStep::Planner,
                NextStep::Executor,
                NextStep::Executor,
                NextStep::Finish
            ]
        );
    }

    #[tokio::test]
    async fn test_events_sequence() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let orchestrator = Orchestrator::new(monitoring_llm()).with_event_tx(tx);

        orchestrator.run("Set up monitoring").await.unwrap();

        let events = drain(&mut rx);
        assert!(events.contains(&OrchestratorEvent::PlanReady {
            steps: vec!["Install agent".into(), "Configure dashboards".into()]
        }));
        assert!(events.contains(&OrchestratorEvent::StepExecuted { index: 1, total: 2 }));
        assert!(events.contains(&OrchestratorEvent::StepExecuted { index: 2, total: 2 }));
        assert_eq!(
            events.last(),
            Some(&OrchestratorEvent::Finished {
                status: "executing".into()
            })
        );
    }

    #[tokio::test]
    async fn test_unparseable_plan_still_terminates() {
        let llm = Arc::new(ScriptedLlmClient::new(["\n\n"]).with_default("ok"));
        let orchestrator = Orchestrator::new(llm.clone());

        let state = orchestrator.run("anything").await.unwrap();

        assert_eq!(state.plan.len(), 4);
        assert_eq!(state.current_step_index, 4);
        assert_eq!(state.execution_log.len(), 4);
        assert_eq!(llm.call_count(), 5);
    }

    #[tokio::test]
    async fn test_mock_llm_full_run() {
        let state = Orchestrator::new(Arc::new(MockLlmClient))
            .run("Write docs")
            .await
            .unwrap();

        assert_eq!(state.plan.len(), 4);
        assert_eq!(state.execution_log.len(), state.current_step_index);
        assert_eq!(state.current_step_index, state.plan.len());
    }

    #[tokio::test]
    async fn test_generation_failure_is_fatal() {
        let llm = Arc::new(
            ScriptedLlmClient::new(["1. a\n2. b"]).then_fail(LlmError::ApiError("unreachable".into())),
        );
        let orchestrator = Orchestrator::new(llm.clone());

        let err = orchestrator.run("goal").await.unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::Agent {
                agent: Author::Executor,
                ..
            }
        ));
        assert_eq!(err.llm_error(), Some(&LlmError::ApiError("unreachable".into())));
        // no retry
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_checkpoint_after_each_merge() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let orchestrator = Orchestrator::new(monitoring_llm())
            .with_checkpoint_store(store.clone())
            .with_event_tx(tx);

        let state = orchestrator.run_with_id("run-1", "Set up monitoring").await.unwrap();

        assert_eq!(store.load("run-1").await.unwrap(), Some(state));
        let checkpoints = drain(&mut rx)
            .into_iter()
            .filter(|ev| matches!(ev, OrchestratorEvent::Checkpointed { .. }))
            .count();
        // initial + planner + 2 executor + final
        assert_eq!(checkpoints, 5);
    }

    /// 记录每一次保存的快照
    #[derive(Default)]
    struct RecordingStore {
        saved: tokio::sync::Mutex<Vec<AgentState>>,
    }

    #[async_trait]
    impl CheckpointStore for RecordingStore {
        async fn save(&self, _run_id: &str, state: &AgentState) -> Result<(), CheckpointError> {
            self.saved.lock().await.push(state.clone());
            Ok(())
        }

        async fn load(&self, _run_id: &str) -> Result<Option<AgentState>, CheckpointError> {
            Ok(self.saved.lock().await.last().cloned())
        }
    }

    #[tokio::test]
    async fn test_each_executor_turn_adds_one_log_entry() {
        let llm = Arc::new(ScriptedLlmClient::new(["1. a\n2. b\n3. c"]).with_default("same"));
        let store = Arc::new(RecordingStore::default());
        let orchestrator = Orchestrator::new(llm).with_checkpoint_store(store.clone());

        let state = orchestrator.run_with_id("run", "goal").await.unwrap();

        let saved = store.saved.lock().await;
        // initial, planner, 3 executor turns, final
        assert_eq!(saved.len(), 6);
        for pair in saved[1..5].windows(2) {
            assert_eq!(pair[1].execution_log.len(), pair[0].execution_log.len() + 1);
            assert_eq!(pair[1].execution_log[..pair[0].execution_log.len()], pair[0].execution_log[..]);
        }
        assert_eq!(state.execution_log.len(), 3);
    }

    #[tokio::test]
    async fn test_resume_after_failure() {
        let store = Arc::new(MemoryCheckpointStore::new());

        let failing = Arc::new(
            ScriptedLlmClient::new(["1. a\n2. b", "did a"]).then_fail(LlmError::Timeout(1)),
        );
        let first = Orchestrator::new(failing).with_checkpoint_store(store.clone());
        assert!(first.run_with_id("run-2", "goal").await.is_err());

        let saved = store.load("run-2").await.unwrap().unwrap();
        assert_eq!(saved.current_step_index, 1);

        let healthy = Arc::new(ScriptedLlmClient::new(["did b"]));
        let second = Orchestrator::new(healthy.clone()).with_checkpoint_store(store.clone());
        let state = second.resume("run-2").await.unwrap();

        assert_eq!(state.plan, vec!["a", "b"]);
        assert_eq!(state.execution_log, vec!["Step 1: a\ndid a", "Step 2: b\ndid b"]);
        assert_eq!(state.current_step_index, 2);
        assert_eq!(healthy.call_count(), 1);
    }

    #[tokio::test]
    async fn test_resume_finished_run_returns_immediately() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let orchestrator = Orchestrator::new(monitoring_llm()).with_checkpoint_store(store.clone());
        let finished = orchestrator.run_with_id("done", "Set up monitoring").await.unwrap();

        let idle = Arc::new(ScriptedLlmClient::new(Vec::<String>::new()));
        let resumed = Orchestrator::new(idle.clone())
            .with_checkpoint_store(store)
            .resume("done")
            .await
            .unwrap();

        assert_eq!(resumed, finished);
        assert_eq!(idle.call_count(), 0);
    }

    #[tokio::test]
    async fn test_resume_unknown_run() {
        let orchestrator = Orchestrator::new(Arc::new(MockLlmClient))
            .with_checkpoint_store(Arc::new(MemoryCheckpointStore::new()));
        let err = orchestrator.resume("missing").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::RunNotFound(id) if id == "missing"));

        let err = Orchestrator::new(Arc::new(MockLlmClient)).resume("x").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::RunNotFound(_)));
    }

    #[tokio::test]
    async fn test_max_turns_limit() {
        let orchestrator = Orchestrator::new(monitoring_llm()).with_max_turns(3);
        let err = orchestrator.run("Set up monitoring").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::TurnLimitExceeded(3)));

        let orchestrator = Orchestrator::new(monitoring_llm()).with_max_turns(4);
        assert!(orchestrator.run("Set up monitoring").await.is_ok());
    }

    struct SlowPlanner;

    #[async_trait]
    impl Agent for SlowPlanner {
        fn author(&self) -> Author {
            Author::Planner
        }

        async fn act(&self, _state: &AgentState) -> Result<StateUpdate, AgentError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(StateUpdate::default())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_turn_timeout_is_fatal() {
        let orchestrator = Orchestrator::from_agents(
            SlowPlanner,
            ExecutorAgent::new(Arc::new(MockLlmClient)),
        )
        .with_turn_timeout(Duration::from_secs(5));

        let err = orchestrator.run("goal").await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::TurnTimeout {
                turn: 1,
                agent: Author::Planner,
                limit
            } if limit == Duration::from_secs(5)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sub_second_turn_timeout_is_reported_exactly() {
        let orchestrator = Orchestrator::from_agents(
            SlowPlanner,
            ExecutorAgent::new(Arc::new(MockLlmClient)),
        )
        .with_turn_timeout(Duration::from_millis(250));

        let err = orchestrator.run("goal").await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::TurnTimeout { limit, .. } if limit == Duration::from_millis(250)
        ));
        assert_eq!(err.to_string(), "Turn 1 (Planner) timed out after 250ms");
    }

    /// 把作者标签写成 Planner / Executor 以外的值
    struct RogueAgent;

    #[async_trait]
    impl Agent for RogueAgent {
        fn author(&self) -> Author {
            Author::Other("Rogue".into())
        }

        async fn act(&self, _state: &AgentState) -> Result<StateUpdate, AgentError> {
            Ok(StateUpdate {
                messages: vec![Message::assistant("??").with_author(Author::Other("Rogue".into()))],
                status: Some("rogue".into()),
                ..StateUpdate::default()
            })
        }
    }

    #[tokio::test]
    async fn test_unrecognized_author_finishes_run() {
        let orchestrator =
            Orchestrator::from_agents(RogueAgent, ExecutorAgent::new(Arc::new(MockLlmClient)));

        let state = orchestrator.run("goal").await.unwrap();

        assert_eq!(state.status, "rogue");
        assert_eq!(state.next_step, Some(NextStep::Finish));
        assert!(state.plan.is_empty());
    }
}
