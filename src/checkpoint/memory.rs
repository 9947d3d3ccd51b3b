//! 内存检查点存储

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::checkpoint::{CheckpointError, CheckpointStore};
use crate::core::AgentState;

#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    states: RwLock<HashMap<String, AgentState>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn save(&self, run_id: &str, state: &AgentState) -> Result<(), CheckpointError> {
        self.states
            .write()
            .await
            .insert(run_id.to_string(), state.clone());
        Ok(())
    }

    async fn load(&self, run_id: &str) -> Result<Option<AgentState>, CheckpointError> {
        Ok(self.states.read().await.get(run_id).cloned())
    }
}
