//! 核心编排层：运行状态与合并、Supervisor 路由、回合循环、错误与过程事件

pub mod error;
pub mod events;
pub mod orchestrator;
pub mod state;
pub mod supervisor;

pub use error::{AgentError, OrchestratorError};
pub use events::OrchestratorEvent;
pub use orchestrator::Orchestrator;
pub use state::{status, AgentState, Author, Message, NextStep, Role, StateUpdate};
pub use supervisor::route;
