//! Runtime for executing tool-use turn loops
//!
//! The engine streams one model request per iteration, runs any requested
//! tools in declaration order and feeds their results back until the model
//! answers without calling a tool.

mod engine;
mod event;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use engine::{LoopConfig, TurnLoop};
pub use event::AgentEvent;
pub use traits::*;

use std::sync::Arc;

/// Turn loop over type-erased collaborators, as shared by the HTTP layer
pub type SharedLoop = TurnLoop<Arc<dyn LlmClient>, Arc<dyn ToolExecutor>>;
