pub mod conversation;
pub mod runtime;
pub mod state;

pub use runtime::{AgentRuntime, RunContext};
