mod core;
mod descriptor;
mod executor;
mod prompt;
mod team;
mod transfer;

pub use core::{AgentLoop, AgentRun, ToolExecution};
pub use descriptor::{AgentDescriptor, AgentDescriptorBuilder};
pub use executor::{dispatch_query, AgentHandle, Executor, LlmExecutor};
pub use prompt::{transfer_tool_names, SystemPromptBuilder};
pub use team::{Target, Team, TeamBuilder};
pub use transfer::TransferTaskTool;
