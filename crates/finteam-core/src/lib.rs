pub mod error;
pub mod constants;
pub mod llm;
pub mod tools;
pub mod context;
pub mod config;
pub mod agent;
pub mod response;
pub mod presets;
pub mod assistant;

// Re-export key types
pub use error::{ConfigError, FinteamError};
pub use agent::{
    dispatch_query, AgentDescriptor, AgentLoop, Executor, LlmExecutor, Target, Team,
};
pub use llm::{LlmClient, LlmResponse, Message, ModelProvider, ModelRef, ModelRegistry, Role, StreamEvent};
pub use tools::{Capability, FinanceOptions, SearchOptions, Tool, ToolBinding, ToolDefinition, ToolRegistry, ToolResult};
pub use response::{ChunkSink, ResponseChunk, ResponseStream};
pub use config::{SecretSource, Settings};
pub use assistant::analyze;
