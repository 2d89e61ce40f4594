use crate::constants::limits::TOOL_LOG_PREVIEW;
use crate::context::ConversationHistory;
use crate::error::FinteamError;
use crate::llm::{LlmClient, StreamEvent, ToolCall, Usage};
use crate::response::{ChunkSink, ResponseChunk};
use crate::tools::{ToolDefinition, ToolRegistry};
use futures::StreamExt;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ToolExecution {
    pub tool_name: String,
    pub params: Value,
    pub success: bool,
    pub result_summary: String,
}

/// Outcome of one agent loop run.
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub content: String,
    pub tool_calls: Vec<ToolExecution>,
    pub iterations: usize,
    pub usage: Usage,
}

/// A ready-to-run agent: model client, tools, and system prompt.
///
/// Runs are independent; every call to [`AgentLoop::run`] starts from an
/// empty conversation.
pub struct AgentLoop {
    name: String,
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    system_prompt: String,
    max_iterations: usize,
    show_tool_calls: bool,
}

impl AgentLoop {
    pub fn new(name: impl Into<String>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            name: name.into(),
            llm,
            tools: ToolRegistry::new(),
            system_prompt: String::new(),
            max_iterations: crate::constants::defaults::MAX_ITERATIONS,
            show_tool_calls: false,
        }
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_show_tool_calls(mut self, show: bool) -> Self {
        self.show_tool_calls = show;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the model/tool loop until the model answers without tool calls.
    ///
    /// With `stream` set, answer text goes to `sink` as it arrives;
    /// otherwise the final answer is emitted as one chunk.
    pub async fn run(
        &self,
        input: &str,
        sink: &ChunkSink,
        stream: bool,
    ) -> Result<AgentRun, FinteamError> {
        let mut conversation = ConversationHistory::new().with_system_prompt(&self.system_prompt);
        conversation.add_user_message(input);

        let tool_definitions: Vec<ToolDefinition> = self.tools.definitions();
        let mut tool_executions = Vec::new();
        let mut usage = Usage::default();
        let mut iterations = 0;

        loop {
            if iterations >= self.max_iterations {
                return Err(FinteamError::MaxIterations {
                    agent: self.name.clone(),
                    limit: self.max_iterations,
                });
            }
            sink.check_open()?;

            iterations += 1;
            tracing::debug!(
                agent = %self.name,
                iteration = iterations,
                model = self.llm.model(),
                messages = conversation.len(),
                approx_tokens = conversation.estimate_tokens(),
                "calling model"
            );

            let messages = conversation.get_messages();
            let (content, tool_calls) = if stream {
                self.stream_turn(&messages, &tool_definitions, sink, &mut usage)
                    .await?
            } else {
                let response = self.llm.chat(&messages, &tool_definitions).await?;
                if let Some(u) = response.usage {
                    usage.input_tokens += u.input_tokens;
                    usage.output_tokens += u.output_tokens;
                }
                let calls = response.message.tool_calls.unwrap_or_default();
                (response.message.content, calls)
            };

            if tool_calls.is_empty() {
                if !stream && !content.is_empty() {
                    sink.emit(ResponseChunk::Content(content.clone()))?;
                }
                conversation.add_assistant_message(&content);
                tracing::debug!(agent = %self.name, iterations, ?usage, "agent finished");

                return Ok(AgentRun {
                    content,
                    tool_calls: tool_executions,
                    iterations,
                    usage,
                });
            }

            conversation.add_tool_calls(content, tool_calls.clone());

            for tool_call in &tool_calls {
                if self.show_tool_calls {
                    sink.emit(ResponseChunk::ToolCall {
                        agent: self.name.clone(),
                        tool: tool_call.function.name.clone(),
                        arguments: tool_call.function.arguments.clone(),
                    })?;
                }

                let (success, result_str) = self.execute_tool(tool_call).await;
                let summary = truncate_str(&result_str, TOOL_LOG_PREVIEW);
                tracing::debug!(agent = %self.name, tool = %tool_call.function.name, success, %summary, "tool finished");

                tool_executions.push(ToolExecution {
                    tool_name: tool_call.function.name.clone(),
                    params: tool_call.parse_arguments().unwrap_or(Value::Null),
                    success,
                    result_summary: summary,
                });
                conversation.add_tool_result(&tool_call.id, result_str);
            }
        }
    }

    /// One streamed model turn: forwards text deltas and reassembles tool calls.
    async fn stream_turn(
        &self,
        messages: &[crate::llm::Message],
        tool_definitions: &[ToolDefinition],
        sink: &ChunkSink,
        usage: &mut Usage,
    ) -> Result<(String, Vec<ToolCall>), FinteamError> {
        let mut events = self.llm.chat_stream(messages, tool_definitions).await?;

        let mut content = String::new();
        let mut tool_calls: Vec<ToolCall> = Vec::new();
        // id -> (name, arguments), in arrival order
        let mut pending: HashMap<String, (String, String)> = HashMap::new();
        let mut order: Vec<String> = Vec::new();

        while let Some(event) = events.next().await {
            match event {
                StreamEvent::TextDelta(delta) => {
                    content.push_str(&delta);
                    sink.emit(ResponseChunk::Content(delta))?;
                }
                StreamEvent::ToolCallStart { id, name } => {
                    if !pending.contains_key(&id) {
                        order.push(id.clone());
                    }
                    pending.insert(id, (name, String::new()));
                }
                StreamEvent::ToolCallDelta { id, arguments_delta } => {
                    if let Some((_, args)) = pending.get_mut(&id) {
                        args.push_str(&arguments_delta);
                    }
                }
                StreamEvent::ToolCallEnd { id } => {
                    if let Some((name, arguments)) = pending.remove(&id) {
                        tool_calls.push(ToolCall::function(id, name, arguments));
                    }
                }
                StreamEvent::Usage(u) => {
                    usage.input_tokens += u.input_tokens;
                    usage.output_tokens += u.output_tokens;
                }
                StreamEvent::Done => break,
                StreamEvent::Error(err) => return Err(FinteamError::Llm(err)),
            }
        }

        // Calls the stream never closed explicitly
        for id in order {
            if let Some((name, arguments)) = pending.remove(&id) {
                tool_calls.push(ToolCall::function(id, name, arguments));
            }
        }

        Ok((content, tool_calls))
    }

    async fn execute_tool(&self, tool_call: &ToolCall) -> (bool, String) {
        let tool_name = &tool_call.function.name;

        let params = match tool_call.parse_arguments() {
            Ok(p) => p,
            Err(e) => {
                return (false, format!("Failed to parse tool arguments: {e}"));
            }
        };

        let Some(tool) = self.tools.get(tool_name) else {
            return (false, format!("Tool '{tool_name}' not found"));
        };

        match tool.execute(params).await {
            Ok(Value::String(text)) => (true, text),
            Ok(value) => {
                let result_str =
                    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
                (true, result_str)
            }
            Err(e) => (false, format!("Error: {e}")),
        }
    }
}

fn truncate_str(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
