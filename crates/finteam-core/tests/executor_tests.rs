use finteam_core::llm::{ToolCall, Usage};
use finteam_core::tools::ToolContext;
use finteam_core::{
    dispatch_query, AgentDescriptor, AgentLoop, FinteamError, LlmClient, LlmExecutor, LlmResponse,
    Message, ModelProvider, ModelRegistry, ResponseChunk, ResponseStream, Role, StreamEvent,
    Target, Team, Tool, ToolDefinition, ToolRegistry, ToolResult,
};
use futures::channel::mpsc::{unbounded, UnboundedReceiver};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Mock LLM that plays back scripted turns in order. Streaming and
/// non-streaming calls draw from the same script.
struct MockLlm {
    turns: Mutex<Vec<Vec<StreamEvent>>>,
    seen: Mutex<Vec<(Vec<Message>, Vec<String>)>>,
}

impl MockLlm {
    fn new(turns: Vec<Vec<StreamEvent>>) -> Arc<Self> {
        Arc::new(Self {
            turns: Mutex::new(turns),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn next_turn(&self, messages: &[Message], tools: &[ToolDefinition]) -> Vec<StreamEvent> {
        self.seen.lock().unwrap().push((
            messages.to_vec(),
            tools.iter().map(|t| t.name.clone()).collect(),
        ));
        let mut turns = self.turns.lock().unwrap();
        if turns.is_empty() {
            vec![StreamEvent::Done]
        } else {
            turns.remove(0)
        }
    }

    fn calls(&self) -> Vec<(Vec<Message>, Vec<String>)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlm {
    fn model(&self) -> &str {
        "mock"
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse, FinteamError> {
        let mut content = String::new();
        let mut calls: Vec<ToolCall> = Vec::new();
        for event in self.next_turn(messages, tools) {
            match event {
                StreamEvent::TextDelta(text) => content.push_str(&text),
                StreamEvent::ToolCallStart { id, name } => calls.push(ToolCall::function(id, name, "")),
                StreamEvent::ToolCallDelta { arguments_delta, .. } => {
                    if let Some(call) = calls.last_mut() {
                        call.function.arguments.push_str(&arguments_delta);
                    }
                }
                StreamEvent::Error(e) => return Err(FinteamError::Llm(e)),
                _ => {}
            }
        }
        let message = if calls.is_empty() {
            Message::assistant(content)
        } else {
            Message::assistant_with_tools(content, calls)
        };
        Ok(LlmResponse {
            message,
            usage: Some(Usage {
                input_tokens: 10,
                output_tokens: 5,
            }),
        })
    }

    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<UnboundedReceiver<StreamEvent>, FinteamError> {
        let (tx, rx) = unbounded();
        for event in self.next_turn(messages, tools) {
            tx.unbounded_send(event).unwrap();
        }
        Ok(rx)
    }
}

/// Simple echo tool for testing.
struct EchoTool;

#[async_trait::async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes input"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": {"type": "string"}
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, params: Value) -> ToolResult {
        Ok(serde_json::json!({"echoed": params["text"]}))
    }
}

fn tool_call(id: &str, name: &str, args: &str) -> Vec<StreamEvent> {
    vec![
        StreamEvent::ToolCallStart {
            id: id.into(),
            name: name.into(),
        },
        StreamEvent::ToolCallDelta {
            id: id.into(),
            arguments_delta: args.into(),
        },
        StreamEvent::ToolCallEnd { id: id.into() },
        StreamEvent::Done,
    ]
}

fn text(parts: &[&str]) -> Vec<StreamEvent> {
    parts
        .iter()
        .map(|p| StreamEvent::TextDelta(p.to_string()))
        .chain([StreamEvent::Done])
        .collect()
}

fn offline_tools() -> ToolContext {
    ToolContext {
        http: reqwest::Client::new(),
        search_base_url: "http://127.0.0.1:9/html/".into(),
        finance_base_url: "http://127.0.0.1:9".into(),
        search_max_results: 5,
        news_max_results: 5,
    }
}

fn executor_with(llm: Arc<MockLlm>) -> (LlmExecutor, ModelRegistry) {
    let models = ModelRegistry::new().with_client(ModelProvider::OpenAI, llm);
    (LlmExecutor::new(models.clone(), offline_tools()), models)
}

#[tokio::test]
async fn test_single_agent_streams_text() {
    let llm = MockLlm::new(vec![text(&["Hello", " world"])]);
    let (executor, models) = executor_with(llm.clone());
    let agent = AgentDescriptor::builder("Web Agent")
        .instruction("Always include sources")
        .build(&models)
        .unwrap();

    let response = dispatch_query(&executor, &Target::Agent(agent), "test", true)
        .await
        .unwrap();
    let chunks = response.collect_chunks().await.unwrap();
    assert_eq!(
        chunks,
        vec![
            ResponseChunk::Content("Hello".into()),
            ResponseChunk::Content(" world".into()),
        ]
    );

    let calls = llm.calls();
    assert_eq!(calls.len(), 1);
    let (messages, _) = &calls[0];
    assert_eq!(messages[0].role, Role::System);
    assert!(messages[0].content.contains("You are Web Agent."));
    assert!(messages[0].content.contains("- Always include sources"));
    assert_eq!(messages.last().unwrap().content, "test");
}

#[tokio::test]
async fn test_non_stream_emits_one_chunk() {
    let llm = MockLlm::new(vec![text(&["Hello", " world"])]);
    let (executor, models) = executor_with(llm);
    let agent = AgentDescriptor::builder("Web Agent").build(&models).unwrap();

    let response = dispatch_query(&executor, &agent.into(), "test", false)
        .await
        .unwrap();
    let chunks = response.collect_chunks().await.unwrap();
    assert_eq!(chunks, vec![ResponseChunk::Content("Hello world".into())]);
}

#[tokio::test]
async fn test_agent_loop_tool_round_trip() {
    let llm = MockLlm::new(vec![
        tool_call("call_1", "echo", r#"{"text":"NVDA"}"#),
        text(&["Echo said NVDA"]),
    ]);
    let mut tools = ToolRegistry::new();
    tools.register(Box::new(EchoTool));
    let agent = AgentLoop::new("Echo Agent", llm.clone())
        .with_tools(tools)
        .with_show_tool_calls(true);

    let (sink, stream) = ResponseStream::channel();
    let run = agent.run("echo NVDA", &sink, true).await.unwrap();
    drop(sink);

    assert_eq!(run.content, "Echo said NVDA");
    assert_eq!(run.iterations, 2);
    assert_eq!(run.tool_calls.len(), 1);
    assert_eq!(run.tool_calls[0].tool_name, "echo");
    assert!(run.tool_calls[0].success);

    let chunks = stream.collect_chunks().await.unwrap();
    assert_eq!(
        chunks[0],
        ResponseChunk::ToolCall {
            agent: "Echo Agent".into(),
            tool: "echo".into(),
            arguments: r#"{"text":"NVDA"}"#.into(),
        }
    );

    let calls = llm.calls();
    assert_eq!(calls[0].1, vec!["echo".to_string()]);
    let tool_result = calls[1].0.last().unwrap();
    assert_eq!(tool_result.tool_call_id.as_deref(), Some("call_1"));
    assert!(tool_result.content.contains("\"echoed\": \"NVDA\""));
}

#[tokio::test]
async fn test_unknown_tool_is_reported_to_model() {
    let llm = MockLlm::new(vec![
        tool_call("call_1", "missing_tool", "{}"),
        text(&["done"]),
    ]);
    let agent = AgentLoop::new("Agent", llm.clone());

    let (sink, _stream) = ResponseStream::channel();
    let run = agent.run("go", &sink, true).await.unwrap();

    assert_eq!(run.content, "done");
    assert!(!run.tool_calls[0].success);
    let calls = llm.calls();
    assert!(calls[1].0.last().unwrap().content.contains("not found"));
}

#[tokio::test]
async fn test_team_transfers_to_member() {
    let llm = MockLlm::new(vec![
        // leader delegates
        tool_call(
            "call_1",
            "transfer_task_to_finance_agent",
            r#"{"task_description":"Get the NVDA price","expected_output":"A table"}"#,
        ),
        // member answers (non-streamed)
        text(&["| NVDA | 120.5 |"]),
        // leader summarizes
        text(&["Summary: ", "| NVDA | 120.5 |"]),
    ]);
    let (executor, models) = executor_with(llm.clone());

    let web = AgentDescriptor::builder("Web Agent").build(&models).unwrap();
    let finance = AgentDescriptor::builder("Finance Agent")
        .role("Get financial data")
        .show_tool_calls(true)
        .build(&models)
        .unwrap();
    let team = Team::builder()
        .members([web, finance])
        .show_tool_calls(true)
        .build(&models)
        .unwrap();

    let response = dispatch_query(&executor, &Target::Team(team), "How is NVDA?", true)
        .await
        .unwrap();
    let chunks = response.collect_chunks().await.unwrap();

    assert_eq!(
        chunks,
        vec![
            ResponseChunk::ToolCall {
                agent: "Agent Team".into(),
                tool: "transfer_task_to_finance_agent".into(),
                arguments: r#"{"task_description":"Get the NVDA price","expected_output":"A table"}"#
                    .into(),
            },
            ResponseChunk::Content("Summary: ".into()),
            ResponseChunk::Content("| NVDA | 120.5 |".into()),
        ]
    );

    let calls = llm.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(
        calls[0].1,
        vec![
            "transfer_task_to_web_agent".to_string(),
            "transfer_task_to_finance_agent".to_string()
        ]
    );

    let member_messages = &calls[1].0;
    assert!(member_messages[0].content.contains("You are Finance Agent."));
    let member_input = &member_messages.last().unwrap().content;
    assert!(member_input.starts_with("Get the NVDA price"));
    assert!(member_input.contains("Expected output: A table"));

    let handed_back = calls[2].0.last().unwrap();
    assert_eq!(handed_back.tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(handed_back.content, "| NVDA | 120.5 |");
}

#[tokio::test]
async fn test_max_iterations_surfaces_as_stream_error() {
    let llm = MockLlm::new(vec![
        tool_call("call_1", "echo", "{}"),
        tool_call("call_2", "echo", "{}"),
        tool_call("call_3", "echo", "{}"),
    ]);
    let models = ModelRegistry::new().with_client(ModelProvider::OpenAI, llm);
    let executor = LlmExecutor::new(models.clone(), offline_tools()).with_max_iterations(2);
    let agent = AgentDescriptor::builder("Loop Agent").build(&models).unwrap();

    let response = dispatch_query(&executor, &agent.into(), "spin", true)
        .await
        .unwrap();
    match response.collect_text().await {
        Err(FinteamError::MaxIterations { agent, limit }) => {
            assert_eq!(agent, "Loop Agent");
            assert_eq!(limit, 2);
        }
        other => panic!("expected max iterations, got {other:?}"),
    }
}

#[tokio::test]
async fn test_model_error_surfaces_as_stream_error() {
    let llm = MockLlm::new(vec![vec![StreamEvent::Error("rate limited".into())]]);
    let (executor, models) = executor_with(llm);
    let agent = AgentDescriptor::builder("Web Agent").build(&models).unwrap();

    let response = dispatch_query(&executor, &agent.into(), "test", true)
        .await
        .unwrap();
    let err = response.collect_text().await.unwrap_err();
    assert!(matches!(err, FinteamError::Llm(ref msg) if msg == "rate limited"));
}

#[tokio::test]
async fn test_cancelled_stream_stops_agent() {
    let llm = MockLlm::new(vec![text(&["never read"])]);
    let agent = AgentLoop::new("Agent", llm.clone());

    let (sink, mut stream) = ResponseStream::channel();
    stream.cancel();
    assert!(stream.is_cancelled());

    let err = agent.run("test", &sink, true).await.unwrap_err();
    assert!(matches!(err, FinteamError::Cancelled));
    assert!(llm.calls().is_empty());
}

#[test]
fn test_construct_team_handle() {
    use finteam_core::Executor;

    let (executor, models) = executor_with(MockLlm::new(Vec::new()));
    let team = Team::builder()
        .name("Research Desk")
        .member(AgentDescriptor::builder("Web Agent").build(&models).unwrap())
        .member(AgentDescriptor::builder("Finance Agent").build(&models).unwrap())
        .build(&models)
        .unwrap();

    let handle = executor.construct(&Target::Team(team)).unwrap();
    assert_eq!(handle.name(), "Research Desk");
    assert_eq!(handle.member_names(), vec!["Web Agent", "Finance Agent"]);
}
