use crate::agent::core::AgentLoop;
use crate::response::ChunkSink;
use crate::tools::{required_str, Tool, ToolResult};
use serde_json::Value;
use std::sync::Arc;

/// Leader-side tool that hands a task to one team member and returns the
/// member's answer.
pub struct TransferTaskTool {
    name: String,
    description: String,
    member: Arc<AgentLoop>,
    sink: ChunkSink,
}

impl TransferTaskTool {
    pub fn new(name: String, role: &str, member: Arc<AgentLoop>, sink: ChunkSink) -> Self {
        let description = if role.trim().is_empty() {
            format!("Transfer a task to {}.", member.name())
        } else {
            format!("Transfer a task to {}. Role: {}", member.name(), role.trim())
        };
        Self {
            name,
            description,
            member,
            sink: sink.tool_calls_only(),
        }
    }
}

#[async_trait::async_trait]
impl Tool for TransferTaskTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "task_description": {
                    "type": "string",
                    "description": "Self-contained description of the task"
                },
                "expected_output": {
                    "type": "string",
                    "description": "What the member should return"
                },
                "additional_information": {
                    "type": "string",
                    "description": "Context the member needs"
                }
            },
            "required": ["task_description"]
        })
    }

    async fn execute(&self, params: Value) -> ToolResult {
        let task = required_str(&params, &self.name, "task_description")?;

        let mut input = task.to_string();
        for (key, label) in [
            ("expected_output", "Expected output"),
            ("additional_information", "Additional information"),
        ] {
            if let Some(text) = params.get(key).and_then(|v| v.as_str()).filter(|t| !t.trim().is_empty()) {
                input.push_str(&format!("\n\n{label}: {}", text.trim()));
            }
        }

        tracing::debug!(member = self.member.name(), "transferring task");
        let run = self.member.run(&input, &self.sink, false).await?;
        Ok(Value::String(run.content))
    }
}
