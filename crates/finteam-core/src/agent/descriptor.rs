use crate::error::{ConfigError, FinteamError};
use crate::llm::{ModelRef, ModelRegistry};
use crate::tools::ToolBinding;

/// Immutable configuration for one logical agent.
///
/// Built through [`AgentDescriptor::builder`]; the fields are read back
/// exactly as supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDescriptor {
    name: String,
    role: String,
    model: ModelRef,
    tools: Vec<ToolBinding>,
    instructions: Vec<String>,
    show_tool_calls: bool,
    markdown: bool,
}

impl AgentDescriptor {
    pub fn builder(name: impl Into<String>) -> AgentDescriptorBuilder {
        AgentDescriptorBuilder {
            name: name.into(),
            role: String::new(),
            model: ModelRef::default(),
            tools: Vec::new(),
            instructions: Vec::new(),
            show_tool_calls: false,
            markdown: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn model(&self) -> &ModelRef {
        &self.model
    }

    pub fn tools(&self) -> &[ToolBinding] {
        &self.tools
    }

    pub fn instructions(&self) -> &[String] {
        &self.instructions
    }

    pub fn show_tool_calls(&self) -> bool {
        self.show_tool_calls
    }

    pub fn markdown(&self) -> bool {
        self.markdown
    }

    /// Identifier-safe form of the name, used for transfer tool names.
    pub fn key(&self) -> String {
        name_key(&self.name)
    }
}

/// Builder for [`AgentDescriptor`]. Defaults: empty role, `openai:gpt-4o`,
/// no tools, no instructions, tool calls hidden, plain-text output.
#[derive(Debug, Clone)]
pub struct AgentDescriptorBuilder {
    name: String,
    role: String,
    model: ModelRef,
    tools: Vec<ToolBinding>,
    instructions: Vec<String>,
    show_tool_calls: bool,
    markdown: bool,
}

impl AgentDescriptorBuilder {
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn model(mut self, model: ModelRef) -> Self {
        self.model = model;
        self
    }

    pub fn tool(mut self, binding: ToolBinding) -> Self {
        self.tools.push(binding);
        self
    }

    pub fn tools(mut self, bindings: impl IntoIterator<Item = ToolBinding>) -> Self {
        self.tools.extend(bindings);
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instructions.push(instruction.into());
        self
    }

    pub fn instructions<I, S>(mut self, instructions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instructions
            .extend(instructions.into_iter().map(Into::into));
        self
    }

    pub fn show_tool_calls(mut self, show: bool) -> Self {
        self.show_tool_calls = show;
        self
    }

    pub fn markdown(mut self, markdown: bool) -> Self {
        self.markdown = markdown;
        self
    }

    pub fn build(self, models: &ModelRegistry) -> Result<AgentDescriptor, FinteamError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName.into());
        }
        models.check(&self.model)?;

        Ok(AgentDescriptor {
            name: self.name,
            role: self.role,
            model: self.model,
            tools: self.tools,
            instructions: self.instructions,
            show_tool_calls: self.show_tool_calls,
            markdown: self.markdown,
        })
    }
}

/// `"Web Agent"` -> `"web_agent"`.
pub(crate) fn name_key(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
