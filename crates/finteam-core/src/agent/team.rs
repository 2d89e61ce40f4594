use crate::agent::AgentDescriptor;
use crate::constants::defaults;
use crate::error::{ConfigError, FinteamError};
use crate::llm::{ModelRef, ModelRegistry};
use std::collections::HashSet;

/// An agent-like configuration whose capabilities are its members.
/// The instructions govern the merged answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    name: String,
    role: String,
    model: ModelRef,
    members: Vec<AgentDescriptor>,
    instructions: Vec<String>,
    show_tool_calls: bool,
    markdown: bool,
}

impl Team {
    pub fn builder() -> TeamBuilder {
        TeamBuilder {
            name: defaults::TEAM_NAME.to_string(),
            role: String::new(),
            model: ModelRef::default(),
            members: Vec::new(),
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

    pub fn members(&self) -> &[AgentDescriptor] {
        &self.members
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
}

#[derive(Debug, Clone)]
pub struct TeamBuilder {
    name: String,
    role: String,
    model: ModelRef,
    members: Vec<AgentDescriptor>,
    instructions: Vec<String>,
    show_tool_calls: bool,
    markdown: bool,
}

impl TeamBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn model(mut self, model: ModelRef) -> Self {
        self.model = model;
        self
    }

    pub fn member(mut self, member: AgentDescriptor) -> Self {
        self.members.push(member);
        self
    }

    pub fn members(mut self, members: impl IntoIterator<Item = AgentDescriptor>) -> Self {
        self.members.extend(members);
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

    pub fn build(self, models: &ModelRegistry) -> Result<Team, FinteamError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName.into());
        }
        if self.members.is_empty() {
            return Err(ConfigError::EmptyTeam.into());
        }

        let mut seen = HashSet::new();
        for member in &self.members {
            if !seen.insert(member.name()) {
                return Err(ConfigError::DuplicateMember(member.name().to_string()).into());
            }
        }

        models.check(&self.model)?;

        Ok(Team {
            name: self.name,
            role: self.role,
            model: self.model,
            members: self.members,
            instructions: self.instructions,
            show_tool_calls: self.show_tool_calls,
            markdown: self.markdown,
        })
    }
}

/// Anything the execution collaborator can run a query against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Agent(AgentDescriptor),
    Team(Team),
}

impl Target {
    pub fn name(&self) -> &str {
        match self {
            Self::Agent(agent) => agent.name(),
            Self::Team(team) => team.name(),
        }
    }

    pub fn model(&self) -> &ModelRef {
        match self {
            Self::Agent(agent) => agent.model(),
            Self::Team(team) => team.model(),
        }
    }

    pub fn instructions(&self) -> &[String] {
        match self {
            Self::Agent(agent) => agent.instructions(),
            Self::Team(team) => team.instructions(),
        }
    }
}

impl From<AgentDescriptor> for Target {
    fn from(agent: AgentDescriptor) -> Self {
        Self::Agent(agent)
    }
}

impl From<Team> for Target {
    fn from(team: Team) -> Self {
        Self::Team(team)
    }
}
