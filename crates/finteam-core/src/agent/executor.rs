use crate::agent::core::AgentLoop;
use crate::agent::prompt::{transfer_tool_names, SystemPromptBuilder};
use crate::agent::transfer::TransferTaskTool;
use crate::agent::{AgentDescriptor, Target, Team};
use crate::config::Settings;
use crate::error::FinteamError;
use crate::llm::{LlmClient, ModelRegistry};
use crate::response::{ChunkSink, ResponseStream};
use crate::tools::{registry_for, ToolContext, ToolRegistry};
use std::sync::Arc;
use tracing::Instrument;

/// The execution collaborator: turns a configuration into something
/// runnable, then runs queries against it.
#[async_trait::async_trait]
pub trait Executor: Send + Sync {
    type Handle: Send + Sync;

    fn construct(&self, target: &Target) -> Result<Self::Handle, FinteamError>;

    async fn dispatch(
        &self,
        handle: &Self::Handle,
        query: &str,
        stream: bool,
    ) -> Result<ResponseStream, FinteamError>;
}

/// Constructs `target` and dispatches one query to it.
pub async fn dispatch_query<E: Executor>(
    executor: &E,
    target: &Target,
    query: &str,
    stream: bool,
) -> Result<ResponseStream, FinteamError> {
    let handle = executor.construct(target)?;
    executor.dispatch(&handle, query, stream).await
}

/// Runnable form of a [`Target`].
pub struct AgentHandle {
    name: String,
    plan: Plan,
}

enum Plan {
    Single(Arc<AgentLoop>),
    Team {
        llm: Arc<dyn LlmClient>,
        system_prompt: String,
        show_tool_calls: bool,
        members: Vec<TeamMember>,
    },
}

struct TeamMember {
    transfer_tool: String,
    role: String,
    agent: Arc<AgentLoop>,
}

impl AgentHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn member_names(&self) -> Vec<&str> {
        match &self.plan {
            Plan::Single(_) => Vec::new(),
            Plan::Team { members, .. } => members.iter().map(|m| m.agent.name()).collect(),
        }
    }
}

/// Default executor: model calls through [`ModelRegistry`], tools over HTTP.
pub struct LlmExecutor {
    models: ModelRegistry,
    tools: ToolContext,
    max_iterations: usize,
}

impl LlmExecutor {
    pub fn new(models: ModelRegistry, tools: ToolContext) -> Self {
        Self {
            models,
            tools,
            max_iterations: crate::constants::defaults::MAX_ITERATIONS,
        }
    }

    pub fn from_settings(settings: &Settings, models: ModelRegistry) -> Result<Self, FinteamError> {
        Ok(Self::new(models, ToolContext::from_settings(settings)?)
            .with_max_iterations(settings.agent.max_iterations))
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    fn build_agent(&self, agent: &AgentDescriptor) -> Result<AgentLoop, FinteamError> {
        let llm = self.models.resolve(agent.model())?;
        Ok(AgentLoop::new(agent.name(), llm)
            .with_tools(registry_for(agent.tools(), &self.tools))
            .with_system_prompt(SystemPromptBuilder::for_agent(agent).build())
            .with_max_iterations(self.max_iterations)
            .with_show_tool_calls(agent.show_tool_calls()))
    }

    fn build_team(&self, team: &Team) -> Result<Plan, FinteamError> {
        let llm = self.models.resolve(team.model())?;
        let members = team
            .members()
            .iter()
            .zip(transfer_tool_names(team.members()))
            .map(|(member, transfer_tool)| {
                Ok(TeamMember {
                    transfer_tool,
                    role: member.role().to_string(),
                    agent: Arc::new(self.build_agent(member)?),
                })
            })
            .collect::<Result<Vec<_>, FinteamError>>()?;

        Ok(Plan::Team {
            llm,
            system_prompt: SystemPromptBuilder::for_team(team).build(),
            show_tool_calls: team.show_tool_calls(),
            members,
        })
    }

    /// Team leaders get their transfer tools per dispatch, bound to that
    /// dispatch's sink.
    fn root_for(&self, handle: &AgentHandle, sink: &ChunkSink) -> Arc<AgentLoop> {
        match &handle.plan {
            Plan::Single(agent) => agent.clone(),
            Plan::Team {
                llm,
                system_prompt,
                show_tool_calls,
                members,
            } => {
                let mut tools = ToolRegistry::new();
                for member in members {
                    tools.register(Box::new(TransferTaskTool::new(
                        member.transfer_tool.clone(),
                        &member.role,
                        member.agent.clone(),
                        sink.clone(),
                    )));
                }
                Arc::new(
                    AgentLoop::new(handle.name.clone(), llm.clone())
                        .with_tools(tools)
                        .with_system_prompt(system_prompt.clone())
                        .with_max_iterations(self.max_iterations)
                        .with_show_tool_calls(*show_tool_calls),
                )
            }
        }
    }
}

#[async_trait::async_trait]
impl Executor for LlmExecutor {
    type Handle = AgentHandle;

    fn construct(&self, target: &Target) -> Result<AgentHandle, FinteamError> {
        let plan = match target {
            Target::Agent(agent) => Plan::Single(Arc::new(self.build_agent(agent)?)),
            Target::Team(team) => self.build_team(team)?,
        };
        Ok(AgentHandle {
            name: target.name().to_string(),
            plan,
        })
    }

    async fn dispatch(
        &self,
        handle: &AgentHandle,
        query: &str,
        stream: bool,
    ) -> Result<ResponseStream, FinteamError> {
        let (sink, response) = ResponseStream::channel();
        let root = self.root_for(handle, &sink);
        let query = query.to_string();

        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("dispatch", %run_id, target = %handle.name);
        tracing::info!(parent: &span, stream, "dispatching query");

        tokio::spawn(
            async move {
                match root.run(&query, &sink, stream).await {
                    Ok(run) => {
                        tracing::info!(
                            iterations = run.iterations,
                            tool_calls = run.tool_calls.len(),
                            input_tokens = run.usage.input_tokens,
                            output_tokens = run.usage.output_tokens,
                            "run complete"
                        );
                    }
                    Err(FinteamError::Cancelled) => tracing::debug!("run cancelled by consumer"),
                    Err(e) => {
                        tracing::warn!("run failed: {e}");
                        sink.fail(e);
                    }
                }
            }
            .instrument(span),
        );

        Ok(response)
    }
}
