//! The reference configuration: a web researcher, a financial data agent,
//! and the team that combines them.

use crate::agent::{AgentDescriptor, Team};
use crate::config::Settings;
use crate::error::FinteamError;
use crate::llm::ModelRegistry;
use crate::tools::{FinanceOptions, ToolBinding};

pub const WEB_AGENT: &str = "Web Agent";
pub const FINANCE_AGENT: &str = "Finance Agent";

pub const SOURCES_INSTRUCTION: &str = "Always include sources";
pub const TABLES_INSTRUCTION: &str = "Use tables to display data";

pub const DEFAULT_QUERY: &str =
    "What's the market outlook and financial performance of AI semiconductor companies?";

pub fn web_agent(settings: &Settings, models: &ModelRegistry) -> Result<AgentDescriptor, FinteamError> {
    AgentDescriptor::builder(WEB_AGENT)
        .role("Search the web for information")
        .model(settings.model.reference.clone())
        .tool(ToolBinding::web_search())
        .instruction(SOURCES_INSTRUCTION)
        .show_tool_calls(settings.display.show_tool_calls)
        .markdown(settings.display.markdown)
        .build(models)
}

pub fn finance_agent(settings: &Settings, models: &ModelRegistry) -> Result<AgentDescriptor, FinteamError> {
    AgentDescriptor::builder(FINANCE_AGENT)
        .role("Get financial data")
        .model(settings.model.reference.clone())
        .tool(ToolBinding::financial_lookup(FinanceOptions {
            stock_price: true,
            analyst_recommendations: true,
            company_info: true,
            ..FinanceOptions::none()
        }))
        .instruction(TABLES_INSTRUCTION)
        .show_tool_calls(settings.display.show_tool_calls)
        .markdown(settings.display.markdown)
        .build(models)
}

pub fn finance_team(settings: &Settings, models: &ModelRegistry) -> Result<Team, FinteamError> {
    Team::builder()
        .model(settings.model.reference.clone())
        .member(web_agent(settings, models)?)
        .member(finance_agent(settings, models)?)
        .instructions([SOURCES_INSTRUCTION, TABLES_INSTRUCTION])
        .show_tool_calls(settings.display.show_tool_calls)
        .markdown(settings.display.markdown)
        .build(models)
}
