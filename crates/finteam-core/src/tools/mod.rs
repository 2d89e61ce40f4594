mod traits;
mod capability;
mod web_search;
mod finance;

pub use traits::*;
pub use capability::{
    Capability, FinanceOptions, SearchOptions, ToolBinding, FINANCIAL_LOOKUP, WEB_SEARCH,
};
pub use web_search::{parse_ddg_results, SearchHit, SearchMode, WebSearchTool};
pub use finance::{FinanceFeature, FinanceTool};

use crate::config::Settings;
use crate::error::FinteamError;

/// Shared HTTP plumbing and limits handed to every tool built from a binding.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub http: reqwest::Client,
    pub search_base_url: String,
    pub finance_base_url: String,
    pub search_max_results: usize,
    pub news_max_results: usize,
}

impl ToolContext {
    pub fn from_settings(settings: &Settings) -> Result<Self, FinteamError> {
        let http = reqwest::Client::builder()
            .timeout(settings.http_timeout())
            .user_agent(settings.tools.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            search_base_url: settings.tools.search_base_url.clone(),
            finance_base_url: settings.tools.finance_base_url.clone(),
            search_max_results: settings.tools.search_max_results,
            news_max_results: settings.tools.news_max_results,
        })
    }
}

/// Concrete tools behind one binding, one per enabled feature.
pub fn tools_for_binding(binding: &ToolBinding, ctx: &ToolContext) -> Vec<Box<dyn Tool>> {
    match binding.capability() {
        Capability::WebSearch(options) => {
            let mut tools: Vec<Box<dyn Tool>> = Vec::new();
            if options.search {
                tools.push(Box::new(WebSearchTool::new(ctx.clone(), SearchMode::Web)));
            }
            if options.news {
                tools.push(Box::new(WebSearchTool::new(ctx.clone(), SearchMode::News)));
            }
            tools
        }
        Capability::FinancialLookup(options) => FinanceFeature::enabled(&options)
            .into_iter()
            .map(|feature| Box::new(FinanceTool::new(ctx.clone(), feature)) as Box<dyn Tool>)
            .collect(),
    }
}

pub fn registry_for(bindings: &[ToolBinding], ctx: &ToolContext) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for binding in bindings {
        for tool in tools_for_binding(binding, ctx) {
            registry.register(tool);
        }
    }
    registry
}

/// Names of the functions a binding exposes, without building the tools.
pub fn tool_names_for_binding(binding: &ToolBinding) -> Vec<&'static str> {
    match binding.capability() {
        Capability::WebSearch(options) => [
            (options.search, SearchMode::Web),
            (options.news, SearchMode::News),
        ]
        .into_iter()
        .filter_map(|(on, mode)| on.then_some(mode.tool_name()))
        .collect(),
        Capability::FinancialLookup(options) => FinanceFeature::enabled(&options)
            .iter()
            .map(|feature| feature.tool_name())
            .collect(),
    }
}
