use anyhow::{bail, Context, Result};
use clap::Parser;
use finteam_core::presets::DEFAULT_QUERY;
use finteam_core::{ModelRef, Settings};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "finteam")]
#[command(about = "Financial analysis with a team of web-search and market-data agents")]
#[command(version)]
pub struct Cli {
    /// Question for the team (defaults to the built-in example query)
    #[arg(short, long)]
    pub query: Option<String>,

    /// Model as provider:id (openai:gpt-4o, groq:llama-3.3-70b-versatile, ...)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Wait for the full answer instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// Also write the final answer as a markdown report
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Hide the agents' tool calls
    #[arg(long)]
    pub quiet_tools: bool,

    /// Settings file (defaults to the user config directory)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// The query to run. An explicit but blank `--query` is an error.
    pub fn query(&self) -> Result<String> {
        match self.query.as_deref() {
            None => Ok(DEFAULT_QUERY.to_string()),
            Some(q) if q.trim().is_empty() => bail!("query cannot be empty"),
            Some(q) => Ok(q.trim().to_string()),
        }
    }

    pub fn load_settings(&self) -> Result<Settings> {
        let mut settings = match self.config {
            Some(ref path) => Settings::load_from(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?,
            None => Settings::load(),
        };
        self.apply(&mut settings)?;
        Ok(settings)
    }

    pub fn apply(&self, settings: &mut Settings) -> Result<()> {
        if let Some(ref model) = self.model {
            settings.model.reference = model
                .parse::<ModelRef>()
                .with_context(|| format!("invalid --model '{model}'"))?;
        }
        if self.no_stream {
            settings.agent.stream = false;
        }
        if self.quiet_tools {
            settings.display.show_tool_calls = false;
        }
        Ok(())
    }
}
