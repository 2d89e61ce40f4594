use crate::agent::{dispatch_query, Executor, Target};
use crate::config::{SecretSource, Settings};
use crate::error::FinteamError;
use crate::llm::ModelRegistry;
use crate::presets;
use crate::response::ResponseStream;

/// Runs one query through the preset finance team.
///
/// Credentials are resolved before anything else: a missing key fails here
/// without building an executor or dispatching anything.
pub async fn analyze<E, F>(
    settings: &Settings,
    secrets: &SecretSource,
    make_executor: F,
    query: &str,
    stream: bool,
) -> Result<ResponseStream, FinteamError>
where
    E: Executor,
    F: FnOnce(&Settings, ModelRegistry) -> Result<E, FinteamError>,
{
    let models = ModelRegistry::from_settings(settings, secrets)?;
    let team = presets::finance_team(settings, &models)?;
    tracing::debug!(
        team = team.name(),
        model = %team.model(),
        members = team.members().len(),
        "team configured"
    );

    let executor = make_executor(settings, models)?;
    dispatch_query(&executor, &Target::Team(team), query, stream).await
}
