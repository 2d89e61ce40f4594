use anyhow::Result;
use clap::Parser;
use finteam_cli::{interrupt_on, render_stream, write_report, Cli};
use finteam_core::{analyze, ConfigError, LlmExecutor, SecretSource, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let query = cli.query()?;
    let settings = cli.load_settings()?;
    tracing::debug!(
        config = %cli.config.clone().unwrap_or_else(Settings::config_path).display(),
        model = %settings.model.reference,
        stream = settings.agent.stream,
        "settings loaded"
    );
    let secrets = SecretSource::from_process(&settings.model.secret_file)?;

    let response = match analyze(
        &settings,
        &secrets,
        LlmExecutor::from_settings,
        &query,
        settings.agent.stream,
    )
    .await
    {
        Ok(response) => response,
        Err(e) if e.is_config() => {
            eprintln!("{e}");
            if let Some(ConfigError::MissingCredential { env }) = e.as_config() {
                eprintln!(
                    "Export {env} or add it to {}.",
                    settings.model.secret_file.display()
                );
            }
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    let mut stdout = std::io::stdout();
    let rendered =
        render_stream(response, &mut stdout, interrupt_on(tokio::signal::ctrl_c())).await?;

    if let Some(ref path) = cli.output {
        write_report(path, &query, &rendered.text)?;
        eprintln!("Report written to {}", path.display());
    }

    Ok(())
}
