use anyhow::{anyhow, Result};
use finteam_core::{ResponseChunk, ResponseStream};
use futures::StreamExt;
use std::future::Future;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub tool_calls: usize,
}

/// Writes chunks to `out` as they arrive and returns the collected answer.
///
/// If `interrupt` resolves first the stream is cancelled and an error is
/// returned.
pub async fn render_stream<W, F>(
    mut stream: ResponseStream,
    out: &mut W,
    interrupt: F,
) -> Result<Rendered>
where
    W: Write,
    F: Future<Output = ()>,
{
    let mut rendered = Rendered::default();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            _ = &mut interrupt => {
                stream.cancel();
                writeln!(out)?;
                return Err(anyhow!("interrupted"));
            }
            item = stream.next() => {
                let Some(item) = item else { break };
                match item? {
                    ResponseChunk::Content(text) => {
                        write!(out, "{text}")?;
                        rendered.text.push_str(&text);
                    }
                    ResponseChunk::ToolCall { agent, tool, arguments } => {
                        writeln!(out, "\n - {agent} running: {tool}({})", compact_args(&arguments))?;
                        rendered.tool_calls += 1;
                    }
                }
                out.flush()?;
            }
        }
    }

    if !rendered.text.ends_with('\n') {
        writeln!(out)?;
    }
    Ok(rendered)
}

/// Resolves when `signal` fires. If the signal cannot be watched the
/// returned future never resolves, so rendering runs to completion.
pub async fn interrupt_on<F, E>(signal: F)
where
    F: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    if let Err(e) = signal.await {
        tracing::warn!("cannot listen for interrupts: {e}");
        std::future::pending::<()>().await;
    }
}

/// `{"symbol": "NVDA"}` -> `symbol=NVDA`
fn compact_args(arguments: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(arguments) {
        Ok(serde_json::Value::Object(map)) => map
            .iter()
            .map(|(k, v)| match v {
                serde_json::Value::String(s) => format!("{k}={s}"),
                other => format!("{k}={other}"),
            })
            .collect::<Vec<_>>()
            .join(", "),
        _ => arguments.trim().to_string(),
    }
}

/// Saves the answer as a markdown report.
pub fn write_report(path: &Path, query: &str, answer: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let generated = chrono::Local::now().format("%Y-%m-%d %H:%M");
    let report = format!(
        "# Financial Analysis\n\n**Query:** {query}\n\n_Generated {generated}_\n\n---\n\n{}\n",
        answer.trim_end()
    );
    std::fs::write(path, report)?;
    Ok(())
}
