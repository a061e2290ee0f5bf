use anyhow::{Context as _, Result};
use blockprof::{cli::Cli, config::ProfilerConfig, Context, Recorder, TracingLogger};
use clap::Parser;
use serde_json::Value;
use std::process::{self, Command};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber on stderr
///
/// The default log target reports at INFO, so INFO is always shown;
/// `--debug` adds the recorder's own diagnostics.
fn init_tracing(debug: bool) {
    let level = if debug {
        tracing::Level::TRACE
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

/// Run the command inside one profiling block and return its exit code
fn run_profiled(recorder: &mut Recorder, cli: &Cli, command: &[String]) -> Result<i32> {
    let token = cli.block_token().unwrap_or_else(|| command[0].clone());

    let mut begin = Context::new();
    begin.insert("category".into(), Value::from(cli.category.as_str()));
    begin.insert("command".into(), Value::from(command.join(" ")));
    recorder.begin(&token, begin)?;

    let status = Command::new(&command[0])
        .args(&command[1..])
        .status()
        .with_context(|| format!("Failed to run {}", command[0]))?;

    // Killed by a signal: report like a shell would
    let exit_code = status.code().unwrap_or(128);

    let mut end = Context::new();
    end.insert("category".into(), Value::from(cli.category.as_str()));
    end.insert("exitCode".into(), Value::from(exit_code));
    recorder.end(&token, end)?;

    Ok(exit_code)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.debug);

    let command = match &cli.command {
        Some(command) if !command.is_empty() => command.clone(),
        _ => anyhow::bail!("Must specify a command. Usage: blockprof [OPTIONS] -- COMMAND [ARGS...]"),
    };

    let config = match &cli.config {
        Some(path) => ProfilerConfig::from_file(path)?,
        None => ProfilerConfig::default(),
    };
    let mut recorder = config.build_recorder(Arc::new(TracingLogger))?;

    let exit_code = run_profiled(&mut recorder, &cli, &command);

    // Flush even when the command could not be started. Export failures
    // are already logged per target and must not mask the child's exit code.
    if let Err(e) = recorder.flush() {
        tracing::warn!("Profiling results were not fully exported: {}", e);
    }

    let exit_code = exit_code?;
    if exit_code != 0 {
        process::exit(exit_code);
    }
    Ok(())
}
