use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use shipyard_deploy::config::REQUEST_TIMEOUT_SECS;
use shipyard_deploy::{DeployOrchestrator, EnvConfig, Project, Settings};

/// Deploy one generated project as a static site.
///
/// Credentials come from the environment (GITHUB_TOKEN, RENDER_API_KEY,
/// RENDER_OWNER_ID, GITHUB_APPS_REPO) or the settings file.
#[derive(Debug, Parser)]
#[command(name = "shipyard-deploy", version)]
struct Args {
    /// Project record as JSON.
    project: PathBuf,

    /// Settings file (TOML). Defaults to the per-user settings file.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let settings = match &args.settings {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::load_default().context("loading default settings")?,
    };
    let mut config = EnvConfig::new(settings);
    if let Some(secs) = args.timeout {
        config = config.with_override(REQUEST_TIMEOUT_SECS, secs.to_string());
    }

    let raw = std::fs::read_to_string(&args.project)
        .with_context(|| format!("reading {}", args.project.display()))?;
    let project: Project = serde_json::from_str(&raw)
        .with_context(|| format!("parsing project record {}", args.project.display()))?;

    let orchestrator = DeployOrchestrator::with_http(Arc::new(config));
    let cancel = orchestrator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling deployment");
            cancel.cancel();
        }
    });

    let result = orchestrator.deploy(&project).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
