//! ghwatcher CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Load configuration** — read a `.env` file if present, then parse the
//!    run configuration and GitHub settings from the environment. Invalid
//!    configuration aborts before any remote call.
//! 2. **Wire observability** — configure `tracing-subscriber` (plain or JSON
//!    console output, optional OTLP exporter).
//! 3. **Construct infrastructure** — authenticate a [`github::GithubClient`]
//!    as the GitHub App installation and hand it to the compliance workflow.
//! 4. **Select mode** — based on `GHWATCHER_MODE`:
//!    - `check` (default) — run one compliance pass and append the markdown
//!      report to `<org>.md` in the working directory.
//!    - `serve` — serve the informational landing page until Ctrl-C.

mod observability;
mod output;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context};
use compliance::{workflow, ProtectionPolicy, RunConfig, RunId};
use github::{GithubClient, GithubSettings};
use tracing::{error, info};

const MODE_VAR: &str = "GHWATCHER_MODE";

/// What this invocation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Check,
    Serve,
}

fn mode_from(raw: Option<&str>) -> anyhow::Result<Mode> {
    match raw.map(str::trim) {
        None | Some("") | Some("check") => Ok(Mode::Check),
        Some("serve") => Ok(Mode::Serve),
        Some(other) => bail!("{MODE_VAR} must be 'check' or 'serve', got '{other}'"),
    }
}

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is the normal case in CI.
    let _ = dotenvy::dotenv();

    let telemetry = match observability::init() {
        Ok(telemetry) => telemetry,
        Err(err) => {
            eprintln!("ghwatcher: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = run().await;
    let code = match &result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = format!("{err:#}"), "ghwatcher failed");
            ExitCode::FAILURE
        }
    };

    telemetry.shutdown();
    code
}

async fn run() -> anyhow::Result<()> {
    match mode_from(env(MODE_VAR).as_deref())? {
        Mode::Serve => {
            let port = listener::port_from(env(listener::PORT_VAR))?;
            listener::serve(port).await?;
        }
        Mode::Check => check().await?,
    }
    Ok(())
}

async fn check() -> anyhow::Result<()> {
    let config = RunConfig::from_lookup(env)?;
    let settings = GithubSettings::from_lookup(env)?;

    let client = GithubClient::from_app(&settings)
        .await
        .context("authenticating as the GitHub App installation")?;

    let outcome = workflow::run(
        &client,
        &config,
        ProtectionPolicy::baseline(),
        RunId::new_random(),
    )
    .await?;

    let path = output::report_path(Path::new("."), &config.organization);
    info!(
        path = %path.display(),
        rows = outcome.rows.len(),
        failed_actions = outcome.reconciliation.failures().count(),
        "Writing report"
    );
    output::append(&path, &outcome.markdown)?;
    Ok(())
}
