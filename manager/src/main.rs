use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use snapshot_manager::cli::{Cli, Command};
use snapshot_manager::commands::resolve_hostname;
use snapshot_manager::constants::exit_codes;
use snapshot_manager::services::BatchStatus;
use snapshot_manager::status_log::{read_log, ParseWindow};
use snapshot_manager::{
    build_notifier, ConfigManager, HcloudBackend, NotificationDispatcher, SnapshotRunCoordinator,
    StatusLogWriter,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::from(exit_codes::FATAL);
    }

    let result = match cli.command {
        Command::Run { configs } => run(&cli.config_dir, &configs).await,
        Command::Notify { delay, since, last } => {
            notify(&cli.config_dir, delay, ParseWindow { since, last }).await
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_codes::FATAL)
        }
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::from_default_env()
        .add_directive(format!("snapshot_manager={}", level).parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("hyper=warn".parse()?);

    fmt().with_env_filter(env_filter).init();
    Ok(())
}

async fn run(config_dir: &Path, configs: &[String]) -> Result<u8> {
    info!("Starting snapshot run");

    let config_manager = ConfigManager::load(config_dir, configs)
        .await
        .with_context(|| format!("Failed to load configuration from {}", config_dir.display()))?;
    let settings = config_manager.settings();

    let backend = HcloudBackend::discover(&settings)
        .await
        .context("hcloud CLI is not available")?;
    info!("Using hcloud binary at {}", backend.binary().display());

    let hostname = match settings.hostname.clone() {
        Some(hostname) => hostname,
        None => resolve_hostname().await,
    };

    let mut writer = StatusLogWriter::open(&settings.status_log_path).await?;
    let coordinator = SnapshotRunCoordinator::new(Arc::new(backend), settings.clone(), hostname);
    let batch = coordinator
        .run_batch(config_manager.servers(), &mut writer)
        .await?;

    for report in batch.reports.iter().filter(|r| !r.is_success()) {
        if let Some(failure) = &report.failure {
            warn!("Server '{}': failed at {}: {}", report.server_name, failure.step(), failure);
        }
    }

    Ok(match batch.overall() {
        BatchStatus::AllSucceeded => {
            info!("All {} servers succeeded", batch.reports.len());
            exit_codes::SUCCESS
        }
        BatchStatus::PartialFailure | BatchStatus::TotalFailure => {
            error!(
                "{} of {} servers failed",
                batch.failed(),
                batch.reports.len()
            );
            exit_codes::PARTIAL_FAILURE
        }
    })
}

async fn notify(config_dir: &Path, delay: Option<u64>, window: ParseWindow) -> Result<u8> {
    info!("Starting status notifications");

    let mut settings = ConfigManager::load_settings_only(config_dir)
        .await
        .with_context(|| format!("Failed to load configuration from {}", config_dir.display()))?;
    if let Some(delay) = delay {
        settings.dispatch.delay_between_messages_seconds = delay;
    }

    let parsed = read_log(&settings.status_log_path, &window).await?;
    if parsed.skipped() > 0 {
        warn!(
            "Skipped {} log lines ({} without status tag, {} malformed)",
            parsed.skipped(),
            parsed.ignored,
            parsed.malformed.len()
        );
    }
    if parsed.outcomes.is_empty() {
        info!("No status entries to send");
        return Ok(exit_codes::SUCCESS);
    }

    let notifier = build_notifier(&settings.notifier)?;
    let dispatcher = NotificationDispatcher::new(notifier, settings.dispatch.clone());
    let report = dispatcher.dispatch(parsed.outcomes).await;

    if report.all_sent() {
        info!("All {} notifications delivered", report.sent_count());
        Ok(exit_codes::SUCCESS)
    } else {
        for message in report.failed() {
            error!(
                "Server '{}': notification not delivered ({:?})",
                message.outcome.server_name, message.status
            );
        }
        Ok(exit_codes::PARTIAL_FAILURE)
    }
}
