use anyhow::Context;
use kindshell_app::commands::builtins::COMMANDS;
use kindshell_app::{Config, Shell};
use kindshell_executor::FsActionExecutor;
use kindshell_interfaces::TerminalInterface;
use kindshell_tasks::TaskScheduler;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "KINDSHELL_LOG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load kindshell configuration")?;
    init_tracing(&config.log_level);

    let executor = Arc::new(FsActionExecutor::new());
    let scheduler = Arc::new(TaskScheduler::new(
        executor.clone(),
        config.scheduler.clone(),
    ));
    scheduler.start();

    let interface = Arc::new(TerminalInterface::new(COMMANDS));
    let shell = Shell::new(interface, executor, Arc::clone(&scheduler), &config);
    let announcer = shell.spawn_announcer();

    tracing::info!(
        scan_interval_ms = config.scheduler.scan_interval_ms,
        "kindshell started"
    );
    shell.run().await;

    let cancelled = scheduler.shutdown().await;
    if cancelled > 0 {
        tracing::info!(cancelled, "Cancelled pending tasks on exit");
    }
    announcer.abort();
    Ok(())
}

/// `KINDSHELL_LOG`, then `RUST_LOG`, then the configured level.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
