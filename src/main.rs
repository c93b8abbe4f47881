//! # Airwave — anonymous radio relay bot for Discord
//!
//! Messages posted in the radio channel are deleted, reposted anonymously
//! as an embed, mirrored with attribution to the admin log channel, and
//! the reposted copy is deleted again after the retention window. The
//! deletion schedule is durable: it survives restarts and executes
//! at-least-once.
//!
//! Usage:
//!   airwave                          # ~/.airwave/config.toml
//!   airwave --config ./airwave.toml  # explicit config
//!   airwave --verbose                # debug logging

mod relay;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

use airwave_channels::discord::DiscordRestClient;
use airwave_channels::gateway::DiscordGateway;
use airwave_core::config::AirwaveConfig;
use airwave_scheduler::{Escalation, ShutdownSignal, SweepService, open_store};

#[derive(Parser)]
#[command(name = "airwave", version, about = "📻 Airwave — anonymous radio relay bot")]
struct Cli {
    /// Path to the config file
    #[arg(short, long, default_value = "~/.airwave/config.toml")]
    config: String,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "airwave=debug,airwave_scheduler=debug,airwave_channels=debug"
    } else {
        "airwave=info,airwave_scheduler=info,airwave_channels=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config_path = shellexpand::tilde(&cli.config).to_string();
    let config = AirwaveConfig::load_from(Path::new(&config_path))?;
    config.validate()?;

    let rest = Arc::new(DiscordRestClient::new(config.discord.clone()));
    let me = rest.connect().await?;
    tracing::info!("🤖 Logged in as {} ({})", me.username, me.id);

    let store = open_store(&config.storage).await?;
    let escalation = Arc::new(Escalation::new(rest.clone()));
    let shutdown = ShutdownSignal::new();
    let service = Arc::new(SweepService::new(
        store,
        rest.clone(),
        escalation,
        shutdown.clone(),
        Duration::from_secs(config.sweep.interval_secs),
    ));

    // Overdue deletions run now, before the first sweep tick. If the
    // schedule cannot even be read, escalation has already fired — do not
    // run on partial state.
    service.recover().await?;

    let sweep = service.clone().spawn();

    let relay = relay::Relay::new(
        rest.clone(),
        service.clone(),
        config.discord.clone(),
        &config.sweep,
    );
    let mut events = DiscordGateway::new(&config.discord.bot_token).start();

    let relay_task = tokio::spawn(async move {
        while let Some(msg) = events.next().await {
            relay.handle_message(msg).await;
        }
    });

    // Run until the operator stops us or the backend dies.
    let mut shutdown_rx = shutdown.subscribe();
    let planned = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("SIGINT received");
            true
        }
        _ = shutdown_rx.changed() => false,
    };

    let drain = Duration::from_secs(config.sweep.drain_timeout_secs);
    if planned {
        service.shutdown("operator stop", false, sweep, drain).await;
    } else {
        service
            .shutdown("storage backend unavailable", true, sweep, drain)
            .await;
    }

    // Ending the relay task drops the stream, which stops the gateway
    // connection task.
    relay_task.abort();
    tracing::info!("📻 Airwave stopped");
    Ok(())
}
