// src/main.rs - scholarchat entry point

use clap::Parser;
use std::sync::Arc;

use scholarchat::api::{self, AppState};
use scholarchat::cli::Cli;
use scholarchat::infra::config::Config;
use scholarchat::infra::logger;
use scholarchat::provider::google::GoogleProvider;
use scholarchat::provider::ModelProvider;
use scholarchat::relay::{RelaySettings, StreamRelay};
use scholarchat::session::{ConversationHistory, SessionRegistry};
use scholarchat::topic::TopicFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging (respects RUST_LOG)
    logger::init_logging(&cli.log_level);

    if let Err(e) = run(cli).await {
        tracing::error!("FATAL: {e:#}");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load config (falls back to defaults if no config.toml)
    let mut config = if let Some(ref path) = cli.config {
        let mut c = Config::load_from(std::path::Path::new(path))?;
        c.apply_env();
        c
    } else {
        Config::load()?
    };
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let api_key = config.api_key()?;

    let upload_dir = config.sessions.upload_dir.clone();
    tokio::fs::create_dir_all(&upload_dir).await.map_err(|e| {
        anyhow::anyhow!(
            "Error creating upload directory {}: {e}",
            upload_dir.display()
        )
    })?;

    let provider: Arc<dyn ModelProvider> =
        Arc::new(GoogleProvider::new(api_key).with_base_url(&config.model.base_url));
    let registry = SessionRegistry::new(config.sessions.pending_timeout());
    let history = ConversationHistory::new(config.sessions.max_history_turns);
    let relay = StreamRelay::new(
        registry,
        history,
        provider,
        RelaySettings::from_config(&config.model),
    );

    tracing::info!(
        "Model: {} (history: {} turns, pending timeout: {}s)",
        config.model.name,
        config.sessions.max_history_turns,
        config.sessions.pending_timeout_secs
    );

    let state = AppState::new(relay, TopicFilter::from_config(&config.topic), upload_dir);
    api::start_server(&config.server, state).await
}
