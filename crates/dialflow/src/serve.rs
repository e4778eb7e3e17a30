// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `dialflow serve` command implementation.
//!
//! Starts the full campaign engine: SQLite storage, the HTTP voice
//! provider adapter, the campaign dispatcher, and (when enabled) the
//! HTTP gateway. Supports graceful shutdown via signal handlers: the
//! gateway stops accepting requests, running campaigns are cancelled,
//! and in-flight calls finish before the process exits.

use std::sync::Arc;

use tracing::{debug, error, info};

use dialflow_config::model::DialflowConfig;
use dialflow_core::{DialflowError, PluginAdapter, StorageAdapter};
use dialflow_dispatch::CampaignDispatcher;
use dialflow_gateway::{AuthConfig, GatewayState, HealthState, ServerConfig};
use dialflow_provider::HttpVoiceProvider;
use dialflow_session::DriverConfig;
use dialflow_storage::SqliteStorage;

use crate::shutdown;

/// Runs the `dialflow serve` command.
pub async fn run_serve(config: DialflowConfig) -> Result<(), DialflowError> {
    init_tracing(&config.agent.log_level);

    info!(name = config.agent.name.as_str(), "starting dialflow serve");

    // Initialize storage.
    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    info!(
        path = config.storage.database_path.as_str(),
        "storage initialized"
    );

    // Initialize the voice provider adapter.
    let provider = HttpVoiceProvider::new(&config.provider).map_err(|e| {
        error!(error = %e, "failed to initialize voice provider");
        eprintln!(
            "error: provider API key required. Set provider.api_key or DIALFLOW_PROVIDER_API_KEY."
        );
        e
    })?;

    let dispatcher = CampaignDispatcher::new(
        storage.clone() as Arc<dyn StorageAdapter>,
        Arc::new(provider),
        DriverConfig::from_provider_config(&config.provider),
    );

    // Install signal handler.
    let cancel = shutdown::install_signal_handler();

    if config.gateway.enabled {
        // Fail-closed: refuse to start the gateway with no auth configured.
        if config.gateway.bearer_token.is_none() {
            return Err(DialflowError::Config(
                "gateway enabled but no authentication configured; set gateway.bearer_token"
                    .to_string(),
            ));
        }

        let server_config = ServerConfig {
            host: config.gateway.host.clone(),
            port: config.gateway.port,
        };
        let state = GatewayState {
            dispatcher: dispatcher.clone(),
            auth: AuthConfig {
                bearer_token: config.gateway.bearer_token.clone(),
            },
            health: HealthState {
                start_time: std::time::Instant::now(),
            },
        };

        // Serves until the shutdown signal fires, then finishes in-flight
        // requests and returns.
        dialflow_gateway::start_server(&server_config, state, cancel.clone().cancelled_owned())
            .await?;
    } else {
        debug!("gateway disabled by configuration");
        cancel.cancelled().await;
    }

    // Cancel running campaigns and wait for their workers to drain.
    info!("shutting down: cancelling running campaigns");
    dispatcher.shutdown().await;

    storage.shutdown().await?;

    info!("dialflow serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dialflow={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
