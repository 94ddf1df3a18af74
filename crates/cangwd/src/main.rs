//! cangwd - CAN signal gateway daemon
//!
//! Serves the command/status page and the parameter API on top of a CAN
//! signal database and a CAN transport.
//!
//! If no config file is provided, uses the mock transport for demo purposes.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use cangw_api::{create_router, AppState};
use cangw_bus::{create_transport, TransportHandle};
use cangw_core::{CanLink, CommandGateway, DatabaseLoader, FileDatabaseLoader, ParameterStore};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{AllowedMessages, Config};

#[derive(Parser, Debug)]
#[command(name = "cangwd")]
#[command(version, about = "CAN signal gateway daemon")]
struct Args {
    /// Config file (TOML)
    config: Option<PathBuf>,

    /// Signal database (YAML/JSON), overrides `can.database`
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Listen address, overrides `server.host`
    #[arg(long)]
    host: Option<String>,

    /// Listen port, overrides `server.port`
    #[arg(short, long)]
    port: Option<u16>,

    /// Allowed message names separated by `,` `;` or newlines,
    /// overrides `can.allowed_messages`
    #[arg(long)]
    allowed_messages: Option<String>,

    /// Allow-list used when neither the flag nor the config sets one
    #[arg(long, env = "CAN_ALLOWED_MESSAGES", hide = true)]
    fallback_allowed_messages: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "cangwd=info,cangw_api=info,cangw_core=debug,cangw_bus=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting cangwd (CAN signal gateway)");

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("Loading config from: {}", path.display());
            Config::load(path)?
        }
        None => {
            tracing::info!("No config file provided, using mock transport");
            Config::default()
        }
    };
    apply_args(&mut config, &args);

    let transport = create_transport(&config.transport).context("Failed to create CAN transport")?;
    tracing::info!(transport = %transport.describe(), "CAN transport ready");

    let loader = config.can.database.as_ref().map(|path| {
        tracing::info!("Using CAN database: {}", path.display());
        Box::new(FileDatabaseLoader::new(path)) as Box<dyn DatabaseLoader>
    });
    if loader.is_none() {
        tracing::warn!("No CAN database configured; commands will report it unavailable");
    }

    let link = Arc::new(CanLink::new(
        loader,
        TransportHandle::owned(transport),
        config.can.defaults.clone(),
    ));

    // Eager load; a failure is retried on the first request
    if let Err(e) = link.encoder() {
        tracing::debug!(error = %e, "Deferring CAN database load");
    }

    let parameters = Arc::new(
        ParameterStore::new(Some(link.clone())).with_initial(config.initial_parameters()),
    );
    for binding in &config.bindings {
        match parameters.bind(&binding.parameter, &binding.message, &binding.signal) {
            Ok(target) => tracing::info!(
                parameter = %binding.parameter,
                message_name = %target.message,
                signal = %target.signal,
                "Parameter bound"
            ),
            Err(e) => tracing::warn!(parameter = %binding.parameter, error = %e, "Skipping binding"),
        }
    }

    let allow_list = config.allow_list(args.fallback_allowed_messages.as_deref());
    if !allow_list.is_empty() {
        tracing::info!(?allow_list, "Message allow-list active");
    }
    let gateway = Arc::new(CommandGateway::new(
        link.clone(),
        allow_list,
        config.can.default_message.clone(),
    ));

    let app = create_router(AppState::new(gateway, parameters));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    link.close();
    tracing::info!("cangwd stopped");
    Ok(())
}

/// Command-line values win over the config file
fn apply_args(config: &mut Config, args: &Args) {
    if let Some(database) = &args.database {
        config.can.database = Some(database.clone());
    }
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(allowed) = &args.allowed_messages {
        config.can.allowed_messages = Some(AllowedMessages::Text(allowed.clone()));
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
