//! Kubecost cost source plugin
//!
//! Serves the CostSource gRPC API on a loopback port for the plugin host,
//! plus health and metrics over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use plugin_lib::{
    health::{components, HealthRegistry},
    observability::{PluginMetrics, StructuredLogger},
    proto::CostSourceServer,
    server::PLUGIN_NAME,
    version, CostSourceService, KubecostClient, PluginConfig,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tonic::transport::server::TcpIncoming;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;

/// Kubecost cost source plugin
#[derive(Parser, Debug)]
#[command(name = "kubecost-plugin", about = "Kubecost cost source plugin", long_about = None)]
#[command(disable_version_flag = true)]
struct Args {
    /// Print version information and exit
    #[arg(long)]
    version: bool,

    /// Print detailed build information and exit
    #[arg(long)]
    version_full: bool,

    /// YAML config file; values in it override the environment
    #[arg(long, env = "KUBECOST_CONFIG")]
    config: Option<String>,

    /// gRPC listen address
    #[arg(long, default_value = "127.0.0.1:50051")]
    listen: SocketAddr,

    /// Port for /healthz, /readyz and /metrics
    #[arg(long, default_value_t = 8080)]
    metrics_port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.version {
        println!("{}", version::short());
        return Ok(());
    }
    if args.version_full {
        println!("{}", version::full());
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = PluginConfig::load(args.config.as_deref())?;
    if config.base_url.is_empty() {
        anyhow::bail!("KUBECOST_BASE_URL (or base_url in the config file) must be set");
    }
    info!(
        kubecost_url = %config.base_url,
        default_window = %config.default_window,
        timeout_secs = config.timeout.as_secs(),
        "Plugin configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::KUBECOST_API).await;
    health_registry.register(components::GRPC_SERVER).await;

    let metrics = PluginMetrics::new();
    let logger = StructuredLogger::new(PLUGIN_NAME);

    let base_url = config.base_url.clone();
    let client = KubecostClient::new(config)?;
    let service = CostSourceService::new(client, metrics.clone(), health_registry.clone());

    let app_state = Arc::new(api::AppState::new(health_registry.clone(), metrics));
    let api_handle = tokio::spawn(api::serve(args.metrics_port, app_state));

    let incoming = TcpIncoming::new(args.listen, true, None)
        .map_err(|e| anyhow::anyhow!(e))
        .with_context(|| format!("Failed to listen on {}", args.listen))?;

    logger.log_startup(&version::short(), &args.listen.to_string(), &base_url);
    health_registry.set_ready(true).await;

    let served = tonic::transport::Server::builder()
        .add_service(CostSourceServer::new(service))
        .serve_with_incoming_shutdown(incoming, shutdown_signal())
        .await;

    health_registry.set_ready(false).await;
    if let Err(e) = &served {
        error!(error = %e, "gRPC server failed");
        health_registry
            .set_unhealthy(components::GRPC_SERVER, e.to_string())
            .await;
    }

    logger.log_shutdown(&shutdown_reason(&served));
    api_handle.abort();

    served.context("gRPC server failed")
}

fn shutdown_reason<E: std::fmt::Display>(served: &std::result::Result<(), E>) -> String {
    match served {
        Ok(()) => "SIGINT received".to_string(),
        Err(e) => format!("gRPC server failed: {}", e),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
}
