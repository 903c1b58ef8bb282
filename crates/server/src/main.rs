use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tenantops_core::events::TracingEventSink;
use tenantops_core::service::{OperationService, TenantService, WorkflowRegistry};
use tenantops_core::storage::{InMemoryOperationRepository, InMemoryTenantRepository};
use tenantops_core::workflow::WorkflowFactory;

mod api;
mod config;

use api::AppState;
use config::ServerConfig;

#[derive(Parser, Debug)]
#[command(name = "tenantops")]
#[command(about = "Tenant provisioning engine", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, default_value = "tenantops.toml")]
    config: PathBuf,

    /// Host to bind to; overrides the configuration file
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on; overrides the configuration file
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = ServerConfig::load(&args.config)?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with_target(false)
        .init();

    tracing::info!("starting tenantops");

    let tenant_repository = InMemoryTenantRepository::new();
    let operation_repository = InMemoryOperationRepository::new();
    let event_sink = Arc::new(TracingEventSink);
    let factory = Arc::new(WorkflowFactory::new(
        tenant_repository.clone(),
        operation_repository.clone(),
        event_sink.clone(),
        config.workflow_timeout(),
    ));
    let registry = WorkflowRegistry::new();

    let state = AppState {
        tenant_service: TenantService::new(
            tenant_repository.clone(),
            operation_repository.clone(),
            factory,
            registry,
            event_sink,
        ),
        operation_service: OperationService::new(operation_repository),
    };

    api::serve(&config.addr(), state).await
}
