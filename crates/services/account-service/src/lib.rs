//! Account Service Library
//!
//! This crate provides user account management via gRPC: creation,
//! updates, bulk deletion, role and permission assignment.
//! It can be run as a standalone service or embedded in another binary.

pub mod config;
pub mod grpc;
pub mod infra;
pub mod repository;
pub mod service;

use std::net::SocketAddr;
use std::sync::Arc;

use tonic::transport::Server;
use tracing::info;

use crate::config::AccountServiceConfig;
use crate::grpc::AccountGrpcService;
use crate::infra::{Database, EventSink, LoggingBillingGateway, RedisEventSink, TracingEventSink};
use crate::repository::Repositories;
use crate::service::UserManager;

/// Run migrations (for CLI commands).
pub async fn run_migrations(
    config: &AccountServiceConfig,
    action: MigrateAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::connect_without_migrations(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Pick the event transport: Redis pub/sub when configured, else the log.
async fn build_event_sink(
    config: &AccountServiceConfig,
) -> Result<Arc<dyn EventSink>, Box<dyn std::error::Error>> {
    match &config.redis_url {
        Some(url) => {
            let sink = RedisEventSink::connect(url, config.events_channel.clone()).await?;
            info!(channel = %config.events_channel, "Publishing account events to Redis");
            Ok(Arc::new(sink))
        }
        None => {
            info!("No Redis URL configured, account events are logged only");
            Ok(Arc::new(TracingEventSink))
        }
    }
}

/// Run the gRPC server on `config.host:config.port`.
pub async fn run_server(config: AccountServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize database
    let db = Database::connect(&config.database).await?;
    db.ping().await?;

    // Create repositories and service
    let repos = Repositories::sea_orm(db.get_connection(), Arc::new(LoggingBillingGateway));
    let events = build_event_sink(&config).await?;
    let user_manager =
        Arc::new(UserManager::new(repos, events).with_default_language(config.default_language.clone()));

    // Create gRPC service
    let grpc_service = AccountGrpcService::new(user_manager);

    // Build address
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Account service listening on {}", addr);

    // Run server
    Server::builder()
        .add_service(proto::AccountServiceServer::new(grpc_service))
        .serve(addr)
        .await?;

    Ok(())
}
