// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Daemon wiring and lifecycle.
//!
//! One process hosts the HTTP API and the alarm ingest consumer loops.
//! Shutdown order on SIGINT/SIGTERM: cancel the consumer loops, wait for
//! them to drain within the grace period, close the producer so buffered
//! writes flush, then drain the HTTP listener under its own deadline.

use anyhow::{Context, Result};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use vigil_core::application::alarm_service::{AlarmService, StandardAlarmService};
use vigil_core::application::catalog_service::{
    GuidanceCatalogService, StandardGuidanceCatalogService,
};
use vigil_core::application::directory_service::{DirectoryService, StandardDirectoryService};
use vigil_core::application::incident_service::{IncidentService, StandardIncidentService};
use vigil_core::application::{AlarmIngestPipeline, PipelineSupervisor};
use vigil_core::domain::events::{ALARM_TOPIC, CONSUMER_GROUP};
use vigil_core::domain::repository::{
    AlarmRepository, AssignmentRepository, GuidanceTemplateRepository, IncidentRepository,
    PremiseRepository, UserRepository,
};
use vigil_core::domain::transport::EventPublisher;
use vigil_core::infrastructure::db::Database;
use vigil_core::infrastructure::memory_log::MemoryLog;
use vigil_core::infrastructure::repositories::{
    InMemoryAlarmRepository, InMemoryAssignmentRepository, InMemoryGuidanceTemplateRepository,
    InMemoryIncidentRepository, InMemoryPremiseRepository, InMemoryUserRepository,
    PostgresAlarmRepository, PostgresAssignmentRepository, PostgresGuidanceTemplateRepository,
    PostgresIncidentRepository, PostgresPremiseRepository, PostgresUserRepository,
};
use vigil_core::presentation::api::{self, AppState};

use crate::config::Config;

struct Repositories {
    alarms: Arc<dyn AlarmRepository>,
    incidents: Arc<dyn IncidentRepository>,
    templates: Arc<dyn GuidanceTemplateRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    users: Arc<dyn UserRepository>,
    premises: Arc<dyn PremiseRepository>,
}

async fn build_repositories(config: &Config) -> Result<Repositories> {
    match &config.database_url {
        Some(url) => {
            let db = Database::new(url)
                .await
                .context("failed to connect to PostgreSQL")?;
            sqlx::migrate!("./migrations")
                .run(db.get_pool())
                .await
                .context("database migration failed")?;
            info!("postgres connected, migrations applied");
            let pool = db.get_pool().clone();
            Ok(Repositories {
                alarms: Arc::new(PostgresAlarmRepository::new(pool.clone())),
                incidents: Arc::new(PostgresIncidentRepository::new(pool.clone())),
                templates: Arc::new(PostgresGuidanceTemplateRepository::new(pool.clone())),
                assignments: Arc::new(PostgresAssignmentRepository::new(pool.clone())),
                users: Arc::new(PostgresUserRepository::new(pool.clone())),
                premises: Arc::new(PostgresPremiseRepository::new(pool)),
            })
        }
        None => {
            warn!("DATABASE_URL not set, running on in-memory storage");
            Ok(Repositories {
                alarms: Arc::new(InMemoryAlarmRepository::new()),
                incidents: Arc::new(InMemoryIncidentRepository::new()),
                templates: Arc::new(InMemoryGuidanceTemplateRepository::new()),
                assignments: Arc::new(InMemoryAssignmentRepository::new()),
                users: Arc::new(InMemoryUserRepository::new()),
                premises: Arc::new(InMemoryPremiseRepository::new()),
            })
        }
    }
}

pub async fn run(config: Config) -> Result<()> {
    let repos = build_repositories(&config).await?;

    let log = MemoryLog::new();
    let publisher: Arc<dyn EventPublisher> = Arc::new(log.publisher());
    let subscriber = Arc::new(log.subscriber(CONSUMER_GROUP, ALARM_TOPIC));

    let alarm_service: Arc<dyn AlarmService> = Arc::new(StandardAlarmService::new(
        repos.alarms.clone(),
        repos.premises.clone(),
        publisher.clone(),
    ));
    let incident_service: Arc<dyn IncidentService> = Arc::new(StandardIncidentService::new(
        repos.incidents.clone(),
        repos.alarms.clone(),
        repos.templates.clone(),
        repos.assignments.clone(),
        repos.users.clone(),
        publisher.clone(),
    ));
    let catalog_service: Arc<dyn GuidanceCatalogService> =
        Arc::new(StandardGuidanceCatalogService::new(repos.templates.clone()));
    let directory_service: Arc<dyn DirectoryService> = Arc::new(StandardDirectoryService::new(
        repos.users.clone(),
        repos.premises.clone(),
    ));

    let mut supervisor = PipelineSupervisor::new();
    supervisor.spawn(AlarmIngestPipeline::new(subscriber, alarm_service.clone()));

    let app = api::app(AppState {
        alarm_service,
        incident_service,
        catalog_service,
        directory_service,
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    info!("vigild listening on {addr}");

    let http_stop = CancellationToken::new();
    let server = {
        let http_stop = http_stop.clone();
        tokio::spawn(
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { http_stop.cancelled().await })
                .into_future(),
        )
    };

    shutdown_signal().await;
    info!("shutting down the server, consumer and producer");

    supervisor
        .shutdown(Duration::from_secs(config.shutdown_grace_secs))
        .await;

    if let Err(err) = publisher.close().await {
        warn!(error = %err, "failed to close producer");
    }

    http_stop.cancel();
    match tokio::time::timeout(
        Duration::from_secs(config.http_shutdown_timeout_secs),
        server,
    )
    .await
    {
        Ok(Ok(Ok(()))) => info!("http server stopped"),
        Ok(Ok(Err(err))) => error!(error = %err, "http server failed"),
        Ok(Err(err)) => error!(error = %err, "http server task panicked"),
        Err(_) => warn!("http server did not stop within its deadline"),
    }

    info!("vigild stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C signal");
        },
        _ = terminate => {
            info!("received SIGTERM signal");
        },
    }
}
