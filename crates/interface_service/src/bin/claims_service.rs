//! Claims Workflow - Service Binary
//!
//! Starts the claims workflow against PostgreSQL, runs the notification
//! worker and the pending-approval reminder sweep, and shuts both down
//! cleanly on Ctrl+C or SIGTERM.
//!
//! # Usage
//!
//! ```bash
//! CLAIMS_DATABASE_URL=postgres://... cargo run --bin claims-service
//! ```
//!
//! # Environment Variables
//!
//! * `CLAIMS_DATABASE_URL` - PostgreSQL connection string
//! * `CLAIMS_DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! * `CLAIMS_DB_MIN_CONNECTIONS` - Connections kept open while idle (default: 2)
//! * `CLAIMS_DB_CONNECT_TIMEOUT_SECS` - Wait for a pooled connection (default: 30)
//! * `CLAIMS_DB_IDLE_TIMEOUT_SECS` - Idle connection lifetime (default: 600)
//! * `CLAIMS_DB_MAX_LIFETIME_SECS` - Maximum connection lifetime (default: 1800)
//! * `CLAIMS_LOG_LEVEL` - Default log filter when `RUST_LOG` is unset (default: info)
//! * `CLAIMS_LOG_JSON` - Emit JSON log lines (default: false)
//! * `CLAIMS_REMINDER_INTERVAL_SECS` - Seconds between reminder sweeps (default: 86400)
//! * `CLAIMS_MAIL_FROM` - Sender address (default: claims@localhost)
//! * `CLAIMS_REMARK_MAX_LEN` - Maximum remark length (default: 500)

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use core_kernel::{HealthCheckable, SystemClock};
use domain_claims::WorkflowPorts;
use infra_db::{
    create_pool, run_migrations, PostgresAuditStore, PostgresClaimStore, PostgresStaffDirectory,
};
use interface_service::{log_health, run_reminder_sweep, LogMailSender, ServiceConfig, ServiceRuntime};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ServiceConfig::from_env().context("failed to read CLAIMS_* configuration")?;
    config.validate()?;

    init_tracing(&config.log_level, config.log_json);
    info!(reminder_interval_secs = config.reminder_interval_secs, "Starting claims service");

    let pool = create_pool(config.database())
        .await
        .context("failed to connect to the database")?;
    run_migrations(&pool).await.context("failed to apply migrations")?;

    let claims = Arc::new(PostgresClaimStore::new(pool.clone()));
    let audit = Arc::new(PostgresAuditStore::new(pool.clone()));
    let directory = Arc::new(PostgresStaffDirectory::new(pool.clone()));

    let adapters: Vec<Arc<dyn HealthCheckable>> = vec![
        claims.clone() as Arc<dyn HealthCheckable>,
        audit.clone() as Arc<dyn HealthCheckable>,
        directory.clone() as Arc<dyn HealthCheckable>,
    ];
    if !log_health(&adapters).await {
        warn!("Starting with unhealthy adapters");
    }

    let runtime = ServiceRuntime::start(
        WorkflowPorts {
            claims,
            audit,
            directory: directory.clone(),
            rates: directory,
            clock: Arc::new(SystemClock),
        },
        Arc::new(LogMailSender::new(config.mail_from.clone())),
        config.workflow(),
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    let sweep = tokio::spawn(run_reminder_sweep(
        runtime.service(),
        config.reminder_interval(),
        stop_rx,
    ));

    shutdown_signal().await;

    let _ = stop_tx.send(true);
    if let Err(e) = sweep.await {
        error!(error = %e, "reminder sweep task failed");
    }
    runtime.shutdown().await;
    pool.close().await;

    info!("Claims service shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber; `RUST_LOG` wins over `log_level`
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Waits for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
