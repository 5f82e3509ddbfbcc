//! Wiring of the workflow service, its notification worker and the
//! pending-approval reminder sweep

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use core_kernel::{AdapterHealth, HealthCheckable};
use domain_claims::{
    ClaimWorkflowService, MailSender, NotificationDispatcher, NotificationQueue, NotificationWorker,
    WorkerHandle, WorkerStats, WorkflowConfig, WorkflowPorts,
};

/// A running workflow service with its background notification worker
pub struct ServiceRuntime {
    service: Arc<ClaimWorkflowService>,
    worker: WorkerHandle,
}

impl ServiceRuntime {
    /// Builds the service and starts the single notification worker
    ///
    /// Must be called inside a Tokio runtime.
    pub fn start(ports: WorkflowPorts, mailer: Arc<dyn MailSender>, config: WorkflowConfig) -> Self {
        let (queue, receiver) = NotificationQueue::new();
        let dispatcher = NotificationDispatcher::new(ports.directory.clone(), mailer);
        let worker = NotificationWorker::spawn(receiver, dispatcher);
        let service = Arc::new(ClaimWorkflowService::new(ports, queue, config));
        info!("claims workflow service started");
        Self { service, worker }
    }

    pub fn service(&self) -> Arc<ClaimWorkflowService> {
        self.service.clone()
    }

    /// Stops the worker after any in-flight send; queued intents are abandoned
    pub async fn shutdown(self) -> WorkerStats {
        let stats = self.worker.shutdown().await;
        info!(
            delivered = stats.delivered,
            failed = stats.failed,
            abandoned = stats.abandoned,
            "claims workflow service stopped"
        );
        stats
    }
}

/// Runs the reminder sweep every `every` until `shutdown` flips to true
///
/// The first sweep happens one full interval after start. Returns the number
/// of sweeps performed.
pub async fn run_reminder_sweep(
    service: Arc<ClaimWorkflowService>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> usize {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;

    let mut sweeps = 0;
    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                sweeps += 1;
                match service.send_pending_reminders().await {
                    Ok(queued) => info!(queued, "reminder sweep finished"),
                    Err(e) => error!(error = %e, "reminder sweep failed"),
                }
            }
        }
    }
    info!(sweeps, "reminder sweep stopped");
    sweeps
}

/// Logs the health of each adapter; returns true if all are healthy
pub async fn log_health(adapters: &[Arc<dyn HealthCheckable>]) -> bool {
    let mut all_healthy = true;
    for adapter in adapters {
        let result = adapter.health_check().await;
        match result.status {
            AdapterHealth::Healthy => info!(
                adapter = %result.adapter_id,
                latency_ms = result.latency_ms,
                "adapter healthy"
            ),
            status => {
                all_healthy = false;
                warn!(
                    adapter = %result.adapter_id,
                    status = ?status,
                    message = result.message.as_deref().unwrap_or(""),
                    "adapter not healthy"
                );
            }
        }
    }
    all_healthy
}
