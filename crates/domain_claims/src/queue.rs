//! Notification queue and its single background worker
//!
//! Producers push intents onto an unbounded FIFO and never wait; one worker
//! task drains it and sends sequentially, so mail latency never shows up in
//! a claim transition.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::notification::{NotificationDispatcher, NotificationIntent};

/// Producer side of the notification FIFO
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    sender: mpsc::UnboundedSender<NotificationIntent>,
}

impl NotificationQueue {
    /// Creates the queue and the receiver the worker will drain
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NotificationIntent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Enqueues an intent without blocking
    ///
    /// Returns false if the worker is gone; the intent is dropped and logged.
    pub fn enqueue(&self, intent: NotificationIntent) -> bool {
        match self.sender.send(intent) {
            Ok(()) => true,
            Err(mpsc::error::SendError(intent)) => {
                error!(template = %intent.template, "notification dropped: queue is closed");
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Counters reported when the worker stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub delivered: usize,
    pub failed: usize,
    /// Intents still queued when shutdown was requested
    pub abandoned: usize,
}

/// The single consumer of the notification queue
pub struct NotificationWorker;

impl NotificationWorker {
    /// Starts draining `receiver` on a background task
    pub fn spawn(
        receiver: mpsc::UnboundedReceiver<NotificationIntent>,
        dispatcher: NotificationDispatcher,
    ) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(Self::run(receiver, dispatcher, shutdown_rx));
        WorkerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(
        mut receiver: mpsc::UnboundedReceiver<NotificationIntent>,
        dispatcher: NotificationDispatcher,
        mut shutdown: watch::Receiver<bool>,
    ) -> WorkerStats {
        let mut stats = WorkerStats::default();
        info!("notification worker started");

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    // A dropped handle counts as a shutdown request
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                next = receiver.recv() => {
                    let Some(intent) = next else { break };
                    match dispatcher.notify(&intent).await {
                        Ok(_) => stats.delivered += 1,
                        Err(e) => {
                            stats.failed += 1;
                            warn!(template = %intent.template, error = %e, "notification delivery failed");
                        }
                    }
                }
            }
        }

        receiver.close();
        while receiver.try_recv().is_ok() {
            stats.abandoned += 1;
        }
        if stats.abandoned > 0 {
            warn!(abandoned = stats.abandoned, "notification worker stopped with undelivered intents");
        }
        info!(
            delivered = stats.delivered,
            failed = stats.failed,
            "notification worker stopped"
        );
        stats
    }
}

/// Control handle for a running worker
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<WorkerStats>,
}

impl WorkerHandle {
    /// Stops pulling new intents, lets an in-flight send finish, and joins
    pub async fn shutdown(self) -> WorkerStats {
        let _ = self.shutdown.send(true);
        Self::join(self.task).await
    }

    /// Waits for the worker to drain the queue after every producer is dropped
    pub async fn wait(self) -> WorkerStats {
        let WorkerHandle { shutdown, task } = self;
        let stats = Self::join(task).await;
        drop(shutdown);
        stats
    }

    async fn join(task: JoinHandle<WorkerStats>) -> WorkerStats {
        match task.await {
            Ok(stats) => stats,
            Err(e) => {
                error!(error = %e, "notification worker task failed");
                WorkerStats::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use core_kernel::StaffId;
    use crate::notification::{Recipient, TemplateKind};
    use crate::ports::mock::{MockMailSender, MockStaffDirectory};
    use crate::ports::StaffProfile;

    fn setup() -> (NotificationDispatcher, Arc<MockMailSender>, StaffId) {
        let owner = StaffProfile {
            id: StaffId::new(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            department: "Engineering".to_string(),
            role: "staff".to_string(),
        };
        let owner_id = owner.id;
        let mailer = Arc::new(MockMailSender::new());
        let dispatcher = NotificationDispatcher::new(
            Arc::new(MockStaffDirectory::new().with_staff(owner)),
            mailer.clone(),
        );
        (dispatcher, mailer, owner_id)
    }

    fn intent(template: TemplateKind, owner: StaffId) -> NotificationIntent {
        NotificationIntent::new(template, vec![Recipient::ClaimOwner(owner)], Vec::new())
    }

    #[tokio::test]
    async fn test_worker_delivers_in_fifo_order() {
        let (dispatcher, mailer, owner) = setup();
        let (queue, receiver) = NotificationQueue::new();
        let handle = NotificationWorker::spawn(receiver, dispatcher);

        assert!(queue.enqueue(intent(TemplateKind::Approved, owner)));
        assert!(queue.enqueue(intent(TemplateKind::Paid, owner)));
        drop(queue);

        let stats = handle.wait().await;
        assert_eq!(stats.delivered, 2);
        let subjects: Vec<_> = mailer.sent().await.into_iter().map(|m| m.subject).collect();
        assert!(subjects[0].contains("approved"));
        assert!(subjects[1].contains("paid"));
    }

    #[tokio::test]
    async fn test_delivery_failure_is_counted_not_fatal() {
        let (dispatcher, mailer, owner) = setup();
        mailer.set_failing(true);
        let (queue, receiver) = NotificationQueue::new();
        let handle = NotificationWorker::spawn(receiver, dispatcher);

        queue.enqueue(intent(TemplateKind::Rejected, owner));
        queue.enqueue(intent(TemplateKind::Returned, owner));
        drop(queue);

        let stats = handle.wait().await;
        assert_eq!(stats, WorkerStats { delivered: 0, failed: 2, abandoned: 0 });
    }

    #[tokio::test]
    async fn test_shutdown_abandons_unpulled_intents() {
        let (dispatcher, mailer, owner) = setup();
        let (queue, receiver) = NotificationQueue::new();
        let handle = NotificationWorker::spawn(receiver, dispatcher);

        // Single-threaded test runtime: the worker has not been polled yet
        for _ in 0..3 {
            queue.enqueue(intent(TemplateKind::Submitted, owner));
        }
        let stats = handle.shutdown().await;

        assert_eq!(stats.abandoned, 3);
        assert!(mailer.sent().await.is_empty());
        assert!(queue.is_closed());
        assert!(!queue.enqueue(intent(TemplateKind::Paid, owner)));
    }
}
