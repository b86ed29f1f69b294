//! Fire-and-forget notification dispatch.
//!
//! Callers hand a job to [`NotificationDispatcher`], which queues it for a
//! single background worker. Queueing never blocks and never fails the
//! caller: a full or closed queue drops the job with a warning, and delivery
//! errors are logged by the worker.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{NotificationKind, NotificationPayload},
};

/// Best-effort notification sink used by the order lifecycle.
pub trait Notifier: Send + Sync {
    fn notify(&self, recipient: Uuid, kind: NotificationKind, payload: NotificationPayload);
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationJob {
    pub recipient: Uuid,
    pub kind: NotificationKind,
    pub payload: NotificationPayload,
}

/// Performs the actual delivery of a queued job.
#[async_trait]
pub trait NotificationDelivery: Send + Sync {
    async fn deliver(&self, job: &NotificationJob) -> AppResult<()>;
}

/// Cloneable handle to the notification queue. Created once at startup.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<NotificationJob>,
}

/// Owner of the background worker; call [`NotificationWorker::shutdown`]
/// to drain queued jobs and stop it.
pub struct NotificationWorker {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl NotificationDispatcher {
    pub fn start(
        delivery: Arc<dyn NotificationDelivery>,
        capacity: usize,
    ) -> (Self, NotificationWorker) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run_worker(rx, shutdown_rx, delivery));
        tracing::info!(capacity, "notification worker started");
        (
            Self { tx },
            NotificationWorker {
                shutdown: shutdown_tx,
                handle,
            },
        )
    }
}

impl Notifier for NotificationDispatcher {
    fn notify(&self, recipient: Uuid, kind: NotificationKind, payload: NotificationPayload) {
        let job = NotificationJob {
            recipient,
            kind,
            payload,
        };
        match self.tx.try_send(job) {
            Ok(()) => tracing::debug!(%recipient, %kind, "notification queued"),
            Err(mpsc::error::TrySendError::Full(job)) => {
                tracing::warn!(recipient = %job.recipient, kind = %job.kind, "notification queue full, dropping");
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                tracing::warn!(recipient = %job.recipient, kind = %job.kind, "notification worker stopped, dropping");
            }
        }
    }
}

impl NotificationWorker {
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(err) = self.handle.await {
            tracing::error!(error = %err, "notification worker failed");
        }
        tracing::info!("notification worker stopped");
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<NotificationJob>,
    mut shutdown: oneshot::Receiver<()>,
    delivery: Arc<dyn NotificationDelivery>,
) {
    loop {
        tokio::select! {
            job = rx.recv() => match job {
                Some(job) => deliver_logged(delivery.as_ref(), job).await,
                None => break,
            },
            _ = &mut shutdown => {
                rx.close();
                while let Some(job) = rx.recv().await {
                    deliver_logged(delivery.as_ref(), job).await;
                }
                break;
            }
        }
    }
}

async fn deliver_logged(delivery: &dyn NotificationDelivery, job: NotificationJob) {
    if let Err(err) = delivery.deliver(&job).await {
        tracing::warn!(
            error = %err,
            recipient = %job.recipient,
            kind = %job.kind,
            "notification delivery failed"
        );
    }
}
