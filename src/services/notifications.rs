//! Fire-and-forget notification tasks.
//!
//! Notifications are pushed onto an unbounded channel and delivered by a
//! background worker, so the request that triggered them never waits on
//! delivery. Failed deliveries are retried with a linear backoff up to the
//! configured attempt count, then logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::error::AppResult;

const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    WholesaleSubmission,
    SoleProSubmission,
    BindRequest { quote_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub application_id: i64,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn new(application_id: i64, kind: NotificationKind) -> Self {
        Self {
            application_id,
            kind,
        }
    }
}

/// Outbound notification tasks.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_wholesale_submission(&self, application_id: i64) -> AppResult<()>;

    async fn notify_sole_pro_submission(&self, application_id: i64) -> AppResult<()>;

    async fn notify_bind_request(&self, application_id: i64, quote_id: &str) -> AppResult<()>;
}

/// Notifier that only records the task in the log.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify_wholesale_submission(&self, application_id: i64) -> AppResult<()> {
        info!("Wholesale submission for application {}", application_id);
        Ok(())
    }

    async fn notify_sole_pro_submission(&self, application_id: i64) -> AppResult<()> {
        info!("Sole proprietor submission for application {}", application_id);
        Ok(())
    }

    async fn notify_bind_request(&self, application_id: i64, quote_id: &str) -> AppResult<()> {
        info!(
            "Bind request for application {} (quote {})",
            application_id, quote_id
        );
        Ok(())
    }
}

async fn deliver(notifier: &dyn Notifier, notification: &Notification) -> AppResult<()> {
    match &notification.kind {
        NotificationKind::WholesaleSubmission => {
            notifier
                .notify_wholesale_submission(notification.application_id)
                .await
        }
        NotificationKind::SoleProSubmission => {
            notifier
                .notify_sole_pro_submission(notification.application_id)
                .await
        }
        NotificationKind::BindRequest { quote_id } => {
            notifier
                .notify_bind_request(notification.application_id, quote_id)
                .await
        }
    }
}

/// Sender side of the notification work queue.
#[derive(Clone)]
pub struct NotificationQueue {
    sender: mpsc::UnboundedSender<Notification>,
}

impl NotificationQueue {
    /// Start the delivery worker. Must be called inside a tokio runtime.
    pub fn start(notifier: Arc<dyn Notifier>, max_attempts: u32) -> Self {
        Self::start_with_backoff(notifier, max_attempts, DEFAULT_BACKOFF)
    }

    pub fn start_with_backoff(
        notifier: Arc<dyn Notifier>,
        max_attempts: u32,
        backoff: Duration,
    ) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Notification>();
        let max_attempts = max_attempts.max(1);

        tokio::spawn(async move {
            info!(
                "Starting notification worker (max attempts: {})",
                max_attempts
            );

            while let Some(notification) = receiver.recv().await {
                let notifier = notifier.clone();
                // Each delivery retries on its own task.
                tokio::spawn(async move {
                    for attempt in 1..=max_attempts {
                        match deliver(notifier.as_ref(), &notification).await {
                            Ok(()) => return,
                            Err(e) if attempt < max_attempts => {
                                warn!(
                                    "Notification {:?} for application {} failed (attempt {}/{}): {}",
                                    notification.kind,
                                    notification.application_id,
                                    attempt,
                                    max_attempts,
                                    e
                                );
                                tokio::time::sleep(backoff * attempt).await;
                            }
                            Err(e) => {
                                error!(
                                    "Giving up on notification {:?} for application {}: {}",
                                    notification.kind, notification.application_id, e
                                );
                            }
                        }
                    }
                });
            }

            info!("Notification worker stopped");
        });

        Self { sender }
    }

    /// Queue a notification. Never blocks and never fails the caller.
    pub fn dispatch(&self, notification: Notification) {
        if let Err(e) = self.sender.send(notification) {
            warn!(
                "Notification worker is not running; dropping {:?} for application {}",
                e.0.kind, e.0.application_id
            );
        }
    }
}
