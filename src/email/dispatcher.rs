use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc::{self, error::TrySendError};

use super::{EmailMessage, EmailSender};
use crate::configuration::EmailSettings;

#[derive(Debug, Clone, Copy)]
pub struct DeliveryPolicy {
    /// Upper bound for a single send attempt.
    pub timeout: Duration,
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure.
    pub backoff: Duration,
}

impl DeliveryPolicy {
    pub fn from_settings(settings: &EmailSettings) -> Self {
        Self {
            timeout: settings.timeout(),
            max_attempts: settings.max_attempts.max(1),
            backoff: Duration::from_millis(500),
        }
    }
}

/// Handle to the background delivery task.
///
/// `dispatch` never waits on the mail server: messages go into a bounded
/// queue drained one at a time by a worker spawned on the runtime. While a
/// delivery is stalled the queue fills up and further messages are refused.
#[derive(Clone)]
pub struct NotificationDispatcher {
    queue: mpsc::Sender<EmailMessage>,
}

impl NotificationDispatcher {
    pub fn spawn(sender: Arc<dyn EmailSender>, policy: DeliveryPolicy, capacity: usize) -> Self {
        let (queue, receiver) = mpsc::channel(capacity.max(1));
        tokio::spawn(run_worker(receiver, sender, policy));
        Self { queue }
    }

    /// Returns whether the message was queued. A full or closed queue is
    /// logged and otherwise ignored.
    pub fn dispatch(&self, message: EmailMessage) -> bool {
        match self.queue.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                tracing::error!(subject = %message.subject, "Email queue is full, dropping message");
                false
            }
            Err(TrySendError::Closed(message)) => {
                tracing::error!(subject = %message.subject, "Email worker has stopped, dropping message");
                false
            }
        }
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<EmailMessage>,
    sender: Arc<dyn EmailSender>,
    policy: DeliveryPolicy,
) {
    while let Some(message) = receiver.recv().await {
        deliver(sender.as_ref(), &message, policy).await;
    }
    tracing::debug!("Email queue closed, worker exiting");
}

async fn deliver(sender: &dyn EmailSender, message: &EmailMessage, policy: DeliveryPolicy) -> bool {
    let mut backoff = policy.backoff;
    for attempt in 1..=policy.max_attempts {
        match tokio::time::timeout(policy.timeout, sender.send(message)).await {
            Ok(Ok(())) => {
                tracing::info!(subject = %message.subject, attempt, "Email delivered");
                return true;
            }
            Ok(Err(e)) => {
                tracing::warn!(error.cause_chain = ?e, attempt, "Email delivery attempt failed");
            }
            Err(_) => {
                tracing::warn!(attempt, timeout = ?policy.timeout, "Email delivery attempt timed out");
            }
        }
        if attempt < policy.max_attempts {
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }

    tracing::error!(
        subject = %message.subject,
        attempts = policy.max_attempts,
        "Giving up on email delivery"
    );
    false
}
