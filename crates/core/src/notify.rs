use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::domain::book::Book;
use crate::domain::reservation::Reservation;

/// Outcome flag for a single delivery attempt. There is no retry in the
/// core; a timeout or transport failure simply surfaces as `Failed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

/// Per-channel delivery flags for one committed reservation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOutcome {
    pub email_status: DeliveryStatus,
    pub webhook_status: DeliveryStatus,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),
    #[error("delivery timed out after {0}s")]
    Timeout(u64),
    #[error("channel not configured: {0}")]
    NotConfigured(&'static str),
}

/// Confirmation email channel.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_confirmation(
        &self,
        reservation: &Reservation,
        book: &Book,
    ) -> Result<(), NotifyError>;
}

/// Automation-platform webhook channel.
#[async_trait]
pub trait WebhookSink: Send + Sync {
    async fn publish(&self, reservation: &Reservation, book: &Book) -> Result<(), NotifyError>;
}

/// Fan-out of a committed reservation to every downstream channel. The
/// implementation must keep deliveries independent: one channel failing
/// never prevents, retries, or rolls back the other, and never undoes the
/// inventory commit or ledger entry that preceded it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, reservation: &Reservation, book: &Book) -> NotificationOutcome;
}
