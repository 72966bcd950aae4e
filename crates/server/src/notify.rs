//! Outbound delivery channels for committed reservations.
//!
//! The fan-out runs after the inventory commit and ledger append. Channels
//! are independent: both are attempted concurrently, a failure on one never
//! blocks or rolls back the other, and nothing here can undo a reservation.
//! There is no retry; a failed delivery is reported as a status flag.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bookdesk_core::config::AppConfig;
use bookdesk_core::domain::book::Book;
use bookdesk_core::domain::reservation::Reservation;
use bookdesk_core::notify::{
    DeliveryStatus, EmailSender, NotificationOutcome, Notifier, NotifyError, WebhookSink,
};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{info, warn};

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";
pub const WEBHOOK_SECRET_HEADER: &str = "x-bookdesk-webhook-secret";

/// Confirmation email via the SendGrid v3 send API.
pub struct SendGridMailer {
    client: Client,
    api_key: SecretString,
    from_address: String,
    timeout: Duration,
}

impl SendGridMailer {
    pub fn new(api_key: SecretString, from_address: String, timeout_secs: u64) -> Self {
        Self {
            client: Client::new(),
            api_key,
            from_address,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    fn message_body(&self, reservation: &Reservation, book: &Book) -> serde_json::Value {
        let text = format!(
            "Hi {name},\n\nYour reservation is confirmed.\n\nReservation ID: {id}\nBook: {title} by {author}\nLocation: {location}\n\nPlease pick up your book at the circulation desk within 3 days.\n\nCampus Library",
            name = reservation.student_name,
            id = reservation.reservation_id,
            title = book.title,
            author = book.author,
            location = book.location,
        );
        json!({
            "personalizations": [{
                "to": [{"email": reservation.student_email, "name": reservation.student_name}]
            }],
            "from": {"email": self.from_address, "name": "Campus Library"},
            "subject": format!("Reservation confirmed: {}", book.title),
            "content": [{"type": "text/plain", "value": text}],
        })
    }
}

#[async_trait]
impl EmailSender for SendGridMailer {
    async fn send_confirmation(
        &self,
        reservation: &Reservation,
        book: &Book,
    ) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(SENDGRID_SEND_URL)
            .bearer_auth(self.api_key.expose_secret())
            .timeout(self.timeout)
            .json(&self.message_body(reservation, book))
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    NotifyError::Timeout(self.timeout.as_secs())
                } else {
                    NotifyError::Delivery(error.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::Delivery(format!("sendgrid returned {status}")))
        }
    }
}

/// Reservation events posted to an automation-platform webhook.
pub struct AutomationWebhook {
    client: Client,
    url: String,
    secret: Option<SecretString>,
    timeout: Duration,
}

impl AutomationWebhook {
    pub fn new(url: String, secret: Option<SecretString>, timeout_secs: u64) -> Self {
        Self { client: Client::new(), url, secret, timeout: Duration::from_secs(timeout_secs) }
    }
}

#[async_trait]
impl WebhookSink for AutomationWebhook {
    async fn publish(&self, reservation: &Reservation, book: &Book) -> Result<(), NotifyError> {
        let payload = json!({
            "event": "reservation.created",
            "reservationId": reservation.reservation_id,
            "bookId": book.book_id,
            "bookTitle": book.title,
            "location": book.location,
            "studentId": reservation.student_id,
            "studentName": reservation.student_name,
            "studentEmail": reservation.student_email,
            "createdAt": reservation.created_at.to_rfc3339(),
        });

        let mut request = self.client.post(&self.url).timeout(self.timeout).json(&payload);
        if let Some(secret) = &self.secret {
            request = request.header(WEBHOOK_SECRET_HEADER, secret.expose_secret());
        }

        let response = request.send().await.map_err(|error| {
            if error.is_timeout() {
                NotifyError::Timeout(self.timeout.as_secs())
            } else {
                NotifyError::Delivery(error.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::Delivery(format!("webhook returned {status}")))
        }
    }
}

/// Concurrent fan-out over the configured channels. An unconfigured channel
/// reports `Failed` with a `NotConfigured` reason in the log rather than
/// pretending the delivery happened.
pub struct NotificationFanout {
    email: Option<Arc<dyn EmailSender>>,
    webhook: Option<Arc<dyn WebhookSink>>,
}

impl NotificationFanout {
    pub fn new(email: Option<Arc<dyn EmailSender>>, webhook: Option<Arc<dyn WebhookSink>>) -> Self {
        Self { email, webhook }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let email = match (&config.email.api_key, &config.email.from_address) {
            (Some(api_key), Some(from_address)) => Some(Arc::new(SendGridMailer::new(
                api_key.clone(),
                from_address.clone(),
                config.email.timeout_secs,
            )) as Arc<dyn EmailSender>),
            _ => None,
        };
        let webhook = config.webhook.url.as_ref().map(|url| {
            Arc::new(AutomationWebhook::new(
                url.clone(),
                config.webhook.secret.clone(),
                config.webhook.timeout_secs,
            )) as Arc<dyn WebhookSink>
        });
        Self { email, webhook }
    }
}

#[async_trait]
impl Notifier for NotificationFanout {
    async fn notify(&self, reservation: &Reservation, book: &Book) -> NotificationOutcome {
        let email_delivery = async {
            match &self.email {
                Some(sender) => sender.send_confirmation(reservation, book).await,
                None => Err(NotifyError::NotConfigured("email")),
            }
        };
        let webhook_delivery = async {
            match &self.webhook {
                Some(sink) => sink.publish(reservation, book).await,
                None => Err(NotifyError::NotConfigured("webhook")),
            }
        };

        let (email_result, webhook_result) = tokio::join!(email_delivery, webhook_delivery);

        NotificationOutcome {
            email_status: channel_status("email", email_result, reservation),
            webhook_status: channel_status("webhook", webhook_result, reservation),
        }
    }
}

fn channel_status(
    channel: &'static str,
    result: Result<(), NotifyError>,
    reservation: &Reservation,
) -> DeliveryStatus {
    match result {
        Ok(()) => {
            info!(
                event_name = "notify.delivery.sent",
                channel,
                reservation_id = %reservation.reservation_id,
                "reservation notification delivered"
            );
            DeliveryStatus::Sent
        }
        Err(error) => {
            warn!(
                event_name = "notify.delivery.failed",
                channel,
                reservation_id = %reservation.reservation_id,
                error = %error,
                "reservation notification failed, reservation stands"
            );
            DeliveryStatus::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use bookdesk_core::domain::book::{Book, BookId};
    use bookdesk_core::domain::reservation::{Reservation, ReservationId, ReservationStatus};
    use bookdesk_core::notify::{
        DeliveryStatus, EmailSender, Notifier, NotifyError, WebhookSink,
    };
    use chrono::Utc;

    use super::NotificationFanout;

    struct StubEmail {
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EmailSender for StubEmail {
        async fn send_confirmation(
            &self,
            _reservation: &Reservation,
            _book: &Book,
        ) -> Result<(), NotifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(NotifyError::Delivery("smtp said no".to_string()))
            } else {
                Ok(())
            }
        }
    }

    struct StubWebhook {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl WebhookSink for StubWebhook {
        async fn publish(&self, _reservation: &Reservation, _book: &Book) -> Result<(), NotifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn fixtures() -> (Reservation, Book) {
        let reservation = Reservation {
            reservation_id: ReservationId("RES-test".to_string()),
            book_id: BookId("B001".to_string()),
            book_title: "Programming in C".to_string(),
            student_id: Some("2220123".to_string()),
            student_name: "Maria Santos".to_string(),
            student_email: "2220123@ub.edu.ph".to_string(),
            created_at: Utc::now(),
            status: ReservationStatus::Reserved,
        };
        let book = Book {
            book_id: BookId("B001".to_string()),
            title: "Programming in C".to_string(),
            author: "Dennis Ritchie".to_string(),
            category: "Programming".to_string(),
            location: "2nd Floor - Section A".to_string(),
            available_copies: 4,
        };
        (reservation, book)
    }

    #[tokio::test]
    async fn email_failure_does_not_stop_the_webhook() {
        let email_calls = Arc::new(AtomicUsize::new(0));
        let webhook_calls = Arc::new(AtomicUsize::new(0));
        let fanout = NotificationFanout::new(
            Some(Arc::new(StubEmail { fail: true, calls: Arc::clone(&email_calls) })),
            Some(Arc::new(StubWebhook { calls: Arc::clone(&webhook_calls) })),
        );
        let (reservation, book) = fixtures();

        let outcome = fanout.notify(&reservation, &book).await;

        assert_eq!(outcome.email_status, DeliveryStatus::Failed);
        assert_eq!(outcome.webhook_status, DeliveryStatus::Sent);
        assert_eq!(email_calls.load(Ordering::SeqCst), 1);
        assert_eq!(webhook_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn both_channels_sent_when_healthy() {
        let fanout = NotificationFanout::new(
            Some(Arc::new(StubEmail { fail: false, calls: Arc::new(AtomicUsize::new(0)) })),
            Some(Arc::new(StubWebhook { calls: Arc::new(AtomicUsize::new(0)) })),
        );
        let (reservation, book) = fixtures();

        let outcome = fanout.notify(&reservation, &book).await;

        assert_eq!(outcome.email_status, DeliveryStatus::Sent);
        assert_eq!(outcome.webhook_status, DeliveryStatus::Sent);
    }

    #[tokio::test]
    async fn unconfigured_channels_report_failed() {
        let fanout = NotificationFanout::new(None, None);
        let (reservation, book) = fixtures();

        let outcome = fanout.notify(&reservation, &book).await;

        assert_eq!(outcome.email_status, DeliveryStatus::Failed);
        assert_eq!(outcome.webhook_status, DeliveryStatus::Failed);
    }
}
