//! Direct reservation route: `POST /reserve`.
//!
//! The write path is synchronous: validate, commit inventory, append to the
//! ledger, then fan out notifications. Delivery failures surface as status
//! flags on a successful response, never as an error status.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use bookdesk_core::domain::reservation::Reservation;
use bookdesk_core::errors::ReservationError;
use bookdesk_core::notify::{DeliveryStatus, Notifier};
use bookdesk_core::reserve::{ReservationService, ReserveRequest};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const PICKUP_NOTE: &str = "Please pick up your book at the circulation desk within 3 days.";

#[derive(Clone)]
pub struct ReserveState {
    reservations: Arc<ReservationService>,
    notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveBody {
    #[serde(default)]
    pub book_id: String,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub student_email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveResponse {
    pub success: bool,
    pub reservation_id: String,
    pub message: String,
    pub details: ReserveDetails,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveDetails {
    pub reservation: Reservation,
    pub location: String,
    pub remaining_copies: u32,
    pub email_status: DeliveryStatus,
    pub webhook_status: DeliveryStatus,
    pub pickup_note: &'static str,
}

/// Error body for the reservation contract. `success` is always present so
/// clients keying on it never have to treat an absent field as failure.
#[derive(Debug, Serialize)]
pub struct ReserveErrorBody {
    pub success: bool,
    pub error: String,
}

pub fn router(reservations: Arc<ReservationService>, notifier: Arc<dyn Notifier>) -> Router {
    Router::new()
        .route("/reserve", post(reserve))
        .with_state(ReserveState { reservations, notifier })
}

async fn reserve(
    State(state): State<ReserveState>,
    Json(body): Json<ReserveBody>,
) -> Result<Json<ReserveResponse>, (StatusCode, Json<ReserveErrorBody>)> {
    let request = ReserveRequest {
        book_id: body.book_id,
        student_id: body.student_id,
        student_name: body.student_name,
        student_email: body.student_email,
    };

    let committed = state.reservations.reserve(request).map_err(error_response)?;
    let notification =
        state.notifier.notify(&committed.reservation, &committed.book).await;

    info!(
        event_name = "server.reserve.committed",
        reservation_id = %committed.reservation.reservation_id,
        book_id = %committed.book.book_id,
        remaining = committed.remaining,
        email_status = ?notification.email_status,
        webhook_status = ?notification.webhook_status,
        "reservation committed via direct route"
    );

    let message = format!(
        "Reserved \"{}\" for {}. {}",
        committed.book.title, committed.reservation.student_name, PICKUP_NOTE
    );
    Ok(Json(ReserveResponse {
        success: true,
        reservation_id: committed.reservation.reservation_id.0.clone(),
        message,
        details: ReserveDetails {
            reservation: committed.reservation,
            location: committed.book.location,
            remaining_copies: committed.remaining,
            email_status: notification.email_status,
            webhook_status: notification.webhook_status,
            pickup_note: PICKUP_NOTE,
        },
    }))
}

fn error_response(error: ReservationError) -> (StatusCode, Json<ReserveErrorBody>) {
    let status = match &error {
        ReservationError::Validation(_) => StatusCode::BAD_REQUEST,
        ReservationError::NotFound(_) => StatusCode::NOT_FOUND,
        ReservationError::NoCopies(_) => StatusCode::CONFLICT,
        ReservationError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(
        event_name = "server.reserve.rejected",
        status = status.as_u16(),
        error = %error,
        "reservation rejected"
    );
    (status, Json(ReserveErrorBody { success: false, error: error.to_string() }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use bookdesk_core::catalog::CatalogStore;
    use bookdesk_core::domain::book::Book;
    use bookdesk_core::domain::reservation::Reservation;
    use bookdesk_core::ledger::ReservationLedger;
    use bookdesk_core::notify::{DeliveryStatus, NotificationOutcome, Notifier};
    use bookdesk_core::reserve::ReservationService;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    use crate::reserve::router;

    struct FixedNotifier {
        outcome: NotificationOutcome,
    }

    #[async_trait]
    impl Notifier for FixedNotifier {
        async fn notify(&self, _reservation: &Reservation, _book: &Book) -> NotificationOutcome {
            self.outcome
        }
    }

    fn app_with(
        catalog: Arc<CatalogStore>,
        email_status: DeliveryStatus,
    ) -> (Router, Arc<ReservationLedger>) {
        let ledger = Arc::new(ReservationLedger::new());
        let reservations =
            Arc::new(ReservationService::new(catalog, Arc::clone(&ledger)));
        let notifier = Arc::new(FixedNotifier {
            outcome: NotificationOutcome { email_status, webhook_status: DeliveryStatus::Sent },
        });
        (router(reservations, notifier), ledger)
    }

    fn post_reserve(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/reserve")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn valid_body(book_id: &str) -> Value {
        json!({
            "bookId": book_id,
            "studentId": "2220123",
            "studentName": "Maria Santos",
            "studentEmail": "2220123@ub.edu.ph",
        })
    }

    #[tokio::test]
    async fn successful_reservation_returns_details_and_pickup_note() {
        let catalog = Arc::new(CatalogStore::seed());
        let (app, ledger) = app_with(Arc::clone(&catalog), DeliveryStatus::Sent);

        let response = app.oneshot(post_reserve(valid_body("B003"))).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert!(body["reservationId"].as_str().expect("id").starts_with("RES-"));
        assert_eq!(body["details"]["location"], "2nd Floor - Section B");
        assert_eq!(body["details"]["remainingCopies"], 3);
        assert_eq!(body["details"]["emailStatus"], "sent");
        assert!(body["details"]["pickupNote"].as_str().expect("note").contains("within 3 days"));
        assert_eq!(ledger.len(), 1);
        assert_eq!(catalog.get("B003").expect("book exists").available_copies, 3);
    }

    #[tokio::test]
    async fn missing_email_is_a_bad_request_with_no_side_effect() {
        let catalog = Arc::new(CatalogStore::seed());
        let (app, ledger) = app_with(Arc::clone(&catalog), DeliveryStatus::Sent);

        let response = app
            .oneshot(post_reserve(json!({"bookId": "B001", "studentName": "Maria Santos"})))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().expect("error").contains("studentEmail"));
        assert!(ledger.is_empty());
        assert_eq!(catalog.get("B001").expect("book exists").available_copies, 5);
    }

    #[tokio::test]
    async fn unknown_book_is_not_found() {
        let (app, _) = app_with(Arc::new(CatalogStore::seed()), DeliveryStatus::Sent);

        let response = app.oneshot(post_reserve(valid_body("B999"))).await.expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().expect("error").contains("B999"));
    }

    #[tokio::test]
    async fn exhausted_book_is_a_conflict() {
        let catalog = Arc::new(CatalogStore::seed());
        while catalog.get("B002").expect("book exists").available_copies > 0 {
            catalog.try_decrement("B002").expect("book exists");
        }
        let (app, _) = app_with(catalog, DeliveryStatus::Sent);

        let response = app.oneshot(post_reserve(valid_body("B002"))).await.expect("response");
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn failed_email_still_reports_a_successful_reservation() {
        let catalog = Arc::new(CatalogStore::seed());
        let (app, ledger) = app_with(catalog, DeliveryStatus::Failed);

        let response = app.oneshot(post_reserve(valid_body("B001"))).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["details"]["emailStatus"], "failed");
        assert_eq!(body["details"]["webhookStatus"], "sent");
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_requests_for_the_last_copy_yield_one_winner() {
        let catalog = Arc::new(CatalogStore::seed());
        // Drain B002 down to its final copy.
        catalog.try_decrement("B002").expect("book exists");
        catalog.try_decrement("B002").expect("book exists");
        let (app, ledger) = app_with(Arc::clone(&catalog), DeliveryStatus::Sent);

        let first = app.clone().oneshot(post_reserve(valid_body("B002")));
        let second = app.oneshot(post_reserve(valid_body("B002")));
        let (first, second) = tokio::join!(first, second);

        let statuses = [
            first.expect("response").status(),
            second.expect("response").status(),
        ];
        assert!(statuses.contains(&StatusCode::OK));
        assert!(statuses.contains(&StatusCode::CONFLICT));
        assert_eq!(catalog.get("B002").expect("book exists").available_copies, 0);
        assert_eq!(ledger.len(), 1);
    }
}
