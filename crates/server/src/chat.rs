//! Conversational route: `POST /chat`.
//!
//! The handler is stateless between calls; callers resend the conversation
//! history they want the model to see, and the driver trims it to its own
//! window.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use bookdesk_agent::conversation::{ChatError, ConversationDriver};
use bookdesk_agent::llm::ChatMessage;
use bookdesk_core::domain::reservation::Reservation;
use bookdesk_core::domain::student::StudentInfo;
use bookdesk_core::notify::NotificationOutcome;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Clone)]
pub struct ChatState {
    driver: Arc<ConversationDriver>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub student: StudentInfo,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub reply: String,
    pub reservation_intent: bool,
    pub requires_student_info: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation: Option<Reservation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationOutcome>,
}

pub fn router(driver: Arc<ConversationDriver>) -> Router {
    Router::new().route("/chat", post(chat)).with_state(ChatState { driver })
}

async fn chat(
    State(state): State<ChatState>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorBody>)> {
    if body.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody { error: "message is required".to_string() }),
        ));
    }

    let outcome = state
        .driver
        .handle_message(&body.message, &body.student, &body.conversation_history)
        .await
        .map_err(|err| match err {
            ChatError::Model(inner) => {
                error!(
                    event_name = "server.chat.model_failed",
                    error = %inner,
                    "chat turn aborted by model failure"
                );
                (
                    StatusCode::BAD_GATEWAY,
                    Json(ErrorBody {
                        error: "The assistant is unavailable right now. Please try again."
                            .to_string(),
                    }),
                )
            }
            ChatError::Reservation(inner) => {
                error!(
                    event_name = "server.chat.reservation_failed",
                    error = %inner,
                    "chat turn aborted by reservation failure"
                );
                (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error: inner.to_string() }))
            }
        })?;

    info!(
        event_name = "server.chat.turn_completed",
        reservation_intent = outcome.reservation_intent,
        requires_student_info = outcome.requires_student_info,
        committed = outcome.reservation.is_some(),
        "chat turn completed"
    );

    Ok(Json(ChatResponse {
        reply: outcome.reply,
        reservation_intent: outcome.reservation_intent,
        requires_student_info: outcome.requires_student_info,
        reservation: outcome.reservation.map(|committed| committed.reservation),
        notification: outcome.notification,
    }))
}
