//! Conversation driver: the bounded tool-calling loop.
//!
//! Each call runs `Start -> ModelInvoked -> {Terminal | ToolsRequested}`;
//! tool rounds append the assistant message verbatim, execute its calls in
//! order, and append one correlated tool result per call before the next
//! model invocation. A reservation intent exits the loop: either a request
//! for the student's identity, or the synchronous write path (inventory
//! commit, ledger append, notification fan-out) followed by the final reply.

use std::sync::Arc;

use bookdesk_core::catalog::CatalogStore;
use bookdesk_core::domain::student::StudentInfo;
use bookdesk_core::errors::ReservationError;
use bookdesk_core::notify::{NotificationOutcome, Notifier};
use bookdesk_core::reserve::{CommittedReservation, ReservationService, ReserveRequest};
use thiserror::Error;
use tracing::{info, warn};

use crate::llm::{ChatMessage, ChatModel, LlmError};
use crate::tools::{ReservationIntent, ToolExecutor};

/// Upper bound on model round trips per user message. The loop terminates
/// regardless of how many tool calls the model keeps requesting.
pub const MAX_TOOL_ROUNDS: usize = 4;

/// How many trailing history messages are replayed ahead of the new user
/// message.
const HISTORY_WINDOW: usize = 6;

const SYSTEM_PROMPT: &str = "\
You are the campus library assistant. You help students find books in the \
catalog and reserve them.

Use the provided tools to search the catalog, list books, fetch details, and \
propose reservations. Only recommend books that exist in the catalog; never \
invent titles.

Borrowing rules: 7-day loan period, 2 book maximum, PHP 10/day late fee. \
Library hours: 8AM-5PM Monday-Friday.

Reservation process:
1. When a student asks to reserve a book, call reserve_book with the exact \
book id from the catalog.
2. A reservation is only committed once the student has provided their full \
name and email address.
3. Confirmed reservations are picked up at the circulation desk within 3 days.

Be friendly, concise, and clear.";

const FALLBACK_REPLY: &str = "I'm having trouble finishing that request right now. \
Please try again in a moment, or visit the circulation desk and our staff will help you.";

/// What one conversational turn produced.
#[derive(Clone, Debug)]
pub struct ChatOutcome {
    pub reply: String,
    pub reservation_intent: bool,
    pub requires_student_info: bool,
    pub reservation: Option<CommittedReservation>,
    pub notification: Option<NotificationOutcome>,
}

impl ChatOutcome {
    fn reply_only(reply: String, reservation_intent: bool) -> Self {
        Self {
            reply,
            reservation_intent,
            requires_student_info: false,
            reservation: None,
            notification: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Model(#[from] LlmError),
    /// Ledger rejection after rollback. Never mapped to a success reply.
    #[error("reservation could not be recorded: {0}")]
    Reservation(ReservationError),
}

pub struct ConversationDriver {
    model: Arc<dyn ChatModel>,
    executor: ToolExecutor,
    reservations: Arc<ReservationService>,
    notifier: Arc<dyn Notifier>,
}

impl ConversationDriver {
    pub fn new(
        model: Arc<dyn ChatModel>,
        catalog: Arc<CatalogStore>,
        reservations: Arc<ReservationService>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { model, executor: ToolExecutor::new(catalog), reservations, notifier }
    }

    pub async fn handle_message(
        &self,
        user_message: &str,
        student: &StudentInfo,
        history: &[ChatMessage],
    ) -> Result<ChatOutcome, ChatError> {
        let schema = ToolExecutor::schema();
        let mut transcript = seed_transcript(user_message, history);
        let mut saw_intent = false;

        for round in 0..MAX_TOOL_ROUNDS {
            let assistant = self.model.complete(&transcript, &schema).await?;

            if assistant.tool_calls.is_empty() {
                let reply = assistant.content.unwrap_or_else(|| FALLBACK_REPLY.to_string());
                return Ok(ChatOutcome::reply_only(reply, saw_intent));
            }

            info!(
                event_name = "agent.chat.tools_requested",
                round,
                tool_count = assistant.tool_calls.len(),
                "model requested tool calls"
            );

            let calls = assistant.tool_calls.clone();
            transcript.push(assistant);

            let mut intent: Option<ReservationIntent> = None;
            for call in &calls {
                let outcome = self.executor.execute(&call.function.name, &call.function.arguments);
                if outcome.intent.is_some() {
                    intent = outcome.intent;
                    saw_intent = true;
                }
                transcript.push(ChatMessage::tool(call.id.clone(), outcome.payload.to_string()));
            }

            if let Some(intent) = intent {
                if !student.is_complete() {
                    info!(
                        event_name = "agent.reservation.identity_missing",
                        book_id = %intent.book_id,
                        "reservation intent held pending student identity"
                    );
                    return Ok(identity_request(&intent));
                }
                return self.commit(intent, student).await;
            }
        }

        warn!(
            event_name = "agent.chat.loop_exceeded",
            max_rounds = MAX_TOOL_ROUNDS,
            "tool loop bound reached, returning fallback reply"
        );
        Ok(ChatOutcome::reply_only(FALLBACK_REPLY.to_string(), saw_intent))
    }

    async fn commit(
        &self,
        intent: ReservationIntent,
        student: &StudentInfo,
    ) -> Result<ChatOutcome, ChatError> {
        let request = ReserveRequest {
            book_id: intent.book_id.clone(),
            student_id: student.student_id.clone(),
            student_name: student.name.clone().unwrap_or_default(),
            student_email: student.email.clone().unwrap_or_default(),
        };

        match self.reservations.reserve(request) {
            Ok(committed) => {
                let notification =
                    self.notifier.notify(&committed.reservation, &committed.book).await;
                info!(
                    event_name = "agent.reservation.committed",
                    reservation_id = %committed.reservation.reservation_id,
                    book_id = %committed.book.book_id,
                    email_status = ?notification.email_status,
                    webhook_status = ?notification.webhook_status,
                    "reservation committed from conversation"
                );
                let reply = format!(
                    "Your reservation is confirmed! Reservation ID: {}. \"{}\" is shelved at {}. \
                     Please pick it up at the circulation desk within 3 days.",
                    committed.reservation.reservation_id,
                    committed.book.title,
                    committed.book.location,
                );
                Ok(ChatOutcome {
                    reply,
                    reservation_intent: true,
                    requires_student_info: false,
                    reservation: Some(committed),
                    notification: Some(notification),
                })
            }
            Err(ReservationError::NoCopies(_)) => Ok(ChatOutcome::reply_only(
                format!(
                    "I'm sorry, the last copy of \"{}\" was just reserved by someone else. \
                     Would you like me to look for a similar title?",
                    intent.book_title
                ),
                true,
            )),
            Err(ReservationError::NotFound(book_id)) => Ok(ChatOutcome::reply_only(
                format!(
                    "I couldn't find \"{}\" (id {book_id}) in our catalog, so nothing was \
                     reserved. Could you double-check the title?",
                    intent.book_title
                ),
                true,
            )),
            Err(ReservationError::Validation(message)) => {
                warn!(
                    event_name = "agent.reservation.invalid",
                    book_id = %intent.book_id,
                    error = %message,
                    "reservation request failed validation"
                );
                Ok(ChatOutcome {
                    reply: details_request_reply(&intent),
                    reservation_intent: true,
                    requires_student_info: true,
                    reservation: None,
                    notification: None,
                })
            }
            Err(error @ ReservationError::Ledger(_)) => Err(ChatError::Reservation(error)),
        }
    }
}

/// Follow-up when the commit was rejected as incomplete. Built from the
/// intent alone; internal validation wording never reaches the student.
fn details_request_reply(intent: &ReservationIntent) -> String {
    if intent.book_title.trim().is_empty() {
        "I couldn't start that reservation. Could you tell me which book you'd like, \
         along with your full name and email address?"
            .to_string()
    } else {
        format!(
            "I couldn't complete the reservation for \"{}\" yet. Could you confirm your \
             full name and email address?",
            intent.book_title
        )
    }
}

fn identity_request(intent: &ReservationIntent) -> ChatOutcome {
    ChatOutcome {
        reply: format!(
            "I'd be happy to reserve \"{}\" for you! I just need your full name and email \
             address to confirm the reservation.",
            intent.book_title
        ),
        reservation_intent: true,
        requires_student_info: true,
        reservation: None,
        notification: None,
    }
}

fn seed_transcript(user_message: &str, history: &[ChatMessage]) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    let mut transcript = Vec::with_capacity(history.len() - start + 2);
    transcript.push(ChatMessage::system(SYSTEM_PROMPT));
    transcript.extend(history[start..].iter().cloned());
    transcript.push(ChatMessage::user(user_message));
    transcript
}
