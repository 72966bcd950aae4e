use std::sync::Arc;

use crate::catalog::CatalogStore;
use crate::domain::book::Book;
use crate::domain::reservation::Reservation;
use crate::domain::student::valid_email;
use crate::errors::ReservationError;
use crate::ledger::{NewReservation, ReservationLedger};

/// What the caller must supply to commit a reservation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReserveRequest {
    pub book_id: String,
    pub student_id: Option<String>,
    pub student_name: String,
    pub student_email: String,
}

/// A reservation that made it through the inventory commit and the ledger,
/// together with the book snapshot and the count left behind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommittedReservation {
    pub reservation: Reservation,
    pub book: Book,
    pub remaining: u32,
}

/// The write path: validate, atomically take a copy, append to the ledger.
///
/// Decrement and append form one transactional boundary: if the append
/// fails after a successful decrement, the copy is restored so stock and
/// ledger never diverge. Notification fan-out is deliberately outside this
/// boundary; its failures never undo a commit.
pub struct ReservationService {
    catalog: Arc<CatalogStore>,
    ledger: Arc<ReservationLedger>,
}

impl ReservationService {
    pub fn new(catalog: Arc<CatalogStore>, ledger: Arc<ReservationLedger>) -> Self {
        Self { catalog, ledger }
    }

    pub fn reserve(
        &self,
        request: ReserveRequest,
    ) -> Result<CommittedReservation, ReservationError> {
        validate(&request)?;

        let book = self
            .catalog
            .get(&request.book_id)
            .ok_or_else(|| ReservationError::NotFound(request.book_id.clone()))?;

        let outcome = self.catalog.try_decrement(&request.book_id)?;
        if !outcome.success {
            return Err(ReservationError::NoCopies(request.book_id));
        }

        let appended = self.ledger.append(NewReservation {
            book_id: book.book_id.clone(),
            book_title: book.title.clone(),
            student_id: request.student_id,
            student_name: request.student_name,
            student_email: request.student_email,
        });

        match appended {
            Ok(reservation) => {
                Ok(CommittedReservation { reservation, book, remaining: outcome.remaining })
            }
            Err(error) => {
                // System of record rejected the write; give the copy back.
                let _ = self.catalog.restore(&request.book_id);
                Err(error.into())
            }
        }
    }
}

fn validate(request: &ReserveRequest) -> Result<(), ReservationError> {
    if request.book_id.trim().is_empty() {
        return Err(ReservationError::Validation("bookId is required".to_string()));
    }
    if request.student_name.trim().is_empty() {
        return Err(ReservationError::Validation("studentName is required".to_string()));
    }
    if !valid_email(&request.student_email) {
        return Err(ReservationError::Validation(
            "studentEmail must be a valid email address".to_string(),
        ));
    }
    Ok(())
}
