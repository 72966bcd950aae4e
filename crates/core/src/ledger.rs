use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::book::BookId;
use crate::domain::reservation::{Reservation, ReservationId, ReservationStatus};
use crate::errors::LedgerError;

/// Input for a ledger append. The reservation id and timestamp are assigned
/// at commit time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewReservation {
    pub book_id: BookId,
    pub book_title: String,
    pub student_id: Option<String>,
    pub student_name: String,
    pub student_email: String,
}

/// Append-only record of committed reservations. No update or delete is
/// exposed; a failed append is fatal to the reservation attempt since this
/// is the system of record.
///
/// Ids are random uuid-v4 rather than timestamps: a time-based scheme
/// collides for bursty concurrent commits within one clock tick.
#[derive(Default)]
pub struct ReservationLedger {
    entries: Mutex<Vec<Reservation>>,
}

impl ReservationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, request: NewReservation) -> Result<Reservation, LedgerError> {
        let reservation = Reservation {
            reservation_id: ReservationId(format!("RES-{}", Uuid::new_v4().simple())),
            book_id: request.book_id,
            book_title: request.book_title,
            student_id: request.student_id,
            student_name: request.student_name,
            student_email: request.student_email,
            created_at: Utc::now(),
            status: ReservationStatus::Reserved,
        };

        let mut entries = self
            .entries
            .lock()
            .map_err(|_| LedgerError::Append("ledger lock poisoned".to_string()))?;
        entries.push(reservation.clone());
        Ok(reservation)
    }

    pub fn find(&self, reservation_id: &str) -> Option<Reservation> {
        let entries = self.entries.lock().ok()?;
        entries.iter().find(|entry| entry.reservation_id.0 == reservation_id).cloned()
    }

    pub fn entries(&self) -> Vec<Reservation> {
        self.entries.lock().map(|entries| entries.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::{NewReservation, ReservationLedger};
    use crate::domain::book::BookId;
    use crate::domain::reservation::ReservationStatus;

    fn request(email: &str) -> NewReservation {
        NewReservation {
            book_id: BookId("B001".to_string()),
            book_title: "Programming in C".to_string(),
            student_id: Some("2220123".to_string()),
            student_name: "Maria Santos".to_string(),
            student_email: email.to_string(),
        }
    }

    #[test]
    fn append_assigns_fresh_prefixed_ids() {
        let ledger = ReservationLedger::new();

        let first = ledger.append(request("a@ub.edu.ph")).expect("append should succeed");
        let second = ledger.append(request("b@ub.edu.ph")).expect("append should succeed");

        assert!(first.reservation_id.0.starts_with("RES-"));
        assert_ne!(first.reservation_id, second.reservation_id);
        assert_eq!(first.status, ReservationStatus::Reserved);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn find_returns_the_committed_entry() {
        let ledger = ReservationLedger::new();
        let committed = ledger.append(request("a@ub.edu.ph")).expect("append should succeed");

        let found = ledger.find(&committed.reservation_id.0).expect("entry should exist");
        assert_eq!(found, committed);
        assert!(ledger.find("RES-missing").is_none());
    }

    #[test]
    fn entries_preserve_append_order() {
        let ledger = ReservationLedger::new();
        let first = ledger.append(request("a@ub.edu.ph")).expect("append should succeed");
        let second = ledger.append(request("b@ub.edu.ph")).expect("append should succeed");

        let entries = ledger.entries();
        assert_eq!(entries[0], first);
        assert_eq!(entries[1], second);
    }
}
