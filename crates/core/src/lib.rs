pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod ledger;
pub mod notify;
pub mod reserve;

pub use catalog::{CatalogStore, CommitOutcome};
pub use domain::book::{Book, BookId};
pub use domain::reservation::{Reservation, ReservationId, ReservationStatus};
pub use domain::student::{valid_email, StudentInfo};
pub use errors::{CatalogError, LedgerError, ReservationError};
pub use ledger::{NewReservation, ReservationLedger};
pub use notify::{
    DeliveryStatus, EmailSender, NotificationOutcome, Notifier, NotifyError, WebhookSink,
};
pub use reserve::{CommittedReservation, ReservationService, ReserveRequest};
