use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("book `{0}` not found")]
    NotFound(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger append failed: {0}")]
    Append(String),
}

/// Terminal outcomes of a reservation attempt. `Validation`, `NotFound`, and
/// `NoCopies` are user-visible and carry no side effect; `Ledger` means the
/// system of record rejected the write after the stock decrement was rolled
/// back.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ReservationError {
    #[error("invalid reservation request: {0}")]
    Validation(String),
    #[error("book `{0}` not found")]
    NotFound(String),
    #[error("no copies of `{0}` available")]
    NoCopies(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<CatalogError> for ReservationError {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::NotFound(book_id) => Self::NotFound(book_id),
        }
    }
}
