use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookId(pub String);

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalog snapshot of a single title. `available_copies` is the live count
/// as of the moment the snapshot was taken; the authoritative counter lives
/// in the inventory store and is only mutated through `try_decrement`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub category: String,
    pub location: String,
    pub available_copies: u32,
}
