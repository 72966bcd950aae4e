use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::domain::book::{Book, BookId};
use crate::errors::CatalogError;

/// Result of an atomic decrement attempt. `success == false` means the book
/// exists but has no copies left, which callers must keep distinct from an
/// unknown book id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitOutcome {
    pub success: bool,
    pub remaining: u32,
}

struct BookRecord {
    book_id: BookId,
    title: String,
    author: String,
    category: String,
    location: String,
    available: AtomicU32,
}

impl BookRecord {
    fn snapshot(&self) -> Book {
        Book {
            book_id: self.book_id.clone(),
            title: self.title.clone(),
            author: self.author.clone(),
            category: self.category.clone(),
            location: self.location.clone(),
            available_copies: self.available.load(Ordering::Acquire),
        }
    }
}

/// In-memory catalog with per-book atomic availability counters.
///
/// The set of books is fixed at construction; only the counters mutate. Each
/// counter is decremented through a compare-and-swap loop, so concurrent
/// callers targeting the same book serialize per key while different books
/// never contend.
pub struct CatalogStore {
    books: HashMap<String, BookRecord>,
    order: Vec<String>,
}

impl CatalogStore {
    pub fn new(books: Vec<Book>) -> Self {
        let mut records = HashMap::with_capacity(books.len());
        let mut order = Vec::with_capacity(books.len());
        for book in books {
            let key = book.book_id.0.clone();
            if records.contains_key(&key) {
                continue;
            }
            records.insert(
                key.clone(),
                BookRecord {
                    book_id: book.book_id,
                    title: book.title,
                    author: book.author,
                    category: book.category,
                    location: book.location,
                    available: AtomicU32::new(book.available_copies),
                },
            );
            order.push(key);
        }
        Self { books: records, order }
    }

    /// Built-in catalog used when no seed file is configured.
    pub fn seed() -> Self {
        Self::new(seed_books())
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Full catalog snapshot with live counts, in seed order.
    pub fn all(&self) -> Vec<Book> {
        self.order
            .iter()
            .filter_map(|key| self.books.get(key))
            .map(BookRecord::snapshot)
            .collect()
    }

    pub fn get(&self, book_id: &str) -> Option<Book> {
        self.books.get(book_id).map(BookRecord::snapshot)
    }

    /// Case-insensitive substring match over title, author, and category,
    /// plus exact (case-insensitive) match on the book id.
    pub fn search(&self, query: &str) -> Vec<Book> {
        let term = query.trim().to_lowercase();
        if term.is_empty() {
            return Vec::new();
        }
        self.order
            .iter()
            .filter_map(|key| self.books.get(key))
            .filter(|record| {
                record.title.to_lowercase().contains(&term)
                    || record.author.to_lowercase().contains(&term)
                    || record.category.to_lowercase().contains(&term)
                    || record.book_id.0.to_lowercase() == term
            })
            .map(BookRecord::snapshot)
            .collect()
    }

    /// Exact id match first, falling back to a case-insensitive substring
    /// match on the title.
    pub fn resolve(&self, identifier: &str) -> Option<Book> {
        if let Some(book) = self.get(identifier) {
            return Some(book);
        }
        let term = identifier.trim().to_lowercase();
        if term.is_empty() {
            return None;
        }
        self.order
            .iter()
            .filter_map(|key| self.books.get(key))
            .find(|record| record.title.to_lowercase().contains(&term))
            .map(BookRecord::snapshot)
    }

    /// Atomically take one copy of `book_id` if any remain.
    ///
    /// Linearizable per book: for `k` available copies and `m` concurrent
    /// callers exactly `min(k, m)` observe `success == true`, the rest see
    /// `success == false` with no side effect.
    pub fn try_decrement(&self, book_id: &str) -> Result<CommitOutcome, CatalogError> {
        let record =
            self.books.get(book_id).ok_or_else(|| CatalogError::NotFound(book_id.to_string()))?;

        match record.available.fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
            count.checked_sub(1)
        }) {
            Ok(previous) => Ok(CommitOutcome { success: true, remaining: previous - 1 }),
            Err(_) => Ok(CommitOutcome { success: false, remaining: 0 }),
        }
    }

    /// Compensating increment, used only to undo a successful decrement when
    /// the ledger append that follows it fails.
    pub fn restore(&self, book_id: &str) -> Result<u32, CatalogError> {
        let record =
            self.books.get(book_id).ok_or_else(|| CatalogError::NotFound(book_id.to_string()))?;
        Ok(record.available.fetch_add(1, Ordering::AcqRel) + 1)
    }
}

fn seed_books() -> Vec<Book> {
    let entries = [
        ("B001", "Programming in C", "Dennis Ritchie", "Programming", "2nd Floor - Section A", 5),
        (
            "B002",
            "Data Structures and Algorithms",
            "Robert Sedgewick",
            "Computer Science",
            "2nd Floor - Section A",
            3,
        ),
        (
            "B003",
            "Introduction to Database Systems",
            "C.J. Date",
            "Database",
            "2nd Floor - Section B",
            4,
        ),
        ("B004", "Computer Networks", "Andrew Tanenbaum", "Networking", "2nd Floor - Section B", 5),
        ("B005", "Artificial Intelligence", "Stuart Russell", "AI/ML", "3rd Floor - Section C", 7),
    ];

    entries
        .into_iter()
        .map(|(book_id, title, author, category, location, copies)| Book {
            book_id: BookId(book_id.to_string()),
            title: title.to_string(),
            author: author.to_string(),
            category: category.to_string(),
            location: location.to_string(),
            available_copies: copies,
        })
        .collect()
}
