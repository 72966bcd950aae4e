//! Function executor: closed dispatch table for the tools exposed to the
//! model. Lookups that miss return structured "not found" payloads the model
//! can narrate; nothing in here raises across the boundary or touches
//! inventory.

use std::sync::Arc;

use bookdesk_core::catalog::CatalogStore;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolName {
    SearchBooks,
    ListBooks,
    GetBookDetails,
    ReserveBook,
}

impl ToolName {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "search_books" => Some(Self::SearchBooks),
            "list_books" => Some(Self::ListBooks),
            "get_book_details" => Some(Self::GetBookDetails),
            "reserve_book" => Some(Self::ReserveBook),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SearchBooks => "search_books",
            Self::ListBooks => "list_books",
            Self::GetBookDetails => "get_book_details",
            Self::ReserveBook => "reserve_book",
        }
    }
}

/// Unconfirmed proposal to reserve one book. Pure data: constructing an
/// intent decrements nothing, so exploratory conversation never burns stock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReservationIntent {
    pub book_id: String,
    pub book_title: String,
}

/// Result of one tool invocation: the JSON payload handed back to the model
/// plus, for the reserve tool, the intent the driver acts on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolOutcome {
    pub payload: Value,
    pub intent: Option<ReservationIntent>,
}

impl ToolOutcome {
    fn narration(payload: Value) -> Self {
        Self { payload, intent: None }
    }
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
}

#[derive(Debug, Deserialize)]
struct DetailArgs {
    identifier: String,
}

#[derive(Debug, Deserialize)]
struct ReserveArgs {
    book_id: String,
    #[serde(default)]
    book_title: String,
}

pub struct ToolExecutor {
    catalog: Arc<CatalogStore>,
}

impl ToolExecutor {
    pub fn new(catalog: Arc<CatalogStore>) -> Self {
        Self { catalog }
    }

    /// Tool definitions sent with every model request.
    pub fn schema() -> Vec<Value> {
        vec![
            function_schema(
                ToolName::SearchBooks,
                "Search the library catalog by title, author, category, or exact book id.",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "Free-text search term."}
                    },
                    "required": ["query"]
                }),
            ),
            function_schema(
                ToolName::ListBooks,
                "List every book in the catalog with live availability.",
                json!({"type": "object", "properties": {}}),
            ),
            function_schema(
                ToolName::GetBookDetails,
                "Fetch one book by exact id, or by title when no id matches.",
                json!({
                    "type": "object",
                    "properties": {
                        "identifier": {"type": "string", "description": "Book id or title."}
                    },
                    "required": ["identifier"]
                }),
            ),
            function_schema(
                ToolName::ReserveBook,
                "Propose reserving a book for the student. The reservation is only \
                 committed after the student's name and email are confirmed.",
                json!({
                    "type": "object",
                    "properties": {
                        "book_id": {"type": "string", "description": "Exact catalog book id."},
                        "book_title": {"type": "string", "description": "Title, for confirmation."}
                    },
                    "required": ["book_id"]
                }),
            ),
        ]
    }

    pub fn execute(&self, name: &str, arguments: &str) -> ToolOutcome {
        let Some(tool) = ToolName::parse(name) else {
            return ToolOutcome::narration(json!({
                "error": format!("unknown tool `{name}`"),
            }));
        };

        match tool {
            ToolName::SearchBooks => match parse_args::<SearchArgs>(arguments) {
                Ok(args) => self.search(&args.query),
                Err(payload) => ToolOutcome::narration(payload),
            },
            ToolName::ListBooks => ToolOutcome::narration(json!({
                "books": self.catalog.all(),
            })),
            ToolName::GetBookDetails => match parse_args::<DetailArgs>(arguments) {
                Ok(args) => self.details(&args.identifier),
                Err(payload) => ToolOutcome::narration(payload),
            },
            ToolName::ReserveBook => match parse_args::<ReserveArgs>(arguments) {
                Ok(args) => self.propose_reservation(args),
                Err(payload) => ToolOutcome::narration(payload),
            },
        }
    }

    fn search(&self, query: &str) -> ToolOutcome {
        let results = self.catalog.search(query);
        ToolOutcome::narration(json!({
            "count": results.len(),
            "results": results,
        }))
    }

    fn details(&self, identifier: &str) -> ToolOutcome {
        match self.catalog.resolve(identifier) {
            Some(book) => ToolOutcome::narration(json!({"found": true, "book": book})),
            None => ToolOutcome::narration(json!({
                "found": false,
                "identifier": identifier,
            })),
        }
    }

    fn propose_reservation(&self, args: ReserveArgs) -> ToolOutcome {
        // Resolve the title from the catalog when the model omitted it; the
        // intent itself never touches availability.
        let book_title = if args.book_title.trim().is_empty() {
            self.catalog.get(&args.book_id).map(|book| book.title).unwrap_or_default()
        } else {
            args.book_title
        };

        let intent = ReservationIntent { book_id: args.book_id, book_title };
        let payload = json!({
            "status": "pending_confirmation",
            "bookId": intent.book_id.clone(),
            "bookTitle": intent.book_title.clone(),
            "note": "The reservation is committed once the student's name and email are confirmed.",
        });
        ToolOutcome { payload, intent: Some(intent) }
    }
}

fn function_schema(name: ToolName, description: &str, parameters: Value) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": name.as_str(),
            "description": description,
            "parameters": parameters,
        }
    })
}

fn parse_args<T: serde::de::DeserializeOwned>(arguments: &str) -> Result<T, Value> {
    serde_json::from_str(arguments)
        .map_err(|error| json!({"error": format!("invalid tool arguments: {error}")}))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bookdesk_core::catalog::CatalogStore;

    use super::{ToolExecutor, ToolName};

    fn executor() -> (ToolExecutor, Arc<CatalogStore>) {
        let catalog = Arc::new(CatalogStore::seed());
        (ToolExecutor::new(Arc::clone(&catalog)), catalog)
    }

    #[test]
    fn unknown_tool_names_return_a_structured_error() {
        let (executor, _) = executor();

        let outcome = executor.execute("drop_table", "{}");
        assert!(outcome.intent.is_none());
        assert!(outcome.payload["error"]
            .as_str()
            .expect("error string")
            .contains("unknown tool"));
    }

    #[test]
    fn search_is_case_insensitive_over_title_author_and_category() {
        let (executor, _) = executor();

        let outcome = executor.execute("search_books", "{\"query\":\"NETWORKS\"}");
        assert_eq!(outcome.payload["count"], 1);
        assert_eq!(outcome.payload["results"][0]["bookId"], "B004");
    }

    #[test]
    fn details_misses_are_a_not_found_marker_not_an_error() {
        let (executor, _) = executor();

        let outcome = executor.execute("get_book_details", "{\"identifier\":\"Moby Dick\"}");
        assert_eq!(outcome.payload["found"], false);
        assert_eq!(outcome.payload["identifier"], "Moby Dick");
    }

    #[test]
    fn details_prefers_exact_id_over_title_match() {
        let (executor, _) = executor();

        let outcome = executor.execute("get_book_details", "{\"identifier\":\"B005\"}");
        assert_eq!(outcome.payload["found"], true);
        assert_eq!(outcome.payload["book"]["title"], "Artificial Intelligence");
    }

    #[test]
    fn reserve_builds_an_intent_without_touching_inventory() {
        let (executor, catalog) = executor();

        let outcome =
            executor.execute("reserve_book", "{\"book_id\":\"B001\",\"book_title\":\"\"}");

        let intent = outcome.intent.expect("reserve must produce an intent");
        assert_eq!(intent.book_id, "B001");
        assert_eq!(intent.book_title, "Programming in C");
        assert_eq!(catalog.get("B001").expect("book exists").available_copies, 5);
    }

    #[test]
    fn malformed_arguments_are_narratable() {
        let (executor, _) = executor();

        let outcome = executor.execute("search_books", "not json");
        assert!(outcome.payload["error"]
            .as_str()
            .expect("error string")
            .contains("invalid tool arguments"));
    }

    #[test]
    fn schema_covers_every_supported_tool() {
        let schema = ToolExecutor::schema();
        let names: Vec<&str> =
            schema.iter().filter_map(|tool| tool["function"]["name"].as_str()).collect();
        assert_eq!(names, vec!["search_books", "list_books", "get_book_details", "reserve_book"]);
        assert!(names.iter().all(|name| ToolName::parse(name).is_some()));
    }
}
