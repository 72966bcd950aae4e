//! Catalog browsing routes.
//!
//! - `GET /books`      — full catalog with live availability
//! - `GET /books?q=ai` — case-insensitive search over title, author,
//!   category, and exact book id

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::{routing::get, Json, Router};
use bookdesk_core::catalog::CatalogStore;
use bookdesk_core::domain::book::Book;
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct BooksState {
    catalog: Arc<CatalogStore>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BooksQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BooksResponse {
    pub count: usize,
    pub books: Vec<Book>,
}

pub fn router(catalog: Arc<CatalogStore>) -> Router {
    Router::new().route("/books", get(list_books)).with_state(BooksState { catalog })
}

async fn list_books(
    State(state): State<BooksState>,
    Query(query): Query<BooksQuery>,
) -> Json<BooksResponse> {
    let term = query.q.as_deref().map(str::trim).unwrap_or_default();
    let books = if term.is_empty() { state.catalog.all() } else { state.catalog.search(term) };
    Json(BooksResponse { count: books.len(), books })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use bookdesk_core::catalog::CatalogStore;
    use serde_json::Value;
    use tower::util::ServiceExt;

    use crate::books::router;

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let app = router(Arc::new(CatalogStore::seed()));
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn empty_query_returns_the_full_catalog() {
        let (status, body) = get_json("/books").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 5);
        assert_eq!(body["books"][0]["bookId"], "B001");
        assert_eq!(body["books"][0]["availableCopies"], 5);
    }

    #[tokio::test]
    async fn search_narrows_to_matching_books() {
        let (status, body) = get_json("/books?q=networks").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["books"][0]["bookId"], "B004");
    }

    #[tokio::test]
    async fn whitespace_query_behaves_like_no_query() {
        let (_, body) = get_json("/books?q=%20%20").await;
        assert_eq!(body["count"], 5);
    }
}
