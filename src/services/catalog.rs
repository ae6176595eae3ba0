//! Catalog service — books, lessons, and word lists.
//!
//! Every call is a GET through `ApiClient`, so each one carries the bearer
//! token and surfaces failures as classified `ApiError`s. Payloads stay
//! opaque JSON.

use serde_json::Value;

use crate::http::{ApiClient, ApiError};

pub const BOOK_LIST_PATH: &str = "/book/getBookList";
pub const LESSON_LIST_PATH: &str = "/lesson/getLessonListByBookId";
pub const LESSON_PATH: &str = "/lesson/getLessonByLessonId";
pub const WORD_LIST_PATH: &str = "/word/getWordsListByLessonId";

#[derive(Debug, Clone)]
pub struct CatalogService {
    client: ApiClient,
}

impl CatalogService {
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// All books. `params` are forwarded as query parameters (paging,
    /// filters) without interpretation.
    ///
    /// # Errors
    ///
    /// Returns the pipeline's [`ApiError`] for any failed call.
    pub async fn book_list(&self, params: &[(&str, &str)]) -> Result<Value, ApiError> {
        self.fetch(BOOK_LIST_PATH, params).await
    }

    /// Lessons of one book.
    ///
    /// # Errors
    ///
    /// Returns the pipeline's [`ApiError`] for any failed call.
    pub async fn lesson_list(&self, book_id: &str) -> Result<Value, ApiError> {
        self.fetch(LESSON_LIST_PATH, &[("bookId", book_id)]).await
    }

    /// One lesson.
    ///
    /// # Errors
    ///
    /// Returns the pipeline's [`ApiError`] for any failed call.
    pub async fn lesson(&self, lesson_id: &str) -> Result<Value, ApiError> {
        self.fetch(LESSON_PATH, &[("lessonId", lesson_id)]).await
    }

    /// Vocabulary of one lesson.
    ///
    /// # Errors
    ///
    /// Returns the pipeline's [`ApiError`] for any failed call.
    pub async fn word_list(&self, lesson_id: &str) -> Result<Value, ApiError> {
        self.fetch(WORD_LIST_PATH, &[("lessonId", lesson_id)]).await
    }

    async fn fetch(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, ApiError> {
        let payload = self.client.get(path, params).await?;
        tracing::debug!(%path, "catalog fetch ok");
        payload.decode()
    }
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
