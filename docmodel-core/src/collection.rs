//! Named collection handles.
//!
//! A [`Collection`] pairs a collection name with the shared backend. Handles are cheap
//! to create through [`DocumentStore::collection`](crate::store::DocumentStore::collection);
//! the handles bound to record types are cached by the store and shared as
//! `Arc<Collection<B>>`.

use bson::{Bson, Document};
use std::sync::Arc;

use crate::{
    backend::StoreBackend,
    error::DocumentStoreResult,
    query::{Expr, FindAndModify, Query},
};

/// A handle to one collection of the store.
#[derive(Debug)]
pub struct Collection<B: StoreBackend> {
    name: String,
    backend: Arc<B>,
}

impl<B: StoreBackend> Collection<B> {
    pub(crate) fn new(name: String, backend: Arc<B>) -> Self {
        Self { name, backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts a document and returns the `_id` it was stored under.
    pub async fn insert(&self, document: Document) -> DocumentStoreResult<Bson> {
        self.backend
            .insert_document(document, self.name())
            .await
    }

    /// Replaces the document addressed by `id` with `document`.
    pub async fn replace(&self, id: &Bson, document: Document) -> DocumentStoreResult<()> {
        self.backend
            .replace_document(id, document, self.name())
            .await
    }

    /// Removes the document addressed by `id`.
    pub async fn remove(&self, id: &Bson) -> DocumentStoreResult<bool> {
        self.backend
            .remove_document(id, self.name())
            .await
    }

    /// Runs a find request against this collection.
    pub async fn find(&self, query: Query) -> DocumentStoreResult<Vec<Document>> {
        self.backend
            .find_documents(query, self.name())
            .await
    }

    /// Returns the first document matching `filter`, optionally projected.
    pub async fn find_one(
        &self,
        filter: Option<Expr>,
        projection: Option<Vec<String>>,
    ) -> DocumentStoreResult<Option<Document>> {
        self.backend
            .find_one_document(filter, projection, self.name())
            .await
    }

    /// Counts the documents matching `filter`; `None` counts the whole collection.
    pub async fn count(&self, filter: Option<Expr>) -> DocumentStoreResult<u64> {
        self.backend
            .count_documents(filter, self.name())
            .await
    }

    /// Atomically increments fields of the matched document.
    pub async fn find_and_modify(&self, request: FindAndModify) -> DocumentStoreResult<Option<Document>> {
        self.backend
            .find_and_modify(request, self.name())
            .await
    }

    /// Creates an index on `field` if it does not exist yet.
    pub async fn ensure_index(&self, field: &str, unique: bool) -> DocumentStoreResult<()> {
        self.backend
            .ensure_index(self.name(), field, unique)
            .await
    }
}
