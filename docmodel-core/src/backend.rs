//! Document store client abstraction.
//!
//! The mapper never talks to a database directly. Every durable operation goes through
//! a [`StoreBackend`], which exposes the small surface the record layer needs: single
//! document insert/replace/remove, find with projection/sort/skip/limit, count, an
//! atomic find-and-modify and index creation.
//!
//! # Write visibility
//!
//! A successful write means the backend *accepted* it under its default write concern,
//! not that it is durable. Backends should not strengthen or weaken that contract.
//!
//! # Example
//!
//! ```ignore
//! use docmodel::backend::StoreBackend;
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//! let id = backend.insert_document(doc! { "name": "Alice" }, "people").await?;
//! let found = backend.find_one_document(Some(Filter::eq("_id", id)), None, "people").await?;
//! ```

use async_trait::async_trait;
use bson::{Bson, Document};
use std::fmt::Debug;

use crate::{
    error::DocumentStoreResult,
    query::{Expr, FindAndModify, Query},
};

/// Abstract interface for document store clients.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one backend is shared by every record type
/// bound through a [`DocumentStore`](crate::store::DocumentStore).
///
/// # Error Handling
///
/// Transport failures should be reported as
/// [`DocumentStoreError::Backend`](crate::error::DocumentStoreError::Backend) and a lost
/// connection as [`DocumentStoreError::Connection`](crate::error::DocumentStoreError::Connection).
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Checks that the connection to the store is usable.
    async fn ping(&self) -> DocumentStoreResult<()>;

    /// Inserts a single document and returns the `_id` it was stored under.
    ///
    /// When the document carries no `_id`, the backend assigns an opaque one.
    /// Inserting an `_id` that already exists fails with
    /// [`DocumentStoreError::DocumentAlreadyExists`](crate::error::DocumentStoreError::DocumentAlreadyExists).
    async fn insert_document(&self, document: Document, collection: &str) -> DocumentStoreResult<Bson>;

    /// Replaces the whole document addressed by `id`.
    ///
    /// Fields missing from `document` are removed from the stored document.
    async fn replace_document(
        &self,
        id: &Bson,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Removes the document addressed by `id`, returning whether anything was removed.
    async fn remove_document(&self, id: &Bson, collection: &str) -> DocumentStoreResult<bool>;

    /// Runs a find request against a collection.
    ///
    /// Missing collections yield an empty result.
    async fn find_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>>;

    /// Returns the first document matching `filter`, optionally projected.
    async fn find_one_document(
        &self,
        filter: Option<Expr>,
        projection: Option<Vec<String>>,
        collection: &str,
    ) -> DocumentStoreResult<Option<Document>>;

    /// Counts the documents matching `filter`.
    async fn count_documents(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64>;

    /// Atomically increments fields of the matched document and returns it.
    ///
    /// This is the only primitive the sequential id allocator relies on, so it must be
    /// atomic across concurrent callers. Returns `None` when nothing matched and
    /// `upsert` is off.
    async fn find_and_modify(
        &self,
        request: FindAndModify,
        collection: &str,
    ) -> DocumentStoreResult<Option<Document>>;

    /// Creates an index on `field` if it does not exist yet.
    async fn ensure_index(&self, collection: &str, field: &str, unique: bool) -> DocumentStoreResult<()>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Factory trait for asynchronously constructing a backend from its configuration.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
