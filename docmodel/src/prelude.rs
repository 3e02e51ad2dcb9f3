//! Convenient re-exports of commonly used types from docmodel.
//!
//! ```ignore
//! use docmodel::prelude::*;
//! ```

pub use docmodel_core::{
    allocator::IdStrategy,
    backend::{StoreBackend, StoreBackendBuilder},
    collection::Collection,
    cursor::{CursorPosition, RecordCursor},
    error::{DocumentStoreError, DocumentStoreResult},
    id::Id,
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, Sort, SortDirection},
    record::{Record, RecordExt, UpdateOptions},
    store::{DocumentStore, DocumentStoreBuilder, StoreOptions},
};
pub use docmodel_macros::Record;
