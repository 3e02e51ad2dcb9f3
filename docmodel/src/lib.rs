//! Map plain Rust structs onto collections of a schemaless document store.
//!
//! This crate is the entry point of docmodel. It re-exports the core record layer, the
//! `#[derive(Record)]` macro and the available storage backends.
//!
//! # Features
//!
//! - **Field filtering** - Only a record type's public fields are ever persisted
//! - **Id allocation** - Store-assigned opaque ids, atomic sequential counters or random integers
//! - **CRUD** - Load by id, insert or replace, delete, count and search
//! - **Lazy results** - Searches list ids and load records on demand, skipping vanished documents
//! - **JSON output** - Records as JSON with sorted keys and ids rendered as strings
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodel::{prelude::*, memory::InMemoryStore};
//!
//! #[derive(Debug, Default, Record)]
//! #[record(collection = "people", sequential_id)]
//! pub struct Person {
//!     id: Option<Id>,
//!     pub name: String,
//!     pub age: u32,
//!     // Not persisted.
//!     visits: u32,
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryStore::new());
//!
//!     let mut person = Person { name: "Foo Bar".into(), age: 42, ..Default::default() };
//!     person.update(&store, UpdateOptions::default()).await?;
//!     println!("stored as {}", person.id().unwrap());
//!
//!     let mut adults = Person::search(
//!         &store,
//!         Query::builder()
//!             .filter(Filter::gte("age", 18))
//!             .sort("name", SortDirection::Asc)
//!             .build(),
//!     )
//!     .await?;
//!
//!     while let Some(adult) = adults.next().await? {
//!         println!("{}", adult.to_json().unwrap_or_default());
//!     }
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - MongoDB backend (requires the `mongodb` feature)

#[allow(unused_extern_crates)]
extern crate self as docmodel;

pub mod prelude;

pub use docmodel_core::{allocator, backend, collection, cursor, error, fields, id, query, record, store};
pub use docmodel_macros::Record;

// Generated code and JSON output rely on these.
pub use bson;
pub use serde_json;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docmodel_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmodel_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
