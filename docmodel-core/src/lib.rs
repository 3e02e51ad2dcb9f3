//! Core of docmodel: maps plain Rust record types onto collections of a document store.
//!
//! This crate provides:
//!
//! - **Records** ([`record`]) - The record capability trait and its CRUD operations
//! - **Id allocation** ([`allocator`]) - Opaque, sequential and random id strategies
//! - **Field filtering** ([`fields`]) - Persisted field maps and sorted JSON output
//! - **Lazy results** ([`cursor`]) - Fault-tolerant cursors over search results
//! - **Store backend abstraction** ([`backend`]) - The narrow interface a document store must offer
//! - **Query and filtering API** ([`query`]) - Filter expressions, sorts and find-and-modify requests
//! - **Collections** ([`collection`]) and the **document store** ([`store`]) with its per-type bindings
//! - **Identifiers** ([`id`]) and **errors** ([`error`])
//!
//! # Example
//!
//! ```ignore
//! use docmodel::prelude::*;
//!
//! #[derive(Debug, Default, Record)]
//! #[record(collection = "people", sequential_id)]
//! pub struct Person {
//!     id: Option<Id>,
//!     pub name: String,
//! }
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//!
//! let mut person = Person { name: "Foo Bar".into(), ..Default::default() };
//! person.update(&store, UpdateOptions::default()).await?;
//! assert_eq!(person.id(), Some(&Id::Int(1)));
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_core;

pub mod allocator;
pub mod backend;
pub mod collection;
pub mod cursor;
pub mod error;
pub mod fields;
pub mod id;
pub mod query;
pub mod record;
pub mod store;
