//! In-memory document storage backend for docmodel.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It is meant for development and tests: nothing is persisted, and the connection can
//! be switched off to exercise failure paths.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Full query support** - Filtering, multi-key sorting, pagination and projection
//! - **Atomic counters** - Find-and-modify with upsert, as used by sequential ids
//! - **Simulated outages** - [`InMemoryStore::disconnect`] and [`InMemoryStore::reconnect`]
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodel::{prelude::*, memory::InMemoryStore};
//!
//! #[derive(Debug, Default, Record)]
//! #[record(collection = "users")]
//! pub struct User {
//!     id: Option<Id>,
//!     pub name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = InMemoryStore::builder().build().await?;
//!     let store = DocumentStore::new(backend);
//!
//!     let mut user = User { name: "Alice".into(), ..Default::default() };
//!     user.update(&store, UpdateOptions::default()).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_memory;

pub mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
