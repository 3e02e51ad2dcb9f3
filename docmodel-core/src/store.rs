//! The document store: one shared connection for many record types.
//!
//! A [`DocumentStore`] owns the backend and is passed explicitly to every record
//! operation. It also owns the collection bindings: the first time a record type asks
//! for its collection, the store validates the type's configuration and the connection,
//! then caches an `Arc<Collection<B>>` that every later instance of that type shares.
//!
//! # Example
//!
//! ```ignore
//! use docmodel::{store::DocumentStore, memory::InMemoryStore};
//!
//! let store = DocumentStore::builder(InMemoryStore::new())
//!     .counter_collection("sequences")
//!     .build();
//! let people = store.binding::<Person>().await?;
//! ```

use mea::rwlock::RwLock;
use std::{
    any::{TypeId, type_name},
    collections::HashMap,
    sync::Arc,
};
use tracing::{debug, warn};

use crate::{
    backend::StoreBackend,
    collection::Collection,
    error::{DocumentStoreError, DocumentStoreResult},
    record::Record,
};

/// Collection holding one counter document per sequentially numbered collection.
pub const DEFAULT_COUNTER_COLLECTION: &str = "counters";

/// Store-wide settings.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Name of the collection holding sequence counters.
    pub counter_collection: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { counter_collection: DEFAULT_COUNTER_COLLECTION.to_string() }
    }
}

/// A document store bound to a specific backend implementation.
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: Arc<B>,
    options: StoreOptions,
    bindings: RwLock<HashMap<TypeId, Arc<Collection<B>>>>,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with default options.
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, StoreOptions::default())
    }

    pub fn with_options(backend: B, options: StoreOptions) -> Self {
        Self {
            backend: Arc::new(backend),
            options,
            bindings: RwLock::new(HashMap::new()),
        }
    }

    pub fn builder(backend: B) -> DocumentStoreBuilder<B> {
        DocumentStoreBuilder::new(backend)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Returns an uncached handle to the named collection.
    pub fn collection(&self, name: &str) -> Collection<B> {
        Collection::new(name.to_string(), Arc::clone(&self.backend))
    }

    /// Returns the collection bound to record type `R`, creating the binding on first use.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::Configuration`] if `R` declares no collection name.
    /// - [`DocumentStoreError::Connection`] if the backend does not answer a ping.
    pub async fn binding<R: Record>(&self) -> DocumentStoreResult<Arc<Collection<B>>> {
        let key = TypeId::of::<R>();

        if let Some(binding) = self.bindings.read().await.get(&key) {
            return Ok(Arc::clone(binding));
        }

        let name = R::collection_name().ok_or_else(|| {
            DocumentStoreError::Configuration(format!(
                "record type {} does not declare a collection name",
                type_name::<R>()
            ))
        })?;

        // No lock is held while pinging; other record types keep resolving their bindings.
        self.backend
            .ping()
            .await
            .map_err(|e| DocumentStoreError::Connection(e.to_string()))?;

        // Re-check under the write lock so concurrent first uses share one binding.
        let mut bindings = self.bindings.write().await;
        if let Some(binding) = bindings.get(&key) {
            return Ok(Arc::clone(binding));
        }

        let binding = Arc::new(self.collection(name));
        bindings.insert(key, Arc::clone(&binding));
        debug!(record = type_name::<R>(), collection = name, "bound record type to collection");

        Ok(binding)
    }

    /// Drops all bindings and shuts the backend down.
    ///
    /// If collection handles are still alive elsewhere (for example inside a result
    /// cursor) the backend cannot be reclaimed and is left to be dropped with them.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        let Self { backend, bindings, .. } = self;
        drop(bindings);

        match Arc::try_unwrap(backend) {
            Ok(backend) => backend.shutdown().await,
            Err(_) => {
                warn!("collection handles still in use, skipping backend shutdown");
                Ok(())
            }
        }
    }
}

/// Builder for [`DocumentStore`].
pub struct DocumentStoreBuilder<B: StoreBackend> {
    backend: B,
    options: StoreOptions,
}

impl<B: StoreBackend> DocumentStoreBuilder<B> {
    pub fn new(backend: B) -> Self {
        Self { backend, options: StoreOptions::default() }
    }

    /// Sets the collection that holds sequence counters.
    pub fn counter_collection(mut self, name: impl Into<String>) -> Self {
        self.options.counter_collection = name.into();
        self
    }

    pub fn build(self) -> DocumentStore<B> {
        DocumentStore::with_options(self.backend, self.options)
    }
}
