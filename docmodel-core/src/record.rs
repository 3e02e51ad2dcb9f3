//! The record base type.
//!
//! A record is a plain struct that implements [`Record`], usually through
//! `#[derive(Record)]`. The trait is the record type's capability interface: which
//! collection it lives in, how its ids are allocated and which of its fields are
//! persisted. [`RecordExt`] layers the CRUD operations on top of it for every record
//! type; all of them take the [`DocumentStore`] explicitly.
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
//!     cache: Vec<u8>,
//! }
//!
//! let mut person = Person::default();
//! person.name = "Foo Bar".into();
//! person.update(&store, UpdateOptions::default()).await?;
//!
//! let reloaded = Person::construct(&store, person.id().cloned()).await?;
//! ```
//!
//! # Update semantics
//!
//! [`RecordExt::update`] inserts when the record has no id (or when forced) and
//! replaces the whole stored document otherwise. A failed replace of an existing
//! document is logged and absorbed: the write contract is fire-and-accept. Callers
//! that need confirmation should re-read the record.

use async_trait::async_trait;
use bson::Document;
use std::{any::type_name, sync::Arc};
use tracing::{debug, error};

use crate::{
    allocator::{DEFAULT_RANDOM_ID_LENGTH, IdAllocator, IdStrategy},
    backend::StoreBackend,
    collection::Collection,
    cursor::RecordCursor,
    error::{DocumentStoreError, DocumentStoreResult},
    fields,
    id::Id,
    query::{Expr, Filter, Query},
    store::DocumentStore,
};

/// Capability interface every mapped record type implements.
///
/// `Default` provides the empty, unsaved instance.
pub trait Record: Default + Send + Sync + 'static {
    /// Name of the collection this record type is stored in.
    ///
    /// `None` means the type is not configured; binding it fails with
    /// [`DocumentStoreError::Configuration`].
    fn collection_name() -> Option<&'static str>;

    /// Whether ids are allocated from an atomic per-collection counter.
    fn sequential_id() -> bool {
        false
    }

    /// Whether ids are drawn at random from a fixed number of digits.
    fn random_id() -> bool {
        false
    }

    /// Number of digits of random ids.
    fn random_id_length() -> u32 {
        DEFAULT_RANDOM_ID_LENGTH
    }

    /// The resolved id allocation strategy. Sequential wins over random.
    fn id_strategy() -> IdStrategy {
        IdStrategy::resolve(Self::sequential_id(), Self::random_id(), Self::random_id_length())
    }

    /// The record's id; present iff it was persisted or loaded.
    fn id(&self) -> Option<&Id>;

    fn set_id(&mut self, id: Option<Id>);

    /// Names of the persisted fields, i.e. the type's public fields.
    fn field_names() -> &'static [&'static str];

    /// Serializes the persisted fields. Must not include `_id`.
    fn to_document(&self) -> DocumentStoreResult<Document>;

    /// Assigns the persisted fields present in `document`; other fields are left untouched.
    fn load_document(&mut self, document: &Document) -> DocumentStoreResult<()>;
}

/// Options for [`RecordExt::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Insert a new document even if the record already has an id.
    pub force_insert: bool,
    /// Skip id allocation and insert under the record's current id (if any).
    pub preserve_id: bool,
}

impl UpdateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn force_insert(mut self, force_insert: bool) -> Self {
        self.force_insert = force_insert;
        self
    }

    pub fn preserve_id(mut self, preserve_id: bool) -> Self {
        self.preserve_id = preserve_id;
        self
    }
}

/// CRUD operations available on every [`Record`].
#[async_trait]
pub trait RecordExt: Record {
    /// Loads the record with the given id, or returns an empty unsaved record for `None`.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::DocumentNotFound`] if no document has that id.
    async fn construct<B: StoreBackend>(store: &DocumentStore<B>, id: Option<Id>) -> DocumentStoreResult<Self>;

    /// Loads the first document matching `filter` into this record.
    ///
    /// Returns `false`, leaving the record untouched, when nothing matches.
    async fn retrieve_document<B: StoreBackend>(
        &mut self,
        store: &DocumentStore<B>,
        filter: Expr,
    ) -> DocumentStoreResult<bool>;

    /// Persists the record: insert when it has no id (or `force_insert`), full replace otherwise.
    async fn update<B: StoreBackend>(
        &mut self,
        store: &DocumentStore<B>,
        options: UpdateOptions,
    ) -> DocumentStoreResult<()>;

    /// Removes the backing document.
    ///
    /// Returns `Ok(false)` without contacting the store when the record has no id, and
    /// `Ok(false)` when the store fails to remove it. The record keeps its (now stale) id.
    async fn delete<B: StoreBackend>(&self, store: &DocumentStore<B>) -> DocumentStoreResult<bool>;

    /// Counts the documents of this record type matching `filter`.
    async fn count<B: StoreBackend>(store: &DocumentStore<B>, filter: Option<Expr>) -> DocumentStoreResult<u64>;

    /// Returns the collection bound to this record type.
    async fn collection<B: StoreBackend>(store: &DocumentStore<B>) -> DocumentStoreResult<Arc<Collection<B>>>;

    /// Lists the ids matching `query` and returns a cursor that loads records on demand.
    ///
    /// The query's projection is replaced with an id-only projection.
    async fn search<B: StoreBackend>(store: &DocumentStore<B>, query: Query) -> DocumentStoreResult<RecordCursor<Self, B>>;

    /// Loads the first record matching `filter`.
    ///
    /// Multiple matches are not detected; the store's first match wins.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::DocumentNotFound`] if nothing matches.
    async fn search_one<B: StoreBackend>(store: &DocumentStore<B>, filter: Expr) -> DocumentStoreResult<Self>;

    /// The persisted field map of this record. See [`fields::to_document`].
    fn persisted_fields(&self) -> DocumentStoreResult<Document> {
        fields::to_document(self)
    }

    /// Sorted JSON of this record, or `None` if encoding fails. See [`fields::to_json`].
    fn to_json(&self) -> Option<String> {
        fields::to_json(self)
    }
}

#[async_trait]
impl<R: Record> RecordExt for R {
    async fn construct<B: StoreBackend>(store: &DocumentStore<B>, id: Option<Id>) -> DocumentStoreResult<Self> {
        let Some(id) = id else {
            return Ok(Self::default());
        };

        let collection = store.binding::<Self>().await?;

        fetch_record(&collection, &id)
            .await?
            .ok_or_else(|| DocumentStoreError::DocumentNotFound(id.to_string(), collection.name().to_string()))
    }

    async fn retrieve_document<B: StoreBackend>(
        &mut self,
        store: &DocumentStore<B>,
        filter: Expr,
    ) -> DocumentStoreResult<bool> {
        let collection = store.binding::<Self>().await?;

        match collection.find_one(Some(filter), None).await? {
            Some(document) => {
                load_into(self, &document)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update<B: StoreBackend>(
        &mut self,
        store: &DocumentStore<B>,
        options: UpdateOptions,
    ) -> DocumentStoreResult<()> {
        let collection = store.binding::<Self>().await?;
        let mut document = fields::to_document(self)?;

        match self.id().cloned() {
            Some(id) if !options.force_insert => {
                if let Err(e) = collection.replace(&id.to_bson(), document).await {
                    error!(
                        collection = collection.name(),
                        id = %id,
                        error = %e,
                        "replace of existing document failed, write not confirmed"
                    );
                }
                Ok(())
            }
            current => {
                let id = if options.preserve_id {
                    current
                } else {
                    IdAllocator::new(store)
                        .allocate(Self::id_strategy(), &collection)
                        .await?
                };

                if let Some(id) = &id {
                    document.insert("_id", id.to_bson());
                }

                let inserted = collection.insert(document).await?;
                let id = Id::try_from(&inserted)?;
                debug!(collection = collection.name(), id = %id, "inserted {}", type_name::<Self>());
                self.set_id(Some(id));

                Ok(())
            }
        }
    }

    async fn delete<B: StoreBackend>(&self, store: &DocumentStore<B>) -> DocumentStoreResult<bool> {
        let Some(id) = self.id() else {
            return Ok(false);
        };

        let collection = store.binding::<Self>().await?;

        match collection.remove(&id.to_bson()).await {
            Ok(removed) => Ok(removed),
            Err(e) => {
                error!(collection = collection.name(), id = %id, error = %e, "delete failed");
                Ok(false)
            }
        }
    }

    async fn count<B: StoreBackend>(store: &DocumentStore<B>, filter: Option<Expr>) -> DocumentStoreResult<u64> {
        store
            .binding::<Self>()
            .await?
            .count(filter)
            .await
    }

    async fn collection<B: StoreBackend>(store: &DocumentStore<B>) -> DocumentStoreResult<Arc<Collection<B>>> {
        store.binding::<Self>().await
    }

    async fn search<B: StoreBackend>(store: &DocumentStore<B>, query: Query) -> DocumentStoreResult<RecordCursor<Self, B>> {
        let collection = store.binding::<Self>().await?;
        let query = Query {
            projection: Some(vec!["_id".to_string()]),
            ..query
        };

        let ids = collection
            .find(query)
            .await?
            .iter()
            .map(|document| {
                document
                    .get("_id")
                    .ok_or_else(|| DocumentStoreError::InvalidDocument("document without _id".into()))
                    .and_then(Id::try_from)
            })
            .collect::<DocumentStoreResult<Vec<Id>>>()?;

        Ok(RecordCursor::new(collection, ids))
    }

    async fn search_one<B: StoreBackend>(store: &DocumentStore<B>, filter: Expr) -> DocumentStoreResult<Self> {
        let mut record = Self::default();

        if record.retrieve_document(store, filter.clone()).await? {
            return Ok(record);
        }

        Err(DocumentStoreError::DocumentNotFound(
            format!("{filter:?}"),
            Self::collection_name().unwrap_or_default().to_string(),
        ))
    }
}

/// Fetches and materializes the record addressed by `id`, or `None` if it does not exist.
pub(crate) async fn fetch_record<R: Record, B: StoreBackend>(
    collection: &Collection<B>,
    id: &Id,
) -> DocumentStoreResult<Option<R>> {
    match collection.find_one(Some(Filter::id(id)), None).await? {
        Some(document) => {
            let mut record = R::default();
            load_into(&mut record, &document)?;
            Ok(Some(record))
        }
        None => Ok(None),
    }
}

fn load_into<R: Record>(record: &mut R, document: &Document) -> DocumentStoreResult<()> {
    let id = document
        .get("_id")
        .map(Id::try_from)
        .transpose()?;

    record.load_document(document)?;
    record.set_id(id);

    Ok(())
}
