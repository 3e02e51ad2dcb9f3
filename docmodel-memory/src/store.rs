//! In-memory storage implementation for document stores.
//!
//! Collections are vectors of BSON documents kept in insertion order behind one
//! async-aware read-write lock, which also makes find-and-modify atomic.

use async_trait::async_trait;
use bson::{Bson, Document, doc, oid::ObjectId};
use mea::rwlock::RwLock;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering as AtomicOrdering},
    },
};
use tracing::debug;

use docmodel_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, FindAndModify, Query, SortDirection},
};

use crate::evaluator::{Comparable, DocumentEvaluator, lookup, same_id};

type StoreMap = HashMap<String, Vec<Document>>;

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable; clones share the same underlying data and the same
/// connection flag.
///
/// Queries scan every document of a collection; there are no indexes.
///
/// # Example
///
/// ```ignore
/// use docmodel_memory::InMemoryStore;
/// use docmodel::backend::StoreBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let id = store.insert_document(doc! { "name": "Alice" }, "people").await?;
///
/// store.disconnect();
/// assert!(store.ping().await.is_err());
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> documents in insertion order
    store: Arc<RwLock<StoreMap>>,
    connected: Arc<AtomicBool>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates a new, empty and connected in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Simulates a lost connection: every operation fails until [`reconnect`](Self::reconnect).
    pub fn disconnect(&self) {
        self.connected.store(false, AtomicOrdering::SeqCst);
    }

    pub fn reconnect(&self) {
        self.connected.store(true, AtomicOrdering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(AtomicOrdering::SeqCst)
    }

    fn check_connection(&self) -> DocumentStoreResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(DocumentStoreError::Connection("in-memory store is disconnected".to_string()))
        }
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn ping(&self) -> DocumentStoreResult<()> {
        self.check_connection()
    }

    async fn insert_document(&self, document: Document, collection: &str) -> DocumentStoreResult<Bson> {
        self.check_connection()?;

        let id = document
            .get("_id")
            .cloned()
            .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));

        let mut store = self.store.write().await;
        let documents = store.entry(collection.to_string()).or_default();

        if documents.iter().any(|existing| has_id(existing, &id)) {
            return Err(DocumentStoreError::DocumentAlreadyExists(id_label(&id), collection.to_string()));
        }

        documents.push(with_id(&id, document));

        Ok(id)
    }

    async fn replace_document(&self, id: &Bson, document: Document, collection: &str) -> DocumentStoreResult<()> {
        self.check_connection()?;

        let mut store = self.store.write().await;
        let existing = store
            .get_mut(collection)
            .and_then(|documents| documents.iter_mut().find(|existing| has_id(existing, id)))
            .ok_or_else(|| DocumentStoreError::DocumentNotFound(id_label(id), collection.to_string()))?;

        *existing = with_id(id, document);

        Ok(())
    }

    async fn remove_document(&self, id: &Bson, collection: &str) -> DocumentStoreResult<bool> {
        self.check_connection()?;

        let mut store = self.store.write().await;
        let Some(documents) = store.get_mut(collection) else {
            return Ok(false);
        };

        match documents.iter().position(|existing| has_id(existing, id)) {
            Some(index) => {
                documents.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        self.check_connection()?;

        let store = self.store.read().await;
        let Some(documents) = store.get(collection) else {
            return Ok(vec![]);
        };

        let mut matched = DocumentEvaluator::filter_documents(documents, query.filter.as_ref())?;

        if !query.sort.is_empty() {
            // Stable sort, so ties keep insertion order.
            matched.sort_by(|a, b| {
                query
                    .sort
                    .iter()
                    .map(|sort| {
                        let left = lookup(a, &sort.field).map(Comparable::from).unwrap_or(Comparable::Null);
                        let right = lookup(b, &sort.field).map(Comparable::from).unwrap_or(Comparable::Null);

                        match sort.direction {
                            SortDirection::Asc => left.sort_cmp(&right),
                            SortDirection::Desc => right.sort_cmp(&left),
                        }
                    })
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        Ok(matched
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.filter(|&limit| limit > 0).unwrap_or(usize::MAX))
            .map(|document| project(document, query.projection.as_deref()))
            .collect())
    }

    async fn find_one_document(
        &self,
        filter: Option<Expr>,
        projection: Option<Vec<String>>,
        collection: &str,
    ) -> DocumentStoreResult<Option<Document>> {
        self.check_connection()?;

        let store = self.store.read().await;
        let Some(documents) = store.get(collection) else {
            return Ok(None);
        };

        for document in documents {
            if DocumentEvaluator::matches(document, filter.as_ref())? {
                return Ok(Some(project(document, projection.as_deref())));
            }
        }

        Ok(None)
    }

    async fn count_documents(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        self.check_connection()?;

        let store = self.store.read().await;
        let Some(documents) = store.get(collection) else {
            return Ok(0);
        };

        Ok(DocumentEvaluator::filter_documents(documents, filter.as_ref())?.len() as u64)
    }

    async fn find_and_modify(&self, request: FindAndModify, collection: &str) -> DocumentStoreResult<Option<Document>> {
        self.check_connection()?;

        let mut store = self.store.write().await;
        let documents = store.entry(collection.to_string()).or_default();

        let mut position = None;
        for (index, document) in documents.iter().enumerate() {
            if DocumentEvaluator::matches(document, Some(&request.filter))? {
                position = Some(index);
                break;
            }
        }

        match position {
            Some(index) => {
                let original = documents[index].clone();
                let mut modified = original.clone();
                apply_increment(&mut modified, &request.increment)?;
                documents[index] = modified.clone();

                Ok(Some(if request.return_new { modified } else { original }))
            }
            None if request.upsert => {
                let mut created = Document::new();
                seed_from_filter(&request.filter, &mut created);
                apply_increment(&mut created, &request.increment)?;

                let id = created
                    .get("_id")
                    .cloned()
                    .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));
                let created = with_id(&id, created);
                documents.push(created.clone());

                debug!(collection, id = %id, "upserted document");

                Ok(request.return_new.then_some(created))
            }
            None => Ok(None),
        }
    }

    async fn ensure_index(&self, _collection: &str, _field: &str, _unique: bool) -> DocumentStoreResult<()> {
        // No indexes in memory.
        self.check_connection()
    }
}

fn has_id(document: &Document, id: &Bson) -> bool {
    document.get("_id").is_some_and(|existing| same_id(existing, id))
}

fn id_label(id: &Bson) -> String {
    match id {
        Bson::String(value) => value.clone(),
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::Int32(value) => value.to_string(),
        Bson::Int64(value) => value.to_string(),
        other => other.to_string(),
    }
}

/// Rebuilds `document` with `_id` as its first field.
fn with_id(id: &Bson, document: Document) -> Document {
    let mut stored = doc! { "_id": id.clone() };

    for (key, value) in document {
        if key != "_id" {
            stored.insert(key, value);
        }
    }

    stored
}

fn project(document: &Document, fields: Option<&[String]>) -> Document {
    let Some(fields) = fields else {
        return document.clone();
    };

    let mut projected = Document::new();

    if let Some(id) = document.get("_id") {
        projected.insert("_id", id.clone());
    }

    for field in fields {
        if let Some(value) = document.get(field) {
            projected.insert(field.clone(), value.clone());
        }
    }

    projected
}

/// Copies the top-level equality constraints of an upsert filter into the new document.
fn seed_from_filter(filter: &Expr, document: &mut Document) {
    match filter {
        Expr::Field { field, op: FieldOp::Eq, value } => {
            document.insert(field.clone(), value.clone());
        }
        Expr::And(exprs) => exprs.iter().for_each(|expr| seed_from_filter(expr, document)),
        _ => {}
    }
}

fn apply_increment(document: &mut Document, increment: &Document) -> DocumentStoreResult<()> {
    for (field, amount) in increment {
        let updated = match (document.get(field), amount) {
            (None, amount) => amount.clone(),
            (Some(Bson::Int32(a)), Bson::Int32(b)) => match a.checked_add(*b) {
                Some(sum) => Bson::Int32(sum),
                None => Bson::Int64(*a as i64 + *b as i64),
            },
            (Some(current), amount) => match (integer(current), integer(amount)) {
                (Some(a), Some(b)) => Bson::Int64(a.checked_add(b).ok_or_else(|| {
                    DocumentStoreError::InvalidDocument(format!("increment of {field} overflows"))
                })?),
                _ => match (number(current), number(amount)) {
                    (Some(a), Some(b)) => Bson::Double(a + b),
                    _ => {
                        return Err(DocumentStoreError::InvalidDocument(format!(
                            "cannot increment non-numeric field {field}"
                        )));
                    }
                },
            },
        };

        document.insert(field.clone(), updated);
    }

    Ok(())
}

fn integer(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(value) => Some(*value as i64),
        Bson::Int64(value) => Some(*value),
        _ => None,
    }
}

fn number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(value) => Some(*value),
        other => integer(other).map(|value| value as f64),
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Default)]
pub struct InMemoryStoreBuilder {
    disconnected: bool,
}

impl InMemoryStoreBuilder {
    /// Starts the store disconnected, useful for exercising connection failures.
    pub fn disconnected(mut self, disconnected: bool) -> Self {
        self.disconnected = disconnected;
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let store = InMemoryStore::new();

        if self.disconnected {
            store.disconnect();
        }

        Ok(store)
    }
}
