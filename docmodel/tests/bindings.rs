use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use docmodel::{
    backend::StoreBackend,
    bson::{Bson, Document},
    error::DocumentStoreResult,
    memory::InMemoryStore,
    prelude::*,
    query::FindAndModify,
};
use tokio::{sync::Notify, time::timeout};

/// In-memory backend whose `ping` can be held open until released.
#[derive(Debug, Default)]
struct GatedPing {
    inner: InMemoryStore,
    hold: AtomicBool,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl StoreBackend for GatedPing {
    async fn ping(&self) -> DocumentStoreResult<()> {
        if self.hold.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.ping().await
    }

    async fn insert_document(&self, document: Document, collection: &str) -> DocumentStoreResult<Bson> {
        self.inner.insert_document(document, collection).await
    }

    async fn replace_document(&self, id: &Bson, document: Document, collection: &str) -> DocumentStoreResult<()> {
        self.inner.replace_document(id, document, collection).await
    }

    async fn remove_document(&self, id: &Bson, collection: &str) -> DocumentStoreResult<bool> {
        self.inner.remove_document(id, collection).await
    }

    async fn find_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        self.inner.find_documents(query, collection).await
    }

    async fn find_one_document(
        &self,
        filter: Option<Expr>,
        projection: Option<Vec<String>>,
        collection: &str,
    ) -> DocumentStoreResult<Option<Document>> {
        self.inner.find_one_document(filter, projection, collection).await
    }

    async fn count_documents(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        self.inner.count_documents(filter, collection).await
    }

    async fn find_and_modify(
        &self,
        request: FindAndModify,
        collection: &str,
    ) -> DocumentStoreResult<Option<Document>> {
        self.inner.find_and_modify(request, collection).await
    }

    async fn ensure_index(&self, collection: &str, field: &str, unique: bool) -> DocumentStoreResult<()> {
        self.inner.ensure_index(collection, field, unique).await
    }
}

#[derive(Debug, Default, Record)]
#[record(collection = "fast")]
pub struct Fast {
    id: Option<Id>,
    pub label: String,
}

#[derive(Debug, Default, Record)]
#[record(collection = "slow")]
pub struct Slow {
    id: Option<Id>,
    pub label: String,
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pending_first_binding_does_not_block_bound_types() {
    let store = Arc::new(DocumentStore::new(GatedPing::default()));
    assert_eq!(Fast::count(store.as_ref(), None).await.unwrap(), 0);

    store.backend().hold.store(true, Ordering::SeqCst);
    let slow = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { Slow::count(store.as_ref(), None).await })
    };
    store.backend().entered.notified().await;

    let fast = timeout(Duration::from_secs(2), Fast::count(store.as_ref(), None)).await;
    assert!(matches!(fast, Ok(Ok(0))), "bound type waited on another type's ping");

    store.backend().release.notify_one();
    assert_eq!(slow.await.unwrap().unwrap(), 0);
}

#[tokio::test]
async fn concurrent_first_uses_share_one_binding() {
    let store = Arc::new(DocumentStore::new(InMemoryStore::new()));

    let handles = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { Fast::collection(store.as_ref()).await.unwrap() })
        })
        .collect::<Vec<_>>();

    let mut bindings = Vec::new();
    for handle in handles {
        bindings.push(handle.await.unwrap());
    }

    assert!(bindings.iter().all(|binding| Arc::ptr_eq(binding, &bindings[0])));
}
