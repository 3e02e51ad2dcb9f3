use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection, IndexModel,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, FindOptions, IndexOptions, ReturnDocument},
};
use tracing::debug;

use docmodel_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FindAndModify, Query},
};

use crate::query::{MongoQueryTranslator, projection, sort};

const DUPLICATE_KEY: i32 = 11000;

/// MongoDB-backed store. Writes use the collection's default write concern.
#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }
}

fn is_duplicate_key(error: &MongoError) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

fn backend_error(error: MongoError) -> DocumentStoreError {
    match error.kind.as_ref() {
        ErrorKind::ServerSelection { .. } => DocumentStoreError::Connection(error.to_string()),
        _ => DocumentStoreError::Backend(error.to_string()),
    }
}

fn id_label(id: Option<&Bson>) -> String {
    match id {
        Some(Bson::String(value)) => value.clone(),
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn ping(&self) -> DocumentStoreResult<()> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| DocumentStoreError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn insert_document(&self, document: Document, collection: &str) -> DocumentStoreResult<Bson> {
        let label = id_label(document.get("_id"));

        let result = self
            .get_collection(collection)
            .insert_one(document)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    DocumentStoreError::DocumentAlreadyExists(label, collection.to_string())
                } else {
                    backend_error(e)
                }
            })?;

        Ok(result.inserted_id)
    }

    async fn replace_document(&self, id: &Bson, mut document: Document, collection: &str) -> DocumentStoreResult<()> {
        document.remove("_id");

        let result = self
            .get_collection(collection)
            .replace_one(doc! { "_id": id.clone() }, document)
            .await
            .map_err(backend_error)?;

        if result.matched_count == 0 {
            return Err(DocumentStoreError::DocumentNotFound(id_label(Some(id)), collection.to_string()));
        }

        Ok(())
    }

    async fn remove_document(&self, id: &Bson, collection: &str) -> DocumentStoreResult<bool> {
        let result = self
            .get_collection(collection)
            .delete_one(doc! { "_id": id.clone() })
            .await
            .map_err(backend_error)?;

        Ok(result.deleted_count > 0)
    }

    async fn find_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit.filter(|&limit| limit > 0) {
            options.limit = Some(limit as i64);
        }
        if let Some(skip) = query.offset {
            options.skip = Some(skip as u64);
        }
        if !query.sort.is_empty() {
            options.sort = Some(sort(&query.sort));
        }
        if let Some(fields) = &query.projection {
            options.projection = Some(projection(fields));
        }

        self.get_collection(collection)
            .find(MongoQueryTranslator::filter(query.filter.as_ref())?)
            .with_options(options)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)
    }

    async fn find_one_document(
        &self,
        filter: Option<Expr>,
        fields: Option<Vec<String>>,
        collection: &str,
    ) -> DocumentStoreResult<Option<Document>> {
        let coll = self.get_collection(collection);
        let action = coll.find_one(MongoQueryTranslator::filter(filter.as_ref())?);

        let found = match fields {
            Some(fields) => action.projection(projection(&fields)).await,
            None => action.await,
        };

        found.map_err(backend_error)
    }

    async fn count_documents(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        self.get_collection(collection)
            .count_documents(MongoQueryTranslator::filter(filter.as_ref())?)
            .await
            .map_err(backend_error)
    }

    async fn find_and_modify(&self, request: FindAndModify, collection: &str) -> DocumentStoreResult<Option<Document>> {
        let return_document = if request.return_new {
            ReturnDocument::After
        } else {
            ReturnDocument::Before
        };

        self.get_collection(collection)
            .find_one_and_update(
                MongoQueryTranslator::filter(Some(&request.filter))?,
                doc! { "$inc": request.increment },
            )
            .upsert(request.upsert)
            .return_document(return_document)
            .await
            .map_err(backend_error)
    }

    async fn ensure_index(&self, collection: &str, field: &str, unique: bool) -> DocumentStoreResult<()> {
        let result = self
            .get_collection(collection)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { field: 1 })
                    .options(IndexOptions::builder().unique(unique).build())
                    .build(),
            )
            .await
            .map_err(backend_error)?;

        debug!(collection, index = %result.index_name, "ensured index");

        Ok(())
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

/// Builder for [`MongoDbStore`] from a connection string and database name.
pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
    app_name: Option<String>,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
            app_name: None,
        }
    }

    /// Application name reported to the server in connection handshakes.
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let mut options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        if let Some(app_name) = self.app_name {
            options.app_name = Some(app_name);
        }

        Ok(MongoDbStore::new(
            Client::with_options(options).map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
